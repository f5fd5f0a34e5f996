use std::path::{Path, PathBuf};

use anyhow::Context;
use bookmark_card::{
    config::{Config, DEFAULT_CONFIG_PATH},
    converter_from_config,
    host::{FsHost, Session},
};
use clap::Parser;
use tracing::error;

#[derive(Parser)]
#[clap(about = "Convert %%bookmarkthis%% markers in Markdown files into bookmark cards")]
struct Opts {
    /// Defaults to ./bookmark-card.yaml when present.
    #[clap(short, long, env = "BOOKMARK_CARD_CONFIG")]
    config: Option<PathBuf>,
    /// Overrides `endpoint_base` of the config.
    #[clap(short, long)]
    endpoint: Option<String>,
    /// Print converted documents instead of writing them back.
    #[clap(long)]
    dry_run: bool,
    #[clap(required = true)]
    files: Vec<PathBuf>,
}

async fn run(opts: Opts) -> anyhow::Result<()> {
    let mut config = match &opts.config {
        Some(path) => Config::load(path)
            .await
            .with_context(|| format!("load config from {}", path.display()))?,
        None => Config::load_or_default(Path::new(DEFAULT_CONFIG_PATH))
            .await
            .with_context(|| format!("load config from {DEFAULT_CONFIG_PATH}"))?,
    };
    if let Some(endpoint) = opts.endpoint {
        config.endpoint_base = endpoint;
        config.validate().with_context(|| "validate --endpoint")?;
    }
    let converter = converter_from_config(&config).with_context(|| "build resolver")?;
    let session = Session::new(
        FsHost {
            dry_run: opts.dry_run,
        },
        converter,
    );
    for file in &opts.files {
        session
            .convert_document(file)
            .await
            .with_context(|| format!("convert {}", file.display()))?;
    }
    Ok(())
}

fn main() {
    let opts = Opts::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(?e, "failed to start runtime");
            std::process::exit(1);
        }
    };
    if let Err(e) = runtime.block_on(run(opts)) {
        error!(?e, "critical error");
        std::process::exit(1);
    }
}
