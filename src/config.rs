use std::{path::Path, time::Duration};

use serde::Deserialize;

pub const DEFAULT_ENDPOINT_BASE: &str = "https://url-metascraper.happylee-tw.workers.dev/scraper";
pub const DEFAULT_REQUEST_INTERVAL_MS: u64 = 500;
/// Looked up in the working directory when no config is given.
pub const DEFAULT_CONFIG_PATH: &str = "bookmark-card.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config ({path}): {error}")]
    Read { error: std::io::Error, path: String },
    #[error("failed to parse config ({path}): {error}")]
    Parse {
        error: serde_yaml::Error,
        path: String,
    },
    #[error("invalid endpoint_base {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Base URL of the metadata service. The percent-encoded target URL is
    /// appended as the last path segment.
    #[serde(default = "default_endpoint_base")]
    pub endpoint_base: String,
    /// Pause between two consecutive resolutions of the same run.
    #[serde(default = "default_request_interval_ms")]
    pub request_interval_ms: u64,
    /// Transport timeout for a single resolution. Unbounded when absent.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_endpoint_base() -> String {
    DEFAULT_ENDPOINT_BASE.to_owned()
}

fn default_request_interval_ms() -> u64 {
    DEFAULT_REQUEST_INTERVAL_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint_base: default_endpoint_base(),
            request_interval_ms: default_request_interval_ms(),
            timeout_secs: None,
        }
    }
}

impl Config {
    pub fn with_endpoint(endpoint_base: impl Into<String>) -> Self {
        Self {
            endpoint_base: endpoint_base.into(),
            ..Default::default()
        }
    }

    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidEndpoint {
            endpoint: self.endpoint_base.clone(),
            reason,
        };
        let url = url::Url::parse(&self.endpoint_base).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        Ok(())
    }

    pub fn from_yaml(src: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(src).map_err(|error| ConfigError::Parse {
            error,
            path: path.display().to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the config at `path`. The file must exist.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let src = tokio::fs::read_to_string(path)
            .await
            .map_err(|error| ConfigError::Read {
                error,
                path: path.display().to_string(),
            })?;
        Self::from_yaml(&src, path)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub async fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load(path).await {
            Err(ConfigError::Read { error, .. })
                if error.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(Self::default())
            }
            result => result,
        }
    }
}
