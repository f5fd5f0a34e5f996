//! Turns `%%bookmarkthis%%` markers in Markdown into bookmark cards.

pub mod config;
pub mod convert;
pub mod host;
pub mod progress;
pub mod render;
pub mod resolver;
pub mod scanner;

#[cfg(test)]
mod tests;

pub use convert::BookmarkConverter;
pub use resolver::HttpResolver;

/// Builds a converter that resolves markers through the service configured
/// in `config`.
pub fn converter_from_config(
    config: &config::Config,
) -> Result<BookmarkConverter<HttpResolver>, resolver::ResolveError> {
    Ok(BookmarkConverter::new(
        HttpResolver::from_config(config)?,
        config.request_interval(),
    ))
}
