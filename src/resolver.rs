//! Client side of the metadata-extraction service.
//!
//! A resolution never fails past this module: transport errors, unexpected
//! statuses and malformed bodies are all folded into [`MetadataResult::Failure`].

use std::future::Future;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;

pub const UNKNOWN_ERROR: &str = "未知錯誤";

/// Page metadata. Every field is empty when the service did not provide it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: String,
    pub description: String,
    pub image: String,
    pub url: String,
    pub author: String,
    pub publisher: String,
    pub logo: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataResult {
    Success(Metadata),
    Failure { reason: String },
}

impl MetadataResult {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }
}

/// A panic inside `resolve` is caught by the converter and only skips the
/// marker being resolved.
pub trait Resolver {
    fn resolve(&self, url: &str) -> impl Future<Output = MetadataResult> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("failed to build http client: {0}")]
    BuildClient(reqwest::Error),
    #[error("request failed: {0}")]
    Request(reqwest::Error),
    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("failed to read response body: {0}")]
    ReadBody(reqwest::Error),
    #[error("malformed response body: {0}")]
    Decode(serde_json::Error),
}

#[derive(Deserialize, Debug, Default)]
struct MetadataData {
    title: Option<String>,
    description: Option<String>,
    image: Option<String>,
    url: Option<String>,
    author: Option<String>,
    publisher: Option<String>,
    logo: Option<String>,
}

#[derive(Deserialize, Debug)]
struct MetadataResponse {
    success: bool,
    #[serde(default)]
    data: Option<MetadataData>,
    #[serde(default)]
    error: Option<String>,
}

impl From<MetadataData> for Metadata {
    fn from(data: MetadataData) -> Self {
        Self {
            title: data.title.unwrap_or_default(),
            description: data.description.unwrap_or_default(),
            image: data.image.unwrap_or_default(),
            url: data.url.unwrap_or_default(),
            author: data.author.unwrap_or_default(),
            publisher: data.publisher.unwrap_or_default(),
            logo: data.logo.unwrap_or_default(),
        }
    }
}

impl From<MetadataResponse> for MetadataResult {
    fn from(response: MetadataResponse) -> Self {
        if response.success {
            Self::Success(response.data.unwrap_or_default().into())
        } else {
            Self::failure(
                response
                    .error
                    .filter(|error| !error.is_empty())
                    .unwrap_or_else(|| UNKNOWN_ERROR.to_owned()),
            )
        }
    }
}

/// Resolves URLs through `GET {endpoint_base}/{percent-encoded url}`.
pub struct HttpResolver {
    client: reqwest::Client,
    endpoint_base: String,
}

impl HttpResolver {
    pub fn new(client: reqwest::Client, endpoint_base: impl Into<String>) -> Self {
        Self {
            client,
            endpoint_base: endpoint_base.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ResolveError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ResolveError::BuildClient)?;
        Ok(Self::new(client, config.endpoint_base.clone()))
    }

    pub fn request_url(&self, url: &str) -> String {
        format!(
            "{}/{}",
            self.endpoint_base.trim_end_matches('/'),
            urlencoding::encode(url)
        )
    }

    async fn fetch(&self, url: &str) -> Result<MetadataResult, ResolveError> {
        let request_url = self.request_url(url);
        debug!(%url, %request_url, "resolving bookmark metadata");
        let response = self
            .client
            .get(&request_url)
            .send()
            .await
            .map_err(ResolveError::Request)?;
        let status = response.status();
        let body = response.bytes().await.map_err(ResolveError::ReadBody)?;
        if !status.is_success() {
            // The service reports its own failures as JSON with a 400/500 status.
            return match serde_json::from_slice::<MetadataResponse>(&body) {
                Ok(response @ MetadataResponse { success: false, .. }) => Ok(response.into()),
                _ => Err(ResolveError::Status(status)),
            };
        }
        let response: MetadataResponse =
            serde_json::from_slice(&body).map_err(ResolveError::Decode)?;
        Ok(response.into())
    }
}

impl Resolver for HttpResolver {
    async fn resolve(&self, url: &str) -> MetadataResult {
        let result = self
            .fetch(url)
            .await
            .unwrap_or_else(|e| MetadataResult::failure(e.to_string()));
        if let MetadataResult::Failure { reason } = &result {
            warn!(%url, %reason, "failed to resolve bookmark metadata");
        }
        result
    }
}
