//! Source resolution: turning uploads and URLs into image bytes plus a filename
//!
//! Remote references are validated before any network activity and fetched
//! through the [`ImageFetcher`] seam, so the transport can be swapped out in
//! tests or by embedders. A failed fetch fails only its own item.

use crate::{
    config::PipelineConfig,
    error::{BatchError, ItemError, Result},
    types::{ImageBytes, SourceReference},
};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Image bytes plus the filename they should be reported under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub bytes: ImageBytes,
    pub filename: String,
}

/// Transport used to retrieve remote images
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch the body behind `url`
    ///
    /// # Errors
    /// - `ItemError::Fetch` for transport failures, timeouts and non-2xx statuses
    async fn fetch(&self, url: &Url) -> std::result::Result<Vec<u8>, ItemError>;
}

/// `reqwest`-backed fetcher with a fixed per-request timeout
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    /// Create a fetcher using the timeout and user agent from `config`
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.fetch_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| BatchError::network_error("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            timeout_secs: config.fetch_timeout_secs,
        })
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> std::result::Result<Vec<u8>, ItemError> {
        debug!(url = %url, "📥 Fetching remote image");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.describe_transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ItemError::fetch(format!("HTTP status {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.describe_transport_error(&e))?;

        debug!(url = %url, bytes = body.len(), "Remote image fetched");
        Ok(body.to_vec())
    }
}

impl HttpFetcher {
    fn describe_transport_error(&self, error: &reqwest::Error) -> ItemError {
        if error.is_timeout() {
            ItemError::fetch(format!("timed out after {}s", self.timeout_secs))
        } else {
            ItemError::fetch(error.to_string())
        }
    }
}

/// Check that a URL has both a scheme and a host
///
/// # Errors
/// - `ItemError::InvalidUrl` when the string does not parse as an absolute URL
///   or has no host component
pub fn validate_source_url(raw: &str) -> std::result::Result<Url, ItemError> {
    let url = Url::parse(raw).map_err(|e| ItemError::invalid_url(raw, e.to_string()))?;

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(ItemError::invalid_url(raw, "missing host")),
    }
}

/// Derive a filename from the last path segment of `url`
///
/// Falls back to `image_<ordinal>.jpg` when the segment is empty or has no
/// extension-like suffix. `ordinal` is the 1-based batch position.
#[must_use]
pub fn filename_from_url(url: &Url, ordinal: usize) -> String {
    let segment = url.path().rsplit('/').next().unwrap_or_default();

    if segment.is_empty() || !segment.contains('.') {
        format!("image_{}.jpg", ordinal)
    } else {
        segment.to_string()
    }
}

/// Resolves source references into image bytes
#[derive(Clone)]
pub struct SourceResolver {
    fetcher: Arc<dyn ImageFetcher>,
}

impl SourceResolver {
    pub fn new(fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self { fetcher }
    }

    /// Resolver backed by a real HTTP client
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn http(config: &PipelineConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpFetcher::new(config)?)))
    }

    /// Resolve one reference
    ///
    /// `ordinal` is the 1-based position of the reference in its batch and is
    /// only used for the URL filename fallback.
    ///
    /// # Errors
    /// - `ItemError::EmptyInput` for an empty upload or an empty response body
    /// - `ItemError::InvalidUrl` for a URL without scheme or host (no request is made)
    /// - `ItemError::Fetch` for transport failures and non-2xx statuses
    #[instrument(skip(self, reference), fields(source = %reference.label()))]
    pub async fn resolve(
        &self,
        reference: SourceReference,
        ordinal: usize,
    ) -> std::result::Result<ResolvedImage, ItemError> {
        match reference {
            SourceReference::Upload {
                bytes,
                original_filename,
            } => {
                if bytes.is_empty() {
                    return Err(ItemError::EmptyInput);
                }
                Ok(ResolvedImage {
                    bytes: ImageBytes::new(bytes),
                    filename: original_filename,
                })
            },
            SourceReference::RemoteUrl { url } => {
                let parsed = validate_source_url(&url)?;
                let body = self.fetcher.fetch(&parsed).await?;
                if body.is_empty() {
                    return Err(ItemError::EmptyInput);
                }
                Ok(ResolvedImage {
                    bytes: ImageBytes::new(body),
                    filename: filename_from_url(&parsed, ordinal),
                })
            },
        }
    }
}
