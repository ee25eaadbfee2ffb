//! HTTP fetch engine shared by the discovery stages
//!
//! A single `reqwest` client with a custom user agent and bounded timeouts.
//! Stages go through the [`HtmlFetcher`] trait so they can be exercised
//! against canned documents without a network.

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::config::FetchConfig;

/// Errors that can occur during fetching
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Narrow fetch seam for the discovery stages.
#[allow(async_fn_in_trait)]
pub trait HtmlFetcher: Send + Sync {
    /// Fetch a document body as text, bounded by `timeout`.
    async fn fetch_text(&self, url: &Url, timeout: Duration) -> Result<String, FetchError>;
}

/// Production fetcher backed by a shared HTTP client
pub struct PageFetcher {
    client: reqwest::Client,
}

impl PageFetcher {
    /// Build the HTTP client once; per-request timeouts are passed per fetch.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()?;

        Ok(Self { client })
    }
}

impl HtmlFetcher for PageFetcher {
    async fn fetch_text(&self, url: &Url, timeout: Duration) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.as_str())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(timeout)
                } else {
                    FetchError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}
