//! HTTP fetcher implementation
//!
//! The crawl core only needs `fetch(url, timeout) -> body | error`. That
//! boundary is the [`PageFetcher`] trait; [`HttpFetcher`] is the reqwest-backed
//! implementation used by the binary.

use crate::config::UserAgentConfig;
use crate::CrawlError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Fetches a document body for a URL within a hard time limit
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Returns the body of `url`, or an error if the request fails, times out,
    /// or answers with anything other than `200 OK`
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<String, CrawlError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed [`PageFetcher`]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a fetcher with a client identified by `config`
    pub fn from_config(config: &UserAgentConfig) -> Result<Self, CrawlError> {
        Ok(Self::new(build_http_client(config)?))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<String, CrawlError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(CrawlError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| classify_error(url, e))
    }
}

/// Maps a reqwest failure onto the crawl error taxonomy
fn classify_error(url: &Url, error: reqwest::Error) -> CrawlError {
    if error.is_timeout() {
        CrawlError::Timeout {
            url: url.to_string(),
        }
    } else {
        CrawlError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}
