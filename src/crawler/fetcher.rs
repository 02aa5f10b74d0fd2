//! HTTP page fetcher
//!
//! This module performs the single GET behind every crawled URL:
//! - Building HTTP clients with the configured user agent and timeout
//! - Classifying transport, status and body failures into `FetchError`
//!
//! There is no retry here. A failed fetch is terminal for its URL and the
//! caller treats it as a page with nothing on it.

use crate::config::UserAgentConfig;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum redirect hops followed for a single page
const MAX_REDIRECTS: usize = 10;

/// Why a page could not be fetched
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("could not connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not read body of {url}: {message}")]
    Body { url: String, message: String },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
}

impl FetchError {
    fn from_reqwest(url: &Url, error: reqwest::Error) -> Self {
        let url = url.to_string();
        if error.is_timeout() {
            FetchError::Timeout { url }
        } else if error.is_connect() {
            FetchError::Connect {
                url,
                message: error.to_string(),
            }
        } else if error.is_body() || error.is_decode() {
            FetchError::Body {
                url,
                message: error.to_string(),
            }
        } else {
            FetchError::Transport {
                url,
                message: error.to_string(),
            }
        }
    }
}

/// A successfully fetched HTML page
///
/// The body is parsed into a document tree by `crate::crawler::parse_page`;
/// `scraper::Html` is not `Send`, so the tree is built where it is consumed
/// rather than carried across an await point.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects; relative links resolve against this
    pub final_url: Url,
    /// HTTP status code
    pub status_code: u16,
    /// Page body as text
    pub body: String,
}

/// Builds an HTTP client with the crawler's user agent and timeout
///
/// # Example
///
/// ```no_run
/// use cep_harvest::config::UserAgentConfig;
/// use cep_harvest::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "CepHarvest".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages over its own HTTP client
///
/// Each crawl worker owns one fetcher, so workers never share connection
/// state.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    /// Creates a fetcher with a fresh client
    pub fn new(config: &UserAgentConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config, timeout)?,
        })
    }

    /// Performs one GET for `url`
    ///
    /// # Errors
    ///
    /// | Condition                         | Error       |
    /// |-----------------------------------|-------------|
    /// | Request exceeded the timeout      | `Timeout`   |
    /// | Connection refused / DNS / TLS    | `Connect`   |
    /// | Non-2xx status                    | `Status`    |
    /// | Body could not be read as text    | `Body`      |
    /// | Anything else from the transport  | `Transport` |
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        Ok(FetchedPage {
            final_url,
            status_code: status.as_u16(),
            body,
        })
    }
}
