//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured user agent and timeouts
//! - Bounding simultaneous requests with a shared permit pool
//! - The politeness delay before each request
//! - Error classification

use crate::config::CrawlerConfig;
use crate::extract::content_type_token;
use crate::state::ScrapeErrorKind;
use crate::url::{is_same_site, normalize_url};
use reqwest::{header::CONTENT_TYPE, redirect::Policy, Client};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use url::Url;

/// Classified fetch failure
///
/// None of these are retried; the URL stays visited.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error {0}")]
    HttpStatus(u16),

    #[error("Redirected outside the site to {final_url}")]
    OffSiteRedirect { final_url: String },
}

impl FetchError {
    pub fn kind(&self) -> ScrapeErrorKind {
        match self {
            FetchError::Timeout(_) => ScrapeErrorKind::Timeout,
            FetchError::Network(_) => ScrapeErrorKind::Network,
            FetchError::HttpStatus(_) => ScrapeErrorKind::HttpStatus,
            FetchError::OffSiteRedirect { .. } => ScrapeErrorKind::OffSiteRedirect,
        }
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(e.to_string())
        } else if e.is_connect() {
            FetchError::Network(format!("Connection failed: {}", e))
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

/// A successfully fetched response body
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Raw response body
    pub body: Vec<u8>,

    /// Lowercase media type without parameters, empty if the header is missing
    pub content_type: String,

    /// URL the body was served from after redirects
    pub final_url: Url,
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are followed by reqwest (up to 10 hops); the fetcher checks
/// where they ended.
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .read_timeout(Duration::from_secs(config.read_timeout_secs))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Concurrency-bounded page fetcher for one crawl job
pub struct Fetcher {
    client: Client,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    politeness_delay: Duration,
}

impl Fetcher {
    /// # Arguments
    ///
    /// * `client` - The HTTP client to use
    /// * `max_concurrent` - Size of the permit pool (at least 1)
    /// * `politeness_delay` - Pause before every request
    pub fn new(client: Client, max_concurrent: usize, politeness_delay: Duration) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            client,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            politeness_delay,
        }
    }

    /// Builds a fetcher with its own client from the crawler configuration
    pub fn from_config(config: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(config)?;
        Ok(Self::with_client(client, config))
    }

    /// Builds a fetcher around an existing client
    pub fn with_client(client: Client, config: &CrawlerConfig) -> Self {
        Self::new(
            client,
            config.max_concurrent as usize,
            Duration::from_millis(config.politeness_delay_ms),
        )
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Permits not currently held by a request
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Fetches a URL
    ///
    /// A permit is held from just before the request is sent until the body
    /// has been read or the request failed.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch
    /// * `site` - Site key the final URL must still belong to
    ///
    /// # Returns
    ///
    /// * `Ok(FetchedPage)` - Body, content-type token and final URL
    /// * `Err(FetchError)` - Classified failure
    pub async fn fetch(&self, url: &str, site: &str) -> Result<FetchedPage, FetchError> {
        tokio::time::sleep(self.politeness_delay).await;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| FetchError::Network("Permit pool closed".to_string()))?;

        tracing::info!("Fetching: {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        let final_url = response.url().clone();

        if !is_same_site(final_url.as_str(), site) {
            tracing::warn!("Redirected outside site: {} -> {}", url, final_url);
            return Err(FetchError::OffSiteRedirect {
                final_url: normalize_url(final_url.as_str()),
            });
        }

        if !status.is_success() {
            tracing::warn!("HTTP {} fetching {}", status.as_u16(), url);
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let content_type = content_type_token(
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
        );

        let body = response
            .bytes()
            .await
            .map_err(FetchError::from_reqwest)?
            .to_vec();

        tracing::info!(
            "Fetched {} (from {}) - Status: {}, Type: {}, Size: {} bytes",
            final_url,
            url,
            status.as_u16(),
            content_type,
            body.len()
        );

        Ok(FetchedPage {
            body,
            content_type,
            final_url,
        })
    }
}
