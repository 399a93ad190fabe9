//! HTTP page fetcher
//!
//! This module handles all listing page requests, including:
//! - Building HTTP clients with proper user agent strings and timeouts
//! - GET requests for listing pages
//! - Classifying request failures for the retry policy

use crate::config::{ScraperConfig, UserAgentConfig};
use crate::{CrawlError, CrawlResult};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Fetches the raw content of one page
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Performs one GET of `url` and returns the body
    async fn fetch(&self, url: &Url) -> CrawlResult<String>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `scraper` - Timeout settings
///
/// # Example
///
/// ```no_run
/// use listing_spy::config::{ScraperConfig, UserAgentConfig};
/// use listing_spy::crawler::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "ListingSpy".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&user_agent, &ScraperConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    scraper: &ScraperConfig,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        user_agent.crawler_name,
        user_agent.crawler_version,
        user_agent.contact_url,
        user_agent.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(scraper.request_timeout_secs))
        .connect_timeout(Duration::from_secs(scraper.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`PageFetcher`] backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> CrawlResult<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| classify_request_error(url, e))
    }
}

/// Maps a reqwest failure onto the crawl error taxonomy
fn classify_request_error(url: &Url, error: reqwest::Error) -> CrawlError {
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
