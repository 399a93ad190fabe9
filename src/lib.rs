//! Listing-Spy: a classified listings watcher
//!
//! This crate periodically crawls real-estate listing sites, keeps track of the
//! listings it has already seen and pushes notifications about new ones.

pub mod actions;
pub mod adapters;
pub mod config;
pub mod crawler;
pub mod model;
pub mod notify;
pub mod storage;
pub mod url;

#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;

/// Main error type for Listing-Spy operations
#[derive(Debug, Error)]
pub enum SpyError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Crawl error: {0}")]
    Crawl(#[from] CrawlError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Notification error: {0}")]
    Notify(#[from] notify::NotifyError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// How a failed crawl should be treated by the retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Network trouble or a non-OK response; worth retrying
    Transient,
    /// The page no longer looks the way its adapter expects
    Structural,
    /// No adapter can handle the source at all
    Unsupported,
}

/// Errors raised while crawling a single source
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Unsupported source: no adapter registered for {host}")]
    UnsupportedSource { host: String },

    #[error("Invalid source URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to extract offers from {url}: {message}")]
    Extraction { url: String, message: String },
}

impl CrawlError {
    /// Builds a structural failure for the page at `url`
    pub fn extraction(url: &::url::Url, message: impl Into<String>) -> Self {
        Self::Extraction {
            url: url.to_string(),
            message: message.into(),
        }
    }

    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Http { .. } | Self::Timeout { .. } | Self::HttpStatus { .. } => {
                FailureKind::Transient
            }
            Self::Extraction { .. } => FailureKind::Structural,
            Self::UnsupportedSource { .. } | Self::InvalidUrl { .. } => FailureKind::Unsupported,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.failure_kind() == FailureKind::Transient
    }
}

/// Result type alias for Listing-Spy operations
pub type Result<T> = std::result::Result<T, SpyError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

/// Result type alias for crawl operations
pub type CrawlResult<T> = std::result::Result<T, CrawlError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{ListingUrl, NotificationHandlerConfig, Offer, OfferSet, Source};
pub use url::normalize_url;
