//! Crawler module for fetching and walking listing pages
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with timeouts
//! - The pagination loop for a single source
//! - Bounded retries and failure containment across sources

mod fetcher;
mod gather;
mod retry;

pub use fetcher::{build_http_client, HttpFetcher, PageFetcher};
pub use gather::Crawler;
pub use retry::{RetryPolicy, ScrapeResults, SourceOutcome, SourceReport};
