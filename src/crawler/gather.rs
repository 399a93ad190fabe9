//! Pagination loop for a single source

use crate::adapters::{AdapterRegistry, Page};
use crate::crawler::PageFetcher;
use crate::model::OfferSet;
use crate::url::normalize_url;
use crate::{CrawlError, CrawlResult};
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

/// Walks the pages of one source and accumulates its offers
pub struct Crawler {
    registry: AdapterRegistry,
    fetcher: Arc<dyn PageFetcher>,
    max_pages: u32,
}

impl Crawler {
    /// Creates a crawler
    ///
    /// # Arguments
    ///
    /// * `registry` - Adapters by host
    /// * `fetcher` - Page fetcher used for every request
    /// * `max_pages` - Maximum pages followed per source (at least one page
    ///   is always fetched)
    pub fn new(registry: AdapterRegistry, fetcher: Arc<dyn PageFetcher>, max_pages: u32) -> Self {
        Self {
            registry,
            fetcher,
            max_pages: max_pages.max(1),
        }
    }

    /// Collects every offer reachable from `source_url`
    ///
    /// Fetches the source URL, hands the page to the adapter registered for
    /// its host and keeps following the adapter's next page until there is
    /// none. Offers are deduplicated by full value.
    ///
    /// The walk also stops, with a warning, when `max_pages` pages have been
    /// fetched or when the adapter points back at a page already visited.
    ///
    /// # Errors
    ///
    /// * [`CrawlError::UnsupportedSource`] before any request when no adapter
    ///   handles the host
    /// * any fetch or extraction failure, as soon as it happens
    pub async fn gather_offers(&self, source_url: &str) -> CrawlResult<OfferSet> {
        let start = parse_source_url(source_url)?;
        let adapter = self.registry.adapter_for(&start)?;

        let mut offers = OfferSet::new();
        let mut visited: HashSet<Url> = HashSet::new();
        let mut pages: u32 = 0;
        let mut current = start;

        loop {
            tracing::debug!(adapter = adapter.name(), page = pages + 1, "Fetching {}", current);
            visited.insert(current.clone());

            let body = self.fetcher.fetch(&current).await?;
            let extraction = adapter.extract(&Page::new(current, body))?;
            pages += 1;

            tracing::debug!(
                adapter = adapter.name(),
                found = extraction.offers.len(),
                "Extracted offers"
            );
            offers.extend(extraction.offers);

            current = match extraction.next {
                None => break,
                Some(next) if pages >= self.max_pages => {
                    tracing::warn!(
                        source = source_url,
                        max_pages = self.max_pages,
                        "Page cap reached, not following {}",
                        next
                    );
                    break;
                }
                Some(next) if visited.contains(&next) => {
                    tracing::warn!(
                        source = source_url,
                        "Pagination loops back to {}, stopping",
                        next
                    );
                    break;
                }
                Some(next) => next,
            };
        }

        tracing::info!(
            source = source_url,
            pages,
            offers = offers.len(),
            "Crawled source"
        );

        Ok(offers)
    }
}

fn parse_source_url(source_url: &str) -> CrawlResult<Url> {
    normalize_url(source_url).map_err(|e| CrawlError::InvalidUrl {
        url: source_url.to_string(),
        message: e.to_string(),
    })
}
