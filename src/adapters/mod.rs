//! Site adapters: per-domain offer extraction and pagination
//!
//! Every supported listing site gets one [`SiteAdapter`]. An adapter sees a
//! single fetched page, pulls the offers out of it and tells the crawler
//! where the next page is, if there is one. Adapters never fetch anything
//! themselves.
//!
//! Adapters are looked up through an [`AdapterRegistry`] keyed by host (see
//! [`crate::url::host_key`]). The registry is built once at startup and
//! handed to the crawler.

mod gratka;
mod morizon;
mod olx;
mod otodom;
mod trojmiasto;

pub use gratka::GratkaAdapter;
pub use morizon::MorizonAdapter;
pub use olx::OlxAdapter;
pub use otodom::OtodomAdapter;
pub use trojmiasto::TrojmiastoAdapter;

use crate::model::{ListingUrl, Offer, OfferSet};
use crate::url::{host_key, resolve_url};
use crate::{CrawlError, CrawlResult};
use scraper::{ElementRef, Selector};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// A fetched listing page
#[derive(Debug, Clone)]
pub struct Page {
    /// The URL the page was fetched from
    pub url: Url,
    /// Raw response body
    pub body: String,
}

impl Page {
    pub fn new(url: Url, body: impl Into<String>) -> Self {
        Self {
            url,
            body: body.into(),
        }
    }
}

/// What an adapter found on one page
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Offers on this page, with normalized URLs
    pub offers: OfferSet,
    /// Where to continue, `None` when pagination is exhausted
    pub next: Option<Url>,
}

/// Site-specific extraction and pagination logic
///
/// Any structure the adapter expects but cannot find (a missing element,
/// attribute or malformed embedded metadata) is reported as
/// [`CrawlError::Extraction`].
pub trait SiteAdapter: Send + Sync {
    /// Short adapter name used in logs
    fn name(&self) -> &'static str;

    /// Extracts the offers of `page` and locates the next page
    fn extract(&self, page: &Page) -> CrawlResult<Extraction>;
}

/// Explicit host -> adapter table
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn SiteAdapter>>,
}

impl AdapterRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the registry of every site supported out of the box
    pub fn standard() -> Result<Self, url::ParseError> {
        let registry = Self::new()
            .register("www.olx.pl", Arc::new(OlxAdapter::new(OlxAdapter::base()?)))
            .register(
                "www.otodom.pl",
                Arc::new(OtodomAdapter::new(OtodomAdapter::base()?)),
            )
            .register(
                "ogloszenia.trojmiasto.pl",
                Arc::new(TrojmiastoAdapter::new(TrojmiastoAdapter::base()?)),
            )
            .register("gratka.pl", Arc::new(GratkaAdapter::new(GratkaAdapter::base()?)))
            .register(
                "www.morizon.pl",
                Arc::new(MorizonAdapter::new(MorizonAdapter::base()?)),
            );

        Ok(registry)
    }

    /// Registers `adapter` for `host` (lowercase, with `:port` if non-default)
    pub fn register(mut self, host: impl Into<String>, adapter: Arc<dyn SiteAdapter>) -> Self {
        self.adapters.insert(host.into().to_lowercase(), adapter);
        self
    }

    /// Looks up the adapter responsible for `url`
    pub fn adapter_for(&self, url: &Url) -> CrawlResult<Arc<dyn SiteAdapter>> {
        let host = host_key(url).ok_or_else(|| CrawlError::InvalidUrl {
            url: url.to_string(),
            message: "URL has no host".to_string(),
        })?;

        self.adapters
            .get(&host)
            .cloned()
            .ok_or(CrawlError::UnsupportedSource { host })
    }

    /// Registered hosts, sorted
    pub fn hosts(&self) -> Vec<&str> {
        let mut hosts: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        hosts.sort_unstable();
        hosts
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("hosts", &self.hosts())
            .finish()
    }
}

/// Parses a CSS selector, reporting failures against `page`
fn selector(page: &Page, css: &str) -> CrawlResult<Selector> {
    Selector::parse(css)
        .map_err(|e| CrawlError::extraction(&page.url, format!("bad selector {}: {}", css, e)))
}

/// Text content of an element with whitespace runs collapsed
fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reads a required attribute of an offer element
fn required_attr<'a>(page: &Page, element: &ElementRef<'a>, attr: &str) -> CrawlResult<&'a str> {
    element.value().attr(attr).ok_or_else(|| {
        CrawlError::extraction(
            &page.url,
            format!("<{}> without {} attribute", element.value().name(), attr),
        )
    })
}

/// Resolves an offer href against the site base into a listing URL
fn offer_url(page: &Page, base: &Url, href: &str) -> CrawlResult<ListingUrl> {
    resolve_url(base, href)
        .map(ListingUrl::from)
        .map_err(|e| CrawlError::extraction(&page.url, format!("bad offer link: {}", e)))
}

/// Resolves a pagination href against the page it was found on
///
/// Query-only hrefs such as `?page=2` keep the current path.
fn next_page_url(page: &Page, href: &str) -> CrawlResult<Url> {
    resolve_url(&page.url, href)
        .map_err(|e| CrawlError::extraction(&page.url, format!("bad next page link: {}", e)))
}

/// Adds an offer to the set
///
/// An empty title means the markup moved away from the selectors, so it is
/// reported as a structural failure rather than skipped.
fn push_offer(
    page: &Page,
    offers: &mut OfferSet,
    title: String,
    url: ListingUrl,
) -> CrawlResult<()> {
    if title.is_empty() {
        return Err(CrawlError::extraction(&page.url, format!("offer {} without title", url)));
    }
    offers.insert(Offer::new(title, url));
    Ok(())
}
