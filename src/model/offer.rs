use crate::url::normalize_url;
use crate::UrlResult;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use url::Url;

/// A normalized listing URL, the identity a listing keeps across runs
///
/// Only constructible through normalization, so two `ListingUrl`s compare
/// equal exactly when they name the same listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListingUrl(String);

impl ListingUrl {
    /// Normalizes `url` into a listing identity
    pub fn parse(url: &str) -> UrlResult<Self> {
        normalize_url(url).map(Self::from)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Url> for ListingUrl {
    /// Wraps an already parsed HTTP(S) URL, dropping its fragment
    fn from(url: Url) -> Self {
        let mut url = url;
        url.set_fragment(None);
        Self(url.into())
    }
}

impl fmt::Display for ListingUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single classified ad as seen on a listing page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Offer {
    pub title: String,
    pub url: ListingUrl,
}

impl Offer {
    pub fn new(title: impl Into<String>, url: ListingUrl) -> Self {
        Self {
            title: title.into(),
            url,
        }
    }

    /// The durable identity of this offer
    pub fn listing_key(&self) -> &ListingUrl {
        &self.url
    }
}

/// Offers accumulated during a crawl, deduplicated by full value
pub type OfferSet = HashSet<Offer>;

/// Collapses offers to one per listing URL
///
/// When the same URL shows up under several titles the lexicographically
/// smallest title wins so the choice does not depend on hash order. The
/// result is sorted by URL.
pub fn collapse_by_listing(offers: &OfferSet) -> Vec<Offer> {
    let mut by_url: BTreeMap<&ListingUrl, &Offer> = BTreeMap::new();

    for offer in offers {
        by_url
            .entry(offer.listing_key())
            .and_modify(|kept| {
                if offer.title < kept.title {
                    *kept = offer;
                }
            })
            .or_insert(offer);
    }

    by_url.into_values().cloned().collect()
}
