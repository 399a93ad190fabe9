//! Data model shared by the crawler, the listing store and the notifiers
//!
//! Two notions of listing identity live here and are kept apart on purpose:
//! - [`Offer`] equality is the full `(title, url)` value and is what an
//!   [`OfferSet`] deduplicates on while a crawl accumulates results
//! - [`ListingUrl`] is the durable identity the listing store keys on

mod offer;
mod source;

pub use offer::{collapse_by_listing, ListingUrl, Offer, OfferSet};
pub use source::{BrokenReason, NotificationHandlerConfig, Source};
