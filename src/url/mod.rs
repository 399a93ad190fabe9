//! URL handling module for Listing-Spy
//!
//! This module provides listing URL normalization and the host keys used to
//! look up site adapters.

mod domain;
mod normalize;

pub use domain::host_key;
pub use normalize::{normalize_url, resolve_url};
