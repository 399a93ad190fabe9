//! Storage traits and error types
//!
//! This module defines the gateway the scrape cycle talks to and its error
//! types. The gateway is the only authority on which listings were already
//! seen; nothing is cached between cycles on the caller's side.

use crate::model::{BrokenReason, NotificationHandlerConfig, Offer, OfferSet, Source};
use crate::storage::{RunRecord, RunSummary};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("Notification handler not found: {0}")]
    NotificationNotFound(i64),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence gateway for sources, listings and notification handlers
pub trait ListingGateway {
    // ===== Sources =====

    /// Gets every configured source, broken ones included
    fn get_sources(&self) -> StorageResult<Vec<Source>>;

    /// Stores a new source
    ///
    /// # Returns
    ///
    /// The key of the new source
    fn add_source(&mut self, url: &str, name: &str) -> StorageResult<String>;

    /// Deletes a source
    fn delete_source(&mut self, key: &str) -> StorageResult<()>;

    /// Flags a source as broken
    ///
    /// # Arguments
    ///
    /// * `key` - The source key
    /// * `reason` - Why the source was given up on
    /// * `detail` - The last error seen, for humans
    fn mark_broken_source(
        &mut self,
        key: &str,
        reason: BrokenReason,
        detail: &str,
    ) -> StorageResult<()>;

    /// Clears the broken flag after a source was checked by hand
    fn clear_broken_source(&mut self, key: &str) -> StorageResult<()>;

    // ===== Listings =====

    /// Stores the listings not seen before and returns exactly those
    ///
    /// Listings are identified by normalized URL alone. Offers sharing a URL
    /// are collapsed to one before the lookup. A stored listing whose title
    /// changed gets the new title but is not returned.
    fn save_new_listings(&mut self, offers: &OfferSet) -> StorageResult<Vec<Offer>>;

    /// Counts stored listings
    fn count_listings(&self) -> StorageResult<u64>;

    // ===== Notification Handlers =====

    /// Gets every configured notification handler
    fn get_notification_handlers(&self) -> StorageResult<Vec<NotificationHandlerConfig>>;

    /// Stores a notification handler and returns its ID
    fn add_notification_handler(
        &mut self,
        kind: &str,
        api_key: &str,
        name: &str,
    ) -> StorageResult<i64>;

    /// Deletes a notification handler
    fn delete_notification_handler(&mut self, id: i64) -> StorageResult<()>;

    // ===== Run Tracking =====

    /// Records the start of a scrape cycle
    fn begin_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Records the outcome of a scrape cycle
    fn finish_run(&mut self, run_id: i64, summary: &RunSummary) -> StorageResult<()>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;
}
