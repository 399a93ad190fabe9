//! Storage module for persisting sources, listings and notification targets
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Source bookkeeping, including the broken flag
//! - The "already seen" listing check
//! - Scrape run history

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{ListingGateway, StorageError, StorageResult};

use crate::SpyError;
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
pub fn open_storage(path: &Path) -> Result<SqliteStorage, SpyError> {
    SqliteStorage::new(path)
}

/// Represents a scrape run in the database
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub offers_seen: u64,
    pub new_listings: u64,
    pub failed_sources: u64,
    pub failed_notifications: u64,
}

/// What a finished run reports back to storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub status: RunStatus,
    pub offers_seen: u64,
    pub new_listings: u64,
    pub failed_sources: u64,
    pub failed_notifications: u64,
}

/// Status of a scrape run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    /// Every source crawled and every notification sent
    Completed,
    /// Finished, but some sources or notifications failed
    Degraded,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Degraded => "degraded",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "degraded" => Some(Self::Degraded),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
