//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ListingGateway trait.

use crate::model::{
    collapse_by_listing, BrokenReason, NotificationHandlerConfig, Offer, OfferSet, Source,
};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ListingGateway, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, RunSummary};
use crate::SpyError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SpyError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SpyError> {
        let conn = Connection::open(path).map_err(StorageError::from)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )
        .map_err(StorageError::from)?;

        initialize_schema(&conn).map_err(StorageError::from)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, SpyError> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        initialize_schema(&conn).map_err(StorageError::from)?;
        Ok(Self { conn })
    }
}

/// Source keys are the row IDs rendered as text
fn parse_source_key(key: &str) -> StorageResult<i64> {
    key.parse()
        .map_err(|_| StorageError::SourceNotFound(key.to_string()))
}

impl ListingGateway for SqliteStorage {
    // ===== Sources =====

    fn get_sources(&self) -> StorageResult<Vec<Source>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, url, name, broken, broken_reason FROM sources ORDER BY id")?;

        let sources = stmt
            .query_map([], |row| {
                let reason: Option<String> = row.get(4)?;
                Ok(Source {
                    key: Some(row.get::<_, i64>(0)?.to_string()),
                    url: row.get(1)?,
                    name: row.get(2)?,
                    broken: row.get(3)?,
                    broken_reason: reason.as_deref().and_then(BrokenReason::from_db_string),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sources)
    }

    fn add_source(&mut self, url: &str, name: &str) -> StorageResult<String> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO sources (url, name, created_at) VALUES (?1, ?2, ?3)",
            params![url, name, now],
        )?;
        Ok(self.conn.last_insert_rowid().to_string())
    }

    fn delete_source(&mut self, key: &str) -> StorageResult<()> {
        let id = parse_source_key(key)?;
        let deleted = self
            .conn
            .execute("DELETE FROM sources WHERE id = ?1", params![id])?;

        if deleted == 0 {
            return Err(StorageError::SourceNotFound(key.to_string()));
        }
        Ok(())
    }

    fn mark_broken_source(
        &mut self,
        key: &str,
        reason: BrokenReason,
        detail: &str,
    ) -> StorageResult<()> {
        let id = parse_source_key(key)?;
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE sources SET broken = 1, broken_reason = ?1, broken_detail = ?2, broken_at = ?3
             WHERE id = ?4",
            params![reason.to_db_string(), detail, now, id],
        )?;

        if updated == 0 {
            return Err(StorageError::SourceNotFound(key.to_string()));
        }
        Ok(())
    }

    fn clear_broken_source(&mut self, key: &str) -> StorageResult<()> {
        let id = parse_source_key(key)?;
        let updated = self.conn.execute(
            "UPDATE sources SET broken = 0, broken_reason = NULL, broken_detail = NULL,
             broken_at = NULL WHERE id = ?1",
            params![id],
        )?;

        if updated == 0 {
            return Err(StorageError::SourceNotFound(key.to_string()));
        }
        Ok(())
    }

    // ===== Listings =====

    fn save_new_listings(&mut self, offers: &OfferSet) -> StorageResult<Vec<Offer>> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut new_listings = Vec::new();

        for offer in collapse_by_listing(offers) {
            let stored_title: Option<String> = tx
                .query_row(
                    "SELECT title FROM listings WHERE url = ?1",
                    params![offer.url.as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            match stored_title {
                None => {
                    tx.execute(
                        "INSERT INTO listings (url, title, first_seen_at, last_seen_at)
                         VALUES (?1, ?2, ?3, ?3)",
                        params![offer.url.as_str(), offer.title, now],
                    )?;
                    new_listings.push(offer);
                }
                Some(title) => {
                    if title != offer.title {
                        tracing::debug!(
                            "Title of {} changed from {:?} to {:?}",
                            offer.url,
                            title,
                            offer.title
                        );
                    }
                    tx.execute(
                        "UPDATE listings SET title = ?1, last_seen_at = ?2 WHERE url = ?3",
                        params![offer.title, now, offer.url.as_str()],
                    )?;
                }
            }
        }

        tx.commit()?;
        Ok(new_listings)
    }

    fn count_listings(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Notification Handlers =====

    fn get_notification_handlers(&self) -> StorageResult<Vec<NotificationHandlerConfig>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, kind, api_key, name FROM notification_handlers ORDER BY id")?;

        let handlers = stmt
            .query_map([], |row| {
                Ok(NotificationHandlerConfig {
                    id: row.get(0)?,
                    kind: row.get(1)?,
                    api_key: row.get(2)?,
                    name: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(handlers)
    }

    fn add_notification_handler(
        &mut self,
        kind: &str,
        api_key: &str,
        name: &str,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO notification_handlers (kind, api_key, name, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![kind, api_key, name, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn delete_notification_handler(&mut self, id: i64) -> StorageResult<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM notification_handlers WHERE id = ?1", params![id])?;

        if deleted == 0 {
            return Err(StorageError::NotificationNotFound(id));
        }
        Ok(())
    }

    // ===== Run Tracking =====

    fn begin_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO scrape_runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(&mut self, run_id: i64, summary: &RunSummary) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE scrape_runs SET status = ?1, finished_at = ?2, offers_seen = ?3,
             new_listings = ?4, failed_sources = ?5, failed_notifications = ?6 WHERE id = ?7",
            params![
                summary.status.to_db_string(),
                now,
                summary.offers_seen as i64,
                summary.new_listings as i64,
                summary.failed_sources as i64,
                summary.failed_notifications as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status, offers_seen, new_listings,
             failed_sources, failed_notifications FROM scrape_runs ORDER BY id DESC LIMIT 1",
        )?;

        let run = stmt
            .query_row([], |row| {
                Ok(RunRecord {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                    config_hash: row.get(3)?,
                    status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                        .unwrap_or(RunStatus::Failed),
                    offers_seen: row.get::<_, i64>(5)? as u64,
                    new_listings: row.get::<_, i64>(6)? as u64,
                    failed_sources: row.get::<_, i64>(7)? as u64,
                    failed_notifications: row.get::<_, i64>(8)? as u64,
                })
            })
            .optional()?;

        Ok(run)
    }
}
