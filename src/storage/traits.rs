//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::{ContentKind, CrawlStatus};
use crate::storage::{CrawlRecord, RunRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for frontier store implementations
///
/// All methods take `&self`; implementations serialize writes internally so
/// a single store can be shared by every worker.
pub trait Storage: Send + Sync {
    // ===== Run Management =====

    /// Creates a new crawl run and returns its ID
    fn create_run(&self, traversal: &str) -> StorageResult<i64>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&self, run_id: i64) -> StorageResult<()>;

    // ===== Frontier =====

    /// Inserts a `Pending` record if `uri` is new
    ///
    /// An existing record is left untouched, whatever its status.
    ///
    /// # Returns
    ///
    /// `true` if a record was inserted, `false` if the URI was already known
    fn seed(&self, uri: &str, kind: ContentKind, expected_count: u64) -> StorageResult<bool>;

    /// Transitions a record to `Done`
    ///
    /// # Returns
    ///
    /// `false` if no record exists for `uri`
    fn mark_done(&self, uri: &str) -> StorageResult<bool>;

    /// Stores the most recent failure message for a record that stays `Pending`
    fn record_failure(&self, uri: &str, message: &str) -> StorageResult<()>;

    /// Gets `(uri, expected_count)` for every `Pending` record of `kind`
    fn pending_by_kind(&self, kind: ContentKind) -> StorageResult<Vec<(String, u64)>>;

    /// Gets a record by URI
    fn lookup(&self, uri: &str) -> StorageResult<Option<CrawlRecord>>;

    // ===== Statistics =====

    /// Counts records of a kind in a status
    fn count_records(&self, kind: ContentKind, status: CrawlStatus) -> StorageResult<u64>;

    /// Gets total record count
    fn count_total(&self) -> StorageResult<u64>;
}
