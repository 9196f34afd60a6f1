//! Storage module for persisting crawl progress
//!
//! This module is the frontier store of the crawler:
//! - SQLite database initialization and schema management
//! - One crawl record per discovered URI, keyed by the absolute URI
//! - Pending work lists for each crawl wave
//! - Run tracking for resumption reporting

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::{ContentKind, CrawlStatus};
use crate::CrawlError;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(CrawlError)` - Failed to open the file or create the schema
pub fn open_storage(path: &Path) -> Result<SqliteStorage, CrawlError> {
    Ok(SqliteStorage::new(path)?)
}

/// Represents a crawl record in the database
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlRecord {
    pub uri: String,
    pub kind: ContentKind,
    pub status: CrawlStatus,
    pub expected_count: u64,
    pub discovered_at: String,
    pub completed_at: Option<String>,
    pub last_error: Option<String>,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub traversal: String,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}
