//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! The connection sits behind a mutex: reads and writes from concurrent
//! workers are serialized through it.

use crate::state::{ContentKind, CrawlStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{CrawlRecord, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Mutex<Connection>,
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
    /// * `Err(StorageError)` - Failed to open database or create the schema
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

fn decode_error(column: usize, value: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        Type::Text,
        format!("unrecognized value '{}'", value).into(),
    )
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<CrawlRecord> {
    let kind: String = row.get(1)?;
    let status: String = row.get(2)?;
    let expected: i64 = row.get(3)?;

    Ok(CrawlRecord {
        uri: row.get(0)?,
        kind: ContentKind::from_db_string(&kind).ok_or_else(|| decode_error(1, kind))?,
        status: CrawlStatus::from_db_string(&status).ok_or_else(|| decode_error(2, status))?,
        expected_count: expected.max(0) as u64,
        discovered_at: row.get(4)?,
        completed_at: row.get(5)?,
        last_error: row.get(6)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&self, traversal: &str) -> StorageResult<i64> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO runs (started_at, traversal, status) VALUES (?1, ?2, ?3)",
            params![now, traversal, RunStatus::Running.to_db_string()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, started_at, finished_at, traversal, status FROM runs ORDER BY id DESC LIMIT 1",
        )?;

        let run = stmt
            .query_row([], |row| {
                Ok(RunRecord {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                    traversal: row.get(3)?,
                    status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                        .unwrap_or(RunStatus::Running),
                })
            })
            .optional()?;

        Ok(run)
    }

    fn complete_run(&self, run_id: i64) -> StorageResult<()> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Completed.to_db_string(), now, run_id],
        )?;
        Ok(())
    }

    // ===== Frontier =====

    fn seed(&self, uri: &str, kind: ContentKind, expected_count: u64) -> StorageResult<bool> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO tiles (uri, kind, status, expected_count, discovered_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                uri,
                kind.to_db_string(),
                CrawlStatus::Pending.to_db_string(),
                expected_count as i64,
                now
            ],
        )?;
        Ok(inserted == 1)
    }

    fn mark_done(&self, uri: &str) -> StorageResult<bool> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        let updated = conn.execute(
            "UPDATE tiles SET status = ?1, completed_at = COALESCE(completed_at, ?2), last_error = NULL
             WHERE uri = ?3",
            params![CrawlStatus::Done.to_db_string(), now, uri],
        )?;

        if updated == 0 {
            tracing::warn!("Cannot mark {} done: no such record", uri);
        }
        Ok(updated > 0)
    }

    fn record_failure(&self, uri: &str, message: &str) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE tiles SET last_error = ?1 WHERE uri = ?2 AND status = ?3",
            params![message, uri, CrawlStatus::Pending.to_db_string()],
        )?;
        Ok(())
    }

    fn pending_by_kind(&self, kind: ContentKind) -> StorageResult<Vec<(String, u64)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT uri, expected_count FROM tiles WHERE kind = ?1 AND status = ?2 ORDER BY rowid",
        )?;

        let pending = stmt
            .query_map(
                params![kind.to_db_string(), CrawlStatus::Pending.to_db_string()],
                |row| Ok((row.get(0)?, row.get::<_, i64>(1)?.max(0) as u64)),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(pending)
    }

    fn lookup(&self, uri: &str) -> StorageResult<Option<CrawlRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT uri, kind, status, expected_count, discovered_at, completed_at, last_error
             FROM tiles WHERE uri = ?1",
        )?;

        let record = stmt.query_row(params![uri], record_from_row).optional()?;
        Ok(record)
    }

    // ===== Statistics =====

    fn count_records(&self, kind: ContentKind, status: CrawlStatus) -> StorageResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tiles WHERE kind = ?1 AND status = ?2",
            params![kind.to_db_string(), status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_total(&self) -> StorageResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tiles", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
