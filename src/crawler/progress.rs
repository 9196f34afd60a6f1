//! Progress accounting
//!
//! `Progress` is a pair of atomic counters shared by every worker of a run.
//! The expected total is an approximation: it only grows as documents are
//! pre-scanned or parsed, so a deep tree keeps raising it while the crawl
//! advances.

use crate::crawler::transport::fetch_bytes;
use crate::tileset::{count_references, parse_tileset};
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use url::Url;

/// Log a progress line every this many completed references
const REPORT_INTERVAL: u64 = 100;

/// Shared crawl progress counters
#[derive(Debug, Default)]
pub struct Progress {
    expected: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    pub expected: u64,
    pub completed: u64,
    pub failed: u64,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_expected(&self, count: u64) {
        self.expected.fetch_add(count, Ordering::Relaxed);
    }

    /// Records one handled reference, whatever its outcome
    pub fn record_completed(&self) {
        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        if completed % REPORT_INTERVAL == 0 {
            let snapshot = self.snapshot();
            tracing::info!(
                "Progress: {}/{} references ({} failed)",
                snapshot.completed,
                snapshot.expected,
                snapshot.failed
            );
        }
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            expected: self.expected.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Fetches the document at `url` and counts its direct references
///
/// Only used for progress estimation: any failure is logged and counted as
/// zero, and the document body is discarded.
pub async fn prescan(client: &Client, url: &Url) -> u64 {
    let body = match fetch_bytes(client, url).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("Pre-scan of {} failed: {}", url, e);
            return 0;
        }
    };

    match parse_tileset(&body) {
        Ok(root) => count_references(&root, url),
        Err(e) => {
            tracing::warn!("Pre-scan of {} could not parse document: {}", url, e);
            0
        }
    }
}
