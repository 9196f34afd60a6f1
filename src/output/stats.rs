//! Statistics generation from crawl database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::state::{ContentKind, CrawlStatus};
use crate::storage::{RunRecord, Storage};
use crate::CrawlError;
use std::collections::HashMap;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Total number of records in the store
    pub total_records: u64,

    /// Count of records by kind and status
    pub records: HashMap<(ContentKind, CrawlStatus), u64>,

    /// Most recent run, if any
    pub latest_run: Option<RunRecord>,

    /// Duration of the latest run when it has finished
    pub duration_seconds: Option<u64>,
}

impl CrawlStatistics {
    pub fn count(&self, kind: ContentKind, status: CrawlStatus) -> u64 {
        self.records.get(&(kind, status)).copied().unwrap_or(0)
    }

    pub fn done(&self) -> u64 {
        self.count(ContentKind::SubTree, CrawlStatus::Done)
            + self.count(ContentKind::Leaf, CrawlStatus::Done)
    }
}

fn run_duration(run: &RunRecord) -> Option<u64> {
    let started = run.started_at.parse::<chrono::DateTime<chrono::Utc>>().ok()?;
    let finished = run
        .finished_at
        .as_ref()?
        .parse::<chrono::DateTime<chrono::Utc>>()
        .ok()?;
    u64::try_from((finished - started).num_seconds()).ok()
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(CrawlError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<CrawlStatistics, CrawlError> {
    let total_records = storage.count_total()?;

    let mut records = HashMap::new();
    for kind in [ContentKind::SubTree, ContentKind::Leaf] {
        for status in CrawlStatus::all_statuses() {
            let count = storage.count_records(kind, status)?;
            records.insert((kind, status), count);
        }
    }

    let latest_run = storage.get_latest_run()?;
    let duration_seconds = latest_run.as_ref().and_then(run_duration);

    Ok(CrawlStatistics {
        total_records,
        records,
        latest_run,
        duration_seconds,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    match &stats.latest_run {
        Some(run) => {
            println!("Latest run:");
            println!("  Id: {}", run.id);
            println!("  Traversal: {}", run.traversal);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            if let Some(seconds) = stats.duration_seconds {
                println!("  Duration: {}s", seconds);
            }
        }
        None => println!("No crawl runs recorded"),
    }
    println!();

    println!("Records:");
    for kind in [ContentKind::SubTree, ContentKind::Leaf] {
        let done = stats.count(kind, CrawlStatus::Done);
        let pending = stats.count(kind, CrawlStatus::Pending);
        println!("  {}: {} done, {} pending", kind, done, pending);
    }
    println!();

    let completion = if stats.total_records > 0 {
        (stats.done() as f64 / stats.total_records as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Completion: {:.1}% ({} / {} records done)",
        completion,
        stats.done(),
        stats.total_records
    );
}
