//! Output module for reporting on a crawl store
//!
//! This module handles:
//! - Loading record counts and the latest run from storage
//! - Printing them for the `--stats` command

pub mod stats;

pub use stats::{load_statistics, print_statistics, CrawlStatistics};
