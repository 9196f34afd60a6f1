//! Crawler module for tileset fetching and mirroring
//!
//! This module contains the core crawling logic, including:
//! - HTTP transport with retry logic
//! - Per-URI fetch, mirror and expansion
//! - Traversal policies and wave scheduling
//! - Overall crawl coordination

mod attempts;
mod coordinator;
mod fetcher;
mod policy;
mod progress;
mod retry;
mod scheduler;
mod transport;
mod writer;

pub use attempts::Attempts;
pub use coordinator::{parse_roots, run_crawl, Coordinator};
pub use fetcher::{Expansion, Fetcher, SubTreeMode};
pub use policy::TraversalPolicy;
pub use progress::{prescan, Progress, ProgressSnapshot};
pub use retry::{classify_failure, FailureType, RetryDecision, RetryPolicy};
pub use scheduler::{CrawlSummary, Scheduler};
pub use transport::{build_http_client, fetch_bytes, fetch_with_retry};
pub use writer::write_mirror;
