//! Wave scheduler
//!
//! This module handles:
//! - The one-time sweep of leaves left pending by earlier runs
//! - Dispatching waves of documents to a bounded worker pool
//! - Draining each wave completely before the next one is computed

use crate::config::Config;
use crate::crawler::attempts::Attempts;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::policy::TraversalPolicy;
use crate::crawler::progress::{Progress, ProgressSnapshot};
use crate::crawler::retry::RetryPolicy;
use crate::state::ContentKind;
use crate::storage::Storage;
use crate::CrawlError;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Outcome of a scheduler run
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    /// Pending leaves swept before the first wave
    pub leaves_swept: usize,

    /// Number of documents dispatched in each wave
    pub wave_sizes: Vec<usize>,

    /// Dispatched units that completed
    pub succeeded: usize,

    /// Dispatched units that failed and stay pending
    pub failed: usize,

    /// Distinct URIs fetched or dispatched during the run
    pub attempted: usize,

    pub progress: ProgressSnapshot,

    pub elapsed: Duration,
}

impl CrawlSummary {
    pub fn waves(&self) -> usize {
        self.wave_sizes.len()
    }

    /// True when any URI failed, including leaves fetched inline while a
    /// document was expanded
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.progress.failed > 0
    }
}

#[derive(Debug, Clone, Copy)]
enum Job {
    Leaf,
    Document,
}

/// Dispatches crawl work to a bounded pool of concurrent workers
pub struct Scheduler {
    fetcher: Arc<Fetcher>,
    storage: Arc<dyn Storage>,
    policy: Arc<TraversalPolicy>,
    semaphore: Arc<Semaphore>,
    progress: Arc<Progress>,

    /// Shared with the fetcher, so a failure is not retried in a later
    /// wave or by another expansion of the same run
    attempts: Arc<Attempts>,
}

impl Scheduler {
    pub fn new(
        config: &Config,
        client: Client,
        storage: Arc<dyn Storage>,
        policy: TraversalPolicy,
    ) -> Self {
        let progress = Arc::new(Progress::new());
        let attempts = Arc::new(Attempts::new());
        let fetcher = Fetcher::new(
            client,
            Arc::clone(&storage),
            config.output.directory.clone(),
            RetryPolicy::from_config(&config.retry),
            Arc::clone(&progress),
            Arc::clone(&attempts),
        );

        Self {
            fetcher: Arc::new(fetcher),
            storage,
            policy: Arc::new(policy),
            semaphore: Arc::new(Semaphore::new(config.crawler.workers.max(1))),
            progress,
            attempts,
        }
    }

    /// Runs the leaf sweep and then waves until the policy has nothing left
    pub async fn run(&mut self) -> Result<CrawlSummary, CrawlError> {
        let started = Instant::now();
        let mut summary = CrawlSummary::default();

        let leaves = self.storage.pending_by_kind(ContentKind::Leaf)?;
        if !leaves.is_empty() {
            tracing::info!("Sweeping {} pending leaves from earlier runs", leaves.len());
            self.progress.add_expected(leaves.len() as u64);
            let (succeeded, failed) = self.dispatch(leaves, Job::Leaf).await;
            summary.leaves_swept = succeeded + failed;
            summary.succeeded += succeeded;
            summary.failed += failed;
        }

        let mut wave = 0u32;
        loop {
            let documents = self
                .policy
                .next_wave(self.storage.as_ref(), wave, &self.attempts)?;
            if documents.is_empty() {
                break;
            }

            tracing::info!(
                "Starting {} wave {}: {} document(s)",
                self.policy.traversal(),
                wave,
                documents.len()
            );
            for (_, expected) in &documents {
                self.progress.add_expected(*expected);
            }

            let size = documents.len();
            let (succeeded, failed) = self.dispatch(documents, Job::Document).await;
            summary.wave_sizes.push(size);
            summary.succeeded += succeeded;
            summary.failed += failed;

            let snapshot = self.progress.snapshot();
            tracing::info!(
                "Wave {} finished: {} ok, {} failed, progress {}/{}",
                wave,
                succeeded,
                failed,
                snapshot.completed,
                snapshot.expected
            );
            wave += 1;
        }

        summary.attempted = self.attempts.count();
        summary.progress = self.progress.snapshot();
        summary.elapsed = started.elapsed();
        Ok(summary)
    }

    /// Dispatches every item to the worker pool and waits for all of them
    ///
    /// # Returns
    ///
    /// `(succeeded, failed)` counts.
    async fn dispatch(&mut self, items: Vec<(String, u64)>, job: Job) -> (usize, usize) {
        let mut tasks = JoinSet::new();
        let mut failed = 0;

        for (uri, _) in items {
            if !self.attempts.insert(&uri) {
                continue;
            }

            let url = match Url::parse(&uri) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Skipping unparseable stored URI {}: {}", uri, e);
                    failed += 1;
                    continue;
                }
            };

            let Ok(permit) = Arc::clone(&self.semaphore).acquire_owned().await else {
                tracing::error!("Worker pool closed, {} not dispatched", url);
                failed += 1;
                continue;
            };

            let fetcher = Arc::clone(&self.fetcher);
            let policy = Arc::clone(&self.policy);
            tasks.spawn(async move {
                let _permit = permit;
                match job {
                    Job::Leaf => {
                        let ok = fetcher.fetch_leaf(&url).await.is_ok();
                        fetcher.progress().record_completed();
                        ok
                    }
                    Job::Document => match policy.expand(&fetcher, &url).await {
                        Ok(expansion) => {
                            tracing::debug!(
                                "Expanded {}: {} leaves, {} sub-documents, {} skipped, {} failed, {} unfinished",
                                url,
                                expansion.leaves,
                                expansion.subtrees,
                                expansion.skipped,
                                expansion.failed,
                                expansion.unfinished
                            );
                            true
                        }
                        Err(_) => false,
                    },
                }
            });
        }

        let mut succeeded = 0;
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(true) => succeeded += 1,
                Ok(false) => failed += 1,
                Err(e) => {
                    tracing::error!("Worker task panicked: {}", e);
                    failed += 1;
                }
            }
        }

        (succeeded, failed)
    }
}
