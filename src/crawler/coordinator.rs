//! Crawler coordinator - main crawl orchestration logic
//!
//! This module ties a crawl run together:
//! - Preparing the output directory and opening the store
//! - Recording the run and noticing interrupted ones
//! - Seeding root documents
//! - Running the scheduler and closing the run

use crate::config::Config;
use crate::crawler::policy::TraversalPolicy;
use crate::crawler::progress::prescan;
use crate::crawler::scheduler::{CrawlSummary, Scheduler};
use crate::crawler::transport::build_http_client;
use crate::state::ContentKind;
use crate::storage::{open_storage, RunStatus, SqliteStorage, Storage};
use crate::{ConfigError, CrawlError};
use reqwest::Client;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    storage: Arc<SqliteStorage>,
    client: Client,
    run_id: i64,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Failing to create the output directory or open the store is fatal.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(CrawlError)` - Failed to initialize
    pub fn new(config: Config) -> Result<Self, CrawlError> {
        std::fs::create_dir_all(&config.output.directory)?;
        let storage = open_storage(&config.output.database_path())?;

        match storage.get_latest_run()? {
            Some(latest) if latest.status == RunStatus::Running => {
                tracing::info!(
                    "Run {} ({}) was interrupted, resuming from stored state",
                    latest.id,
                    latest.traversal
                );
            }
            Some(_) => tracing::info!("Continuing from stored state"),
            None => tracing::info!("No previous runs found, starting fresh"),
        }

        let run_id = storage.create_run(config.crawler.traversal.as_str())?;
        let client = build_http_client(&config.crawler)?;

        Ok(Self {
            config,
            storage: Arc::new(storage),
            client,
            run_id,
        })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Records each root as a pending document unless it is already known
    ///
    /// Per-root failures are logged and do not stop the others.
    pub async fn seed_roots(&self, roots: &[Url]) {
        for root in roots {
            match self.storage.lookup(root.as_str()) {
                Ok(Some(record)) if record.status.is_done() => {
                    println!(" {} already fetched", root);
                }
                Ok(Some(record)) => {
                    println!(
                        "url:{}, children:{}, status:{}",
                        root, record.expected_count, record.status
                    );
                }
                Ok(None) => {
                    let children = prescan(&self.client, root).await;
                    match self
                        .storage
                        .seed(root.as_str(), ContentKind::SubTree, children)
                    {
                        Ok(_) => println!(
                            "url:{}, children:{}, status:{}",
                            root,
                            children,
                            crate::CrawlStatus::Pending
                        ),
                        Err(e) => tracing::error!("Failed to seed root {}: {}", root, e),
                    }
                }
                Err(e) => tracing::error!("Failed to look up root {}: {}", root, e),
            }
        }
    }

    /// Runs the crawl from `roots` until no work is left
    pub async fn run(&mut self, roots: &[Url]) -> Result<CrawlSummary, CrawlError> {
        let started = Instant::now();
        tracing::info!(
            "Starting crawl run {}: {} root(s), {}, {} worker(s)",
            self.run_id,
            roots.len(),
            self.config.crawler.traversal,
            self.config.crawler.workers
        );

        self.seed_roots(roots).await;

        let policy = TraversalPolicy::new(self.config.crawler.traversal, roots);
        let storage: Arc<dyn Storage> = self.storage.clone();
        let mut scheduler = Scheduler::new(&self.config, self.client.clone(), storage, policy);
        let summary = scheduler.run().await?;

        self.storage.complete_run(self.run_id)?;

        tracing::info!(
            "Crawl run {} completed: {} ok, {} failed, {} failure(s) recorded, {} wave(s)",
            self.run_id,
            summary.succeeded,
            summary.failed,
            summary.progress.failed,
            summary.waves()
        );
        println!(
            "finished, consuming : {:.3}s",
            started.elapsed().as_secs_f64()
        );

        Ok(summary)
    }
}

/// Parses root URLs given on the command line
///
/// Only absolute `http` and `https` URLs are accepted.
pub fn parse_roots(roots: &[String]) -> Result<Vec<Url>, CrawlError> {
    if roots.is_empty() {
        return Err(ConfigError::Validation("at least one root URL is required".to_string()).into());
    }

    roots
        .iter()
        .map(|raw| -> Result<Url, CrawlError> {
            let url = Url::parse(raw)
                .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", raw, e)))?;
            match url.scheme() {
                "http" | "https" => Ok(url),
                other => Err(ConfigError::InvalidUrl(format!(
                    "{}: unsupported scheme '{}'",
                    raw, other
                ))
                .into()),
            }
        })
        .collect()
}

/// Runs a complete crawl from the given root URLs
pub async fn run_crawl(config: Config, roots: &[String]) -> Result<CrawlSummary, CrawlError> {
    let roots = parse_roots(roots)?;
    let mut coordinator = Coordinator::new(config)?;
    coordinator.run(&roots).await
}
