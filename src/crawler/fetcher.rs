//! Per-URI fetch, mirror and expansion
//!
//! The `Fetcher` owns everything a worker needs to process one URI:
//! retrieve the body, write it to the mirror, and for documents parse and
//! expand the references found inside. Every failure is logged with the URI
//! and cause, stored with the record, and leaves the record `Pending`.

use crate::crawler::attempts::Attempts;
use crate::crawler::progress::{prescan, Progress};
use crate::crawler::retry::RetryPolicy;
use crate::crawler::transport::fetch_with_retry;
use crate::crawler::writer::write_mirror;
use crate::state::ContentKind;
use crate::storage::{Storage, StorageResult};
use crate::tileset::{parse_tileset, walk};
use crate::url::mirror_path;
use crate::CrawlError;
use futures::future::{BoxFuture, FutureExt};
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// What to do with sub-documents discovered while expanding a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubTreeMode {
    /// Pre-scan and record them as pending for a later wave
    Defer,

    /// Fetch and expand them immediately
    Recurse,
}

/// Counts of what happened to the references of one document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Leaf payloads fetched
    pub leaves: usize,

    /// Sub-documents fetched (depth-first) or recorded for later (breadth-first)
    pub subtrees: usize,

    /// References already done, or pointing back at an ancestor
    pub skipped: usize,

    /// References that failed
    pub failed: usize,

    /// References already attempted earlier in this run and still pending
    pub unfinished: usize,
}

enum ChildOutcome {
    Fetched,
    Deferred,
    Skipped,
    Unfinished,
}

/// Fetches, mirrors and expands tileset content
pub struct Fetcher {
    client: Client,
    storage: Arc<dyn Storage>,
    output_dir: PathBuf,
    retry: RetryPolicy,
    progress: Arc<Progress>,
    attempts: Arc<Attempts>,
}

impl Fetcher {
    pub fn new(
        client: Client,
        storage: Arc<dyn Storage>,
        output_dir: PathBuf,
        retry: RetryPolicy,
        progress: Arc<Progress>,
        attempts: Arc<Attempts>,
    ) -> Self {
        Self {
            client,
            storage,
            output_dir,
            retry,
            progress,
            attempts,
        }
    }

    pub fn progress(&self) -> &Arc<Progress> {
        &self.progress
    }

    /// Logs `error`, stores it with the record of `url`, and hands it back
    fn fail(&self, url: &Url, error: CrawlError) -> CrawlError {
        tracing::error!("Failed {}: {}", url, error);
        if let Err(e) = self.storage.record_failure(url.as_str(), &error.to_string()) {
            tracing::error!("Could not record failure for {}: {}", url, e);
        }
        self.progress.record_failed();
        error
    }

    fn store<T>(&self, url: &Url, result: StorageResult<T>) -> Result<T, CrawlError> {
        result.map_err(|e| self.fail(url, e.into()))
    }

    async fn mirror(&self, url: &Url, bytes: &[u8]) -> Result<(), CrawlError> {
        let path = mirror_path(&self.output_dir, url);
        write_mirror(&path, bytes)
            .await
            .map_err(|source| CrawlError::MirrorWrite {
                url: url.to_string(),
                path,
                source,
            })
    }

    /// Fetches a leaf payload, mirrors it and marks its record done
    ///
    /// # Returns
    ///
    /// The payload size in bytes.
    pub async fn fetch_leaf(&self, url: &Url) -> Result<usize, CrawlError> {
        let started = Instant::now();

        let bytes = fetch_with_retry(&self.client, url, &self.retry)
            .await
            .map_err(|e| self.fail(url, e.into()))?;
        self.mirror(url, &bytes)
            .await
            .map_err(|e| self.fail(url, e))?;
        self.store(url, self.storage.mark_done(url.as_str()))?;

        report(ContentKind::Leaf, url, started, bytes.len());
        Ok(bytes.len())
    }

    /// Fetches a tileset document, mirrors it and expands its references
    ///
    /// Leaves are fetched inline. Sub-documents are handled per `mode`.
    ///
    /// A document whose mirror write failed is still expanded but stays
    /// `Pending`. In [`SubTreeMode::Recurse`] the document is only marked done
    /// when every reference below it completed.
    pub fn fetch_document<'a>(
        &'a self,
        url: &'a Url,
        mode: SubTreeMode,
    ) -> BoxFuture<'a, Result<Expansion, CrawlError>> {
        self.expand_document(url, mode, Vec::new())
    }

    fn expand_document<'a>(
        &'a self,
        url: &'a Url,
        mode: SubTreeMode,
        mut ancestors: Vec<String>,
    ) -> BoxFuture<'a, Result<Expansion, CrawlError>> {
        async move {
            let started = Instant::now();

            let bytes = fetch_with_retry(&self.client, url, &self.retry)
                .await
                .map_err(|e| self.fail(url, e.into()))?;
            let size = bytes.len();
            let mirror_error = self.mirror(url, &bytes).await.err();

            let root = parse_tileset(&bytes).map_err(|source| {
                self.fail(
                    url,
                    CrawlError::Tileset {
                        url: url.to_string(),
                        source,
                    },
                )
            })?;
            drop(bytes);
            let references: Vec<_> = walk(&root, url).collect();
            drop(root);

            tracing::debug!("{} holds {} reference(s)", url, references.len());
            if mode == SubTreeMode::Recurse && !ancestors.is_empty() {
                self.progress.add_expected(references.len() as u64);
            }

            ancestors.push(url.to_string());
            let mut expansion = Expansion::default();
            for (kind, child) in &references {
                let outcome = match kind {
                    ContentKind::Leaf => self.expand_leaf(child).await,
                    ContentKind::SubTree => self.expand_subtree(child, mode, &ancestors).await,
                };
                self.progress.record_completed();

                match outcome {
                    Ok(ChildOutcome::Fetched) if *kind == ContentKind::Leaf => expansion.leaves += 1,
                    Ok(ChildOutcome::Fetched) | Ok(ChildOutcome::Deferred) => {
                        expansion.subtrees += 1
                    }
                    Ok(ChildOutcome::Skipped) => expansion.skipped += 1,
                    Ok(ChildOutcome::Unfinished) => expansion.unfinished += 1,
                    Err(_) => expansion.failed += 1,
                }
            }

            if let Some(e) = mirror_error {
                return Err(self.fail(url, e));
            }

            let incomplete = expansion.failed + expansion.unfinished;
            if mode == SubTreeMode::Recurse && incomplete > 0 {
                return Err(self.fail(
                    url,
                    CrawlError::IncompleteSubtree {
                        url: url.to_string(),
                        failed: incomplete,
                    },
                ));
            }

            self.store(url, self.storage.mark_done(url.as_str()))?;
            report(ContentKind::SubTree, url, started, size);
            Ok(expansion)
        }
        .boxed()
    }

    async fn expand_leaf(&self, url: &Url) -> Result<ChildOutcome, CrawlError> {
        match self.store(url, self.storage.lookup(url.as_str()))? {
            Some(record) if record.status.is_done() => return Ok(ChildOutcome::Skipped),
            Some(_) => {}
            None => {
                self.store(url, self.storage.seed(url.as_str(), ContentKind::Leaf, 0))?;
            }
        }

        if !self.attempts.insert(url.as_str()) {
            tracing::debug!("{} already attempted in this run", url);
            return Ok(ChildOutcome::Unfinished);
        }

        self.fetch_leaf(url).await?;
        Ok(ChildOutcome::Fetched)
    }

    async fn expand_subtree(
        &self,
        url: &Url,
        mode: SubTreeMode,
        ancestors: &[String],
    ) -> Result<ChildOutcome, CrawlError> {
        if ancestors.iter().any(|a| a == url.as_str()) {
            tracing::warn!("Skipping {}: it references one of its ancestors", url);
            return Ok(ChildOutcome::Skipped);
        }

        let existing = self.store(url, self.storage.lookup(url.as_str()))?;
        if existing.as_ref().is_some_and(|r| r.status.is_done()) {
            return Ok(ChildOutcome::Skipped);
        }

        match mode {
            SubTreeMode::Defer => {
                if existing.is_none() {
                    let expected = prescan(&self.client, url).await;
                    self.store(
                        url,
                        self.storage.seed(url.as_str(), ContentKind::SubTree, expected),
                    )?;
                }
                Ok(ChildOutcome::Deferred)
            }
            SubTreeMode::Recurse => {
                if existing.is_none() {
                    self.store(url, self.storage.seed(url.as_str(), ContentKind::SubTree, 0))?;
                }
                if !self.attempts.insert(url.as_str()) {
                    tracing::debug!("{} already attempted in this run", url);
                    return Ok(ChildOutcome::Unfinished);
                }
                self.expand_document(url, mode, ancestors.to_vec()).await?;
                Ok(ChildOutcome::Fetched)
            }
        }
    }
}

/// Prints the per-URI completion line
fn report(kind: ContentKind, url: &Url, started: Instant, size: usize) {
    println!(
        "{} {}, {:.3}s, {:.2} kb, {}",
        kind,
        chrono::Local::now().format("%H:%M:%S"),
        started.elapsed().as_secs_f64(),
        size as f64 / 1024.0,
        url
    );
}
