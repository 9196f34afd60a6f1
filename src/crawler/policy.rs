//! Traversal policies
//!
//! The scheduler only asks a policy two things: which documents make up the
//! next wave, and how to expand one of them.

use crate::config::Traversal;
use crate::crawler::attempts::Attempts;
use crate::crawler::fetcher::{Expansion, Fetcher, SubTreeMode};
use crate::state::ContentKind;
use crate::storage::{Storage, StorageResult};
use crate::CrawlError;
use url::Url;

/// How the crawl walks the tileset hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraversalPolicy {
    /// Level by level: every pending document not yet attempted in this run
    /// forms the next wave, and sub-documents found while expanding are
    /// recorded for a later wave.
    BreadthFirst,

    /// One wave of root documents, each expanded recursively.
    DepthFirst { roots: Vec<String> },
}

impl TraversalPolicy {
    pub fn new(traversal: Traversal, roots: &[Url]) -> Self {
        match traversal {
            Traversal::BreadthFirst => Self::BreadthFirst,
            Traversal::DepthFirst => Self::DepthFirst {
                roots: roots.iter().map(|u| u.to_string()).collect(),
            },
        }
    }

    pub fn traversal(&self) -> Traversal {
        match self {
            Self::BreadthFirst => Traversal::BreadthFirst,
            Self::DepthFirst { .. } => Traversal::DepthFirst,
        }
    }

    fn mode(&self) -> SubTreeMode {
        match self {
            Self::BreadthFirst => SubTreeMode::Defer,
            Self::DepthFirst { .. } => SubTreeMode::Recurse,
        }
    }

    /// Documents to dispatch in wave number `wave`, with their expected
    /// reference counts
    ///
    /// An empty result ends the crawl.
    pub fn next_wave(
        &self,
        storage: &dyn Storage,
        wave: u32,
        attempted: &Attempts,
    ) -> StorageResult<Vec<(String, u64)>> {
        match self {
            Self::BreadthFirst => Ok(storage
                .pending_by_kind(ContentKind::SubTree)?
                .into_iter()
                .filter(|(uri, _)| !attempted.contains(uri))
                .collect()),
            Self::DepthFirst { .. } if wave > 0 => Ok(Vec::new()),
            Self::DepthFirst { roots } => {
                let mut batch: Vec<(String, u64)> = Vec::new();
                for root in roots {
                    if attempted.contains(root) || batch.iter().any(|(uri, _)| uri == root) {
                        continue;
                    }
                    match storage.lookup(root)? {
                        Some(record) if record.status.is_done() => {}
                        Some(record) => batch.push((root.clone(), record.expected_count)),
                        None => batch.push((root.clone(), 0)),
                    }
                }
                Ok(batch)
            }
        }
    }

    /// Expands one document of a wave
    pub async fn expand(&self, fetcher: &Fetcher, url: &Url) -> Result<Expansion, CrawlError> {
        fetcher.fetch_document(url, self.mode()).await
    }
}
