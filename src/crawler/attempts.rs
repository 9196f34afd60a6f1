//! In-run attempt tracking
//!
//! Every URI handed to the network during one run is recorded here, whether
//! the scheduler dispatched it or a document expansion reached it inline. A
//! URI that failed is therefore not fetched a second time in the same run.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

/// URIs attempted during the current run
#[derive(Debug, Default)]
pub struct Attempts {
    uris: Mutex<HashSet<String>>,
}

impl Attempts {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        // The set stays consistent even if a holder panicked
        self.uris.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records `uri` as attempted; returns false if it already was
    pub fn insert(&self, uri: &str) -> bool {
        let mut uris = self.lock();
        if uris.contains(uri) {
            return false;
        }
        uris.insert(uri.to_string())
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.lock().contains(uri)
    }

    /// Number of distinct URIs attempted so far
    pub fn count(&self) -> usize {
        self.lock().len()
    }
}
