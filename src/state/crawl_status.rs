/// Crawl status definitions
///
/// A record starts `Pending` when it is discovered and moves to `Done` exactly
/// once. There is no transition back.
use std::fmt;

/// Represents the crawl status of a single URI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlStatus {
    /// Discovered but not yet fetched (or fetched with a failure)
    Pending,

    /// Fetched and mirrored; for documents, also expanded
    Done,
}

impl CrawlStatus {
    /// Returns true if the status is terminal
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "done" => Some(Self::Done),
            _ => None,
        }
    }

    /// Returns all statuses
    pub fn all_statuses() -> Vec<Self> {
        vec![Self::Pending, Self::Done]
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
