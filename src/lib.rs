//! Tile-Ripple: a resumable 3D Tiles mirror
//!
//! This crate crawls hierarchical tileset documents over HTTP, mirrors every
//! document and tile payload to a local directory, and records crawl progress
//! in SQLite so an interrupted run picks up where it stopped.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod tileset;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Tile-Ripple operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Tileset error for {url}: {source}")]
    Tileset { url: String, source: TilesetError },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Failed to mirror {url} to {}: {source}", path.display())]
    MirrorWrite {
        url: String,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Incomplete subtree under {url}: {failed} reference(s) not completed")]
    IncompleteSubtree { url: String, failed: usize },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of a single network retrieval
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport failure for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("empty body for {url}")]
    EmptyBody { url: String },
}

impl FetchError {
    /// The URL the failed request targeted
    pub fn url(&self) -> &str {
        match self {
            Self::Transport { url, .. } | Self::Status { url, .. } | Self::EmptyBody { url } => url,
        }
    }
}

/// Tileset document errors
#[derive(Debug, Error)]
pub enum TilesetError {
    #[error("malformed tileset document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("transform must have 16 elements, got {0}")]
    InvalidTransform(usize),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid root URL: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Tile-Ripple operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use state::{ContentKind, CrawlStatus};
pub use tileset::{walk, TileNode};
pub use url::{mirror_path, resolve};
