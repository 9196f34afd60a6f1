//! Configuration module for Tile-Ripple
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file, and layering command-line overrides on top of it.
//!
//! # Example
//!
//! ```no_run
//! use tile_ripple::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("tile-ripple.toml")).unwrap();
//! println!("Crawler will use {} workers", config.crawler.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, ConfigOverrides, CrawlerConfig, OutputConfig, RetryConfig, Traversal};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;
