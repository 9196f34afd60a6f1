//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `ContentKind`: whether a URI names a nested tileset document or a tile payload
//! - `CrawlStatus`: the monotonic `Pending` → `Done` lifecycle of a crawl record

mod content_kind;
mod crawl_status;

// Re-export main types
pub use content_kind::ContentKind;
pub use crawl_status::CrawlStatus;
