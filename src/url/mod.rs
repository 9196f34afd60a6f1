//! URL handling module for Tile-Ripple
//!
//! This module resolves content references against the document that holds
//! them, classifies the result by suffix, and maps URLs onto the local mirror.

mod mirror;
mod resolve;

// Re-export main functions
pub use mirror::mirror_path;
pub use resolve::{classify, resolve};
