//! Tileset document handling
//!
//! This module contains:
//! - The ephemeral `TileNode` tree produced from one fetched document
//! - The document parser (JSON → `TileNode`)
//! - The tree walker that yields every resolvable content reference

mod node;
mod walk;

pub use node::{parse_tileset, TileNode, AXIS_CORRECTION};
pub use walk::{count_references, walk, Walk};
