//! Tile node tree and document parser
//!
//! Only the structure the crawler needs is kept: transform, content reference
//! and children. Bounding volumes, geometric error and extensions are skipped.

use crate::TilesetError;
use serde::Deserialize;

/// Y-up to Z-up rotation, column-major
///
/// Used when a tile carries no transform or an all-zero one.
pub const AXIS_CORRECTION: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, -1.0, 0.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// One node of a parsed tileset
#[derive(Debug, Clone, PartialEq)]
pub struct TileNode {
    /// Column-major 4x4 affine transform
    pub transform: [f64; 16],

    /// Raw content reference, relative to the containing document
    pub content: Option<String>,

    /// Child nodes, in document order
    pub children: Vec<TileNode>,
}

impl TileNode {
    /// Creates a node with the default transform
    pub fn new(content: Option<String>, children: Vec<TileNode>) -> Self {
        Self {
            transform: AXIS_CORRECTION,
            content,
            children,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTileset {
    root: RawTile,
}

#[derive(Debug, Deserialize)]
struct RawTile {
    #[serde(default)]
    transform: Option<Vec<f64>>,
    #[serde(default)]
    content: Option<RawContent>,
    #[serde(default)]
    children: Vec<RawTile>,
}

#[derive(Debug, Deserialize)]
struct RawContent {
    #[serde(default)]
    uri: Option<String>,
    // Pre-1.0 tilesets name the reference `url`
    #[serde(default)]
    url: Option<String>,
}

impl RawTile {
    fn into_node(self) -> Result<TileNode, TilesetError> {
        let transform = match self.transform {
            None => AXIS_CORRECTION,
            Some(values) => {
                let matrix: [f64; 16] = values
                    .try_into()
                    .map_err(|v: Vec<f64>| TilesetError::InvalidTransform(v.len()))?;
                if matrix.iter().all(|v| *v == 0.0) {
                    AXIS_CORRECTION
                } else {
                    matrix
                }
            }
        };

        let content = self
            .content
            .and_then(|c| c.uri.or(c.url))
            .filter(|r| !r.is_empty());

        let children = self
            .children
            .into_iter()
            .map(RawTile::into_node)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TileNode {
            transform,
            content,
            children,
        })
    }
}

/// Parses a tileset document and returns its root node
///
/// # Arguments
///
/// * `bytes` - The raw document body
///
/// # Returns
///
/// * `Ok(TileNode)` - The root of the node tree
/// * `Err(TilesetError)` - The body is not a well-formed tileset
pub fn parse_tileset(bytes: &[u8]) -> Result<TileNode, TilesetError> {
    let raw: RawTileset = serde_json::from_slice(bytes)?;
    raw.root.into_node()
}
