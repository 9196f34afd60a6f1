//! Content kind classification for crawl records
use std::fmt;

/// What a content reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// A nested tileset document that is parsed and expanded
    SubTree,

    /// A binary tile payload, terminal in the traversal
    Leaf,
}

impl ContentKind {
    /// Document suffix that marks a reference as a nested tileset
    pub const DOCUMENT_EXTENSIONS: &'static [&'static str] = &["json"];

    /// Payload suffixes that mark a reference as a tile
    pub const LEAF_EXTENSIONS: &'static [&'static str] =
        &["b3dm", "pnts", "i3dm", "cmpt", "glb", "gltf"];

    /// Classifies a file extension, case-insensitively
    ///
    /// Returns `None` for extensions that are neither documents nor payloads.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        if Self::DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::SubTree)
        } else if Self::LEAF_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Leaf)
        } else {
            None
        }
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::SubTree => "subtree",
            Self::Leaf => "leaf",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "subtree" => Some(Self::SubTree),
            "leaf" => Some(Self::Leaf),
            _ => None,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
