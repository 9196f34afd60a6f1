//! Tree walker for content references
//!
//! Walks a parsed tileset in depth-first pre-order and yields each content
//! reference that resolves to a known kind. Nothing is fetched here.

use crate::state::ContentKind;
use crate::tileset::TileNode;
use crate::url::resolve;
use ::url::Url;

/// Lazy pre-order iterator over the content references of a node tree
pub struct Walk<'a> {
    base: &'a Url,
    stack: Vec<&'a TileNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (ContentKind, Url);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            // Reverse so the first child is visited first
            self.stack.extend(node.children.iter().rev());

            if let Some(reference) = node.content.as_deref() {
                if let Some((url, kind)) = resolve(self.base, reference) {
                    return Some((kind, url));
                }
            }
        }
        None
    }
}

/// Walks `root`, resolving references against the document URL `base`
///
/// # Example
///
/// ```
/// use tile_ripple::tileset::{parse_tileset, walk};
/// use url::Url;
///
/// let doc = br#"{"root":{"children":[{"content":{"uri":"a.b3dm"}}]}}"#;
/// let root = parse_tileset(doc).unwrap();
/// let base = Url::parse("https://example.com/t/tileset.json").unwrap();
///
/// let refs: Vec<_> = walk(&root, &base).map(|(_, url)| url.to_string()).collect();
/// assert_eq!(refs, vec!["https://example.com/t/a.b3dm"]);
/// ```
pub fn walk<'a>(root: &'a TileNode, base: &'a Url) -> Walk<'a> {
    Walk {
        base,
        stack: vec![root],
    }
}

/// Counts the references in one document without following sub-documents
///
/// Each nested tileset counts as a single reference.
pub fn count_references(root: &TileNode, base: &Url) -> u64 {
    walk(root, base).count() as u64
}
