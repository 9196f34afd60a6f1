//! Content reference resolution
//!
//! A tileset node names its content relative to the document it lives in.
//! Resolution follows RFC 3986 base/relative rules, so absolute, root-relative
//! and path-relative references all work. Classification only looks at the
//! suffix of the resolved path; query strings and fragments are ignored.

use crate::state::ContentKind;
use ::url::Url;

/// Resolves `reference` against `base` and classifies the result
///
/// # Arguments
///
/// * `base` - Absolute URL of the document containing the reference
/// * `reference` - The raw `content.uri` value
///
/// # Returns
///
/// * `Some((url, kind))` - The absolute URL and whether it is a document or a payload
/// * `None` - The reference does not parse, or its suffix is not recognized
///
/// # Example
///
/// ```
/// use tile_ripple::resolve;
/// use tile_ripple::state::ContentKind;
/// use url::Url;
///
/// let base = Url::parse("https://tiles.example.com/city/tileset.json").unwrap();
/// let (url, kind) = resolve(&base, "blocks/0.b3dm").unwrap();
/// assert_eq!(url.as_str(), "https://tiles.example.com/city/blocks/0.b3dm");
/// assert_eq!(kind, ContentKind::Leaf);
/// ```
pub fn resolve(base: &Url, reference: &str) -> Option<(Url, ContentKind)> {
    let resolved = match base.join(reference) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("Ignoring unresolvable reference {:?} in {}: {}", reference, base, e);
            return None;
        }
    };

    let kind = classify(&resolved)?;
    Some((resolved, kind))
}

/// Classifies an absolute URL by the extension of its last path segment
pub fn classify(url: &Url) -> Option<ContentKind> {
    let last_segment = url.path_segments()?.next_back()?;
    let (_, ext) = last_segment.rsplit_once('.')?;
    ContentKind::from_extension(ext)
}
