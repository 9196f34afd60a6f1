//! Local mirror path derivation

use ::url::Url;
use std::path::{Path, PathBuf};

/// File name used when a URL path ends in a directory
const DIRECTORY_INDEX: &str = "index";

/// Maps a URL onto a path under the mirror root
///
/// The URL's percent-encoded path segments are joined under `output_dir`; the
/// host is not part of the path. Empty, `.` and `..` segments are dropped so
/// the result always stays inside `output_dir`.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use tile_ripple::mirror_path;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/city/0/1.b3dm").unwrap();
/// assert_eq!(
///     mirror_path(Path::new("/out"), &url),
///     Path::new("/out/city/0/1.b3dm")
/// );
/// ```
pub fn mirror_path(output_dir: &Path, url: &Url) -> PathBuf {
    let mut path = output_dir.to_path_buf();
    let mut pushed = false;

    if let Some(segments) = url.path_segments() {
        for segment in segments {
            if segment.is_empty() || segment == "." || segment == ".." {
                continue;
            }
            path.push(segment);
            pushed = true;
        }
    }

    if !pushed || url.path().ends_with('/') {
        path.push(DIRECTORY_INDEX);
    }

    path
}
