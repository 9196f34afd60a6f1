//! Mirror writer
//!
//! Fetched bodies are written to a temporary file in the target directory
//! and then persisted over the target, so readers never observe a
//! half-written payload. Concurrent writers of the same URI each persist
//! their own file; the last one wins.

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes `bytes` to `path`, creating parent directories as needed
pub async fn write_mirror(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&parent).await?;

    let target = path.to_path_buf();
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut file = NamedTempFile::new_in(&parent)?;
        file.write_all(&bytes)?;
        file.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
}
