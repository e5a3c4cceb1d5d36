//! Output file replacement.
//!
//! Files are written to a temporary sibling and renamed over the target,
//! so a failed write never leaves a half-written README behind.

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
#[error("failed to write {}: {source}", path.display())]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl WriteError {
    fn new(path: &Path, source: std::io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Atomically replace `path` with `contents`.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), WriteError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| WriteError::new(path, e))?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| WriteError::new(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| WriteError::new(path, e))?;
    tmp.persist(path).map_err(|e| WriteError::new(path, e.error))?;

    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}
