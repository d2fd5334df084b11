//! Transient file removal.

use std::path::PathBuf;

/// Remove each path, best effort. A failed removal is logged and does not
/// affect the remaining paths; a missing file is a quiet no-op.
pub async fn remove_files(paths: &[PathBuf]) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "removed transient file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "transient file already gone");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove file");
            }
        }
    }
}
