//! Streaming file download.

use std::path::Path;

use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("download failed: {status}")]
    Status { status: reqwest::StatusCode },

    #[error("writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Stream `url` into `dest`, creating or truncating the destination file.
/// Returns the number of bytes written.
pub async fn download(
    http: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> Result<u64, DownloadError> {
    let mut response = http.get(url).send().await?;
    if !response.status().is_success() {
        return Err(DownloadError::Status {
            status: response.status(),
        });
    }

    let io_err = |source| DownloadError::Io {
        path: dest.display().to_string(),
        source,
    };

    let mut file = tokio::fs::File::create(dest).await.map_err(io_err)?;

    let mut written: u64 = 0;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await.map_err(io_err)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(io_err)?;

    Ok(written)
}
