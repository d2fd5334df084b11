//! Per-message conversion pipeline.
//!
//! One job runs the full sequence for a single media-bearing message:
//! locate the file, download it unless it is already on the local
//! filesystem (self-hosted Bot API server), convert it to opus, send the
//! result back as a voice note, and remove whatever files the job created.
//!
//! Failures are contained here: a job logs its error and ends. The user
//! receives whatever progress messages were already sent and nothing more.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::telegram::{ApiError, BotClient, MediaRef};

use super::cleanup;
use super::download::{download, DownloadError};
use super::transcode::{ProcessError, Transcoder};

/// Progress texts sent at pipeline boundaries.
pub const MSG_DOWNLOAD_STARTING: &str = "Request received, starting download...";
pub const MSG_CONVERSION_STARTING: &str = "Download complete, starting conversion...";

/// Deadlines for the network steps. Conversion carries its own deadline
/// inside [`Transcoder`].
#[derive(Debug, Clone, Copy)]
pub struct JobLimits {
    pub download: Duration,
    pub upload: Duration,
}

impl Default for JobLimits {
    fn default() -> Self {
        Self {
            download: Duration::from_secs(300),
            upload: Duration::from_secs(300),
        }
    }
}

/// Job-scoped failure. Never crosses into the dispatch loop.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("file lookup failed: {0}")]
    Locate(#[source] ApiError),

    #[error("file {file_id} has no server path")]
    NoServerPath { file_id: String },

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("download did not finish within {0:?}")]
    DownloadDeadline(Duration),

    #[error(transparent)]
    Convert(#[from] ProcessError),
}

/// One conversion job, created per qualifying inbound message.
pub struct Job {
    chat_id: i64,
    update_id: i64,
    media: MediaRef,
    debug: bool,
    limits: JobLimits,
}

impl Job {
    pub fn new(chat_id: i64, update_id: i64, media: MediaRef, debug: bool) -> Self {
        Self {
            chat_id,
            update_id,
            media,
            debug,
            limits: JobLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: JobLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Transient input path. Derived from chat id and update id so that
    /// concurrent jobs never collide, including two in-flight jobs for the
    /// same chat.
    pub fn input_path(&self) -> PathBuf {
        PathBuf::from(format!("input_{}_{}", self.chat_id, self.update_id))
    }

    /// Transient output path, same derivation plus the codec extension.
    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(format!("output_{}_{}.opus", self.chat_id, self.update_id))
    }

    /// Run the pipeline to a terminal state. Errors are contained and
    /// logged; files the job created are removed on every exit path unless
    /// debug mode retains them.
    pub async fn run(&self, client: &BotClient, transcoder: &Transcoder) {
        let mut created: Vec<PathBuf> = Vec::new();

        match self.execute(client, transcoder, &mut created).await {
            Ok(()) => info!(
                chat = self.chat_id,
                update = self.update_id,
                "job completed"
            ),
            Err(e) => error!(
                chat = self.chat_id,
                update = self.update_id,
                error = %e,
                "job failed"
            ),
        }

        if self.debug {
            debug!(?created, "debug mode: retaining transient files");
        } else {
            cleanup::remove_files(&created).await;
        }
    }

    async fn execute(
        &self,
        client: &BotClient,
        transcoder: &Transcoder,
        created: &mut Vec<PathBuf>,
    ) -> Result<(), JobError> {
        self.notify(client, MSG_DOWNLOAD_STARTING).await;

        // Locate the file on the server.
        let info = client
            .get_file(&self.media.file_id)
            .await
            .map_err(JobError::Locate)?;
        let server_path = info.file_path.ok_or_else(|| JobError::NoServerPath {
            file_id: self.media.file_id.clone(),
        })?;

        // A self-hosted Bot API server stores files on this filesystem;
        // use the file in place and skip the download. Cached files were
        // not created by this job and are never cleaned up.
        let cached = Path::new(&server_path).exists();
        let input = if cached {
            PathBuf::from(&server_path)
        } else {
            let input = self.input_path();
            let url = client.file_url(&server_path);
            // Track before downloading so a partial file is removed too.
            created.push(input.clone());
            let written = timeout(self.limits.download, download(client.http(), &url, &input))
                .await
                .map_err(|_| JobError::DownloadDeadline(self.limits.download))??;
            if self.debug {
                debug!(url = %url, bytes = written, path = %input.display(), "download finished");
            }
            input
        };

        if self.debug {
            debug!(
                file_id = %self.media.file_id,
                kind = %self.media.kind,
                server_path = %server_path,
                cached,
                input = %input.display(),
                output = %self.output_path().display(),
                "job context resolved"
            );
        }

        self.notify(client, MSG_CONVERSION_STARTING).await;

        let output = self.output_path();
        created.push(output.clone());
        match transcoder.convert_to_opus(&input, &output).await {
            Ok(diagnostics) => {
                if self.debug {
                    debug!(
                        stdout = %diagnostics.stdout,
                        stderr = %diagnostics.stderr,
                        "converter diagnostics"
                    );
                }
            }
            Err(e) => {
                // Diagnostics are logged only in debug mode; the error
                // itself is logged by the caller either way.
                if self.debug {
                    if let Some(diagnostics) = e.diagnostics() {
                        debug!(
                            stdout = %diagnostics.stdout,
                            stderr = %diagnostics.stderr,
                            "converter diagnostics"
                        );
                    }
                }
                return Err(e.into());
            }
        }

        // Delivery failure is logged, not a job failure; the pipeline still
        // proceeds to cleanup.
        match timeout(self.limits.upload, client.send_voice(self.chat_id, &output)).await {
            Ok(Ok(())) => info!(chat = self.chat_id, "voice note delivered"),
            Ok(Err(e)) => warn!(chat = self.chat_id, error = %e, "voice delivery failed"),
            Err(_) => warn!(
                chat = self.chat_id,
                deadline = ?self.limits.upload,
                "voice delivery timed out"
            ),
        }

        Ok(())
    }

    /// Progress notifications are best effort; a failed notification never
    /// fails the job.
    async fn notify(&self, client: &BotClient, text: &str) {
        if let Err(e) = client.send_message(self.chat_id, text).await {
            warn!(chat = self.chat_id, error = %e, "progress notification failed");
        }
    }
}
