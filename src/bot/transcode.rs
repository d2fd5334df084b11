//! External converter invocation.
//!
//! Shells out to ffmpeg with a fixed argument profile: no interactive
//! stdin, force-overwrite, single audio track encoded as libopus. The
//! child runs under a deadline and is killed if it exceeds it.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

/// Default per-conversion deadline.
pub const DEFAULT_CONVERT_DEADLINE: Duration = Duration::from_secs(300);

/// Captured stdout/stderr of a converter run.
#[derive(Debug, Clone, Default)]
pub struct ProcessDiagnostics {
    pub stdout: String,
    pub stderr: String,
}

/// Converter process failure.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("waiting for {binary} failed: {source}")]
    Wait {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{binary} exited with code {code}")]
    Exit {
        binary: String,
        code: i32,
        diagnostics: ProcessDiagnostics,
    },

    #[error("{binary} did not finish within {deadline:?}")]
    DeadlineExceeded {
        binary: String,
        deadline: Duration,
    },
}

impl ProcessError {
    /// Captured output of the failed run, when the process got far enough
    /// to produce any.
    pub fn diagnostics(&self) -> Option<&ProcessDiagnostics> {
        match self {
            Self::Exit { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }
}

/// Invokes the external converter.
pub struct Transcoder {
    binary: String,
    deadline: Duration,
}

impl Transcoder {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            deadline: DEFAULT_CONVERT_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Startup precondition: the converter must be invocable. Probed with a
    /// version query; spawn failure or a non-zero exit means unavailable.
    pub async fn probe(&self) -> Result<(), ProcessError> {
        let output = Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| ProcessError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProcessError::Exit {
                binary: self.binary.clone(),
                code: output.status.code().unwrap_or(-1),
                diagnostics: ProcessDiagnostics {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                },
            });
        }

        Ok(())
    }

    /// Convert `input` to an opus file at `output`. Exit code 0 is success;
    /// diagnostics are always captured so the caller can log them in debug
    /// mode or carry them in the error.
    pub async fn convert_to_opus(
        &self,
        input: &Path,
        output: &Path,
    ) -> Result<ProcessDiagnostics, ProcessError> {
        let child = Command::new(&self.binary)
            .args(["-nostdin", "-y", "-i"])
            .arg(input)
            .args(["-c:a", "libopus"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the wait future on deadline expiry must terminate
            // the subprocess, not leak it.
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        let output = timeout(self.deadline, child.wait_with_output())
            .await
            .map_err(|_| ProcessError::DeadlineExceeded {
                binary: self.binary.clone(),
                deadline: self.deadline,
            })?
            .map_err(|source| ProcessError::Wait {
                binary: self.binary.clone(),
                source,
            })?;

        let diagnostics = ProcessDiagnostics {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !output.status.success() {
            return Err(ProcessError::Exit {
                binary: self.binary.clone(),
                code: output.status.code().unwrap_or(-1),
                diagnostics,
            });
        }

        Ok(diagnostics)
    }
}
