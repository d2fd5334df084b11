//! Conversion pipeline: dispatch, per-job orchestration, and the
//! download / transcode / cleanup steps.

pub mod cleanup;
pub mod dispatcher;
pub mod download;
pub mod job;
pub mod transcode;

pub use dispatcher::{Dispatcher, LONG_POLL_TIMEOUT_SECS, USAGE_TEXT};
pub use job::{Job, JobError, JobLimits};
pub use transcode::{ProcessDiagnostics, ProcessError, Transcoder};
