//! opusbot - Telegram voice-note transcoding bot
//!
//! Long-polls the Bot API for inbound messages; any message carrying a
//! media attachment (audio, voice, document, video, video note) is fetched,
//! converted to opus with an external ffmpeg process, and sent back to the
//! originating chat as a voice note.
//!
//! # Architecture
//!
//! - `telegram`: Bot API transport (wire types, HTTP client)
//! - `bot`: dispatch loop and the per-message job pipeline
//!   (locate → download → convert → deliver → cleanup)
//! - `config`: flag/env configuration and validation
//! - `shutdown`: signal handling and graceful drain coordination
//! - `cli`: command-line entrypoint and the serve path
//!
//! Concurrency model: one long-poll loop, one task per in-flight job gated
//! by a semaphore-sized admission cap, one signal listener. Jobs contain
//! their own failures; shutdown drains in-flight jobs for a bounded grace
//! period before the single `logOut` call.

pub mod bot;
pub mod cli;
pub mod config;
pub mod shutdown;
pub mod telegram;

// Re-export main types at crate root for convenience
pub use bot::{Dispatcher, Job, JobError, JobLimits, ProcessDiagnostics, ProcessError, Transcoder};
pub use config::{BotConfig, ConfigError};
pub use telegram::{ApiError, BotClient, MediaKind, MediaRef, Message, Update};
