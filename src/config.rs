//! Runtime configuration.
//!
//! Sources (highest priority first): command-line flags, environment
//! variables, `.env` file. Flag/env merging is handled by clap in `cli`;
//! this module holds the resolved values and their validation.

use thiserror::Error;

/// Default endpoint template: first slot takes the token, second the method.
pub const DEFAULT_ENDPOINT: &str = "https://api.telegram.org/bot%s/%s";

/// Default cap on concurrently running conversion jobs.
pub const DEFAULT_MAX_JOBS: usize = 4;

/// Fatal startup misconfiguration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("bot token is required (set --token or TELEGRAM_BOT_TOKEN)")]
    MissingToken,

    #[error("server URL is required (set --server or TELEGRAM_SERVER_URL)")]
    MissingServer,

    #[error("server URL template must contain two %s slots (token, method): {0}")]
    BadTemplate(String),

    #[error("--jobs must be at least 1")]
    ZeroJobs,
}

/// Resolved bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Bot/session token.
    pub token: String,
    /// Endpoint template with two `%s` slots.
    pub endpoint: String,
    /// Debug mode: retain transient files, log subprocess diagnostics.
    pub debug: bool,
    /// Concurrent job cap (admission gate size).
    pub max_jobs: usize,
    /// Converter binary to invoke.
    pub ffmpeg: String,
}

impl BotConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.is_empty() {
            return Err(ConfigError::MissingToken);
        }
        if self.endpoint.is_empty() {
            return Err(ConfigError::MissingServer);
        }
        if self.endpoint.matches("%s").count() != 2 {
            return Err(ConfigError::BadTemplate(self.endpoint.clone()));
        }
        if self.max_jobs == 0 {
            return Err(ConfigError::ZeroJobs);
        }
        Ok(())
    }
}

/// The debug toggle is string-valued in the environment: any non-empty
/// value enables it.
pub fn debug_enabled(value: Option<&str>) -> bool {
    value.map(|v| !v.is_empty()).unwrap_or(false)
}
