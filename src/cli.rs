//! Command-line interface and the serve path.
//!
//! Flags override environment variables; the environment is pre-populated
//! from a `.env` file in `main` before parsing. Startup preconditions
//! (token, endpoint template, converter availability, authorization) are
//! checked before the dispatch loop starts serving.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use crate::bot::{Dispatcher, Transcoder};
use crate::config::{self, BotConfig};
use crate::shutdown::{self, ShutdownWatch};
use crate::telegram::BotClient;

/// opusbot - converts Telegram media to opus voice notes
#[derive(Parser, Debug)]
#[command(name = "opusbot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Telegram bot token
    #[arg(short = 't', long, env = "TELEGRAM_BOT_TOKEN")]
    token: Option<String>,

    /// Bot API endpoint template with two %s slots (token, method)
    #[arg(
        short = 's',
        long,
        env = "TELEGRAM_SERVER_URL",
        default_value = config::DEFAULT_ENDPOINT
    )]
    server: String,

    /// Enable debug mode (any non-empty value)
    #[arg(short = 'd', long, env = "DEBUG")]
    debug: Option<String>,

    /// Maximum number of concurrent conversion jobs
    #[arg(long, env = "OPUSBOT_MAX_JOBS", default_value_t = config::DEFAULT_MAX_JOBS)]
    jobs: usize,

    /// Converter binary to invoke
    #[arg(long, env = "OPUSBOT_FFMPEG", default_value = "ffmpeg")]
    ffmpeg: String,
}

impl Cli {
    /// Resolve flags and environment into a validated configuration.
    pub fn into_config(self) -> Result<BotConfig, config::ConfigError> {
        let config = BotConfig {
            token: self.token.unwrap_or_default(),
            endpoint: self.server,
            debug: config::debug_enabled(self.debug.as_deref()),
            max_jobs: self.jobs,
            ffmpeg: self.ffmpeg,
        };
        config.validate()?;
        Ok(config)
    }

    pub async fn execute(self) -> Result<()> {
        let config = self.into_config()?;
        run(config).await
    }
}

/// Serve until a termination signal arrives. The signal listener is the
/// only thing that fires the shutdown watch in production.
pub async fn run(config: BotConfig) -> Result<()> {
    let (trigger, watch) = shutdown::channel();
    tokio::spawn(async move {
        let signal = shutdown::wait_for_signal().await;
        info!(signal, "termination signal received");
        trigger.fire();
    });

    serve(config, watch).await
}

/// Check startup preconditions, serve until the shutdown watch fires, then
/// invalidate the session.
pub async fn serve(config: BotConfig, shutdown: ShutdownWatch) -> Result<()> {
    let transcoder = Transcoder::new(&config.ffmpeg);
    transcoder
        .probe()
        .await
        .context("ffmpeg is not available on this system; install ffmpeg to run this bot")?;

    let client = Arc::new(BotClient::new(&config.token, &config.endpoint));
    let me = client.get_me().await.context("bot authorization failed")?;
    info!(
        account = me.username.as_deref().unwrap_or("<unknown>"),
        debug = config.debug,
        "authorized"
    );

    let dispatcher = Dispatcher::new(
        Arc::clone(&client),
        Arc::new(transcoder),
        config.debug,
        config.max_jobs,
    );
    dispatcher.run(shutdown).await;

    // Session invalidation: exactly once per process lifetime, only after
    // a signal-triggered shutdown has drained the dispatcher.
    match client.log_out().await {
        Ok(()) => info!("logged out"),
        Err(e) => warn!(error = %e, "logout failed"),
    }

    Ok(())
}
