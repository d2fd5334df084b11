//! opusbot entrypoint

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use opusbot::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Populate the environment from .env before clap reads it. A missing
    // file is fine; variables may be set directly.
    if dotenvy::dotenv().is_err() {
        eprintln!("no .env file loaded");
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Parse and execute CLI
    let cli = Cli::parse();
    cli.execute().await
}
