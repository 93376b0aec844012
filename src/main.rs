#![warn(clippy::all, clippy::pedantic)]

use adaptive_agent::app;
use adaptive_agent::cli::Cli;
use adaptive_agent::config::Config;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // reqwest and rustls can both pull in a crypto backend; pick one explicitly.
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: Failed to install default crypto provider: {e:?}");
    }

    let cli = Cli::parse();
    let mut config = Config::load_or_init()?;
    config.apply_env_overrides();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.observability.level().unwrap_or(Level::INFO))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    app::dispatch(cli, config).await
}
