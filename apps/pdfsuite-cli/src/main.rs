//! pdfsuite command-line tool
//!
//! Runs the suite's document tools on local files. Tool defaults come from
//! a TOML file given with `--config` or named by `$PDFSUITE_CONFIG`.

use anyhow::{Context, Result};
use clap::Parser;
use pdfsuite_core::SuiteConfig;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod commands;
mod export;

use cli::Cli;

fn main() -> Result<()> {
    let args = Cli::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    // Logs go to stderr so JSON output on stdout stays clean
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &args.config {
        Some(path) => SuiteConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SuiteConfig::from_env().context("Failed to load config from $PDFSUITE_CONFIG")?,
    };
    tracing::debug!(?config, "Loaded configuration");

    commands::run(args.command, &config)
}
