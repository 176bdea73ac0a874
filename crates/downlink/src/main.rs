//! Downlink - UDP satellite telemetry ingestion
//!
//! # Usage
//!
//! ```bash
//! # Run the ingestion service (default)
//! downlink
//! downlink --config configs/config.toml
//! downlink serve --log-level debug
//! ```

mod cmd;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use downlink_config::{Config, LogConfig, LogFormat, LogOutput};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Downlink - UDP satellite telemetry ingestion
#[derive(Parser, Debug)]
#[command(name = "downlink")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the ingestion pipeline
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // No subcommand = run the pipeline
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cli.config.as_deref(), cli.log_level.as_deref()).await,
    }
}

async fn serve(config_path: Option<&Path>, cli_level: Option<&str>) -> Result<()> {
    let (config, source) = match cmd::serve::load_config(config_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            init_logging(&LogConfig::default(), cli_level.unwrap_or("info"))?;
            return Err(e);
        }
    };

    let log_level = resolve_log_level(cli_level, &config);
    init_logging(&config.log, &log_level)?;

    cmd::serve::run(config, source.as_deref()).await
}

/// Resolve log level: CLI flag > config file > default "info"
fn resolve_log_level(cli_level: Option<&str>, config: &Config) -> String {
    match cli_level {
        Some(level) => level.to_string(),
        None => config.log.level.as_str().to_string(),
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(log: &LogConfig, level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log.directives(level))
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);

    match (log.format, log.output) {
        (LogFormat::Console, LogOutput::Stdout) => registry
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init(),
        (LogFormat::Console, LogOutput::Stderr) => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
        (LogFormat::Json, LogOutput::Stdout) => registry
            .with(fmt::layer().json().with_target(true))
            .init(),
        (LogFormat::Json, LogOutput::Stderr) => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }

    Ok(())
}
