//! Sluice - UDP listener transport
//!
//! # Usage
//!
//! ```bash
//! # Run the listeners (default)
//! sluice
//! sluice --config configs/sluice.toml
//! sluice serve --config configs/sluice.toml --log-level debug
//! ```

mod cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sluice_config::{Config, LogFormat};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Sluice - UDP listener transport
#[derive(Parser, Debug)]
#[command(name = "sluice")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the listeners
    Serve(cmd::serve::ServeArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut args = match cli.command {
        Some(Command::Serve(args)) => args,
        // No subcommand = serve
        None => cmd::serve::ServeArgs::default(),
    };
    // CLI global --config overrides subcommand config if both specified
    if args.config.is_none() {
        args.config = cli.config;
    }

    let config = cmd::serve::load_config(args.config.as_deref())?;
    let log_level = resolve_log_level(cli.log_level.as_deref(), &config);
    init_logging(&log_level, config.log.format)?;

    cmd::serve::run(config, args.config.as_deref())
}

/// Resolve the filter directive: CLI flag > config file > default "info"
///
/// The CLI value is taken as a raw `EnvFilter` directive.
fn resolve_log_level(cli_level: Option<&str>, config: &Config) -> String {
    match cli_level {
        Some(level) => level.to_string(),
        None => config.log.level.directive(),
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let (console, json) = match format {
        LogFormat::Console => (
            Some(fmt::layer().with_target(true).with_thread_ids(false)),
            None,
        ),
        LogFormat::Json => (None, Some(fmt::layer().json().with_target(true))),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(json)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    Ok(())
}
