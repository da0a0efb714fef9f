//! StreamFrame CLI - replay JSON-lines batches through a streaming frame.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use streamframe_core::config::LogFormat;
use streamframe_core::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Exit codes for CLI operations.
///
/// Following Unix conventions:
/// - 0: Success
/// - 1-127: Application errors
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExitCode {
    /// Successful execution
    Success = 0,
    /// Configuration error (invalid config file, bad eviction window)
    ConfigError = 1,
    /// Input error (unreadable batch file)
    InputError = 2,
    /// A batch was rejected and could not be skipped
    BatchError = 3,
    /// General runtime error
    RuntimeError = 10,
}

impl ExitCode {
    /// Convert an error to an exit code by inspecting its source chain.
    fn from_error(error: &anyhow::Error) -> Self {
        for cause in error.chain() {
            if let Some(err) = cause.downcast_ref::<streamframe_core::Error>() {
                return match err {
                    streamframe_core::Error::Config(_) => ExitCode::ConfigError,
                    err if err.is_capacity_configuration() => ExitCode::ConfigError,
                    streamframe_core::Error::Buffer(_) => ExitCode::BatchError,
                    streamframe_core::Error::Io(_) => ExitCode::InputError,
                    streamframe_core::Error::Serialization(_) => ExitCode::RuntimeError,
                };
            }
            if cause.downcast_ref::<std::io::Error>().is_some() {
                return ExitCode::InputError;
            }
        }
        ExitCode::RuntimeError
    }
}

mod commands;

#[derive(Parser)]
#[command(name = "streamframe")]
#[command(about = "Replay batches through a bounded streaming frame", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Push every batch of a JSON-lines file and print the resulting frame
    Replay {
        /// File with one JSON batch per line
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = commands::replay::OutputFormat::Table)]
        format: commands::replay::OutputFormat,

        /// Print buffer metrics in Prometheus text format after the frame
        #[arg(long)]
        metrics: bool,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() {
    let exit_code = run_cli().await;
    std::process::exit(exit_code as i32);
}

/// Main CLI execution logic with proper error handling.
async fn run_cli() -> ExitCode {
    let cli = Cli::parse();

    // Try to load config for log settings (optional - falls back to defaults)
    let monitoring = cli
        .config
        .as_ref()
        .and_then(|path| std::fs::read_to_string(path).ok())
        .and_then(|content| toml::from_str::<Config>(&content).ok())
        .map(|config| config.monitoring)
        .unwrap_or_default();

    // Initialize logging
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match cli.verbose {
            0 => EnvFilter::new(monitoring.log_level.as_directive()),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so stdout carries only the frame output
    match monitoring.log_format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .with(filter)
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(filter)
                .init();
        }
    }

    let result = execute_command(cli).await;

    match result {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::from_error(&e)
        }
    }
}

/// Execute the CLI command.
async fn execute_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Replay {
            file,
            format,
            metrics,
        } => {
            let config = match &cli.config {
                Some(path) => Config::from_file(path)?,
                None => Config::default(),
            };
            commands::replay::run(config, &file, format, metrics).await?;
        }

        Commands::Validate => {
            let path = cli
                .config
                .unwrap_or_else(|| PathBuf::from("streamframe.toml"));
            commands::validate::run(&path)?;
        }
    }

    Ok(())
}
