//! Tracing subscriber setup.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::{Args, ValueEnum};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::error::CliError;

/// Log verbosity accepted by `--log-level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogLevel {
    Debug,
    Info,
    #[value(alias = "warn")]
    Warning,
    Error,
    /// Same as `error`.
    Critical,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error | Self::Critical => "error",
        }
    }
}

/// Logging options shared by all commands.
#[derive(Args, Debug, Default)]
pub(crate) struct LoggingArgs {
    /// Enable debug logging (overrides --log-level).
    #[arg(long, global = true)]
    debug: bool,

    /// Log level (default: RUST_LOG, then info).
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,

    /// Also write logs to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

impl LoggingArgs {
    /// Build the event filter: `--debug`, then `--log-level`, then `RUST_LOG`.
    fn filter(&self) -> EnvFilter {
        if self.debug {
            EnvFilter::new("debug")
        } else if let Some(level) = self.log_level {
            EnvFilter::new(level.directive())
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        }
    }
}

/// Install the global subscriber.
///
/// Events go to stderr, and additionally (without ANSI colors) to
/// `--log-file` when given.
pub(crate) fn init(args: &LoggingArgs) -> Result<(), CliError> {
    let file_layer = match &args.log_file {
        Some(path) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(create_log_file(path)?)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(args.filter())
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

fn create_log_file(path: &Path) -> Result<File, CliError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}
