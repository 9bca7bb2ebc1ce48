//! CLI error types.

use mds_config::ConfigError;
use mds_diagrams::ProcessError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Process(#[from] ProcessError),

    #[error("{0}")]
    Validation(String),
}
