//! CLI error types and exit codes

use scimsync_core::SyncError;
use thiserror::Error;

use crate::config::ConfigError;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: Run-level error
/// - 2: Configuration error
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sync failed: {0}")]
    Sync(#[from] SyncError),

    #[error("Setup failed: {0}")]
    Setup(String),

    #[error("Server error: {0}")]
    Server(String),
}

impl CliError {
    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Sync(_) | Self::Setup(_) | Self::Server(_) => 1,
        }
    }

    /// Print the error to stderr.
    pub fn print(&self) {
        eprintln!("Error: {self}");
    }
}

impl From<scimsync_google::GoogleError> for CliError {
    fn from(error: scimsync_google::GoogleError) -> Self {
        Self::Setup(error.to_string())
    }
}

impl From<scimsync_client::ScimClientError> for CliError {
    fn from(error: scimsync_client::ScimClientError) -> Self {
        Self::Setup(error.to_string())
    }
}
