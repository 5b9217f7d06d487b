//! CLI-specific error types and mappings.

use civitdl_core::{CoreError, RepositoryError};
use civitdl_download::PipelineError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument combination the parser cannot catch.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// Config file or resolved settings are unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store access failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Catalog traversal could not produce any work.
    #[error("{0}")]
    Catalog(String),

    /// An error that ended a download run early.
    #[error("Run aborted: {0}")]
    Aborted(String),

    /// Every job of a redownload failed.
    #[error("{0} download(s) failed")]
    AllFailed(u64),

    #[error("{0}")]
    Core(String),
}

impl CliError {
    /// Process exit status.
    ///
    /// Every failure exits with 1; successful runs exit with 0 even when
    /// individual jobs failed.
    pub const fn exit_code(&self) -> i32 {
        1
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Repository(e) => Self::Database(e.to_string()),
            CoreError::Catalog(e) => Self::Catalog(e.to_string()),
            CoreError::Configuration(msg) | CoreError::Validation(msg) => Self::Config(msg),
            other => Self::Core(other.to_string()),
        }
    }
}

impl From<RepositoryError> for CliError {
    fn from(err: RepositoryError) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<PipelineError> for CliError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Config(e) => e.into(),
            PipelineError::Store(e) => e.into(),
            PipelineError::UnknownVersion(_) | PipelineError::NoFile(_) => {
                Self::Arguments(err.to_string())
            }
            PipelineError::Catalog(_) | PipelineError::NothingFound(_) => {
                Self::Catalog(err.to_string())
            }
            PipelineError::Download(_) => Self::Aborted(err.to_string()),
        }
    }
}
