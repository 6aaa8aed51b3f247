//! Error types for wtraj

use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;
use weight_trajectory::TrajectoryError;

/// Result type alias for CLI operations
pub(crate) type Result<T> = std::result::Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug)]
pub(crate) enum CliError {
    /// Bad flag or config value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Expected file or directory is absent
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Container could not be parsed
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Some checkpoints or frames failed; the rest were processed
    #[error("{failed} of {total} steps failed")]
    Incomplete { failed: usize, total: usize },

    /// Some variants could not be processed; the others were
    #[error("{failed} of {total} variants failed")]
    VariantsFailed { failed: usize, total: usize },

    /// Any other library error
    #[error("{0}")]
    Trajectory(String),
}

impl CliError {
    /// Get exit code for this error
    pub(crate) fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidArgument(_) => ExitCode::from(2),
            Self::NotFound(_) => ExitCode::from(3),
            Self::InvalidFormat(_) => ExitCode::from(4),
            Self::Incomplete { .. } | Self::VariantsFailed { .. } => ExitCode::from(5),
            Self::Io(_) => ExitCode::from(7),
            Self::Trajectory(_) => ExitCode::from(1),
        }
    }
}

impl From<TrajectoryError> for CliError {
    fn from(e: TrajectoryError) -> Self {
        match e {
            TrajectoryError::MissingArtifact { path, .. } => Self::NotFound(path),
            TrajectoryError::InvalidInput { message } => Self::InvalidArgument(message),
            TrajectoryError::FormatError { message } => Self::InvalidFormat(message),
            TrajectoryError::Io(e) => Self::Io(e),
            other => Self::Trajectory(other.to_string()),
        }
    }
}
