//! Error types for weight-trajectory operations.
//!
//! Every error is local to one checkpoint or one operation. Callers that loop
//! over a trajectory report each failure and carry on with the next step.

use std::fmt;
use std::path::PathBuf;

/// Main error type for trajectory operations.
///
/// # Examples
///
/// ```
/// use weight_trajectory::error::TrajectoryError;
///
/// let err = TrajectoryError::IndexOutOfRange { index: 12, len: 7 };
/// assert!(err.to_string().contains("out of range"));
/// ```
#[derive(Debug)]
pub enum TrajectoryError {
    /// Malformed or inconsistent parameter set, layer table or mask.
    InvalidInput {
        /// What was wrong with the input
        message: String,
    },

    /// A mask refers to a position outside the weight vector.
    IndexOutOfRange {
        /// Offending flat index
        index: usize,
        /// Length of the weight vector
        len: usize,
    },

    /// A checkpoint artifact that should exist is missing.
    MissingArtifact {
        /// Training step of the missing checkpoint, when known
        step: Option<u64>,
        /// Where it was expected
        path: PathBuf,
    },

    /// I/O error (permission denied, disk full, ...).
    Io(std::io::Error),

    /// Serialization/deserialization error.
    Serialization(String),

    /// Invalid or corrupt container.
    FormatError {
        /// Error description
        message: String,
    },
}

impl fmt::Display for TrajectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrajectoryError::InvalidInput { message } => write!(f, "Invalid input: {message}"),
            TrajectoryError::IndexOutOfRange { index, len } => {
                write!(f, "Mask index {index} out of range for vector of length {len}")
            }
            TrajectoryError::MissingArtifact { step, path } => match step {
                Some(step) => write!(
                    f,
                    "Missing artifact for step {step}: {} does not exist",
                    path.display()
                ),
                None => write!(f, "Missing artifact: {} does not exist", path.display()),
            },
            TrajectoryError::Io(e) => write!(f, "I/O error: {e}"),
            TrajectoryError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            TrajectoryError::FormatError { message } => {
                write!(f, "Invalid container format: {message}")
            }
        }
    }
}

impl std::error::Error for TrajectoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrajectoryError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TrajectoryError {
    fn from(err: std::io::Error) -> Self {
        TrajectoryError::Io(err)
    }
}

impl From<serde_json::Error> for TrajectoryError {
    fn from(err: serde_json::Error) -> Self {
        TrajectoryError::Serialization(err.to_string())
    }
}

impl TrajectoryError {
    /// Create an invalid input error
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a format error
    #[must_use]
    pub fn format(message: impl Into<String>) -> Self {
        Self::FormatError {
            message: message.into(),
        }
    }

    /// Create a missing artifact error
    #[must_use]
    pub fn missing(step: Option<u64>, path: impl Into<PathBuf>) -> Self {
        Self::MissingArtifact {
            step,
            path: path.into(),
        }
    }

    /// Whether the error only means "this checkpoint is not there (yet)".
    #[must_use]
    pub fn is_missing_artifact(&self) -> bool {
        matches!(self, Self::MissingArtifact { .. })
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, TrajectoryError>;
