//! Error types for the probe.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for probe operations.
pub type Result<T> = std::result::Result<T, ProbeError>;

/// Errors that can occur while measuring, configuring or rendering.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The benchmark buffer could not be reserved.
    #[error("failed to allocate {bytes} byte benchmark buffer")]
    Allocation { bytes: usize },

    /// A sweep produced too few samples to bracket a knee.
    #[error("{phase} sweep produced {samples} sample(s), need at least 2")]
    DegenerateSweep { phase: &'static str, samples: usize },

    /// Estimator parameters cannot produce a usable size sequence.
    #[error("invalid estimator parameters: {0}")]
    InvalidParams(String),

    /// Configuration could not be loaded or deserialized.
    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    /// A plot could not be rendered or written.
    #[error("failed to render plot {path}: {reason}")]
    Plot { path: PathBuf, reason: String },

    /// I/O error while preparing output.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    /// Create a new invalid parameters error.
    #[must_use]
    pub fn invalid_params(reason: impl Into<String>) -> Self {
        Self::InvalidParams(reason.into())
    }

    /// Create a new plot error for the given output path.
    #[must_use]
    pub fn plot(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Plot {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
