//! Error types for tensor volume resampling.

use dti_core::transform::TransformError;
use thiserror::Error;

/// Main error type for a resampling run.
///
/// Every variant is fatal: the run stops and no output is written.
#[derive(Error, Debug)]
pub enum ResampleError {
    /// A loaded transform could not be classified as rigid, affine or
    /// non-rigid.
    #[error("Unsupported transform: {0}")]
    UnsupportedTransform(String),

    /// A matrix transform carried the wrong number of parameters.
    #[error("Malformed transform: {0}")]
    MalformedTransform(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A collaborator failed to read or write.
    #[error("I/O error: {0}")]
    Io(String),

    /// A matrix that has to be inverted is singular.
    #[error("Singular matrix: {0}")]
    SingularMatrix(String),

    /// A required input was not supplied.
    #[error("Missing input: {0}")]
    MissingInput(String),
}

/// Result type for resampling operations.
pub type Result<T> = std::result::Result<T, ResampleError>;

impl ResampleError {
    pub fn unsupported_transform(msg: impl Into<String>) -> Self {
        Self::UnsupportedTransform(msg.into())
    }

    pub fn malformed_transform(msg: impl Into<String>) -> Self {
        Self::MalformedTransform(msg.into())
    }

    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Wrap a collaborator failure with what was being attempted.
    pub fn io(context: impl std::fmt::Display, source: anyhow::Error) -> Self {
        Self::Io(format!("{}: {:#}", context, source))
    }

    pub fn singular_matrix(msg: impl Into<String>) -> Self {
        Self::SingularMatrix(msg.into())
    }

    pub fn missing_input(msg: impl Into<String>) -> Self {
        Self::MissingInput(msg.into())
    }
}

impl From<TransformError> for ResampleError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::Singular(msg) => Self::SingularMatrix(msg),
        }
    }
}
