use schema_model::{ModelError, ShapeId, ShapeKind};
use thiserror::Error;

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, CompileError>;

/// Errors that can occur during descriptor compilation
///
/// Everything here is a caller-contract violation: the upstream model
/// resolver handed the compiler an inconsistent graph. Recoverable
/// conditions (depth exhaustion, unknown trait encodings) degrade
/// conservatively instead of surfacing as errors.
#[derive(Error, Debug)]
pub enum CompileError {
    /// Model-level failure (dangling target, unknown shape)
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A shape of a kind this stage cannot handle reached it
    #[error("Unexpected {kind} shape at {stage}: {shape}")]
    UnexpectedKind {
        shape: String,
        kind: &'static str,
        stage: &'static str,
    },

    /// A service root declared no operations
    #[error("Service has no operations: {0}")]
    EmptyService(String),

    /// Invalid compiler configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl CompileError {
    /// Create an unexpected-kind error
    pub fn unexpected_kind(shape: &ShapeId, kind: ShapeKind, stage: &'static str) -> Self {
        Self::UnexpectedKind {
            shape: shape.to_string(),
            kind: kind.as_str(),
            stage,
        }
    }

    /// Create an empty-service error
    pub fn empty_service(service: &ShapeId) -> Self {
        Self::EmptyService(service.to_string())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
