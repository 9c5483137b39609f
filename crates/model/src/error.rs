use thiserror::Error;

/// Result type for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors that can occur while building or querying a shape graph
#[derive(Error, Debug)]
pub enum ModelError {
    /// Shape id text did not parse as `namespace#Name`
    #[error("Invalid shape id: {0}")]
    InvalidShapeId(String),

    /// A shape id was looked up that is not present in the graph
    #[error("Unknown shape: {0}")]
    UnknownShape(String),

    /// A member points at a target that is not present in the graph
    #[error("Dangling member target: {shape}${member} -> {target}")]
    DanglingMember {
        shape: String,
        member: String,
        target: String,
    },

    /// Tag registry capacity exceeded
    #[error("Tag registry capacity exceeded: {0}")]
    RegistryCapacity(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl ModelError {
    /// Create an invalid shape id error
    pub fn invalid_id(text: impl Into<String>) -> Self {
        Self::InvalidShapeId(text.into())
    }

    /// Create an unknown shape error
    pub fn unknown(id: impl ToString) -> Self {
        Self::UnknownShape(id.to_string())
    }
}
