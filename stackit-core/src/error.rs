//! Error types shared by the framework contract

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Expected import identifier with format: {expected} Got: {got}")]
    InvalidImportId { expected: String, got: String },

    #[error("{0}")]
    Mapping(String),

    #[error("state is empty")]
    EmptyState,

    #[error("attribute '{0}' can't be set on a non-object state")]
    NotAnObject(String),

    #[error("failed to convert value: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Error raised by mapping and payload functions
    pub fn mapping(message: impl Into<String>) -> Self {
        Self::Mapping(message.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
