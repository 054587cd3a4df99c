use thiserror::Error;

use crate::auth::errors::AuthError;

/// Failures of the document storage layer, normalised across backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Key absent at the backend. Documents are never auto-created.
    #[error("document not found: {key}")]
    NotFound { key: String },
    #[error("storage backend error: {0}")]
    Backend(String),
    /// Stored content exists but is not a JSON object.
    #[error("stored document is corrupt: {0}")]
    Parse(String),
    #[error("document could not be encoded: {0}")]
    Encode(String),
}

impl StoreError {
    pub fn not_found(key: &str) -> Self { Self::NotFound { key: key.to_string() } }

    /// Short stable label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "not_found",
            StoreError::Backend(_) => "backend",
            StoreError::Parse(_) => "parse",
            StoreError::Encode(_) => "encode",
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }
}
