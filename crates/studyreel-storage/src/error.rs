//! Store error types.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or writing project records.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Project not found: {0}")]
    NotFound(String),

    #[error("Project already exists: {0}")]
    AlreadyExists(String),

    #[error("Revision conflict: expected {expected}, found {found}")]
    Conflict { expected: u64, found: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
