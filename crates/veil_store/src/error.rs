use thiserror::Error;

use veil_proto::ErrorCode;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("A wrapped key already exists for user {0}")]
    AlreadyExists(String),

    #[error("Corrupted row: {0}")]
    Corrupt(String),

    #[error("Migration error: {0}")]
    Migration(String),
}

impl StoreError {
    /// Stable error code for the HTTP layer's `ErrorResponse`.
    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::NotFound(_) => ErrorCode::KeyNotFound,
            StoreError::AlreadyExists(_) => ErrorCode::KeyAlreadyExists,
            _ => ErrorCode::Internal,
        }
    }
}
