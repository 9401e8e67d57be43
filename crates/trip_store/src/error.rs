//! Store error types.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum TripStoreError {
    /// Malformed or missing input.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Referenced entity absent.
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: i64,
    },

    /// Caller lacks the required relationship.
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// Operation contradicts current state.
    #[error("{0}")]
    Conflict(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl TripStoreError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a not found error.
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    /// Creates an authorization error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Creates a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

/// Result type for store operations.
pub type TripStoreResult<T> = Result<T, TripStoreError>;
