//! Server error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use trip_store::TripStoreError;

/// Stable error codes carried in error response bodies.
pub mod error_codes {
    pub const VALIDATION_ERROR: &str = "validation_error";
    pub const CONFLICT: &str = "conflict";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const NOT_FOUND: &str = "not_found";
    pub const INTERNAL_ERROR: &str = "internal_error";
    pub const UPSTREAM_UNAVAILABLE: &str = "upstream_unavailable";
}

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Invalid request parameters.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Operation contradicts current state.
    #[error("{0}")]
    Conflict(String),

    /// Caller is not authenticated or lacks the required relationship.
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream service failure.
    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<TripStoreError> for ServerError {
    fn from(e: TripStoreError) -> Self {
        match e {
            TripStoreError::Validation(msg) => ServerError::Validation(msg),
            TripStoreError::NotFound { entity, .. } => {
                ServerError::NotFound(format!("{entity} does not exist"))
            }
            TripStoreError::Unauthorized(msg) => ServerError::Unauthorized(msg),
            TripStoreError::Conflict(msg) => ServerError::Conflict(msg),
            TripStoreError::Database(e) => {
                tracing::error!(error = %e, "Store operation failed");
                ServerError::Internal("Database error".to_string())
            }
        }
    }
}

impl From<auth::AuthError> for ServerError {
    fn from(e: auth::AuthError) -> Self {
        match e {
            auth::AuthError::PasswordHash(msg) => ServerError::Internal(msg),
            _ => ServerError::Unauthorized("Invalid token".to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ServerError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR, msg.clone())
            }
            // The original surface reported duplicate membership as a plain
            // bad request; the error code keeps the distinction.
            ServerError::Conflict(msg) => {
                (StatusCode::BAD_REQUEST, error_codes::CONFLICT, msg.clone())
            }
            ServerError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, error_codes::UNAUTHORIZED, msg.clone())
            }
            ServerError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, error_codes::NOT_FOUND, msg.clone())
            }
            ServerError::Upstream(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                error_codes::UPSTREAM_UNAVAILABLE,
                msg.clone(),
            ),
            ServerError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL_ERROR, msg.clone())
            }
        };

        let body = json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        (status, Json(body)).into_response()
    }
}

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
