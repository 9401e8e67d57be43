//! Authentication middleware.

use std::sync::Arc;

use auth::{Claims, JwtManager};
use axum::{
    Json,
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use trip_store::TripStore;

use crate::state::AppState;

/// Authenticated user information.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// User ID.
    pub id: i64,
    /// Login name.
    pub username: String,
}

impl TryFrom<Claims> for AuthenticatedUser {
    type Error = auth::AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        Ok(Self {
            id: claims.user_id()?,
            username: claims.username,
        })
    }
}

/// Extracts the JWT token from the Authorization header.
fn extract_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Validates a JWT token and returns the claims.
fn validate_token(jwt_manager: &JwtManager, token: &str) -> Result<Claims, StatusCode> {
    jwt_manager
        .validate_token(token)
        .map_err(|_| StatusCode::UNAUTHORIZED)
}

/// Authentication middleware.
///
/// Extracts the JWT token from the Authorization header, validates it, and
/// stores the authenticated user in the request extensions. Also stamps the
/// user's last-active timestamp.
pub async fn auth_middleware<S: TripStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    mut request: Request,
    next: Next,
) -> Response {
    // Extract and validate token
    let token = match extract_token(&request) {
        Some(token) => token,
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": { "code": "unauthorized", "message": "Missing authorization header" } })),
            )
                .into_response();
        }
    };

    let claims = match validate_token(&state.jwt_manager, token) {
        Ok(claims) => claims,
        Err(status) => {
            return (
                status,
                Json(json!({ "error": { "code": "unauthorized", "message": "Invalid token" } })),
            )
                .into_response();
        }
    };

    // Store authenticated user in request extensions
    let user = match AuthenticatedUser::try_from(claims) {
        Ok(user) => user,
        Err(_) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": { "code": "unauthorized", "message": "Invalid token claims" } })),
            )
                .into_response();
        }
    };

    // Feeds the active-user analytics; a failed stamp never fails the
    // request.
    if let Err(e) = state.store.touch_last_active(user.id).await {
        tracing::warn!(user_id = user.id, error = %e, "Failed to stamp last_active");
    }

    request.extensions_mut().insert(user);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticated_user_from_claims() {
        let claims = Claims::new(42, "traveller".to_string(), 24);

        let user = AuthenticatedUser::try_from(claims).unwrap();
        assert_eq!(user.id, 42);
        assert_eq!(user.username, "traveller");
    }

    #[test]
    fn test_extract_token_valid() {
        let auth_header = "Bearer test-token-123";
        let token = auth_header.strip_prefix("Bearer ");
        assert_eq!(token, Some("test-token-123"));
    }

    #[test]
    fn test_extract_token_missing_bearer() {
        let auth_header = "Basic credentials";
        let token = auth_header.strip_prefix("Bearer ");
        assert_eq!(token, None);
    }
}
