//! Authentication API endpoints.

use std::sync::Arc;

use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};
use trip_store::TripStore;

use crate::api::users::UserResponse;
use crate::error::{ServerError, ServerResult};
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// The authenticated user.
    pub user: UserResponse,
}

/// Exchanges credentials for an access token.
pub async fn login<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(request): Json<LoginRequest>,
) -> ServerResult<Json<LoginResponse>> {
    let user = state
        .store
        .get_user_by_username(&request.username)
        .await?
        .ok_or_else(|| ServerError::Unauthorized("Invalid username or password".to_string()))?;

    let valid = auth::verify_password(&request.password, &user.password_hash)
        .map_err(|e| ServerError::Internal(e.to_string()))?;
    if !valid {
        return Err(ServerError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    }

    let token = state
        .jwt_manager
        .generate_token(user.id, user.username.clone())
        .map_err(|e| ServerError::Internal(e.to_string()))?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(LoginResponse {
        token,
        user: UserResponse::from(user),
    }))
}

/// Returns the authenticated caller's account.
pub async fn get_current_user<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ServerResult<Json<UserResponse>> {
    let user = state
        .store
        .get_user(user.id)
        .await?
        .ok_or_else(|| ServerError::NotFound("User does not exist".to_string()))?;

    Ok(Json(UserResponse::from(user)))
}
