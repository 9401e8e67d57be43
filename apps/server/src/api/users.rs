//! User account API endpoints.

use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use entities::{NewUser, ProfileUpdate, User};
use serde::{Deserialize, Serialize};
use trip_store::TripStore;

use crate::error::{ServerError, ServerResult};
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;

/// A user as returned over the wire; never carries the credential.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    /// Unique identifier.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Whether the account has been verified.
    pub is_verified: bool,
    /// When the account was created.
    pub date_joined: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_verified: user.is_verified,
            date_joined: user.date_joined,
        }
    }
}

/// Sign-up request body.
#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

/// Registers a new user.
pub async fn sign_up<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(request): Json<SignUpRequest>,
) -> ServerResult<(StatusCode, Json<UserResponse>)> {
    let fields = [
        &request.username,
        &request.email,
        &request.first_name,
        &request.last_name,
        &request.password,
    ];
    if fields
        .iter()
        .any(|f| f.as_deref().is_none_or(|v| v.trim().is_empty()))
    {
        return Err(ServerError::Validation(
            "Missing parameters in request. Send username, email, first_name, last_name, password"
                .to_string(),
        ));
    }

    let password = request.password.unwrap_or_default();
    let password_hash =
        auth::hash_password(&password).map_err(|e| ServerError::Internal(e.to_string()))?;

    let user = state
        .store
        .create_user(NewUser {
            username: request.username.unwrap_or_default(),
            email: request.email.unwrap_or_default(),
            first_name: request.first_name.unwrap_or_default(),
            last_name: request.last_name.unwrap_or_default(),
            password_hash,
        })
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, "User signed up");

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Profile update request body.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Updates the caller's profile.
pub async fn update_profile<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<UpdateProfileRequest>,
) -> ServerResult<Json<UserResponse>> {
    if request.first_name.is_none() && request.last_name.is_none() {
        return Err(ServerError::Validation(
            "Send first_name or last_name".to_string(),
        ));
    }

    let updated = state
        .store
        .update_profile(
            user.id,
            ProfileUpdate {
                first_name: request.first_name,
                last_name: request.last_name,
            },
        )
        .await?;

    Ok(Json(UserResponse::from(updated)))
}
