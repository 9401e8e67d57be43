//! Notification API endpoints.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use entities::Notification;
use serde::{Deserialize, Serialize};
use trip_store::TripStore;

use crate::api::MessageResponse;
use crate::error::ServerResult;
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;

/// Lists the caller's notifications, newest first.
pub async fn list_notifications<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ServerResult<Json<Vec<Notification>>> {
    let notifications = state.store.list_notifications(user.id).await?;
    Ok(Json(notifications))
}

/// Marks one of the caller's notifications as read.
pub async fn mark_read<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
) -> ServerResult<Json<MessageResponse>> {
    state.store.mark_notification_read(id, user.id).await?;

    Ok(Json(MessageResponse::new(
        "Successfully marked notification as read.",
    )))
}

/// Mark-all response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct MarkAllReadResponse {
    /// How many notifications were flipped from unread to read.
    pub marked: u64,
}

/// Marks every unread notification of the caller as read.
pub async fn mark_all_read<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ServerResult<Json<MarkAllReadResponse>> {
    let marked = state.store.mark_all_notifications_read(user.id).await?;
    Ok(Json(MarkAllReadResponse { marked }))
}
