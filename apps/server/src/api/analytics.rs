//! Analytics API endpoints.

use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::Duration;
use entities::UserStats;
use trip_store::TripStore;

use crate::error::ServerResult;
use crate::state::AppState;

/// Returns aggregate user counts.
pub async fn user_stats<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
) -> ServerResult<Json<UserStats>> {
    let stats = state
        .store
        .user_stats(Duration::days(state.config.active_window_days))
        .await?;
    Ok(Json(stats))
}
