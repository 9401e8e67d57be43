//! Trip API endpoints.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use entities::{NewTrip, TripSummary, TripView};
use serde::{Deserialize, Serialize};
use trip_store::TripStore;

use crate::api::MessageResponse;
use crate::error::{ServerError, ServerResult};
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;

/// Create-trip request body.
#[derive(Debug, Deserialize)]
pub struct CreateTripRequest {
    pub name: Option<String>,
    pub city_id: Option<i64>,
    pub start_date: Option<String>,
}

/// Create-trip response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTripResponse {
    /// Identifier of the new trip.
    pub id: i64,
}

/// Creates a trip with the caller as its first member.
pub async fn create_trip<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateTripRequest>,
) -> ServerResult<(StatusCode, Json<CreateTripResponse>)> {
    let (Some(name), Some(city_id), Some(start_date)) =
        (request.name, request.city_id, request.start_date)
    else {
        return Err(ServerError::Validation(
            "Missing parameters in request. Send name, city_id, start_date".to_string(),
        ));
    };

    let start_date = NaiveDate::parse_from_str(&start_date, "%Y-%m-%d").map_err(|_| {
        ServerError::Validation("start_date must be formatted as YYYY-MM-DD".to_string())
    })?;

    let trip_id = state
        .store
        .create_trip(
            NewTrip {
                name,
                city_id,
                start_date,
            },
            user.id,
        )
        .await?;

    tracing::info!(trip_id, user_id = user.id, "Trip created");

    Ok((StatusCode::CREATED, Json(CreateTripResponse { id: trip_id })))
}

/// Trip listing query parameters.
#[derive(Debug, Deserialize)]
pub struct ListTripsQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    10
}

/// Lists the caller's trips, most recent start date first.
pub async fn list_trips<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<ListTripsQuery>,
) -> ServerResult<Json<Vec<TripSummary>>> {
    let trips = state.store.list_trips(user.id, query.limit).await?;
    Ok(Json(trips))
}

/// Returns one trip, shaped for the caller.
pub async fn get_trip<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(trip_id): Path<i64>,
) -> ServerResult<Json<TripView>> {
    let view = state.store.trip_view(trip_id, user.id).await?;
    Ok(Json(view))
}

/// Adds another user to a trip the caller is on.
pub async fn add_member<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((trip_id, user_id)): Path<(i64, i64)>,
) -> ServerResult<Json<MessageResponse>> {
    state.store.add_member(trip_id, user.id, user_id).await?;

    tracing::info!(trip_id, added = user_id, by = user.id, "Member added to trip");

    Ok(Json(MessageResponse::new("Successfully added user to trip.")))
}

/// Removes a user from a trip the caller is on.
pub async fn remove_member<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((trip_id, user_id)): Path<(i64, i64)>,
) -> ServerResult<Json<MessageResponse>> {
    state.store.remove_member(trip_id, user.id, user_id).await?;

    tracing::info!(trip_id, removed = user_id, by = user.id, "Member removed from trip");

    Ok(Json(MessageResponse::new(
        "Successfully removed user from trip.",
    )))
}

/// Removes the caller from a trip; the trip disappears with its last member.
pub async fn leave_trip<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(trip_id): Path<i64>,
) -> ServerResult<Json<MessageResponse>> {
    state.store.leave_trip(trip_id, user.id).await?;

    tracing::info!(trip_id, user_id = user.id, "User left trip");

    Ok(Json(MessageResponse::new("Successfully left trip.")))
}

/// Rename-trip request body.
#[derive(Debug, Deserialize)]
pub struct RenameTripRequest {
    pub name: Option<String>,
}

/// Renames a trip the caller is on.
pub async fn rename_trip<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(trip_id): Path<i64>,
    Json(request): Json<RenameTripRequest>,
) -> ServerResult<Json<MessageResponse>> {
    let Some(name) = request.name else {
        return Err(ServerError::Validation("Send name".to_string()));
    };

    state.store.rename_trip(trip_id, user.id, &name).await?;

    Ok(Json(MessageResponse::new("Successfully updated trip name.")))
}

/// Lists the trips the caller shares with another user.
pub async fn common_trips<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(user_id): Path<i64>,
) -> ServerResult<Json<Vec<TripView>>> {
    let trips = state.store.common_trips(user.id, user_id).await?;
    Ok(Json(trips))
}
