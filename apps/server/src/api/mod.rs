//! API endpoints.

pub mod analytics;
pub mod auth;
pub mod cities;
pub mod notifications;
pub mod trips;
pub mod users;

use std::sync::Arc;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};
use trip_store::TripStore;

use crate::middleware::auth_middleware;
use crate::state::AppState;

/// Plain success acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable confirmation.
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Creates the API router with all endpoints.
pub fn create_router<S: TripStore + 'static>(
    state: Arc<AppState<S>>,
) -> Router<Arc<AppState<S>>> {
    let protected = Router::new()
        // User endpoints
        .route("/api/users/me", patch(users::update_profile))
        .route("/api/auth/me", get(auth::get_current_user))
        // Trip endpoints
        .route("/api/trips", post(trips::create_trip).get(trips::list_trips))
        .route(
            "/api/trips/:trip_id",
            get(trips::get_trip).patch(trips::rename_trip),
        )
        .route(
            "/api/trips/:trip_id/members/:user_id",
            post(trips::add_member).delete(trips::remove_member),
        )
        .route("/api/trips/:trip_id/leave", post(trips::leave_trip))
        .route("/api/trips/common/:user_id", get(trips::common_trips))
        // Notification endpoints
        .route("/api/notifications", get(notifications::list_notifications))
        .route("/api/notifications/read-all", post(notifications::mark_all_read))
        .route("/api/notifications/:id/read", post(notifications::mark_read))
        // City catalog endpoints
        .route("/api/cities", get(cities::list_top_cities).post(cities::create_city))
        .route("/api/cities/search/:prefix", get(cities::search_cities))
        .route("/api/cities/visits", get(cities::city_visits))
        .route("/api/cities/:city_id", get(cities::get_city))
        .route(
            "/api/cities/:city_id/facts",
            get(cities::list_city_facts).post(cities::add_city_fact),
        )
        .route(
            "/api/cities/:city_id/images",
            get(cities::list_city_images).post(cities::add_city_image),
        )
        .route("/api/cities/:city_id/information", get(cities::city_information))
        // Analytics endpoints
        .route("/api/analytics/users", get(analytics::user_stats))
        .route_layer(from_fn_with_state(state, auth_middleware::<S>));

    Router::new()
        // Public endpoints
        .route("/api/users/signup", post(users::sign_up))
        .route("/api/auth/login", post(auth::login))
        .route("/health", get(health_check))
        .merge(protected)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
