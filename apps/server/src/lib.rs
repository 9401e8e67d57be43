//! Wayfarer API server
//!
//! The backend of the Wayfarer trip-planning application: user accounts,
//! trips and their membership, the city catalog, and notifications, served
//! over an axum HTTP API.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod state;
pub mod wiki;

use std::sync::Arc;

use auth::{JwtConfig, JwtManager};
use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use trip_store::TripStore;

use crate::config::Config;
use crate::state::{AppState, create_shared_state};

/// Creates the application router with all routes configured.
pub fn create_app<S: TripStore + 'static>(state: Arc<AppState<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api::create_router(state.clone())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Creates the application state with the given configuration and store.
pub fn create_state<S: TripStore>(config: Config, store: S) -> Arc<AppState<S>> {
    let jwt_config =
        JwtConfig::new(&config.jwt_secret).with_expiration_hours(config.jwt_expiration_hours);
    let jwt_manager = JwtManager::new(jwt_config);
    let wiki = wiki::WikiClient::new();

    create_shared_state(config, store, jwt_manager, wiki)
}

/// Initializes tracing with the given log level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
