//! Application state.

use std::sync::Arc;

use auth::JwtManager;
use trip_store::TripStore;

use crate::config::Config;
use crate::wiki::WikiClient;

/// Shared application state.
pub struct AppState<S: TripStore> {
    /// Server configuration.
    pub config: Config,
    /// Backing store.
    pub store: S,
    /// JWT manager.
    pub jwt_manager: JwtManager,
    /// Wikipedia city-information client.
    pub wiki: WikiClient,
}

impl<S: TripStore> AppState<S> {
    /// Creates new application state.
    pub fn new(config: Config, store: S, jwt_manager: JwtManager, wiki: WikiClient) -> Self {
        Self {
            config,
            store,
            jwt_manager,
            wiki,
        }
    }
}

/// Type alias for shared state.
pub type SharedState<S> = Arc<AppState<S>>;

/// Creates shared state from config, store, and collaborators.
pub fn create_shared_state<S: TripStore>(
    config: Config,
    store: S,
    jwt_manager: JwtManager,
    wiki: WikiClient,
) -> SharedState<S> {
    Arc::new(AppState::new(config, store, jwt_manager, wiki))
}
