//! Wayfarer API server binary.

use std::net::SocketAddr;

use trip_store::SqliteTripStore;
use wayfarer_server::{config::Config, create_app, create_state, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    tracing::info!(database_url = %config.database_url, "Starting Wayfarer API server");

    // Parse server address
    let addr: SocketAddr = config.server_addr().parse()?;

    // Connect the store and apply the schema
    let store = SqliteTripStore::connect(&config.database_url).await?;

    // Create application state and router
    let state = create_state(config, store);
    let app = create_app(state);

    tracing::info!(addr = %addr, "Server listening");

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
