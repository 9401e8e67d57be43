//! Server configuration.

use std::env;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Database URL.
    pub database_url: String,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// JWT expiration in hours.
    pub jwt_expiration_hours: u64,
    /// Window in days within which a user counts as active.
    pub active_window_days: i64,
    /// Log level.
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = env::var("WAYFARER_JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("WAYFARER_JWT_SECRET is required"))?;

        Ok(Self {
            host: env::var("WAYFARER_SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("WAYFARER_SERVER_PORT")
                .unwrap_or_else(|_| "8440".to_string())
                .parse()
                .unwrap_or(8440),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:wayfarer.db?mode=rwc".to_string()),
            jwt_secret,
            jwt_expiration_hours: env::var("WAYFARER_JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .unwrap_or(24),
            active_window_days: env::var("WAYFARER_ACTIVE_WINDOW_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            log_level: env::var("WAYFARER_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Returns the server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
