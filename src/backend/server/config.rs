//! Server Configuration
//!
//! Configuration is loaded from environment variables with sensible
//! defaults for local development. A missing or unreachable database does
//! not prevent startup: the server degrades to the in-memory store and
//! keeps running.

use std::time::Duration;

use sqlx::PgPool;

use crate::backend::hub::HubSettings;

/// Environment-driven server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port the HTTP server binds (`SERVER_PORT`, default 8080)
    pub port: u16,
    /// PostgreSQL connection string (`DATABASE_URL`, optional)
    pub database_url: Option<String>,
    /// Hub backpressure/keepalive tunables
    pub hub: HubSettings,
}

impl ServerConfig {
    /// Read configuration from the environment.
    ///
    /// Recognized variables: `SERVER_PORT`, `DATABASE_URL`,
    /// `HUB_MAILBOX_CAPACITY`, `HUB_SEND_TIMEOUT_MS`,
    /// `HUB_READ_TIMEOUT_SECS`. Unparsable values fall back to the default
    /// with a warning.
    pub fn from_env() -> Self {
        let defaults = HubSettings::default();
        let hub = HubSettings {
            mailbox_capacity: env_parse("HUB_MAILBOX_CAPACITY", defaults.mailbox_capacity),
            send_timeout: Duration::from_millis(env_parse(
                "HUB_SEND_TIMEOUT_MS",
                defaults.send_timeout.as_millis() as u64,
            )),
            read_timeout: Duration::from_secs(env_parse(
                "HUB_READ_TIMEOUT_SECS",
                defaults.read_timeout.as_secs(),
            )),
            ..defaults
        };

        Self {
            port: env_parse("SERVER_PORT", 8080),
            database_url: std::env::var("DATABASE_URL").ok(),
            hub,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: None,
            hub: HubSettings::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!("[Server] Ignoring unparsable {}={}", name, value);
            default
        }),
        Err(_) => default,
    }
}

/// Connect to PostgreSQL and run migrations.
///
/// Returns `None` when `DATABASE_URL` is unset or the connection fails;
/// errors are logged but never prevent startup.
pub async fn load_database(config: &ServerConfig) -> Option<PgPool> {
    let database_url = match &config.database_url {
        Some(url) => url,
        None => {
            tracing::warn!("[Server] DATABASE_URL not set; using in-memory store");
            return None;
        }
    };

    tracing::info!("[Server] Connecting to database...");
    let pool = match PgPool::connect(database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("[Server] Failed to create database pool: {:?}", e);
            tracing::warn!("[Server] Falling back to in-memory store");
            return None;
        }
    };

    if let Err(e) = sqlx::migrate!().run(&pool).await {
        tracing::error!("[Server] Failed to run migrations: {}", e);
        // Continue anyway; the schema may already be in place.
    }

    Some(pool)
}
