//! Server Initialization
//!
//! Builds the application: store (PostgreSQL when configured, in-memory
//! otherwise), hub, state, router.

use std::sync::Arc;

use axum::Router;

use crate::backend::hub::ChatHub;
use crate::backend::routes::create_router;
use crate::backend::server::config::{load_database, ServerConfig};
use crate::backend::server::state::AppState;
use crate::backend::store::{ChatStore, MemoryStore, PgStore};

/// Create the application with configuration from the environment.
pub async fn create_app() -> Router<()> {
    create_app_with(ServerConfig::from_env()).await
}

/// Create the application with explicit configuration.
pub async fn create_app_with(config: ServerConfig) -> Router<()> {
    tracing::info!("[Server] Initializing xfchat backend");

    let store: Arc<dyn ChatStore> = match load_database(&config).await {
        Some(pool) => Arc::new(PgStore::new(pool)),
        None => Arc::new(MemoryStore::new()),
    };

    let hub = ChatHub::new(store.clone(), config.hub.clone());
    let state = AppState::new(hub, store);

    tracing::info!("[Server] Hub and routes initialized");
    create_router(state)
}
