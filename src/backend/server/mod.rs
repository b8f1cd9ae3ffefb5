//! Server setup: configuration, state, initialization.

/// Server configuration
pub mod config;

/// Server initialization
pub mod init;

/// Application state
pub mod state;

pub use config::ServerConfig;
pub use init::{create_app, create_app_with};
pub use state::AppState;
