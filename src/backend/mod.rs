//! Backend Module
//!
//! All server-side code for the xfchat application: the connection hub and
//! the axum HTTP surface around it.
//!
//! # Architecture
//!
//! The backend is organized into focused submodules:
//!
//! - **`hub`** - The core: connection registry, group index, message
//!   routing, presence, backpressure and lifecycle policy
//! - **`store`** - Persistence collaborator (PostgreSQL / in-memory)
//! - **`users`** - User CRUD and presence query handlers
//! - **`groups`** - Group administration service and handlers
//! - **`ws`** - WebSocket upgrade endpoint
//! - **`routes`** - Router assembly
//! - **`server`** - Configuration, application state, initialization
//! - **`error`** - Backend error types
//!
//! # State Management
//!
//! `AppState` holds the hub, the store, and the group service; handlers
//! extract what they need via `FromRef`. The hub's own shared state (the
//! registry and group index) lives behind a single `RwLock` inside
//! `ChatHub` and is never exposed directly.

/// The connection hub
pub mod hub;

/// Persistence collaborator
pub mod store;

/// User endpoints
pub mod users;

/// Group management
pub mod groups;

/// WebSocket upgrade endpoint
pub mod ws;

/// Route configuration
pub mod routes;

/// Server setup and configuration
pub mod server;

/// Backend error types
pub mod error;

/// Re-export commonly used types
pub use error::BackendError;
pub use hub::{ChatHub, HubSettings};
pub use server::{create_app, AppState, ServerConfig};
