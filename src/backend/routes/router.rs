//! Router Configuration
//!
//! Assembles the full HTTP surface:
//!
//! - `GET  /ws` - WebSocket upgrade into the hub
//! - `GET  /users`, `POST /users`, `GET /users/online`,
//!   `GET /users/{username}`, `GET /users/{username}/groups`,
//!   `GET /users/{username}/messages/{receiver}`
//! - `POST /groups`, `GET /groups/{id}`, `GET /groups/{id}/messages`,
//!   `POST /groups/{id}/members`, `DELETE /groups/{id}/members/{username}`,
//!   `PUT|DELETE /groups/{id}/admins/{username}`
//! - `/static` - static file serving for the bundled frontend
//!
//! A permissive CORS layer wraps everything; the frontend is served from a
//! different origin during development.

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::backend::groups::handlers as groups;
use crate::backend::server::state::AppState;
use crate::backend::users::handlers as users;
use crate::backend::ws::handle_ws_upgrade;

/// Create the axum router with all routes configured.
pub fn create_router(app_state: AppState) -> Router<()> {
    Router::new()
        .route("/ws", get(handle_ws_upgrade))
        // User endpoints
        .route("/users", get(users::get_all_users).post(users::create_user))
        .route("/users/online", get(users::list_online_users))
        .route("/users/{username}", get(users::get_user))
        .route("/users/{username}/groups", get(users::list_user_groups))
        .route(
            "/users/{username}/messages/{receiver}",
            get(users::get_direct_messages),
        )
        // Group endpoints
        .route("/groups", post(groups::create_group))
        .route("/groups/{id}", get(groups::get_group))
        .route("/groups/{id}/messages", get(groups::get_group_messages))
        .route("/groups/{id}/members", post(groups::add_member))
        .route(
            "/groups/{id}/members/{username}",
            delete(groups::kick_member),
        )
        .route(
            "/groups/{id}/admins/{username}",
            put(groups::add_admin).delete(groups::remove_admin),
        )
        // Static files for the bundled frontend
        .nest_service("/static", ServeDir::new("public"))
        .fallback(|| async { "404 Not Found" })
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
