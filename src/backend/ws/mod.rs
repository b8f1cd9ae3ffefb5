//! WebSocket Upgrade Endpoint
//!
//! `GET /ws?username=<identity>` performs the HTTP → WebSocket handshake and
//! hands the established socket plus the asserted identity to the hub.
//! Identity verification is out of scope here: whatever the query string
//! asserts is what the hub registers (spec: authentication is the caller's
//! problem).

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::backend::server::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub username: Option<String>,
}

/// `GET /ws`: upgrade and register the session with the hub.
pub async fn handle_ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(username) = query.username.filter(|username| !username.is_empty()) else {
        tracing::warn!("[Server] WebSocket upgrade rejected: missing username");
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Missing username" })),
        )
            .into_response();
    };

    let hub = state.hub.clone();
    let max_frame_bytes = hub.settings().max_frame_bytes;
    ws.max_message_size(max_frame_bytes)
        .on_upgrade(move |socket| hub.handle_connection(username, socket))
}
