//! Error Conversion
//!
//! `IntoResponse` for [`BackendError`], so handlers can return
//! `Result<_, BackendError>` directly. Errors render as JSON:
//!
//! ```json
//! { "error": "group not found", "status": 404 }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::types::BackendError;

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("[Server] Request failed: {}", self);
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}
