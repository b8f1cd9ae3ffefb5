//! User HTTP Handlers

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;
use crate::backend::store::{ChatStore, Group, StoredMessage, User};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
}

/// `GET /users/{username}`
pub async fn get_user(
    State(store): State<Arc<dyn ChatStore>>,
    Path(username): Path<String>,
) -> Result<Json<User>, BackendError> {
    store
        .get_user(&username)
        .await?
        .map(Json)
        .ok_or(BackendError::not_found("user"))
}

/// `GET /users`
pub async fn get_all_users(
    State(store): State<Arc<dyn ChatStore>>,
) -> Result<Json<Vec<User>>, BackendError> {
    Ok(Json(store.get_all_users().await?))
}

/// `POST /users`
pub async fn create_user(
    State(store): State<Arc<dyn ChatStore>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), BackendError> {
    if request.username.is_empty() {
        return Err(BackendError::validation("username is required"));
    }
    let user = store.create_user(&request.username).await?;
    tracing::info!("[Users] Created user {}", user.username);
    Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /users/online`
///
/// Identities come from the hub's registry snapshot; each is resolved
/// against the store so clients get full user records. Identities without a
/// persisted record are skipped.
pub async fn list_online_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, BackendError> {
    let identities = state.hub.online_identities().await;
    let mut online = Vec::with_capacity(identities.len());
    for identity in identities {
        if let Ok(Some(user)) = state.store.get_user(&identity).await {
            online.push(user);
        }
    }
    Ok(Json(online))
}

/// `GET /users/{username}/groups`
pub async fn list_user_groups(
    State(store): State<Arc<dyn ChatStore>>,
    Path(username): Path<String>,
) -> Result<Json<Vec<Group>>, BackendError> {
    Ok(Json(store.get_user_groups(&username).await?))
}

/// `GET /users/{username}/messages/{receiver}`
pub async fn get_direct_messages(
    State(store): State<Arc<dyn ChatStore>>,
    Path((username, receiver)): Path<(String, String)>,
) -> Result<Json<Vec<StoredMessage>>, BackendError> {
    if username.is_empty() || receiver.is_empty() {
        return Err(BackendError::validation(
            "sender and receiver usernames are required",
        ));
    }
    Ok(Json(store.direct_messages(&username, &receiver).await?))
}
