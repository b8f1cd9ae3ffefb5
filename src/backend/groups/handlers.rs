//! Group HTTP Handlers
//!
//! Thin axum wrappers over [`GroupService`](super::GroupService). Request
//! validation happens here; authorization and roster logic live in the
//! service.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::backend::error::BackendError;
use crate::backend::store::{Group, StoredMessage};

use super::GroupService;

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub owner_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct RequesterQuery {
    pub requester: Option<String>,
}

impl RequesterQuery {
    fn require(self) -> Result<String, BackendError> {
        self.requester
            .filter(|requester| !requester.is_empty())
            .ok_or_else(|| BackendError::validation("requester is required"))
    }
}

/// `GET /groups/{id}`
pub async fn get_group(
    State(groups): State<GroupService>,
    Path(group_id): Path<String>,
) -> Result<Json<Group>, BackendError> {
    Ok(Json(groups.get_group(&group_id).await?))
}

/// `POST /groups`
pub async fn create_group(
    State(groups): State<GroupService>,
    Json(request): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<Group>), BackendError> {
    let group = groups.create_group(&request.name, &request.owner_id).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// `POST /groups/{id}/members`
pub async fn add_member(
    State(groups): State<GroupService>,
    Path(group_id): Path<String>,
    Json(request): Json<AddMemberRequest>,
) -> Result<StatusCode, BackendError> {
    groups.add_member(&group_id, &request.username).await?;
    Ok(StatusCode::OK)
}

/// `DELETE /groups/{id}/members/{username}?requester=`
pub async fn kick_member(
    State(groups): State<GroupService>,
    Path((group_id, username)): Path<(String, String)>,
    Query(query): Query<RequesterQuery>,
) -> Result<StatusCode, BackendError> {
    let requester = query.require()?;
    groups.kick_member(&group_id, &username, &requester).await?;
    Ok(StatusCode::OK)
}

/// `PUT /groups/{id}/admins/{username}?requester=`
pub async fn add_admin(
    State(groups): State<GroupService>,
    Path((group_id, username)): Path<(String, String)>,
    Query(query): Query<RequesterQuery>,
) -> Result<StatusCode, BackendError> {
    let requester = query.require()?;
    groups.add_admin(&group_id, &username, &requester).await?;
    Ok(StatusCode::OK)
}

/// `DELETE /groups/{id}/admins/{username}?requester=`
pub async fn remove_admin(
    State(groups): State<GroupService>,
    Path((group_id, username)): Path<(String, String)>,
    Query(query): Query<RequesterQuery>,
) -> Result<StatusCode, BackendError> {
    let requester = query.require()?;
    groups.remove_admin(&group_id, &username, &requester).await?;
    Ok(StatusCode::OK)
}

/// `GET /groups/{id}/messages`
pub async fn get_group_messages(
    State(groups): State<GroupService>,
    Path(group_id): Path<String>,
) -> Result<Json<Vec<StoredMessage>>, BackendError> {
    Ok(Json(groups.group_messages(&group_id).await?))
}
