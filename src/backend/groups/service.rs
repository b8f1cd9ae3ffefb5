//! Group Service
//!
//! Roster mutations with their authorization rules, plus the side effects
//! that keep the hub's live state in sync: joining a freshly added member's
//! connection to the fanout set, kicking a removed one out of it, and
//! broadcasting `group_update` notifications to connected members.
//!
//! Authorization is plain field comparison against the stored roster:
//! owners can do everything, admins can kick, nobody can touch the owner.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::hub::ChatHub;
use crate::backend::store::{ChatStore, Group, StoredMessage};
use crate::shared::GroupUpdate;

/// Group administration over the store and the hub.
#[derive(Clone)]
pub struct GroupService {
    store: Arc<dyn ChatStore>,
    hub: Arc<ChatHub>,
}

impl GroupService {
    pub fn new(store: Arc<dyn ChatStore>, hub: Arc<ChatHub>) -> Self {
        Self { store, hub }
    }

    pub async fn get_group(&self, group_id: &str) -> Result<Group, BackendError> {
        self.store
            .get_group(group_id)
            .await?
            .ok_or(BackendError::not_found("group"))
    }

    /// Create a group; the owner starts as its only member and admin. If the
    /// owner is connected, their session joins the live fanout set at once.
    pub async fn create_group(&self, name: &str, owner: &str) -> Result<Group, BackendError> {
        if name.is_empty() || owner.is_empty() {
            return Err(BackendError::validation("name and owner are required"));
        }
        if self.store.get_user(owner).await?.is_none() {
            return Err(BackendError::not_found("owner"));
        }

        let group = Group {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            owner: owner.to_string(),
            admins: vec![owner.to_string()],
            members: vec![owner.to_string()],
            created_at: Utc::now(),
        };
        self.store.create_group(&group).await?;
        self.hub.join_group(owner, &group.id).await;
        tracing::info!("[Groups] {} created group {} ({})", owner, group.name, group.id);
        Ok(group)
    }

    /// Add a member to the roster. Adding an existing member is a no-op.
    pub async fn add_member(&self, group_id: &str, username: &str) -> Result<(), BackendError> {
        let mut group = self.get_group(group_id).await?;
        if self.store.get_user(username).await?.is_none() {
            return Err(BackendError::not_found("user"));
        }
        if group.is_member(username) {
            return Ok(());
        }

        group.members.push(username.to_string());
        self.store.update_group(&group).await?;

        self.hub.join_group(username, group_id).await;
        self.hub
            .notify_group_update(
                group_id,
                GroupUpdate::MemberAdded {
                    username: username.to_string(),
                },
            )
            .await;
        Ok(())
    }

    /// Kick a member. Only the owner or an admin may kick; the owner cannot
    /// be kicked. Admin status is revoked along with membership.
    pub async fn kick_member(
        &self,
        group_id: &str,
        username: &str,
        requester: &str,
    ) -> Result<(), BackendError> {
        let mut group = self.get_group(group_id).await?;
        if group.owner != requester && !group.is_admin(requester) {
            return Err(BackendError::unauthorized(
                "only owner or admins can kick members",
            ));
        }
        if username == group.owner {
            return Err(BackendError::validation("cannot kick group owner"));
        }
        if !group.is_member(username) {
            return Err(BackendError::validation("user is not a group member"));
        }

        group.members.retain(|member| member != username);
        group.admins.retain(|admin| admin != username);
        self.store.update_group(&group).await?;

        // Notifies the remaining members and the kicked session itself.
        self.hub.kick_from_group(username, group_id).await;
        tracing::info!("[Groups] {} kicked {} from {}", requester, username, group_id);
        Ok(())
    }

    /// Grant admin status. Owner only; the target must already be a member.
    pub async fn add_admin(
        &self,
        group_id: &str,
        username: &str,
        requester: &str,
    ) -> Result<(), BackendError> {
        let mut group = self.get_group(group_id).await?;
        if group.owner != requester {
            return Err(BackendError::unauthorized("only owner can add admins"));
        }
        if !group.is_member(username) {
            return Err(BackendError::validation("user is not a group member"));
        }
        if group.is_admin(username) {
            return Err(BackendError::conflict("user is already an admin"));
        }

        group.admins.push(username.to_string());
        self.store.update_group(&group).await?;

        self.hub
            .notify_group_update(
                group_id,
                GroupUpdate::AdminAdded {
                    username: username.to_string(),
                },
            )
            .await;
        Ok(())
    }

    /// Revoke admin status. Owner only; the owner's own status is protected.
    pub async fn remove_admin(
        &self,
        group_id: &str,
        username: &str,
        requester: &str,
    ) -> Result<(), BackendError> {
        let mut group = self.get_group(group_id).await?;
        if group.owner != requester {
            return Err(BackendError::unauthorized("only owner can remove admins"));
        }
        if username == group.owner {
            return Err(BackendError::validation(
                "cannot remove owner's admin status",
            ));
        }
        if !group.is_admin(username) {
            return Err(BackendError::validation("user is not an admin"));
        }

        group.admins.retain(|admin| admin != username);
        self.store.update_group(&group).await?;

        self.hub
            .notify_group_update(
                group_id,
                GroupUpdate::AdminRemoved {
                    username: username.to_string(),
                },
            )
            .await;
        Ok(())
    }

    pub async fn group_messages(&self, group_id: &str) -> Result<Vec<StoredMessage>, BackendError> {
        self.get_group(group_id).await?;
        Ok(self.store.group_messages(group_id).await?)
    }
}
