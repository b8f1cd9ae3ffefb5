//! Presence Broadcasting
//!
//! Online/offline announcements to everyone else, and group-update
//! notifications to a group's connected members. Both take a snapshot under
//! the read lock and enqueue outside it.

use crate::shared::{GroupUpdate, WireMessage};

use super::ChatHub;

impl ChatHub {
    /// Announce `identity`'s presence transition to every *other* registered
    /// connection; the originating identity never hears its own status.
    pub async fn broadcast_status(&self, identity: &str, status: &str) {
        let message = WireMessage::status(identity, status);
        let frame = match serde_json::to_string(&message) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("[Hub] Failed to serialize status for {}: {}", identity, e);
                return;
            }
        };

        let targets: Vec<_> = {
            let state = self.state().read().await;
            state
                .snapshot()
                .into_values()
                .filter(|conn| conn.identity() != identity)
                .collect()
        };
        for target in targets {
            self.deliver(&target, &frame).await;
        }
        tracing::debug!("[Hub] Broadcast status {} for {}", status, identity);
    }

    /// Send a group administration notification to the group's currently
    /// connected members.
    pub async fn notify_group_update(&self, group_id: &str, update: GroupUpdate) {
        let message = WireMessage::group_update(group_id, update);
        let frame = match serde_json::to_string(&message) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(
                    "[Hub] Failed to serialize group update for {}: {}",
                    group_id,
                    e
                );
                return;
            }
        };

        let members = {
            let state = self.state().read().await;
            state.members(group_id)
        };
        if members.is_empty() {
            tracing::debug!("[Hub] No connected members in group {} to notify", group_id);
            return;
        }
        for member in members {
            self.deliver(&member, &frame).await;
        }
    }
}
