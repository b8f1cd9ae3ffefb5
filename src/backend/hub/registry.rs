//! Registry and Group Index
//!
//! [`HubState`] holds the two shared maps of the hub, identity to connection
//! and group id to connected-member set, in a single struct so one lock
//! guards both. Registry mutations and group-membership mutations have to be
//! observed consistently: teardown must decide "am I still the registered
//! instance" and "which groups do I leave" atomically.
//!
//! The group index caches only currently-connected members. It is not the
//! durable roster (that lives in the store); an identity appears under a
//! group here only while it has a registered connection.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::connection::Connection;

/// Shared hub state: the connection registry plus the group index.
///
/// Plain data, no locking of its own; `ChatHub` wraps it in one
/// `tokio::sync::RwLock` and keeps every critical section short.
#[derive(Default)]
pub(crate) struct HubState {
    clients: HashMap<String, Arc<Connection>>,
    groups: HashMap<String, HashSet<String>>,
}

impl HubState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Install `conn` as the current entry for its identity.
    ///
    /// Returns the superseded connection, already stripped from every group
    /// it was part of, when a session replacement happened. The caller sends
    /// the close signal outside the lock.
    pub(crate) fn register(&mut self, conn: &Arc<Connection>) -> Option<Arc<Connection>> {
        let old = self
            .clients
            .insert(conn.identity().to_string(), Arc::clone(conn));
        if let Some(old) = &old {
            for group_id in old.take_joined() {
                self.remove_member(&group_id, old.identity());
            }
        }
        old
    }

    /// Remove the entry for `conn`'s identity only if it still is `conn`.
    ///
    /// The pointer comparison guards the session-replacement race: a
    /// superseded connection's teardown must not erase its successor.
    /// Returns whether removal (and group cleanup) occurred.
    pub(crate) fn unregister(&mut self, conn: &Arc<Connection>) -> bool {
        match self.clients.get(conn.identity()) {
            Some(current) if Arc::ptr_eq(current, conn) => {
                self.clients.remove(conn.identity());
                for group_id in conn.take_joined() {
                    self.remove_member(&group_id, conn.identity());
                }
                true
            }
            _ => false,
        }
    }

    pub(crate) fn lookup(&self, identity: &str) -> Option<Arc<Connection>> {
        self.clients.get(identity).cloned()
    }

    /// Point-in-time copy of the registry for iteration.
    pub(crate) fn snapshot(&self) -> HashMap<String, Arc<Connection>> {
        self.clients.clone()
    }

    pub(crate) fn identities(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }

    /// Add a connected identity to a group's fanout set. No-op (returns
    /// false) when the identity has no registered connection; idempotent
    /// otherwise.
    pub(crate) fn join(&mut self, identity: &str, group_id: &str) -> bool {
        let Some(conn) = self.clients.get(identity) else {
            return false;
        };
        self.groups
            .entry(group_id.to_string())
            .or_default()
            .insert(identity.to_string());
        conn.add_joined(group_id);
        true
    }

    /// Remove an identity from a group's fanout set, reclaiming the group
    /// entry once it empties.
    pub(crate) fn leave(&mut self, identity: &str, group_id: &str) {
        self.remove_member(group_id, identity);
        if let Some(conn) = self.clients.get(identity) {
            conn.remove_joined(group_id);
        }
    }

    /// Connected members of a group, resolved to connections for fanout.
    pub(crate) fn members(&self, group_id: &str) -> Vec<Arc<Connection>> {
        self.groups
            .get(group_id)
            .map(|names| {
                names
                    .iter()
                    .filter_map(|name| self.clients.get(name).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn remove_member(&mut self, group_id: &str, identity: &str) {
        if let Some(members) = self.groups.get_mut(group_id) {
            members.remove(identity);
            if members.is_empty() {
                self.groups.remove(group_id);
                tracing::debug!("[Hub] Removed empty group {}", group_id);
            }
        }
    }
}
