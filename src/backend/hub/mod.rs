//! Connection Hub
//!
//! The hub is the in-memory core of the chat backend: the process-wide
//! registry of live WebSocket connections, the group index layered over it,
//! and the routing/backpressure policy that delivers each message to zero,
//! one, or many mailboxes without letting a stalled peer block anyone else.
//!
//! # Concurrency Model
//!
//! One read task and one write task per connection, no global serializing
//! loop. The registry and group index live together behind a single
//! `tokio::sync::RwLock` ([`registry::HubState`]); lookups and fanout
//! snapshots take the read lock, registration/unregistration/join/leave take
//! the write lock. The lock is never held across a mailbox enqueue; slow
//! consumers must not stall unrelated registry operations.
//!
//! # Backpressure
//!
//! Each per-connection mailbox is bounded. Enqueue waits up to the configured
//! send timeout; when that elapses the target is treated as unresponsive and
//! torn down, exactly as a read error would end it. Each target's enqueue is
//! independent, so one dead peer cannot hold up a group fanout.

mod connection;
mod presence;
mod pumps;
mod registry;
mod router;

pub use connection::{ConnState, Connection, EnqueueError, Outbound};

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use axum::extract::ws::WebSocket;
use futures_util::StreamExt;
use tokio::sync::{mpsc, RwLock};

use crate::backend::store::ChatStore;
use registry::HubState;

/// Tunables for the hub's backpressure and keepalive policy.
#[derive(Debug, Clone)]
pub struct HubSettings {
    /// Outbound mailbox capacity per connection
    pub mailbox_capacity: usize,
    /// How long an enqueue may wait on a full mailbox before the target is
    /// declared unresponsive
    pub send_timeout: Duration,
    /// Upper bound for a single transport write (frames and pings)
    pub write_timeout: Duration,
    /// Read-inactivity deadline; refreshed by any inbound frame
    pub read_timeout: Duration,
    /// Maximum accepted inbound frame size in bytes
    pub max_frame_bytes: usize,
}

impl HubSettings {
    /// Ping interval: 90% of the read deadline, so at least one ping lands
    /// before the peer's read side would time out.
    pub fn ping_interval(&self) -> Duration {
        self.read_timeout * 9 / 10
    }
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            mailbox_capacity: 256,
            send_timeout: Duration::from_secs(3),
            write_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
            max_frame_bytes: 10_000,
        }
    }
}

/// Why a connection's lifecycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Transport read failed
    ReadError,
    /// No frame arrived within the read deadline
    ReadTimeout,
    /// Peer closed the transport
    PeerClosed,
    /// Transport write failed or timed out
    WriteError,
    /// Mailbox stayed full past the send timeout
    SlowConsumer,
    /// A newer session registered for the same identity
    Superseded,
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::ReadError => "read error",
            Self::ReadTimeout => "read timeout",
            Self::PeerClosed => "peer closed",
            Self::WriteError => "write error",
            Self::SlowConsumer => "slow consumer",
            Self::Superseded => "session replaced",
        };
        f.write_str(text)
    }
}

/// The connection hub. Shared as `Arc<ChatHub>` across the HTTP layer, the
/// per-connection pumps, and the group service.
pub struct ChatHub {
    state: RwLock<HubState>,
    store: Arc<dyn ChatStore>,
    settings: HubSettings,
    /// Handle to ourselves for the teardown tasks spawned off delivery
    /// paths; always upgradable while the hub is alive
    weak_self: Weak<ChatHub>,
}

impl ChatHub {
    pub fn new(store: Arc<dyn ChatStore>, settings: HubSettings) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            state: RwLock::new(HubState::new()),
            store,
            settings,
            weak_self: weak_self.clone(),
        })
    }

    pub fn settings(&self) -> &HubSettings {
        &self.settings
    }

    /// Run one session to completion: register the identity, pump the
    /// socket in both directions, and tear everything down when either side
    /// ends. The caller has already authenticated `identity` and upgraded
    /// the transport.
    pub async fn handle_connection(self: Arc<Self>, identity: String, socket: WebSocket) {
        let (conn, mailbox_rx) = self.attach(identity).await;
        tracing::info!("[Hub] {} connected", conn.identity());

        let (sink, stream) = socket.split();
        let writer = tokio::spawn(pumps::write_pump(
            Arc::clone(&self),
            Arc::clone(&conn),
            sink,
            mailbox_rx,
        ));
        pumps::read_pump(Arc::clone(&self), Arc::clone(&conn), stream).await;
        let _ = writer.await;
    }

    /// Register a new session for `identity`, superseding any previous one,
    /// and announce the identity online. Returns the connection and the
    /// mailbox receiver its write pump (or a test) drains.
    pub async fn attach(
        &self,
        identity: impl Into<String>,
    ) -> (Arc<Connection>, mpsc::Receiver<Outbound>) {
        let (conn, mailbox_rx) = Connection::new(identity, self.settings.mailbox_capacity);
        let superseded = {
            let mut state = self.state.write().await;
            state.register(&conn)
        };
        conn.mark_active();

        if let Some(old) = superseded {
            tracing::info!("[Hub] Replacing existing session for {}", old.identity());
            old.request_close("session replaced");
        }

        self.broadcast_status(conn.identity(), "online").await;
        (conn, mailbox_rx)
    }

    /// Idempotent teardown. Only the first trigger for a connection runs the
    /// bookkeeping: conditional unregistration, group cleanup, mailbox
    /// close, and (if this was still the registered session) the offline
    /// presence broadcast. A superseded connection finds its successor in
    /// the registry and leaves it (and the presence feed) untouched.
    pub async fn disconnect(&self, conn: &Arc<Connection>, reason: DisconnectReason) {
        if !conn.begin_closing() {
            return;
        }
        let was_registered = {
            let mut state = self.state.write().await;
            state.unregister(conn)
        };
        conn.close_mailbox();
        conn.notify_shutdown();

        if was_registered {
            self.broadcast_status(conn.identity(), "offline").await;
        }
        conn.mark_closed();
        tracing::info!("[Hub] {} disconnected ({})", conn.identity(), reason);
    }

    /// Point-in-time copy of the registry.
    pub async fn snapshot(&self) -> HashMap<String, Arc<Connection>> {
        self.state.read().await.snapshot()
    }

    /// Identities with a live session right now.
    pub async fn online_identities(&self) -> Vec<String> {
        self.state.read().await.identities()
    }

    /// Add a connected identity to a group's fanout set. No-op for
    /// identities without a live session.
    pub async fn join_group(&self, identity: &str, group_id: &str) -> bool {
        let joined = {
            let mut state = self.state.write().await;
            state.join(identity, group_id)
        };
        if joined {
            tracing::info!("[Hub] {} joined group {}", identity, group_id);
        } else {
            tracing::debug!(
                "[Hub] Ignoring join of {} to group {}: no live session",
                identity,
                group_id
            );
        }
        joined
    }

    /// Remove an identity from a group's fanout set, notify the remaining
    /// members, and tell the kicked session directly.
    pub async fn kick_from_group(&self, identity: &str, group_id: &str) {
        let kicked = {
            let mut state = self.state.write().await;
            state.leave(identity, group_id);
            state.lookup(identity)
        };

        let update = crate::shared::GroupUpdate::MemberKicked {
            username: identity.to_string(),
        };
        self.notify_group_update(group_id, update.clone()).await;

        if let Some(conn) = kicked {
            let message = crate::shared::WireMessage::group_update(group_id, update);
            if let Ok(frame) = serde_json::to_string(&message) {
                self.deliver(&conn, &frame).await;
            }
        }
    }

    /// Enqueue one serialized frame onto a target's mailbox. A timeout means
    /// the target is unresponsive: it is torn down on a spawned task so the
    /// current fanout (or a teardown already in progress) never blocks on it.
    pub(crate) async fn deliver(&self, target: &Arc<Connection>, frame: &str) {
        match target
            .enqueue(Outbound::Frame(frame.to_string()), self.settings.send_timeout)
            .await
        {
            Ok(()) => {}
            Err(EnqueueError::Closed) => {
                tracing::debug!("[Hub] Skipping delivery to {}: mailbox closed", target.identity());
            }
            Err(EnqueueError::Full) => {
                tracing::warn!(
                    "[Hub] Timeout sending to {}; evicting unresponsive connection",
                    target.identity()
                );
                let Some(hub) = self.weak_self.upgrade() else {
                    return;
                };
                let conn = Arc::clone(target);
                // Spawn through a sync helper. deliver -> disconnect ->
                // broadcast_status -> deliver is a recursive async cycle; if the
                // spawn were inlined here the compiler would have to prove
                // `disconnect`'s future `Send` while still inferring `deliver`'s
                // own auto-traits, which it cannot resolve. Routing the spawn
                // through a non-async fn puts the recursive await behind a
                // function boundary so `deliver`'s future no longer transitively
                // contains `disconnect`'s, breaking the cycle.
                Self::spawn_disconnect(hub, conn, DisconnectReason::SlowConsumer);
            }
        }
    }

    /// Tear down an unresponsive connection on a detached task. Kept as a
    /// non-async fn so the recursive delivery cycle (deliver -> disconnect ->
    /// broadcast_status -> deliver) is interrupted by a function boundary,
    /// which is what lets the spawned future's `Send` bound resolve.
    fn spawn_disconnect(hub: Arc<ChatHub>, conn: Arc<Connection>, reason: DisconnectReason) {
        tokio::spawn(async move {
            hub.disconnect(&conn, reason).await;
        });
    }

    pub(crate) fn store(&self) -> &Arc<dyn ChatStore> {
        &self.store
    }

    pub(crate) fn state(&self) -> &RwLock<HubState> {
        &self.state
    }
}
