//! Connection Entity
//!
//! One [`Connection`] represents one live WebSocket session for one identity.
//! It owns the bounded outbound mailbox drained by the session's write pump
//! and the bookkeeping the hub needs to tear the session down exactly once.
//!
//! # Ownership
//!
//! The hub's registry holds the authoritative `Arc<Connection>`; the read and
//! write pumps hold clones but never outlive the hub's bookkeeping. The
//! mailbox sender lives inside the connection so the hub can close it during
//! teardown, which is what makes the write pump's `recv()` loop terminate.
//!
//! # Lifecycle
//!
//! `Connecting → Active → Closing → Closed`. The `Connecting → Active` edge
//! is taken on registration; any of read error/EOF, write error, send-timeout
//! eviction, or supersession takes `Active → Closing`. `begin_closing` is the
//! close-once guard: concurrent teardown triggers race for it and only the
//! winner performs cleanup.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, Notify};

/// Item queued on a connection's outbound mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A serialized wire message, sent as one text frame
    Frame(String),
    /// Instruction to emit a close frame with the given reason and stop
    Close(&'static str),
}

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Connecting,
    Active,
    Closing,
    Closed,
}

/// Failure to place an item on a connection's mailbox.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnqueueError {
    /// Mailbox stayed full past the send timeout; the peer is unresponsive
    #[error("mailbox full past send timeout")]
    Full,
    /// Mailbox already closed by teardown
    #[error("mailbox closed")]
    Closed,
}

/// One live session: identity, mailbox, joined groups, teardown bookkeeping.
pub struct Connection {
    identity: String,
    /// Taken (set to `None`) when teardown closes the mailbox
    mailbox: Mutex<Option<mpsc::Sender<Outbound>>>,
    /// Groups this session currently participates in; mirrors the group
    /// index and is consumed during teardown to know what to clean up
    joined: Mutex<HashSet<String>>,
    /// Wakes the read pump when the session must end for a non-read reason
    /// (supersession, write error, slow-consumer eviction)
    shutdown: Notify,
    state: Mutex<ConnState>,
}

impl Connection {
    /// Create a connection with a bounded mailbox, returning the receiver
    /// half for the write pump to drain.
    pub(crate) fn new(
        identity: impl Into<String>,
        mailbox_capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(mailbox_capacity);
        let conn = Arc::new(Self {
            identity: identity.into(),
            mailbox: Mutex::new(Some(tx)),
            joined: Mutex::new(HashSet::new()),
            shutdown: Notify::new(),
            state: Mutex::new(ConnState::Connecting),
        });
        (conn, rx)
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn state(&self) -> ConnState {
        *self.state.lock().unwrap()
    }

    /// Enqueue an item, waiting up to `timeout` for mailbox space.
    ///
    /// This is the only blocking handoff between the router/broadcasters and
    /// the write pump; callers must not hold the hub lock across it.
    pub(crate) async fn enqueue(
        &self,
        item: Outbound,
        timeout: Duration,
    ) -> Result<(), EnqueueError> {
        let sender = match self.mailbox.lock().unwrap().clone() {
            Some(sender) => sender,
            None => return Err(EnqueueError::Closed),
        };
        sender.send_timeout(item, timeout).await.map_err(|e| match e {
            mpsc::error::SendTimeoutError::Timeout(_) => EnqueueError::Full,
            mpsc::error::SendTimeoutError::Closed(_) => EnqueueError::Closed,
        })
    }

    /// Ask the session to end: best-effort close frame, then wake the read
    /// pump so it runs teardown. Used when this connection is superseded.
    pub(crate) fn request_close(&self, reason: &'static str) {
        if let Some(sender) = self.mailbox.lock().unwrap().as_ref() {
            // Best effort; a full mailbox still ends via the shutdown signal.
            let _ = sender.try_send(Outbound::Close(reason));
        }
        self.shutdown.notify_one();
    }

    /// Wake the read pump without queueing a close frame.
    pub(crate) fn notify_shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Resolves when the session has been asked to shut down.
    pub(crate) async fn shutdown_requested(&self) {
        self.shutdown.notified().await;
    }

    /// Drop the mailbox sender; the write pump's `recv()` then drains what
    /// remains and terminates.
    pub(crate) fn close_mailbox(&self) {
        self.mailbox.lock().unwrap().take();
    }

    /// Take the `Connecting → Active` edge after registration.
    pub(crate) fn mark_active(&self) {
        let mut state = self.state.lock().unwrap();
        if *state == ConnState::Connecting {
            *state = ConnState::Active;
        }
    }

    /// Close-once guard: returns true only for the first caller, which then
    /// owns teardown. Every later trigger is a no-op.
    pub(crate) fn begin_closing(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        match *state {
            ConnState::Closing | ConnState::Closed => false,
            _ => {
                *state = ConnState::Closing;
                true
            }
        }
    }

    pub(crate) fn mark_closed(&self) {
        *self.state.lock().unwrap() = ConnState::Closed;
    }

    pub(crate) fn add_joined(&self, group_id: &str) {
        self.joined.lock().unwrap().insert(group_id.to_string());
    }

    pub(crate) fn remove_joined(&self, group_id: &str) {
        self.joined.lock().unwrap().remove(group_id);
    }

    /// Drain the joined-group set for teardown or supersession cleanup.
    pub(crate) fn take_joined(&self) -> HashSet<String> {
        std::mem::take(&mut self.joined.lock().unwrap())
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("identity", &self.identity)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enqueue_after_close_reports_closed() {
        let (conn, _rx) = Connection::new("alice", 4);
        conn.close_mailbox();
        let err = conn
            .enqueue(Outbound::Frame("{}".into()), Duration::from_millis(10))
            .await
            .unwrap_err();
        assert_eq!(err, EnqueueError::Closed);
    }

    #[tokio::test]
    async fn enqueue_times_out_when_full() {
        let (conn, _rx) = Connection::new("alice", 1);
        conn.enqueue(Outbound::Frame("a".into()), Duration::from_millis(10))
            .await
            .unwrap();
        let err = conn
            .enqueue(Outbound::Frame("b".into()), Duration::from_millis(10))
            .await
            .unwrap_err();
        assert_eq!(err, EnqueueError::Full);
    }

    #[test]
    fn begin_closing_is_one_shot() {
        let (conn, _rx) = Connection::new("alice", 1);
        conn.mark_active();
        assert!(conn.begin_closing());
        assert!(!conn.begin_closing());
        assert_eq!(conn.state(), ConnState::Closing);
    }
}
