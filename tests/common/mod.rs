//! Common test utilities for the hub and service suites.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use xfchat::backend::hub::{ChatHub, HubSettings, Outbound};
use xfchat::backend::store::MemoryStore;
use xfchat::shared::WireMessage;

/// Hub settings with timings tightened for tests.
pub fn test_settings() -> HubSettings {
    HubSettings {
        mailbox_capacity: 64,
        send_timeout: Duration::from_millis(100),
        write_timeout: Duration::from_secs(1),
        read_timeout: Duration::from_secs(60),
        max_frame_bytes: 10_000,
    }
}

/// A hub over a fresh in-memory store.
pub fn test_hub() -> (Arc<ChatHub>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let hub = ChatHub::new(store.clone(), test_settings());
    (hub, store)
}

pub fn test_hub_with(settings: HubSettings) -> (Arc<ChatHub>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let hub = ChatHub::new(store.clone(), settings);
    (hub, store)
}

/// Receive the next frame from a mailbox and parse it.
pub async fn recv_message(rx: &mut mpsc::Receiver<Outbound>) -> WireMessage {
    match tokio::time::timeout(Duration::from_secs(1), rx.recv()).await {
        Ok(Some(Outbound::Frame(text))) => {
            serde_json::from_str(&text).expect("mailbox frame should be valid JSON")
        }
        other => panic!("expected a frame, got {other:?}"),
    }
}

/// Receive a close instruction from a mailbox.
pub async fn recv_close(rx: &mut mpsc::Receiver<Outbound>) -> &'static str {
    match tokio::time::timeout(Duration::from_secs(1), rx.recv()).await {
        Ok(Some(Outbound::Close(reason))) => reason,
        other => panic!("expected a close, got {other:?}"),
    }
}

/// Assert the next frame is a status broadcast for `who`.
pub async fn expect_status(rx: &mut mpsc::Receiver<Outbound>, who: &str, status: &str) {
    let message = recv_message(rx).await;
    assert_eq!(message.kind, xfchat::shared::MessageKind::Status);
    assert_eq!(message.sender, who);
    assert_eq!(message.status.as_deref(), Some(status));
}

/// Assert nothing is queued on a mailbox right now.
pub fn assert_no_pending(rx: &mut mpsc::Receiver<Outbound>) {
    match rx.try_recv() {
        Err(_) => {}
        Ok(item) => panic!("expected empty mailbox, got {item:?}"),
    }
}
