//! Connection hub integration tests: registration and session replacement,
//! direct and group delivery, presence, kicks, backpressure eviction.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use common::*;
use xfchat::backend::hub::{ChatHub, DisconnectReason, HubSettings};
use xfchat::backend::store::{ChatStore, Group, StoreError, StoredMessage, User};
use xfchat::shared::{GroupUpdate, MessageKind, WireMessage};

fn chat(receiver: Option<&str>, group_id: Option<&str>, content: &str) -> WireMessage {
    WireMessage {
        id: None,
        kind: MessageKind::Message,
        sender: String::new(),
        receiver: receiver.map(str::to_string),
        group_id: group_id.map(str::to_string),
        content: Some(content.to_string()),
        status: None,
        data: None,
    }
}

fn typing(receiver: Option<&str>, group_id: Option<&str>) -> WireMessage {
    WireMessage {
        id: None,
        kind: MessageKind::Typing,
        sender: String::new(),
        receiver: receiver.map(str::to_string),
        group_id: group_id.map(str::to_string),
        content: None,
        status: Some("typing-start".to_string()),
        data: None,
    }
}

fn join(group_id: &str) -> WireMessage {
    WireMessage {
        id: None,
        kind: MessageKind::JoinGroup,
        sender: String::new(),
        receiver: None,
        group_id: Some(group_id.to_string()),
        content: None,
        status: None,
        data: None,
    }
}

#[tokio::test]
async fn direct_message_reaches_receiver_and_echoes_sender() {
    let (hub, store) = test_hub();
    let (alice, mut alice_rx) = hub.attach("alice").await;
    let (_bob, mut bob_rx) = hub.attach("bob").await;
    expect_status(&mut alice_rx, "bob", "online").await;

    hub.route(&alice, chat(Some("bob"), None, "hi")).await;

    let delivered = recv_message(&mut bob_rx).await;
    assert_eq!(delivered.sender, "alice");
    assert_eq!(delivered.receiver.as_deref(), Some("bob"));
    assert_eq!(delivered.content.as_deref(), Some("hi"));
    let id = delivered.id.clone().expect("hub assigns an id");
    assert!(!id.is_empty());

    // The sender sees the identical message echoed back.
    let echo = recv_message(&mut alice_rx).await;
    assert_eq!(echo, delivered);

    // Persisted once, best-effort.
    let saved = store.saved_messages();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].id, id);
    assert_eq!(saved[0].receiver.as_deref(), Some("bob"));
}

#[tokio::test]
async fn direct_message_to_offline_receiver_still_echoes() {
    let (hub, store) = test_hub();
    let (alice, mut alice_rx) = hub.attach("alice").await;

    hub.route(&alice, chat(Some("bob"), None, "anyone there?")).await;

    let echo = recv_message(&mut alice_rx).await;
    assert_eq!(echo.receiver.as_deref(), Some("bob"));
    assert_eq!(store.saved_messages().len(), 1);
}

#[tokio::test]
async fn group_fanout_delivers_exactly_once_to_each_member() {
    let (hub, _store) = test_hub();
    let (alice, mut alice_rx) = hub.attach("alice").await;
    let (bob, mut bob_rx) = hub.attach("bob").await;
    let (carol, mut carol_rx) = hub.attach("carol").await;
    expect_status(&mut alice_rx, "bob", "online").await;
    expect_status(&mut alice_rx, "carol", "online").await;
    expect_status(&mut bob_rx, "carol", "online").await;

    hub.route(&alice, join("g1")).await;
    hub.route(&bob, join("g1")).await;

    // carol is not a member; fanout does not require sender membership.
    hub.route(&carol, chat(None, Some("g1"), "hello")).await;

    let to_alice = recv_message(&mut alice_rx).await;
    assert_eq!(to_alice.sender, "carol");
    assert_eq!(to_alice.content.as_deref(), Some("hello"));
    let to_bob = recv_message(&mut bob_rx).await;
    assert_eq!(to_bob, to_alice);

    // Exactly once each; carol gets nothing, not being a member.
    assert_no_pending(&mut alice_rx);
    assert_no_pending(&mut bob_rx);
    assert_no_pending(&mut carol_rx);
}

#[tokio::test]
async fn group_sender_hears_its_own_message_through_membership() {
    let (hub, _store) = test_hub();
    let (alice, mut alice_rx) = hub.attach("alice").await;
    let (bob, mut bob_rx) = hub.attach("bob").await;
    expect_status(&mut alice_rx, "bob", "online").await;

    hub.route(&alice, join("g1")).await;
    hub.route(&bob, join("g1")).await;

    hub.route(&alice, chat(None, Some("g1"), "morning")).await;

    let to_alice = recv_message(&mut alice_rx).await;
    let to_bob = recv_message(&mut bob_rx).await;
    assert_eq!(to_alice, to_bob);
    assert_no_pending(&mut alice_rx);
    assert_no_pending(&mut bob_rx);
}

#[tokio::test]
async fn invalid_message_produces_no_delivery_and_no_persistence() {
    let (hub, store) = test_hub();
    let (alice, mut alice_rx) = hub.attach("alice").await;
    let (_bob, mut bob_rx) = hub.attach("bob").await;
    expect_status(&mut alice_rx, "bob", "online").await;

    // Empty content.
    hub.route(&alice, chat(Some("bob"), None, "")).await;
    // No addressee at all.
    hub.route(&alice, chat(None, None, "orphan")).await;

    assert_no_pending(&mut alice_rx);
    assert_no_pending(&mut bob_rx);
    assert!(store.saved_messages().is_empty());
}

#[tokio::test]
async fn session_replacement_keeps_one_entry_and_closes_the_old() {
    let (hub, _store) = test_hub();
    let (first, mut first_rx) = hub.attach("alice").await;
    let (_bob, mut bob_rx) = hub.attach("bob").await;
    expect_status(&mut first_rx, "bob", "online").await;

    // bob attached after alice's first login, so the only online broadcast
    // he sees for alice is the replacement's.
    let (second, mut second_rx) = hub.attach("alice").await;
    expect_status(&mut bob_rx, "alice", "online").await;

    // The superseded session gets the close signal.
    assert_eq!(recv_close(&mut first_rx).await, "session replaced");

    // Exactly one registry entry for alice.
    let mut online = hub.online_identities().await;
    online.sort();
    assert_eq!(online, vec!["alice".to_string(), "bob".to_string()]);

    // The old session's teardown must not erase the successor or announce
    // alice offline.
    hub.disconnect(&first, DisconnectReason::Superseded).await;
    assert!(hub.snapshot().await.contains_key("alice"));
    assert_no_pending(&mut bob_rx);

    // The new session is live.
    hub.route(&second, chat(Some("bob"), None, "back again")).await;
    let delivered = recv_message(&mut bob_rx).await;
    assert_eq!(delivered.sender, "alice");
    let echo = recv_message(&mut second_rx).await;
    assert_eq!(echo, delivered);
}

#[tokio::test]
async fn disconnect_broadcasts_offline_once_and_clears_snapshot() {
    let (hub, _store) = test_hub();
    let (alice, mut alice_rx) = hub.attach("alice").await;
    let (_bob, mut bob_rx) = hub.attach("bob").await;
    let (_carol, mut carol_rx) = hub.attach("carol").await;
    expect_status(&mut alice_rx, "bob", "online").await;
    expect_status(&mut alice_rx, "carol", "online").await;
    expect_status(&mut bob_rx, "carol", "online").await;

    hub.disconnect(&alice, DisconnectReason::ReadError).await;
    // A second trigger for the same connection is a no-op.
    hub.disconnect(&alice, DisconnectReason::WriteError).await;

    expect_status(&mut bob_rx, "alice", "offline").await;
    expect_status(&mut carol_rx, "alice", "offline").await;
    assert_no_pending(&mut bob_rx);
    assert_no_pending(&mut carol_rx);

    assert!(!hub.snapshot().await.contains_key("alice"));
}

#[tokio::test]
async fn kicked_member_stops_receiving_group_messages() {
    let (hub, _store) = test_hub();
    let (alice, mut alice_rx) = hub.attach("alice").await;
    let (bob, mut bob_rx) = hub.attach("bob").await;
    expect_status(&mut alice_rx, "bob", "online").await;

    hub.route(&alice, join("g1")).await;
    hub.route(&bob, join("g1")).await;

    hub.kick_from_group("bob", "g1").await;

    // Remaining members and the kicked session are both told.
    let to_alice = recv_message(&mut alice_rx).await;
    assert_eq!(to_alice.kind, MessageKind::GroupUpdate);
    assert_eq!(
        to_alice.data,
        Some(GroupUpdate::MemberKicked {
            username: "bob".to_string()
        })
    );
    let to_bob = recv_message(&mut bob_rx).await;
    assert_eq!(to_bob.data, to_alice.data);

    // A later group message no longer reaches bob.
    hub.route(&alice, chat(None, Some("g1"), "without bob")).await;
    let delivered = recv_message(&mut alice_rx).await;
    assert_eq!(delivered.content.as_deref(), Some("without bob"));
    assert_no_pending(&mut bob_rx);
}

#[tokio::test]
async fn typing_goes_to_the_receiver_only_and_is_never_persisted() {
    let (hub, store) = test_hub();
    let (alice, mut alice_rx) = hub.attach("alice").await;
    let (bob, mut bob_rx) = hub.attach("bob").await;
    expect_status(&mut alice_rx, "bob", "online").await;

    hub.route(&alice, typing(Some("bob"), None)).await;
    let delivered = recv_message(&mut bob_rx).await;
    assert_eq!(delivered.kind, MessageKind::Typing);
    assert_eq!(delivered.sender, "alice");
    // No echo for typing.
    assert_no_pending(&mut alice_rx);

    // Group typing is not propagated.
    hub.route(&alice, join("g1")).await;
    hub.route(&bob, join("g1")).await;
    hub.route(&bob, typing(None, Some("g1"))).await;
    assert_no_pending(&mut alice_rx);
    assert_no_pending(&mut bob_rx);

    // Self-addressed typing is dropped too.
    hub.route(&alice, typing(Some("alice"), None)).await;
    assert_no_pending(&mut alice_rx);

    assert!(store.saved_messages().is_empty());
}

#[tokio::test]
async fn unknown_frame_kinds_are_ignored() {
    let (hub, store) = test_hub();
    let (alice, mut alice_rx) = hub.attach("alice").await;
    let (_bob, mut bob_rx) = hub.attach("bob").await;
    expect_status(&mut alice_rx, "bob", "online").await;

    let frame: WireMessage =
        serde_json::from_str(r#"{"type":"video_call","receiver":"bob"}"#).unwrap();
    hub.route(&alice, frame).await;

    assert_no_pending(&mut alice_rx);
    assert_no_pending(&mut bob_rx);
    assert!(store.saved_messages().is_empty());
}

#[tokio::test]
async fn join_group_requires_a_live_session() {
    let (hub, _store) = test_hub();
    assert!(!hub.join_group("ghost", "g1").await);

    let (_alice, _alice_rx) = hub.attach("alice").await;
    assert!(hub.join_group("alice", "g1").await);
}

#[tokio::test]
async fn slow_consumer_is_evicted_after_send_timeout() {
    let settings = HubSettings {
        mailbox_capacity: 1,
        send_timeout: Duration::from_millis(50),
        ..test_settings()
    };
    let (hub, _store) = test_hub_with(settings);
    let (alice, mut alice_rx) = hub.attach("alice").await;
    // bob never drains his mailbox
    let (_bob, _bob_rx_held) = hub.attach("bob").await;
    expect_status(&mut alice_rx, "bob", "online").await;

    // First message fills bob's single-slot mailbox; the second waits out
    // the send timeout and marks him unresponsive.
    hub.route(&alice, chat(Some("bob"), None, "one")).await;
    hub.route(&alice, chat(Some("bob"), None, "two")).await;

    // Eviction runs on a spawned task; give it a moment.
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(hub.online_identities().await, vec!["alice".to_string()]);
    // alice hears the eviction as a normal offline transition (after her
    // own two echoes).
    recv_message(&mut alice_rx).await;
    recv_message(&mut alice_rx).await;
    expect_status(&mut alice_rx, "bob", "offline").await;
}

#[tokio::test]
async fn group_update_notifications_reach_connected_members() {
    let (hub, _store) = test_hub();
    let (alice, mut alice_rx) = hub.attach("alice").await;
    hub.route(&alice, join("g1")).await;

    hub.notify_group_update(
        "g1",
        GroupUpdate::AdminAdded {
            username: "alice".to_string(),
        },
    )
    .await;

    let delivered = recv_message(&mut alice_rx).await;
    assert_eq!(delivered.kind, MessageKind::GroupUpdate);
    assert_eq!(delivered.group_id.as_deref(), Some("g1"));
    assert_eq!(
        delivered.data,
        Some(GroupUpdate::AdminAdded {
            username: "alice".to_string()
        })
    );
}

/// Store whose writes always fail; delivery must not care.
struct FailingStore;

#[async_trait]
impl ChatStore for FailingStore {
    async fn get_user(&self, _username: &str) -> Result<Option<User>, StoreError> {
        Ok(None)
    }
    async fn get_all_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(Vec::new())
    }
    async fn create_user(&self, _username: &str) -> Result<User, StoreError> {
        Err(StoreError::conflict("store is down"))
    }
    async fn get_user_groups(&self, _username: &str) -> Result<Vec<Group>, StoreError> {
        Ok(Vec::new())
    }
    async fn get_group(&self, _group_id: &str) -> Result<Option<Group>, StoreError> {
        Ok(None)
    }
    async fn create_group(&self, _group: &Group) -> Result<(), StoreError> {
        Err(StoreError::conflict("store is down"))
    }
    async fn update_group(&self, _group: &Group) -> Result<(), StoreError> {
        Err(StoreError::conflict("store is down"))
    }
    async fn save_message(&self, _message: &StoredMessage) -> Result<(), StoreError> {
        Err(StoreError::conflict("store is down"))
    }
    async fn group_messages(&self, _group_id: &str) -> Result<Vec<StoredMessage>, StoreError> {
        Ok(Vec::new())
    }
    async fn direct_messages(
        &self,
        _user_a: &str,
        _user_b: &str,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn persistence_failure_does_not_block_delivery() {
    let hub = ChatHub::new(Arc::new(FailingStore), test_settings());
    let (alice, mut alice_rx) = hub.attach("alice").await;
    let (_bob, mut bob_rx) = hub.attach("bob").await;
    expect_status(&mut alice_rx, "bob", "online").await;

    hub.route(&alice, chat(Some("bob"), None, "still delivered")).await;

    let delivered = recv_message(&mut bob_rx).await;
    assert_eq!(delivered.content.as_deref(), Some("still delivered"));
    let echo = recv_message(&mut alice_rx).await;
    assert_eq!(echo, delivered);
}
