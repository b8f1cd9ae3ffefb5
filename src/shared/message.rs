//! Wire Message Data Structures
//!
//! This module defines the message envelope used on chat WebSockets and its
//! serialization to/from JSON. A single flat object shape carries every
//! message kind; which optional fields are meaningful depends on `type`.
//!
//! # Wire Format
//!
//! ```json
//! { "id": "…",
//!   "type": "message" | "typing" | "status" | "join_group" | "group_update",
//!   "sender": "alice",
//!   "receiver": "bob",
//!   "group_id": "g1",
//!   "content": "hi",
//!   "status": "online",
//!   "data": { "type": "member_added", "data": { "username": "bob" } } }
//! ```
//!
//! Optional fields are omitted when absent, so clients never see `null`
//! placeholders. Unrecognized `type` values deserialize to
//! [`MessageKind::Unknown`] and are ignored by the router rather than
//! breaking the connection.

use serde::{Deserialize, Serialize};

/// Discriminant for the wire message union.
///
/// `Unknown` is the catch-all for message types this server does not handle;
/// parsing succeeds and the router drops the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Chat content addressed to a group or a single receiver
    Message,
    /// Ephemeral typing indicator, never persisted
    Typing,
    /// Presence announcement (server-originated)
    Status,
    /// Request to join a group's live fanout set
    JoinGroup,
    /// Group administration notification (server-originated)
    GroupUpdate,
    /// Any unrecognized type; parsed and ignored
    #[serde(other)]
    Unknown,
}

/// Payload of a `group_update` message.
///
/// A closed union keyed by the nested update type, so every consumer gets
/// exhaustiveness checking instead of an untyped blob. Serializes as
/// `{"type": "member_added", "data": {"username": "bob"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GroupUpdate {
    MemberAdded { username: String },
    MemberKicked { username: String },
    AdminAdded { username: String },
    AdminRemoved { username: String },
}

/// A single frame on a chat WebSocket.
///
/// Used in both directions: clients send `message`, `typing` and
/// `join_group` frames; the server sends chat messages back out plus
/// `status` and `group_update` frames it originates. The hub overwrites
/// `sender` with the connection's authenticated identity on ingress, so a
/// client cannot spoof another sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Message id; assigned by the hub when a client omits it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Message kind, serialized as `type`
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Identity of the originating connection
    #[serde(default)]
    pub sender: String,
    /// Target identity for direct messages and typing indicators
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    /// Target group for group messages and joins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Chat text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Presence state, e.g. "online" / "offline"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Structured payload for group updates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<GroupUpdate>,
}

impl WireMessage {
    /// Build a presence announcement for `identity`.
    pub fn status(identity: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: MessageKind::Status,
            sender: identity.into(),
            receiver: None,
            group_id: None,
            content: None,
            status: Some(status.into()),
            data: None,
        }
    }

    /// Build a group administration notification for `group_id`.
    pub fn group_update(group_id: impl Into<String>, update: GroupUpdate) -> Self {
        Self {
            id: None,
            kind: MessageKind::GroupUpdate,
            sender: String::new(),
            receiver: None,
            group_id: Some(group_id.into()),
            content: None,
            status: None,
            data: Some(update),
        }
    }

    /// Whether this chat message carries deliverable content.
    ///
    /// A `message` frame with empty content, or with neither a group id nor
    /// a receiver, is invalid and must be dropped without side effects.
    pub fn is_deliverable_chat(&self) -> bool {
        let has_content = self.content.as_deref().is_some_and(|c| !c.is_empty());
        let has_target = self.group_id.as_deref().is_some_and(|g| !g.is_empty())
            || self.receiver.as_deref().is_some_and(|r| !r.is_empty());
        has_content && has_target
    }
}
