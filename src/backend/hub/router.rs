//! Inbound Frame Routing
//!
//! One entry point, [`ChatHub::route`], dispatches a parsed frame by its
//! message kind. Chat messages are persisted best-effort before delivery;
//! persistence failure is logged and never cancels fanout.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::backend::store::StoredMessage;
use crate::shared::{MessageKind, WireMessage};

use super::{ChatHub, Connection};

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

impl ChatHub {
    /// Route one inbound frame from `conn`. The sender field is overwritten
    /// with the connection's identity before any dispatch, so clients cannot
    /// speak for anyone else.
    pub async fn route(&self, conn: &Arc<Connection>, mut message: WireMessage) {
        message.sender = conn.identity().to_string();
        match message.kind {
            MessageKind::Message => self.handle_chat_message(conn, message).await,
            MessageKind::Typing => self.handle_typing(message).await,
            MessageKind::JoinGroup => {
                if let Some(group_id) = non_empty(&message.group_id) {
                    self.join_group(&message.sender, group_id).await;
                }
            }
            MessageKind::Status | MessageKind::GroupUpdate | MessageKind::Unknown => {
                tracing::debug!(
                    "[Hub] Ignoring {:?} frame from {}",
                    message.kind,
                    message.sender
                );
            }
        }
    }

    async fn handle_chat_message(&self, conn: &Arc<Connection>, mut message: WireMessage) {
        if message.id.is_none() {
            message.id = Some(Uuid::new_v4().to_string());
        }
        if !message.is_deliverable_chat() {
            tracing::warn!(
                "[Hub] Invalid message from {}: empty content or no recipient",
                message.sender
            );
            return;
        }

        // Durability is best-effort: the attempt precedes fanout, its
        // failure never blocks it.
        let record = StoredMessage {
            id: message.id.clone().unwrap_or_default(),
            sender: message.sender.clone(),
            receiver: non_empty(&message.receiver).map(str::to_string),
            group_id: non_empty(&message.group_id).map(str::to_string),
            content: message.content.clone().unwrap_or_default(),
            timestamp: Utc::now(),
        };
        if let Err(e) = self.store().save_message(&record).await {
            tracing::error!("[Hub] Failed to save message from {}: {}", message.sender, e);
        }

        let frame = match serde_json::to_string(&message) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("[Hub] Failed to serialize message from {}: {}", message.sender, e);
                return;
            }
        };

        if let Some(group_id) = non_empty(&message.group_id) {
            let members = {
                let state = self.state().read().await;
                state.members(group_id)
            };
            for member in members {
                self.deliver(&member, &frame).await;
            }
            return;
        }

        if let Some(receiver) = non_empty(&message.receiver) {
            let target = {
                let state = self.state().read().await;
                state.lookup(receiver)
            };
            if let Some(target) = target {
                if target.identity() != message.sender {
                    self.deliver(&target, &frame).await;
                }
            }
            // Echo back so the sender's client sees the message confirmed.
            self.deliver(conn, &frame).await;
        }
    }

    async fn handle_typing(&self, message: WireMessage) {
        // Group typing indicators are not propagated.
        if non_empty(&message.group_id).is_some() {
            return;
        }
        let Some(receiver) = non_empty(&message.receiver) else {
            return;
        };
        if receiver == message.sender {
            return;
        }

        let frame = match serde_json::to_string(&message) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(
                    "[Hub] Failed to serialize typing frame from {}: {}",
                    message.sender,
                    e
                );
                return;
            }
        };
        let target = {
            let state = self.state().read().await;
            state.lookup(receiver)
        };
        if let Some(target) = target {
            self.deliver(&target, &frame).await;
        }
    }
}
