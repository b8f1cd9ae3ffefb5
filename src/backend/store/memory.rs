//! In-memory store.
//!
//! Used when no `DATABASE_URL` is configured (the server still runs, history
//! just lives for the process lifetime) and by the test suite.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{ChatStore, Group, StoreError, StoredMessage, User};

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    groups: HashMap<String, Group>,
    messages: Vec<StoredMessage>,
}

/// `ChatStore` over process memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message persisted so far, in arrival order.
    pub fn saved_messages(&self) -> Vec<StoredMessage> {
        self.inner.lock().unwrap().messages.clone()
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn get_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.inner.lock().unwrap().users.get(username).cloned())
    }

    async fn get_all_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.inner.lock().unwrap().users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    async fn create_user(&self, username: &str) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.contains_key(username) {
            return Err(StoreError::conflict(format!(
                "user {username} already exists"
            )));
        }
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            created_at: Utc::now(),
        };
        inner.users.insert(username.to_string(), user.clone());
        Ok(user)
    }

    async fn get_user_groups(&self, username: &str) -> Result<Vec<Group>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut groups: Vec<Group> = inner
            .groups
            .values()
            .filter(|group| group.is_member(username))
            .cloned()
            .collect();
        groups.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(groups)
    }

    async fn get_group(&self, group_id: &str) -> Result<Option<Group>, StoreError> {
        Ok(self.inner.lock().unwrap().groups.get(group_id).cloned())
    }

    async fn create_group(&self, group: &Group) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .groups
            .insert(group.id.clone(), group.clone());
        Ok(())
    }

    async fn update_group(&self, group: &Group) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.groups.contains_key(&group.id) {
            return Err(StoreError::not_found("group"));
        }
        inner.groups.insert(group.id.clone(), group.clone());
        Ok(())
    }

    async fn save_message(&self, message: &StoredMessage) -> Result<(), StoreError> {
        self.inner.lock().unwrap().messages.push(message.clone());
        Ok(())
    }

    async fn group_messages(&self, group_id: &str) -> Result<Vec<StoredMessage>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.group_id.as_deref() == Some(group_id))
            .cloned()
            .collect())
    }

    async fn direct_messages(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| {
                m.group_id.is_none()
                    && ((m.sender == user_a && m.receiver.as_deref() == Some(user_b))
                        || (m.sender == user_b && m.receiver.as_deref() == Some(user_a)))
            })
            .cloned()
            .collect())
    }
}
