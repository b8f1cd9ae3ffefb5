//! Persistence Collaborator
//!
//! The hub and the CRUD services consume storage only through the
//! [`ChatStore`] trait. [`PgStore`] is the PostgreSQL implementation used in
//! production; [`MemoryStore`] backs the server when no database is
//! configured and the test suite.
//!
//! Storage is a collaborator, not a dependency of correctness: the delivery
//! path treats a failed `save_message` as a logged event, never as a reason
//! to withhold a message.

/// In-memory store
pub mod memory;
/// PostgreSQL store
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage failure taxonomy.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("{message}")]
    Conflict { message: String },
}

impl StoreError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }
}

/// A registered chat user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// A chat group's durable roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(rename = "owner_id")]
    #[sqlx(rename = "owner_id")]
    pub owner: String,
    pub admins: Vec<String>,
    pub members: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn is_admin(&self, username: &str) -> bool {
        self.admins.iter().any(|admin| admin == username)
    }

    pub fn is_member(&self, username: &str) -> bool {
        self.members.iter().any(|member| member == username)
    }
}

/// One persisted chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredMessage {
    pub id: String,
    pub sender: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Narrow persistence interface consumed by the hub and the CRUD services.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn get_user(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn get_all_users(&self) -> Result<Vec<User>, StoreError>;
    async fn create_user(&self, username: &str) -> Result<User, StoreError>;
    /// Groups whose durable roster contains `username`.
    async fn get_user_groups(&self, username: &str) -> Result<Vec<Group>, StoreError>;

    async fn get_group(&self, group_id: &str) -> Result<Option<Group>, StoreError>;
    async fn create_group(&self, group: &Group) -> Result<(), StoreError>;
    async fn update_group(&self, group: &Group) -> Result<(), StoreError>;

    /// Best-effort persistence of a chat message.
    async fn save_message(&self, message: &StoredMessage) -> Result<(), StoreError>;
    async fn group_messages(&self, group_id: &str) -> Result<Vec<StoredMessage>, StoreError>;
    async fn direct_messages(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<StoredMessage>, StoreError>;
}
