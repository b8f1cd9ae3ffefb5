//! PostgreSQL store backed by sqlx.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{ChatStore, Group, StoreError, StoredMessage, User};

/// `ChatStore` over a PostgreSQL pool. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatStore for PgStore {
    async fn get_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_all_users(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, username, created_at FROM users ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn create_user(&self, username: &str) -> Result<User, StoreError> {
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            created_at: chrono::Utc::now(),
        };
        let result = sqlx::query(
            "INSERT INTO users (id, username, created_at) VALUES ($1, $2, $3)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(user),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(
                StoreError::conflict(format!("user {username} already exists")),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_user_groups(&self, username: &str) -> Result<Vec<Group>, StoreError> {
        let groups = sqlx::query_as::<_, Group>(
            "SELECT id, name, owner_id, admins, members, created_at \
             FROM groups WHERE $1 = ANY(members) ORDER BY created_at",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    async fn get_group(&self, group_id: &str) -> Result<Option<Group>, StoreError> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, name, owner_id, admins, members, created_at FROM groups WHERE id = $1",
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    async fn create_group(&self, group: &Group) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO groups (id, name, owner_id, admins, members, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&group.id)
        .bind(&group.name)
        .bind(&group.owner)
        .bind(&group.admins)
        .bind(&group.members)
        .bind(group.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_group(&self, group: &Group) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE groups SET name = $2, owner_id = $3, admins = $4, members = $5 WHERE id = $1",
        )
        .bind(&group.id)
        .bind(&group.name)
        .bind(&group.owner)
        .bind(&group.admins)
        .bind(&group.members)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("group"));
        }
        Ok(())
    }

    async fn save_message(&self, message: &StoredMessage) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO messages (id, sender, receiver, group_id, content, timestamp) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&message.id)
        .bind(&message.sender)
        .bind(&message.receiver)
        .bind(&message.group_id)
        .bind(&message.content)
        .bind(message.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn group_messages(&self, group_id: &str) -> Result<Vec<StoredMessage>, StoreError> {
        let messages = sqlx::query_as::<_, StoredMessage>(
            "SELECT id, sender, receiver, group_id, content, timestamp \
             FROM messages WHERE group_id = $1 ORDER BY timestamp",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    async fn direct_messages(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let messages = sqlx::query_as::<_, StoredMessage>(
            "SELECT id, sender, receiver, group_id, content, timestamp \
             FROM messages \
             WHERE group_id IS NULL \
               AND ((sender = $1 AND receiver = $2) OR (sender = $2 AND receiver = $1)) \
             ORDER BY timestamp",
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }
}
