//! SQLite adapter for authoring conversations.
//!
//! Expiry is enforced on read: a row whose `expires_at` has passed is
//! deleted and reported as absent, so the next turn starts fresh.

use crate::domain::models::AuthoringConversation;
use crate::domain::ports::{ConversationRepository, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

pub struct SqliteConversationRepository {
    pool: SqlitePool,
}

impl SqliteConversationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationRepository for SqliteConversationRepository {
    async fn get(
        &self,
        user_id: &str,
        guild_id: &str,
    ) -> Result<Option<AuthoringConversation>, StoreError> {
        let row = sqlx::query(
            "SELECT transcript, draft, expires_at, updated_at FROM conversations
             WHERE user_id = ? AND guild_id = ?",
        )
        .bind(user_id)
        .bind(guild_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at = DateTime::parse_from_rfc3339(&row.get::<String, _>("expires_at"))?
            .with_timezone(&Utc);
        if Utc::now() >= expires_at {
            debug!(user_id, guild_id, "deleting expired authoring conversation");
            self.delete(user_id, guild_id).await?;
            return Ok(None);
        }

        Ok(Some(AuthoringConversation {
            user_id: user_id.to_string(),
            guild_id: guild_id.to_string(),
            transcript: serde_json::from_str(&row.get::<String, _>("transcript"))?,
            draft: serde_json::from_str(&row.get::<String, _>("draft"))?,
            expires_at,
            updated_at: DateTime::parse_from_rfc3339(&row.get::<String, _>("updated_at"))?
                .with_timezone(&Utc),
        }))
    }

    async fn put(&self, conversation: &AuthoringConversation) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO conversations (user_id, guild_id, transcript, draft, expires_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (user_id, guild_id)
             DO UPDATE SET transcript = excluded.transcript, draft = excluded.draft,
                           expires_at = excluded.expires_at, updated_at = excluded.updated_at",
        )
        .bind(&conversation.user_id)
        .bind(&conversation.guild_id)
        .bind(serde_json::to_string(&conversation.transcript)?)
        .bind(serde_json::to_string(&conversation.draft)?)
        .bind(conversation.expires_at.to_rfc3339())
        .bind(conversation.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, user_id: &str, guild_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM conversations WHERE user_id = ? AND guild_id = ?")
            .bind(user_id)
            .bind(guild_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
