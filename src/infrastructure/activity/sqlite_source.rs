//! SQLite-backed activity source.
//!
//! The engine never sees raw platform traffic; an ingest process (or the
//! CLI's seed commands) writes derived facts into `activity_events` and
//! `role_memberships`, and native checks aggregate over them here.

use crate::domain::models::ActivityKind;
use crate::domain::ports::{ActivitySource, ActivityWindow};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

pub struct SqliteActivitySource {
    pool: SqlitePool,
}

impl SqliteActivitySource {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record one activity event.
    pub async fn record_event(
        &self,
        guild_id: &str,
        user_id: &str,
        channel_id: Option<&str>,
        kind: &str,
        occurred_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO activity_events (guild_id, user_id, channel_id, kind, occurred_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(guild_id)
        .bind(user_id)
        .bind(channel_id)
        .bind(kind)
        .bind(occurred_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn grant_role(&self, guild_id: &str, user_id: &str, role_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO role_memberships (guild_id, user_id, role_id) VALUES (?, ?, ?)",
        )
        .bind(guild_id)
        .bind(user_id)
        .bind(role_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn revoke_role(&self, guild_id: &str, user_id: &str, role_id: &str) -> Result<()> {
        sqlx::query(
            "DELETE FROM role_memberships WHERE guild_id = ? AND user_id = ? AND role_id = ?",
        )
        .bind(guild_id)
        .bind(user_id)
        .bind(role_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ActivitySource for SqliteActivitySource {
    async fn count(
        &self,
        user_id: &str,
        guild_id: &str,
        kind: &ActivityKind,
        window: &ActivityWindow,
    ) -> Result<i64> {
        if let ActivityKind::RoleHeld { role_id } = kind {
            let row = sqlx::query(
                "SELECT COUNT(*) AS n FROM role_memberships
                 WHERE guild_id = ? AND user_id = ? AND role_id = ?",
            )
            .bind(guild_id)
            .bind(user_id)
            .bind(role_id)
            .fetch_one(&self.pool)
            .await?;
            return Ok(row.get("n"));
        }

        let mut sql = String::from(
            "SELECT COUNT(*) AS n FROM activity_events
             WHERE guild_id = ? AND user_id = ? AND kind = ?",
        );
        if window.since.is_some() {
            sql.push_str(" AND occurred_at >= ?");
        }
        if window.channel_id.is_some() {
            sql.push_str(" AND channel_id = ?");
        }

        let mut query = sqlx::query(&sql)
            .bind(guild_id)
            .bind(user_id)
            .bind(kind.event_name());
        if let Some(since) = &window.since {
            query = query.bind(since.to_rfc3339());
        }
        if let Some(channel_id) = &window.channel_id {
            query = query.bind(channel_id);
        }

        let row = query.fetch_one(&self.pool).await?;
        Ok(row.get("n"))
    }
}
