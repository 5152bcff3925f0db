//! SQLite adapter for the quest repository port.
//!
//! All multi-row effects run inside a transaction. The one-active-assignment
//! invariant lives here: `atomic_assign` races on the partial unique index
//! with `INSERT OR IGNORE`, never on an application-level read.

use crate::domain::models::{
    Assignment, AssignmentStatus, Quest, Task, TaskCompletion, VerificationConfig,
};
use crate::domain::ports::{AtomicAssignOutcome, QuestRepository, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

pub struct SqliteQuestRepository {
    pool: SqlitePool,
}

impl SqliteQuestRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

fn quest_from_row(row: &SqliteRow) -> Result<Quest, StoreError> {
    Ok(Quest {
        id: Uuid::parse_str(&row.get::<String, _>("id"))?,
        guild_id: row.get("guild_id"),
        name: row.get("name"),
        description: row.get("description"),
        points: row.get("points"),
        active: row.get::<i64, _>("active") != 0,
        completion_count: row.get("completion_count"),
        created_at: parse_datetime(&row.get::<String, _>("created_at"))?,
        updated_at: parse_datetime(&row.get::<String, _>("updated_at"))?,
    })
}

fn task_from_row(row: &SqliteRow) -> Result<Task, StoreError> {
    let verification: VerificationConfig =
        serde_json::from_str(&row.get::<String, _>("verification"))?;
    Ok(Task {
        id: Uuid::parse_str(&row.get::<String, _>("id"))?,
        quest_id: Uuid::parse_str(&row.get::<String, _>("quest_id"))?,
        title: row.get("title"),
        description: row.get("description"),
        points: row.get("points"),
        verification,
        position: row.get("position"),
    })
}

fn assignment_from_row(row: &SqliteRow) -> Result<Assignment, StoreError> {
    let status_raw: String = row.get("status");
    let status = AssignmentStatus::from_str(&status_raw)
        .ok_or_else(|| StoreError::ParseError(format!("Unknown assignment status: {status_raw}")))?;
    let completed_at: Option<String> = row.get("completed_at");
    #[allow(clippy::cast_sign_loss)]
    Ok(Assignment {
        id: Uuid::parse_str(&row.get::<String, _>("id"))?,
        user_id: row.get("user_id"),
        guild_id: row.get("guild_id"),
        quest_id: Uuid::parse_str(&row.get::<String, _>("quest_id"))?,
        attempts: row.get::<i64, _>("attempts") as u32,
        status,
        assigned_at: parse_datetime(&row.get::<String, _>("assigned_at"))?,
        updated_at: parse_datetime(&row.get::<String, _>("updated_at"))?,
        completed_at: completed_at.as_deref().map(parse_datetime).transpose()?,
    })
}

#[async_trait]
impl QuestRepository for SqliteQuestRepository {
    async fn create_quest(&self, quest: &Quest, tasks: &[Task]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO quests (id, guild_id, name, description, points, active, completion_count, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(quest.id.to_string())
        .bind(&quest.guild_id)
        .bind(&quest.name)
        .bind(&quest.description)
        .bind(quest.points)
        .bind(i64::from(quest.active))
        .bind(quest.completion_count)
        .bind(quest.created_at.to_rfc3339())
        .bind(quest.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for task in tasks {
            sqlx::query(
                "INSERT INTO tasks (id, quest_id, title, description, points, verification, position)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(task.id.to_string())
            .bind(task.quest_id.to_string())
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.points)
            .bind(serde_json::to_string(&task.verification)?)
            .bind(task.position)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_quest(&self, id: Uuid) -> Result<Option<Quest>, StoreError> {
        let row = sqlx::query("SELECT * FROM quests WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(quest_from_row).transpose()
    }

    async fn get_active_quests(&self, guild_id: &str) -> Result<Vec<Quest>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM quests WHERE guild_id = ? AND active = 1 ORDER BY created_at",
        )
        .bind(guild_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(quest_from_row).collect()
    }

    async fn get_tasks(&self, quest_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query("SELECT * FROM tasks WHERE quest_id = ? ORDER BY position")
            .bind(quest_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(task_from_row).collect()
    }

    async fn set_quest_active(&self, id: Uuid, active: bool) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE quests SET active = ?, updated_at = ? WHERE id = ?")
            .bind(i64::from(active))
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn get_completed_quest_ids(
        &self,
        user_id: &str,
        guild_id: &str,
    ) -> Result<Vec<Uuid>, StoreError> {
        let rows = sqlx::query(
            "SELECT quest_id FROM assignments WHERE user_id = ? AND guild_id = ? AND status = 'completed'",
        )
        .bind(user_id)
        .bind(guild_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| Ok(Uuid::parse_str(&row.get::<String, _>("quest_id"))?))
            .collect()
    }

    async fn atomic_assign(
        &self,
        user_id: &str,
        guild_id: &str,
        quest_id: Uuid,
    ) -> Result<AtomicAssignOutcome, StoreError> {
        let assignment = Assignment::new(user_id, guild_id, quest_id);

        // The partial unique index over non-terminal assignments makes this
        // insert the only arbiter of the one-active-assignment invariant.
        let result = sqlx::query(
            "INSERT OR IGNORE INTO assignments (id, user_id, guild_id, quest_id, attempts, status, assigned_at, updated_at, completed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL)",
        )
        .bind(assignment.id.to_string())
        .bind(&assignment.user_id)
        .bind(&assignment.guild_id)
        .bind(assignment.quest_id.to_string())
        .bind(i64::from(assignment.attempts))
        .bind(assignment.status.as_str())
        .bind(assignment.assigned_at.to_rfc3339())
        .bind(assignment.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(AtomicAssignOutcome::Created(assignment));
        }

        let existing = self
            .get_active_assignment(user_id, guild_id)
            .await?
            .ok_or_else(|| {
                StoreError::ParseError(format!(
                    "Assignment insert was ignored but no active assignment exists for {user_id}/{guild_id}"
                ))
            })?;
        Ok(AtomicAssignOutcome::AlreadyAssigned(existing))
    }

    async fn get_active_assignment(
        &self,
        user_id: &str,
        guild_id: &str,
    ) -> Result<Option<Assignment>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM assignments WHERE user_id = ? AND guild_id = ? AND status = 'assigned'",
        )
        .bind(user_id)
        .bind(guild_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(assignment_from_row).transpose()
    }

    async fn increment_attempt(&self, assignment_id: Uuid) -> Result<u32, StoreError> {
        let row = sqlx::query(
            "UPDATE assignments SET attempts = attempts + 1, updated_at = ? WHERE id = ? RETURNING attempts",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(assignment_id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(assignment_id))?;
        #[allow(clippy::cast_sign_loss)]
        Ok(row.get::<i64, _>("attempts") as u32)
    }

    async fn mark_failed(&self, assignment_id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE assignments SET status = 'failed', updated_at = ? WHERE id = ? AND status = 'assigned'",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(assignment_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_completed_task_ids(
        &self,
        user_id: &str,
        quest_id: Uuid,
    ) -> Result<Vec<Uuid>, StoreError> {
        let rows = sqlx::query(
            "SELECT tc.task_id FROM task_completions tc
             JOIN assignments a ON a.id = tc.assignment_id
             WHERE tc.user_id = ? AND a.quest_id = ?",
        )
        .bind(user_id)
        .bind(quest_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| Ok(Uuid::parse_str(&row.get::<String, _>("task_id"))?))
            .collect()
    }

    async fn complete_task(
        &self,
        completion: &TaskCompletion,
        finish_assignment: bool,
    ) -> Result<i64, StoreError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        // UNIQUE(user_id, task_id) blocks a double credit; a concurrent
        // loser of that race gets a distinct error, not a raw violation.
        let inserted = sqlx::query(
            "INSERT INTO task_completions (id, assignment_id, task_id, user_id, guild_id, points_awarded, identifier, completed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(completion.id.to_string())
        .bind(completion.assignment_id.to_string())
        .bind(completion.task_id.to_string())
        .bind(&completion.user_id)
        .bind(&completion.guild_id)
        .bind(completion.points_awarded)
        .bind(&completion.identifier)
        .bind(completion.completed_at.to_rfc3339())
        .execute(&mut *tx)
        .await;
        if let Err(e) = inserted {
            if e.as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                return Err(StoreError::DuplicateCompletion);
            }
            return Err(e.into());
        }

        if finish_assignment {
            sqlx::query(
                "UPDATE assignments SET status = 'completed', completed_at = ?, updated_at = ?
                 WHERE id = ? AND status = 'assigned'",
            )
            .bind(&now)
            .bind(&now)
            .bind(completion.assignment_id.to_string())
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "UPDATE quests SET completion_count = completion_count + 1, updated_at = ?
                 WHERE id = (SELECT quest_id FROM assignments WHERE id = ?)",
            )
            .bind(&now)
            .bind(completion.assignment_id.to_string())
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "INSERT INTO xp_ledger (user_id, guild_id, total_xp, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (user_id, guild_id)
             DO UPDATE SET total_xp = total_xp + excluded.total_xp, updated_at = excluded.updated_at",
        )
        .bind(&completion.user_id)
        .bind(&completion.guild_id)
        .bind(completion.points_awarded)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let total_xp: i64 = sqlx::query(
            "SELECT total_xp FROM xp_ledger WHERE user_id = ? AND guild_id = ?",
        )
        .bind(&completion.user_id)
        .bind(&completion.guild_id)
        .fetch_one(&mut *tx)
        .await?
        .get("total_xp");

        tx.commit().await?;
        Ok(total_xp)
    }

    async fn xp_total(&self, user_id: &str, guild_id: &str) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT total_xp FROM xp_ledger WHERE user_id = ? AND guild_id = ?")
            .bind(user_id)
            .bind(guild_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map_or(0, |row| row.get("total_xp")))
    }
}
