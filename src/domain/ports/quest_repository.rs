use crate::domain::models::{Assignment, Quest, Task, TaskCompletion};
use crate::domain::ports::errors::StoreError;
use async_trait::async_trait;
use uuid::Uuid;

/// Outcome of the atomic insert-if-absent assignment step.
///
/// The already-assigned decision is made inside the store's single atomic
/// operation; application-level read-then-write is insufficient under
/// concurrent requests from the same user.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomicAssignOutcome {
    /// The insert won; this request now owns the assignment.
    Created(Assignment),
    /// A non-terminal assignment already existed (possibly created by a
    /// concurrent request that won the race).
    AlreadyAssigned(Assignment),
}

/// Repository port for quests, assignments, completions, and the XP ledger.
#[async_trait]
pub trait QuestRepository: Send + Sync {
    /// Persist a quest and its tasks in one transaction.
    async fn create_quest(&self, quest: &Quest, tasks: &[Task]) -> Result<(), StoreError>;

    async fn get_quest(&self, id: Uuid) -> Result<Option<Quest>, StoreError>;

    /// Active quests in a guild.
    async fn get_active_quests(&self, guild_id: &str) -> Result<Vec<Quest>, StoreError>;

    /// Tasks of a quest, ordered by position.
    async fn get_tasks(&self, quest_id: Uuid) -> Result<Vec<Task>, StoreError>;

    /// Set a quest's active flag.
    async fn set_quest_active(&self, id: Uuid, active: bool) -> Result<(), StoreError>;

    /// Ids of quests the user has completed in the guild.
    async fn get_completed_quest_ids(
        &self,
        user_id: &str,
        guild_id: &str,
    ) -> Result<Vec<Uuid>, StoreError>;

    /// Atomic insert-if-absent of a new assignment against the partial
    /// unique index over non-terminal assignments for (user, guild).
    async fn atomic_assign(
        &self,
        user_id: &str,
        guild_id: &str,
        quest_id: Uuid,
    ) -> Result<AtomicAssignOutcome, StoreError>;

    /// The user's current non-terminal assignment in the guild, if any.
    async fn get_active_assignment(
        &self,
        user_id: &str,
        guild_id: &str,
    ) -> Result<Option<Assignment>, StoreError>;

    /// Atomically increment the attempt counter and return the new count.
    async fn increment_attempt(&self, assignment_id: Uuid) -> Result<u32, StoreError>;

    /// Terminal transition to Failed.
    async fn mark_failed(&self, assignment_id: Uuid) -> Result<(), StoreError>;

    /// Task ids of the quest the user has already completed.
    async fn get_completed_task_ids(
        &self,
        user_id: &str,
        quest_id: Uuid,
    ) -> Result<Vec<Uuid>, StoreError>;

    /// Record a task completion and award its points in one transaction.
    /// When `finish_assignment` is set this was the quest's last task: the
    /// assignment transitions to Completed and the quest's completion
    /// counter is bumped. Returns the user's new XP total.
    async fn complete_task(
        &self,
        completion: &TaskCompletion,
        finish_assignment: bool,
    ) -> Result<i64, StoreError>;

    /// Current XP total for (user, guild); zero when no ledger entry exists.
    async fn xp_total(&self, user_id: &str, guild_id: &str) -> Result<i64, StoreError>;
}
