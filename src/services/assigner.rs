//! Atomic assignment coordinator.
//!
//! Candidates are the guild's active quests minus those the user already
//! completed; one is chosen uniformly at random and claimed through the
//! store's single atomic insert-if-absent. When a concurrent request for
//! the same user wins the race, the local choice is discarded and the
//! pre-existing assignment is reported instead of an error.

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::Quest;
use crate::domain::ports::{AtomicAssignOutcome, QuestRepository};
use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::info;

/// Result of an assignment request.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignOutcome {
    /// A quest was claimed for the user.
    Assigned(Quest),
    /// The user already holds a non-terminal assignment.
    AlreadyAssigned(Quest),
    /// The guild has active quests but the user completed them all.
    AllCompleted { total_xp: i64 },
    /// The guild has no active quests at all.
    NoQuests,
}

pub struct QuestAssigner {
    repo: Arc<dyn QuestRepository>,
}

impl QuestAssigner {
    pub fn new(repo: Arc<dyn QuestRepository>) -> Self {
        Self { repo }
    }

    /// Assign one unclaimed quest to the user, or report why none was
    /// assigned. Empty-candidate outcomes have no persistence side effect.
    pub async fn assign(&self, user_id: &str, guild_id: &str) -> EngineResult<AssignOutcome> {
        let active = self.repo.get_active_quests(guild_id).await?;
        if active.is_empty() {
            return Ok(AssignOutcome::NoQuests);
        }

        let completed = self.repo.get_completed_quest_ids(user_id, guild_id).await?;
        let candidates: Vec<&Quest> = active
            .iter()
            .filter(|q| !completed.contains(&q.id))
            .collect();
        if candidates.is_empty() {
            let total_xp = self.repo.xp_total(user_id, guild_id).await?;
            return Ok(AssignOutcome::AllCompleted { total_xp });
        }

        let Some(choice) = candidates
            .choose(&mut rand::thread_rng())
            .map(|quest| (*quest).clone())
        else {
            return Ok(AssignOutcome::NoQuests);
        };

        match self
            .repo
            .atomic_assign(user_id, guild_id, choice.id)
            .await?
        {
            AtomicAssignOutcome::Created(assignment) => {
                info!(
                    user_id,
                    guild_id,
                    quest_id = %choice.id,
                    assignment_id = %assignment.id,
                    "quest assigned"
                );
                Ok(AssignOutcome::Assigned(choice))
            }
            AtomicAssignOutcome::AlreadyAssigned(existing) => {
                // A concurrent request won the race; surface its quest.
                let quest = self
                    .repo
                    .get_quest(existing.quest_id)
                    .await?
                    .ok_or_else(|| {
                        EngineError::Infrastructure(format!(
                            "Active assignment {} references missing quest {}",
                            existing.id, existing.quest_id
                        ))
                    })?;
                Ok(AssignOutcome::AlreadyAssigned(quest))
            }
        }
    }
}
