//! Verification service: the attempt-limited retry state machine over one
//! assignment.
//!
//! A proof submission targets the first uncompleted task of the user's
//! active assignment. Success records the completion and awards points
//! exactly once, in one store transaction; a miss increments the attempt
//! counter, and exceeding the cap is an irreversible transition to Failed.

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{Quest, Task, TaskCompletion, VerificationSettings};
use crate::domain::ports::{QuestRepository, StoreError};
use crate::services::dispatcher::{VerificationDispatcher, VerificationOutcome};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Result of one proof submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitResult {
    /// The current task verified; points were awarded.
    TaskVerified {
        task_title: String,
        points_awarded: i64,
        /// True when this was the quest's last task and the assignment is
        /// now Completed.
        quest_completed: bool,
        total_xp: i64,
        message: String,
    },
    /// The proof did not satisfy the condition; the attempt was counted.
    NotVerified {
        message: String,
        remaining_attempts: u32,
    },
}

pub struct VerificationService {
    repo: Arc<dyn QuestRepository>,
    dispatcher: VerificationDispatcher,
    max_attempts: u32,
}

impl VerificationService {
    pub fn new(
        repo: Arc<dyn QuestRepository>,
        dispatcher: VerificationDispatcher,
        settings: &VerificationSettings,
    ) -> Self {
        Self {
            repo,
            dispatcher,
            max_attempts: settings.max_attempts,
        }
    }

    /// Submit a proof/identifier for the user's active assignment.
    pub async fn submit_proof(
        &self,
        user_id: &str,
        guild_id: &str,
        identifier: Option<&str>,
    ) -> EngineResult<SubmitResult> {
        let assignment = self
            .repo
            .get_active_assignment(user_id, guild_id)
            .await?
            .ok_or_else(|| {
                EngineError::UserInput(
                    "You have no active quest; request one before submitting proof".to_string(),
                )
            })?;

        // Rejected before any external call once the cap is exhausted.
        if !assignment.can_attempt(self.max_attempts) {
            return Err(EngineError::AttemptsExhausted);
        }

        let quest = self
            .repo
            .get_quest(assignment.quest_id)
            .await?
            .ok_or_else(|| {
                EngineError::Infrastructure(format!(
                    "Assignment {} references missing quest {}",
                    assignment.id, assignment.quest_id
                ))
            })?;
        let tasks = self.repo.get_tasks(quest.id).await?;

        let (current, is_last) = self.current_task(user_id, &quest, &tasks).await?;

        let outcome = match &current {
            // A quest without tasks behaves as one implicit task: the
            // submission itself completes it.
            CurrentTask::Implicit => VerificationOutcome::verified("Quest completed"),
            CurrentTask::Defined(task) => {
                self.dispatcher
                    .dispatch(user_id, guild_id, &task.verification, identifier)
                    .await?
            }
        };

        if outcome.verified {
            let (task_id, task_title, points) = match &current {
                CurrentTask::Implicit => {
                    (quest.implicit_task_id(), quest.name.clone(), quest.points)
                }
                CurrentTask::Defined(task) => (task.id, task.title.clone(), task.points),
            };
            let completion = TaskCompletion::new(
                &assignment,
                task_id,
                points,
                identifier.map(ToString::to_string),
            );
            let total_xp = match self.repo.complete_task(&completion, is_last).await {
                Ok(total_xp) => total_xp,
                // A concurrent submission already banked this task; the
                // loser gets told so instead of a store fault.
                Err(StoreError::DuplicateCompletion) => {
                    return Err(EngineError::UserInput(
                        "That task was already completed; points are awarded once".to_string(),
                    ));
                }
                Err(e) => return Err(e.into()),
            };
            info!(
                user_id,
                guild_id,
                quest_id = %quest.id,
                task_id = %task_id,
                points,
                quest_completed = is_last,
                total_xp,
                "task verified"
            );
            return Ok(SubmitResult::TaskVerified {
                task_title,
                points_awarded: points,
                quest_completed: is_last,
                total_xp,
                message: outcome.message,
            });
        }

        let attempts = self.repo.increment_attempt(assignment.id).await?;
        if attempts > self.max_attempts {
            self.repo.mark_failed(assignment.id).await?;
            warn!(
                user_id,
                guild_id,
                assignment_id = %assignment.id,
                attempts,
                "attempt cap exceeded; assignment failed"
            );
            return Err(EngineError::AttemptsExhausted);
        }

        Ok(SubmitResult::NotVerified {
            message: outcome.message,
            remaining_attempts: (self.max_attempts + 1).saturating_sub(attempts),
        })
    }

    /// The first task (by position) the user has not completed, and whether
    /// completing it finishes the quest.
    async fn current_task<'a>(
        &self,
        user_id: &str,
        quest: &Quest,
        tasks: &'a [Task],
    ) -> EngineResult<(CurrentTask<'a>, bool)> {
        if tasks.is_empty() {
            return Ok((CurrentTask::Implicit, true));
        }

        let completed: Vec<Uuid> = self.repo.get_completed_task_ids(user_id, quest.id).await?;
        let pending: Vec<&Task> = tasks.iter().filter(|t| !completed.contains(&t.id)).collect();
        match pending.first() {
            Some(task) => Ok((CurrentTask::Defined(task), pending.len() == 1)),
            None => Err(EngineError::Infrastructure(format!(
                "Active assignment for quest {} has no pending task",
                quest.id
            ))),
        }
    }
}

enum CurrentTask<'a> {
    /// Quest has no task list; it behaves as one implicit task.
    Implicit,
    Defined(&'a Task),
}
