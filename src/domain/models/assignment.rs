//! Assignment domain model: the per-user quest state machine.
//!
//! One non-terminal assignment per (user, guild) at a time; the store
//! enforces that invariant atomically. The attempt counter counts failed
//! verifications and only ever grows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// The single non-terminal state.
    Assigned,
    /// Every task verified.
    Completed,
    /// The attempt cap was exceeded. Irreversible.
    Failed,
    /// Administratively expired.
    Expired,
}

impl Default for AssignmentStatus {
    fn default() -> Self {
        Self::Assigned
    }
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Expired => "expired",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "assigned" => Some(Self::Assigned),
            "completed" | "complete" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Assigned)
    }

    /// Valid transitions from this status.
    pub fn valid_transitions(&self) -> Vec<AssignmentStatus> {
        match self {
            Self::Assigned => vec![Self::Completed, Self::Failed, Self::Expired],
            Self::Completed | Self::Failed | Self::Expired => vec![],
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }
}

/// One user's claim on one quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub user_id: String,
    pub guild_id: String,
    pub quest_id: Uuid,
    /// Count of failed verification attempts.
    pub attempts: u32,
    pub status: AssignmentStatus,
    pub assigned_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Assignment {
    pub fn new(user_id: impl Into<String>, guild_id: impl Into<String>, quest_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            guild_id: guild_id.into(),
            quest_id,
            attempts: 0,
            status: AssignmentStatus::Assigned,
            assigned_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Whether another verification attempt is allowed. The cap counts
    /// failures, so a user gets `max_attempts + 1` submissions before the
    /// terminal transition.
    pub fn can_attempt(&self, max_attempts: u32) -> bool {
        self.status == AssignmentStatus::Assigned && self.attempts <= max_attempts
    }

    /// Submissions remaining before the terminal transition.
    pub fn remaining_attempts(&self, max_attempts: u32) -> u32 {
        (max_attempts + 1).saturating_sub(self.attempts)
    }

    /// Apply a status transition, rejecting invalid ones.
    pub fn transition_to(&mut self, new_status: AssignmentStatus) -> Result<(), String> {
        if !self.status.can_transition_to(new_status) {
            return Err(format!(
                "Invalid assignment transition: {} -> {}",
                self.status.as_str(),
                new_status.as_str()
            ));
        }
        self.status = new_status;
        self.updated_at = Utc::now();
        if new_status == AssignmentStatus::Completed {
            self.completed_at = Some(self.updated_at);
        }
        Ok(())
    }
}

/// Record of one verified task, unique per (user, task).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCompletion {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub task_id: Uuid,
    pub user_id: String,
    pub guild_id: String,
    pub points_awarded: i64,
    /// The identifier the user submitted, when the strategy needed one.
    pub identifier: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl TaskCompletion {
    pub fn new(
        assignment: &Assignment,
        task_id: Uuid,
        points_awarded: i64,
        identifier: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            assignment_id: assignment.id,
            task_id,
            user_id: assignment.user_id.clone(),
            guild_id: assignment.guild_id.clone(),
            points_awarded,
            identifier,
            completed_at: Utc::now(),
        }
    }
}

/// Accumulated XP for one user in one guild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XpLedgerEntry {
    pub user_id: String,
    pub guild_id: String,
    pub total_xp: i64,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment() -> Assignment {
        Assignment::new("u1", "g1", Uuid::new_v4())
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            AssignmentStatus::Assigned,
            AssignmentStatus::Completed,
            AssignmentStatus::Failed,
            AssignmentStatus::Expired,
        ] {
            assert_eq!(AssignmentStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(AssignmentStatus::from_str("bogus"), None);
    }

    #[test]
    fn test_only_assigned_is_non_terminal() {
        assert!(!AssignmentStatus::Assigned.is_terminal());
        assert!(AssignmentStatus::Completed.is_terminal());
        assert!(AssignmentStatus::Failed.is_terminal());
        assert!(AssignmentStatus::Expired.is_terminal());
    }

    #[test]
    fn test_terminal_states_have_no_transitions() {
        assert!(AssignmentStatus::Failed.valid_transitions().is_empty());
        assert!(AssignmentStatus::Completed.valid_transitions().is_empty());
        assert!(AssignmentStatus::Assigned.can_transition_to(AssignmentStatus::Failed));
        assert!(!AssignmentStatus::Failed.can_transition_to(AssignmentStatus::Assigned));
    }

    #[test]
    fn test_can_attempt_counts_failures_not_submissions() {
        let mut a = assignment();
        // Cap of 3 failures: attempts 0..=3 may still submit.
        for attempts in 0..=3 {
            a.attempts = attempts;
            assert!(a.can_attempt(3), "attempts={attempts}");
        }
        a.attempts = 4;
        assert!(!a.can_attempt(3));
    }

    #[test]
    fn test_can_attempt_requires_assigned_status() {
        let mut a = assignment();
        a.transition_to(AssignmentStatus::Failed).unwrap();
        assert!(!a.can_attempt(3));
    }

    #[test]
    fn test_remaining_attempts() {
        let mut a = assignment();
        assert_eq!(a.remaining_attempts(3), 4);
        a.attempts = 3;
        assert_eq!(a.remaining_attempts(3), 1);
        a.attempts = 4;
        assert_eq!(a.remaining_attempts(3), 0);
        a.attempts = 9;
        assert_eq!(a.remaining_attempts(3), 0);
    }

    #[test]
    fn test_transition_to_completed_sets_timestamp() {
        let mut a = assignment();
        assert!(a.completed_at.is_none());
        a.transition_to(AssignmentStatus::Completed).unwrap();
        assert!(a.completed_at.is_some());
        assert!(a.transition_to(AssignmentStatus::Assigned).is_err());
    }

    #[test]
    fn test_completion_inherits_assignment_scope() {
        let a = assignment();
        let task_id = Uuid::new_v4();
        let c = TaskCompletion::new(&a, task_id, 50, Some("0xabc".to_string()));
        assert_eq!(c.assignment_id, a.id);
        assert_eq!(c.user_id, "u1");
        assert_eq!(c.guild_id, "g1");
        assert_eq!(c.task_id, task_id);
        assert_eq!(c.points_awarded, 50);
    }
}
