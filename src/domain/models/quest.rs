//! Quest and task domain models.
//!
//! A quest is a guild-scoped bundle of ordered tasks; each task carries a
//! tagged verification strategy fixed at definition time. Quests without
//! tasks behave as a single implicit task worth the quest's points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Relational comparison operator, serialized in symbol form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Neq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
}

impl ComparisonOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Gte),
            "=" | "==" => Some(Self::Eq),
            "!=" => Some(Self::Neq),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Lte),
            _ => None,
        }
    }

    /// Apply the comparison. Equality on floats is intentional: both sides
    /// come from integer counts or user-authored thresholds.
    #[allow(clippy::float_cmp)]
    pub fn compare(&self, left: f64, right: f64) -> bool {
        match self {
            Self::Gt => left > right,
            Self::Gte => left >= right,
            Self::Eq => left == right,
            Self::Neq => left != right,
            Self::Lt => left < right,
            Self::Lte => left <= right,
        }
    }
}

/// Kind of platform activity a native check counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityKind {
    MessagesSent,
    ReactionsAdded,
    ReactionsReceived,
    PollsCreated,
    PollVotes,
    /// Membership check: counts as 0 or 1, time window is ignored.
    RoleHeld { role_id: String },
}

impl ActivityKind {
    /// Event name as stored by the activity source.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::MessagesSent => "message_sent",
            Self::ReactionsAdded => "reaction_added",
            Self::ReactionsReceived => "reaction_received",
            Self::PollsCreated => "poll_created",
            Self::PollVotes => "poll_vote",
            Self::RoleHeld { .. } => "role_held",
        }
    }
}

/// What kind of identifier a connector or legacy check needs from the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierType {
    Wallet,
    Email,
    Username,
    UserId,
}

impl IdentifierType {
    /// Human-facing label used in prompts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wallet => "wallet address",
            Self::Email => "email",
            Self::Username => "username",
            Self::UserId => "user id",
        }
    }

    /// Substitution variable name sent to the connector protocol.
    pub fn variable_name(&self) -> &'static str {
        match self {
            Self::Wallet => "wallet",
            Self::Email => "email",
            Self::Username => "username",
            Self::UserId => "user_id",
        }
    }
}

/// HTTP method for legacy and connector endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Default for HttpMethod {
    fn default() -> Self {
        Self::Get
    }
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// Operator of a success condition. A superset of [`ComparisonOp`] with two
/// presence checks that take no right-hand value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOp {
    #[serde(rename = "exists")]
    Exists,
    #[serde(rename = "not_empty")]
    NotEmpty,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Neq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
}

impl ConditionOp {
    /// The relational counterpart, if this operator compares values.
    pub fn as_comparison(&self) -> Option<ComparisonOp> {
        match self {
            Self::Exists | Self::NotEmpty => None,
            Self::Gt => Some(ComparisonOp::Gt),
            Self::Gte => Some(ComparisonOp::Gte),
            Self::Eq => Some(ComparisonOp::Eq),
            Self::Neq => Some(ComparisonOp::Neq),
            Self::Lt => Some(ComparisonOp::Lt),
            Self::Lte => Some(ComparisonOp::Lte),
        }
    }
}

/// Declarative judgment over a JSON response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessCondition {
    /// Dot-path into the response body.
    pub field: String,
    pub operator: ConditionOp,
    /// Right-hand value; ignored by the presence operators.
    #[serde(default)]
    pub value: Value,
}

/// Verification against the engine's own activity store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeCheck {
    #[serde(flatten)]
    pub activity: ActivityKind,
    pub operator: ComparisonOp,
    pub threshold: i64,
    /// Only count activity within the trailing window, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub within_secs: Option<i64>,
    /// Only count activity in this channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

/// Verification delegated to a registered connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorCheck {
    /// Opaque id returned by connector registration.
    pub connector_id: i64,
    pub identifier_type: IdentifierType,
}

/// Direct call to an arbitrary HTTP endpoint with placeholder substitution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyCheck {
    pub endpoint: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    pub success: SuccessCondition,
}

/// Tagged verification strategy, fixed when the task is defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VerificationConfig {
    Native(NativeCheck),
    Connector(ConnectorCheck),
    Legacy(LegacyCheck),
}

impl VerificationConfig {
    /// Whether a proof submission must carry a user-supplied identifier.
    pub fn requires_identifier(&self) -> bool {
        matches!(self, Self::Connector(_) | Self::Legacy(_))
    }
}

/// One verifiable step of a quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub quest_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub points: i64,
    pub verification: VerificationConfig,
    /// Completion order within the quest.
    pub position: i32,
}

impl Task {
    pub fn new(
        quest_id: Uuid,
        title: impl Into<String>,
        points: i64,
        verification: VerificationConfig,
        position: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            quest_id,
            title: title.into(),
            description: String::new(),
            points,
            verification,
            position,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A guild-scoped quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    pub id: Uuid,
    pub guild_id: String,
    pub name: String,
    pub description: String,
    /// Points awarded for the implicit task when the quest has no task
    /// list; otherwise the sum of task points, kept for display.
    pub points: i64,
    pub active: bool,
    pub completion_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quest {
    pub fn new(
        guild_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        points: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            guild_id: guild_id.into(),
            name: name.into(),
            description: description.into(),
            points,
            active: true,
            completion_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Stable synthetic task id for a quest with no task list, derived from
    /// the quest id so completions stay unique per (user, task).
    pub fn implicit_task_id(&self) -> Uuid {
        Uuid::new_v5(&self.id, b"implicit-task")
    }
}
