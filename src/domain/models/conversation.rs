//! Authoring conversation domain models.
//!
//! One conversation per (admin, guild): a role-tagged transcript plus the
//! quest draft accumulated from it. The draft is the single source of truth
//! for creation; nothing is persisted to the quest store until the draft is
//! complete.

use crate::domain::models::{
    ConnectorDefinition, IdentifierType, LegacyCheck, NativeCheck, VerificationConfig,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One turn of the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Verification as it appears in a draft. Connector checks reference the
/// connector by name; the id only exists after registration at creation
/// time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DraftVerification {
    Native(NativeCheck),
    Connector {
        connector_name: String,
        identifier_type: IdentifierType,
    },
    Legacy(LegacyCheck),
}

/// One task of a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub points: i64,
    pub verification: DraftVerification,
}

/// Accumulated quest definition. Fields fill in over turns; later values
/// replace earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Points for a quest without tasks.
    pub points: Option<i64>,
    pub tasks: Vec<DraftTask>,
    /// Connector definitions declared in this conversation, by name.
    pub connectors: Vec<ConnectorDefinition>,
}

impl QuestDraft {
    /// Declare a connector, replacing any earlier one with the same name.
    pub fn declare_connector(&mut self, definition: ConnectorDefinition) {
        self.connectors.retain(|c| c.name != definition.name);
        self.connectors.push(definition);
    }

    pub fn find_connector(&self, name: &str) -> Option<&ConnectorDefinition> {
        self.connectors.iter().find(|c| c.name == name)
    }

    /// What still blocks creation. Empty means the draft is complete.
    pub fn missing(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.name.as_deref().is_none_or(|n| n.trim().is_empty()) {
            missing.push("a quest name".to_string());
        }
        if self
            .description
            .as_deref()
            .is_none_or(|d| d.trim().is_empty())
        {
            missing.push("a quest description".to_string());
        }
        if self.tasks.is_empty() && self.points.is_none() {
            missing.push("at least one task, or a points value for a taskless quest".to_string());
        }
        for task in &self.tasks {
            if let DraftVerification::Connector {
                connector_name,
                identifier_type,
            } = &task.verification
            {
                match self.find_connector(connector_name) {
                    None => missing.push(format!(
                        "a connector definition named '{connector_name}' (referenced by task '{}')",
                        task.title
                    )),
                    Some(connector) if connector.identifier_type != *identifier_type => {
                        missing.push(format!(
                            "matching identifier types for connector '{connector_name}' and task '{}'",
                            task.title
                        ));
                    }
                    Some(_) => {}
                }
            }
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    /// Sum of task points, or the quest-level points for a taskless draft.
    pub fn total_points(&self) -> i64 {
        if self.tasks.is_empty() {
            self.points.unwrap_or(0)
        } else {
            self.tasks.iter().map(|t| t.points).sum()
        }
    }
}

/// One admin's in-flight quest authoring session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthoringConversation {
    pub user_id: String,
    pub guild_id: String,
    pub transcript: Vec<ChatTurn>,
    pub draft: QuestDraft,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuthoringConversation {
    pub fn new(user_id: impl Into<String>, guild_id: impl Into<String>, ttl_secs: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            guild_id: guild_id.into(),
            transcript: Vec::new(),
            draft: QuestDraft::default(),
            expires_at: now + Duration::seconds(ttl_secs),
            updated_at: now,
        }
    }

    /// Append a turn; any activity refreshes the expiry.
    pub fn append(&mut self, turn: ChatTurn, ttl_secs: i64) {
        self.transcript.push(turn);
        self.updated_at = Utc::now();
        self.expires_at = self.updated_at + Duration::seconds(ttl_secs);
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
