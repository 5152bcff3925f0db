//! Conversational quest builder.
//!
//! Each admin turn goes through the same loop: append to the transcript,
//! ask the completion backend, harvest structured fragments from its reply
//! into the draft, and either keep gathering or create the quest. The quest
//! store is only touched once the draft is complete; an abandoned or
//! cancelled conversation leaves no partial quest behind.

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{
    AuthoringConversation, ChatTurn, DraftVerification, Quest, Task, VerificationConfig,
};
use crate::domain::models::{ConnectorCheck, QuestDraft};
use crate::domain::ports::{
    CompletionClient, ConnectorClient, ConversationRepository, QuestRepository,
};
use crate::services::extractor;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Messages that abort the conversation. Matched against the trimmed,
/// lowercased message as a whole.
pub const CANCEL_KEYWORDS: [&str; 5] = ["cancel", "stop", "quit", "abort", "nevermind"];

/// Instruction fixed for every completion call. The reply contract (fenced
/// JSON blocks) is what the extractor parses.
const SYSTEM_INSTRUCTION: &str = "\
You are a quest-building assistant for an online community. Interview the \
admin to define a quest: its name, description, and either a list of \
verifiable tasks or a single points value for a quest with no tasks.

Whenever you have gathered concrete details, restate them as JSON inside a \
fenced ``` code block, using exactly these shapes:

- Partial details: {\"name\": \"...\", \"description\": \"...\", \"points\": 100}
- A reusable verification connector: {\"name\": \"...\", \"endpoint\": \
\"https://...\", \"method\": \"GET\", \"identifier_type\": \
\"wallet|email|username|user_id\", \"success\": {\"field\": \"...\", \
\"operator\": \">\", \"value\": 0}}
- The finished quest: {\"name\": \"...\", \"description\": \"...\", \
\"tasks\": [{\"title\": \"...\", \"points\": 50, \"verification\": {...}}]}

Task verifications are tagged objects: {\"type\": \"native\", \"kind\": \
\"messages_sent|reactions_added|reactions_received|polls_created|poll_votes|\
role_held\", \"operator\": \">=\", \"threshold\": 1}, or {\"type\": \
\"connector\", \"connector_name\": \"...\", \"identifier_type\": \"...\"}, \
or {\"type\": \"legacy\", \"endpoint\": \"...\", \"success\": {...}}. A \
role_held check also needs \"role_id\". Placeholders like {wallet} in \
endpoints are substituted at verification time.

Emit the finished-quest block only when the admin has confirmed every \
detail. Keep prose outside the code blocks short.";

/// Outcome of one builder turn.
#[derive(Debug, Clone, PartialEq)]
pub enum BuilderReply {
    /// The admin cancelled; the conversation is gone.
    Cancelled,
    /// The draft completed and the quest now exists.
    Created {
        quest_id: uuid::Uuid,
        quest_name: String,
        task_count: usize,
    },
    /// Still gathering details.
    Gathering {
        assistant_reply: String,
        missing: Vec<String>,
    },
}

pub struct QuestBuilder {
    conversations: Arc<dyn ConversationRepository>,
    quests: Arc<dyn QuestRepository>,
    completion: Arc<dyn CompletionClient>,
    connectors: Arc<dyn ConnectorClient>,
    ttl_secs: i64,
}

impl QuestBuilder {
    pub fn new(
        conversations: Arc<dyn ConversationRepository>,
        quests: Arc<dyn QuestRepository>,
        completion: Arc<dyn CompletionClient>,
        connectors: Arc<dyn ConnectorClient>,
        ttl_secs: i64,
    ) -> Self {
        Self {
            conversations,
            quests,
            completion,
            connectors,
            ttl_secs,
        }
    }

    /// Process one admin message.
    pub async fn turn(
        &self,
        user_id: &str,
        guild_id: &str,
        message: &str,
    ) -> EngineResult<BuilderReply> {
        if is_cancel(message) {
            self.conversations.delete(user_id, guild_id).await?;
            info!(user_id, guild_id, "authoring conversation cancelled");
            return Ok(BuilderReply::Cancelled);
        }

        let mut conversation = match self.conversations.get(user_id, guild_id).await? {
            Some(conversation) => conversation,
            None => AuthoringConversation::new(user_id, guild_id, self.ttl_secs),
        };
        conversation.append(ChatTurn::user(message), self.ttl_secs);

        let reply = self
            .completion
            .complete(SYSTEM_INSTRUCTION, &conversation.transcript)
            .await
            .map_err(|e| EngineError::Integration(format!("Completion backend failed: {e}")))?;
        conversation.append(ChatTurn::assistant(reply.clone()), self.ttl_secs);

        let report = extractor::merge_reply(&reply, &mut conversation.draft);
        debug!(
            user_id,
            guild_id,
            merged = ?report.merged,
            dropped = report.dropped,
            "builder turn extracted"
        );

        if conversation.draft.is_complete() {
            match self.create_quest(guild_id, &conversation.draft).await {
                Ok(quest) => {
                    let task_count = conversation.draft.tasks.len();
                    self.conversations.delete(user_id, guild_id).await?;
                    info!(
                        user_id,
                        guild_id,
                        quest_id = %quest.id,
                        quest_name = %quest.name,
                        task_count,
                        "quest created from conversation"
                    );
                    return Ok(BuilderReply::Created {
                        quest_id: quest.id,
                        quest_name: quest.name,
                        task_count,
                    });
                }
                Err(e) => {
                    // Keep the conversation so the admin can retry the same
                    // draft; nothing was persisted to the quest store.
                    warn!(user_id, guild_id, error = %e, "quest creation failed; draft kept");
                    self.conversations.put(&conversation).await?;
                    return Err(e);
                }
            }
        }

        let missing = conversation.draft.missing();
        self.conversations.put(&conversation).await?;
        Ok(BuilderReply::Gathering {
            assistant_reply: reply,
            missing,
        })
    }

    /// Register the draft's connectors and persist the quest with its
    /// tasks. Registration happens in declaration order; the first failure
    /// aborts before anything reaches the quest store.
    async fn create_quest(&self, guild_id: &str, draft: &QuestDraft) -> EngineResult<Quest> {
        let mut connector_ids: HashMap<&str, i64> = HashMap::new();
        for definition in &draft.connectors {
            let id = self
                .connectors
                .register_or_update(definition)
                .await
                .map_err(|e| {
                    EngineError::Infrastructure(format!(
                        "Failed to register connector '{}': {e}",
                        definition.name
                    ))
                })?;
            connector_ids.insert(definition.name.as_str(), id);
        }

        // missing() checked these; absence here is a logic fault.
        let name = draft
            .name
            .clone()
            .ok_or_else(|| EngineError::Infrastructure("Complete draft lost its name".to_string()))?;
        let description = draft.description.clone().unwrap_or_default();

        let quest = Quest::new(guild_id, name, description, draft.total_points());
        let mut tasks = Vec::with_capacity(draft.tasks.len());
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        for (position, draft_task) in draft.tasks.iter().enumerate() {
            let verification = match &draft_task.verification {
                DraftVerification::Native(check) => VerificationConfig::Native(check.clone()),
                DraftVerification::Legacy(check) => VerificationConfig::Legacy(check.clone()),
                DraftVerification::Connector {
                    connector_name,
                    identifier_type,
                } => {
                    let connector_id =
                        connector_ids.get(connector_name.as_str()).ok_or_else(|| {
                            EngineError::Infrastructure(format!(
                                "Complete draft references unregistered connector '{connector_name}'"
                            ))
                        })?;
                    VerificationConfig::Connector(ConnectorCheck {
                        connector_id: *connector_id,
                        identifier_type: *identifier_type,
                    })
                }
            };
            tasks.push(
                Task::new(
                    quest.id,
                    draft_task.title.clone(),
                    draft_task.points,
                    verification,
                    position as i32,
                )
                .with_description(draft_task.description.clone()),
            );
        }

        self.quests.create_quest(&quest, &tasks).await?;
        Ok(quest)
    }
}

fn is_cancel(message: &str) -> bool {
    let normalized = message.trim().to_lowercase();
    CANCEL_KEYWORDS.contains(&normalized.as_str())
}
