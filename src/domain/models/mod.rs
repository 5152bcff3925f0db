//! Domain models: pure business types with no infrastructure dependencies.

pub mod assignment;
pub mod config;
pub mod connector;
pub mod conversation;
pub mod quest;

pub use assignment::{Assignment, AssignmentStatus, TaskCompletion, XpLedgerEntry};
pub use config::{
    BuilderConfig, Config, ConnectorConfig, DatabaseConfig, LlmConfig, LoggingConfig,
    RateLimitConfig, VerificationSettings,
};
pub use connector::{ConnectorDefinition, ConnectorTestResult, TestMode};
pub use conversation::{
    AuthoringConversation, ChatRole, ChatTurn, DraftTask, DraftVerification, QuestDraft,
};
pub use quest::{
    ActivityKind, ComparisonOp, ConditionOp, ConnectorCheck, HttpMethod, IdentifierType,
    LegacyCheck, NativeCheck, Quest, SuccessCondition, Task, VerificationConfig,
};
