//! Questline - quest assignment and verification engine.
//!
//! Questline assigns quests to community members, verifies task completion
//! through pluggable strategies (native activity checks, registered
//! connectors, legacy HTTP endpoints), tracks attempt-limited retries, and
//! lets admins author new quests through a guided conversation.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Pure business models and ports
//! - **Service Layer** (`services`): Assignment, verification, throttling,
//!   and quest-building logic
//! - **Infrastructure Layer** (`infrastructure`): SQLite, HTTP, and
//!   completion-API adapters
//! - **CLI Layer** (`cli`): Command-line interface

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{EngineError, EngineResult};
pub use domain::models::{
    Assignment, AssignmentStatus, Config, Quest, Task, VerificationConfig,
};
pub use domain::ports::{
    ActivitySource, CompletionClient, ConnectorClient, ConversationRepository, QuestRepository,
    StoreError,
};
pub use infrastructure::{ConfigError, ConfigLoader};
pub use services::{
    AssignOutcome, BuilderReply, FixedWindowRateLimiter, QuestAssigner, QuestBuilder,
    SubmitResult, VerificationDispatcher, VerificationService,
};
