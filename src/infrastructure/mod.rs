//! Infrastructure layer: adapters over the external world, implementing the
//! domain ports.

pub mod activity;
pub mod config;
pub mod connector;
pub mod database;
pub mod llm;

pub use activity::SqliteActivitySource;
pub use config::{ConfigError, ConfigLoader};
pub use connector::HttpConnectorClient;
pub use database::{DatabaseConnection, SqliteConversationRepository, SqliteQuestRepository};
pub use llm::AnthropicCompletionClient;
