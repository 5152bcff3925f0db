//! Ports: async traits at every external seam, implemented by
//! infrastructure adapters and by in-test fakes.

pub mod activity_source;
pub mod completion_client;
pub mod connector_client;
pub mod conversation_repository;
pub mod errors;
pub mod quest_repository;

pub use activity_source::{ActivitySource, ActivityWindow};
pub use completion_client::CompletionClient;
pub use connector_client::ConnectorClient;
pub use conversation_repository::ConversationRepository;
pub use errors::StoreError;
pub use quest_repository::{AtomicAssignOutcome, QuestRepository};
