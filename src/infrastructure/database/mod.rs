pub mod connection;
pub mod conversation_repo;
pub mod quest_repo;

pub use connection::DatabaseConnection;
pub use conversation_repo::SqliteConversationRepository;
pub use quest_repo::SqliteQuestRepository;
