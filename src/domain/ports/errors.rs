use thiserror::Error;

/// Errors from the persistent store adapters.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),

    #[error("UUID parse error: {0}")]
    UuidParseError(#[from] uuid::Error),

    #[error("DateTime parse error: {0}")]
    DateTimeParseError(#[from] chrono::ParseError),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Not found: {0}")]
    NotFound(uuid::Uuid),

    #[error("Task already completed by this user")]
    DuplicateCompletion,

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Connection pool error: {0}")]
    ConnectionPoolError(String),
}
