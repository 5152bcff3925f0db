use crate::domain::models::AuthoringConversation;
use crate::domain::ports::errors::StoreError;
use async_trait::async_trait;

/// Repository port for authoring conversations, keyed by (admin, guild)
/// with an expiry.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// The conversation for (user, guild), if one exists and has not
    /// expired. Expired rows are deleted on read.
    async fn get(
        &self,
        user_id: &str,
        guild_id: &str,
    ) -> Result<Option<AuthoringConversation>, StoreError>;

    /// Insert or replace the conversation.
    async fn put(&self, conversation: &AuthoringConversation) -> Result<(), StoreError>;

    async fn delete(&self, user_id: &str, guild_id: &str) -> Result<(), StoreError>;
}
