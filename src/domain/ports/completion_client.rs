use crate::domain::models::ChatTurn;
use anyhow::Result;
use async_trait::async_trait;

/// Port over the generative text-completion backend.
///
/// Synchronous request/response, no streaming: one fixed system instruction
/// plus the ordered role-tagged transcript in, one text blob out.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system_instruction: &str, transcript: &[ChatTurn]) -> Result<String>;
}
