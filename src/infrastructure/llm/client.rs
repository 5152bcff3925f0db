//! HTTP client for the Anthropic Messages API, behind the
//! [`CompletionClient`] port.

use super::retry::{CompletionApiError, RetryPolicy};
use super::types::{MessageRequest, MessageResponse, WireMessage};
use crate::domain::models::{ChatTurn, LlmConfig};
use crate::domain::ports::CompletionClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use std::time::Duration;
use tracing::debug;

pub struct AnthropicCompletionClient {
    http: ReqwestClient,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    retry_policy: RetryPolicy,
}

impl AnthropicCompletionClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .build()
            .context("Failed to build completion HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            retry_policy: RetryPolicy::new(
                config.max_retries,
                config.initial_backoff_ms,
                config.max_backoff_ms,
            ),
        })
    }

    async fn send_request(
        &self,
        request: &MessageRequest,
    ) -> Result<MessageResponse, CompletionApiError> {
        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| CompletionApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(CompletionApiError::from_status(status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| CompletionApiError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl CompletionClient for AnthropicCompletionClient {
    async fn complete(&self, system_instruction: &str, transcript: &[ChatTurn]) -> Result<String> {
        let request = MessageRequest {
            model: self.model.clone(),
            messages: transcript
                .iter()
                .map(|turn| WireMessage {
                    role: turn.role.as_str().to_string(),
                    content: turn.content.clone(),
                })
                .collect(),
            max_tokens: self.max_tokens,
            system: Some(system_instruction.to_string()),
        };

        let response = self
            .retry_policy
            .execute(|| self.send_request(&request))
            .await?;
        debug!(
            stop_reason = ?response.stop_reason,
            blocks = response.content.len(),
            "completion received"
        );
        Ok(response.text())
    }
}
