use crate::domain::models::{ConnectorDefinition, ConnectorTestResult, TestMode};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Port over the external connector verification protocol.
#[async_trait]
pub trait ConnectorClient: Send + Sync {
    /// Register a definition (or update one with the same name) and return
    /// its opaque numeric id.
    async fn register_or_update(&self, definition: &ConnectorDefinition) -> Result<i64>;

    /// Invoke a registered connector with substituted variables.
    async fn test(
        &self,
        id: i64,
        mode: TestMode,
        variables: &HashMap<String, String>,
    ) -> Result<ConnectorTestResult>;
}
