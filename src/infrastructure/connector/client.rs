//! HTTP adapter for the connector verification service.

use crate::domain::models::{ConnectorDefinition, ConnectorTestResult, TestMode};
use crate::domain::ports::ConnectorClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

pub struct HttpConnectorClient {
    http: ReqwestClient,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    id: i64,
}

#[derive(Debug, Serialize)]
struct TestRequest<'a> {
    mode: TestMode,
    variables: &'a HashMap<String, String>,
}

impl HttpConnectorClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let http = ReqwestClient::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build connector HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl ConnectorClient for HttpConnectorClient {
    async fn register_or_update(&self, definition: &ConnectorDefinition) -> Result<i64> {
        let response = self
            .http
            .post(format!("{}/connectors", self.base_url))
            .json(definition)
            .send()
            .await
            .context("Connector registration request failed")?
            .error_for_status()
            .context("Connector registration rejected")?;

        let registered: RegisterResponse = response
            .json()
            .await
            .context("Connector registration returned an unreadable response")?;
        debug!(name = %definition.name, id = registered.id, "connector registered");
        Ok(registered.id)
    }

    async fn test(
        &self,
        id: i64,
        mode: TestMode,
        variables: &HashMap<String, String>,
    ) -> Result<ConnectorTestResult> {
        let response = self
            .http
            .post(format!("{}/connectors/{id}/test", self.base_url))
            .json(&TestRequest { mode, variables })
            .send()
            .await
            .context("Connector test request failed")?
            .error_for_status()
            .context("Connector test rejected")?;

        response
            .json()
            .await
            .context("Connector test returned an unreadable response")
    }
}
