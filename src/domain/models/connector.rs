//! Connector domain models.
//!
//! A connector is an HTTP check definition registered with the external
//! connector service; the engine holds only its opaque numeric id and the
//! identifier type it needs from users.

use crate::domain::models::{HttpMethod, IdentifierType, SuccessCondition};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A connector definition, as authored in the quest builder and registered
/// with the connector service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorDefinition {
    /// Name the draft's tasks reference; unique within one draft.
    pub name: String,
    pub endpoint: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    pub identifier_type: IdentifierType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<SuccessCondition>,
}

impl ConnectorDefinition {
    /// Structural validation before registration.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Connector name must not be empty".to_string());
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(format!(
                "Connector endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            ));
        }
        Ok(())
    }
}

/// How to invoke a registered connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestMode {
    /// Fetch the raw response without judging it.
    Fetch,
    /// Fetch and evaluate the success condition.
    Validate,
}

impl TestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Validate => "validate",
        }
    }
}

/// Response of a connector invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorTestResult {
    /// HTTP status the connector observed upstream.
    #[serde(default)]
    pub status: Option<u16>,
    /// Judgment of the success condition; absent in fetch mode.
    #[serde(default)]
    pub is_valid: Option<bool>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ConnectorTestResult {
    /// Diagnostic message suitable for showing to the user.
    pub fn message(&self) -> String {
        if let Some(error) = &self.error {
            return error.clone();
        }
        match self.is_valid {
            Some(true) => "Verification passed".to_string(),
            Some(false) => "Verification condition not met".to_string(),
            None => "Connector returned no judgment".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition() -> ConnectorDefinition {
        ConnectorDefinition {
            name: "token-holder".to_string(),
            endpoint: "https://chain.example/holders/{wallet}".to_string(),
            method: HttpMethod::Get,
            headers: HashMap::new(),
            identifier_type: IdentifierType::Wallet,
            success: None,
        }
    }

    #[test]
    fn test_validate_accepts_https_endpoint() {
        assert!(definition().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_name_and_bad_scheme() {
        let mut d = definition();
        d.name = "  ".to_string();
        assert!(d.validate().is_err());

        let mut d = definition();
        d.endpoint = "ftp://example".to_string();
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_result_message_prefers_error() {
        let result = ConnectorTestResult {
            status: Some(502),
            is_valid: Some(false),
            data: None,
            error: Some("upstream unavailable".to_string()),
        };
        assert_eq!(result.message(), "upstream unavailable");
    }

    #[test]
    fn test_result_message_from_judgment() {
        let passed = ConnectorTestResult {
            status: Some(200),
            is_valid: Some(true),
            data: None,
            error: None,
        };
        assert_eq!(passed.message(), "Verification passed");
    }
}
