//! Verification dispatcher: selects and runs one verification strategy per
//! task.
//!
//! The strategy is the task's tagged `VerificationConfig`, fixed at
//! definition time and never re-inferred per call. A recoverable miss —
//! including timeouts, connection errors, and non-2xx responses from
//! external calls — is reported as a not-verified outcome, never as an
//! error; only user-input problems and infrastructure faults surface as
//! `EngineError`.

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{
    ActivityKind, ConnectorCheck, LegacyCheck, NativeCheck, TestMode, VerificationConfig,
    VerificationSettings,
};
use crate::domain::ports::{ActivitySource, ActivityWindow, ConnectorClient};
use crate::services::evaluator;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Named placeholder tokens recognized in legacy endpoint and body
/// templates. Matching is case-insensitive; unmatched tokens are left
/// untouched. The full set applies regardless of the task's declared
/// identifier type.
pub const PLACEHOLDER_TOKENS: [&str; 5] = [
    "{wallet}",
    "{email}",
    "{username}",
    "{user_id}",
    "{identifier}",
];

/// Result of one verification dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationOutcome {
    pub verified: bool,
    pub message: String,
    pub current_value: Option<i64>,
    pub required_value: Option<i64>,
}

impl VerificationOutcome {
    pub fn verified(message: impl Into<String>) -> Self {
        Self {
            verified: true,
            message: message.into(),
            current_value: None,
            required_value: None,
        }
    }

    pub fn not_verified(message: impl Into<String>) -> Self {
        Self {
            verified: false,
            message: message.into(),
            current_value: None,
            required_value: None,
        }
    }

    fn with_values(mut self, current: i64, required: i64) -> Self {
        self.current_value = Some(current);
        self.required_value = Some(required);
        self
    }
}

/// Dispatches a task's verification strategy.
pub struct VerificationDispatcher {
    activity: Arc<dyn ActivitySource>,
    connectors: Arc<dyn ConnectorClient>,
    http: reqwest::Client,
    legacy_timeout: Duration,
}

impl VerificationDispatcher {
    pub fn new(
        activity: Arc<dyn ActivitySource>,
        connectors: Arc<dyn ConnectorClient>,
        settings: &VerificationSettings,
    ) -> EngineResult<Self> {
        let legacy_timeout = Duration::from_secs(settings.legacy_timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(legacy_timeout)
            .build()
            .map_err(|e| EngineError::Infrastructure(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            activity,
            connectors,
            http,
            legacy_timeout,
        })
    }

    /// Run the task's strategy for (user, guild) with an optional
    /// user-supplied identifier.
    pub async fn dispatch(
        &self,
        user_id: &str,
        guild_id: &str,
        config: &VerificationConfig,
        identifier: Option<&str>,
    ) -> EngineResult<VerificationOutcome> {
        match config {
            VerificationConfig::Native(check) => self.dispatch_native(user_id, guild_id, check).await,
            VerificationConfig::Connector(check) => {
                let identifier = require_identifier(identifier, check.identifier_type.as_str())?;
                self.dispatch_connector(check, identifier).await
            }
            VerificationConfig::Legacy(check) => {
                let identifier = require_identifier(identifier, "identifier")?;
                Ok(self.dispatch_legacy(check, identifier).await)
            }
        }
    }

    async fn dispatch_native(
        &self,
        user_id: &str,
        guild_id: &str,
        check: &NativeCheck,
    ) -> EngineResult<VerificationOutcome> {
        let window = ActivityWindow {
            since: check
                .within_secs
                .map(|secs| Utc::now() - ChronoDuration::seconds(secs)),
            channel_id: check.channel_id.clone(),
        };

        let current = self
            .activity
            .count(user_id, guild_id, &check.activity, &window)
            .await
            .map_err(|e| EngineError::Infrastructure(format!("Activity lookup failed: {e}")))?;

        #[allow(clippy::cast_precision_loss)]
        let satisfied = check.operator.compare(current as f64, check.threshold as f64);
        debug!(
            user_id,
            guild_id,
            current,
            threshold = check.threshold,
            operator = check.operator.as_str(),
            satisfied,
            "native check evaluated"
        );

        let outcome = if satisfied {
            VerificationOutcome::verified(native_message(&check.activity, true, current, check))
        } else {
            VerificationOutcome::not_verified(native_message(&check.activity, false, current, check))
        };
        Ok(outcome.with_values(current, check.threshold))
    }

    async fn dispatch_connector(
        &self,
        check: &ConnectorCheck,
        identifier: &str,
    ) -> EngineResult<VerificationOutcome> {
        let mut variables = HashMap::new();
        variables.insert(
            check.identifier_type.variable_name().to_string(),
            identifier.to_string(),
        );

        match self
            .connectors
            .test(check.connector_id, TestMode::Validate, &variables)
            .await
        {
            Ok(result) => {
                // Propagate the connector's boolean result and diagnostic
                // message verbatim.
                let verified = result.is_valid.unwrap_or(false);
                let message = result.message();
                Ok(VerificationOutcome {
                    verified,
                    message,
                    current_value: None,
                    required_value: None,
                })
            }
            Err(e) => {
                warn!(
                    connector_id = check.connector_id,
                    error = %e,
                    "transient connector failure treated as not verified"
                );
                Ok(VerificationOutcome::not_verified(
                    "Verification service did not respond; attempt counted",
                ))
            }
        }
    }

    async fn dispatch_legacy(&self, check: &LegacyCheck, identifier: &str) -> VerificationOutcome {
        let endpoint = substitute_tokens(&check.endpoint, identifier);
        let body = check.body.as_ref().map(|b| substitute_value(b, identifier));

        let mut request = self
            .http
            .request(
                reqwest::Method::from_bytes(check.method.as_str().as_bytes())
                    .unwrap_or(reqwest::Method::GET),
                &endpoint,
            )
            .timeout(self.legacy_timeout);
        for (name, value) in &check.headers {
            request = request.header(name, value);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(endpoint, error = %e, "legacy endpoint unreachable; treated as not verified");
                return VerificationOutcome::not_verified(
                    "Verification endpoint did not respond; attempt counted",
                );
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(endpoint, %status, "legacy endpoint returned non-2xx; treated as not verified");
            return VerificationOutcome::not_verified(format!(
                "Verification endpoint returned {status}"
            ));
        }

        let json: Value = match response.json().await {
            Ok(json) => json,
            Err(e) => {
                warn!(endpoint, error = %e, "legacy response was not JSON; treated as not verified");
                return VerificationOutcome::not_verified(
                    "Verification endpoint returned an unreadable response",
                );
            }
        };

        if evaluator::evaluate(&check.success, &json) {
            VerificationOutcome::verified("Verification condition satisfied")
        } else {
            VerificationOutcome::not_verified("Response did not satisfy the verification condition")
        }
    }
}

fn require_identifier<'a>(identifier: Option<&'a str>, wanted: &str) -> EngineResult<&'a str> {
    match identifier.map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(EngineError::UserInput(format!(
            "This task needs your {wanted} to verify"
        ))),
    }
}

fn native_message(kind: &ActivityKind, satisfied: bool, current: i64, check: &NativeCheck) -> String {
    let subject = match kind {
        ActivityKind::MessagesSent => "messages sent".to_string(),
        ActivityKind::ReactionsAdded => "reactions added".to_string(),
        ActivityKind::ReactionsReceived => "reactions received".to_string(),
        ActivityKind::PollsCreated => "polls created".to_string(),
        ActivityKind::PollVotes => "poll votes".to_string(),
        ActivityKind::RoleHeld { role_id } => format!("role {role_id}"),
    };
    if satisfied {
        format!("Verified: {subject} ({current}) meets the requirement")
    } else {
        format!(
            "Not yet: {subject} is {current}, needs {} {}",
            check.operator.as_str(),
            check.threshold
        )
    }
}

/// Case-insensitive ASCII search; token boundaries are ASCII so byte
/// offsets are valid slice points.
fn find_ascii_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || h.len() < from + n.len() {
        return None;
    }
    (from..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

/// Replace every recognized placeholder token in a template with the
/// identifier. Unmatched tokens are left untouched.
pub fn substitute_tokens(template: &str, identifier: &str) -> String {
    let mut result = template.to_string();
    for token in PLACEHOLDER_TOKENS {
        let mut output = String::with_capacity(result.len());
        let mut pos = 0;
        while let Some(start) = find_ascii_ci(&result, token, pos) {
            output.push_str(&result[pos..start]);
            output.push_str(identifier);
            pos = start + token.len();
        }
        output.push_str(&result[pos..]);
        result = output;
    }
    result
}

/// Apply token substitution to every string field of a JSON body template,
/// recursively.
pub fn substitute_value(template: &Value, identifier: &str) -> Value {
    match template {
        Value::String(s) => Value::String(substitute_tokens(s, identifier)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| substitute_value(item, identifier))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute_value(v, identifier)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_substitute_tokens_case_insensitive() {
        assert_eq!(
            substitute_tokens("https://api.example/holder/{WALLET}", "0xabc"),
            "https://api.example/holder/0xabc"
        );
        assert_eq!(
            substitute_tokens("check {Wallet} and {wallet}", "w"),
            "check w and w"
        );
    }

    #[test]
    fn test_substitute_tokens_unmatched_left_untouched() {
        assert_eq!(
            substitute_tokens("/v1/{unknown_token}/{email}", "a@b.c"),
            "/v1/{unknown_token}/a@b.c"
        );
        assert_eq!(substitute_tokens("no tokens here", "x"), "no tokens here");
    }

    #[test]
    fn test_full_token_set_applies() {
        // Deliberately permissive: every token substitutes regardless of the
        // declared identifier type.
        let out = substitute_tokens("{wallet}|{email}|{username}|{user_id}|{identifier}", "v");
        assert_eq!(out, "v|v|v|v|v");
    }

    #[test]
    fn test_substitute_value_recurses() {
        let body = json!({
            "address": "{wallet}",
            "meta": {"contact": "{email}", "count": 3},
            "list": ["{identifier}", true]
        });
        let out = substitute_value(&body, "ID");
        assert_eq!(
            out,
            json!({
                "address": "ID",
                "meta": {"contact": "ID", "count": 3},
                "list": ["ID", true]
            })
        );
    }

    #[test]
    fn test_require_identifier() {
        assert!(require_identifier(None, "wallet").is_err());
        assert!(require_identifier(Some("   "), "wallet").is_err());
        assert_eq!(require_identifier(Some(" 0xabc "), "wallet").unwrap(), "0xabc");
    }

    #[test]
    fn test_outcome_constructors() {
        let ok = VerificationOutcome::verified("done").with_values(5, 3);
        assert!(ok.verified);
        assert_eq!(ok.current_value, Some(5));
        assert_eq!(ok.required_value, Some(3));
        assert!(!VerificationOutcome::not_verified("nope").verified);
    }
}
