//! Candidate extractor for the quest builder.
//!
//! Scans a generated reply for fenced blocks in the recognized shapes (a
//! connector definition, a terminal complete-quest block, or a generic blob
//! with known field names) and merges valid fragments into the draft.
//! Structurally invalid fragments are dropped silently so the next turn can
//! retry; a few plain-text regex fallbacks fill specific fields when no
//! structured block supplied them. Unvalidated structures never cross this
//! boundary.

use crate::domain::models::{ConnectorDefinition, DraftTask, QuestDraft};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

/// Terminal "complete quest" block.
#[derive(Debug, Deserialize)]
struct QuestBlock {
    name: String,
    description: String,
    #[serde(default)]
    points: Option<i64>,
    #[serde(default)]
    tasks: Vec<DraftTask>,
}

/// What one reply contributed to the draft.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Field names that were set or replaced.
    pub merged: Vec<String>,
    /// Fenced blocks that failed to parse or validate.
    pub dropped: usize,
}

impl ExtractionReport {
    fn merged_field(&mut self, name: &str) {
        self.merged.push(name.to_string());
    }
}

/// Scan a reply and merge recognized fragments into the draft.
pub fn merge_reply(reply: &str, draft: &mut QuestDraft) -> ExtractionReport {
    let mut report = ExtractionReport::default();

    for block in fenced_blocks(reply) {
        let value: Value = match serde_json::from_str(block) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "dropping unparseable fenced block");
                report.dropped += 1;
                continue;
            }
        };
        merge_block(&value, draft, &mut report);
    }

    apply_text_fallbacks(reply, draft, &mut report);
    report
}

fn merge_block(value: &Value, draft: &mut QuestDraft, report: &mut ExtractionReport) {
    let Value::Object(map) = value else {
        report.dropped += 1;
        return;
    };

    // A connector definition carries an endpoint; a complete-quest block
    // carries a task list. Anything else is a generic blob merged
    // field-by-field.
    if map.contains_key("endpoint") {
        match serde_json::from_value::<ConnectorDefinition>(value.clone()) {
            Ok(definition) if definition.validate().is_ok() => {
                report.merged_field(&format!("connector '{}'", definition.name));
                draft.declare_connector(definition);
            }
            Ok(_) | Err(_) => {
                debug!("dropping structurally invalid connector block");
                report.dropped += 1;
            }
        }
        return;
    }

    if map.contains_key("tasks") {
        match serde_json::from_value::<QuestBlock>(value.clone()) {
            Ok(block) if block_is_valid(&block) => {
                draft.name = Some(block.name);
                draft.description = Some(block.description);
                if let Some(points) = block.points {
                    draft.points = Some(points);
                }
                draft.tasks = block.tasks;
                report.merged_field("quest definition");
            }
            Ok(_) | Err(_) => {
                debug!("dropping structurally invalid quest block");
                report.dropped += 1;
            }
        }
        return;
    }

    merge_generic_fields(map, draft, report);
}

fn block_is_valid(block: &QuestBlock) -> bool {
    if block.name.trim().is_empty() || block.description.trim().is_empty() {
        return false;
    }
    if block.tasks.is_empty() && block.points.is_none() {
        return false;
    }
    block
        .tasks
        .iter()
        .all(|t| !t.title.trim().is_empty() && t.points >= 0)
}

/// Generic blob: merge individually recognized field names.
fn merge_generic_fields(
    map: &serde_json::Map<String, Value>,
    draft: &mut QuestDraft,
    report: &mut ExtractionReport,
) {
    if let Some(Value::String(name)) = map.get("name") {
        if !name.trim().is_empty() {
            draft.name = Some(name.trim().to_string());
            report.merged_field("name");
        }
    }
    if let Some(Value::String(description)) = map.get("description") {
        if !description.trim().is_empty() {
            draft.description = Some(description.trim().to_string());
            report.merged_field("description");
        }
    }
    if let Some(points) = map.get("points").and_then(Value::as_i64) {
        if points >= 0 {
            draft.points = Some(points);
            report.merged_field("points");
        }
    }
}

fn points_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(\d{1,6})\s*points?\b").expect("valid regex"))
}

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?im)^quest name\s*[:\-]\s*"?([^"\n]+?)"?\s*$"#).expect("valid regex")
    })
}

/// Plain-text fallbacks, applied only to fields no structured block
/// supplied.
fn apply_text_fallbacks(reply: &str, draft: &mut QuestDraft, report: &mut ExtractionReport) {
    let prose = strip_fences(reply);

    if draft.points.is_none() && draft.tasks.is_empty() {
        if let Some(caps) = points_regex().captures(&prose) {
            if let Ok(points) = caps[1].parse::<i64>() {
                draft.points = Some(points);
                report.merged_field("points (from text)");
            }
        }
    }

    if draft.name.is_none() {
        if let Some(caps) = name_regex().captures(&prose) {
            draft.name = Some(caps[1].trim().to_string());
            report.merged_field("name (from text)");
        }
    }
}

/// Inner content of every ``` fenced block, language tags stripped.
fn fenced_blocks(reply: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = reply;
    while let Some(open) = rest.find("```") {
        let after_open = &rest[open + 3..];
        let Some(close) = after_open.find("```") else {
            break;
        };
        let raw = &after_open[..close];
        // Drop an optional language tag on the opening line.
        let content = match raw.find('\n') {
            Some(newline) if raw[..newline].trim().chars().all(char::is_alphanumeric) => {
                &raw[newline + 1..]
            }
            _ => raw,
        };
        blocks.push(content.trim());
        rest = &after_open[close + 3..];
    }
    blocks
}

/// Reply text with fenced blocks removed, for prose-only fallbacks.
fn strip_fences(reply: &str) -> String {
    let mut prose = String::with_capacity(reply.len());
    let mut rest = reply;
    loop {
        match rest.find("```") {
            Some(open) => {
                prose.push_str(&rest[..open]);
                let after_open = &rest[open + 3..];
                match after_open.find("```") {
                    Some(close) => rest = &after_open[close + 3..],
                    None => break,
                }
            }
            None => {
                prose.push_str(rest);
                break;
            }
        }
    }
    prose
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{DraftVerification, IdentifierType};

    #[test]
    fn test_fenced_blocks_with_and_without_language_tag() {
        let reply = "Here:\n```json\n{\"a\":1}\n```\nand\n```\n{\"b\":2}\n```";
        let blocks = fenced_blocks(reply);
        assert_eq!(blocks, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[test]
    fn test_generic_blob_merges_known_fields() {
        let mut draft = QuestDraft::default();
        let report = merge_reply(
            "```json\n{\"name\": \"Greeter\", \"description\": \"Say hello\", \"points\": 10}\n```",
            &mut draft,
        );
        assert_eq!(draft.name.as_deref(), Some("Greeter"));
        assert_eq!(draft.description.as_deref(), Some("Say hello"));
        assert_eq!(draft.points, Some(10));
        assert_eq!(report.dropped, 0);
    }

    #[test]
    fn test_connector_block_declares_connector() {
        let mut draft = QuestDraft::default();
        let reply = r#"```json
{
  "name": "token-holder",
  "endpoint": "https://chain.example/holders/{wallet}",
  "method": "GET",
  "identifier_type": "wallet",
  "success": {"field": "balance", "operator": ">", "value": 0}
}
```"#;
        let report = merge_reply(reply, &mut draft);
        assert_eq!(draft.connectors.len(), 1);
        assert_eq!(draft.connectors[0].identifier_type, IdentifierType::Wallet);
        assert_eq!(report.dropped, 0);
    }

    #[test]
    fn test_invalid_method_drops_connector_block() {
        let mut draft = QuestDraft::default();
        let reply = r#"```json
{"name": "c", "endpoint": "https://x", "method": "TRACE", "identifier_type": "wallet"}
```"#;
        let report = merge_reply(reply, &mut draft);
        assert!(draft.connectors.is_empty());
        assert_eq!(report.dropped, 1);
    }

    #[test]
    fn test_complete_quest_block() {
        let mut draft = QuestDraft::default();
        let reply = r#"```json
{
  "name": "Community Star",
  "description": "Be active and hold the token",
  "tasks": [
    {
      "title": "Hold the member role",
      "points": 50,
      "verification": {"type": "native", "kind": "role_held", "role_id": "r1", "operator": ">=", "threshold": 1}
    },
    {
      "title": "Verify your wallet",
      "points": 100,
      "verification": {"type": "connector", "connector_name": "token-holder", "identifier_type": "wallet"}
    }
  ]
}
```"#;
        merge_reply(reply, &mut draft);
        assert_eq!(draft.name.as_deref(), Some("Community Star"));
        assert_eq!(draft.tasks.len(), 2);
        assert!(matches!(
            draft.tasks[1].verification,
            DraftVerification::Connector { .. }
        ));
        // Connector not declared yet, so the draft stays incomplete.
        assert!(!draft.is_complete());
    }

    #[test]
    fn test_malformed_block_dropped_leaves_field_unset() {
        let mut draft = QuestDraft::default();
        let report = merge_reply("```json\n{\"tasks\": \"oops\"\n```", &mut draft);
        assert!(draft.tasks.is_empty());
        assert!(draft.name.is_none());
        assert_eq!(report.dropped, 1);
    }

    #[test]
    fn test_points_regex_fallback() {
        let mut draft = QuestDraft::default();
        let report = merge_reply("This quest should award 150 points for completion.", &mut draft);
        assert_eq!(draft.points, Some(150));
        assert!(report.merged.iter().any(|m| m.contains("points")));
    }

    #[test]
    fn test_fallback_skipped_when_block_supplied_points() {
        let mut draft = QuestDraft::default();
        merge_reply(
            "Worth 999 points!\n```json\n{\"points\": 10}\n```",
            &mut draft,
        );
        assert_eq!(draft.points, Some(10));
    }

    #[test]
    fn test_fallback_ignores_text_inside_fences() {
        let mut draft = QuestDraft::default();
        merge_reply("```\nthe quest grants 42 points\n```", &mut draft);
        assert_eq!(draft.points, None);
    }

    #[test]
    fn test_name_text_fallback() {
        let mut draft = QuestDraft::default();
        merge_reply("Quest name: The Gathering\nIt will be fun.", &mut draft);
        assert_eq!(draft.name.as_deref(), Some("The Gathering"));
    }
}
