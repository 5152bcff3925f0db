//! Success-condition evaluator: the small rule language judging a legacy
//! endpoint's JSON response.
//!
//! A condition is `{field, operator, value}`. The field is a dot-path walked
//! through nested structures; any missing segment resolves to undefined.

use crate::domain::models::{ConditionOp, SuccessCondition};
use serde_json::Value;

/// Walk a dot-path through nested JSON. `None` means undefined (a missing
/// segment), which is distinct from a present `null`.
pub fn resolve_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        if segment.is_empty() {
            return None;
        }
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => {
                let index: usize = segment.parse().ok()?;
                items.get(index)?
            }
            _ => return None,
        };
    }
    Some(current)
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Evaluate a condition against a response body.
pub fn evaluate(condition: &SuccessCondition, response: &Value) -> bool {
    let resolved = resolve_path(response, &condition.field);

    match condition.operator {
        ConditionOp::Exists => matches!(resolved, Some(v) if !v.is_null()),
        ConditionOp::NotEmpty => match resolved {
            None | Some(Value::Null) => false,
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            // Defined and non-null, any other type.
            Some(_) => true,
        },
        op => {
            let Some(resolved) = resolved else {
                return false;
            };
            match (as_number(resolved), as_number(&condition.value)) {
                (Some(left), Some(right)) => op
                    .as_comparison()
                    .map(|cmp| cmp.compare(left, right))
                    .unwrap_or(false),
                // Non-numeric resolved value: strict equality/inequality
                // only for =/!=, otherwise fail.
                _ => match op {
                    ConditionOp::Eq => resolved == &condition.value,
                    ConditionOp::Neq => resolved != &condition.value,
                    _ => false,
                },
            }
        }
    }
}
