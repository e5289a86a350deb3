//! Domain types for jobwatch
//!
//! Snapshots produced by each poll: job status, message feed entries and
//! conversation turns. All are created per poll and discarded once folded
//! into the wait session's progress state.

use serde_json::Value;

mod conversation;
mod job;
mod message;

pub use conversation::ConversationState;
pub use job::{JobState, JobStatus};
pub use message::{Message, MessageBatch};

/// Read a JSON number or numeric string as `f64`
pub(crate) fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Python-style truthiness: present, not null, not false, not 0, not empty
pub(crate) fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

/// First truthy value among `candidates`, in order
///
/// Wire fields often come under two names (`current_step` / `step`); the
/// first one with content wins and a null or empty primary falls through.
pub(crate) fn first_present(candidates: impl IntoIterator<Item = Option<Value>>) -> Option<Value> {
    candidates.into_iter().flatten().find(|v| truthy(Some(v)))
}

/// Read a JSON scalar as text; numbers are rendered, everything else is absent
pub(crate) fn text_from_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_present_skips_null_and_empty() {
        let picked = first_present([Some(Value::Null), Some(json!("")), Some(json!("Table Making"))]);
        assert_eq!(picked, Some(json!("Table Making")));
        assert_eq!(first_present([None, Some(Value::Null)]), None);
    }

    #[test]
    fn test_text_from_value() {
        assert_eq!(text_from_value(json!("j1")), Some("j1".to_string()));
        assert_eq!(text_from_value(json!(42)), Some("42".to_string()));
        assert_eq!(text_from_value(json!(true)), None);
    }
}
