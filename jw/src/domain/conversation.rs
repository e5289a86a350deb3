//! ConversationState domain type
//!
//! Snapshot of one AI conversation turn (upload interview, table maker,
//! config refinement).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::{text_from_value, truthy};

/// Statuses that mean the AI is still working on its turn
const ACTIVE_STATUSES: &[&str] = &["processing", "queued", "in_progress"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    #[serde(default, deserialize_with = "lenient_text")]
    pub conversation_id: String,

    #[serde(default, deserialize_with = "lenient_text")]
    pub session_id: String,

    #[serde(default = "default_status", deserialize_with = "lenient_status")]
    pub status: String,

    /// The AI finished its turn and asked the user something
    #[serde(default, deserialize_with = "lenient_flag")]
    pub user_reply_needed: bool,

    /// The AI approved execution; a job is queued under the session id
    #[serde(default, deserialize_with = "lenient_flag")]
    pub trigger_execution: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_status() -> String {
    "processing".to_string()
}

/// Null or non-text reads as empty
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(text_from_value).unwrap_or_default())
}

/// Null status reads like a missing one
fn lenient_status<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(text_from_value).unwrap_or_else(default_status))
}

/// Flags are read by truthiness; null is unset
fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(truthy(value.as_ref()))
}

impl ConversationState {
    /// Placeholder for a conversation that was never fetched successfully
    pub fn unknown(conversation_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            session_id: session_id.into(),
            status: "unknown".to_string(),
            ..Default::default()
        }
    }

    /// Whether this turn is over from the caller's point of view
    pub fn turn_finished(&self) -> bool {
        let finished =
            self.user_reply_needed || self.trigger_execution || !ACTIVE_STATUSES.contains(&self.status.as_str());
        debug!(
            status = %self.status,
            self.user_reply_needed,
            self.trigger_execution,
            finished,
            "ConversationState::turn_finished: called"
        );
        finished
    }

    /// Fill identifiers the backend omitted from its response
    pub fn fill_ids(&mut self, conversation_id: &str, session_id: &str) {
        if self.conversation_id.is_empty() {
            self.conversation_id = conversation_id.to_string();
        }
        if self.session_id.is_empty() {
            self.session_id = session_id.to_string();
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            debug!(error = %e, "ConversationState::to_value: serialization failed");
            Value::Object(Map::new())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_processing_turn_not_finished() {
        let state: ConversationState = serde_json::from_value(json!({"status": "processing"})).unwrap();
        assert!(!state.turn_finished());
    }

    #[test]
    fn test_reply_needed_finishes_turn_even_while_processing() {
        let state: ConversationState =
            serde_json::from_value(json!({"status": "processing", "user_reply_needed": true})).unwrap();
        assert!(state.turn_finished());
    }

    #[test]
    fn test_trigger_execution_and_other_status_finish_turn() {
        let triggered: ConversationState =
            serde_json::from_value(json!({"status": "in_progress", "trigger_execution": true})).unwrap();
        assert!(triggered.turn_finished());

        let done: ConversationState = serde_json::from_value(json!({"status": "completed"})).unwrap();
        assert!(done.turn_finished());
    }

    #[test]
    fn test_null_fields_are_tolerated() {
        let state: ConversationState = serde_json::from_value(json!({
            "conversation_id": null,
            "session_id": null,
            "status": null,
            "user_reply_needed": null,
            "trigger_execution": null
        }))
        .unwrap();

        assert_eq!(state.conversation_id, "");
        assert_eq!(state.status, "processing");
        assert!(!state.user_reply_needed);
        assert!(!state.trigger_execution);
        assert!(!state.turn_finished());
    }

    #[test]
    fn test_truthy_flags() {
        let state: ConversationState =
            serde_json::from_value(json!({"status": "processing", "trigger_execution": 1})).unwrap();
        assert!(state.trigger_execution);
        assert!(state.turn_finished());
    }

    #[test]
    fn test_fill_ids_keeps_backend_values() {
        let mut state: ConversationState = serde_json::from_value(json!({"conversation_id": "c9"})).unwrap();
        state.fill_ids("c1", "s1");
        assert_eq!(state.conversation_id, "c9");
        assert_eq!(state.session_id, "s1");
        assert_eq!(state.to_value()["session_id"], "s1");
    }
}
