//! Message domain types
//!
//! Messages arrive on an incremental feed. Each pipeline sub-stage ("card")
//! numbers its own messages, so sequence numbers are monotone per card only.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::{first_present, text_from_value};

/// One entry from the incremental message feed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawMessage")]
pub struct Message {
    #[serde(rename = "_seq", skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,

    /// Pipeline sub-stage that emitted the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,

    #[serde(rename = "message_data")]
    pub payload: Value,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Wire shape of a feed entry: `_seq` or `seq`, `message_data` or `data`
#[derive(Deserialize)]
struct RawMessage {
    #[serde(default, rename = "_seq")]
    underscore_seq: Option<Value>,
    #[serde(default)]
    seq: Option<Value>,
    #[serde(default)]
    card_id: Option<Value>,
    #[serde(default)]
    message_data: Option<Value>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<RawMessage> for Message {
    fn from(raw: RawMessage) -> Self {
        // A seq of 0 is legitimate, so only null or non-numeric falls through
        let seq = [raw.underscore_seq, raw.seq]
            .into_iter()
            .flatten()
            .find_map(|v| sequence_number(&v));
        Self {
            seq,
            card_id: raw.card_id.and_then(text_from_value),
            payload: first_present([raw.message_data, raw.data]).unwrap_or(Value::Null),
            extra: raw.extra,
        }
    }
}

fn sequence_number(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl Message {
    pub fn new(seq: u64, payload: Value) -> Self {
        Self {
            seq: Some(seq),
            payload,
            ..Default::default()
        }
    }

    /// Builder-style card identifier
    pub fn on_card(mut self, card_id: impl Into<String>) -> Self {
        self.card_id = Some(card_id.into());
        self
    }

    /// First numeric value found under any of `keys`
    ///
    /// Presence is checked explicitly so a legitimate `0` is returned, not skipped.
    pub fn progress(&self, keys: &[String]) -> Option<f64> {
        let payload = self.payload.as_object()?;
        for key in keys {
            if let Some(raw) = payload.get(key) {
                match super::number_from_value(raw) {
                    Some(n) => return Some(n),
                    None => debug!(%key, ?raw, "Message::progress: non-numeric progress value ignored"),
                }
            }
        }
        None
    }
}

/// Response of one incremental message query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageBatch {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub messages: Vec<Message>,

    /// Feed position reported by the source, if any
    #[serde(default, deserialize_with = "lenient_seq", skip_serializing_if = "Option::is_none")]
    pub last_seq: Option<u64>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Message>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Message>>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_seq<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(sequence_number))
}

impl MessageBatch {
    pub fn new(messages: Vec<Message>, last_seq: Option<u64>) -> Self {
        Self { messages, last_seq }
    }

    /// Highest sequence number this batch tells us about
    ///
    /// Prefers the source's own `last_seq`; otherwise the maximum over all
    /// messages, since cards interleave and the last message need not carry
    /// the largest number.
    pub fn high_water_mark(&self) -> Option<u64> {
        let from_messages = self.messages.iter().filter_map(|m| m.seq).max();
        match (self.last_seq, from_messages) {
            (Some(reported), _) => Some(reported),
            (None, seen) => seen,
        }
    }
}
