//! Rendering of results for the `jw` command line

use colored::*;
use serde_json::{Map, Value};

use crate::guidance::GuidanceResult;

/// Key holding the attached guidance
pub const GUIDANCE_KEY: &str = "_guidance";

/// Key holding the timeout note of a timed-out wait
pub const TIMEOUT_KEY: &str = "_wait_timeout";

/// Attach guidance (and a timeout note) to a response payload
///
/// Non-object payloads are wrapped under `data` so the annotations always
/// have somewhere to live.
pub fn annotate(payload: Value, guidance: &GuidanceResult, timeout_note: Option<&str>) -> Value {
    let mut object = match payload {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("data".to_string(), other);
            map
        }
    };
    object.insert(GUIDANCE_KEY.to_string(), guidance.to_value());
    if let Some(note) = timeout_note {
        object.insert(TIMEOUT_KEY.to_string(), Value::String(note.to_string()));
    }
    Value::Object(object)
}

/// Pretty JSON for stdout
pub fn render_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Human-oriented rendering of an annotated payload
pub fn render_text(value: &Value) -> String {
    let mut lines = Vec::new();

    if let Some(note) = value.get(TIMEOUT_KEY).and_then(Value::as_str) {
        lines.push(format!("{} {}", "⚠".yellow(), note.yellow()));
    }

    if let Some(status) = value.get("status").and_then(Value::as_str) {
        let id = ["job_id", "conversation_id"]
            .iter()
            .find_map(|k| value.get(*k).and_then(Value::as_str))
            .unwrap_or("-");
        lines.push(format!("{} {}", id.cyan(), colorize_status(status)));
        if let Some(step) = value.get("current_step").and_then(Value::as_str) {
            lines.push(format!("  Step: {}", step));
        }
        if let Some(error) = value.get("error").and_then(Value::as_str) {
            lines.push(format!("  Error: {}", error.red()));
        }
    }

    // Bare recommendations carry the guidance fields at the top level
    let guidance = value
        .get(GUIDANCE_KEY)
        .or_else(|| value.get("next_steps").map(|_| value));
    if let Some(guidance) = guidance {
        if let Some(summary) = guidance.get("summary").and_then(Value::as_str) {
            lines.push(format!("{} {}", "→".green(), summary));
        }
        for step in guidance.get("next_steps").and_then(Value::as_array).into_iter().flatten() {
            let operation = step.get("operation").and_then(Value::as_str).unwrap_or("?");
            let parameters = step.get("parameters").map(Value::to_string).unwrap_or_default();
            let note = step.get("note").and_then(Value::as_str).unwrap_or("");
            lines.push(format!("  {} {} {}", operation.bold(), parameters.dimmed(), note));
        }
        for (name, url) in guidance.get("key_urls").and_then(Value::as_object).into_iter().flatten() {
            lines.push(format!("  {}: {}", name, url.as_str().unwrap_or_default().underline()));
        }
    }

    lines.join("\n")
}

fn colorize_status(status: &str) -> ColoredString {
    match status {
        "completed" | "preview_complete" => status.green(),
        "failed" => status.red(),
        "queued" | "processing" | "in_progress" => status.yellow(),
        _ => status.normal(),
    }
}
