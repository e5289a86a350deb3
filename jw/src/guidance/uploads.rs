//! Guidance for file uploads

use serde_json::{Value, json};

use super::{GuidanceError, GuidanceResult, NextStep, Operation, array, text};

/// Match score at which a prior config is worth reusing as-is
const REUSE_SCORE: f64 = 0.85;

pub(super) fn upload_file(data: &Value) -> Result<GuidanceResult, GuidanceError> {
    Ok(GuidanceResult::new(
        "File uploaded. Call confirm_upload to register it with the session.",
        vec![NextStep::new(
            Operation::ConfirmUpload,
            json!({
                "session_id": text(data, "session_id"),
                "s3_key": text(data, "s3_key"),
                "filename": text(data, "filename"),
            }),
            "Confirm the upload so the backend indexes the file and detects prior configs.",
        )],
    ))
}

pub(super) fn confirm_upload(data: &Value) -> Result<GuidanceResult, GuidanceError> {
    let session_id = text(data, "session_id");

    let mut matches = array(data, "matches")?;
    if matches.is_empty() {
        matches = array(data, "config_matches")?;
    }
    let best = matches.first();
    let best_score = best
        .and_then(|m| m.get("match_score"))
        .and_then(Value::as_f64)
        .unwrap_or(0.0);

    let interview = |note: &str| {
        NextStep::new(
            Operation::StartUploadInterview,
            json!({ "session_id": session_id, "message": "" }),
            note,
        )
    };

    if best_score >= REUSE_SCORE {
        let config_id = best.map(|m| text(m, "config_id")).unwrap_or("");
        return Ok(GuidanceResult::new(
            format!(
                "Upload confirmed. A prior config matches with score {:.2}. You can reuse it directly.",
                best_score
            ),
            vec![
                NextStep::new(
                    Operation::CreateJob,
                    json!({ "session_id": session_id, "config_id": config_id }),
                    "Creates a preview job using the matched config. Fastest path.",
                ),
                interview("Optional: start an AI interview to build or modify a config instead."),
            ],
        ));
    }

    Ok(GuidanceResult::new(
        "Upload confirmed. No strong prior config match; start an AI interview to generate a config, \
         or provide one manually.",
        vec![
            interview("Recommended: AI-guided interview to create a validation config."),
            NextStep::new(
                Operation::CreateJob,
                json!({ "session_id": session_id, "config": "<paste config JSON here>" }),
                "Alternative: supply your own config JSON directly.",
            ),
        ],
    ))
}
