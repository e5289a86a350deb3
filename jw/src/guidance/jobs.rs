//! Guidance for job operations

use serde_json::{Value, json};

use super::{
    GuidanceError, GuidanceResult, NextStep, Operation, display, first_text, first_truthy, text, truthy,
};

pub(super) fn create_job(data: &Value) -> Result<GuidanceResult, GuidanceError> {
    let job_id = text(data, "job_id");
    let session_id = text(data, "session_id");

    // Table-maker sessions queue their own preview once execution finishes
    if text(data, "error") == "missing_config" {
        return Ok(GuidanceResult::new(
            "No validation config found for this session. For table-maker sessions, the preview is \
             auto-queued once execution finishes; do NOT create a job. Wait on the session id to track \
             the table-maker and preview phases until preview_complete.",
            vec![NextStep::new(
                Operation::WaitForJob,
                json!({ "job_id": session_id }),
                "Preferred: handles the table-maker to preview phase boundary and blocks until preview_complete.",
            )],
        ));
    }

    let status = text(data, "status");
    Ok(GuidanceResult::new(
        format!("Job created (status={}). Poll for status updates.", status),
        vec![NextStep::new(
            Operation::GetJobStatus,
            json!({ "job_id": job_id }),
            "Poll every 10s until status changes from 'queued' or 'processing'.",
        )],
    ))
}

pub(super) fn get_job_status(data: &Value) -> Result<GuidanceResult, GuidanceError> {
    let job_id = text(data, "job_id");
    let status = text(data, "status");

    match status {
        "queued" | "processing" => {
            let progress = data
                .get("progress")
                .and_then(Value::as_f64)
                .map(|p| format!(" ({:.0}%)", p))
                .unwrap_or_default();
            Ok(GuidanceResult::new(
                format!("Job is {}{}. Keep polling.", status, progress),
                vec![
                    NextStep::new(
                        Operation::GetJobStatus,
                        json!({ "job_id": job_id }),
                        "Poll again in ~10 seconds.",
                    ),
                    NextStep::new(
                        Operation::GetJobMessages,
                        json!({ "job_id": job_id }),
                        "Optional: fetch live progress messages from the job.",
                    ),
                ],
            ))
        }
        "preview_complete" => Ok(preview_complete(data, job_id)),
        "completed" => Ok(GuidanceResult::new(
            "Job completed successfully. Fetch your results.",
            vec![
                NextStep::new(
                    Operation::GetResults,
                    json!({ "job_id": job_id }),
                    "Download the enriched/validated output.",
                ),
                NextStep::new(
                    Operation::GetReferenceResults,
                    json!({ "job_id": job_id }),
                    "Optional: fetch reference-check sub-results if applicable.",
                ),
            ],
        )),
        "failed" => {
            let error = first_truthy(data, &["error", "message"])
                .map(display)
                .unwrap_or_else(|| "Unknown error".to_string());
            Ok(GuidanceResult::done(format!(
                "Job failed: {}. No further actions available.",
                error
            )))
        }
        other => Ok(GuidanceResult::new(
            format!("Job status is '{}'. Poll again or check messages.", other),
            vec![NextStep::new(
                Operation::GetJobStatus,
                json!({ "job_id": job_id }),
                "Poll again in a few seconds.",
            )],
        )),
    }
}

/// Approval step for a finished preview, with the estimated cost
fn preview_complete(data: &Value, job_id: &str) -> GuidanceResult {
    let nested_cost = data
        .get("cost_estimate")
        .and_then(|c| c.get("estimated_total_cost_usd"))
        .filter(|v| truthy(Some(*v)));
    let cost = nested_cost
        .or_else(|| first_truthy(data, &["estimated_cost_usd", "cost_usd"]))
        .cloned()
        .unwrap_or(json!(0));
    let cost_text = display(&cost);

    let config_id = text(data, "config_id");
    let refine_session = first_text(data, &["refine_session_id", "conversation_id"]);
    let session_id = text(data, "session_id");

    let mut next_steps = vec![NextStep::new(
        Operation::ApproveValidation,
        json!({ "job_id": job_id, "approved_cost_usd": cost }),
        format!(
            "Review preview_results.download_url first, then approve. Estimated cost: ${}.",
            cost_text
        ),
    )];
    if !refine_session.is_empty() {
        next_steps.push(NextStep::new(
            Operation::RefineConfig,
            json!({
                "conversation_id": refine_session,
                "session_id": session_id,
                "instructions": "<describe the changes you want>",
            }),
            "Optional: refine column mappings before approving.",
        ));
    }

    let mut summary = format!("Preview complete. Estimated cost: ${}. ", cost_text);
    if !config_id.is_empty() {
        summary.push_str(&format!("config_id for future reruns: {}. ", config_id));
    }
    summary.push_str("Approve to start full processing.");

    GuidanceResult::new(summary, next_steps)
}

pub(super) fn get_job_messages(data: &Value) -> Result<GuidanceResult, GuidanceError> {
    let job_id = text(data, "job_id");
    let messages = super::array(data, "messages")?;

    // Top-level last_seq wins; otherwise the last message's own sequence
    let last_seq = data
        .get("last_seq")
        .filter(|v| !v.is_null())
        .or_else(|| {
            messages
                .last()
                .and_then(|m| first_truthy(m, &["_seq", "seq"]))
        })
        .cloned();

    let mut params = json!({ "job_id": job_id });
    if let Some(seq) = last_seq {
        params["since_seq"] = seq;
    }

    Ok(GuidanceResult::new(
        format!(
            "Fetched {} message(s). Continue polling job status.",
            messages.len()
        ),
        vec![
            NextStep::new(
                Operation::GetJobMessages,
                params,
                "Pass since_seq to get only new messages.",
            ),
            NextStep::new(
                Operation::GetJobStatus,
                json!({ "job_id": job_id }),
                "Check overall job status.",
            ),
        ],
    ))
}

pub(super) fn update_table(data: &Value) -> Result<GuidanceResult, GuidanceError> {
    Ok(GuidanceResult::new(
        "Update-table job started. Poll for status.",
        vec![NextStep::new(
            Operation::GetJobStatus,
            json!({ "job_id": text(data, "job_id") }),
            "Poll until completed.",
        )],
    ))
}

pub(super) fn reference_check(data: &Value) -> Result<GuidanceResult, GuidanceError> {
    Ok(GuidanceResult::new(
        "Reference-check job started. Poll for status.",
        vec![NextStep::new(
            Operation::GetJobStatus,
            json!({ "job_id": text(data, "job_id") }),
            "Poll until completed, then call get_reference_results.",
        )],
    ))
}
