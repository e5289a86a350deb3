//! Guidance for approval and result retrieval

use std::collections::BTreeMap;

use serde_json::{Value, json};

use super::{GuidanceError, GuidanceResult, NextStep, Operation, display, flag, text};

pub(super) fn approve_validation(data: &Value) -> Result<GuidanceResult, GuidanceError> {
    let job_id = text(data, "job_id");

    if text(data, "error") == "cost_approval_required" {
        let required = data.get("required_cost_usd").map(display).unwrap_or_else(|| "unknown".to_string());
        return Ok(GuidanceResult::new(
            format!(
                "Approval rejected: the approved cost is below the estimate (${}). Check the job status \
                 for the current estimate and approve again.",
                required
            ),
            vec![NextStep::new(
                Operation::GetJobStatus,
                json!({ "job_id": job_id }),
                "Read cost_estimate.estimated_total_cost_usd and pass it as approved_cost_usd.",
            )],
        ));
    }

    Ok(GuidanceResult::new(
        format!(
            "Validation approved. Job is now {}. Poll for completion.",
            text(data, "status")
        ),
        vec![NextStep::new(
            Operation::GetJobStatus,
            json!({ "job_id": job_id }),
            "Poll every 10-15s. Status will move to 'completed' when done.",
        )],
    ))
}

pub(super) fn get_results(data: &Value) -> Result<GuidanceResult, GuidanceError> {
    let empty = Value::Null;
    let results = data.get("results").unwrap_or(&empty);
    let job_info = data.get("job_info").unwrap_or(&empty);
    let stats = data.get("summary").unwrap_or(&empty);

    let stat = |key: &str| stats.get(key).filter(|v| !v.is_null()).map(display);
    let rows = stat("rows_processed").unwrap_or_else(|| "?".to_string());
    let cols = stat("columns_validated").unwrap_or_else(|| "?".to_string());

    let mut summary = format!("Validation complete: {} rows, {} columns validated", rows, cols);
    let table_name = text(job_info, "input_table_name");
    if !table_name.is_empty() {
        summary.push_str(&format!(" ({})", table_name));
    }
    if let Some(cost) = stat("cost_usd") {
        summary.push_str(&format!(", cost ${}", cost));
    }
    summary.push('.');

    let viewer_url = text(results, "interactive_viewer_url");
    if !viewer_url.is_empty() {
        summary.push_str(&format!(
            " Share the interactive viewer with humans, it is the best way to communicate these results: {}",
            viewer_url
        ));
    }

    let key_urls: BTreeMap<String, String> = [
        ("interactive_viewer", viewer_url),
        ("download_excel", text(results, "download_url")),
        ("metadata", text(results, "metadata_url")),
    ]
    .into_iter()
    .filter(|(_, url)| !url.is_empty())
    .map(|(name, url)| (name.to_string(), url.to_string()))
    .collect();

    let next_steps = if flag(job_info, "has_reference_results") {
        let job_id = match text(job_info, "job_id") {
            "" => text(data, "job_id"),
            id => id,
        };
        vec![NextStep::new(
            Operation::GetReferenceResults,
            json!({ "job_id": job_id }),
            "Optional: fetch reference-check sub-results if a reference document was provided.",
        )]
    } else {
        Vec::new()
    };

    let has_inline_metadata = results.get("metadata").is_some_and(|m| !m.is_null());

    Ok(GuidanceResult {
        summary,
        next_steps,
        notes: reading_notes(has_inline_metadata),
        key_urls,
    })
}

/// How to read a results payload
fn reading_notes(has_inline_metadata: bool) -> Vec<String> {
    let source = if has_inline_metadata {
        "1. results.metadata is the full table metadata, embedded inline. It is the primary \
         machine-readable source of truth for every validated cell."
    } else {
        "1. results.metadata_url points to the table metadata JSON with every validated cell's \
         full detail. Download it to access per-cell validation details."
    };

    [
        "HOW TO READ THE RESULTS:",
        source,
        "2. Metadata structure: table_name, columns[] (importance, description, notes), \
         rows[] keyed by row_key with cells{}.",
        "   cells[Column].full_value is the validated value; cells[Column].confidence is HIGH / MEDIUM / LOW / ID.",
        "   cells[Column].comment carries validator_explanation, qc_reasoning, key_citation and sources[].",
        "3. results.download_url is the enriched Excel file with the same detail embedded as comments.",
        "4. Share results.interactive_viewer_url with human stakeholders; it renders sources and confidence.",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

pub(super) fn get_reference_results(_data: &Value) -> Result<GuidanceResult, GuidanceError> {
    Ok(GuidanceResult::done("Reference results fetched. Workflow complete."))
}
