//! Guidance for AI conversations (table maker, upload interview, config refinement)

use serde_json::{Value, json};

use super::{GuidanceError, GuidanceResult, NextStep, Operation, array, flag, text};

fn poll_conversation(data: &Value, note: &str) -> NextStep {
    NextStep::new(
        Operation::GetConversation,
        json!({
            "conversation_id": text(data, "conversation_id"),
            "session_id": text(data, "session_id"),
        }),
        note,
    )
}

pub(super) fn start_table_maker(data: &Value) -> Result<GuidanceResult, GuidanceError> {
    if text(data, "status") == "completed" {
        return Ok(GuidanceResult::new(
            "Table-maker finished immediately. Fetch the conversation for results.",
            vec![poll_conversation(
                data,
                "Retrieve the completed table and any next-step instructions.",
            )],
        ));
    }

    Ok(GuidanceResult::new(
        "Table-maker conversation started. Poll for its response.",
        vec![poll_conversation(data, "Poll every 8s while status is 'processing'.")],
    ))
}

pub(super) fn start_upload_interview(data: &Value) -> Result<GuidanceResult, GuidanceError> {
    Ok(GuidanceResult::new(
        "Upload interview started. Poll the conversation for the AI's first question.",
        vec![poll_conversation(data, "Poll every 8s while status is 'processing'.")],
    ))
}

/// Conversation state rules, checked in priority order
///
/// A pending reply beats everything, including a `processing` status: an
/// agent that keeps polling while the AI waits on it would loop forever.
pub(super) fn get_conversation(data: &Value) -> Result<GuidanceResult, GuidanceError> {
    let conv_id = text(data, "conversation_id");
    let session_id = text(data, "session_id");
    let status = text(data, "status");

    if flag(data, "user_reply_needed") {
        let question = array(data, "messages")?
            .last()
            .map(|m| text(m, "content"))
            .unwrap_or("");
        return Ok(GuidanceResult::new(
            format!("AI is waiting for your reply. Question: {}", question),
            vec![NextStep::new(
                Operation::SendConversationReply,
                json!({
                    "conversation_id": conv_id,
                    "session_id": session_id,
                    "message": "<your answer here>",
                }),
                "Answer the AI's question to continue the interview.",
            )],
        ));
    }

    if flag(data, "trigger_execution") {
        return Ok(GuidanceResult::new(
            "Table-maker execution started. The preview is queued automatically once execution \
             finishes; do NOT create a job. Wait on the session id until preview_complete.",
            vec![NextStep::new(
                Operation::WaitForJob,
                json!({ "job_id": session_id }),
                "Tracks the table-maker and preview phases with one progress bar.",
            )],
        ));
    }

    if status == "processing" {
        return Ok(GuidanceResult::new(
            "Conversation is still processing. Poll again in 8s.",
            vec![poll_conversation(data, "Poll every 8 seconds.")],
        ));
    }

    let action = data
        .get("next_step")
        .map(|n| text(n, "action"))
        .unwrap_or("");
    if action == "submit_preview" {
        return Ok(GuidanceResult::new(
            "Interview complete. The session holds the generated config. Create a job to preview.",
            vec![
                NextStep::new(
                    Operation::CreateJob,
                    json!({ "session_id": session_id }),
                    "The config is stored in the session; no need to pass it explicitly.",
                ),
                NextStep::new(
                    Operation::RefineConfig,
                    json!({
                        "conversation_id": conv_id,
                        "session_id": session_id,
                        "instructions": "<describe changes>",
                    }),
                    "Optional: refine the config before creating a job.",
                ),
            ],
        ));
    }

    Ok(GuidanceResult::new(
        format!("Conversation status: {}. Check next_step for instructions.", status),
        vec![poll_conversation(data, "Poll again if status is still in progress.")],
    ))
}

pub(super) fn send_conversation_reply(data: &Value) -> Result<GuidanceResult, GuidanceError> {
    Ok(GuidanceResult::new(
        "Reply sent. Poll the conversation for the AI's next message.",
        vec![poll_conversation(data, "Poll every 8s while the AI is processing.")],
    ))
}

pub(super) fn refine_config(data: &Value) -> Result<GuidanceResult, GuidanceError> {
    Ok(GuidanceResult::new(
        "Config refinement submitted. Poll the conversation for the result.",
        vec![poll_conversation(data, "Poll every 8s for the refined config response.")],
    ))
}
