//! Guidance engine
//!
//! Maps an operation and the response it last produced to a recommendation:
//! a one-sentence summary plus an ordered list of follow-up calls. Pure and
//! total: [`recommend`] never fails, and faults inside a rule surface as a
//! degraded result with empty next steps.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub(crate) use crate::domain::truthy;

mod account;
mod conversations;
mod jobs;
mod uploads;
mod validation;

/// Every operation guidance knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    UploadFile,
    ConfirmUpload,
    CreateJob,
    GetJobStatus,
    GetJobMessages,
    WaitForJob,
    ApproveValidation,
    GetResults,
    GetReferenceResults,
    UpdateTable,
    ReferenceCheck,
    StartTableMaker,
    StartUploadInterview,
    GetConversation,
    WaitForConversation,
    SendConversationReply,
    RefineConfig,
    GetBalance,
    GetUsage,
}

impl Operation {
    pub const ALL: [Operation; 19] = [
        Operation::UploadFile,
        Operation::ConfirmUpload,
        Operation::CreateJob,
        Operation::GetJobStatus,
        Operation::GetJobMessages,
        Operation::WaitForJob,
        Operation::ApproveValidation,
        Operation::GetResults,
        Operation::GetReferenceResults,
        Operation::UpdateTable,
        Operation::ReferenceCheck,
        Operation::StartTableMaker,
        Operation::StartUploadInterview,
        Operation::GetConversation,
        Operation::WaitForConversation,
        Operation::SendConversationReply,
        Operation::RefineConfig,
        Operation::GetBalance,
        Operation::GetUsage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UploadFile => "upload_file",
            Self::ConfirmUpload => "confirm_upload",
            Self::CreateJob => "create_job",
            Self::GetJobStatus => "get_job_status",
            Self::GetJobMessages => "get_job_messages",
            Self::WaitForJob => "wait_for_job",
            Self::ApproveValidation => "approve_validation",
            Self::GetResults => "get_results",
            Self::GetReferenceResults => "get_reference_results",
            Self::UpdateTable => "update_table",
            Self::ReferenceCheck => "reference_check",
            Self::StartTableMaker => "start_table_maker",
            Self::StartUploadInterview => "start_upload_interview",
            Self::GetConversation => "get_conversation",
            Self::WaitForConversation => "wait_for_conversation",
            Self::SendConversationReply => "send_conversation_reply",
            Self::RefineConfig => "refine_config",
            Self::GetBalance => "get_balance",
            Self::GetUsage => "get_usage",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unrecognized operation name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown operation '{0}'")]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == wanted)
            .ok_or_else(|| UnknownOperation(s.to_string()))
    }
}

/// One recommended follow-up call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextStep {
    pub operation: Operation,
    pub parameters: Value,
    pub note: String,
}

impl NextStep {
    pub fn new(operation: Operation, parameters: Value, note: impl Into<String>) -> Self {
        Self {
            operation,
            parameters,
            note: note.into(),
        }
    }
}

/// Structured recommendation for what to call next
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuidanceResult {
    pub summary: String,

    pub next_steps: Vec<NextStep>,

    /// Longer reading instructions, for results-style responses
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,

    /// Named links worth surfacing to a human
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub key_urls: BTreeMap<String, String>,
}

impl GuidanceResult {
    pub fn new(summary: impl Into<String>, next_steps: Vec<NextStep>) -> Self {
        Self {
            summary: summary.into(),
            next_steps,
            ..Default::default()
        }
    }

    /// Terminal recommendation with nothing left to call
    pub fn done(summary: impl Into<String>) -> Self {
        Self::new(summary, Vec::new())
    }

    /// Operations in next-step order
    pub fn operations(&self) -> Vec<Operation> {
        self.next_steps.iter().map(|s| s.operation).collect()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            debug!(error = %e, "GuidanceResult::to_value: serialization failed");
            Value::Null
        })
    }
}

/// Faults inside a guidance rule
#[derive(Debug, Error)]
pub enum GuidanceError {
    #[error("response payload is not a JSON object")]
    PayloadNotObject,

    #[error("field '{field}' should be {expected}")]
    Field { field: String, expected: &'static str },

    #[error("rule panicked: {0}")]
    Panicked(String),
}

type Rule = fn(&Value) -> Result<GuidanceResult, GuidanceError>;

/// Rule for an operation
///
/// Exhaustive: adding an operation without a rule does not compile.
fn rule_for(operation: Operation) -> Rule {
    match operation {
        Operation::UploadFile => uploads::upload_file,
        Operation::ConfirmUpload => uploads::confirm_upload,
        Operation::CreateJob => jobs::create_job,
        Operation::GetJobStatus | Operation::WaitForJob => jobs::get_job_status,
        Operation::GetJobMessages => jobs::get_job_messages,
        Operation::UpdateTable => jobs::update_table,
        Operation::ReferenceCheck => jobs::reference_check,
        Operation::ApproveValidation => validation::approve_validation,
        Operation::GetResults => validation::get_results,
        Operation::GetReferenceResults => validation::get_reference_results,
        Operation::StartTableMaker => conversations::start_table_maker,
        Operation::StartUploadInterview => conversations::start_upload_interview,
        Operation::GetConversation | Operation::WaitForConversation => conversations::get_conversation,
        Operation::SendConversationReply => conversations::send_conversation_reply,
        Operation::RefineConfig => conversations::refine_config,
        Operation::GetBalance => account::get_balance,
        Operation::GetUsage => account::get_usage,
    }
}

/// Recommend what to do after `operation` returned `response`
pub fn recommend(operation: Operation, response: &Value) -> GuidanceResult {
    debug!(%operation, "recommend: called");
    match try_recommend(operation, response) {
        Ok(result) => result,
        Err(e) => {
            warn!(%operation, error = %e, "Guidance rule failed, returning degraded guidance");
            GuidanceResult::done(format!("Guidance error: {}", e))
        }
    }
}

/// Recommend by operation name; unknown names get an empty recommendation
pub fn recommend_named(name: &str, response: &Value) -> GuidanceResult {
    match name.parse::<Operation>() {
        Ok(operation) => recommend(operation, response),
        Err(_) => {
            debug!(%name, "recommend_named: unknown operation");
            GuidanceResult::done(format!("No guidance defined for operation '{}'.", name))
        }
    }
}

fn try_recommend(operation: Operation, response: &Value) -> Result<GuidanceResult, GuidanceError> {
    if !response.is_object() {
        return Err(GuidanceError::PayloadNotObject);
    }
    let rule = rule_for(operation);
    panic::catch_unwind(AssertUnwindSafe(|| rule(response))).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(GuidanceError::Panicked(message))
    })
}

// Field helpers shared by the rule modules

/// String field or ""
pub(crate) fn text<'a>(data: &'a Value, key: &str) -> &'a str {
    data.get(key).and_then(Value::as_str).unwrap_or("")
}

/// First non-empty string among `keys`, or ""
pub(crate) fn first_text<'a>(data: &'a Value, keys: &[&str]) -> &'a str {
    keys.iter().map(|k| text(data, k)).find(|s| !s.is_empty()).unwrap_or("")
}

/// Flag field, read by truthiness so `1` or `"yes"` count as set
pub(crate) fn flag(data: &Value, key: &str) -> bool {
    truthy(data.get(key))
}

/// First truthy value among `keys`
pub(crate) fn first_truthy<'a>(data: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().map(|k| data.get(*k)).find(|v| truthy(*v)).flatten()
}

/// Render a JSON scalar the way it reads in a sentence
pub(crate) fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "unknown".to_string(),
        other => other.to_string(),
    }
}

/// Array field; a present non-array is a rule fault
pub(crate) fn array<'a>(data: &'a Value, key: &str) -> Result<&'a [Value], GuidanceError> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(GuidanceError::Field {
            field: key.to_string(),
            expected: "an array",
        }),
    }
}
