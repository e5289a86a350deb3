//! JobState domain type
//!
//! A full status snapshot of one remote job, re-fetched every poll cycle.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::{first_present, number_from_value, text_from_value};

/// Status tag reported by the remote job source
///
/// Unknown tags are kept verbatim in `Other` so nothing the backend adds is lost.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Queued,
    Processing,
    /// Preview rows are ready; the job waits for approval
    PreviewComplete,
    /// Either a whole job or one pipeline stage finished (see `current_step`)
    Completed,
    Failed,
    /// Placeholder used when no snapshot was ever fetched
    #[default]
    Unknown,
    Other(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::PreviewComplete => "preview_complete",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
            Self::Other(s) => s,
        }
    }

    /// Whether the job is still waiting or running
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::Processing)
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "queued" => Self::Queued,
            "processing" => Self::Processing,
            "preview_complete" => Self::PreviewComplete,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "unknown" => Self::Unknown,
            _ => {
                debug!(status = %s, "JobStatus::from: unrecognized status tag");
                Self::Other(s)
            }
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of a remote job as returned by the status query
///
/// Fields the orchestrator does not interpret (cost estimates, result
/// locations, session ids) are kept in `extra` and survive a round trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawJobState")]
pub struct JobState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,

    pub status: JobStatus,

    /// Free-text description of the pipeline stage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,

    /// Native progress percentage, when the backend reports one on the snapshot
    #[serde(rename = "progress", skip_serializing_if = "Option::is_none")]
    pub native_progress: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Wire shape of a status snapshot
///
/// Backends send `job_id` or `id`, `current_step` or `step`, sometimes both
/// with the primary one null. Every field is read raw and resolved first-truthy.
#[derive(Deserialize)]
struct RawJobState {
    #[serde(default)]
    job_id: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    current_step: Option<Value>,
    #[serde(default)]
    step: Option<Value>,
    #[serde(default)]
    progress: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<RawJobState> for JobState {
    fn from(raw: RawJobState) -> Self {
        let status = raw
            .status
            .and_then(text_from_value)
            .map(JobStatus::from)
            .unwrap_or_default();
        Self {
            job_id: first_present([raw.job_id, raw.id]).and_then(text_from_value),
            status,
            current_step: first_present([raw.current_step, raw.step]).and_then(text_from_value),
            native_progress: raw.progress.as_ref().and_then(number_from_value),
            error: raw.error.and_then(error_text),
            extra: raw.extra,
        }
    }
}

/// Any JSON for an error field; non-strings are rendered as JSON text
fn error_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

impl JobState {
    /// Placeholder snapshot for a job that was never fetched successfully
    pub fn unknown(job_id: impl Into<String>) -> Self {
        Self {
            job_id: Some(job_id.into()),
            status: JobStatus::Unknown,
            ..Default::default()
        }
    }

    pub fn new(job_id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            job_id: Some(job_id.into()),
            status,
            ..Default::default()
        }
    }

    /// Builder-style step text
    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.current_step = Some(step.into());
        self
    }

    /// Step text or empty string
    pub fn step(&self) -> &str {
        self.current_step.as_deref().unwrap_or("")
    }

    /// Convert back into the raw JSON shape for guidance and output
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            debug!(error = %e, "JobState::to_value: serialization failed");
            Value::Object(Map::new())
        })
    }
}
