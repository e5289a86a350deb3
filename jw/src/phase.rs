//! Phase classification of job snapshots
//!
//! The remote job signals its pipeline stages only indirectly: a
//! `completed` status whose step text names a generator stage means that
//! stage finished and another one is about to start. There is no structured
//! phase id, so stages are recognized by case-insensitive substring match
//! against a configurable marker list.

use tracing::debug;

use crate::domain::{JobState, JobStatus};

/// Where a job snapshot sits in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Still queued or running
    InProgress,
    /// A sub-stage finished; the overall job continues
    IntermediateComplete,
    /// No further phase transition will happen
    TrueTerminal,
}

/// Classifies job snapshots into phases
#[derive(Debug, Clone)]
pub struct PhaseClassifier {
    markers: Vec<String>,
}

impl PhaseClassifier {
    /// Create a classifier from intermediate-stage markers
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let markers: Vec<String> = markers
            .into_iter()
            .map(|m| m.as_ref().trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        debug!(?markers, "PhaseClassifier::new: called");
        Self { markers }
    }

    /// Whether step text names a known intermediate stage
    pub fn is_intermediate_step(&self, step: &str) -> bool {
        let step = step.to_lowercase();
        self.markers.iter().any(|m| step.contains(m.as_str()))
    }

    pub fn classify(&self, state: &JobState) -> Phase {
        let phase = match &state.status {
            JobStatus::PreviewComplete | JobStatus::Failed => Phase::TrueTerminal,
            JobStatus::Completed if self.is_intermediate_step(state.step()) => Phase::IntermediateComplete,
            JobStatus::Completed => Phase::TrueTerminal,
            _ => Phase::InProgress,
        };
        debug!(status = %state.status, step = %state.step(), ?phase, "PhaseClassifier::classify: called");
        phase
    }
}

impl Default for PhaseClassifier {
    fn default() -> Self {
        Self::new(crate::config::WaitConfig::default().intermediate_markers)
    }
}
