//! Wait orchestration
//!
//! Blocks on a remote job (or conversation turn) until it reaches a state the
//! caller must act on, emitting progress along the way. A wait never fails:
//! fetch errors are retried on the next cycle and running out of time yields
//! a timed-out outcome carrying the last state seen.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::config::WaitConfig;
use crate::domain::JobState;
use crate::guidance::{GuidanceResult, Operation, recommend};
use crate::output;
use crate::phase::{Phase, PhaseClassifier};
use crate::progress::{COMPLETE, CursorTracker, ProgressEstimator, ProgressSink, report_best_effort};
use crate::source::JobSource;

mod conversation;

pub use conversation::{ConversationWaitOptions, ConversationWaiter};

/// Timing for one wait call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl From<&WaitConfig> for WaitOptions {
    fn from(config: &WaitConfig) -> Self {
        Self {
            timeout: config.timeout(),
            poll_interval: config.poll_interval(),
        }
    }
}

/// Where a wait session is after its latest poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    Polling,
    IntermediateTransition,
    Terminal,
    TimedOut,
}

/// Result of a wait call
#[derive(Debug, Clone)]
pub struct WaitOutcome<T> {
    /// Terminal snapshot, or the last one seen when the wait timed out
    pub state: T,

    pub guidance: GuidanceResult,

    pub timed_out: bool,

    /// Human-readable explanation when `timed_out` is set
    pub timeout_note: Option<String>,

    /// Last progress value emitted
    pub progress: f64,

    /// Progress range reallocations performed
    pub transitions: u32,
}

impl<T: Serialize> WaitOutcome<T> {
    /// Snapshot JSON annotated with `_guidance` and, on timeout, `_wait_timeout`
    pub fn to_value(&self) -> Value {
        let state = serde_json::to_value(&self.state).unwrap_or_else(|e| {
            debug!(error = %e, "WaitOutcome::to_value: serialization failed");
            Value::Null
        });
        output::annotate(state, &self.guidance, self.timeout_note.as_deref())
    }
}

/// Per-call state of one job wait
///
/// Created fresh for every call; cursor and progress range never outlive it.
struct WaitSession {
    job_id: String,
    cursor: CursorTracker,
    estimator: ProgressEstimator,
    last_state: Option<JobState>,
    state: WaitState,
    deadline: Instant,
}

/// Waits for a remote job to reach a true-terminal state
pub struct JobWaiter {
    source: Arc<dyn JobSource>,
    sink: Arc<dyn ProgressSink>,
    classifier: PhaseClassifier,
    progress_keys: Vec<String>,
    options: WaitOptions,
}

impl JobWaiter {
    pub fn new(source: Arc<dyn JobSource>, sink: Arc<dyn ProgressSink>, config: &WaitConfig) -> Self {
        debug!(?config, "JobWaiter::new: called");
        Self {
            source,
            sink,
            classifier: PhaseClassifier::new(&config.intermediate_markers),
            progress_keys: config.progress_keys.clone(),
            options: WaitOptions::from(config),
        }
    }

    /// Override timeout and poll interval
    pub fn with_options(mut self, options: WaitOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> WaitOptions {
        self.options
    }

    /// Poll until the job is true-terminal or the timeout passes
    pub async fn wait(&self, job_id: &str) -> WaitOutcome<JobState> {
        info!(%job_id, timeout = ?self.options.timeout, poll = ?self.options.poll_interval, "Waiting for job");

        let mut session = WaitSession {
            job_id: job_id.to_string(),
            cursor: CursorTracker::new(),
            estimator: ProgressEstimator::new(self.progress_keys.clone()),
            last_state: None,
            state: WaitState::Polling,
            deadline: deadline_after(Instant::now(), self.options.timeout),
        };

        loop {
            // 1. Messages drive the within-phase estimate
            self.poll_messages(&mut session).await;

            // 2. Emit; the estimator never goes below what it already emitted
            let progress = session.estimator.emit();
            report_best_effort(self.sink.as_ref(), progress);

            // 3. Status is authoritative for phase transitions
            session.state = self.poll_status(&mut session).await;
            if session.state == WaitState::Terminal {
                return self.finish(session);
            }

            // 4. Deadline is only checked between cycles, never mid-fetch
            let remaining = session.deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                session.state = WaitState::TimedOut;
                return self.timed_out(session);
            }

            debug!(?remaining, state = ?session.state, "wait: cycle done, sleeping");
            sleep(self.options.poll_interval.min(remaining)).await;
        }
    }

    async fn poll_messages(&self, session: &mut WaitSession) {
        match self.source.get_messages(&session.job_id, session.cursor.since()).await {
            Ok(batch) => {
                let visible = session.cursor.advance(batch);
                session.estimator.observe(&visible);
            }
            Err(e) => {
                warn!(job_id = %session.job_id, error = %e, transient = e.is_transient(), "Message fetch failed, keeping last estimate");
            }
        }
    }

    async fn poll_status(&self, session: &mut WaitSession) -> WaitState {
        let state = match self.source.get_status(&session.job_id).await {
            Ok(state) => state,
            Err(e) => {
                warn!(job_id = %session.job_id, error = %e, transient = e.is_transient(), "Status fetch failed, polling again");
                return WaitState::Polling;
            }
        };

        let next = match self.classifier.classify(&state) {
            Phase::TrueTerminal => WaitState::Terminal,
            Phase::IntermediateComplete => {
                session.estimator.split_on(state.step());
                WaitState::IntermediateTransition
            }
            Phase::InProgress => WaitState::Polling,
        };
        session.last_state = Some(state);
        next
    }

    fn finish(&self, mut session: WaitSession) -> WaitOutcome<JobState> {
        let progress = session.estimator.complete();
        report_best_effort(self.sink.as_ref(), progress);

        let state = session
            .last_state
            .take()
            .unwrap_or_else(|| JobState::unknown(session.job_id.as_str()));
        info!(job_id = %session.job_id, status = %state.status, transitions = session.estimator.splits(), "Job reached terminal state");

        WaitOutcome {
            guidance: recommend(Operation::GetJobStatus, &state.to_value()),
            state,
            timed_out: false,
            timeout_note: None,
            progress,
            transitions: session.estimator.splits(),
        }
    }

    fn timed_out(&self, mut session: WaitSession) -> WaitOutcome<JobState> {
        let state = session
            .last_state
            .take()
            .unwrap_or_else(|| JobState::unknown(session.job_id.as_str()));
        let note = format!(
            "wait_for_job timed out after {}s. Job has not reached a terminal state. \
             Call wait_for_job again or poll get_job_status manually.",
            self.options.timeout.as_secs()
        );
        warn!(job_id = %session.job_id, status = %state.status, "Wait timed out");

        WaitOutcome {
            guidance: recommend(Operation::GetJobStatus, &state.to_value()),
            state,
            timed_out: true,
            timeout_note: Some(note),
            progress: session.estimator.last_emitted(),
            transitions: session.estimator.splits(),
        }
    }
}

/// About a century; stands in for deadlines too far out to represent
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// `start + timeout`, saturating instead of panicking on huge timeouts
pub(crate) fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout)
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}
