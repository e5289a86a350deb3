//! ConversationWaiter - blocks until the AI finishes its conversation turn

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use super::{WaitOutcome, deadline_after};
use crate::config::ConversationConfig;
use crate::domain::ConversationState;
use crate::guidance::{Operation, recommend};
use crate::progress::{COMPLETE, ProgressSink, report_best_effort, synthetic_progress};
use crate::source::ConversationSource;

/// Timing for one conversation wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversationWaitOptions {
    /// Typical duration of one AI turn; shapes the synthetic progress curve
    pub expected: Duration,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl From<&ConversationConfig> for ConversationWaitOptions {
    fn from(config: &ConversationConfig) -> Self {
        Self {
            expected: Duration::from_secs(config.expected_secs),
            timeout: Duration::from_secs(config.timeout_secs),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
        }
    }
}

/// Waits for an AI conversation turn to finish
///
/// Conversations report no progress of their own, so the bar follows
/// elapsed time instead.
pub struct ConversationWaiter {
    source: Arc<dyn ConversationSource>,
    sink: Arc<dyn ProgressSink>,
    options: ConversationWaitOptions,
}

impl ConversationWaiter {
    pub fn new(
        source: Arc<dyn ConversationSource>,
        sink: Arc<dyn ProgressSink>,
        options: ConversationWaitOptions,
    ) -> Self {
        Self { source, sink, options }
    }

    pub async fn wait(&self, conversation_id: &str, session_id: &str) -> WaitOutcome<ConversationState> {
        info!(%conversation_id, %session_id, expected = ?self.options.expected, "Waiting for conversation turn");

        let start = Instant::now();
        let deadline = deadline_after(start, self.options.timeout);
        let mut last_emitted = 0.0_f64;
        let mut last_state: Option<ConversationState> = None;

        loop {
            let candidate = synthetic_progress(start.elapsed(), self.options.expected);
            last_emitted = candidate.max(last_emitted);
            report_best_effort(self.sink.as_ref(), last_emitted);

            match self.source.get_conversation(conversation_id, session_id).await {
                Ok(mut state) => {
                    state.fill_ids(conversation_id, session_id);
                    if state.turn_finished() {
                        report_best_effort(self.sink.as_ref(), COMPLETE);
                        info!(%conversation_id, status = %state.status, "Conversation turn finished");
                        return WaitOutcome {
                            guidance: recommend(Operation::GetConversation, &state.to_value()),
                            state,
                            timed_out: false,
                            timeout_note: None,
                            progress: COMPLETE,
                            transitions: 0,
                        };
                    }
                    last_state = Some(state);
                }
                Err(e) => {
                    warn!(%conversation_id, error = %e, transient = e.is_transient(), "Conversation fetch failed, polling again");
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                let state = last_state.unwrap_or_else(|| ConversationState::unknown(conversation_id, session_id));
                warn!(%conversation_id, status = %state.status, "Conversation wait timed out");
                return WaitOutcome {
                    guidance: recommend(Operation::GetConversation, &state.to_value()),
                    state,
                    timed_out: true,
                    timeout_note: Some(format!(
                        "wait_for_conversation timed out after {}s. The AI has not responded yet. \
                         Call wait_for_conversation again or poll get_conversation manually.",
                        self.options.timeout.as_secs()
                    )),
                    progress: last_emitted,
                    transitions: 0,
                };
            }

            debug!(?remaining, last_emitted, "wait: conversation still processing, sleeping");
            sleep(self.options.poll_interval.min(remaining)).await;
        }
    }
}
