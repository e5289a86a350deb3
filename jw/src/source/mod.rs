//! Remote job source
//!
//! The collaborator that owns the remote job. jobwatch only ever reads from
//! it: a full status snapshot and an incremental message feed per job, plus a
//! conversation snapshot for AI conversation turns.

use async_trait::async_trait;

mod error;
mod http;

pub use error::SourceError;
pub use http::{HttpSource, resolve_base_url};

use crate::domain::{ConversationState, JobState, MessageBatch};

/// Read-only view of a remote job
///
/// Implementations must be cheap to call repeatedly; the wait orchestrator
/// queries both operations once per poll cycle.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Full status snapshot of a job
    async fn get_status(&self, job_id: &str) -> Result<JobState, SourceError>;

    /// Messages after `since`, or the whole feed when `since` is `None`
    async fn get_messages(&self, job_id: &str, since: Option<u64>) -> Result<MessageBatch, SourceError>;
}

/// Read-only view of an AI conversation
#[async_trait]
pub trait ConversationSource: Send + Sync {
    async fn get_conversation(&self, conversation_id: &str, session_id: &str)
    -> Result<ConversationState, SourceError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::debug;

    /// Scripted source for unit tests
    ///
    /// Each call pops the next scripted response. An exhausted status script
    /// answers with an error so the caller keeps polling; an exhausted message
    /// script answers with an empty batch.
    #[derive(Default)]
    pub struct ScriptedSource {
        statuses: Mutex<VecDeque<Result<JobState, SourceError>>>,
        batches: Mutex<VecDeque<Result<MessageBatch, SourceError>>>,
        conversations: Mutex<VecDeque<Result<ConversationState, SourceError>>>,
        since_log: Mutex<Vec<Option<u64>>>,
        status_calls: AtomicUsize,
    }

    impl ScriptedSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_statuses(self, statuses: Vec<Result<JobState, SourceError>>) -> Self {
            debug!(count = statuses.len(), "ScriptedSource::with_statuses: called");
            *self.statuses.lock().unwrap() = statuses.into();
            self
        }

        pub fn with_batches(self, batches: Vec<Result<MessageBatch, SourceError>>) -> Self {
            debug!(count = batches.len(), "ScriptedSource::with_batches: called");
            *self.batches.lock().unwrap() = batches.into();
            self
        }

        pub fn with_conversations(self, turns: Vec<Result<ConversationState, SourceError>>) -> Self {
            *self.conversations.lock().unwrap() = turns.into();
            self
        }

        /// `since` argument of every message query, in call order
        pub fn since_log(&self) -> Vec<Option<u64>> {
            self.since_log.lock().unwrap().clone()
        }

        pub fn status_calls(&self) -> usize {
            self.status_calls.load(Ordering::SeqCst)
        }
    }

    fn exhausted() -> SourceError {
        SourceError::InvalidResponse("script exhausted".to_string())
    }

    #[async_trait]
    impl JobSource for ScriptedSource {
        async fn get_status(&self, _job_id: &str) -> Result<JobState, SourceError> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            self.statuses.lock().unwrap().pop_front().unwrap_or_else(|| Err(exhausted()))
        }

        async fn get_messages(&self, _job_id: &str, since: Option<u64>) -> Result<MessageBatch, SourceError> {
            self.since_log.lock().unwrap().push(since);
            self.batches
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(MessageBatch::default()))
        }
    }

    #[async_trait]
    impl ConversationSource for ScriptedSource {
        async fn get_conversation(
            &self,
            _conversation_id: &str,
            _session_id: &str,
        ) -> Result<ConversationState, SourceError> {
            self.conversations
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(exhausted()))
        }
    }
}
