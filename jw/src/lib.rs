//! jobwatch - monotonic progress tracking for multi-phase remote jobs
//!
//! A remote job runs as a pipeline of phases (table generation, preview,
//! full validation) that each report progress on their own 0-100 scale and
//! restart from zero. jobwatch polls the job, folds those per-phase signals
//! into one progress bar that never goes backwards, and tells the caller
//! which call to make next.
//!
//! # Core Concepts
//!
//! - **Monotonic progress**: emitted values never decrease; exactly 100 only at true-terminal
//! - **Lazy phase split**: a finished phase spends 80% of the remaining range, the next inherits the rest
//! - **Cursor priming**: history that predates a wait is never shown as progress
//! - **Total guidance**: recommendations never fail, they degrade
//!
//! # Modules
//!
//! - [`source`] - Remote job source trait and HTTP implementation
//! - [`progress`] - Cursor tracking, progress estimation, progress sinks
//! - [`phase`] - Phase classification of job snapshots
//! - [`guidance`] - Next-step recommendations per operation
//! - [`wait`] - Job and conversation wait orchestration
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod guidance;
pub mod output;
pub mod phase;
pub mod progress;
pub mod source;
pub mod wait;

// Re-export commonly used types
pub use config::{ApiConfig, Config, ConversationConfig, WaitConfig};
pub use domain::{ConversationState, JobState, JobStatus, Message, MessageBatch};
pub use guidance::{GuidanceResult, NextStep, Operation, recommend, recommend_named};
pub use phase::{Phase, PhaseClassifier};
pub use progress::{
    ChannelSink, CursorTracker, NoopSink, ProgressEstimator, ProgressRange, ProgressSink, ProgressUpdate,
    TerminalSink,
};
pub use source::{ConversationSource, HttpSource, JobSource, SourceError};
pub use wait::{ConversationWaitOptions, ConversationWaiter, JobWaiter, WaitOptions, WaitOutcome, WaitState};
