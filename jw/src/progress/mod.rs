//! Progress tracking for a single wait
//!
//! - [`CursorTracker`] decides which feed messages are new to this wait
//! - [`ProgressEstimator`] turns native per-phase progress into one
//!   non-decreasing percentage
//! - [`synthetic_progress`] covers work that reports no progress at all
//! - [`ProgressSink`] is the best-effort side-channel progress goes out on

mod cursor;
mod estimator;
mod sink;
mod synthetic;

pub use cursor::CursorTracker;
pub use estimator::{
    COMPLETE, PHASE_CEILING, ProgressEstimator, ProgressRange, START_FLOOR, estimate, extract_native_progress,
};
pub use sink::{ChannelSink, NoopSink, ProgressSink, ProgressUpdate, ReportError, TerminalSink, report_best_effort};
pub use synthetic::synthetic_progress;
