//! Progress side-channel
//!
//! Progress is advisory telemetry, not part of a wait's result. Sinks may
//! fail; callers go through [`report_best_effort`], which logs the failure
//! and carries on.

use std::io::Write;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One progress notification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    pub current: f64,
    pub total: f64,
}

impl ProgressUpdate {
    /// Percentage update out of 100
    pub fn percent(current: f64) -> Self {
        Self { current, total: 100.0 }
    }
}

/// Errors a progress sink may report
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("progress receiver dropped")]
    ChannelClosed,

    #[error("progress output failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Receiver of progress notifications
pub trait ProgressSink: Send + Sync {
    fn report(&self, update: ProgressUpdate) -> Result<(), ReportError>;
}

/// Deliver an update, logging and swallowing any sink failure
pub fn report_best_effort(sink: &dyn ProgressSink, current: f64) {
    if let Err(e) = sink.report(ProgressUpdate::percent(current)) {
        warn!(error = %e, current, "Progress report failed, continuing");
    }
}

/// Sink that drops every update
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn report(&self, _update: ProgressUpdate) -> Result<(), ReportError> {
        Ok(())
    }
}

/// Sink forwarding updates over a tokio channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressUpdate>,
}

impl ChannelSink {
    /// Create a sink and the receiver that observes it
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn report(&self, update: ProgressUpdate) -> Result<(), ReportError> {
        self.tx.send(update).map_err(|_| ReportError::ChannelClosed)
    }
}

/// Width of the terminal progress bar in cells
const BAR_WIDTH: usize = 30;

/// Sink drawing a single-line bar on stderr
#[derive(Debug, Clone)]
pub struct TerminalSink {
    label: String,
}

impl TerminalSink {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }

    fn render(&self, update: ProgressUpdate) -> String {
        let ratio = if update.total > 0.0 {
            (update.current / update.total).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let filled = (ratio * BAR_WIDTH as f64).round() as usize;
        format!(
            "\r{} [{}{}] {:5.1}%",
            self.label,
            "#".repeat(filled),
            ".".repeat(BAR_WIDTH - filled),
            ratio * 100.0
        )
    }
}

impl ProgressSink for TerminalSink {
    fn report(&self, update: ProgressUpdate) -> Result<(), ReportError> {
        debug!(?update, "TerminalSink::report: called");
        let mut stderr = std::io::stderr().lock();
        stderr.write_all(self.render(update).as_bytes())?;
        if update.current >= update.total {
            stderr.write_all(b"\n")?;
        }
        stderr.flush()?;
        Ok(())
    }
}
