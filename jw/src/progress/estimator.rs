//! ProgressEstimator - monotonic progress across restarting job phases
//!
//! The remote job reports progress per phase on its own 0-100 scale and
//! gives no cross-phase contract. Each phase is mapped into a
//! [`ProgressRange`] of the global bar. On every intermediate phase
//! transition the current range is split: 80% of it is considered spent on
//! the finished phase and the next phase inherits the rest, up to the
//! shared ceiling. The emitted value is clamped against the last emitted
//! value, which is what keeps the bar from regressing when a phase restarts.

use tracing::{debug, info};

use crate::domain::Message;

/// Lowest native value used for scaling, so a started job never shows 0
pub const START_FLOOR: f64 = 2.0;

/// Highest value emitted while the job is not terminal
pub const PHASE_CEILING: f64 = 99.0;

/// Value emitted at true-terminal state
pub const COMPLETE: f64 = 100.0;

/// Share of the current range spent on a phase that just finished
const SPLIT_SPEND: f64 = 0.8;

/// Minimum step above the last emitted value for a new phase floor
const SPLIT_MIN_ADVANCE: f64 = 0.5;

/// Room always left between a phase floor and the ceiling
const SPLIT_HEADROOM: f64 = 1.0;

/// Window of the global bar that the current phase's 0-100 maps onto
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressRange {
    pub floor: f64,
    pub ceiling: f64,
}

impl Default for ProgressRange {
    fn default() -> Self {
        Self {
            floor: 0.0,
            ceiling: PHASE_CEILING,
        }
    }
}

impl ProgressRange {
    pub fn span(&self) -> f64 {
        self.ceiling - self.floor
    }

    /// Map a within-phase value into this range
    ///
    /// Native values are clamped to 0..=99 so a phase alone can never reach
    /// its ceiling.
    pub fn scale(&self, native: f64) -> f64 {
        let clamped = native.clamp(0.0, PHASE_CEILING);
        self.floor + (clamped / 100.0) * self.span()
    }

    /// Range for the next phase after an intermediate transition
    ///
    /// The ceiling is shared, so the last phase inherits whatever is left.
    pub fn split(&self, last_emitted: f64) -> Self {
        let spent = self.floor + self.span() * SPLIT_SPEND;
        let floor = spent
            .max(last_emitted + SPLIT_MIN_ADVANCE)
            .min(self.ceiling - SPLIT_HEADROOM);
        debug!(
            old_floor = self.floor,
            new_floor = floor,
            ceiling = self.ceiling,
            last_emitted,
            "ProgressRange::split: called"
        );
        Self {
            floor,
            ceiling: self.ceiling,
        }
    }
}

/// Progress to emit for a native value within `range`
///
/// Never lower than `last_emitted`; this clamp is the whole monotonicity
/// guarantee.
pub fn estimate(native: f64, range: ProgressRange, last_emitted: f64) -> f64 {
    range.scale(native.max(START_FLOOR)).max(last_emitted)
}

/// Latest progress value carried by any of `messages`
///
/// Scans newest first; the first payload exposing any of `keys` wins.
pub fn extract_native_progress(messages: &[Message], keys: &[String]) -> Option<f64> {
    messages.iter().rev().find_map(|m| m.progress(keys))
}

/// Per-wait progress state
///
/// Owned by exactly one wait session; never shared.
#[derive(Debug, Clone)]
pub struct ProgressEstimator {
    keys: Vec<String>,
    range: ProgressRange,
    native: f64,
    last_emitted: f64,
    last_split_step: Option<String>,
    splits: u32,
}

impl ProgressEstimator {
    /// Create an estimator reading progress from the given payload keys
    pub fn new(keys: Vec<String>) -> Self {
        debug!(?keys, "ProgressEstimator::new: called");
        Self {
            keys,
            range: ProgressRange::default(),
            native: START_FLOOR,
            last_emitted: 0.0,
            last_split_step: None,
            splits: 0,
        }
    }

    /// Update the within-phase estimate from newly visible messages
    ///
    /// Leaves the estimate untouched when no message carries progress.
    pub fn observe(&mut self, messages: &[Message]) -> Option<f64> {
        let extracted = extract_native_progress(messages, &self.keys);
        debug!(count = messages.len(), ?extracted, "ProgressEstimator::observe: called");
        if let Some(native) = extracted {
            self.native = native;
        }
        extracted
    }

    /// Compute and record the next value to emit
    pub fn emit(&mut self) -> f64 {
        let value = estimate(self.native, self.range, self.last_emitted);
        debug!(native = self.native, value, "ProgressEstimator::emit: called");
        self.last_emitted = value;
        value
    }

    /// Reallocate the range for a phase transition on `step`
    ///
    /// Happens at most once per distinct step (compared case-insensitively),
    /// so a source repeating the same stale snapshot does not squeeze the
    /// range toward the ceiling. Returns whether a split happened.
    pub fn split_on(&mut self, step: &str) -> bool {
        let key = step.to_lowercase();
        if self.last_split_step.as_deref() == Some(key.as_str()) {
            debug!(%step, "ProgressEstimator::split_on: step already split, skipping");
            return false;
        }

        self.range = self.range.split(self.last_emitted);
        self.native = START_FLOOR;
        self.last_split_step = Some(key);
        self.splits += 1;
        info!(
            %step,
            floor = self.range.floor,
            ceiling = self.range.ceiling,
            splits = self.splits,
            "Phase transition, progress range reallocated"
        );
        true
    }

    /// Record and return the terminal value
    pub fn complete(&mut self) -> f64 {
        debug!("ProgressEstimator::complete: called");
        self.last_emitted = COMPLETE;
        COMPLETE
    }

    pub fn last_emitted(&self) -> f64 {
        self.last_emitted
    }

    pub fn range(&self) -> ProgressRange {
        self.range
    }

    /// Number of range reallocations so far
    pub fn splits(&self) -> u32 {
        self.splits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn keys() -> Vec<String> {
        crate::config::WaitConfig::default().progress_keys
    }

    fn progress_msg(seq: u64, value: f64) -> Message {
        Message::new(seq, json!({ "progress": value }))
    }

    #[test]
    fn test_scale_full_range() {
        let range = ProgressRange::default();
        assert_eq!(range.scale(0.0), 0.0);
        assert!((range.scale(50.0) - 49.5).abs() < 1e-9);
        // Native 100 is clamped to 99 so a phase never reaches its ceiling
        assert!(range.scale(100.0) < PHASE_CEILING);
        assert_eq!(range.scale(-5.0), 0.0);
    }

    #[test]
    fn test_estimate_uses_start_floor() {
        let range = ProgressRange::default();
        assert!((estimate(0.0, range, 0.0) - 1.98).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_never_below_last_emitted() {
        let range = ProgressRange::default();
        assert_eq!(estimate(10.0, range, 60.0), 60.0);
    }

    #[test]
    fn test_split_spends_eighty_percent() {
        let range = ProgressRange::default().split(10.0);
        assert!((range.floor - 79.2).abs() < 1e-9);
        assert_eq!(range.ceiling, PHASE_CEILING);
    }

    #[test]
    fn test_split_stays_above_last_emitted() {
        let range = ProgressRange::default().split(85.0);
        assert!((range.floor - 85.5).abs() < 1e-9);
    }

    #[test]
    fn test_split_leaves_headroom() {
        let range = ProgressRange {
            floor: 97.5,
            ceiling: PHASE_CEILING,
        }
        .split(98.8);
        assert_eq!(range.floor, PHASE_CEILING - 1.0);
        assert!(range.floor < range.ceiling);
    }

    #[test]
    fn test_extract_prefers_newest_message() {
        let messages = vec![progress_msg(1, 10.0), progress_msg(2, 30.0), Message::new(3, json!({"text": "hi"}))];
        assert_eq!(extract_native_progress(&messages, &keys()), Some(30.0));
        assert_eq!(extract_native_progress(&[], &keys()), None);
    }

    #[test]
    fn test_observe_keeps_estimate_without_progress() {
        let mut est = ProgressEstimator::new(keys());
        est.observe(&[progress_msg(1, 40.0)]);
        assert_eq!(est.observe(&[Message::new(2, json!({"text": "working"}))]), None);
        let value = est.emit();
        assert!((value - ProgressRange::default().scale(40.0)).abs() < 1e-9);
    }

    #[test]
    fn test_oscillating_progress_is_clamped() {
        let mut est = ProgressEstimator::new(keys());
        est.observe(&[progress_msg(1, 70.0)]);
        let high = est.emit();

        // QC restarts discovery; native drops back
        est.observe(&[progress_msg(2, 15.0)]);
        assert_eq!(est.emit(), high);
    }

    #[test]
    fn test_split_is_idempotent_per_step() {
        let mut est = ProgressEstimator::new(keys());
        est.emit();

        assert!(est.split_on("Config Generation"));
        let range = est.range();
        for _ in 0..5 {
            assert!(!est.split_on("config generation"));
            est.emit();
        }
        assert_eq!(est.range(), range);
        assert_eq!(est.splits(), 1);

        assert!(est.split_on("Table Making"));
        assert_eq!(est.splits(), 2);
    }

    #[test]
    fn test_split_resets_native_but_not_bar() {
        let mut est = ProgressEstimator::new(keys());
        est.observe(&[progress_msg(1, 90.0)]);
        let before = est.emit();

        est.split_on("Table Making");
        let after = est.emit();
        assert!(after > before);
        assert!(after < PHASE_CEILING);
    }

    #[test]
    fn test_complete_is_exactly_100() {
        let mut est = ProgressEstimator::new(keys());
        est.split_on("Config Generation");
        est.split_on("Claim Extraction");
        assert_eq!(est.complete(), COMPLETE);
        assert_eq!(est.last_emitted(), COMPLETE);
    }

    #[derive(Debug, Clone)]
    enum Event {
        Native(f64),
        Split(u8),
        Emit,
    }

    fn event() -> impl Strategy<Value = Event> {
        prop_oneof![
            (-20.0f64..150.0).prop_map(Event::Native),
            (0u8..3).prop_map(Event::Split),
            Just(Event::Emit),
        ]
    }

    proptest! {
        #[test]
        fn prop_emitted_progress_never_decreases(events in prop::collection::vec(event(), 1..200)) {
            let mut est = ProgressEstimator::new(keys());
            let mut last = 0.0f64;
            let mut seq = 0u64;

            for ev in events {
                match ev {
                    Event::Native(v) => {
                        seq += 1;
                        est.observe(&[progress_msg(seq, v)]);
                    }
                    Event::Split(step) => {
                        est.split_on(&format!("stage {}", step));
                    }
                    Event::Emit => {}
                }
                let value = est.emit();
                prop_assert!(value >= last, "regressed from {} to {}", last, value);
                prop_assert!(value < COMPLETE);
                let range = est.range();
                prop_assert!(range.floor < range.ceiling);
                last = value;
            }

            prop_assert_eq!(est.complete(), COMPLETE);
        }
    }
}
