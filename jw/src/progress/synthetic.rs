//! Time-based progress for work with no native progress signal

use std::time::Duration;

use super::estimator::START_FLOOR;

/// Value reached at exactly the expected duration
const EXPECTED_MARK: f64 = 90.0;

/// Ceiling for synthetic progress past the expected duration
const OVERTIME_CEILING: f64 = 98.0;

/// Percentage points added per extra minute past the expected duration
const OVERTIME_PER_MINUTE: f64 = 2.0;

/// Synthetic percentage for `elapsed` out of a typical `expected` duration
///
/// Climbs on a square-root curve to 90 at `expected`, then crawls toward 98.
pub fn synthetic_progress(elapsed: Duration, expected: Duration) -> f64 {
    let elapsed = elapsed.as_secs_f64();
    let expected = expected.as_secs_f64();

    if elapsed <= 0.0 {
        return START_FLOOR;
    }
    if elapsed < expected {
        return (EXPECTED_MARK * (elapsed / expected).sqrt()).min(EXPECTED_MARK);
    }
    let extra_minutes = (elapsed - expected) / 60.0;
    (EXPECTED_MARK + extra_minutes * OVERTIME_PER_MINUTE).min(OVERTIME_CEILING)
}
