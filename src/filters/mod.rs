//! Signal filtering primitives used by the cursor pipeline.
//!
//! The cursor filter composes these: an exponential smoother for the main
//! cursor and the lagging path cursor, a min/max envelope for normalizing
//! raw tracker coordinates, and a time-windowed rolling average.

/// Exponential smoothing with snap-on-first-sample semantics
pub mod exponential;

/// Time-windowed rolling average
pub mod rolling_average;

/// Running min/max envelope normalizer
pub mod envelope;

use crate::constants::{
    MAX_PATH_CURSOR_LEVEL, MAX_SMOOTHING_LEVEL, MIN_SMOOTHING_FACTOR, PATH_CURSOR_MAX_FRACTION,
    PATH_CURSOR_MIN_FRACTION, SMOOTHING_EXP_BASE,
};

/// Trait for two-axis signal filters
pub trait SignalFilter: Send + Sync {
    /// Apply filter to input values
    fn apply(&mut self, x: f64, y: f64) -> (f64, f64);

    /// Reset filter state
    fn reset(&mut self);

    /// Get filter name
    fn name(&self) -> &str;
}

/// Map an integer smoothing level onto a per-tick smoothing factor.
///
/// Level 0 is pass-through (`1.0`); level 19 reaches [`MIN_SMOOTHING_FACTOR`].
/// The linear curve spaces levels evenly, the exponential curve uses base
/// 1.6 so the low levels stay responsive and the high levels spread out.
/// Levels above the maximum are clamped.
pub fn smoothing_factor(level: u32, exponential: bool) -> f64 {
    let level = level.min(MAX_SMOOTHING_LEVEL);
    let max = f64::from(MAX_SMOOTHING_LEVEL);
    let span = 1.0 - MIN_SMOOTHING_FACTOR;
    if exponential {
        let numerator = SMOOTHING_EXP_BASE.powf(f64::from(MAX_SMOOTHING_LEVEL - level)) - 1.0;
        let denominator = SMOOTHING_EXP_BASE.powf(max) - 1.0;
        MIN_SMOOTHING_FACTOR + span * numerator / denominator
    } else {
        1.0 - span * f64::from(level) / max
    }
}

/// Map a path cursor level onto the fraction of the gap it closes per tick.
///
/// Linear from `min_fraction` at level 0 to 0.25 at level 24.
pub fn path_cursor_fraction(level: u32, min_fraction: f64) -> f64 {
    let level = level.min(MAX_PATH_CURSOR_LEVEL);
    let min = if min_fraction.is_finite() {
        min_fraction.clamp(PATH_CURSOR_MIN_FRACTION, PATH_CURSOR_MAX_FRACTION)
    } else {
        PATH_CURSOR_MIN_FRACTION
    };
    min + (PATH_CURSOR_MAX_FRACTION - min) * f64::from(level) / f64::from(MAX_PATH_CURSOR_LEVEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoothing_factor_endpoints() {
        for exponential in [false, true] {
            assert!((smoothing_factor(0, exponential) - 1.0).abs() < 1e-12);
            assert!((smoothing_factor(19, exponential) - MIN_SMOOTHING_FACTOR).abs() < 1e-12);
            assert!((smoothing_factor(40, exponential) - MIN_SMOOTHING_FACTOR).abs() < 1e-12);
        }
    }

    #[test]
    fn test_smoothing_factor_monotonic() {
        for exponential in [false, true] {
            for level in 0..19 {
                assert!(smoothing_factor(level, exponential) > smoothing_factor(level + 1, exponential));
            }
        }
    }

    #[test]
    fn test_exponential_curve_drops_early() {
        assert!(smoothing_factor(5, true) < smoothing_factor(5, false));
        assert!(smoothing_factor(1, true) > 0.6);
    }

    #[test]
    fn test_path_cursor_fraction() {
        assert!((path_cursor_fraction(0, 0.01) - 0.01).abs() < 1e-12);
        assert!((path_cursor_fraction(24, 0.01) - 0.25).abs() < 1e-12);
        assert!((path_cursor_fraction(12, 0.01) - 0.13).abs() < 1e-12);
        // Out-of-range minimum is clamped
        assert!((path_cursor_fraction(0, 0.0) - 0.01).abs() < 1e-12);
        assert!((path_cursor_fraction(0, f64::NAN) - 0.01).abs() < 1e-12);
    }
}
