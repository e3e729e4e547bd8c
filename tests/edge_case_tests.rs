//! Edge case tests for filters, normalization and other components

use std::time::{Duration, Instant};

use head_pointer::{
    filters::{
        envelope::RangeEnvelope, exponential::ExponentialFilter, path_cursor_fraction,
        rolling_average::RollingAverage, smoothing_factor, SignalFilter,
    },
    geometry::{Point, Rect},
    utils::{to_pixel, to_stream_point},
};

#[test]
fn test_filter_extreme_values() {
    let extreme_values = [
        (f64::INFINITY, f64::NEG_INFINITY),
        (f64::NAN, f64::NAN),
        (f64::MAX, f64::MIN),
        (1e100, -1e100),
        (0.0, 0.0),
    ];
    let start = Instant::now();
    let mut exponential = ExponentialFilter::new(0.5);
    let mut rolling = RollingAverage::new(Duration::from_millis(300));

    for (x, y) in extreme_values {
        // Only checks that nothing panics
        let _ = exponential.apply(x, y);
        rolling.push(start, x, y);
    }
    // Non-finite samples never enter the window
    assert_eq!(rolling.len(), 3);
}

#[test]
fn test_exponential_ignores_non_finite_input() {
    let mut filter = ExponentialFilter::new(0.5);
    filter.apply(10.0, 20.0);
    assert_eq!(filter.apply(f64::NAN, 50.0), (10.0, 20.0));
    assert_eq!(filter.apply(f64::INFINITY, f64::INFINITY), (10.0, 20.0));
    assert_eq!(filter.apply(20.0, 40.0), (15.0, 30.0));
}

#[test]
fn test_filter_reset_behavior() {
    let mut filter = ExponentialFilter::new(0.5);
    filter.apply(10.0, 20.0);
    filter.apply(15.0, 25.0);
    filter.apply(20.0, 30.0);

    filter.reset();

    // After reset the first sample passes straight through
    let (x, y) = filter.apply(100.0, 200.0);
    assert!((x - 100.0).abs() < 1e-10, "{} did not reset", filter.name());
    assert!((y - 200.0).abs() < 1e-10, "{} did not reset", filter.name());

    let start = Instant::now();
    let mut rolling = RollingAverage::new(Duration::from_millis(300));
    rolling.push(start, 10.0, 20.0);
    rolling.clear();
    rolling.push(start, 100.0, 200.0);
    assert_eq!(rolling.mean(), Some((100.0, 200.0)));
}

#[test]
fn test_filter_convergence() {
    let mut filter = ExponentialFilter::new(smoothing_factor(12, false));
    filter.apply(0.0, 0.0);
    let mut out = (0.0, 0.0);
    for _ in 0..500 {
        out = filter.apply(100.0, -100.0);
    }
    assert!((out.0 - 100.0).abs() < 1e-3);
    assert!((out.1 + 100.0).abs() < 1e-3);
}

#[test]
fn test_smoothing_levels_are_monotonic() {
    for exponential in [false, true] {
        let factors: Vec<f64> = (0..=19).map(|l| smoothing_factor(l, exponential)).collect();
        assert!(factors.windows(2).all(|w| w[1] < w[0]), "{factors:?}");
    }
    let fractions: Vec<f64> = (0..=24).map(|l| path_cursor_fraction(l, 0.01)).collect();
    assert!(fractions.windows(2).all(|w| w[1] > w[0]));
    assert!((fractions[24] - 0.25).abs() < 1e-12);
}

#[test]
fn test_envelope_degenerate_axis() {
    let mut env = RangeEnvelope::new();
    env.normalize(100.0, 50.0);
    let (x, y) = env.normalize(200.0, 50.0);
    assert_eq!(x, 1.0);
    assert_eq!(y, 0.5);
    assert_eq!(env.normalize(f64::NAN, 1.0), (0.5, 0.5));
}

#[test]
fn test_degenerate_rectangles() {
    assert!(!Rect::new(10.0, 10.0, 10.0, 20.0).is_valid());
    assert!(!Rect::new(0.0, 0.0, f64::INFINITY, 10.0).is_valid());
    assert!(Rect::from_size(1.0, 1.0).is_valid());
}

#[test]
fn test_host_boundary_conversions() {
    let screen = Rect::from_size(800.0, 600.0);
    assert_eq!(to_pixel(Point::new(f64::NAN, 1e12), screen), (0, 599));
    assert_eq!(to_stream_point(Point::new(1e300, -1e300)), (f32::MAX, f32::MIN));
}
