use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::constants::ROLLING_AVERAGE_CAPACITY;

/// Rolling average over a time window.
///
/// Entries older than the window (relative to the newest push) are evicted,
/// and the ring never holds more than [`ROLLING_AVERAGE_CAPACITY`] entries.
pub struct RollingAverage {
    window: Duration,
    buffer: VecDeque<(Instant, f64, f64)>,
}

impl RollingAverage {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            buffer: VecDeque::with_capacity(ROLLING_AVERAGE_CAPACITY),
        }
    }

    /// Add a timestamped sample
    pub fn push(&mut self, now: Instant, x: f64, y: f64) {
        if !(x.is_finite() && y.is_finite()) {
            return;
        }
        while let Some(&(t, _, _)) = self.buffer.front() {
            if now.saturating_duration_since(t) > self.window {
                self.buffer.pop_front();
            } else {
                break;
            }
        }
        if self.buffer.len() >= ROLLING_AVERAGE_CAPACITY {
            self.buffer.pop_front();
        }
        self.buffer.push_back((now, x, y));
    }

    /// Mean of the retained samples
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> Option<(f64, f64)> {
        if self.buffer.is_empty() {
            return None;
        }
        let n = self.buffer.len() as f64;
        let (sx, sy) = self
            .buffer
            .iter()
            .fold((0.0, 0.0), |(ax, ay), &(_, x, y)| (ax + x, ay + y));
        Some((sx / n, sy / n))
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_average() {
        let start = Instant::now();
        let mut avg = RollingAverage::new(Duration::from_millis(100));

        avg.push(start, 10.0, 20.0);
        avg.push(start + Duration::from_millis(10), 20.0, 30.0);
        assert_eq!(avg.mean(), Some((15.0, 25.0)));

        // First two samples fall out of the window
        avg.push(start + Duration::from_millis(150), 40.0, 50.0);
        assert_eq!(avg.len(), 1);
        assert_eq!(avg.mean(), Some((40.0, 50.0)));
    }

    #[test]
    fn test_capacity_bound() {
        let start = Instant::now();
        let mut avg = RollingAverage::new(Duration::from_secs(10));
        for i in 0..(ROLLING_AVERAGE_CAPACITY * 2) {
            avg.push(start, i as f64, 0.0);
        }
        assert_eq!(avg.len(), ROLLING_AVERAGE_CAPACITY);
    }

    #[test]
    fn test_empty_mean() {
        let avg = RollingAverage::new(Duration::from_millis(100));
        assert!(avg.mean().is_none());
    }
}
