use super::SignalFilter;

/// Exponential smoothing filter: `out += alpha * (in - out)`.
///
/// The first sample after construction or reset is taken as-is. A
/// non-finite input leaves the state untouched; a non-finite state (which
/// can only come from `set`) is discarded so the next sample snaps.
pub struct ExponentialFilter {
    alpha: f64,
    last: Option<(f64, f64)>,
}

impl ExponentialFilter {
    /// Alpha outside `(0, 1]` is clamped into range
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: Self::sanitize_alpha(alpha),
            last: None,
        }
    }

    fn sanitize_alpha(alpha: f64) -> f64 {
        if alpha.is_finite() {
            alpha.clamp(f64::EPSILON, 1.0)
        } else {
            1.0
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = Self::sanitize_alpha(alpha);
    }

    /// Current output, if initialized
    pub fn value(&self) -> Option<(f64, f64)> {
        self.last
    }

    /// Force the filter output to a position
    pub fn set(&mut self, x: f64, y: f64) {
        self.last = (x.is_finite() && y.is_finite()).then_some((x, y));
    }

    pub fn is_initialized(&self) -> bool {
        self.last.is_some()
    }
}

impl SignalFilter for ExponentialFilter {
    fn apply(&mut self, x: f64, y: f64) -> (f64, f64) {
        if !(x.is_finite() && y.is_finite()) {
            return self.last.unwrap_or((x, y));
        }

        let next = match self.last {
            Some((lx, ly)) => (lx + self.alpha * (x - lx), ly + self.alpha * (y - ly)),
            None => (x, y),
        };

        self.last = Some(next);
        next
    }

    fn reset(&mut self) {
        self.last = None;
    }

    fn name(&self) -> &str {
        "ExponentialFilter"
    }
}
