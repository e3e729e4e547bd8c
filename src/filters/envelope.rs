/// Running min/max envelope that normalizes raw coordinates into `[0, 1]`.
///
/// A sample of exactly `(0, 0)` means the tracker had no signal: the
/// envelope is left alone and the result is the centre. An axis whose range
/// has not opened up yet also normalizes to 0.5. The envelope only shrinks
/// back on an explicit [`RangeEnvelope::reset`].
#[derive(Debug, Clone, Default)]
pub struct RangeEnvelope {
    min: Option<(f64, f64)>,
    max: Option<(f64, f64)>,
}

impl RangeEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Widen the envelope with a sample and return its normalized position
    pub fn normalize(&mut self, x: f64, y: f64) -> (f64, f64) {
        if (x == 0.0 && y == 0.0) || !(x.is_finite() && y.is_finite()) {
            return (0.5, 0.5);
        }

        let (min_x, min_y) = self.min.map_or((x, y), |(mx, my)| (mx.min(x), my.min(y)));
        let (max_x, max_y) = self.max.map_or((x, y), |(mx, my)| (mx.max(x), my.max(y)));
        self.min = Some((min_x, min_y));
        self.max = Some((max_x, max_y));

        (axis(x, min_x, max_x), axis(y, min_y, max_y))
    }

    /// Current bounds as `((min_x, min_y), (max_x, max_y))`
    pub fn bounds(&self) -> Option<((f64, f64), (f64, f64))> {
        self.min.zip(self.max)
    }

    pub fn reset(&mut self) {
        self.min = None;
        self.max = None;
    }
}

fn axis(value: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    if range <= f64::EPSILON {
        0.5
    } else {
        ((value - min) / range).clamp(0.0, 1.0)
    }
}
