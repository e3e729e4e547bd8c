//! Turns raw tracker samples into a smoothed, bounded cursor position.
//!
//! Per tick the filter selects a signal source, normalizes it, maps it into
//! the active region with per-direction gains, smooths it, optionally drags
//! a lagging path cursor behind it, clamps both, and records the result in a
//! rolling average.
//!
//! In relative mode the mapping and smoothing steps are replaced by
//! integration: the gain-scaled frame-to-frame motion of the raw signal,
//! divided by the number of frames it spans and averaged over the smoothing
//! level, is added to the current position.

use std::time::Instant;

use log::trace;

use crate::config::{CursorConfig, SignalSource};
use crate::constants::{MAX_SMOOTHING_LEVEL, SPEED_GAIN_STEP};
use crate::filters::envelope::RangeEnvelope;
use crate::filters::exponential::ExponentialFilter;
use crate::filters::rolling_average::RollingAverage;
use crate::filters::{path_cursor_fraction, smoothing_factor, SignalFilter};
use crate::geometry::{Point, Rect};
use crate::tracking::TrackingFrame;

/// Per-direction speed multipliers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalGain {
    pub up: f64,
    pub down: f64,
    pub left: f64,
    pub right: f64,
}

impl DirectionalGain {
    /// Gains from speed levels, `level * 0.2 + 0.2` each
    pub fn from_levels(up: u32, down: u32, left: u32, right: u32) -> Self {
        let gain = |level: u32| f64::from(level) * SPEED_GAIN_STEP + SPEED_GAIN_STEP;
        Self {
            up: gain(up),
            down: gain(down),
            left: gain(left),
            right: gain(right),
        }
    }

    fn horizontal(&self, displacement: f64) -> f64 {
        if displacement > 0.0 {
            self.right
        } else {
            self.left
        }
    }

    fn vertical(&self, displacement: f64) -> f64 {
        if displacement > 0.0 {
            self.down
        } else {
            self.up
        }
    }
}

/// Cursor position filter
pub struct CursorFilter {
    source: SignalSource,
    gain: DirectionalGain,
    scale: (f64, f64),
    input_size: (f64, f64),
    angle_range: (f64, f64),
    recenter_rate: f64,
    path_enabled: bool,
    relative: bool,
    relative_smoothing: f64,
    screen: Rect,

    envelope: RangeEnvelope,
    recenter_offset: (f64, f64),
    smoother: ExponentialFilter,
    path: ExponentialFilter,
    rolling: RollingAverage,

    /// Last raw sample and the averaged step, relative mode only
    previous_raw: Option<(f64, f64)>,
    step: (f64, f64),
    previous_target: Option<Point>,

    position: Point,
    path_position: Point,
    velocity: Point,
    overshoot: Point,
    drive: Point,
}

impl CursorFilter {
    /// Create a filter for a screen of the given bounds
    pub fn new(config: &CursorConfig, screen: Rect) -> Self {
        let centre = screen.center();
        let mut filter = Self {
            source: config.signal_source,
            gain: DirectionalGain::from_levels(1, 1, 1, 1),
            scale: (1.0, 1.0),
            input_size: (1.0, 1.0),
            angle_range: (1.0, 1.0),
            recenter_rate: 0.0,
            path_enabled: false,
            relative: false,
            relative_smoothing: 0.0,
            screen,
            envelope: RangeEnvelope::new(),
            recenter_offset: (0.0, 0.0),
            smoother: ExponentialFilter::new(1.0),
            path: ExponentialFilter::new(1.0),
            rolling: RollingAverage::new(config.rolling_average_window()),
            previous_raw: None,
            step: (0.0, 0.0),
            previous_target: None,
            position: centre,
            path_position: centre,
            velocity: Point::default(),
            overshoot: Point::default(),
            drive: Point::default(),
        };
        filter.apply_config(config);
        filter
    }

    /// Pick up changed settings without losing filter state
    pub fn apply_config(&mut self, config: &CursorConfig) {
        if self.source != config.signal_source {
            self.recenter_offset = (0.0, 0.0);
        }
        if self.source != config.signal_source || self.relative != config.relative_motion {
            self.clear_motion();
        }
        self.relative = config.relative_motion;
        self.relative_smoothing = f64::from(config.smoothing_level.min(MAX_SMOOTHING_LEVEL));
        self.source = config.signal_source;
        self.gain = DirectionalGain::from_levels(
            config.speed_up,
            config.speed_down,
            config.speed_left,
            config.speed_right,
        );
        self.scale = (config.scale_x, config.scale_y);
        self.input_size = (config.input_width, config.input_height);
        self.angle_range = (config.yaw_range_deg, config.pitch_range_deg);
        self.recenter_rate = config.recenter_rate;
        self.path_enabled = config.path_cursor_enabled;
        self.smoother
            .set_alpha(smoothing_factor(config.smoothing_level, config.exponential_smoothing));
        self.path
            .set_alpha(path_cursor_fraction(config.path_cursor_level, config.path_cursor_min));
    }

    pub fn set_screen(&mut self, screen: Rect) {
        if screen.is_valid() {
            self.screen = screen;
        }
    }

    pub fn screen(&self) -> Rect {
        self.screen
    }

    /// Smoothing factor currently applied per tick
    pub fn smoothing(&self) -> f64 {
        self.smoother.alpha()
    }

    /// Advance one tick.
    ///
    /// `bounds` is the active region, or the screen when there is none.
    /// `event_active` suspends recentering while a discrete event is held.
    pub fn update(&mut self, frame: &TrackingFrame, bounds: Rect, event_active: bool, now: Instant) -> Point {
        let bounds = if bounds.is_valid() { bounds } else { self.screen };
        let gap = f64::from(frame.gap_frames.max(1));
        let target = if self.relative {
            self.relative_target(frame, gap)
        } else {
            let (nx, ny) = self.normalized(frame, event_active);
            self.map_to_bounds(nx, ny, bounds)
        };

        if !target.is_finite() {
            trace!("Dropping non-finite cursor target");
            self.step = (0.0, 0.0);
            return self.position;
        }

        self.drive = match self.previous_target {
            Some(last) => Point::new((target.x - last.x) / gap, (target.y - last.y) / gap),
            None => Point::default(),
        };
        self.previous_target = Some(target);
        self.overshoot = Point::new(
            target.x - target.x.clamp(self.screen.left, self.screen.right),
            target.y - target.y.clamp(bounds.top, bounds.bottom),
        );

        let previous = self.position;
        let position = if self.relative {
            self.clamp(target, bounds)
        } else {
            let (sx, sy) = self.smoother.apply(target.x, target.y);
            self.clamp(Point::new(sx, sy), bounds)
        };
        self.smoother.set(position.x, position.y);

        if self.path_enabled {
            let (px, py) = self.path.apply(position.x, position.y);
            let path = self.clamp(Point::new(px, py), bounds);
            self.path.set(path.x, path.y);
            self.path_position = path;
        } else {
            self.path.set(position.x, position.y);
            self.path_position = position;
        }

        self.velocity = Point::new((position.x - previous.x) / gap, (position.y - previous.y) / gap);
        self.position = position;
        self.rolling.push(now, position.x, position.y);

        trace!("Cursor target ({:.1}, {:.1}) -> ({:.1}, {:.1})", target.x, target.y, position.x, position.y);
        position
    }

    /// Integrate one step of raw signal motion onto the current position.
    ///
    /// The pitch/yaw source moves with the head coordinates, the others with
    /// the nose tip. A `(0, 0)` sample carries no motion.
    fn relative_target(&mut self, frame: &TrackingFrame, gap: f64) -> Point {
        let raw = match self.source {
            SignalSource::PitchYaw => frame.head,
            SignalSource::NoseTip | SignalSource::Blended => frame.nose_tip,
        };
        let raw = (f64::from(raw[0]), f64::from(raw[1]));

        let delta = match self.previous_raw {
            Some(last) if raw != (0.0, 0.0) => (raw.0 - last.0, raw.1 - last.1),
            _ => (0.0, 0.0),
        };
        if raw != (0.0, 0.0) {
            self.previous_raw = Some(raw);
        }

        let velocity = (
            delta.0 * self.gain.horizontal(delta.0),
            delta.1 * self.gain.vertical(delta.1),
        );
        let k = self.relative_smoothing;
        self.step = (
            (k * self.step.0 + velocity.0 / gap) / (k + 1.0),
            (k * self.step.1 + velocity.1 / gap) / (k + 1.0),
        );
        Point::new(self.position.x + self.step.0, self.position.y + self.step.1)
    }

    fn normalized(&mut self, frame: &TrackingFrame, event_active: bool) -> (f64, f64) {
        let nose = (f64::from(frame.nose_tip[0]), f64::from(frame.nose_tip[1]));
        match self.source {
            SignalSource::NoseTip => self.envelope.normalize(nose.0, nose.1),
            SignalSource::PitchYaw => self.fixed_mapping(frame),
            SignalSource::Blended => {
                if nose == (0.0, 0.0) {
                    return (0.5, 0.5);
                }
                let (nose_x, nose_y) = self.envelope.normalize(nose.0, nose.1);
                let (head_x, head_y) = self.fixed_mapping(frame);
                let raw = (nose_x - head_x + 0.5, nose_y - head_y + 0.5);
                if !event_active {
                    let rate = self.recenter_rate;
                    self.recenter_offset.0 += rate * ((raw.0 - 0.5) - self.recenter_offset.0);
                    self.recenter_offset.1 += rate * ((raw.1 - 0.5) - self.recenter_offset.1);
                }
                (raw.0 - self.recenter_offset.0, raw.1 - self.recenter_offset.1)
            }
        }
    }

    /// Fixed input-frame mapping: pitch/yaw angles when present, otherwise
    /// the head coordinates over the tracker frame size.
    fn fixed_mapping(&self, frame: &TrackingFrame) -> (f64, f64) {
        if let Some([pitch, yaw]) = frame.pitch_yaw {
            let (yaw_range, pitch_range) = self.angle_range;
            let x = (f64::from(yaw) + yaw_range) / (2.0 * yaw_range);
            let y = (f64::from(pitch) + pitch_range) / (2.0 * pitch_range);
            return (x.clamp(0.0, 1.0), y.clamp(0.0, 1.0));
        }
        let [hx, hy] = frame.head;
        if hx == 0.0 && hy == 0.0 {
            return (0.5, 0.5);
        }
        let x = f64::from(hx) / self.input_size.0;
        let y = f64::from(hy) / self.input_size.1;
        (x.clamp(0.0, 1.0), y.clamp(0.0, 1.0))
    }

    fn map_to_bounds(&self, nx: f64, ny: f64, bounds: Rect) -> Point {
        let centre = bounds.center();
        let dx = (nx - 0.5) * bounds.width() * self.scale.0;
        let dy = (ny - 0.5) * bounds.height() * self.scale.1;
        Point::new(
            centre.x + dx * self.gain.horizontal(dx),
            centre.y + dy * self.gain.vertical(dy),
        )
    }

    /// Vertical clamp to the active bounds, horizontal clamp to the screen
    fn clamp(&self, p: Point, bounds: Rect) -> Point {
        Point::new(
            p.x.clamp(self.screen.left, self.screen.right),
            p.y.clamp(bounds.top, bounds.bottom),
        )
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn path_position(&self) -> Point {
        self.path_position
    }

    pub fn velocity(&self) -> Point {
        self.velocity
    }

    /// How far the last target lay outside the clamp, signed per axis
    pub fn overshoot(&self) -> Point {
        self.overshoot
    }

    /// Per-frame motion of the unclamped target
    pub fn drive(&self) -> Point {
        self.drive
    }

    pub fn is_relative(&self) -> bool {
        self.relative
    }

    /// Mean position over the rolling window
    pub fn rolling_average(&self) -> Option<Point> {
        self.rolling.mean().map(|(x, y)| Point::new(x, y))
    }

    pub fn reset_envelope(&mut self) {
        self.envelope.reset();
    }

    /// Snap the path cursor onto the cursor
    pub fn reset_path_cursor(&mut self) {
        self.path_position = self.position;
        self.path.set(self.position.x, self.position.y);
    }

    pub fn set_path_cursor(&mut self, p: Point) {
        if p.is_finite() {
            self.path_position = p;
            self.path.set(p.x, p.y);
        }
    }

    /// Move both cursors to the centre of `bounds` and clear motion history
    pub fn reset_to_center(&mut self, bounds: Rect) {
        let bounds = if bounds.is_valid() { bounds } else { self.screen };
        let centre = self.clamp(bounds.center(), bounds);
        self.position = centre;
        self.path_position = centre;
        self.smoother.set(centre.x, centre.y);
        self.path.set(centre.x, centre.y);
        self.recenter_offset = (0.0, 0.0);
        self.clear_motion();
        self.rolling.clear();
    }

    /// Forget everything; the next sample snaps
    pub fn reset(&mut self) {
        self.smoother.reset();
        self.path.reset();
        self.envelope.reset();
        self.rolling.clear();
        self.recenter_offset = (0.0, 0.0);
        self.clear_motion();
        self.position = self.screen.center();
        self.path_position = self.position;
    }

    fn clear_motion(&mut self) {
        self.previous_raw = None;
        self.previous_target = None;
        self.step = (0.0, 0.0);
        self.velocity = Point::default();
        self.overshoot = Point::default();
        self.drive = Point::default();
    }
}
