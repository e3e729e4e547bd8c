//! Configuration management for the head pointer application.
//!
//! Every field has a documented default and every section is optional in
//! the YAML file. Out-of-range values are clamped by [`Config::sanitize`]
//! with a logged warning; configuration problems never become runtime
//! faults.

use crate::constants::{
    COMPLETION_HISTORY_LEN, DEFAULT_EDGE_HOLD_MS, DEFAULT_INPUT_HEIGHT, DEFAULT_INPUT_WIDTH,
    DEFAULT_LONG_TAP_MS, DEFAULT_PITCH_RANGE_DEG, DEFAULT_QUICK_TAP_MS, DEFAULT_RECENTER_RATE,
    DEFAULT_SCALE_FACTOR, DEFAULT_SCREEN_HEIGHT, DEFAULT_SCREEN_WIDTH, DEFAULT_SEGMENT_MS,
    DEFAULT_SMOOTHING_LEVEL, DEFAULT_SPEED_LEVEL, DEFAULT_TICK_MS, DEFAULT_YAW_RANGE_DEG, EPS_PX,
    MAX_PATH_CURSOR_LEVEL, MAX_POINT_AGE_MS, MAX_QUEUE, MAX_SMOOTHING_LEVEL, MAX_SPEED_LEVEL,
    MIN_PREEMPT_FRACTION, MIN_SAMPLE_MS, PATH_CURSOR_MAX_FRACTION, PATH_CURSOR_MIN_FRACTION,
    PREEMPT_FRACTION, ROLLING_AVERAGE_WINDOW_MS, START_DEBOUNCE_MS,
};
use crate::event_trigger::{Blendshape, EventType, TriggerBinding};
use crate::gesture_stream::StreamSettings;
use crate::{Error, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Screen geometry
    pub screen: ScreenConfig,

    /// Control loop timing
    pub tick: TickConfig,

    /// Cursor movement configuration
    pub cursor: CursorConfig,

    /// Keyboard region behaviour
    pub region: RegionConfig,

    /// Gesture streaming parameters
    pub stream: StreamConfig,

    /// Action key (e.g. `CURSOR_TOUCH`) to blendshape binding
    pub triggers: BTreeMap<String, TriggerConfig>,
}

/// Screen size in pixels
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub width: f64,
    pub height: f64,
}

/// Control tick configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Tick interval in milliseconds
    pub interval_ms: u64,
}

/// Where the cursor signal comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    /// Nose tip pixels, normalized by a running min/max envelope
    NoseTip,
    /// Head pitch/yaw, normalized by a fixed mapping
    PitchYaw,
    /// Nose tip relative to head pose, with slow recentering
    Blended,
}

/// Cursor movement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorConfig {
    pub signal_source: SignalSource,

    /// Speed levels (0-10) per direction; gain is `level * 0.2 + 0.2`
    pub speed_up: u32,
    pub speed_down: u32,
    pub speed_left: u32,
    pub speed_right: u32,

    /// Smoothing level (0-19), 0 is pass-through
    pub smoothing_level: u32,

    /// Use the exponential level curve instead of the linear one
    pub exponential_smoothing: bool,

    /// Track a lagging path cursor
    pub path_cursor_enabled: bool,

    /// Path cursor level (0-24)
    pub path_cursor_level: u32,

    /// Path cursor fraction at level 0 (0.01-0.25)
    pub path_cursor_min: f64,

    /// Horizontal and vertical scale applied around the region centre
    pub scale_x: f64,
    pub scale_y: f64,

    /// Tracker input frame size, for the fixed pitch/yaw mapping
    pub input_width: f64,
    pub input_height: f64,

    /// Head angles mapped onto the full range, in degrees either side
    pub yaw_range_deg: f64,
    pub pitch_range_deg: f64,

    /// Per-tick recentering rate in blended mode (0-1)
    pub recenter_rate: f64,

    /// Rolling average window in milliseconds
    pub rolling_average_ms: u64,

    /// Integrate signal motion instead of mapping positions directly
    pub relative_motion: bool,

    /// Smart touch: release before this (ms) taps, later long-presses
    pub quick_tap_ms: u64,

    /// Smart touch: holding this long (ms) long-presses without a release
    pub long_tap_ms: u64,
}

/// Keyboard region configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Let a held edge pop the cursor into the adjacent region
    pub duration_pop_out: bool,

    /// Edge hold duration in milliseconds
    pub edge_hold_ms: u64,

    /// With the edge hold disabled, let a hard push past an edge pop the
    /// cursor across instead
    pub velocity_pop_out: bool,
}

/// Gesture stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub segment_ms: u64,
    pub max_queue: usize,
    pub eps_px: f32,
    pub min_sample_ms: u64,
    pub start_debounce_ms: u64,
    pub history_len: usize,
    pub preempt_fraction: f64,
    pub max_point_age_ms: u64,
}

/// One action binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Blendshape key, e.g. `OPEN_MOUTH`
    pub blendshape: String,

    /// Score threshold (0.0-1.0)
    pub threshold: f32,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_SCREEN_WIDTH,
            height: DEFAULT_SCREEN_HEIGHT,
        }
    }
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_TICK_MS,
        }
    }
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            signal_source: SignalSource::NoseTip,
            speed_up: DEFAULT_SPEED_LEVEL,
            speed_down: DEFAULT_SPEED_LEVEL,
            speed_left: DEFAULT_SPEED_LEVEL,
            speed_right: DEFAULT_SPEED_LEVEL,
            smoothing_level: DEFAULT_SMOOTHING_LEVEL,
            exponential_smoothing: false,
            path_cursor_enabled: false,
            path_cursor_level: 12,
            path_cursor_min: PATH_CURSOR_MIN_FRACTION,
            scale_x: DEFAULT_SCALE_FACTOR,
            scale_y: DEFAULT_SCALE_FACTOR,
            input_width: DEFAULT_INPUT_WIDTH,
            input_height: DEFAULT_INPUT_HEIGHT,
            yaw_range_deg: DEFAULT_YAW_RANGE_DEG,
            pitch_range_deg: DEFAULT_PITCH_RANGE_DEG,
            recenter_rate: DEFAULT_RECENTER_RATE,
            rolling_average_ms: ROLLING_AVERAGE_WINDOW_MS,
            relative_motion: false,
            quick_tap_ms: DEFAULT_QUICK_TAP_MS,
            long_tap_ms: DEFAULT_LONG_TAP_MS,
        }
    }
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            duration_pop_out: true,
            edge_hold_ms: DEFAULT_EDGE_HOLD_MS,
            velocity_pop_out: true,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            segment_ms: DEFAULT_SEGMENT_MS,
            max_queue: MAX_QUEUE,
            eps_px: EPS_PX,
            min_sample_ms: MIN_SAMPLE_MS,
            start_debounce_ms: START_DEBOUNCE_MS,
            history_len: COMPLETION_HISTORY_LEN,
            preempt_fraction: PREEMPT_FRACTION,
            max_point_age_ms: MAX_POINT_AGE_MS,
        }
    }
}

impl CursorConfig {
    /// Rolling average window as a duration
    pub fn rolling_average_window(&self) -> Duration {
        Duration::from_millis(self.rolling_average_ms)
    }

    pub fn quick_tap(&self) -> Duration {
        Duration::from_millis(self.quick_tap_ms)
    }

    pub fn long_tap(&self) -> Duration {
        Duration::from_millis(self.long_tap_ms)
    }
}

impl RegionConfig {
    pub fn edge_hold(&self) -> Duration {
        Duration::from_millis(self.edge_hold_ms)
    }
}

impl From<&StreamConfig> for StreamSettings {
    fn from(c: &StreamConfig) -> Self {
        Self {
            default_segment: Duration::from_millis(c.segment_ms),
            max_queue: c.max_queue,
            eps_px: c.eps_px,
            min_sample_interval: Duration::from_millis(c.min_sample_ms),
            start_debounce: Duration::from_millis(c.start_debounce_ms),
            history_len: c.history_len,
            preempt_fraction: c.preempt_fraction,
            max_point_age: Duration::from_millis(c.max_point_age_ms),
        }
    }
}

fn default_triggers() -> BTreeMap<String, TriggerConfig> {
    [
        (EventType::CursorTouch, Blendshape::OpenMouth, 0.5),
        (EventType::SwipeLeft, Blendshape::MouthLeft, 0.6),
        (EventType::SwipeRight, Blendshape::MouthRight, 0.6),
        (EventType::Home, Blendshape::RaiseLeftEyebrow, 0.7),
    ]
    .into_iter()
    .map(|(event, shape, threshold)| {
        (
            event.key().to_string(),
            TriggerConfig {
                blendshape: shape.key().to_string(),
                threshold,
            },
        )
    })
    .collect()
}

impl Config {
    /// Defaults plus the stock trigger bindings
    pub fn with_default_triggers() -> Self {
        Self {
            triggers: default_triggers(),
            ..Self::default()
        }
    }

    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Clamp out-of-range values into range, logging each adjustment.
    ///
    /// Returns a description of every field that was changed.
    pub fn sanitize(&mut self) -> Vec<String> {
        let mut fixes = Vec::new();
        let defaults_screen = ScreenConfig::default();

        positive(&mut self.screen.width, defaults_screen.width, "screen.width", &mut fixes);
        positive(&mut self.screen.height, defaults_screen.height, "screen.height", &mut fixes);
        if self.tick.interval_ms == 0 {
            self.tick.interval_ms = DEFAULT_TICK_MS;
            fixes.push(format!("tick.interval_ms was 0, using {DEFAULT_TICK_MS}"));
        }

        let c = &mut self.cursor;
        for (value, name) in [
            (&mut c.speed_up, "cursor.speed_up"),
            (&mut c.speed_down, "cursor.speed_down"),
            (&mut c.speed_left, "cursor.speed_left"),
            (&mut c.speed_right, "cursor.speed_right"),
        ] {
            at_most(value, MAX_SPEED_LEVEL, name, &mut fixes);
        }
        at_most(&mut c.smoothing_level, MAX_SMOOTHING_LEVEL, "cursor.smoothing_level", &mut fixes);
        at_most(&mut c.path_cursor_level, MAX_PATH_CURSOR_LEVEL, "cursor.path_cursor_level", &mut fixes);
        within(
            &mut c.path_cursor_min,
            PATH_CURSOR_MIN_FRACTION,
            PATH_CURSOR_MAX_FRACTION,
            "cursor.path_cursor_min",
            &mut fixes,
        );
        within(&mut c.scale_x, 0.1, 10.0, "cursor.scale_x", &mut fixes);
        within(&mut c.scale_y, 0.1, 10.0, "cursor.scale_y", &mut fixes);
        positive(&mut c.input_width, DEFAULT_INPUT_WIDTH, "cursor.input_width", &mut fixes);
        positive(&mut c.input_height, DEFAULT_INPUT_HEIGHT, "cursor.input_height", &mut fixes);
        positive(&mut c.yaw_range_deg, DEFAULT_YAW_RANGE_DEG, "cursor.yaw_range_deg", &mut fixes);
        positive(&mut c.pitch_range_deg, DEFAULT_PITCH_RANGE_DEG, "cursor.pitch_range_deg", &mut fixes);
        within(&mut c.recenter_rate, 0.0, 1.0, "cursor.recenter_rate", &mut fixes);
        if c.long_tap_ms < c.quick_tap_ms {
            fixes.push(format!(
                "cursor.long_tap_ms {} below quick_tap_ms {}, raised",
                c.long_tap_ms, c.quick_tap_ms
            ));
            c.long_tap_ms = c.quick_tap_ms;
        }

        let s = &mut self.stream;
        if s.segment_ms == 0 {
            s.segment_ms = DEFAULT_SEGMENT_MS;
            fixes.push(format!("stream.segment_ms was 0, using {DEFAULT_SEGMENT_MS}"));
        }
        if s.max_queue < 4 {
            fixes.push(format!("stream.max_queue {} too small, using 4", s.max_queue));
            s.max_queue = 4;
        }
        if s.history_len == 0 {
            s.history_len = COMPLETION_HISTORY_LEN;
            fixes.push(format!("stream.history_len was 0, using {COMPLETION_HISTORY_LEN}"));
        }
        if !s.eps_px.is_finite() || s.eps_px < 0.0 {
            fixes.push(format!("stream.eps_px {} invalid, using {EPS_PX}", s.eps_px));
            s.eps_px = EPS_PX;
        }
        within(&mut s.preempt_fraction, MIN_PREEMPT_FRACTION, 1.0, "stream.preempt_fraction", &mut fixes);

        for fix in &fixes {
            warn!("Config: {fix}");
        }
        fixes
    }

    /// Resolve the trigger section into typed bindings.
    ///
    /// Unknown action or blendshape names are skipped with a warning and
    /// thresholds are clamped into `[0, 1]`.
    pub fn trigger_bindings(&self) -> Vec<(EventType, TriggerBinding)> {
        let mut bindings = Vec::new();
        for (key, trigger) in &self.triggers {
            let Some(event) = EventType::from_key(key) else {
                warn!("Config: unknown action '{key}', skipping");
                continue;
            };
            let Some(shape) = Blendshape::from_key(&trigger.blendshape) else {
                warn!("Config: unknown blendshape '{}' for {key}, skipping", trigger.blendshape);
                continue;
            };
            if let Some(binding) = TriggerBinding::new(shape, trigger.threshold) {
                bindings.push((event, binding));
            }
        }
        bindings
    }
}

fn at_most(value: &mut u32, max: u32, name: &str, fixes: &mut Vec<String>) {
    if *value > max {
        fixes.push(format!("{name} {value} above {max}, clamped"));
        *value = max;
    }
}

fn within(value: &mut f64, min: f64, max: f64, name: &str, fixes: &mut Vec<String>) {
    if !value.is_finite() {
        fixes.push(format!("{name} not finite, using {min}"));
        *value = min;
    } else if *value < min || *value > max {
        let clamped = value.clamp(min, max);
        fixes.push(format!("{name} {value} outside [{min}, {max}], clamped to {clamped}"));
        *value = clamped;
    }
}

fn positive(value: &mut f64, default: f64, name: &str, fixes: &mut Vec<String>) {
    if !value.is_finite() || *value <= 0.0 {
        fixes.push(format!("{name} {value} must be positive, using {default}"));
        *value = default;
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Head Pointer Configuration

screen:
  width: 1920.0
  height: 1080.0

tick:
  interval_ms: 16

# Cursor movement
cursor:
  signal_source: nose_tip   # nose_tip, pitch_yaw or blended
  speed_up: 4
  speed_down: 4
  speed_left: 4
  speed_right: 4
  smoothing_level: 5
  exponential_smoothing: false
  path_cursor_enabled: false
  path_cursor_level: 12
  path_cursor_min: 0.01
  scale_x: 1.5
  scale_y: 1.5
  input_width: 640.0
  input_height: 480.0
  yaw_range_deg: 30.0
  pitch_range_deg: 20.0
  recenter_rate: 0.01
  rolling_average_ms: 300
  relative_motion: false
  quick_tap_ms: 2000
  long_tap_ms: 2500

# Keyboard regions
region:
  duration_pop_out: true
  edge_hold_ms: 1000
  velocity_pop_out: true

# Gesture streaming
stream:
  segment_ms: 24
  max_queue: 64
  eps_px: 1.25
  min_sample_ms: 10
  start_debounce_ms: 50
  history_len: 10
  preempt_fraction: 0.8
  max_point_age_ms: 100

# Expression bindings
triggers:
  CURSOR_TOUCH:
    blendshape: OPEN_MOUTH
    threshold: 0.5
  SWIPE_LEFT:
    blendshape: MOUTH_LEFT
    threshold: 0.6
  SWIPE_RIGHT:
    blendshape: MOUTH_RIGHT
    threshold: 0.6
  HOME:
    blendshape: RAISE_LEFT_EYEBROW
    threshold: 0.7
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses() {
        let mut config = Config::from_yaml(EXAMPLE_CONFIG).unwrap();
        assert!(config.sanitize().is_empty());
        assert_eq!(config.trigger_bindings().len(), 4);
        assert_eq!(config.cursor.signal_source, SignalSource::NoseTip);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::from_yaml("cursor:\n  smoothing_level: 9\n").unwrap();
        assert_eq!(config.cursor.smoothing_level, 9);
        assert_eq!(config.cursor.speed_up, DEFAULT_SPEED_LEVEL);
        assert_eq!(config.region.edge_hold_ms, DEFAULT_EDGE_HOLD_MS);
    }

    #[test]
    fn test_sanitize_clamps() {
        let mut config = Config::default();
        config.cursor.smoothing_level = 50;
        config.cursor.path_cursor_min = 0.9;
        config.screen.width = -5.0;
        let fixes = config.sanitize();
        assert_eq!(fixes.len(), 3);
        assert_eq!(config.cursor.smoothing_level, MAX_SMOOTHING_LEVEL);
        assert_eq!(config.cursor.path_cursor_min, PATH_CURSOR_MAX_FRACTION);
        assert_eq!(config.screen.width, DEFAULT_SCREEN_WIDTH);
    }

    #[test]
    fn test_sanitize_orders_tap_thresholds() {
        let mut config = Config::default();
        config.cursor.quick_tap_ms = 800;
        config.cursor.long_tap_ms = 300;
        config.stream.preempt_fraction = -0.5;
        assert_eq!(config.sanitize().len(), 2);
        assert_eq!(config.cursor.long_tap_ms, 800);
        assert_eq!(config.stream.preempt_fraction, MIN_PREEMPT_FRACTION);
    }

    #[test]
    fn test_unknown_trigger_names_skipped() {
        let yaml = "triggers:\n  JUMP:\n    blendshape: OPEN_MOUTH\n    threshold: 0.5\n  BACK:\n    blendshape: WINK\n    threshold: 0.5\n  HOME:\n    blendshape: open_mouth\n    threshold: 2.0\n";
        let config = Config::from_yaml(yaml).unwrap();
        let bindings = config.trigger_bindings();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].0, EventType::Home);
        assert_eq!(bindings[0].1.threshold, 1.0);
    }
}
