//! Constants used throughout the application

/// Number of expression scores reported by the tracker per frame
pub const BLENDSHAPE_COUNT: usize = 52;

/// Default control tick interval in milliseconds (~60 Hz)
pub const DEFAULT_TICK_MS: u64 = 16;

/// Default screen size used when no display is attached
pub const DEFAULT_SCREEN_WIDTH: f64 = 1920.0;
pub const DEFAULT_SCREEN_HEIGHT: f64 = 1080.0;

/// Default tracker input frame size
pub const DEFAULT_INPUT_WIDTH: f64 = 640.0;
pub const DEFAULT_INPUT_HEIGHT: f64 = 480.0;

/// Smoothing levels run from 0 (pass-through) to this value
pub const MAX_SMOOTHING_LEVEL: u32 = 19;

/// Base of the exponential smoothing-level curve
pub const SMOOTHING_EXP_BASE: f64 = 1.6;

/// Smallest smoothing factor reachable at the maximum level
pub const MIN_SMOOTHING_FACTOR: f64 = 0.02;

/// Default smoothing level
pub const DEFAULT_SMOOTHING_LEVEL: u32 = 5;

/// Path cursor levels run from 0 to this value
pub const MAX_PATH_CURSOR_LEVEL: u32 = 24;

/// Path cursor follow fraction bounds
pub const PATH_CURSOR_MIN_FRACTION: f64 = 0.01;
pub const PATH_CURSOR_MAX_FRACTION: f64 = 0.25;

/// Speed levels and the gain mapping `level * 0.2 + 0.2`
pub const MAX_SPEED_LEVEL: u32 = 10;
pub const DEFAULT_SPEED_LEVEL: u32 = 4;
pub const SPEED_GAIN_STEP: f64 = 0.2;

/// Default head coordinate scale factor
pub const DEFAULT_SCALE_FACTOR: f64 = 1.5;

/// Rolling average window in milliseconds
pub const ROLLING_AVERAGE_WINDOW_MS: u64 = 300;

/// Upper bound on entries kept in the rolling average ring
pub const ROLLING_AVERAGE_CAPACITY: usize = 64;

/// Per-tick fraction of the blended-mode offset that is recentred
pub const DEFAULT_RECENTER_RATE: f64 = 0.01;

/// Head angle ranges (degrees) mapped onto the full screen
pub const DEFAULT_YAW_RANGE_DEG: f64 = 30.0;
pub const DEFAULT_PITCH_RANGE_DEG: f64 = 20.0;

/// Distance (px) from a region edge that counts as touching it
pub const EDGE_TOLERANCE_PX: f64 = 1.0;

/// Default edge hold before a region pop-out (ms)
pub const DEFAULT_EDGE_HOLD_MS: u64 = 1000;

/// Velocity pop-out: how far past the edge (fraction of the shorter screen
/// side), how fast (px per frame), and how often (ms)
pub const FLING_DISTANCE_FRACTION: f64 = 0.18;
pub const FLING_MIN_DRIVE_PX: f64 = 1.0;
pub const FLING_COOLDOWN_MS: u64 = 1000;

/// Gesture stream defaults
pub const DEFAULT_SEGMENT_MS: u64 = 24;
pub const MAX_QUEUE: usize = 64;
pub const EPS_PX: f32 = 1.25;
pub const MIN_SAMPLE_MS: u64 = 10;
pub const START_DEBOUNCE_MS: u64 = 50;
pub const COMPLETION_HISTORY_LEN: usize = 10;
pub const PREEMPT_FRACTION: f64 = 0.8;
pub const MIN_PREEMPT_FRACTION: f64 = 0.1;
pub const MAX_POINT_AGE_MS: u64 = 100;

/// Points per assembled segment
pub const MIN_POINTS_PER_SEGMENT: usize = 3;
pub const MAX_POINTS_PER_SEGMENT: usize = 12;

/// Offset used to give a single-point path a non-zero length
pub const PATH_NUDGE_PX: f32 = 0.1;

/// Swipe length as a fraction of the shorter screen dimension
pub const SWIPE_FRACTION: f64 = 0.3;

/// How long a long touch holds the pointer down (ms)
pub const LONG_TOUCH_MS: u64 = 600;

/// Smart touch hold thresholds (ms): released before the first it taps,
/// after it long-presses; held past the second it long-presses at once
pub const DEFAULT_QUICK_TAP_MS: u64 = 2000;
pub const DEFAULT_LONG_TAP_MS: u64 = 2500;

/// Intermediate points in a generated swipe
pub const SWIPE_STEPS: u32 = 4;
