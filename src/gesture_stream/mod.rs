//! Continuous gesture streaming.
//!
//! Buffered cursor positions are turned into a chain of gesture segments
//! for a host that accepts one dispatch at a time. Each segment declares
//! whether another will continue it, so the host sees one contiguous
//! stroke.
//!
//! [`controller::GestureStreamController`] holds the state machine and does
//! no I/O; [`worker::GestureStream`] drives it from a tokio task against a
//! [`host::GestureHost`].

/// Pure streaming state machine
pub mod controller;

/// Host-side dispatch and pointer injection interfaces
pub mod host;

/// Background worker and public handle
pub mod worker;

use std::time::Duration;

use log::warn;
use tokio::time::Instant;

use crate::constants::{
    COMPLETION_HISTORY_LEN, DEFAULT_SEGMENT_MS, EPS_PX, MAX_POINT_AGE_MS, MAX_QUEUE, MIN_PREEMPT_FRACTION,
    MIN_SAMPLE_MS, PREEMPT_FRACTION, START_DEBOUNCE_MS,
};

pub use controller::{GestureStreamController, OutcomeEffect};
pub use host::{GestureHost, LoggingHost, PointerAction, PointerSink};
pub use worker::GestureStream;

/// Stream lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Streaming,
    /// No longer accepting points; draining the queue
    Stopping,
    /// The host cancelled a segment; behaves like `Idle` for `start`
    Error,
}

/// A queued cursor position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamPoint {
    pub x: f32,
    pub y: f32,
    pub enqueued: Instant,
}

/// One dispatchable piece of a stroke
#[derive(Debug, Clone, PartialEq)]
pub struct GestureSegment {
    /// Monotonic id used to match the host's outcome
    pub id: u64,
    /// At least two points; starts where the previous segment ended
    pub path: Vec<(f32, f32)>,
    /// Stream time at which this segment begins
    pub start_offset: Duration,
    pub duration: Duration,
    /// Another segment will continue this stroke
    pub continues: bool,
}

/// How the host finished a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Finished, with the observed latency
    Completed(Duration),
    Cancelled,
    /// Refused without running
    Rejected,
}

/// Snapshot of stream progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamStatus {
    pub state: StreamState,
    pub segments_dispatched: u64,
    pub buffered_points: usize,
    /// Time since the current stream started
    pub elapsed: Option<Duration>,
    /// Duration the next segment would get
    pub segment_duration: Duration,
    pub in_flight: bool,
}

/// Tuning for the stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSettings {
    pub default_segment: Duration,
    pub max_queue: usize,
    pub eps_px: f32,
    pub min_sample_interval: Duration,
    pub start_debounce: Duration,
    pub history_len: usize,
    pub preempt_fraction: f64,
    pub max_point_age: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            default_segment: Duration::from_millis(DEFAULT_SEGMENT_MS),
            max_queue: MAX_QUEUE,
            eps_px: EPS_PX,
            min_sample_interval: Duration::from_millis(MIN_SAMPLE_MS),
            start_debounce: Duration::from_millis(START_DEBOUNCE_MS),
            history_len: COMPLETION_HISTORY_LEN,
            preempt_fraction: PREEMPT_FRACTION,
            max_point_age: Duration::from_millis(MAX_POINT_AGE_MS),
        }
    }
}

impl StreamSettings {
    /// Bring every field into its working range.
    ///
    /// The controller runs this on construction, so settings built by hand
    /// cannot stall the worker.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.default_segment.is_zero() {
            warn!("Stream segment duration is zero, using {:?}", defaults.default_segment);
            self.default_segment = defaults.default_segment;
        }
        if self.max_queue < 4 {
            warn!("Stream queue capacity {} too small, using 4", self.max_queue);
            self.max_queue = 4;
        }
        if !self.eps_px.is_finite() || self.eps_px < 0.0 {
            warn!("Stream epsilon {} invalid, using {}", self.eps_px, defaults.eps_px);
            self.eps_px = defaults.eps_px;
        }
        if self.history_len == 0 {
            self.history_len = defaults.history_len;
        }
        if !self.preempt_fraction.is_finite() {
            warn!("Preempt fraction not finite, using {}", defaults.preempt_fraction);
            self.preempt_fraction = defaults.preempt_fraction;
        } else if !(MIN_PREEMPT_FRACTION..=1.0).contains(&self.preempt_fraction) {
            let clamped = self.preempt_fraction.clamp(MIN_PREEMPT_FRACTION, 1.0);
            warn!("Preempt fraction {} out of range, clamped to {clamped}", self.preempt_fraction);
            self.preempt_fraction = clamped;
        }
        self
    }

    /// Delay before a continuing segment of `duration` is preempted
    pub fn preempt_delay(&self, duration: Duration) -> Duration {
        Duration::try_from_secs_f64(duration.as_secs_f64() * self.preempt_fraction).unwrap_or(duration)
    }
}
