use std::collections::VecDeque;
use std::time::Duration;

use log::{debug, trace, warn};
use tokio::time::Instant;

use super::{DispatchOutcome, GestureSegment, StreamPoint, StreamSettings, StreamState, StreamStatus};
use crate::constants::{MAX_POINTS_PER_SEGMENT, MIN_POINTS_PER_SEGMENT, PATH_NUDGE_PX};

/// Rolling window of host completion latencies
#[derive(Debug, Clone)]
pub struct CompletionHistory {
    capacity: usize,
    samples: VecDeque<Duration>,
}

impl CompletionHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn record(&mut self, latency: Duration) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(latency);
    }

    pub fn mean(&self) -> Option<Duration> {
        let n = u32::try_from(self.samples.len()).ok().filter(|&n| n > 0)?;
        Some(self.samples.iter().sum::<Duration>() / n)
    }

    /// Mean latency, or `default` when there is none, it is zero, or it is
    /// more than twice `default`
    pub fn estimate(&self, default: Duration) -> Duration {
        match self.mean() {
            Some(mean) if !mean.is_zero() && mean <= default * 2 => mean,
            _ => default,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// What the driver should do after an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeEffect {
    /// Stale or superseded outcome; nothing changed
    Ignored,
    /// The segment finished and the stroke goes on; assemble the next one
    Pump,
    /// The final segment finished; the stream is idle
    Finished,
    /// Host failure; the stream was hard reset
    Reset,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    id: u64,
    continues: bool,
}

/// Streaming state machine.
///
/// Every method takes the current time explicitly, so the controller is
/// deterministic under test. At most one segment is tracked as in flight;
/// preemption retires it as superseded before the next one goes out.
#[derive(Debug)]
pub struct GestureStreamController {
    settings: StreamSettings,
    state: StreamState,
    queue: VecDeque<StreamPoint>,
    history: CompletionHistory,
    in_flight: Option<InFlight>,
    superseded: Vec<u64>,
    last_accepted: Option<StreamPoint>,
    last_emitted: Option<(f32, f32)>,
    /// A continuing segment went out and has not been closed yet
    open_stroke: bool,
    last_start: Option<Instant>,
    started_at: Option<Instant>,
    stream_offset: Duration,
    next_id: u64,
    segments_dispatched: u64,
}

impl GestureStreamController {
    pub fn new(settings: StreamSettings) -> Self {
        let settings = settings.sanitized();
        let history = CompletionHistory::new(settings.history_len);
        Self {
            queue: VecDeque::with_capacity(settings.max_queue),
            settings,
            state: StreamState::Idle,
            history,
            in_flight: None,
            superseded: Vec::new(),
            last_accepted: None,
            last_emitted: None,
            open_stroke: false,
            last_start: None,
            started_at: None,
            stream_offset: Duration::ZERO,
            next_id: 1,
            segments_dispatched: 0,
        }
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    /// Replace the tuning in place.
    ///
    /// The latency history restarts when its length changes and the queue
    /// is trimmed, oldest first, to the new capacity.
    pub fn apply_settings(&mut self, settings: StreamSettings) {
        let settings = settings.sanitized();
        if settings.history_len != self.settings.history_len {
            self.history = CompletionHistory::new(settings.history_len);
        }
        let excess = self.queue.len().saturating_sub(settings.max_queue);
        self.queue.drain(..excess);
        self.settings = settings;
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, StreamState::Streaming | StreamState::Stopping)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Id of the segment currently in flight
    pub fn in_flight_id(&self) -> Option<u64> {
        self.in_flight.map(|f| f.id)
    }

    pub fn history(&self) -> &CompletionHistory {
        &self.history
    }

    /// Begin a stroke at `(x, y)`.
    ///
    /// Refused while a stroke is active or within the debounce window of the
    /// previous start.
    pub fn start(&mut self, x: f32, y: f32, now: Instant) -> bool {
        if self.is_active() {
            debug!("Gesture start ignored, stream already active");
            return false;
        }
        if !(x.is_finite() && y.is_finite()) {
            warn!("Gesture start ignored, non-finite position");
            return false;
        }
        if let Some(last) = self.last_start {
            if now.saturating_duration_since(last) < self.settings.start_debounce {
                debug!("Gesture start debounced");
                return false;
            }
        }

        self.clear_stroke();
        self.history.clear();
        self.last_start = Some(now);
        self.started_at = Some(now);
        self.state = StreamState::Streaming;

        let seed = StreamPoint { x, y, enqueued: now };
        self.queue.push_back(seed);
        self.last_accepted = Some(seed);
        debug!("Gesture stream started at ({x:.1}, {y:.1})");
        true
    }

    /// Queue a position. Returns whether it was accepted.
    pub fn update(&mut self, x: f32, y: f32, now: Instant) -> bool {
        if self.state != StreamState::Streaming || !(x.is_finite() && y.is_finite()) {
            return false;
        }

        if let Some(prev) = self.last_accepted {
            let dx = x - prev.x;
            let dy = y - prev.y;
            let eps = self.settings.eps_px;
            let near = dx * dx + dy * dy < eps * eps;
            let soon = now.saturating_duration_since(prev.enqueued) < self.settings.min_sample_interval;
            if near && soon {
                trace!("Dropping near-duplicate point ({x:.1}, {y:.1})");
                return false;
            }
        }

        let capacity = self.settings.max_queue.max(1);
        if self.queue.len() >= capacity {
            let evict = (capacity / 4).max(1).min(self.queue.len());
            self.queue.drain(..evict);
            debug!("Gesture queue full, evicted {evict} oldest points");
        }

        let point = StreamPoint { x, y, enqueued: now };
        self.queue.push_back(point);
        self.last_accepted = Some(point);
        true
    }

    /// Stop accepting points; the stroke closes once the queue drains
    pub fn end(&mut self) {
        if self.state != StreamState::Streaming {
            return;
        }
        self.state = StreamState::Stopping;
        if self.in_flight.is_none() && self.queue.is_empty() && !self.open_stroke {
            self.finish();
        }
        debug!("Gesture stream ending, {} points buffered", self.queue.len());
    }

    /// Hard reset without waiting for the host
    pub fn cancel(&mut self) {
        if self.state != StreamState::Idle {
            debug!("Gesture stream cancelled in {:?}", self.state);
        }
        self.clear_stroke();
        self.state = StreamState::Idle;
    }

    /// Cancel and start again immediately, bypassing the debounce
    pub fn restart(&mut self, x: f32, y: f32, now: Instant) -> bool {
        self.cancel();
        self.last_start = None;
        self.start(x, y, now)
    }

    /// Assemble the next segment if nothing is in flight
    pub fn next_segment(&mut self, now: Instant) -> Option<GestureSegment> {
        if self.in_flight.is_some() || !self.is_active() {
            return None;
        }

        self.evict_aged(now);

        if self.queue.is_empty() {
            if self.state == StreamState::Stopping {
                if self.open_stroke {
                    return self.terminal_segment();
                }
                self.finish();
            }
            return None;
        }

        let depth = self.queue.len();
        let count = (MIN_POINTS_PER_SEGMENT + depth / 8)
            .clamp(MIN_POINTS_PER_SEGMENT, MAX_POINTS_PER_SEGMENT)
            .min(depth);

        let mut path = Vec::with_capacity(count + 2);
        if let Some(last) = self.last_emitted {
            path.push(last);
        }
        path.extend(self.queue.drain(..count).map(|p| (p.x, p.y)));
        if path.len() == 1 {
            let (x, y) = path[0];
            path.push((x + PATH_NUDGE_PX, y + PATH_NUDGE_PX));
        }

        let continues = self.state == StreamState::Streaming || !self.queue.is_empty();
        Some(self.emit(path, continues))
    }

    fn terminal_segment(&mut self) -> Option<GestureSegment> {
        let (x, y) = self.last_emitted?;
        let path = vec![(x, y), (x + PATH_NUDGE_PX, y + PATH_NUDGE_PX)];
        Some(self.emit(path, false))
    }

    fn emit(&mut self, path: Vec<(f32, f32)>, continues: bool) -> GestureSegment {
        let duration = self.history.estimate(self.settings.default_segment);
        let id = self.next_id;
        self.next_id += 1;

        let segment = GestureSegment {
            id,
            start_offset: self.stream_offset,
            duration,
            continues,
            path,
        };

        self.stream_offset += duration;
        self.last_emitted = segment.path.last().copied();
        self.open_stroke = continues;
        self.in_flight = Some(InFlight { id, continues });
        self.segments_dispatched += 1;
        trace!(
            "Segment {} with {} points, {:?}, continues={}",
            id,
            segment.path.len(),
            duration,
            continues
        );
        segment
    }

    /// Dispatch the next segment ahead of the in-flight one's completion.
    ///
    /// Only applies when `id` is still the in-flight continuing segment and
    /// there is something to send; the in-flight segment is then retired as
    /// superseded.
    pub fn preempt(&mut self, id: u64, now: Instant) -> Option<GestureSegment> {
        let current = self.in_flight?;
        if current.id != id || !current.continues {
            return None;
        }
        let pending = !self.queue.is_empty() || self.state == StreamState::Stopping;
        if !pending {
            return None;
        }

        self.in_flight = None;
        match self.next_segment(now) {
            Some(segment) => {
                self.superseded.push(id);
                debug!("Segment {} superseded by {}", id, segment.id);
                Some(segment)
            }
            None => {
                if self.is_active() {
                    self.in_flight = Some(current);
                }
                None
            }
        }
    }

    /// Apply the host's outcome for segment `id`
    pub fn on_outcome(&mut self, id: u64, outcome: DispatchOutcome, now: Instant) -> OutcomeEffect {
        if let Some(pos) = self.superseded.iter().position(|&s| s == id) {
            self.superseded.swap_remove(pos);
            if let DispatchOutcome::Completed(latency) = outcome {
                self.history.record(latency);
            }
            return OutcomeEffect::Ignored;
        }

        let Some(current) = self.in_flight.filter(|f| f.id == id) else {
            trace!("Ignoring outcome for unknown segment {id}");
            return OutcomeEffect::Ignored;
        };
        self.in_flight = None;

        match outcome {
            DispatchOutcome::Completed(latency) => {
                self.history.record(latency);
                if current.continues {
                    OutcomeEffect::Pump
                } else {
                    self.finish();
                    debug!(
                        "Gesture stream finished after {:?}",
                        self.started_at.map(|s| now.saturating_duration_since(s))
                    );
                    OutcomeEffect::Finished
                }
            }
            DispatchOutcome::Cancelled => {
                warn!("Host cancelled segment {id}, resetting stream");
                self.clear_stroke();
                self.state = StreamState::Error;
                OutcomeEffect::Reset
            }
            DispatchOutcome::Rejected => {
                warn!("Host rejected segment {id}, resetting stream");
                self.clear_stroke();
                self.state = StreamState::Idle;
                OutcomeEffect::Reset
            }
        }
    }

    pub fn status(&self, now: Instant) -> StreamStatus {
        StreamStatus {
            state: self.state,
            segments_dispatched: self.segments_dispatched,
            buffered_points: self.queue.len(),
            elapsed: self
                .started_at
                .filter(|_| self.is_active())
                .map(|s| now.saturating_duration_since(s)),
            segment_duration: self.history.estimate(self.settings.default_segment),
            in_flight: self.in_flight.is_some(),
        }
    }

    /// Drop points older than the maximum age, always keeping the newest
    fn evict_aged(&mut self, now: Instant) {
        while self.queue.len() > 1 {
            match self.queue.front() {
                Some(p) if now.saturating_duration_since(p.enqueued) > self.settings.max_point_age => {
                    self.queue.pop_front();
                }
                _ => break,
            }
        }
    }

    fn finish(&mut self) {
        self.clear_stroke();
        self.state = StreamState::Idle;
    }

    fn clear_stroke(&mut self) {
        self.queue.clear();
        self.in_flight = None;
        self.superseded.clear();
        self.last_accepted = None;
        self.last_emitted = None;
        self.open_stroke = false;
        self.started_at = None;
        self.stream_offset = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_history_estimate_fallbacks() {
        let default = ms(24);
        let mut h = CompletionHistory::new(3);
        assert_eq!(h.estimate(default), default);

        h.record(Duration::ZERO);
        assert_eq!(h.estimate(default), default);

        h.record(ms(30));
        h.record(ms(30));
        assert_eq!(h.estimate(default), ms(20));

        // Window of three: 30, 30, 200 -> mean above 2x default
        h.record(ms(200));
        assert_eq!(h.len(), 3);
        assert_eq!(h.estimate(default), default);
    }

    #[test]
    fn test_start_debounce() {
        let t0 = Instant::now();
        let mut c = GestureStreamController::new(StreamSettings::default());
        assert!(c.start(1.0, 1.0, t0));
        c.cancel();
        assert!(!c.start(1.0, 1.0, t0 + ms(49)));
        assert!(c.start(1.0, 1.0, t0 + ms(50)));
    }

    #[test]
    fn test_restart_bypasses_debounce() {
        let t0 = Instant::now();
        let mut c = GestureStreamController::new(StreamSettings::default());
        assert!(c.start(1.0, 1.0, t0));
        assert!(!c.start(2.0, 2.0, t0 + ms(1)));
        assert!(c.restart(2.0, 2.0, t0 + ms(1)));
        assert_eq!(c.queue_len(), 1);
    }

    #[test]
    fn test_single_point_path_nudged() {
        let t0 = Instant::now();
        let mut c = GestureStreamController::new(StreamSettings::default());
        c.start(10.0, 20.0, t0);
        let seg = c.next_segment(t0).unwrap();
        assert_eq!(seg.path.len(), 2);
        assert_eq!(seg.path[0], (10.0, 20.0));
        assert!((seg.path[1].0 - 10.1).abs() < 1e-5);
        assert!(seg.continues);
        assert!(c.next_segment(t0).is_none());
    }

    #[test]
    fn test_adaptive_point_count() {
        let t0 = Instant::now();
        let mut c = GestureStreamController::new(StreamSettings::default());
        c.start(0.0, 0.0, t0);
        for i in 1..40 {
            c.update(i as f32 * 10.0, 0.0, t0);
        }
        // depth 40 -> 3 + 5 = 8 points
        let seg = c.next_segment(t0).unwrap();
        assert_eq!(seg.path.len(), 8);
        assert_eq!(c.queue_len(), 32);
    }

    #[test]
    fn test_aged_points_evicted_but_newest_kept() {
        let t0 = Instant::now();
        let mut c = GestureStreamController::new(StreamSettings::default());
        c.start(0.0, 0.0, t0);
        c.update(50.0, 0.0, t0 + ms(5));
        let seg = c.next_segment(t0 + ms(500)).unwrap();
        assert_eq!(seg.path[0], (50.0, 0.0));
    }

    #[test]
    fn test_end_with_open_stroke_emits_terminal() {
        let t0 = Instant::now();
        let mut c = GestureStreamController::new(StreamSettings::default());
        c.start(10.0, 10.0, t0);
        let first = c.next_segment(t0).unwrap();
        assert!(first.continues);
        c.end();
        assert_eq!(c.on_outcome(first.id, DispatchOutcome::Completed(ms(24)), t0 + ms(24)), OutcomeEffect::Pump);

        let last = c.next_segment(t0 + ms(24)).unwrap();
        assert!(!last.continues);
        assert_eq!(last.path[0], *first.path.last().unwrap());
        assert_eq!(last.start_offset, ms(24));
        assert_eq!(c.on_outcome(last.id, DispatchOutcome::Completed(ms(24)), t0 + ms(48)), OutcomeEffect::Finished);
        assert_eq!(c.state(), StreamState::Idle);
    }

    #[test]
    fn test_cancelled_outcome_enters_error() {
        let t0 = Instant::now();
        let mut c = GestureStreamController::new(StreamSettings::default());
        c.start(10.0, 10.0, t0);
        let seg = c.next_segment(t0).unwrap();
        c.update(40.0, 10.0, t0 + ms(5));
        assert_eq!(c.on_outcome(seg.id, DispatchOutcome::Cancelled, t0 + ms(10)), OutcomeEffect::Reset);
        assert_eq!(c.state(), StreamState::Error);
        assert_eq!(c.queue_len(), 0);
        assert!(c.start(1.0, 1.0, t0 + ms(100)));
    }

    #[test]
    fn test_unknown_outcome_ignored() {
        let t0 = Instant::now();
        let mut c = GestureStreamController::new(StreamSettings::default());
        c.start(10.0, 10.0, t0);
        let seg = c.next_segment(t0).unwrap();
        assert_eq!(c.on_outcome(seg.id + 7, DispatchOutcome::Rejected, t0), OutcomeEffect::Ignored);
        assert_eq!(c.in_flight_id(), Some(seg.id));
    }

    #[test]
    fn test_status() {
        let t0 = Instant::now();
        let mut c = GestureStreamController::new(StreamSettings::default());
        c.start(10.0, 10.0, t0);
        c.update(20.0, 10.0, t0 + ms(3));
        let status = c.status(t0 + ms(8));
        assert_eq!(status.state, StreamState::Streaming);
        assert_eq!(status.buffered_points, 2);
        assert_eq!(status.elapsed, Some(ms(8)));
        assert_eq!(status.segment_duration, ms(24));
        assert!(!status.in_flight);
    }
}
