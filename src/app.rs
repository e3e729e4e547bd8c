//! Per-tick control loop wiring the cursor, region, trigger and stream
//! components together.

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::{
    config::Config,
    constants::{LONG_TOUCH_MS, SWIPE_FRACTION, SWIPE_STEPS},
    cursor_filter::CursorFilter,
    error::Result,
    event_trigger::{EventDetails, EventTriggerLatch, EventType, Labels},
    geometry::{Point, Rect},
    gesture_stream::{GestureStream, PointerAction, PointerSink, StreamSettings},
    region::{KeyboardBounds, RegionKind, RegionTracker, RegionTransition},
    tracking::TrackingFrame,
    utils::{to_pixel, to_stream_point},
};

/// Actions that leave the pointer pipeline and go to the desktop shell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalAction {
    Home,
    Back,
    ShowNotification,
    ShowApps,
    DeletePreviousWord,
    /// Cursor movement paused (`true`) or resumed
    Pause(bool),
    /// Cursor re-centred
    Reset,
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutput {
    pub cursor: Point,
    pub path_cursor: Point,
    pub region: RegionKind,
    pub event: Option<EventDetails>,
    pub transition: Option<RegionTransition>,
    pub action: Option<GlobalAction>,
}

/// Totals reported by [`ControlLoop::run`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub events: u64,
    pub transitions: u64,
    pub segments: u64,
}

/// A smart touch being held: where and when it began
#[derive(Debug, Clone, Copy)]
struct SmartTouch {
    started: Instant,
    at: Point,
}

/// Main control loop
pub struct ControlLoop {
    config: Config,
    screen: Rect,
    cursor: CursorFilter,
    region: RegionTracker,
    latch: EventTriggerLatch,
    labels: Labels,
    stream: GestureStream,
    pointer_sink: Option<Box<dyn PointerSink>>,
    paused: bool,
    dragging: bool,
    direct_motion: bool,
    long_touch_until: Option<Instant>,
    smart_touch: Option<SmartTouch>,
}

impl ControlLoop {
    /// Build the loop; the configuration is sanitized first
    pub fn new(mut config: Config, stream: GestureStream) -> Self {
        config.sanitize();
        let screen = Rect::from_size(config.screen.width, config.screen.height);
        let cursor = CursorFilter::new(&config.cursor, screen);
        let region = RegionTracker::new(&config.region, screen);
        let latch = EventTriggerLatch::with_bindings(config.trigger_bindings());

        info!(
            "Control loop ready: {}x{} screen, {} trigger bindings",
            screen.width(),
            screen.height(),
            config.triggers.len()
        );

        Self {
            config,
            screen,
            cursor,
            region,
            latch,
            labels: Labels::new(),
            stream,
            pointer_sink: None,
            paused: false,
            dragging: false,
            direct_motion: false,
            long_touch_until: None,
            smart_touch: None,
        }
    }

    /// Route continuous touches inside the keyboard straight to a pointer
    /// sink instead of the gesture stream
    #[must_use]
    pub fn with_pointer_sink(mut self, sink: Box<dyn PointerSink>) -> Self {
        self.pointer_sink = Some(sink);
        self
    }

    /// Apply a new configuration without losing cursor state; a stroke in
    /// progress carries on under the new stream settings
    pub fn apply_config(&mut self, mut config: Config) {
        config.sanitize();
        self.screen = Rect::from_size(config.screen.width, config.screen.height);
        self.cursor.set_screen(self.screen);
        self.cursor.apply_config(&config.cursor);
        self.region.set_screen(self.screen);
        self.region.apply_config(&config.region);
        self.latch = EventTriggerLatch::with_bindings(config.trigger_bindings());
        self.stream.apply_settings(StreamSettings::from(&config.stream));
        self.config = config;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cursor(&self) -> &CursorFilter {
        &self.cursor
    }

    pub fn region(&self) -> &RegionTracker {
        &self.region
    }

    pub fn stream(&self) -> &GestureStream {
        &self.stream
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Keyboard opened (`Some`) or closed (`None`)
    pub fn on_keyboard_bounds(&mut self, bounds: Option<KeyboardBounds>) {
        match bounds {
            Some(bounds) => self.region.set_keyboard_bounds(bounds, self.cursor.position().y),
            None => self.region.clear(),
        }
    }

    /// Run one control tick
    pub fn tick(&mut self, frame: &TrackingFrame, now: Instant) -> TickOutput {
        let mut output = TickOutput {
            cursor: self.cursor.position(),
            path_cursor: self.cursor.path_position(),
            region: self.region.current(),
            event: None,
            transition: None,
            action: None,
        };

        if !frame.is_face_visible {
            return output;
        }

        let event_active = self.latch.any_active();
        if !self.paused {
            let bounds = self.region.bounds_or_screen();
            output.cursor = self.cursor.update(frame, bounds, event_active, now);
            output.path_cursor = self.cursor.path_position();
        }

        output.transition = self.region.update(output.cursor, now, event_active);
        if output.transition.is_none() && !self.paused {
            let (overshoot, drive) = (self.cursor.overshoot(), self.cursor.drive());
            output.transition = self.region.fling(overshoot.y, drive.y, now, event_active);
        }
        output.region = self.region.current();

        if let Some(event) = self.latch.evaluate(&frame.blendshapes) {
            output.event = Some(event);
            output.action = self.handle_event(event, output.cursor, now);
        }

        self.follow(self.cursor.position(), now);
        output
    }

    /// Feed the cursor into whatever touch is currently held
    fn follow(&mut self, cursor: Point, now: Instant) {
        if self.long_touch_until.is_some_and(|until| now >= until) {
            self.long_touch_until = None;
            self.stream.end();
        }

        if let Some(touch) = self.smart_touch {
            if now.saturating_duration_since(touch.started) >= self.config.cursor.long_tap() {
                debug!("Smart touch held past the long tap threshold");
                self.smart_touch = None;
                self.long_press(touch.at, now);
            }
        }

        if self.direct_motion {
            self.send_direct(cursor, PointerAction::Move);
        } else if self.stream.is_active() {
            let (x, y) = to_stream_point(cursor);
            self.stream.update(x, y);
        }
    }

    fn handle_event(&mut self, details: EventDetails, cursor: Point, now: Instant) -> Option<GlobalAction> {
        let event = details.event;
        info!(
            "{} {} ({})",
            self.labels.event(event),
            if details.is_starting_event { "start" } else { "release" },
            self.labels.blendshape(details.blendshape)
        );

        let keeps_drag = matches!(
            event,
            EventType::DragToggle
                | EventType::ToggleTouch
                | EventType::ContinuousTouch
                | EventType::EndTouch
                | EventType::BeginTouch
        );
        if self.dragging && !keeps_drag {
            debug!("Drag cancelled by {}", event.key());
            self.dragging = false;
            self.stream.cancel();
        }

        let (x, y) = to_stream_point(cursor);
        match event {
            EventType::CursorTouch => {
                self.stream.start(x, y);
                self.stream.end();
            }
            EventType::CursorLongTouch => self.long_press(cursor, now),
            EventType::ContinuousTouch => self.hold_touch(details.is_starting_event, cursor),
            EventType::SmartTouch => self.smart_touch_event(details.is_starting_event, cursor, now),
            EventType::BeginTouch | EventType::SwipeStart => {
                self.stream.start(x, y);
            }
            EventType::EndTouch | EventType::SwipeStop => self.stream.end(),
            EventType::ToggleTouch => {
                if self.stream.is_active() {
                    self.stream.end();
                } else {
                    self.stream.start(x, y);
                }
            }
            EventType::DragToggle => {
                if self.dragging {
                    self.dragging = false;
                    self.stream.end();
                } else {
                    self.dragging = self.stream.start(x, y);
                }
            }
            EventType::SwipeLeft => self.swipe(cursor, -1.0, 0.0),
            EventType::SwipeRight => self.swipe(cursor, 1.0, 0.0),
            EventType::SwipeUp => self.swipe(cursor, 0.0, -1.0),
            EventType::SwipeDown => self.swipe(cursor, 0.0, 1.0),
            EventType::CursorPause => {
                self.paused = !self.paused;
                return Some(GlobalAction::Pause(self.paused));
            }
            EventType::CursorReset => {
                self.cursor.reset_to_center(self.region.bounds_or_screen());
                return Some(GlobalAction::Reset);
            }
            EventType::Home => return Some(GlobalAction::Home),
            EventType::Back => return Some(GlobalAction::Back),
            EventType::ShowNotification => return Some(GlobalAction::ShowNotification),
            EventType::ShowApps => return Some(GlobalAction::ShowApps),
            EventType::DeletePreviousWord => return Some(GlobalAction::DeletePreviousWord),
        }
        None
    }

    /// Press at `at` and lift after the long touch delay
    fn long_press(&mut self, at: Point, now: Instant) {
        let (x, y) = to_stream_point(at);
        if self.stream.start(x, y) {
            self.long_touch_until = Some(now + Duration::from_millis(LONG_TOUCH_MS));
        }
    }

    /// Decide between a tap and a long press from how long the expression
    /// was held; both land where the touch began
    fn smart_touch_event(&mut self, starting: bool, cursor: Point, now: Instant) {
        if starting {
            if self.smart_touch.is_none() {
                self.smart_touch = Some(SmartTouch { started: now, at: cursor });
            }
            return;
        }
        let Some(touch) = self.smart_touch.take() else {
            return;
        };
        if now.saturating_duration_since(touch.started) < self.config.cursor.quick_tap() {
            let (x, y) = to_stream_point(touch.at);
            self.stream.start(x, y);
            self.stream.end();
        } else {
            self.long_press(touch.at, now);
        }
    }

    /// Press on start, lift on release; inside the keyboard this goes
    /// straight to the pointer sink when one is attached
    fn hold_touch(&mut self, starting: bool, cursor: Point) {
        let use_sink = self.pointer_sink.is_some() && self.region.current() == RegionKind::Keyboard;
        if starting {
            if use_sink {
                self.direct_motion = true;
                self.send_direct(cursor, PointerAction::Down);
            } else {
                let (x, y) = to_stream_point(cursor);
                self.stream.start(x, y);
            }
        } else if self.direct_motion {
            self.send_direct(cursor, PointerAction::Up);
            self.direct_motion = false;
        } else {
            self.stream.end();
        }
    }

    fn send_direct(&mut self, cursor: Point, action: PointerAction) {
        let (x, y) = to_pixel(cursor, self.screen);
        if let Some(sink) = self.pointer_sink.as_mut() {
            if let Err(e) = sink.send_pointer(x, y, action) {
                warn!("Direct pointer injection failed: {e}");
                self.direct_motion = false;
            }
        }
    }

    /// Start, drag along a straight line and lift
    fn swipe(&mut self, from: Point, dx: f64, dy: f64) {
        let length = SWIPE_FRACTION * self.screen.width().min(self.screen.height());
        let (x, y) = to_stream_point(from);
        if !self.stream.start(x, y) {
            return;
        }
        for step in 1..=SWIPE_STEPS {
            let t = f64::from(step) / f64::from(SWIPE_STEPS);
            let p = Point::new(
                (from.x + dx * length * t).clamp(self.screen.left, self.screen.right),
                (from.y + dy * length * t).clamp(self.screen.top, self.screen.bottom),
            );
            let (px, py) = to_stream_point(p);
            self.stream.update(px, py);
        }
        self.stream.end();
    }

    /// Drive the loop from a frame source at the configured tick rate
    pub async fn run<I>(&mut self, frames: I, max_ticks: Option<u64>) -> Result<RunSummary>
    where
        I: IntoIterator<Item = TrackingFrame>,
    {
        info!("Starting control loop");
        let mut interval = tokio::time::interval(Duration::from_millis(self.config.tick.interval_ms));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut summary = RunSummary::default();

        for frame in frames {
            if max_ticks.is_some_and(|max| summary.ticks >= max) {
                break;
            }
            interval.tick().await;
            let now = tokio::time::Instant::now().into_std();
            let output = self.tick(&frame, now);

            summary.ticks += 1;
            summary.events += u64::from(output.event.is_some());
            summary.transitions += u64::from(output.transition.is_some());
            if let Some(action) = output.action {
                info!("Global action: {:?}", action);
            }
        }

        self.stream.end();
        summary.segments = self.stream.status().segments_dispatched;
        info!(
            "Control loop finished: {} ticks, {} events, {} segments",
            summary.ticks, summary.events, summary.segments
        );
        Ok(summary)
    }
}
