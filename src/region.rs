//! Active bounding region and the edge-hold pop-out timer.
//!
//! While the on-screen keyboard is open the cursor is confined to one of up
//! to three stacked regions: the area above the keyboard, the keyboard
//! itself and the navigation bar below it. Holding the cursor on an edge
//! that borders another region for the configured duration moves it across.
//! With the edge hold disabled, a hard push past such an edge does instead.

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::config::RegionConfig;
use crate::constants::{EDGE_TOLERANCE_PX, FLING_COOLDOWN_MS, FLING_DISTANCE_FRACTION, FLING_MIN_DRIVE_PX};
use crate::geometry::{Point, Rect};

/// Which rectangle currently bounds the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    NoRegion,
    Top,
    Keyboard,
    NavBar,
}

/// Keyboard and navigation bar bounds reported by the keyboard
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyboardBounds {
    pub keyboard: Rect,
    pub nav_bar: Option<Rect>,
}

/// A region change produced by an edge hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionTransition {
    pub from: RegionKind,
    pub to: RegionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Top,
    Bottom,
}

/// Region state machine
pub struct RegionTracker {
    screen: Rect,
    pop_out: bool,
    velocity_pop_out: bool,
    edge_hold: Duration,
    bounds: Option<KeyboardBounds>,
    current: RegionKind,
    hold: Option<(Edge, Instant)>,
    last_fling: Option<Instant>,
}

impl RegionTracker {
    pub fn new(config: &RegionConfig, screen: Rect) -> Self {
        Self {
            screen,
            pop_out: config.duration_pop_out,
            velocity_pop_out: config.velocity_pop_out,
            edge_hold: config.edge_hold(),
            bounds: None,
            current: RegionKind::NoRegion,
            hold: None,
            last_fling: None,
        }
    }

    pub fn apply_config(&mut self, config: &RegionConfig) {
        self.pop_out = config.duration_pop_out;
        self.velocity_pop_out = config.velocity_pop_out;
        self.edge_hold = config.edge_hold();
        self.hold = None;
    }

    pub fn set_screen(&mut self, screen: Rect) {
        self.screen = screen;
    }

    /// Install keyboard bounds; the starting region is chosen from the
    /// cursor's vertical position.
    pub fn set_keyboard_bounds(&mut self, bounds: KeyboardBounds, cursor_y: f64) {
        if !bounds.keyboard.is_valid() {
            warn!("Ignoring invalid keyboard bounds {:?}", bounds.keyboard);
            self.clear();
            return;
        }
        let nav_bar = bounds.nav_bar.filter(Rect::is_valid);
        self.bounds = Some(KeyboardBounds {
            keyboard: bounds.keyboard,
            nav_bar,
        });
        self.hold = None;

        self.current = if cursor_y < bounds.keyboard.top && self.rect_for(RegionKind::Top).is_some() {
            RegionKind::Top
        } else if nav_bar.is_some_and(|nav| cursor_y >= nav.top) {
            RegionKind::NavBar
        } else {
            RegionKind::Keyboard
        };
        info!("Keyboard region installed, cursor in {:?}", self.current);
    }

    /// Remove the region and reset the hold timer
    pub fn clear(&mut self) {
        if self.bounds.is_some() {
            debug!("Keyboard region cleared");
        }
        self.bounds = None;
        self.current = RegionKind::NoRegion;
        self.hold = None;
    }

    pub fn current(&self) -> RegionKind {
        self.current
    }

    /// Rectangle bounding the cursor, if a region is active
    pub fn active_bounds(&self) -> Option<Rect> {
        self.rect_for(self.current)
    }

    /// Active region or the whole screen
    pub fn bounds_or_screen(&self) -> Rect {
        self.active_bounds().unwrap_or(self.screen)
    }

    /// Whether an edge hold is in progress
    pub fn is_holding(&self) -> bool {
        self.hold.is_some()
    }

    fn rect_for(&self, kind: RegionKind) -> Option<Rect> {
        let bounds = self.bounds?;
        match kind {
            RegionKind::NoRegion => None,
            RegionKind::Keyboard => Some(bounds.keyboard),
            RegionKind::NavBar => bounds.nav_bar,
            RegionKind::Top => {
                let top = Rect::new(self.screen.left, self.screen.top, self.screen.right, bounds.keyboard.top);
                top.is_valid().then_some(top)
            }
        }
    }

    fn neighbour(&self, edge: Edge) -> Option<RegionKind> {
        let next = match (self.current, edge) {
            (RegionKind::Top, Edge::Bottom) | (RegionKind::NavBar, Edge::Top) => RegionKind::Keyboard,
            (RegionKind::Keyboard, Edge::Top) => RegionKind::Top,
            (RegionKind::Keyboard, Edge::Bottom) => RegionKind::NavBar,
            _ => return None,
        };
        self.rect_for(next).map(|_| next)
    }

    /// Advance the edge-hold timer.
    ///
    /// Returns the transition when the cursor has held an edge bordering
    /// another region for the configured duration. At most one transition
    /// per call.
    pub fn update(&mut self, cursor: Point, now: Instant, event_active: bool) -> Option<RegionTransition> {
        if !self.pop_out || event_active {
            self.hold = None;
            return None;
        }
        let rect = self.active_bounds()?;

        let edge = if (cursor.y - rect.top).abs() <= EDGE_TOLERANCE_PX && self.neighbour(Edge::Top).is_some() {
            Edge::Top
        } else if (cursor.y - rect.bottom).abs() <= EDGE_TOLERANCE_PX && self.neighbour(Edge::Bottom).is_some() {
            Edge::Bottom
        } else {
            self.hold = None;
            return None;
        };

        let started = match self.hold {
            Some((held, start)) if held == edge => start,
            _ => {
                self.hold = Some((edge, now));
                now
            }
        };

        if now.saturating_duration_since(started) < self.edge_hold {
            return None;
        }

        let to = self.neighbour(edge)?;
        let transition = RegionTransition { from: self.current, to };
        self.current = to;
        self.hold = None;
        info!("Region pop-out {:?} -> {:?}", transition.from, transition.to);
        Some(transition)
    }

    /// Velocity pop-out, active only when the edge hold is disabled.
    ///
    /// `overshoot` is how far (signed px) the cursor target lies above or
    /// below the active region and `drive` its vertical motion per frame.
    /// A target pushed far enough past an edge bordering another region,
    /// fast enough, moves the cursor there; edges flush with the screen
    /// never pop. At most one pop-out per cooldown.
    pub fn fling(&mut self, overshoot: f64, drive: f64, now: Instant, event_active: bool) -> Option<RegionTransition> {
        if self.pop_out || !self.velocity_pop_out || event_active {
            return None;
        }
        let cooldown = Duration::from_millis(FLING_COOLDOWN_MS);
        if self.last_fling.is_some_and(|t| now.saturating_duration_since(t) < cooldown) {
            return None;
        }

        let distance = FLING_DISTANCE_FRACTION * self.screen.width().min(self.screen.height());
        if !(overshoot.abs() > distance && drive.abs() > FLING_MIN_DRIVE_PX) {
            return None;
        }
        let edge = if overshoot < 0.0 { Edge::Top } else { Edge::Bottom };
        let to = self.neighbour(edge)?;

        let transition = RegionTransition { from: self.current, to };
        self.current = to;
        self.hold = None;
        self.last_fling = Some(now);
        info!("Region fling {:?} -> {:?}", transition.from, transition.to);
        Some(transition)
    }
}
