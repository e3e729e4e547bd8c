//! Pointer injection for X11-based systems.
//!
//! [`X11Pointer`] implements both host interfaces: gesture segments are
//! played back as a held left button dragged along the segment path, and
//! direct pointer events map onto warp plus XTEST button events.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::time::Instant;
use x11rb::{
    connection::Connection,
    protocol::xproto::{ConnectionExt, Screen, BUTTON_PRESS_EVENT, BUTTON_RELEASE_EVENT},
    protocol::xtest::ConnectionExt as XTestExt,
    rust_connection::RustConnection,
};

use crate::{
    error::{AppError, Result},
    gesture_stream::{DispatchOutcome, GestureHost, GestureSegment, PointerAction, PointerSink},
    utils::safe_cast::f32_to_i32_clamp,
};

const LEFT_BUTTON: u8 = 1;

/// Segment ids start at 1, so no playback matches this
const NO_SEGMENT: u64 = 0;

/// X11 pointer and gesture host
pub struct X11Pointer {
    connection: RustConnection,
    screen: Screen,
    screen_width: u16,
    screen_height: u16,
    /// Id of the newest dispatched segment; older playbacks stop early
    latest_segment: AtomicU64,
}

impl X11Pointer {
    /// Connect to the default display
    pub fn new() -> Result<Self> {
        info!("Initializing X11 pointer");

        let (connection, screen_num) = RustConnection::connect(None)
            .map_err(|e| AppError::X11(format!("Failed to connect to X11: {e}")))?;

        let screen = connection
            .setup()
            .roots
            .get(screen_num)
            .ok_or_else(|| AppError::X11("Failed to get screen".to_string()))?
            .clone();

        let screen_width = screen.width_in_pixels;
        let screen_height = screen.height_in_pixels;

        info!("Connected to X11 display, screen: {}x{}", screen_width, screen_height);

        Ok(Self {
            connection,
            screen,
            screen_width,
            screen_height,
            latest_segment: AtomicU64::new(NO_SEGMENT),
        })
    }

    /// Get screen dimensions
    pub const fn screen_size(&self) -> (u16, u16) {
        (self.screen_width, self.screen_height)
    }

    fn clamp_to_screen(&self, x: i32, y: i32) -> (i16, i16) {
        let max_x = i32::from(self.screen_width.saturating_sub(1));
        let max_y = i32::from(self.screen_height.saturating_sub(1));
        let x = i16::try_from(x.clamp(0, max_x)).unwrap_or(i16::MAX);
        let y = i16::try_from(y.clamp(0, max_y)).unwrap_or(i16::MAX);
        (x, y)
    }

    /// Move the pointer to an absolute position
    pub fn warp(&self, x: i32, y: i32) -> Result<()> {
        let (x, y) = self.clamp_to_screen(x, y);

        self.connection
            .warp_pointer(x11rb::NONE, self.screen.root, 0, 0, 0, 0, x, y)
            .map_err(|e| AppError::CursorControl(format!("Failed to warp pointer: {e}")))?;

        self.connection
            .flush()
            .map_err(|e| AppError::CursorControl(format!("Failed to flush connection: {e}")))?;

        Ok(())
    }

    fn button(&self, pressed: bool) -> Result<()> {
        let event = if pressed { BUTTON_PRESS_EVENT } else { BUTTON_RELEASE_EVENT };
        self.connection
            .xtest_fake_input(event, LEFT_BUTTON, x11rb::CURRENT_TIME, self.screen.root, 0, 0, 0)
            .map_err(|e| AppError::CursorControl(format!("Failed to inject button event: {e}")))?;

        self.connection
            .flush()
            .map_err(|e| AppError::CursorControl(format!("Failed to flush connection: {e}")))?;

        Ok(())
    }

    fn warp_f32(&self, (x, y): (f32, f32)) -> Result<()> {
        self.warp(
            f32_to_i32_clamp(x, 0, i32::from(self.screen_width)),
            f32_to_i32_clamp(y, 0, i32::from(self.screen_height)),
        )
    }

    /// Put the pointer at the start of the segment, pressing on a new stroke
    fn begin(&self, segment: &GestureSegment) -> Result<()> {
        if let Some(&first) = segment.path.first() {
            self.warp_f32(first)?;
            if segment.start_offset.is_zero() {
                self.button(true)?;
            }
        }
        Ok(())
    }

    /// Walk the rest of the path; `false` when a newer segment took over
    async fn play(&self, segment: &GestureSegment) -> Result<bool> {
        let steps = u32::try_from(segment.path.len().saturating_sub(1)).unwrap_or(u32::MAX).max(1);
        let step = segment.duration / steps;
        for &point in segment.path.iter().skip(1) {
            tokio::time::sleep(step).await;
            if self.latest_segment.load(Ordering::Acquire) != segment.id {
                debug!("Segment {} superseded during playback", segment.id);
                return Ok(false);
            }
            self.warp_f32(point)?;
        }

        if !segment.continues {
            self.button(false)?;
        }
        Ok(true)
    }
}

impl PointerSink for X11Pointer {
    fn send_pointer(&mut self, x: i32, y: i32, action: PointerAction) -> Result<()> {
        self.warp(x, y)?;
        match action {
            PointerAction::Down => self.button(true),
            PointerAction::Move => Ok(()),
            PointerAction::Up => self.button(false),
        }
    }
}

#[async_trait]
impl GestureHost for X11Pointer {
    async fn dispatch(&self, segment: GestureSegment) -> DispatchOutcome {
        let started = Instant::now();
        self.latest_segment.store(segment.id, Ordering::Release);

        if let Err(e) = self.begin(&segment) {
            warn!("Gesture segment {} rejected: {e}", segment.id);
            return DispatchOutcome::Rejected;
        }

        match self.play(&segment).await {
            Ok(true) => DispatchOutcome::Completed(started.elapsed()),
            Ok(false) => DispatchOutcome::Cancelled,
            Err(e) => {
                warn!("Gesture playback failed: {e}");
                if let Err(e) = self.button(false) {
                    debug!("Button release after failure also failed: {e}");
                }
                DispatchOutcome::Cancelled
            }
        }
    }

    fn cancel(&self) {
        self.latest_segment.store(NO_SEGMENT, Ordering::Release);
        debug!("Gesture abandoned, releasing button");
        if let Err(e) = self.button(false) {
            warn!("Button release on cancel failed: {e}");
        }
    }
}
