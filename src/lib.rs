//! Head pointer library for hands-free pointer control.
//!
//! This library turns head pose and facial-expression signals from a face
//! tracker into:
//! - a smoothed, bounded on-screen cursor position
//! - discrete actions fired by held expressions (tap, swipe, drag, home...)
//! - a continuous stream of gesture segments for a host that accepts one
//!   dispatch at a time
//!
//! The control pipeline, run once per tick, consists of:
//! 1. [`cursor_filter::CursorFilter`] normalizing, mapping and smoothing the pose
//! 2. [`region::RegionTracker`] bounding the cursor while a keyboard is open
//! 3. [`event_trigger::EventTriggerLatch`] edge-triggering expression scores
//! 4. [`gesture_stream::GestureStream`] turning cursor motion into host gestures
//!
//! # Examples
//!
//! ## Filtering a pose sample
//!
//! ```no_run
//! use head_pointer::{
//!     config::CursorConfig,
//!     cursor_filter::CursorFilter,
//!     geometry::Rect,
//!     tracking::TrackingFrame,
//! };
//! use std::time::Instant;
//!
//! let screen = Rect::from_size(1920.0, 1080.0);
//! let mut filter = CursorFilter::new(&CursorConfig::default(), screen);
//!
//! let frame = TrackingFrame::new([320.0, 240.0], [330.0, 250.0]);
//! let position = filter.update(&frame, screen, false, Instant::now());
//! println!("Cursor at ({:.0}, {:.0})", position.x, position.y);
//! ```
//!
//! ## Expression triggers
//!
//! ```no_run
//! use head_pointer::event_trigger::{Blendshape, EventTriggerLatch, EventType, TriggerBinding};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let binding = TriggerBinding::new(Blendshape::OpenMouth, 0.5).ok_or("bad threshold")?;
//! let mut latch = EventTriggerLatch::with_bindings([(EventType::CursorTouch, binding)]);
//!
//! let mut scores = vec![0.0; 52];
//! scores[25] = 0.8;
//! if let Some(details) = latch.evaluate(&scores) {
//!     println!("{:?} fired", details.event);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Streaming a gesture
//!
//! ```no_run
//! use head_pointer::gesture_stream::{GestureStream, LoggingHost, StreamSettings};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let stream = GestureStream::spawn(Arc::new(LoggingHost), StreamSettings::default());
//!
//! stream.start(100.0, 100.0);
//! for x in (110..300).step_by(10) {
//!     stream.update(x as f32, 100.0);
//! }
//! stream.end();
//! # }
//! ```
//!
//! ## Complete Pipeline Example
//!
//! ```no_run
//! use head_pointer::{
//!     app::ControlLoop,
//!     config::Config,
//!     gesture_stream::{GestureStream, LoggingHost, StreamSettings},
//!     tracking::SyntheticTracker,
//! };
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::with_default_triggers();
//! let stream = GestureStream::spawn(Arc::new(LoggingHost), StreamSettings::from(&config.stream));
//! let mut control = ControlLoop::new(config, stream);
//!
//! let summary = control.run(SyntheticTracker::new(90), Some(600)).await?;
//! println!("{} events over {} ticks", summary.events, summary.ticks);
//! # Ok(())
//! # }
//! ```

/// Error types and result handling
pub mod error;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

/// Point and rectangle value types
pub mod geometry;

/// Per-frame tracker input and a synthetic source
pub mod tracking;

/// Signal filtering primitives
pub mod filters;

/// Cursor position filter
pub mod cursor_filter;

/// Keyboard region bounding and edge-hold pop-out
pub mod region;

/// Edge-triggered expression-to-event latch
pub mod event_trigger;

/// Continuous gesture streaming to the host
pub mod gesture_stream;

/// X11 host implementation
pub mod cursor_control;

/// Main control loop
pub mod app;

/// Utility functions for coordinate conversion
pub mod utils;

pub use error::{Error, Result};
