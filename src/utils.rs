//! Utility functions for coordinate conversion at the host boundary.

pub mod safe_cast;

use crate::geometry::{Point, Rect};
use safe_cast::{f64_to_f32_saturating, f64_to_i32_clamp};

/// Integer pixel inside `screen` for a cursor position
#[must_use]
pub fn to_pixel(p: Point, screen: Rect) -> (i32, i32) {
    let max_x = f64_to_i32_clamp(screen.right - 1.0, 0, i32::MAX);
    let max_y = f64_to_i32_clamp(screen.bottom - 1.0, 0, i32::MAX);
    (f64_to_i32_clamp(p.x, 0, max_x), f64_to_i32_clamp(p.y, 0, max_y))
}

/// Cursor position as the `f32` pair the gesture stream takes
#[must_use]
pub fn to_stream_point(p: Point) -> (f32, f32) {
    (f64_to_f32_saturating(p.x), f64_to_f32_saturating(p.y))
}
