use async_trait::async_trait;
use log::info;
use tokio::time::Instant;

use super::{DispatchOutcome, GestureSegment};
use crate::Result;

/// Host input-injection interface for gesture segments.
///
/// Only one dispatch is issued at a time, except that a continuing segment
/// may be superseded by its successor. Implementations resolve when the
/// host reports the segment finished.
#[async_trait]
pub trait GestureHost: Send + Sync {
    async fn dispatch(&self, segment: GestureSegment) -> DispatchOutcome;

    /// The stroke was abandoned; stop any playback and release whatever
    /// the host holds down. Called without waiting for outstanding
    /// dispatches.
    fn cancel(&self) {}
}

/// Touch phase for direct pointer injection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    Down,
    Move,
    Up,
}

/// Raw pointer injection, used to feed motion straight to an input method
pub trait PointerSink: Send {
    fn send_pointer(&mut self, x: i32, y: i32, action: PointerAction) -> Result<()>;
}

/// Host that plays each segment for its duration and logs it
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHost;

#[async_trait]
impl GestureHost for LoggingHost {
    async fn dispatch(&self, segment: GestureSegment) -> DispatchOutcome {
        let started = Instant::now();
        let (fx, fy) = segment.path.first().copied().unwrap_or_default();
        let (lx, ly) = segment.path.last().copied().unwrap_or_default();
        info!(
            "gesture #{} ({:.0},{:.0}) -> ({:.0},{:.0}) over {:?}{}",
            segment.id,
            fx,
            fy,
            lx,
            ly,
            segment.duration,
            if segment.continues { " ..." } else { "" }
        );
        tokio::time::sleep(segment.duration).await;
        DispatchOutcome::Completed(started.elapsed())
    }
}
