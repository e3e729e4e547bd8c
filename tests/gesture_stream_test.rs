//! Gesture streaming: controller scenarios and the worker against a
//! recording host


use std::sync::Arc;
use std::time::Duration;

use head_pointer::config::Config;
use head_pointer::gesture_stream::{
    DispatchOutcome, GestureStream, GestureStreamController, OutcomeEffect, StreamSettings, StreamState,
};
use test_helpers::{assert_contiguous, ms, RecordingHost};
use tokio::time::Instant;

fn controller() -> GestureStreamController {
    GestureStreamController::new(StreamSettings::default())
}

#[test]
fn test_short_stroke_makes_one_final_segment() {
    let mut c = controller();
    let t0 = Instant::now();

    assert!(c.start(100.0, 100.0, t0));
    assert!(c.update(105.0, 100.0, t0));
    assert!(!c.update(105.0, 100.0, t0));
    assert!(!c.update(105.0, 100.0, t0));
    c.end();
    assert_eq!(c.state(), StreamState::Stopping);

    let segment = c.next_segment(t0).unwrap();
    assert_eq!(segment.path, vec![(100.0, 100.0), (105.0, 100.0)]);
    assert!(!segment.continues);
    assert_eq!(segment.start_offset, Duration::ZERO);
    assert_eq!(segment.duration, StreamSettings::default().default_segment);

    let effect = c.on_outcome(segment.id, DispatchOutcome::Completed(ms(20)), t0 + ms(20));
    assert_eq!(effect, OutcomeEffect::Finished);
    assert_eq!(c.state(), StreamState::Idle);
    assert_eq!(c.queue_len(), 0);
}

#[test]
fn test_start_end_without_motion_is_a_tap() {
    let mut c = controller();
    let t0 = Instant::now();
    c.start(50.0, 60.0, t0);
    c.end();

    let segment = c.next_segment(t0).unwrap();
    assert_eq!(segment.path.len(), 2);
    assert_eq!(segment.path[0], (50.0, 60.0));
    assert!(!segment.continues);
    assert_eq!(
        c.on_outcome(segment.id, DispatchOutcome::Completed(ms(24)), t0),
        OutcomeEffect::Finished
    );
}

#[test]
fn test_one_segment_in_flight() {
    let mut c = controller();
    let t0 = Instant::now();
    c.start(0.0, 0.0, t0);
    for i in 1..10 {
        c.update(i as f32 * 10.0, 0.0, t0);
    }

    let first = c.next_segment(t0).unwrap();
    assert!(first.continues);
    assert!(c.next_segment(t0).is_none());
    assert_eq!(c.in_flight_id(), Some(first.id));

    assert_eq!(
        c.on_outcome(first.id, DispatchOutcome::Completed(ms(24)), t0),
        OutcomeEffect::Pump
    );
    let second = c.next_segment(t0).unwrap();
    assert_eq!(second.path.first(), first.path.last());
    assert_eq!(second.start_offset, first.start_offset + first.duration);
}

#[test]
fn test_queue_capacity_keeps_newest() {
    let settings = StreamSettings::default();
    let mut c = controller();
    let t0 = Instant::now();
    c.start(0.0, 0.0, t0);
    for i in 1..=200 {
        c.update(i as f32 * 5.0, 0.0, t0);
        assert!(c.queue_len() <= settings.max_queue);
    }

    let segment = c.next_segment(t0).unwrap();
    assert!(segment.path.len() <= 12);
    // Oldest points were evicted, so the stroke no longer begins at the seed
    assert_ne!(segment.path[0], (0.0, 0.0));

    let mut last = segment.path.last().copied();
    c.on_outcome(segment.id, DispatchOutcome::Completed(ms(24)), t0);
    while let Some(s) = c.next_segment(t0) {
        last = s.path.last().copied();
        c.on_outcome(s.id, DispatchOutcome::Completed(ms(24)), t0);
    }
    assert_eq!(last, Some((1000.0, 0.0)));
}

#[test]
fn test_aged_points_are_dropped_but_newest_kept() {
    let mut c = controller();
    let t0 = Instant::now();
    c.start(0.0, 0.0, t0);
    c.update(10.0, 0.0, t0);
    c.update(20.0, 0.0, t0);

    let segment = c.next_segment(t0 + ms(500)).unwrap();
    assert_eq!(segment.path.len(), 2);
    assert_eq!(segment.path[0], (20.0, 0.0));
    assert!(segment.path[1].0 > 20.0);
}

#[test]
fn test_preempt_races_completion() {
    let mut c = controller();
    let t0 = Instant::now();
    c.start(0.0, 0.0, t0);
    c.update(10.0, 0.0, t0);
    c.update(20.0, 0.0, t0);
    let first = c.next_segment(t0).unwrap();

    c.update(30.0, 0.0, t0 + ms(10));
    let second = c.preempt(first.id, t0 + ms(19)).unwrap();
    assert_eq!(second.path.first(), first.path.last());
    assert_eq!(c.in_flight_id(), Some(second.id));

    // The superseded segment's completion only feeds the latency history
    assert_eq!(
        c.on_outcome(first.id, DispatchOutcome::Completed(ms(30)), t0 + ms(24)),
        OutcomeEffect::Ignored
    );
    assert_eq!(c.history().len(), 1);
    assert_eq!(c.in_flight_id(), Some(second.id));

    // A late preempt for the retired segment does nothing
    assert!(c.preempt(first.id, t0 + ms(30)).is_none());
    assert_eq!(
        c.on_outcome(second.id, DispatchOutcome::Completed(ms(30)), t0 + ms(50)),
        OutcomeEffect::Pump
    );
}

#[test]
fn test_preempt_without_pending_points_keeps_segment() {
    let mut c = controller();
    let t0 = Instant::now();
    c.start(0.0, 0.0, t0);
    c.update(10.0, 0.0, t0);
    let first = c.next_segment(t0).unwrap();
    assert!(c.preempt(first.id, t0 + ms(19)).is_none());
    assert_eq!(c.in_flight_id(), Some(first.id));
}

#[test]
fn test_segment_duration_follows_history() {
    let mut c = controller();
    let t0 = Instant::now();
    c.start(0.0, 0.0, t0);
    for i in 1..40 {
        c.update(i as f32 * 10.0, 0.0, t0);
    }
    let first = c.next_segment(t0).unwrap();
    c.on_outcome(first.id, DispatchOutcome::Completed(ms(30)), t0);
    let second = c.next_segment(t0).unwrap();
    c.on_outcome(second.id, DispatchOutcome::Completed(ms(40)), t0);
    let third = c.next_segment(t0).unwrap();
    c.on_outcome(third.id, DispatchOutcome::Completed(ms(500)), t0);
    let fourth = c.next_segment(t0).unwrap();
    assert_eq!(second.duration, ms(30));
    assert_eq!(third.duration, ms(35));
    // A mean beyond twice the default is treated as an outlier
    assert_eq!(fourth.duration, StreamSettings::default().default_segment);
}

#[test]
fn test_start_refused_while_active_and_debounced() {
    let mut c = controller();
    let t0 = Instant::now();
    assert!(c.start(0.0, 0.0, t0));
    assert!(!c.start(10.0, 10.0, t0 + ms(200)));
    c.end();
    assert!(!c.start(10.0, 10.0, t0 + ms(200)), "refused while stopping");

    c.cancel();
    assert!(!c.start(10.0, 10.0, t0 + ms(10)), "within debounce");
    assert!(c.restart(10.0, 10.0, t0 + ms(10)));
    assert!(!c.start(f32::NAN, 0.0, t0 + ms(500)));
}

#[test]
fn test_host_failures_reset_the_stream() {
    let mut c = controller();
    let t0 = Instant::now();
    c.start(0.0, 0.0, t0);
    c.update(10.0, 0.0, t0);
    let segment = c.next_segment(t0).unwrap();
    c.update(20.0, 0.0, t0);
    assert_eq!(c.on_outcome(segment.id, DispatchOutcome::Rejected, t0), OutcomeEffect::Reset);
    assert_eq!(c.state(), StreamState::Idle);
    assert_eq!(c.status(t0).buffered_points, 0);

    let t1 = t0 + ms(100);
    c.start(0.0, 0.0, t1);
    let segment = c.next_segment(t1).unwrap();
    assert_eq!(c.on_outcome(segment.id, DispatchOutcome::Cancelled, t1), OutcomeEffect::Reset);
    assert_eq!(c.state(), StreamState::Error);
    assert!(c.start(5.0, 5.0, t1 + ms(100)));
}

#[test]
fn test_status_reports_progress() {
    let mut c = controller();
    let t0 = Instant::now();
    assert_eq!(c.status(t0).elapsed, None);
    c.start(0.0, 0.0, t0);
    c.update(10.0, 0.0, t0);
    c.next_segment(t0);
    let status = c.status(t0 + ms(15));
    assert_eq!(status.state, StreamState::Streaming);
    assert_eq!(status.segments_dispatched, 1);
    assert_eq!(status.elapsed, Some(ms(15)));
    assert!(status.in_flight);
}

#[test]
fn test_settings_are_clamped_on_construction() {
    let c = GestureStreamController::new(StreamSettings {
        preempt_fraction: -0.5,
        max_queue: 0,
        default_segment: Duration::ZERO,
        ..StreamSettings::default()
    });
    assert_eq!(c.settings().preempt_fraction, 0.1);
    assert_eq!(c.settings().max_queue, 4);
    assert_eq!(c.settings().default_segment, StreamSettings::default().default_segment);
    assert!(c.settings().preempt_delay(ms(24)) < ms(3));

    let c = GestureStreamController::new(StreamSettings {
        preempt_fraction: f64::NAN,
        ..StreamSettings::default()
    });
    assert_eq!(c.settings().preempt_fraction, StreamSettings::default().preempt_fraction);
}

#[test]
fn test_apply_settings_trims_queue_to_newest() {
    let mut c = controller();
    let t0 = Instant::now();
    c.start(0.0, 0.0, t0);
    for i in 1..=40 {
        c.update(i as f32 * 5.0, 0.0, t0);
    }
    assert_eq!(c.queue_len(), 41);

    c.apply_settings(StreamSettings {
        max_queue: 8,
        default_segment: ms(40),
        ..StreamSettings::default()
    });
    assert_eq!(c.queue_len(), 8);
    assert_eq!(c.status(t0).segment_duration, ms(40));

    c.end();
    let mut last = None;
    while let Some(segment) = c.next_segment(t0) {
        last = segment.path.last().copied();
        c.on_outcome(segment.id, DispatchOutcome::Completed(ms(40)), t0);
    }
    assert_eq!(last, Some((200.0, 0.0)));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_first_dispatch_returns_to_idle() {
    let host = RecordingHost::with_script([DispatchOutcome::Rejected]);
    let stream = GestureStream::spawn(Arc::new(host.clone()), StreamSettings::default());

    assert!(stream.start(100.0, 100.0));
    stream.update(200.0, 100.0);
    tokio::time::sleep(ms(200)).await;

    assert_eq!(host.count(), 1);
    assert_eq!(host.cancel_count(), 1);
    let status = stream.status();
    assert_eq!(status.state, StreamState::Idle);
    assert_eq!(status.buffered_points, 0);
    assert!(!status.in_flight);
}

#[tokio::test(start_paused = true)]
async fn test_streamed_stroke_is_contiguous() {
    let host = RecordingHost::new();
    let stream = GestureStream::spawn(Arc::new(host.clone()), StreamSettings::default());

    assert!(stream.start(0.0, 0.0));
    for i in 1..=40 {
        stream.update(i as f32 * 10.0, (i as f32 * 3.0).sin() * 20.0);
        tokio::time::sleep(ms(8)).await;
    }
    stream.end();
    tokio::time::sleep(ms(500)).await;

    let segments = host.segments();
    assert!(segments.len() >= 2);
    assert_eq!(segments[0].path[0], (0.0, 0.0));
    assert_contiguous(&segments);

    let finals: Vec<_> = segments.iter().filter(|s| !s.continues).collect();
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].id, segments.last().map(|s| s.id).unwrap());
    assert_eq!(stream.state(), StreamState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_dispatch_enters_error_state() {
    let host = RecordingHost::with_script([DispatchOutcome::Cancelled]);
    let stream = GestureStream::spawn(Arc::new(host.clone()), StreamSettings::default());

    stream.start(10.0, 10.0);
    tokio::time::sleep(ms(100)).await;
    assert_eq!(stream.state(), StreamState::Error);
    assert_eq!(host.count(), 1);
    assert_eq!(host.cancel_count(), 1);

    assert!(stream.start(20.0, 20.0));
    stream.end();
    tokio::time::sleep(ms(100)).await;
    assert_eq!(stream.state(), StreamState::Idle);
    assert_eq!(host.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_ignores_late_outcomes() {
    let host = RecordingHost::new();
    let stream = GestureStream::spawn(Arc::new(host.clone()), StreamSettings::default());

    stream.start(0.0, 0.0);
    stream.update(50.0, 0.0);
    tokio::time::sleep(ms(5)).await;
    stream.cancel();
    assert_eq!(stream.state(), StreamState::Idle);

    tokio::time::sleep(ms(200)).await;
    assert_eq!(stream.state(), StreamState::Idle);
    assert_eq!(host.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_worker() {
    let stream = GestureStream::spawn(Arc::new(RecordingHost::new()), StreamSettings::default());
    assert!(stream.shutdown().is_ok());
    tokio::time::sleep(ms(10)).await;
    assert!(stream.shutdown().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_releases_host_only_mid_stroke() {
    let host = RecordingHost::new();
    let stream = GestureStream::spawn(Arc::new(host.clone()), StreamSettings::default());

    stream.cancel();
    assert_eq!(host.cancel_count(), 0);

    stream.start(0.0, 0.0);
    stream.update(50.0, 0.0);
    tokio::time::sleep(ms(5)).await;
    assert!(host.segments()[0].continues);
    stream.cancel();
    assert_eq!(host.cancel_count(), 1);

    tokio::time::sleep(ms(200)).await;
    assert!(stream.shutdown().is_ok());
    assert_eq!(host.cancel_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_mid_stroke_releases_host() {
    let host = RecordingHost::new();
    let stream = GestureStream::spawn(Arc::new(host.clone()), StreamSettings::default());
    stream.start(0.0, 0.0);
    tokio::time::sleep(ms(5)).await;
    assert!(stream.shutdown().is_ok());
    assert_eq!(host.cancel_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_out_of_range_preempt_fraction_still_drains() {
    for yaml in ["stream:\n  preempt_fraction: -0.5\n", "stream:\n  preempt_fraction: .nan\n"] {
        let config = Config::from_yaml(yaml).unwrap();
        let host = RecordingHost::new();
        let stream = GestureStream::spawn(Arc::new(host.clone()), StreamSettings::from(&config.stream));
        assert!((0.1..=1.0).contains(&stream.settings().preempt_fraction));

        assert!(stream.start(0.0, 0.0));
        tokio::time::sleep(ms(1)).await;
        stream.update(40.0, 0.0);
        stream.end();
        tokio::time::sleep(ms(500)).await;

        assert!(host.count() >= 1);
        assert_eq!(stream.state(), StreamState::Idle);
        let segments = host.segments();
        assert_contiguous(&segments);
        assert_eq!(segments.last().and_then(|s| s.path.last().copied()), Some((40.0, 0.0)));
    }
}

#[tokio::test(start_paused = true)]
async fn test_apply_settings_on_running_stream() {
    let stream = GestureStream::spawn(Arc::new(RecordingHost::new()), StreamSettings::default());
    stream.apply_settings(StreamSettings {
        default_segment: ms(40),
        preempt_fraction: 5.0,
        ..StreamSettings::default()
    });
    assert_eq!(stream.status().segment_duration, ms(40));
    assert_eq!(stream.settings().preempt_fraction, 1.0);
}
