//! Configuration loading, saving and application

use std::path::PathBuf;

use head_pointer::{
    config::{Config, SignalSource, EXAMPLE_CONFIG},
    event_trigger::{Blendshape, EventType},
    gesture_stream::StreamSettings,
};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("head-pointer-{}-{}.yaml", std::process::id(), name))
}

#[test]
fn test_file_round_trip() {
    let mut config = Config::with_default_triggers();
    config.cursor.signal_source = SignalSource::Blended;
    config.cursor.smoothing_level = 11;
    config.region.edge_hold_ms = 750;
    config.stream.segment_ms = 30;

    let path = temp_path("round-trip");
    config.to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.cursor.signal_source, SignalSource::Blended);
    assert_eq!(loaded.cursor.smoothing_level, 11);
    assert_eq!(loaded.region.edge_hold_ms, 750);
    assert_eq!(loaded.stream.segment_ms, 30);
    assert_eq!(loaded.triggers.len(), config.triggers.len());
    assert_eq!(loaded.trigger_bindings(), config.trigger_bindings());
}

#[test]
fn test_example_config_matches_defaults() {
    let example = Config::from_yaml(EXAMPLE_CONFIG).unwrap();
    let defaults = Config::with_default_triggers();
    assert_eq!(example.trigger_bindings(), defaults.trigger_bindings());
    assert_eq!(example.cursor.speed_left, defaults.cursor.speed_left);
    assert_eq!(example.stream.max_queue, defaults.stream.max_queue);
}

#[test]
fn test_invalid_yaml_is_an_error() {
    assert!(Config::from_yaml("screen: {width: wide}").is_err());
    assert!(Config::from_yaml("cursor:\n  signal_source: eyes\n").is_err());
}

#[test]
fn test_missing_file_is_an_error() {
    assert!(Config::from_file(temp_path("does-not-exist")).is_err());
}

#[test]
fn test_empty_document_gives_defaults() {
    let config = Config::from_yaml("{}").unwrap();
    assert!(config.triggers.is_empty());
    assert_eq!(config.tick.interval_ms, 16);
}

#[test]
fn test_stream_settings_from_config() {
    let mut config = Config::default();
    config.stream.segment_ms = 40;
    config.stream.max_queue = 16;
    let settings = StreamSettings::from(&config.stream);
    assert_eq!(settings.default_segment.as_millis(), 40);
    assert_eq!(settings.max_queue, 16);
    assert_eq!(settings.eps_px, StreamSettings::default().eps_px);
}

#[test]
fn test_trigger_names_case_insensitive() {
    let yaml = "triggers:\n  swipe_up:\n    blendshape: roll_lower_mouth\n    threshold: 0.4\n";
    let bindings = Config::from_yaml(yaml).unwrap().trigger_bindings();
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].0, EventType::SwipeUp);
    assert_eq!(bindings[0].1.blendshape, Blendshape::RollLowerMouth);
}
