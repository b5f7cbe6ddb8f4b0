//! Tests for loading game configuration.

use std::io::Write;
use std::path::PathBuf;

use chrono::TimeDelta;
use codemaster::{ConfigErrorKind, GameConfig, MAX_TIMING_SECS};

#[test]
fn test_defaults() {
    let config = GameConfig::default();
    assert_eq!(*config.code_length(), 4);
    assert_eq!(*config.max_attempts(), 10);
    assert_eq!(*config.max_players(), 4);
    assert_eq!(*config.countdown_secs(), 30);
    assert_eq!(*config.play_secs(), 120);
    assert_eq!(config.archive_dir(), &PathBuf::from("."));
    assert_eq!(config.countdown(), TimeDelta::seconds(30));
    assert_eq!(config.play_duration(), TimeDelta::seconds(120));
    assert!(config.validate().is_ok());
}

#[test]
fn test_empty_toml_is_default() {
    assert_eq!(GameConfig::from_toml("").unwrap(), GameConfig::default());
}

#[test]
fn test_partial_toml_keeps_other_defaults() {
    let config = GameConfig::from_toml(
        r#"
        max_attempts = 6
        play_secs = 300
        archive_dir = "results"
        "#,
    )
    .unwrap();
    assert_eq!(*config.max_attempts(), 6);
    assert_eq!(*config.play_secs(), 300);
    assert_eq!(config.archive_dir(), &PathBuf::from("results"));
    assert_eq!(*config.code_length(), 4);
    assert_eq!(*config.max_players(), 4);
}

#[test]
fn test_rejects_unplayable_limits() {
    for (toml, key) in [
        ("code_length = 0", "code_length"),
        ("max_attempts = 0", "max_attempts"),
        ("max_players = 1", "max_players"),
    ] {
        let err = GameConfig::from_toml(toml).unwrap_err();
        assert_eq!(err.key(), Some(key), "{toml}: {err}");
        assert!(err.to_string().contains("must be at least"), "{toml}: {err}");
    }
}

#[test]
fn test_rejects_malformed_toml() {
    let err = GameConfig::from_toml("max_players = \"four\"").unwrap_err();
    assert!(matches!(err.kind, ConfigErrorKind::Parse(_)), "{err}");
    assert_eq!(err.key(), None);
}

#[test]
fn test_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "code_length = 5\ncountdown_secs = 10").unwrap();

    let config = GameConfig::from_file(file.path()).unwrap();
    assert_eq!(*config.code_length(), 5);
    assert_eq!(config.countdown(), TimeDelta::seconds(10));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = GameConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err.kind, ConfigErrorKind::Read(_)), "{err}");
    assert!(err.to_string().starts_with("Config error: Failed to read config file"));
}

#[test]
fn test_builders() {
    let config = GameConfig::default()
        .with_timings(0, 5)
        .with_archive_dir("/tmp/games");
    assert_eq!(config.countdown(), TimeDelta::zero());
    assert_eq!(config.play_duration(), TimeDelta::seconds(5));
    assert_eq!(config.archive_dir(), &PathBuf::from("/tmp/games"));
}

#[test]
fn test_huge_durations_saturate() {
    let config = GameConfig::default().with_timings(u64::MAX, u64::MAX);
    assert!(config.countdown() > TimeDelta::days(365 * 1000));
}

#[test]
fn test_rejects_timings_too_long_to_schedule() {
    for (toml, key) in [
        ("countdown_secs = 9223372036854775807", "countdown_secs"),
        ("play_secs = 9223372036854775807", "play_secs"),
    ] {
        let err = GameConfig::from_toml(toml).unwrap_err();
        assert_eq!(err.key(), Some(key), "{toml}: {err}");
    }

    let at_limit = format!("countdown_secs = {MAX_TIMING_SECS}\nplay_secs = {MAX_TIMING_SECS}");
    assert!(GameConfig::from_toml(&at_limit).is_ok());
    let over = format!("play_secs = {}", MAX_TIMING_SECS + 1);
    assert_eq!(GameConfig::from_toml(&over).unwrap_err().key(), Some("play_secs"));
}
