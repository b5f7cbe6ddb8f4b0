//! Tests for archiving finished games.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use codemaster::{
    Archiver, Code, FileArchiver, GameConfig, GameSummary, GuessOutcome, MemoryArchiver,
    PlayerRecord, Session,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn summary() -> GameSummary {
    GameSummary::new(
        7,
        t0(),
        t0() + TimeDelta::seconds(45),
        "AB12".to_string(),
        vec![PlayerRecord::new(1, 3), PlayerRecord::new(2, 5)],
        Some(2),
    )
}

fn archived_files(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

#[test]
fn test_file_name_carries_start_time_and_session() {
    let written_at = t0() + TimeDelta::seconds(45);
    let name = FileArchiver::file_name(&summary(), written_at);
    assert_eq!(
        name,
        format!("game_result_20240501_120000_7_{}.json", written_at.timestamp())
    );
}

#[test]
fn test_file_archiver_writes_json() {
    let dir = tempfile::tempdir().unwrap();
    let archiver = FileArchiver::new(dir.path());
    archiver.archive(&summary()).unwrap();

    let files = archived_files(dir.path());
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("game_result_20240501_120000_7_"), "{name}");
    assert!(name.ends_with(".json"), "{name}");

    let content = std::fs::read_to_string(&files[0]).unwrap();
    let parsed: GameSummary = serde_json::from_str(&content).unwrap();
    assert_eq!(parsed, summary());

    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(value["secret_code"], "AB12");
    assert_eq!(value["winner"], 2);
    assert_eq!(value["players"][1]["attempts"], 5);
}

#[test]
fn test_no_winner_field_when_nobody_won() {
    let dir = tempfile::tempdir().unwrap();
    let archiver = FileArchiver::new(dir.path());
    let summary = GameSummary::new(8, t0(), t0(), "ZZZZ".to_string(), vec![], None);
    archiver.archive(&summary).unwrap();

    let files = archived_files(dir.path());
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&files[0]).unwrap()).unwrap();
    assert!(value.get("winner").is_none());
}

#[test]
fn test_file_archiver_creates_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("results").join("2024");
    let archiver = FileArchiver::new(&nested);
    archiver.archive(&summary()).unwrap();
    assert_eq!(archived_files(&nested).len(), 1);
}

#[test]
fn test_file_archiver_reports_unwritable_target() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, "occupied").unwrap();

    let archiver = FileArchiver::new(&blocker);
    let err = archiver.archive(&summary()).unwrap_err();
    assert!(err.message.contains("not_a_dir"), "{err}");
}

#[test]
fn test_archive_failure_does_not_affect_the_guess() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, "occupied").unwrap();

    let session = Session::with_secret(
        1,
        Code::parse("AB12", 4).unwrap(),
        Arc::new(GameConfig::default()),
        Arc::new(FileArchiver::new(&blocker)),
        t0(),
    )
    .unwrap();
    session.admit_at(t0()).unwrap();
    session.admit_at(t0()).unwrap();
    session.status_at(t0() + TimeDelta::seconds(30));

    let outcome = session
        .submit_guess_at(1, "AB12", t0() + TimeDelta::seconds(40))
        .unwrap();
    assert_eq!(outcome, GuessOutcome::Won { attempt: 1 });
    assert!(session.ending().is_some());
}

#[test]
fn test_session_archives_exactly_once() {
    let archiver = Arc::new(MemoryArchiver::new());
    let session = Session::with_secret(
        3,
        Code::parse("AB12", 4).unwrap(),
        Arc::new(GameConfig::default()),
        archiver.clone(),
        t0(),
    )
    .unwrap();
    session.admit_at(t0()).unwrap();
    session.admit_at(t0()).unwrap();
    let start = t0() + TimeDelta::seconds(30);
    session.status_at(start);

    session.submit_guess_at(2, "AB12", start + TimeDelta::seconds(5)).unwrap();
    session.submit_guess_at(1, "AB12", start + TimeDelta::seconds(6)).unwrap();
    session.submit_guess_at(1, "XXXX", start + TimeDelta::seconds(7)).unwrap();

    let summaries = archiver.summaries();
    assert_eq!(summaries.len(), 1);
    let summary = &summaries[0];
    assert_eq!(*summary.session_id(), 3);
    assert_eq!(*summary.start_time(), start);
    assert_eq!(*summary.end_time(), start + TimeDelta::seconds(5));
    assert_eq!(*summary.winner(), Some(2));
    assert_eq!(
        summary.players(),
        &vec![PlayerRecord::new(1, 0), PlayerRecord::new(2, 1)]
    );
}
