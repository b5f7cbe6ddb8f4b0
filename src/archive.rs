//! End-of-game archival.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_new::new;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::session::{PlayerId, SessionId};

/// Final attempt count for one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct PlayerRecord {
    id: PlayerId,
    attempts: u32,
}

/// Snapshot of a finished game, taken at the moment it ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct GameSummary {
    session_id: SessionId,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    secret_code: String,
    players: Vec<PlayerRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    winner: Option<PlayerId>,
}

/// Durable storage for finished games.
///
/// Called after the session lock is released, so implementations may block.
pub trait Archiver: std::fmt::Debug + Send + Sync {
    /// Persists `summary`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the summary could not be stored.
    fn archive(&self, summary: &GameSummary) -> Result<(), ArchiveError>;
}

/// Writes each finished game as a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct FileArchiver {
    dir: PathBuf,
}

impl FileArchiver {
    /// Creates an archiver writing into `dir`. The directory is created on first write.
    #[instrument(skip(dir), fields(dir = %dir.as_ref().display()))]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        info!("Creating FileArchiver");
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for `summary` when written at `written_at`.
    ///
    /// Keyed by the game's start time, its session id and the write time.
    pub fn file_name(summary: &GameSummary, written_at: DateTime<Utc>) -> String {
        format!(
            "game_result_{}_{}_{}.json",
            summary.start_time.format("%Y%m%d_%H%M%S"),
            summary.session_id,
            written_at.timestamp()
        )
    }
}

impl Archiver for FileArchiver {
    #[instrument(skip(self, summary), fields(session_id = summary.session_id))]
    fn archive(&self, summary: &GameSummary) -> Result<(), ArchiveError> {
        let json = serde_json::to_string_pretty(summary)
            .map_err(|e| ArchiveError::new(format!("Failed to serialize game result: {}", e)))?;

        std::fs::create_dir_all(&self.dir).map_err(|e| {
            ArchiveError::new(format!(
                "Failed to create archive directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let path = self.dir.join(Self::file_name(summary, Utc::now()));
        debug!(path = %path.display(), "Writing game result");
        std::fs::write(&path, json).map_err(|e| {
            ArchiveError::new(format!("Failed to write {}: {}", path.display(), e))
        })?;

        info!(path = %path.display(), "Game result saved");
        Ok(())
    }
}

/// Keeps summaries in memory. Useful for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryArchiver {
    summaries: Mutex<Vec<GameSummary>>,
}

impl MemoryArchiver {
    /// Creates an empty archiver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Summaries archived so far, oldest first.
    pub fn summaries(&self) -> Vec<GameSummary> {
        self.summaries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Archiver for MemoryArchiver {
    fn archive(&self, summary: &GameSummary) -> Result<(), ArchiveError> {
        self.summaries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(summary.clone());
        Ok(())
    }
}

/// Archive error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Archive error: {} at {}:{}", message, file, line)]
pub struct ArchiveError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ArchiveError {
    /// Creates a new archive error with caller location tracking.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
