//! Game configuration loaded from TOML.

use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Rules and limits shared by every session the server creates.
///
/// Every field has a default, so an empty file (or no file at all) gives the
/// standard game: 4-symbol codes, 10 attempts, up to 4 players, a 30 second
/// countdown and two minutes of play.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct GameConfig {
    /// Number of symbols in the secret code.
    #[serde(default = "default_code_length")]
    code_length: usize,

    /// Guesses each player may submit.
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,

    /// Players admitted to a session before a new one is opened.
    #[serde(default = "default_max_players")]
    max_players: u32,

    /// Seconds between the second player joining and the game starting.
    #[serde(default = "default_countdown_secs")]
    countdown_secs: u64,

    /// Seconds of play once the countdown elapses.
    #[serde(default = "default_play_secs")]
    play_secs: u64,

    /// Directory finished games are archived into.
    #[serde(default = "default_archive_dir")]
    archive_dir: PathBuf,
}

fn default_code_length() -> usize {
    4
}

fn default_max_attempts() -> u32 {
    10
}

fn default_max_players() -> u32 {
    4
}

fn default_countdown_secs() -> u64 {
    30
}

fn default_play_secs() -> u64 {
    120
}

fn default_archive_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            code_length: default_code_length(),
            max_attempts: default_max_attempts(),
            max_players: default_max_players(),
            countdown_secs: default_countdown_secs(),
            play_secs: default_play_secs(),
            archive_dir: default_archive_dir(),
        }
    }
}

impl GameConfig {
    /// Loads and validates configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, does not parse, or
    /// fails [`GameConfig::validate`].
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(ConfigErrorKind::Read(e.to_string())))?;

        let config = Self::from_toml(&content)?;
        info!(
            code_length = config.code_length,
            max_attempts = config.max_attempts,
            max_players = config.max_players,
            "Config loaded successfully"
        );
        Ok(config)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on a parse or validation failure.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(ConfigErrorKind::Parse(e.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the limits describe a playable game.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigErrorKind::Invalid`] naming the offending key for a zero
    /// code length, zero attempts, fewer than two players (the countdown only
    /// starts with a second player), or a timing too long to schedule.
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.code_length == 0 {
            warn!("Rejected config with zero code length");
            return Err(ConfigError::invalid("code_length", "must be at least 1"));
        }
        if self.max_attempts == 0 {
            warn!("Rejected config with zero attempts");
            return Err(ConfigError::invalid("max_attempts", "must be at least 1"));
        }
        if self.max_players < 2 {
            warn!(max_players = self.max_players, "Rejected config with too few players");
            return Err(ConfigError::invalid("max_players", "must be at least 2"));
        }
        for (key, secs) in [
            ("countdown_secs", self.countdown_secs),
            ("play_secs", self.play_secs),
        ] {
            if secs > MAX_TIMING_SECS {
                warn!(key, secs, "Rejected config with out-of-range timing");
                return Err(ConfigError::invalid(key, "must be at most 315360000 (ten years)"));
            }
        }
        Ok(())
    }

    /// Returns a copy archiving into `dir`.
    pub fn with_archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = dir.into();
        self
    }

    /// Returns a copy with the given countdown and play durations, in seconds.
    pub fn with_timings(mut self, countdown_secs: u64, play_secs: u64) -> Self {
        self.countdown_secs = countdown_secs;
        self.play_secs = play_secs;
        self
    }

    /// Countdown length as a time delta.
    pub fn countdown(&self) -> TimeDelta {
        seconds(self.countdown_secs)
    }

    /// Play window length as a time delta.
    pub fn play_duration(&self) -> TimeDelta {
        seconds(self.play_secs)
    }
}

/// Longest countdown or play window a config may ask for.
pub const MAX_TIMING_SECS: u64 = 10 * 365 * 24 * 60 * 60;

fn seconds(secs: u64) -> TimeDelta {
    TimeDelta::try_seconds(i64::try_from(secs).unwrap_or(i64::MAX)).unwrap_or(TimeDelta::MAX)
}

/// What went wrong while loading a [`GameConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ConfigErrorKind {
    /// The file could not be read.
    #[display("Failed to read config file: {}", _0)]
    Read(String),

    /// The file is not valid TOML for a game config.
    #[display("Failed to parse config: {}", _0)]
    Parse(String),

    /// A value parsed but describes an unplayable game.
    #[display("{key} {requirement}")]
    Invalid {
        /// The offending key.
        key: &'static str,
        /// What the key must satisfy.
        requirement: &'static str,
    },
}

/// Configuration error with the location that raised it.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", kind, file, line)]
pub struct ConfigError {
    /// What went wrong.
    pub kind: ConfigErrorKind,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a configuration error with caller location tracking.
    #[track_caller]
    pub fn new(kind: ConfigErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Rejection of a single key.
    #[track_caller]
    pub fn invalid(key: &'static str, requirement: &'static str) -> Self {
        Self::new(ConfigErrorKind::Invalid { key, requirement })
    }

    /// The key that failed validation, if any.
    pub fn key(&self) -> Option<&'static str> {
        match self.kind {
            ConfigErrorKind::Invalid { key, .. } => Some(key),
            ConfigErrorKind::Read(_) | ConfigErrorKind::Parse(_) => None,
        }
    }
}
