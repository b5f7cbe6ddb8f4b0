//! Request and response types for the HTTP interface.
//!
//! Optional fields are omitted from the JSON when they carry no meaning, e.g.
//! match counts on a rejected guess.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::session::{GuessOutcome, LossReason, Phase, PlayerId, SessionId, StatusReport};

/// Query for `GET /status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusQuery {
    /// Session to poll.
    pub game_id: SessionId,
}

/// Query for `GET /guess`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuessQuery {
    /// The guessed code.
    pub guess: String,
    /// Guessing player.
    pub player_id: PlayerId,
    /// Session the player belongs to.
    pub game_id: SessionId,
}

/// Response to `GET /join`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// Guesses allowed per player.
    pub attempts: u32,
    /// Length of the play window in seconds.
    pub time_limit_secs: u64,
    /// Symbols in the secret code.
    pub code_length: usize,
    /// Handle for subsequent guesses.
    pub player_id: PlayerId,
    /// Session joined.
    pub game_id: SessionId,
}

/// Response to `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// True once guesses are accepted.
    pub is_begin: bool,
    /// Current phase.
    pub phase: Phase,
    /// Players in the session.
    pub players: u32,
    /// Roster capacity.
    pub max_players: u32,
    /// Countdown or play time remaining, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_left_secs: Option<u64>,
    /// Human-readable wait message.
    pub message: String,
}

impl From<&StatusReport> for StatusResponse {
    fn from(report: &StatusReport) -> Self {
        let phase = *report.phase();
        let players = *report.players();
        let max_players = *report.max_players();
        let time_left_secs = report.time_left().map(whole_secs_remaining);

        let message = match (phase, time_left_secs) {
            (Phase::Lobby, _) => format!("Waiting for players ({}/{}).", players, max_players),
            (Phase::Waiting, Some(secs)) => format!(
                "Waiting for players ({}/{}). Starting in {}s",
                players, max_players, secs
            ),
            (Phase::Waiting, None) => format!("Waiting for players ({}/{}).", players, max_players),
            (Phase::Active, _) => "The game has started".to_string(),
            (Phase::Ended, _) => "The game is over".to_string(),
        };

        Self {
            is_begin: report.has_begun(),
            phase,
            players,
            max_players,
            time_left_secs,
            message,
        }
    }
}

/// Seconds remaining, rounded up so a running clock never reads zero.
fn whole_secs_remaining(left: Duration) -> u64 {
    left.as_secs() + u64::from(left.subsec_nanos() > 0)
}

/// Response to `GET /guess`, and the body of every guess rejection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessResponse {
    /// Human-readable result.
    pub message: String,
    /// True when this player can make no further guesses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_end: Option<bool>,
    /// Attempt number of this guess.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    /// Guesses allowed per player.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    /// Exact matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub black: Option<usize>,
    /// Right symbol, wrong position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub white: Option<usize>,
    /// Play time remaining, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_left_secs: Option<u64>,
}

impl GuessResponse {
    /// A bare message, optionally marking the player as done.
    pub fn message(message: impl Into<String>, is_end: Option<bool>) -> Self {
        Self {
            message: message.into(),
            is_end,
            ..Self::default()
        }
    }
}

impl From<&GuessOutcome> for GuessResponse {
    fn from(outcome: &GuessOutcome) -> Self {
        match outcome {
            GuessOutcome::Accepted(feedback) => Self {
                message: "Guess accepted".to_string(),
                is_end: Some(false),
                attempt: Some(*feedback.attempt()),
                max_attempts: Some(*feedback.max_attempts()),
                black: Some(feedback.score().black),
                white: Some(feedback.score().white),
                time_left_secs: Some(feedback.time_left().as_secs()),
            },
            GuessOutcome::Won { .. } => {
                Self::message("Congratulations! You cracked the code!", Some(true))
            }
            GuessOutcome::Lost {
                secret,
                reason: LossReason::Timeout,
            } => Self::message(format!("Time is up. The secret code was {}", secret), Some(true)),
            GuessOutcome::Lost {
                secret,
                reason: LossReason::AttemptsExhausted,
            } => Self::message(
                format!("No attempts left. The secret code was {}", secret),
                Some(true),
            ),
            GuessOutcome::GameOver { winner } => Self::message(
                format!("Game over. Player {} cracked the code", winner),
                Some(true),
            ),
        }
    }
}
