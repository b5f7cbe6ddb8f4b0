//! Game session state machine.
//!
//! A [`Session`] owns one game: its roster, secret code, clock milestones and
//! outcome. All mutation happens behind a single per-session mutex, so
//! concurrent guesses from different players are applied one at a time.
//!
//! There is no background timer. Phase changes that depend on the clock
//! (countdown elapsing, play window closing) are computed by whichever request
//! next observes the session, under the same lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use codemaster_rules::{Code, CodeError, Score};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::archive::{Archiver, GameSummary, PlayerRecord};
use crate::config::GameConfig;

/// Unique identifier for a game session.
pub type SessionId = u64;

/// Player handle, unique within a session and assigned from 1 in join order.
pub type PlayerId = u32;

/// Lifecycle stage of a session. Transitions only move forward.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    /// Fewer than two players; no countdown yet.
    Lobby,
    /// Countdown running; more players may still join.
    Waiting,
    /// Guesses accepted while the play window is open.
    Active,
    /// Terminal.
    Ended,
}

/// A player in a session.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize)]
pub struct Player {
    id: PlayerId,
    attempts_used: u32,
}

/// Who won a finished session.
///
/// Only exists once a session has ended, so "no winner yet" is
/// `Option::<Winner>::None` and never confused with [`Winner::Nobody`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    /// The player who guessed the code.
    Player(PlayerId),
    /// Time ran out or every player used all attempts.
    Nobody,
}

impl Winner {
    /// Returns the winning player, if any.
    pub fn player(&self) -> Option<PlayerId> {
        match self {
            Self::Player(id) => Some(*id),
            Self::Nobody => None,
        }
    }
}

/// Winner and end time, recorded together when the session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters)]
pub struct Ending {
    winner: Winner,
    ended_at: DateTime<Utc>,
}

/// Why a player lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum LossReason {
    /// The play window closed.
    Timeout,
    /// The player used every attempt.
    AttemptsExhausted,
}

/// Match counts and budgets reported for an accepted guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters)]
pub struct Feedback {
    attempt: u32,
    max_attempts: u32,
    score: Score,
    time_left: Duration,
}

/// Result of a guess that reached the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuessOutcome {
    /// Wrong guess; the player may keep going.
    Accepted(Feedback),
    /// The guess matched the secret. The session is over.
    Won {
        /// Attempt number of the winning guess.
        attempt: u32,
    },
    /// The player is out, and the secret is revealed to them.
    Lost {
        /// The secret code.
        secret: Code,
        /// Why the player lost.
        reason: LossReason,
    },
    /// Another player already won.
    GameOver {
        /// The player who won.
        winner: PlayerId,
    },
}

/// Point-in-time view of a session for polling clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters)]
pub struct StatusReport {
    phase: Phase,
    players: u32,
    max_players: u32,
    /// Countdown remaining while waiting, play time remaining while active.
    time_left: Option<Duration>,
}

impl StatusReport {
    /// True once guessing has opened.
    pub fn has_begun(&self) -> bool {
        self.phase >= Phase::Active
    }
}

/// Error returned when a session rejects a request.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum SessionError {
    /// The player id is not on this session's roster.
    #[display("Unknown player {player_id}")]
    UnknownPlayer {
        /// The id that was looked up.
        player_id: PlayerId,
    },

    /// The roster is already full.
    #[display("Session already has {max_players} players")]
    SessionFull {
        /// Roster capacity.
        max_players: u32,
    },

    /// The game has already started or finished.
    #[display("Session is {phase} and no longer accepts players")]
    SessionNotJoinable {
        /// Phase at the time of the request.
        phase: Phase,
    },

    /// The game ended without a winner.
    #[display("The game is over")]
    SessionEnded,

    /// The guess is not a well-formed code.
    #[display("Invalid guess: {}", _0)]
    InvalidGuess(CodeError),

    /// The countdown has not elapsed yet.
    #[display("The game has not started yet ({phase})")]
    NotStarted {
        /// Phase at the time of the request.
        phase: Phase,
    },

    /// The player has no attempts left.
    #[display("Player {player_id} has no attempts left")]
    AttemptsExhausted {
        /// The exhausted player.
        player_id: PlayerId,
    },
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidGuess(e) => Some(e),
            _ => None,
        }
    }
}

/// Mutable session state. Only touched while holding the session lock.
#[derive(Debug)]
struct SessionState {
    players: Vec<Player>,
    phase: Phase,
    countdown_started_at: Option<DateTime<Utc>>,
    play_started_at: Option<DateTime<Utc>>,
    ending: Option<Ending>,
}

impl SessionState {
    /// Starts play if the countdown has elapsed by `now`. Returns true on transition.
    fn advance(&mut self, now: DateTime<Utc>, countdown: TimeDelta) -> bool {
        if self.phase == Phase::Waiting
            && let Some(deadline) = self.countdown_deadline(countdown)
            && now >= deadline
        {
            self.phase = Phase::Active;
            self.play_started_at = Some(now);
            return true;
        }
        false
    }

    /// `None` until the countdown starts, or if the deadline is out of range.
    fn countdown_deadline(&self, countdown: TimeDelta) -> Option<DateTime<Utc>> {
        self.countdown_started_at?.checked_add_signed(countdown)
    }

    /// `None` until play starts, or if the deadline is out of range.
    fn play_deadline(&self, play_duration: TimeDelta) -> Option<DateTime<Utc>> {
        self.play_started_at?.checked_add_signed(play_duration)
    }

    fn end(&mut self, winner: Winner, now: DateTime<Utc>) {
        debug_assert!(self.ending.is_none(), "session ended twice");
        self.ending = Some(Ending {
            winner,
            ended_at: now,
        });
        self.phase = Phase::Ended;
    }
}

/// One game instance shared by up to `max_players` players.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    secret: Code,
    config: Arc<GameConfig>,
    created_at: DateTime<Utc>,
    archiver: Arc<dyn Archiver>,
    state: Mutex<SessionState>,
}

impl Session {
    /// Creates a session with a freshly generated secret code.
    #[instrument(skip(config, archiver))]
    pub fn new(
        id: SessionId,
        config: Arc<GameConfig>,
        archiver: Arc<dyn Archiver>,
        now: DateTime<Utc>,
    ) -> Self {
        let secret = codemaster_rules::generate(*config.code_length());
        info!(session_id = id, "Creating new game session");
        Self::build(id, secret, config, archiver, now)
    }

    /// Creates a session with a known secret code.
    ///
    /// # Errors
    ///
    /// Returns [`CodeError::WrongLength`] if `secret` does not have the
    /// configured code length.
    #[instrument(skip(secret, config, archiver))]
    pub fn with_secret(
        id: SessionId,
        secret: Code,
        config: Arc<GameConfig>,
        archiver: Arc<dyn Archiver>,
        now: DateTime<Utc>,
    ) -> Result<Self, CodeError> {
        if secret.len() != *config.code_length() {
            return Err(CodeError::WrongLength {
                expected: *config.code_length(),
                actual: secret.len(),
            });
        }
        Ok(Self::build(id, secret, config, archiver, now))
    }

    fn build(
        id: SessionId,
        secret: Code,
        config: Arc<GameConfig>,
        archiver: Arc<dyn Archiver>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            secret,
            config,
            created_at: now,
            archiver,
            state: Mutex::new(SessionState {
                players: Vec::new(),
                phase: Phase::Lobby,
                countdown_started_at: None,
                play_started_at: None,
                ending: None,
            }),
        }
    }

    /// Session id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The secret code. Fixed for the lifetime of the session.
    pub fn secret_code(&self) -> &Code {
        &self.secret
    }

    /// Rules this session plays by.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// When the session was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Current phase, without advancing the clock.
    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    /// Roster snapshot in join order.
    pub fn players(&self) -> Vec<Player> {
        self.lock().players.clone()
    }

    /// When the countdown started, if it has.
    pub fn countdown_started_at(&self) -> Option<DateTime<Utc>> {
        self.lock().countdown_started_at
    }

    /// When play started, if it has.
    pub fn play_started_at(&self) -> Option<DateTime<Utc>> {
        self.lock().play_started_at
    }

    /// Winner and end time, once the session has ended.
    pub fn ending(&self) -> Option<Ending> {
        self.lock().ending
    }

    /// Archive summary, once the session has ended.
    pub fn summary(&self) -> Option<GameSummary> {
        let state = self.lock();
        self.summarize(&state)
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a player to the roster and returns their handle.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SessionNotJoinable`] once play has started and
    /// [`SessionError::SessionFull`] when the roster is at capacity.
    pub fn admit(&self) -> Result<PlayerId, SessionError> {
        self.admit_at(Utc::now())
    }

    /// [`Session::admit`] observed at `now`.
    ///
    /// # Errors
    ///
    /// See [`Session::admit`].
    #[instrument(skip(self), fields(session_id = self.id))]
    pub fn admit_at(&self, now: DateTime<Utc>) -> Result<PlayerId, SessionError> {
        let mut state = self.lock();
        if state.advance(now, self.config.countdown()) {
            info!(players = state.players.len(), "Countdown elapsed, game started");
        }

        if matches!(state.phase, Phase::Active | Phase::Ended) {
            warn!(phase = %state.phase, "Rejected join into started session");
            return Err(SessionError::SessionNotJoinable { phase: state.phase });
        }

        let max_players = *self.config.max_players();
        if state.players.len() >= max_players as usize {
            warn!(max_players, "Rejected join into full session");
            return Err(SessionError::SessionFull { max_players });
        }

        let player_id = state.players.len() as PlayerId + 1;
        state.players.push(Player {
            id: player_id,
            attempts_used: 0,
        });

        if state.players.len() == 2 {
            state.phase = Phase::Waiting;
            state.countdown_started_at = Some(now);
            info!(
                countdown_secs = self.config.countdown_secs(),
                "Second player joined, countdown started"
            );
        }

        info!(player_id, players = state.players.len(), "Player admitted");
        Ok(player_id)
    }

    /// Reports phase, roster size and remaining time.
    ///
    /// Polling drives the clock: if the countdown has elapsed, this call moves
    /// the session to [`Phase::Active`] and starts the play clock. If the play
    /// window has closed, it ends the session with no winner and archives it.
    pub fn status(&self) -> StatusReport {
        self.status_at(Utc::now())
    }

    /// [`Session::status`] observed at `now`.
    #[instrument(skip(self), fields(session_id = self.id))]
    pub fn status_at(&self, now: DateTime<Utc>) -> StatusReport {
        let (report, summary) = {
            let mut state = self.lock();
            if state.advance(now, self.config.countdown()) {
                info!(players = state.players.len(), "Countdown elapsed, game started");
            }
            let summary = self.close_expired(&mut state, now);

            let deadline = match state.phase {
                Phase::Waiting => state.countdown_deadline(self.config.countdown()),
                Phase::Active => state.play_deadline(self.config.play_duration()),
                Phase::Lobby | Phase::Ended => None,
            };

            let report = StatusReport {
                phase: state.phase,
                players: state.players.len() as u32,
                max_players: *self.config.max_players(),
                time_left: deadline.map(|d| remaining(d, now)),
            };
            (report, summary)
        };

        debug!(
            phase = %report.phase,
            players = report.players,
            ?report.time_left,
            "Status polled"
        );
        if let Some(summary) = summary {
            self.archive(&summary);
        }
        report
    }

    /// Evaluates `guess` for `player_id` and applies the resulting transition.
    ///
    /// Checks run in a fixed order: an expired play window ends the game with
    /// no winner even if the guess is correct; then an exact match wins; then
    /// running out of attempts finishes the player (and the session, once
    /// every player is out).
    ///
    /// If the session ends, its summary is handed to the archiver after the
    /// session lock is released.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] for an unknown player, a game that has not
    /// started or ended without a winner, a malformed guess, or a player with
    /// no attempts left.
    pub fn submit_guess(
        &self,
        player_id: PlayerId,
        guess: &str,
    ) -> Result<GuessOutcome, SessionError> {
        self.submit_guess_at(player_id, guess, Utc::now())
    }

    /// [`Session::submit_guess`] observed at `now`.
    ///
    /// # Errors
    ///
    /// See [`Session::submit_guess`].
    #[instrument(skip(self), fields(session_id = self.id))]
    pub fn submit_guess_at(
        &self,
        player_id: PlayerId,
        guess: &str,
        now: DateTime<Utc>,
    ) -> Result<GuessOutcome, SessionError> {
        let (outcome, summary) = {
            let mut state = self.lock();
            self.apply_guess(&mut state, player_id, guess, now)?
        };

        if let Some(summary) = summary {
            self.archive(&summary);
        }
        Ok(outcome)
    }

    fn apply_guess(
        &self,
        state: &mut SessionState,
        player_id: PlayerId,
        guess: &str,
        now: DateTime<Utc>,
    ) -> Result<(GuessOutcome, Option<GameSummary>), SessionError> {
        let Some(index) = state.players.iter().position(|p| p.id == player_id) else {
            warn!(player_id, "Unknown player submitted a guess");
            return Err(SessionError::UnknownPlayer { player_id });
        };

        if state.advance(now, self.config.countdown()) {
            info!(players = state.players.len(), "Countdown elapsed, game started");
        }

        match state.phase {
            Phase::Active => {}
            Phase::Ended => {
                return match state.ending.map(|e| e.winner) {
                    Some(Winner::Player(winner)) => {
                        debug!(player_id, winner, "Guess after the code was cracked");
                        Ok((GuessOutcome::GameOver { winner }, None))
                    }
                    _ => {
                        warn!(player_id, "Guess after the game ended");
                        Err(SessionError::SessionEnded)
                    }
                };
            }
            phase @ (Phase::Lobby | Phase::Waiting) => {
                warn!(player_id, %phase, "Guess before the game started");
                return Err(SessionError::NotStarted { phase });
            }
        }

        let code_length = *self.config.code_length();
        let guess = Code::parse(guess, code_length).map_err(|e| {
            warn!(player_id, error = %e, "Rejected malformed guess");
            SessionError::InvalidGuess(e)
        })?;

        let max_attempts = *self.config.max_attempts();
        if state.players[index].attempts_used >= max_attempts {
            warn!(player_id, "Guess from player with no attempts left");
            return Err(SessionError::AttemptsExhausted { player_id });
        }

        if let Some(summary) = self.close_expired(state, now) {
            let outcome = GuessOutcome::Lost {
                secret: self.secret.clone(),
                reason: LossReason::Timeout,
            };
            return Ok((outcome, Some(summary)));
        }
        let deadline = state.play_deadline(self.config.play_duration());

        let score = codemaster_rules::score(&self.secret, &guess).map_err(|_| {
            SessionError::InvalidGuess(CodeError::WrongLength {
                expected: self.secret.len(),
                actual: guess.len(),
            })
        })?;

        let player = &mut state.players[index];
        player.attempts_used += 1;
        let attempt = player.attempts_used;

        if score.is_exact(code_length) {
            state.end(Winner::Player(player_id), now);
            info!(player_id, attempt, "Code cracked");
            return Ok((GuessOutcome::Won { attempt }, self.summarize(state)));
        }

        if attempt >= max_attempts {
            info!(player_id, "Player used every attempt");
            let outcome = GuessOutcome::Lost {
                secret: self.secret.clone(),
                reason: LossReason::AttemptsExhausted,
            };
            if state.players.iter().all(|p| p.attempts_used >= max_attempts) {
                state.end(Winner::Nobody, now);
                info!("Every player is out of attempts, game over with no winner");
                return Ok((outcome, self.summarize(state)));
            }
            return Ok((outcome, None));
        }

        let time_left = deadline.map_or(Duration::ZERO, |d| remaining(d, now));
        debug!(player_id, attempt, %score, ?time_left, "Guess accepted");
        Ok((
            GuessOutcome::Accepted(Feedback {
                attempt,
                max_attempts,
                score,
                time_left,
            }),
            None,
        ))
    }

    /// Ends an active session whose play window closed by `now`, returning its summary.
    fn close_expired(&self, state: &mut SessionState, now: DateTime<Utc>) -> Option<GameSummary> {
        if state.phase != Phase::Active {
            return None;
        }
        let deadline = state.play_deadline(self.config.play_duration())?;
        if now < deadline {
            return None;
        }
        state.end(Winner::Nobody, now);
        info!(session_id = self.id, "Play window closed, game over with no winner");
        self.summarize(state)
    }

    fn summarize(&self, state: &SessionState) -> Option<GameSummary> {
        let ending = state.ending?;
        let start_time = state.play_started_at.unwrap_or(self.created_at);
        let players = state
            .players
            .iter()
            .map(|p| PlayerRecord::new(p.id, p.attempts_used))
            .collect();
        Some(GameSummary::new(
            self.id,
            start_time,
            ending.ended_at,
            self.secret.to_string(),
            players,
            ending.winner.player(),
        ))
    }

    /// Hands a finished game to the archiver. Failures are logged, never raised.
    fn archive(&self, summary: &GameSummary) {
        match self.archiver.archive(summary) {
            Ok(()) => debug!(session_id = self.id, "Game result archived"),
            Err(e) => error!(session_id = self.id, error = %e, "Failed to archive game result"),
        }
    }
}

fn remaining(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (deadline - now).to_std().unwrap_or(Duration::ZERO)
}
