//! Codemaster - multiplayer code-breaking game
//!
//! Players join a shared game, wait for a quorum, then race to crack a random
//! secret code within a limited number of attempts and a time window.
//!
//! # Architecture
//!
//! - **Session**: one game's state machine (lobby, countdown, play, ended)
//! - **Registry**: routes joins to the single open session
//! - **Archive**: persists finished games
//! - **Server / Client**: HTTP transport and a terminal player
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use codemaster::{GameConfig, MemoryArchiver, SessionRegistry};
//!
//! let registry = SessionRegistry::new(GameConfig::default(), Arc::new(MemoryArchiver::new()));
//! let first = registry.join_open_session().unwrap();
//! let second = registry.join_open_session().unwrap();
//! assert_eq!(first.session_id(), second.session_id());
//! assert_eq!(*second.player_id(), 2);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod api;
mod archive;
mod client;
mod config;
mod play;
mod registry;
mod server;
mod session;

// Crate-level exports - Configuration
pub use config::{ConfigError, ConfigErrorKind, GameConfig, MAX_TIMING_SECS};

// Crate-level exports - Session state machine
pub use session::{
    Ending, Feedback, GuessOutcome, LossReason, Phase, Player, PlayerId, Session, SessionError,
    SessionId, StatusReport, Winner,
};

// Crate-level exports - Registry
pub use registry::{Admission, RegistryError, SessionRegistry};

// Crate-level exports - Archival
pub use archive::{ArchiveError, Archiver, FileArchiver, GameSummary, MemoryArchiver, PlayerRecord};

// Crate-level exports - Transport
pub use api::{GuessQuery, GuessResponse, JoinResponse, StatusQuery, StatusResponse};
pub use client::GameClient;
pub use play::play_games;
pub use server::{ApiError, router, serve};

// Crate-level exports - Game rules
pub use codemaster_rules::{Code, CodeError, Score};
