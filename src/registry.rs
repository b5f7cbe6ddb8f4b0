//! Process-wide session table.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use tracing::{debug, error, info, instrument, warn};

use crate::archive::Archiver;
use crate::config::GameConfig;
use crate::session::{PlayerId, Session, SessionError, SessionId};

/// Where a join request landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters)]
pub struct Admission {
    session_id: SessionId,
    player_id: PlayerId,
}

/// Error returned by the registry.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum RegistryError {
    /// No session with this id was ever created.
    #[display("Game {session_id} does not exist")]
    SessionNotFound {
        /// The id that was looked up.
        session_id: SessionId,
    },

    /// A freshly opened session refused its first player.
    #[display("Session {session_id} refused admission: {reason}")]
    AdmissionFailed {
        /// The session that refused.
        session_id: SessionId,
        /// What the session reported.
        reason: SessionError,
    },
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::AdmissionFailed { reason, .. } => Some(reason),
            Self::SessionNotFound { .. } => None,
        }
    }
}

#[derive(Debug)]
struct RegistryState {
    sessions: HashMap<SessionId, Arc<Session>>,
    open_session: Option<SessionId>,
    next_id: SessionId,
}

/// Routes joins to the open session and looks sessions up by id.
///
/// Exactly one session accepts new players at a time. Cloning is cheap and
/// every clone shares the same table.
///
/// Lock order is registry, then session. Status and guess requests take only
/// the session lock, after [`SessionRegistry::get`] has released the registry.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    state: Arc<Mutex<RegistryState>>,
    config: Arc<GameConfig>,
    archiver: Arc<dyn Archiver>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[instrument(skip(config, archiver))]
    pub fn new(config: GameConfig, archiver: Arc<dyn Archiver>) -> Self {
        info!("Creating session registry");
        Self {
            state: Arc::new(Mutex::new(RegistryState {
                sessions: HashMap::new(),
                open_session: None,
                next_id: 1,
            })),
            config: Arc::new(config),
            archiver,
        }
    }

    /// Rules every new session is created with.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds the caller to the open session, opening a new one if needed.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AdmissionFailed`] if a brand-new session
    /// rejects its first player.
    pub fn join_open_session(&self) -> Result<Admission, RegistryError> {
        self.join_open_session_at(Utc::now())
    }

    /// [`SessionRegistry::join_open_session`] observed at `now`.
    ///
    /// # Errors
    ///
    /// See [`SessionRegistry::join_open_session`].
    #[instrument(skip(self))]
    pub fn join_open_session_at(&self, now: DateTime<Utc>) -> Result<Admission, RegistryError> {
        let mut state = self.lock();

        if let Some(open_id) = state.open_session
            && let Some(session) = state.sessions.get(&open_id).cloned()
        {
            match session.admit_at(now) {
                Ok(player_id) => {
                    self.close_if_full(&mut state, open_id, player_id);
                    return Ok(Admission {
                        session_id: open_id,
                        player_id,
                    });
                }
                Err(e) => {
                    info!(
                        session_id = open_id,
                        reason = %e,
                        "Open session stopped accepting players"
                    );
                    state.open_session = None;
                }
            }
        }

        let session_id = state.next_id;
        state.next_id += 1;

        let session = Arc::new(Session::new(
            session_id,
            Arc::clone(&self.config),
            Arc::clone(&self.archiver),
            now,
        ));
        debug!(session_id, secret = %session.secret_code(), "Secret code generated");
        state.sessions.insert(session_id, Arc::clone(&session));
        state.open_session = Some(session_id);
        info!(session_id, "Opened new session");

        let player_id = session.admit_at(now).map_err(|reason| {
            error!(session_id, reason = %reason, "New session refused its first player");
            RegistryError::AdmissionFailed { session_id, reason }
        })?;
        self.close_if_full(&mut state, session_id, player_id);

        Ok(Admission {
            session_id,
            player_id,
        })
    }

    fn close_if_full(&self, state: &mut RegistryState, session_id: SessionId, player_id: PlayerId) {
        if player_id >= *self.config.max_players() {
            info!(session_id, "Session full, closed to new players");
            state.open_session = None;
        }
    }

    /// Looks up a session by id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::SessionNotFound`] for an id never issued.
    #[instrument(skip(self))]
    pub fn get(&self, session_id: SessionId) -> Result<Arc<Session>, RegistryError> {
        self.lock().sessions.get(&session_id).cloned().ok_or_else(|| {
            warn!(session_id, "Session not found");
            RegistryError::SessionNotFound { session_id }
        })
    }

    /// Id of the session currently accepting joins.
    pub fn open_session_id(&self) -> Option<SessionId> {
        self.lock().open_session
    }

    /// Number of sessions created so far.
    pub fn len(&self) -> usize {
        self.lock().sessions.len()
    }

    /// True before the first join.
    pub fn is_empty(&self) -> bool {
        self.lock().sessions.is_empty()
    }
}
