//! HTTP transport: `GET /join`, `GET /status`, `GET /guess`.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{debug, error, info, instrument, warn};

use crate::api::{GuessQuery, GuessResponse, JoinResponse, StatusQuery, StatusResponse};
use crate::registry::{RegistryError, SessionRegistry};
use crate::session::SessionError;

/// Builds the game router over a shared registry.
#[instrument(skip(registry))]
pub fn router(registry: SessionRegistry) -> Router {
    info!("Building game router");
    Router::new()
        .route("/join", get(join))
        .route("/status", get(status))
        .route("/guess", get(guess))
        .with_state(registry)
}

/// Binds `host:port` and serves the game until the listener fails.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server stops.
#[instrument(skip(registry))]
pub async fn serve(registry: SessionRegistry, host: String, port: u16) -> anyhow::Result<()> {
    let app = router(registry);
    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    info!(address = %listener.local_addr()?, "Server ready");
    axum::serve(listener, app).await?;
    Ok(())
}

#[instrument(skip(registry))]
async fn join(State(registry): State<SessionRegistry>) -> Result<Json<JoinResponse>, ApiError> {
    let admission = registry.join_open_session()?;
    let config = registry.config();

    info!(
        session_id = admission.session_id(),
        player_id = admission.player_id(),
        "Player joined"
    );

    Ok(Json(JoinResponse {
        message: "You joined the game".to_string(),
        attempts: *config.max_attempts(),
        time_limit_secs: *config.play_secs(),
        code_length: *config.code_length(),
        player_id: *admission.player_id(),
        game_id: *admission.session_id(),
    }))
}

#[instrument(skip(registry))]
async fn status(
    State(registry): State<SessionRegistry>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Query(query) = query?;
    let session = registry.get(query.game_id)?;
    let report = session.status();
    Ok(Json(StatusResponse::from(&report)))
}

#[instrument(skip(registry))]
async fn guess(
    State(registry): State<SessionRegistry>,
    query: Result<Query<GuessQuery>, QueryRejection>,
) -> Result<Json<GuessResponse>, ApiError> {
    let Query(query) = query?;
    debug!(
        game_id = query.game_id,
        player_id = query.player_id,
        guess = %query.guess,
        "Guess received"
    );
    let session = registry.get(query.game_id)?;

    // Ending a game writes the archive file; keep that off the async workers.
    let outcome = tokio::task::spawn_blocking(move || {
        session.submit_guess(query.player_id, &query.guess)
    })
    .await
    .map_err(|e| {
        error!(error = %e, "Guess task failed");
        ApiError::internal("Failed to process guess")
    })??;

    Ok(Json(GuessResponse::from(&outcome)))
}

/// Rejection returned to the client as JSON.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: GuessResponse,
}

impl ApiError {
    fn internal(message: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: GuessResponse::message(message, None),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        let (status, is_end) = match &err {
            SessionError::UnknownPlayer { .. } => (StatusCode::NOT_FOUND, None),
            SessionError::SessionFull { .. } | SessionError::SessionNotJoinable { .. } => {
                (StatusCode::CONFLICT, None)
            }
            SessionError::NotStarted { .. } => (StatusCode::CONFLICT, Some(false)),
            SessionError::InvalidGuess(_) => (StatusCode::BAD_REQUEST, Some(false)),
            SessionError::SessionEnded | SessionError::AttemptsExhausted { .. } => {
                (StatusCode::BAD_REQUEST, Some(true))
            }
        };
        warn!(%status, error = %err, "Request rejected");
        Self {
            status,
            body: GuessResponse::message(err.to_string(), is_end),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let status = match &err {
            RegistryError::SessionNotFound { .. } => StatusCode::NOT_FOUND,
            RegistryError::AdmissionFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!(%status, error = %err, "Request rejected");
        Self {
            status,
            body: GuessResponse::message(err.to_string(), None),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        warn!(error = %rejection, "Malformed query");
        Self {
            status: StatusCode::BAD_REQUEST,
            body: GuessResponse::message(rejection.body_text(), None),
        }
    }
}
