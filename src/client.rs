//! REST client for the game server.

use anyhow::{Context, Result};
use reqwest::Url;
use tracing::{debug, info, instrument};

use crate::api::{GuessResponse, JoinResponse, StatusResponse};
use crate::session::{PlayerId, SessionId};

/// Typed HTTP client for `/join`, `/status` and `/guess`.
#[derive(Debug, Clone)]
pub struct GameClient {
    base_url: String,
    client: reqwest::Client,
}

impl GameClient {
    /// Creates a client for the server at `base_url`, e.g. `http://localhost:8080`.
    #[instrument]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> Result<Url> {
        Url::parse_with_params(&format!("{}/{}", self.base_url, path), params)
            .with_context(|| format!("Invalid server URL {}", self.base_url))
    }

    /// Joins the currently open game.
    #[instrument(skip(self))]
    pub async fn join(&self) -> Result<JoinResponse> {
        let response = self.client.get(self.url("join", &[])?).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body: GuessResponse = response.json().await?;
            anyhow::bail!("Join failed ({}): {}", status, body.message);
        }

        let joined: JoinResponse = response.json().await?;
        info!(game_id = joined.game_id, player_id = joined.player_id, "Joined game");
        Ok(joined)
    }

    /// Polls the phase of `game_id`.
    #[instrument(skip(self))]
    pub async fn status(&self, game_id: SessionId) -> Result<StatusResponse> {
        let url = self.url("status", &[("game_id", game_id.to_string())])?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body: GuessResponse = response.json().await?;
            anyhow::bail!("Status failed ({}): {}", status, body.message);
        }

        let report: StatusResponse = response.json().await?;
        debug!(phase = %report.phase, is_begin = report.is_begin, "Status received");
        Ok(report)
    }

    /// Submits a guess.
    ///
    /// Rejections (bad format, game over, ...) come back as a
    /// [`GuessResponse`] carrying only a message, not as an error.
    #[instrument(skip(self))]
    pub async fn guess(
        &self,
        game_id: SessionId,
        player_id: PlayerId,
        guess: &str,
    ) -> Result<GuessResponse> {
        let url = self.url(
            "guess",
            &[
                ("guess", guess.to_string()),
                ("player_id", player_id.to_string()),
                ("game_id", game_id.to_string()),
            ],
        )?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body: GuessResponse = response
            .json()
            .await
            .with_context(|| format!("Unreadable guess response ({})", status))?;
        debug!(%status, message = %body.message, "Guess response received");
        Ok(body)
    }
}
