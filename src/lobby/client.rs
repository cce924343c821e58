use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::record::{LobbyScoreRecord, Side};
use super::LobbyStore;
use crate::engine::Outcome;

const USER_AGENT: &str = concat!("chasebeat/", env!("CARGO_PKG_VERSION"));

/// HTTP client for a remote lobby service.
///
/// Endpoints:
///   POST {base}/lobby/{code}/score   — replace the caller's score column
///   POST {base}/lobby/{code}/state   — replace the shared chase fields
///   GET  {base}/lobby/{code}         — fetch the full record
pub struct LobbyClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct ScorePush {
    side: Side,
    score: u32,
}

#[derive(Serialize)]
struct StatePush {
    runner_progress: f64,
    chaser_progress: f64,
    game_over: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<Outcome>,
}

impl LobbyClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self { client, base_url })
    }

    fn lobby_url(&self, code: &str) -> String {
        format!("{}/lobby/{}", self.base_url, code)
    }
}

impl LobbyStore for LobbyClient {
    async fn set_score(&self, code: &str, side: Side, score: u32) -> Result<()> {
        let url = format!("{}/score", self.lobby_url(code));
        debug!(code, ?side, score, "pushing score");
        self.client
            .post(&url)
            .json(&ScorePush { side, score })
            .send()
            .await
            .context("Failed to push score")?
            .error_for_status()
            .context("Lobby rejected score push")?;
        Ok(())
    }

    async fn update_game_state(
        &self,
        code: &str,
        runner_progress: f64,
        chaser_progress: f64,
        game_over: bool,
        outcome: Option<Outcome>,
    ) -> Result<()> {
        let url = format!("{}/state", self.lobby_url(code));
        self.client
            .post(&url)
            .json(&StatePush {
                runner_progress,
                chaser_progress,
                game_over,
                outcome,
            })
            .send()
            .await
            .context("Failed to push state")?
            .error_for_status()
            .context("Lobby rejected state push")?;
        Ok(())
    }

    async fn fetch(&self, code: &str) -> Result<LobbyScoreRecord> {
        let url = self.lobby_url(code);
        let record = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch lobby record")?
            .error_for_status()
            .context("Lobby fetch failed")?
            .json::<LobbyScoreRecord>()
            .await
            .context("Failed to decode lobby record")?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_stripped() {
        let client = LobbyClient::new("http://localhost:3000//").unwrap();
        assert_eq!(client.lobby_url("ABCD"), "http://localhost:3000/lobby/ABCD");
    }
}
