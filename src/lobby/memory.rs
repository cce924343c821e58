use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{bail, Result};

use super::record::{LobbyScoreRecord, Side};
use super::LobbyStore;
use crate::engine::Outcome;

/// In-process lobby authority. Used for local versus sessions and tests;
/// applies the same additive-write rules as the remote service.
#[derive(Default)]
pub struct MemoryLobby {
    lobbies: Mutex<HashMap<String, LobbyScoreRecord>>,
}

impl MemoryLobby {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, code: &str) {
        let mut lobbies = self.lobbies.lock().unwrap();
        lobbies.entry(code.to_string()).or_insert_with(|| LobbyScoreRecord {
            code: code.to_string(),
            ..Default::default()
        });
    }

    fn with_record<T>(
        &self,
        code: &str,
        f: impl FnOnce(&mut LobbyScoreRecord) -> T,
    ) -> Result<T> {
        let mut lobbies = self.lobbies.lock().unwrap();
        match lobbies.get_mut(code) {
            Some(record) => Ok(f(record)),
            None => bail!("unknown lobby {code}"),
        }
    }
}

impl LobbyStore for MemoryLobby {
    async fn set_score(&self, code: &str, side: Side, score: u32) -> Result<()> {
        self.with_record(code, |record| record.set_score_of(side, score))
    }

    async fn update_game_state(
        &self,
        code: &str,
        runner_progress: f64,
        chaser_progress: f64,
        game_over: bool,
        outcome: Option<Outcome>,
    ) -> Result<()> {
        self.with_record(code, |record| {
            record.runner_progress = runner_progress;
            record.chaser_progress = chaser_progress;
            record.game_over = game_over;
            if outcome.is_some() {
                record.outcome = outcome;
            }
        })
    }

    async fn fetch(&self, code: &str) -> Result<LobbyScoreRecord> {
        self.with_record(code, |record| record.clone())
    }
}
