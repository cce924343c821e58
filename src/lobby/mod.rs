pub mod client;
pub mod memory;
pub mod record;

pub use client::LobbyClient;
pub use memory::MemoryLobby;
pub use record::{LobbyScoreRecord, Role, Side};

use std::future::Future;

use crate::engine::Outcome;

/// Remote authority over the shared lobby record. Writes are additive:
/// `set_score` replaces only the caller's own score column,
/// `update_game_state` replaces only the shared chase fields.
/// Implementations must never clear a field the caller did not send.
pub trait LobbyStore: Send + Sync + 'static {
    fn set_score(
        &self,
        code: &str,
        side: Side,
        score: u32,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn update_game_state(
        &self,
        code: &str,
        runner_progress: f64,
        chaser_progress: f64,
        game_over: bool,
        outcome: Option<Outcome>,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn fetch(&self, code: &str) -> impl Future<Output = anyhow::Result<LobbyScoreRecord>> + Send;
}
