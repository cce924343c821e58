use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::Outcome;
use crate::lobby::{LobbyScoreRecord, LobbyStore, Side};

/// Maintains the local mirror of the remote lobby record.
///
/// Pushes are fire-and-forget: gameplay never blocks on the network, and a
/// failed push is only logged (the next one carries fresher state anyway).
/// Pulls run on a fixed interval and replace the mirror wholesale. The
/// generation counter fences teardown: a pull that completes after `stop`
/// finds the generation bumped and throws its result away.
pub struct Reconciler<L: LobbyStore> {
    lobby: Arc<L>,
    code: String,
    side: Side,
    mirror: Arc<Mutex<LobbyScoreRecord>>,
    generation: Arc<AtomicU64>,
    poll_task: Option<JoinHandle<()>>,
    handle: Handle,
}

impl<L: LobbyStore> Reconciler<L> {
    /// Must be called from within a tokio runtime.
    pub fn new(lobby: Arc<L>, code: impl Into<String>, side: Side) -> Self {
        let code = code.into();
        Self {
            lobby,
            mirror: Arc::new(Mutex::new(LobbyScoreRecord {
                code: code.clone(),
                ..Default::default()
            })),
            code,
            side,
            generation: Arc::new(AtomicU64::new(0)),
            poll_task: None,
            handle: Handle::current(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Latest pulled record. Staleness is bounded by the poll interval.
    pub fn snapshot(&self) -> LobbyScoreRecord {
        self.mirror.lock().unwrap().clone()
    }

    /// Begin pulling the lobby record every `interval_ms`.
    pub fn start_polling(&mut self, interval_ms: u64) {
        if self.poll_task.is_some() {
            return;
        }
        let lobby = Arc::clone(&self.lobby);
        let code = self.code.clone();
        let mirror = Arc::clone(&self.mirror);
        let generation = Arc::clone(&self.generation);
        let my_generation = generation.load(Ordering::SeqCst);

        self.poll_task = Some(self.handle.spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match lobby.fetch(&code).await {
                    Ok(record) => {
                        if generation.load(Ordering::SeqCst) != my_generation {
                            return;
                        }
                        *mirror.lock().unwrap() = record;
                    }
                    Err(err) => {
                        debug!(code, %err, "lobby pull failed, keeping stale mirror");
                    }
                }
            }
        }));
    }

    /// One pull applied immediately, subject to the same generation fence.
    pub async fn pull_now(&self) -> anyhow::Result<()> {
        let my_generation = self.generation.load(Ordering::SeqCst);
        let record = self.lobby.fetch(&self.code).await?;
        if self.generation.load(Ordering::SeqCst) == my_generation {
            *self.mirror.lock().unwrap() = record;
        }
        Ok(())
    }

    /// Reset the mirror to an empty record, e.g. across a rematch, so a
    /// stale terminal snapshot cannot leak into the new session.
    pub fn clear_mirror(&self) {
        *self.mirror.lock().unwrap() = LobbyScoreRecord {
            code: self.code.clone(),
            ..Default::default()
        };
    }

    /// Fire-and-forget replacement of this side's score column.
    pub fn push_score(&self, score: u32) {
        let lobby = Arc::clone(&self.lobby);
        let code = self.code.clone();
        let side = self.side;
        self.handle.spawn(async move {
            if let Err(err) = lobby.set_score(&code, side, score).await {
                warn!(code, ?side, score, %err, "score push failed");
            }
        });
    }

    /// Fire-and-forget replacement of the shared chase fields.
    pub fn push_state(
        &self,
        runner_progress: f64,
        chaser_progress: f64,
        game_over: bool,
        outcome: Option<Outcome>,
    ) {
        let lobby = Arc::clone(&self.lobby);
        let code = self.code.clone();
        self.handle.spawn(async move {
            if let Err(err) = lobby
                .update_game_state(&code, runner_progress, chaser_progress, game_over, outcome)
                .await
            {
                warn!(code, %err, "state push failed");
            }
        });
    }

    /// Tear down polling. A pull already in flight cannot write the mirror
    /// after this returns.
    pub fn stop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }
}

impl<L: LobbyStore> Drop for Reconciler<L> {
    fn drop(&mut self) {
        self.stop();
    }
}
