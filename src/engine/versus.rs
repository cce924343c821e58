use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use tracing::{debug, info};

use super::chase::{progress_from_score, ChaseTracker};
use super::reconciler::Reconciler;
use super::{Engine, EngineState, EngineStats, InputKind, NoteResultCallback, Outcome, PlayCore};
use crate::audio::AudioOutput;
use crate::chart::ChartLibrary;
use crate::lobby::{LobbyStore, Side};

/// Tuning knobs for a versus session.
#[derive(Debug, Clone, Copy)]
pub struct VersusOptions {
    pub poll_interval_ms: u64,
    pub score_ceiling: u32,
    pub restart_delay_ms: u64,
}

impl Default for VersusOptions {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            score_ceiling: 10_000,
            restart_delay_ms: 1_000,
        }
    }
}

/// Two-player session against a lobby authority.
///
/// Score is remote-owned: every non-Miss judgment pushes
/// `authoritative + delta` computed from the last pulled value, and the
/// displayed score is always the pulled one (no optimistic apply). Combo
/// and accuracy stay local. Both chase bars derive from the authoritative
/// scores, so the local pursuit model is bypassed entirely.
pub struct VersusEngine<L: LobbyStore> {
    core: PlayCore,
    lobby: Arc<L>,
    code: String,
    options: VersusOptions,
    reconciler: Option<Reconciler<L>>,
    chase: ChaseTracker,
    chart_id: Option<String>,
    end_handled: bool,
    restart_deadline: Option<Instant>,
    last_state_push_ms: f64,
}

impl<L: LobbyStore> VersusEngine<L> {
    pub fn new(
        library: Box<dyn ChartLibrary>,
        audio: Box<dyn AudioOutput>,
        lobby: Arc<L>,
        code: impl Into<String>,
        options: VersusOptions,
    ) -> Self {
        Self {
            core: PlayCore::new(library, audio),
            lobby,
            code: code.into(),
            options,
            reconciler: None,
            chase: ChaseTracker::new(),
            chart_id: None,
            end_handled: false,
            restart_deadline: None,
            last_state_push_ms: 0.0,
        }
    }

    /// Commit this client's side. Must happen before `start`; the side (and
    /// its chase role) then survives rematches. Must be called from within
    /// a tokio runtime.
    pub fn assign_side(&mut self, side: Side) {
        if self.reconciler.is_none() {
            self.reconciler = Some(Reconciler::new(Arc::clone(&self.lobby), &*self.code, side));
        }
    }

    pub fn side(&self) -> Option<Side> {
        self.reconciler.as_ref().map(|r| r.side())
    }

    /// The score shown to the player: always the last pulled authoritative
    /// value for our side, never a locally projected one.
    pub fn displayed_score(&self) -> u32 {
        match self.reconciler.as_ref() {
            Some(rec) => rec.snapshot().score_of(rec.side()),
            None => 0,
        }
    }

    /// Whether this client won, derivable only after the terminal latch.
    pub fn local_win(&self) -> Option<bool> {
        let side = self.side()?;
        self.chase.outcome().map(|o| side.role().wins(o))
    }

    /// One reconciling pull applied immediately. Gameplay never waits on
    /// this; it exists for session setup and tests.
    pub async fn sync(&self) -> Result<()> {
        match self.reconciler.as_ref() {
            Some(rec) => rec.pull_now().await,
            None => Ok(()),
        }
    }

    fn restart(&mut self) -> Result<()> {
        let Some(chart_id) = self.chart_id.clone() else {
            return Ok(());
        };
        info!(code = self.code, "rematch starting");
        self.end_handled = false;
        self.restart_deadline = None;
        self.chase.reset();
        self.last_state_push_ms = 0.0;
        if let Some(rec) = self.reconciler.as_mut() {
            rec.clear_mirror();
            rec.push_score(0);
            rec.push_state(0.0, 0.0, false, None);
        }
        self.core.load(&chart_id)?;
        self.core.start()?;
        if let Some(rec) = self.reconciler.as_mut() {
            rec.start_polling(self.options.poll_interval_ms);
        }
        Ok(())
    }

    fn handle_terminal(&mut self, outcome: Outcome, runner: f64, chaser: f64) {
        if self.end_handled {
            return;
        }
        self.end_handled = true;
        let won = self.local_win();
        info!(code = self.code, ?outcome, ?won, "versus session resolved");
        if let Some(rec) = self.reconciler.as_mut() {
            rec.push_state(runner, chaser, true, Some(outcome));
            rec.stop();
        }
        self.core.stop();
        self.restart_deadline =
            Some(Instant::now() + Duration::from_millis(self.options.restart_delay_ms));
    }
}

impl<L: LobbyStore> Engine for VersusEngine<L> {
    fn start(&mut self, chart_id: &str) -> Result<()> {
        if self.reconciler.is_none() {
            bail!("no side assigned for lobby {}", self.code);
        }
        self.chart_id = Some(chart_id.to_string());
        self.end_handled = false;
        self.restart_deadline = None;
        self.chase.reset();
        self.core.load(chart_id)?;
        self.core.start()?;
        if let Some(rec) = self.reconciler.as_mut() {
            rec.start_polling(self.options.poll_interval_ms);
        }
        Ok(())
    }

    fn update(&mut self) -> Result<()> {
        if let Some(deadline) = self.restart_deadline {
            if Instant::now() >= deadline {
                return self.restart();
            }
            return Ok(());
        }
        if self.core.state != EngineState::Running {
            return Ok(());
        }
        let frame = self.core.frame();
        if let Some(active) = frame.boost {
            self.chase.set_boost(active);
        }

        let Some(rec) = self.reconciler.as_ref() else {
            return Ok(());
        };
        // The mirror is read once per frame; pushes below are based on it.
        let snapshot = rec.snapshot();
        let side = rec.side();

        for result in &frame.results {
            if result.judgment.kind.is_miss() {
                continue;
            }
            rec.push_score(snapshot.score_of(side) + result.judgment.score);
        }

        let runner = progress_from_score(snapshot.score_of(Side::Red), self.options.score_ceiling);
        let chaser = progress_from_score(snapshot.score_of(Side::Blue), self.options.score_ceiling);
        self.chase.set_progress(runner, chaser);

        if frame.now_ms - self.last_state_push_ms >= self.options.poll_interval_ms as f64 {
            self.last_state_push_ms = frame.now_ms;
            rec.push_state(runner, chaser, self.chase.is_terminal(), self.chase.outcome());
        }

        if snapshot.game_over {
            if let Some(outcome) = snapshot.outcome {
                self.chase.latch_outcome(outcome);
            }
        }
        if let Some(outcome) = self.chase.evaluate() {
            self.handle_terminal(outcome, runner, chaser);
        }
        Ok(())
    }

    fn handle_input(&mut self, input: InputKind) {
        if self.reconciler.is_none() {
            debug!(code = self.code, "input dropped, no side assigned");
            return;
        }
        self.core.queue_input(input);
    }

    fn pause(&mut self) {
        self.core.pause();
    }

    fn resume(&mut self) {
        self.core.resume();
    }

    fn stop(&mut self) {
        self.restart_deadline = None;
        if let Some(rec) = self.reconciler.as_mut() {
            rec.stop();
        }
        self.core.stop();
    }

    fn set_volume(&mut self, volume: f32) {
        self.core.set_volume(volume);
    }

    fn state(&self) -> EngineState {
        self.core.state
    }

    fn stats(&self) -> EngineStats {
        EngineStats {
            score: self.displayed_score() as u64,
            runner_progress: self.chase.runner_progress(),
            chaser_progress: self.chase.chaser_progress(),
            boost_active: self.chase.boost_active(),
            game_over: self.chase.is_terminal(),
            outcome: self.chase.outcome(),
            ..self.core.stats()
        }
    }

    fn set_note_result_callback(&mut self, callback: NoteResultCallback) {
        self.core.set_callback(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SilentOutput;
    use crate::chart::MemoryChartLibrary;
    use crate::clock::MockTimeProvider;
    use crate::lobby::MemoryLobby;
    use crate::test_utils::test_chart;

    fn engine_with_clock(
        notes: &[(u32, usize, u32)],
        options: VersusOptions,
    ) -> (VersusEngine<MemoryLobby>, Arc<MemoryLobby>, MockTimeProvider) {
        let time = MockTimeProvider::new();
        let lobby = Arc::new(MemoryLobby::new());
        lobby.create("ROOM");
        let mut library = MemoryChartLibrary::new();
        library.insert("test", test_chart(notes));
        let mut engine = VersusEngine::new(
            Box::new(library),
            Box::new(SilentOutput::with_time(time.clone())),
            Arc::clone(&lobby),
            "ROOM",
            options,
        );
        engine.assign_side(Side::Red);
        engine.start("test").unwrap();
        (engine, lobby, time)
    }

    #[tokio::test]
    async fn push_is_authoritative_plus_delta_without_optimistic_apply() {
        // Scenario D: remote score 400, local Perfect worth 100.
        let (mut engine, lobby, _time) =
            engine_with_clock(&[(0, 0, 0)], VersusOptions::default());
        lobby.set_score("ROOM", Side::Red, 400).await.unwrap();
        engine.sync().await.unwrap();

        engine.handle_input(InputKind::Hit { lane: 0 });
        engine.update().unwrap();
        // Display still shows the pulled value, not 500.
        assert_eq!(engine.displayed_score(), 400);

        tokio::task::yield_now().await;
        assert_eq!(lobby.fetch("ROOM").await.unwrap().red_score, 500);

        engine.sync().await.unwrap();
        assert_eq!(engine.displayed_score(), 500);
    }

    #[tokio::test]
    async fn pulls_never_touch_combo_or_accuracy() {
        let (mut engine, lobby, _time) =
            engine_with_clock(&[(0, 0, 0)], VersusOptions::default());
        engine.handle_input(InputKind::Hit { lane: 0 });
        engine.update().unwrap();
        assert_eq!(engine.stats().combo, 1);

        lobby.set_score("ROOM", Side::Red, 9_999).await.unwrap();
        engine.sync().await.unwrap();
        engine.update().unwrap();

        let stats = engine.stats();
        assert_eq!(stats.combo, 1);
        assert!((stats.accuracy - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn progress_derives_from_authoritative_scores() {
        let (mut engine, lobby, _time) =
            engine_with_clock(&[(1_000_000, 0, 0)], VersusOptions::default());
        lobby.set_score("ROOM", Side::Red, 2_500).await.unwrap();
        lobby.set_score("ROOM", Side::Blue, 5_000).await.unwrap();
        engine.sync().await.unwrap();
        engine.update().unwrap();

        let stats = engine.stats();
        assert!((stats.runner_progress - 25.0).abs() < 1e-9);
        assert!((stats.chaser_progress - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn remote_terminal_latch_fires_once() {
        // Scenario E: two polls observe the same game-over record.
        let options = VersusOptions {
            restart_delay_ms: 60_000,
            ..Default::default()
        };
        let (mut engine, lobby, _time) = engine_with_clock(&[(1_000_000, 0, 0)], options);
        lobby
            .update_game_state("ROOM", 30.0, 100.0, true, Some(Outcome::ChaserCaught))
            .await
            .unwrap();

        engine.sync().await.unwrap();
        engine.update().unwrap();
        assert_eq!(engine.state(), EngineState::Stopped);
        assert_eq!(engine.local_win(), Some(false));
        assert!(engine.end_handled);

        // A second observation of the same record changes nothing.
        engine.update().unwrap();
        assert_eq!(engine.state(), EngineState::Stopped);
        assert_eq!(engine.stats().outcome, Some(Outcome::ChaserCaught));
    }

    #[tokio::test]
    async fn rematch_restarts_with_side_preserved() {
        let options = VersusOptions {
            restart_delay_ms: 0,
            ..Default::default()
        };
        let (mut engine, lobby, _time) = engine_with_clock(&[(1_000_000, 0, 0)], options);
        lobby
            .update_game_state("ROOM", 100.0, 20.0, true, Some(Outcome::RunnerEscaped))
            .await
            .unwrap();

        engine.sync().await.unwrap();
        engine.update().unwrap();
        assert_eq!(engine.state(), EngineState::Stopped);

        // Deadline of zero: the next tick performs the restart.
        engine.update().unwrap();
        assert_eq!(engine.state(), EngineState::Running);
        assert_eq!(engine.side(), Some(Side::Red));
        assert_eq!(engine.stats().outcome, None);
        assert!(!engine.end_handled);
    }

    #[tokio::test]
    async fn input_without_side_is_dropped() {
        let time = MockTimeProvider::new();
        let lobby = Arc::new(MemoryLobby::new());
        lobby.create("ROOM");
        let mut library = MemoryChartLibrary::new();
        library.insert("test", test_chart(&[(0, 0, 0)]));
        let mut engine = VersusEngine::new(
            Box::new(library),
            Box::new(SilentOutput::with_time(time.clone())),
            lobby,
            "ROOM",
            VersusOptions::default(),
        );

        assert!(engine.start("test").is_err());
        engine.handle_input(InputKind::Hit { lane: 0 });
        assert_eq!(engine.stats().miss_count, 0);
    }
}
