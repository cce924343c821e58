use anyhow::Result;
use tracing::info;

use super::chase::ChaseTracker;
use super::{Engine, EngineState, EngineStats, InputKind, NoteResultCallback, PlayCore};
use crate::audio::AudioOutput;
use crate::chart::ChartLibrary;

/// Single-player session. The chase runs entirely on the local model: the
/// chaser gains on wall-clock time, the runner on judgments. Reaching a
/// terminal outcome stops the session.
pub struct SoloEngine {
    core: PlayCore,
    chase: ChaseTracker,
}

impl SoloEngine {
    pub fn new(library: Box<dyn ChartLibrary>, audio: Box<dyn AudioOutput>) -> Self {
        Self {
            core: PlayCore::new(library, audio),
            chase: ChaseTracker::new(),
        }
    }
}

impl Engine for SoloEngine {
    fn start(&mut self, chart_id: &str) -> Result<()> {
        self.core.load(chart_id)?;
        self.chase.reset();
        self.core.start()
    }

    fn update(&mut self) -> Result<()> {
        if self.core.state != EngineState::Running {
            return Ok(());
        }
        let frame = self.core.frame();

        if let Some(active) = frame.boost {
            self.chase.set_boost(active);
        }
        self.chase.advance_time(frame.dt_ms);
        for result in &frame.results {
            self.chase
                .record_judgment(result.judgment.kind, self.core.score.combo);
        }

        // Surviving the whole chart counts as an escape.
        if frame.chart_done && !self.chase.is_terminal() {
            self.chase.set_progress(100.0, self.chase.chaser_progress());
        }

        if let Some(outcome) = self.chase.evaluate() {
            info!(?outcome, score = self.core.score.score, "chase resolved");
            self.core.stop();
        }
        Ok(())
    }

    fn handle_input(&mut self, input: InputKind) {
        self.core.queue_input(input);
    }

    fn pause(&mut self) {
        self.core.pause();
    }

    fn resume(&mut self) {
        self.core.resume();
    }

    fn stop(&mut self) {
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
