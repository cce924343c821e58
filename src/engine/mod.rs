pub mod chase;
pub mod judge;
pub mod reconciler;
pub mod scheduler;
pub mod score;
pub mod solo;
pub mod versus;

pub use chase::{progress_from_score, ChaseTracker, Outcome};
pub use judge::{JudgeKind, JudgeWindows, Judgment};
pub use reconciler::Reconciler;
pub use scheduler::{NoteScheduler, NoteState};
pub use score::ScoreTracker;
pub use solo::SoloEngine;
pub use versus::VersusEngine;

use anyhow::{bail, Result};
use tracing::{debug, info};

use crate::audio::AudioOutput;
use crate::chart::{Chart, ChartLibrary, LANE_COUNT};
use crate::clock::PlaybackClock;

/// Raw player input. Inputs are queued and applied at the next frame
/// boundary, in arrival order, against a single clock read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputKind {
    Hit { lane: usize },
    Release { lane: usize },
    BoostDown,
    BoostUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Paused,
    Stopped,
}

/// One resolved judgment, pushed to the note-result callback as it lands.
/// `note_index` is None for a press that matched no note.
#[derive(Debug, Clone, Copy)]
pub struct NoteResult {
    pub judgment: Judgment,
    pub note_index: Option<usize>,
    pub lane: usize,
}

pub type NoteResultCallback = Box<dyn FnMut(&NoteResult) + Send>;

/// Snapshot of the play session for display.
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    pub score: u64,
    pub combo: u32,
    pub max_combo: u32,
    pub accuracy: f64,
    pub perfect_count: u32,
    pub great_count: u32,
    pub good_count: u32,
    pub miss_count: u32,
    pub runner_progress: f64,
    pub chaser_progress: f64,
    pub boost_active: bool,
    pub game_over: bool,
    pub outcome: Option<Outcome>,
}

/// Session-mode facade over a loaded chart. `SoloEngine` derives the chase
/// entirely locally; `VersusEngine` defers score and terminal state to the
/// lobby authority.
pub trait Engine {
    /// Load the chart and begin the session.
    fn start(&mut self, chart_id: &str) -> Result<()>;
    /// Advance one frame: drain queued inputs, expire late notes, update
    /// the chase, and fire callbacks.
    fn update(&mut self) -> Result<()>;
    fn handle_input(&mut self, input: InputKind);
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self);
    fn set_volume(&mut self, volume: f32);
    fn state(&self) -> EngineState;
    fn stats(&self) -> EngineStats;
    fn set_note_result_callback(&mut self, callback: NoteResultCallback);
}

struct LoadedChart {
    chart: Chart,
    scheduler: NoteScheduler,
}

/// Output of one `PlayCore::frame` pass, consumed by the mode wrappers.
pub(crate) struct FrameOutput {
    pub now_ms: f64,
    pub dt_ms: f64,
    pub results: Vec<NoteResult>,
    /// Final boost key state this frame, if any boost event arrived.
    pub boost: Option<bool>,
    /// Every chart note has resolved and no sustain is held.
    pub chart_done: bool,
}

/// Chart, clock, scheduler and score shared by both session modes. Owns
/// the judge loop; the wrappers own the chase and (in versus) the lobby.
pub(crate) struct PlayCore {
    library: Box<dyn ChartLibrary>,
    audio: Box<dyn AudioOutput>,
    clock: PlaybackClock,
    windows: JudgeWindows,
    loaded: Option<LoadedChart>,
    pub(crate) score: ScoreTracker,
    queued: Vec<InputKind>,
    callback: Option<NoteResultCallback>,
    pub(crate) state: EngineState,
    last_now_ms: f64,
}

impl PlayCore {
    pub(crate) fn new(library: Box<dyn ChartLibrary>, audio: Box<dyn AudioOutput>) -> Self {
        Self {
            library,
            audio,
            clock: PlaybackClock::new(0.0),
            windows: JudgeWindows::normal(),
            loaded: None,
            score: ScoreTracker::new(),
            queued: Vec::new(),
            callback: None,
            state: EngineState::Idle,
            last_now_ms: 0.0,
        }
    }

    pub(crate) fn load(&mut self, chart_id: &str) -> Result<()> {
        if self.state == EngineState::Running || self.state == EngineState::Paused {
            bail!("cannot load a chart while a session is active");
        }
        let chart = self.library.load(chart_id)?;
        info!(
            chart_id,
            notes = chart.note_count(),
            bpm = chart.tempo.initial_bpm(),
            "chart loaded"
        );
        self.clock = PlaybackClock::new(chart.metadata.offset_ms);
        let scheduler = NoteScheduler::new(&chart);
        self.loaded = Some(LoadedChart { chart, scheduler });
        self.state = EngineState::Idle;
        Ok(())
    }

    pub(crate) fn start(&mut self) -> Result<()> {
        let Some(loaded) = self.loaded.as_mut() else {
            bail!("no chart loaded");
        };
        loaded.scheduler.reset();
        self.score.reset();
        self.queued.clear();
        self.audio.start()?;
        self.last_now_ms = self.clock.now_ms(self.audio.as_ref());
        self.state = EngineState::Running;
        Ok(())
    }

    pub(crate) fn queue_input(&mut self, input: InputKind) {
        if self.state == EngineState::Running {
            self.queued.push(input);
        }
    }

    pub(crate) fn pause(&mut self) {
        if self.state == EngineState::Running {
            self.audio.pause();
            self.state = EngineState::Paused;
        }
    }

    pub(crate) fn resume(&mut self) {
        if self.state == EngineState::Paused {
            self.audio.resume();
            self.state = EngineState::Running;
        }
    }

    /// Idempotent: a second stop is a no-op.
    pub(crate) fn stop(&mut self) {
        if self.state == EngineState::Stopped {
            return;
        }
        self.audio.stop();
        self.queued.clear();
        self.state = EngineState::Stopped;
    }

    pub(crate) fn set_callback(&mut self, callback: NoteResultCallback) {
        self.callback = Some(callback);
    }

    pub(crate) fn set_volume(&mut self, volume: f32) {
        self.audio.set_volume(volume);
    }

    pub(crate) fn stats(&self) -> EngineStats {
        EngineStats {
            score: self.score.score,
            combo: self.score.combo,
            max_combo: self.score.max_combo,
            accuracy: self.score.accuracy(),
            perfect_count: self.score.perfect_count,
            great_count: self.score.great_count,
            good_count: self.score.good_count,
            miss_count: self.score.miss_count,
            ..Default::default()
        }
    }

    /// One judge pass against a single clock read. Order: overdue holds
    /// complete, queued inputs resolve in arrival order, then late pending
    /// notes expire as Misses.
    pub(crate) fn frame(&mut self) -> FrameOutput {
        let now = self.clock.now_ms(self.audio.as_ref());
        let dt = (now - self.last_now_ms).max(0.0);
        self.last_now_ms = now;

        let mut results = Vec::new();
        let mut boost = None;

        if self.state != EngineState::Running {
            return FrameOutput {
                now_ms: now,
                dt_ms: 0.0,
                results,
                boost,
                chart_done: false,
            };
        }

        let Some(loaded) = self.loaded.as_mut() else {
            return FrameOutput {
                now_ms: now,
                dt_ms: dt,
                results,
                boost,
                chart_done: false,
            };
        };
        let chart = &loaded.chart;
        let scheduler = &mut loaded.scheduler;

        for index in scheduler.finish_overdue_holds(chart, now) {
            let bonus = self.score.apply_sustain_bonus(1.0);
            debug!(index, bonus, "sustain held to completion");
        }

        for input in std::mem::take(&mut self.queued) {
            match input {
                InputKind::Hit { lane } => {
                    if lane >= LANE_COUNT {
                        continue;
                    }
                    match scheduler.earliest_in_window(chart, lane, now, &self.windows) {
                        Some(index) => {
                            let note = &chart.notes[index];
                            let offset = now - note.time_ms;
                            let kind = self.windows.judge(offset);
                            scheduler.mark_judged(index, kind);
                            let judgment = self.score.apply(kind, offset, &self.windows);
                            if !kind.is_miss() && note.is_sustain() {
                                if let Some(ratio) = scheduler.begin_hold(chart, lane, index, now) {
                                    let bonus = self.score.apply_sustain_bonus(ratio);
                                    debug!(lane, ratio, bonus, "open sustain closed by next hit");
                                }
                            }
                            results.push(NoteResult {
                                judgment,
                                note_index: Some(index),
                                lane,
                            });
                        }
                        None => {
                            // Ghost press: breaks combo, scores nothing.
                            let judgment =
                                self.score.apply(JudgeKind::Miss, 0.0, &self.windows);
                            results.push(NoteResult {
                                judgment,
                                note_index: None,
                                lane,
                            });
                        }
                    }
                }
                InputKind::Release { lane } => {
                    if lane >= LANE_COUNT {
                        continue;
                    }
                    if let Some(ratio) = scheduler.release_hold(chart, lane, now) {
                        let bonus = self.score.apply_sustain_bonus(ratio);
                        debug!(lane, ratio, bonus, "sustain released");
                    }
                }
                InputKind::BoostDown => boost = Some(true),
                InputKind::BoostUp => boost = Some(false),
            }
        }

        for index in scheduler.expire_missed(chart, now, &self.windows) {
            let note = &chart.notes[index];
            let judgment =
                self.score
                    .apply(JudgeKind::Miss, now - note.time_ms, &self.windows);
            results.push(NoteResult {
                judgment,
                note_index: Some(index),
                lane: note.lane,
            });
        }

        let chart_done = scheduler.all_resolved()
            && (0..LANE_COUNT).all(|lane| scheduler.held_note(lane).is_none());

        if let Some(callback) = self.callback.as_mut() {
            for result in &results {
                callback(result);
            }
        }

        FrameOutput {
            now_ms: now,
            dt_ms: dt,
            results,
            boost,
            chart_done,
        }
    }
}
