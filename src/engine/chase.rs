use serde::{Deserialize, Serialize};

use super::judge::JudgeKind;

/// Terminal result of the chase. Mutually exclusive; the runner-escapes
/// outcome wins a same-step tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    RunnerEscaped,
    ChaserCaught,
}

/// The two competing progress values of the chase meta-game.
///
/// Single-player: the chaser gains with wall-clock time no matter how the
/// song goes, the runner gains per non-Miss judgment (boosted while the
/// boost key is held), so good play outruns the baseline pursuit. In
/// multiplayer both values are overwritten from the authoritative score
/// feed via `set_progress` and the local gain model is bypassed.
#[derive(Debug, Clone)]
pub struct ChaseTracker {
    runner: f64,
    chaser: f64,
    boost: bool,
    outcome: Option<Outcome>,
}

impl ChaseTracker {
    /// Baseline pursuit: the chaser reaches 100 in 90 seconds of inaction.
    const CHASER_RATE_PER_SEC: f64 = 100.0 / 90.0;
    const PERFECT_GAIN: f64 = 1.5;
    const GREAT_GAIN: f64 = 1.0;
    const GOOD_GAIN: f64 = 0.6;
    const STREAK_BONUS: f64 = 0.2;
    const STREAK_COMBO: u32 = 10;
    const BOOST_MULTIPLIER: f64 = 1.5;

    pub fn new() -> Self {
        Self {
            runner: 0.0,
            chaser: 0.0,
            boost: false,
            outcome: None,
        }
    }

    pub fn runner_progress(&self) -> f64 {
        self.runner
    }

    pub fn chaser_progress(&self) -> f64 {
        self.chaser
    }

    pub fn boost_active(&self) -> bool {
        self.boost
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn set_boost(&mut self, active: bool) {
        self.boost = active;
    }

    /// Advance the baseline pursuit by elapsed wall-clock time.
    pub fn advance_time(&mut self, dt_ms: f64) {
        if self.is_terminal() || dt_ms <= 0.0 {
            return;
        }
        self.chaser = (self.chaser + Self::CHASER_RATE_PER_SEC * dt_ms / 1000.0).min(100.0);
    }

    /// Credit the runner for one judgment. `combo` is the combo after the
    /// judgment was applied.
    pub fn record_judgment(&mut self, kind: JudgeKind, combo: u32) {
        if self.is_terminal() {
            return;
        }
        let mut gain = match kind {
            JudgeKind::Perfect => Self::PERFECT_GAIN,
            JudgeKind::Great => Self::GREAT_GAIN,
            JudgeKind::Good => Self::GOOD_GAIN,
            JudgeKind::Miss => return,
        };
        if combo >= Self::STREAK_COMBO {
            gain += Self::STREAK_BONUS;
        }
        if self.boost {
            gain *= Self::BOOST_MULTIPLIER;
        }
        self.runner = (self.runner + gain).min(100.0);
    }

    /// Overwrite both values from the authoritative score feed (clamped).
    pub fn set_progress(&mut self, runner: f64, chaser: f64) {
        self.runner = runner.clamp(0.0, 100.0);
        self.chaser = chaser.clamp(0.0, 100.0);
    }

    /// Adopt an externally decided outcome. First writer wins; a later
    /// local evaluation cannot overwrite it.
    pub fn latch_outcome(&mut self, outcome: Outcome) {
        if self.outcome.is_none() {
            self.outcome = Some(outcome);
        }
    }

    /// Latch the terminal outcome once either side reaches 100. Checked
    /// runner-first so a same-step tie favors the performer's escape.
    pub fn evaluate(&mut self) -> Option<Outcome> {
        if self.outcome.is_none() {
            if self.runner >= 100.0 {
                self.outcome = Some(Outcome::RunnerEscaped);
            } else if self.chaser >= 100.0 {
                self.outcome = Some(Outcome::ChaserCaught);
            }
        }
        self.outcome
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for ChaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Multiplayer mapping from an authoritative score to chase progress.
pub fn progress_from_score(score: u32, ceiling: u32) -> f64 {
    if ceiling == 0 {
        return 0.0;
    }
    (score as f64 / ceiling as f64 * 100.0).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chaser_advances_with_time_only() {
        let mut chase = ChaseTracker::new();
        chase.advance_time(9_000.0);
        assert!((chase.chaser_progress() - 10.0).abs() < 1e-9);
        assert_eq!(chase.runner_progress(), 0.0);
    }

    #[test]
    fn runner_gains_per_judgment_with_streak_bonus() {
        let mut chase = ChaseTracker::new();
        chase.record_judgment(JudgeKind::Perfect, 1);
        assert!((chase.runner_progress() - 1.5).abs() < 1e-9);
        chase.record_judgment(JudgeKind::Good, 15);
        assert!((chase.runner_progress() - 2.3).abs() < 1e-9);
        chase.record_judgment(JudgeKind::Miss, 0);
        assert!((chase.runner_progress() - 2.3).abs() < 1e-9);
    }

    #[test]
    fn boost_multiplies_runner_gain() {
        let mut chase = ChaseTracker::new();
        chase.set_boost(true);
        assert!(chase.boost_active());
        chase.record_judgment(JudgeKind::Great, 1);
        assert!((chase.runner_progress() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn progress_is_clamped() {
        let mut chase = ChaseTracker::new();
        chase.set_progress(250.0, -10.0);
        assert_eq!(chase.runner_progress(), 100.0);
        assert_eq!(chase.chaser_progress(), 0.0);
        chase.reset();
        chase.advance_time(1_000_000.0);
        assert_eq!(chase.chaser_progress(), 100.0);
    }

    #[test]
    fn tie_favors_runner_escape() {
        let mut chase = ChaseTracker::new();
        chase.set_progress(100.0, 100.0);
        assert_eq!(chase.evaluate(), Some(Outcome::RunnerEscaped));
    }

    #[test]
    fn outcome_latches_once() {
        let mut chase = ChaseTracker::new();
        chase.set_progress(0.0, 100.0);
        assert_eq!(chase.evaluate(), Some(Outcome::ChaserCaught));
        // Later runner progress cannot flip a latched outcome
        chase.set_progress(100.0, 100.0);
        assert_eq!(chase.evaluate(), Some(Outcome::ChaserCaught));
    }

    #[test]
    fn score_to_progress_uses_fixed_ceiling() {
        assert!((progress_from_score(5_000, 10_000) - 50.0).abs() < 1e-9);
        assert_eq!(progress_from_score(25_000, 10_000), 100.0);
        assert_eq!(progress_from_score(100, 0), 0.0);
    }
}
