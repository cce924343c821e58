use super::judge::{JudgeKind, JudgeWindows, Judgment};

/// Per-player score, combo and accuracy bookkeeping.
///
/// The combo multiplier grows a step per ten combo and is applied to the
/// base score at judge time, so the resulting `Judgment` carries the final
/// delta. In multiplayer the `score` field is advisory only (the remote
/// record is authoritative); combo and accuracy always stay local.
#[derive(Debug, Clone, Default)]
pub struct ScoreTracker {
    pub score: u64,
    pub combo: u32,
    pub max_combo: u32,
    pub perfect_count: u32,
    pub great_count: u32,
    pub good_count: u32,
    pub miss_count: u32,
    accuracy_sum: f64,
    judged_count: u32,
}

impl ScoreTracker {
    const MULTIPLIER_STEP: f64 = 0.1;
    const MULTIPLIER_CAP: f64 = 2.0;
    const SUSTAIN_BONUS: f64 = 50.0;

    pub fn new() -> Self {
        Self::default()
    }

    /// Score multiplier from the current combo tier.
    pub fn multiplier(&self) -> f64 {
        (1.0 + Self::MULTIPLIER_STEP * (self.combo / 10) as f64).min(Self::MULTIPLIER_CAP)
    }

    /// Record one judged input and produce the final judgment. The delta is
    /// computed from the combo tier in effect before this judgment.
    pub fn apply(&mut self, kind: JudgeKind, offset_ms: f64, windows: &JudgeWindows) -> Judgment {
        let score = (kind.base_score() as f64 * self.multiplier()).floor() as u32;
        let accuracy = if kind.is_miss() {
            0.0
        } else {
            windows.accuracy_contribution(offset_ms)
        };

        match kind {
            JudgeKind::Perfect => self.perfect_count += 1,
            JudgeKind::Great => self.great_count += 1,
            JudgeKind::Good => self.good_count += 1,
            JudgeKind::Miss => self.miss_count += 1,
        }
        if kind.is_miss() {
            self.combo = 0;
        } else {
            self.combo += 1;
            self.max_combo = self.max_combo.max(self.combo);
        }

        self.accuracy_sum += accuracy;
        self.judged_count += 1;
        self.score += score as u64;

        Judgment {
            kind,
            score,
            accuracy,
            offset_ms,
        }
    }

    /// Sustain completion bonus, scaled by held ratio and the combo
    /// multiplier. Score-only: no combo or accuracy effect.
    pub fn apply_sustain_bonus(&mut self, held_ratio: f64) -> u32 {
        let ratio = held_ratio.clamp(0.0, 1.0);
        let bonus = (Self::SUSTAIN_BONUS * ratio * self.multiplier()).round() as u32;
        self.score += bonus as u64;
        bonus
    }

    /// Running mean of accuracy contributions; 100 before any judgment.
    pub fn accuracy(&self) -> f64 {
        if self.judged_count == 0 {
            100.0
        } else {
            self.accuracy_sum / self.judged_count as f64
        }
    }

    pub fn judged_count(&self) -> u32 {
        self.judged_count
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
