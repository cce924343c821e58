use serde::{Deserialize, Serialize};

/// Judgment quality, ordered best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JudgeKind {
    Perfect,
    Great,
    Good,
    Miss,
}

impl JudgeKind {
    pub fn base_score(&self) -> u32 {
        match self {
            JudgeKind::Perfect => 100,
            JudgeKind::Great => 50,
            JudgeKind::Good => 25,
            JudgeKind::Miss => 0,
        }
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, JudgeKind::Miss)
    }

    pub fn label(&self) -> &'static str {
        match self {
            JudgeKind::Perfect => "PERFECT",
            JudgeKind::Great => "GREAT",
            JudgeKind::Good => "GOOD",
            JudgeKind::Miss => "MISS",
        }
    }
}

/// Timing windows in milliseconds, symmetric around the note time. The
/// `good` window doubles as the judgment/miss boundary: a pending note whose
/// time is more than `good` in the past can no longer be hit.
#[derive(Debug, Clone, Copy)]
pub struct JudgeWindows {
    pub perfect: f64,
    pub great: f64,
    pub good: f64,
}

impl JudgeWindows {
    pub fn normal() -> Self {
        Self {
            perfect: 50.0,
            great: 100.0,
            good: 150.0,
        }
    }

    /// Map an input offset (input time minus note time) to a judgment kind.
    pub fn judge(&self, offset_ms: f64) -> JudgeKind {
        let abs = offset_ms.abs();
        if abs <= self.perfect {
            JudgeKind::Perfect
        } else if abs <= self.great {
            JudgeKind::Great
        } else if abs <= self.good {
            JudgeKind::Good
        } else {
            JudgeKind::Miss
        }
    }

    pub fn is_in_window(&self, offset_ms: f64) -> bool {
        offset_ms.abs() <= self.good
    }

    /// A note is missed once now is past its time by more than the window.
    pub fn is_expired(&self, note_time_ms: f64, now_ms: f64) -> bool {
        now_ms - note_time_ms > self.good
    }

    /// Continuous accuracy contribution in [0, 100] from offset magnitude.
    pub fn accuracy_contribution(&self, offset_ms: f64) -> f64 {
        (100.0 * (1.0 - offset_ms.abs() / self.good)).max(0.0)
    }
}

impl Default for JudgeWindows {
    fn default() -> Self {
        Self::normal()
    }
}

/// Outcome of matching one input event against one note (or no note).
/// Immutable once created. `score == 0` exactly when `kind` is Miss.
#[derive(Debug, Clone, Copy)]
pub struct Judgment {
    pub kind: JudgeKind,
    pub score: u32,
    pub accuracy: f64,
    pub offset_ms: f64,
}
