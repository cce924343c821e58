use crate::chart::{Chart, LANE_COUNT};

use super::judge::{JudgeKind, JudgeWindows};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteState {
    Pending,
    Judged(JudgeKind),
    Missed,
}

impl NoteState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Sustain note currently held down in a lane.
#[derive(Debug, Clone, Copy)]
struct HeldNote {
    index: usize,
}

/// Walks the chart against the playback clock, partitioning notes per lane
/// into pending / in-window / missed and tracking held sustains. Each note
/// resolves at most once; the state vector is the guard.
pub struct NoteScheduler {
    lane_index: [Vec<usize>; LANE_COUNT],
    states: Vec<NoteState>,
    held: [Option<HeldNote>; LANE_COUNT],
}

impl NoteScheduler {
    pub fn new(chart: &Chart) -> Self {
        Self {
            lane_index: chart.build_lane_index(),
            states: vec![NoteState::Pending; chart.notes.len()],
            held: [None; LANE_COUNT],
        }
    }

    pub fn reset(&mut self) {
        for state in &mut self.states {
            *state = NoteState::Pending;
        }
        self.held = [None; LANE_COUNT];
    }

    pub fn state(&self, index: usize) -> Option<NoteState> {
        self.states.get(index).copied()
    }

    /// Earliest-tick pending note in `lane` within the judgment window.
    /// Lane indices are tick-ordered, so the first pending in-window note is
    /// the tie-break winner when several overlap.
    pub fn earliest_in_window(
        &self,
        chart: &Chart,
        lane: usize,
        now_ms: f64,
        windows: &JudgeWindows,
    ) -> Option<usize> {
        for &i in &self.lane_index[lane] {
            let note = &chart.notes[i];
            if !self.states[i].is_pending() {
                continue;
            }
            if note.time_ms - now_ms > windows.good {
                // Sorted by tick: everything later is further in the future
                break;
            }
            if windows.is_in_window(now_ms - note.time_ms) {
                return Some(i);
            }
        }
        None
    }

    pub fn mark_judged(&mut self, index: usize, kind: JudgeKind) {
        if let Some(state) = self.states.get_mut(index) {
            *state = NoteState::Judged(kind);
        }
    }

    /// Mark pending notes whose window has elapsed as Missed and report
    /// them, so the caller can synthesize a Miss judgment in the same tick.
    pub fn expire_missed(
        &mut self,
        chart: &Chart,
        now_ms: f64,
        windows: &JudgeWindows,
    ) -> Vec<usize> {
        let mut expired = Vec::new();
        for (i, note) in chart.notes.iter().enumerate() {
            if self.states[i].is_pending() && windows.is_expired(note.time_ms, now_ms) {
                self.states[i] = NoteState::Missed;
                expired.push(i);
            }
        }
        expired
    }

    /// Enter the held sub-state after a sustain note's hit is judged. A hold
    /// still open in the lane (hit queued ahead of its release) is closed
    /// first; its elapsed ratio is returned so the caller can bank the bonus.
    pub fn begin_hold(
        &mut self,
        chart: &Chart,
        lane: usize,
        index: usize,
        now_ms: f64,
    ) -> Option<f64> {
        let prior = self.release_hold(chart, lane, now_ms);
        self.held[lane] = Some(HeldNote { index });
        prior
    }

    pub fn held_note(&self, lane: usize) -> Option<usize> {
        self.held[lane].map(|h| h.index)
    }

    /// Exit the held sub-state and return the held-duration ratio in [0, 1]
    /// against the sustain length. Returns None when nothing is held.
    pub fn release_hold(&mut self, chart: &Chart, lane: usize, now_ms: f64) -> Option<f64> {
        let held = self.held[lane].take()?;
        let note = &chart.notes[held.index];
        if note.sustain_ms <= 0.0 {
            return Some(1.0);
        }
        Some(((now_ms - note.time_ms) / note.sustain_ms).clamp(0.0, 1.0))
    }

    /// Sustains held past their end auto-complete with full ratio.
    pub fn finish_overdue_holds(&mut self, chart: &Chart, now_ms: f64) -> Vec<usize> {
        let mut finished = Vec::new();
        for lane in 0..LANE_COUNT {
            if let Some(held) = self.held[lane] {
                if now_ms >= chart.notes[held.index].end_ms() {
                    self.held[lane] = None;
                    finished.push(held.index);
                }
            }
        }
        finished
    }

    pub fn all_resolved(&self) -> bool {
        self.states.iter().all(|s| !s.is_pending())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_chart;

    #[test]
    fn note_enters_and_leaves_window() {
        // Note at tick 192 = 500ms
        let chart = test_chart(&[(192, 0, 0)]);
        let mut sched = NoteScheduler::new(&chart);
        let w = JudgeWindows::normal();

        assert_eq!(sched.earliest_in_window(&chart, 0, 0.0, &w), None);
        assert_eq!(sched.earliest_in_window(&chart, 0, 360.0, &w), Some(0));
        assert_eq!(sched.earliest_in_window(&chart, 0, 640.0, &w), Some(0));
        assert_eq!(sched.earliest_in_window(&chart, 1, 500.0, &w), None);

        let expired = sched.expire_missed(&chart, 651.0, &w);
        assert_eq!(expired, vec![0]);
        assert_eq!(sched.state(0), Some(NoteState::Missed));
    }

    #[test]
    fn overlapping_notes_judge_earliest_first() {
        // Two notes 50ms apart in the same lane, both in window
        let chart = test_chart(&[(192, 0, 0), (211, 0, 0)]);
        let mut sched = NoteScheduler::new(&chart);
        let w = JudgeWindows::normal();

        let now = 520.0;
        assert_eq!(sched.earliest_in_window(&chart, 0, now, &w), Some(0));
        sched.mark_judged(0, JudgeKind::Great);
        assert_eq!(sched.earliest_in_window(&chart, 0, now, &w), Some(1));
    }

    #[test]
    fn judged_note_cannot_expire() {
        let chart = test_chart(&[(0, 0, 0)]);
        let mut sched = NoteScheduler::new(&chart);
        let w = JudgeWindows::normal();

        sched.mark_judged(0, JudgeKind::Perfect);
        assert!(sched.expire_missed(&chart, 10_000.0, &w).is_empty());
        assert_eq!(sched.state(0), Some(NoteState::Judged(JudgeKind::Perfect)));
    }

    #[test]
    fn release_ratio_tracks_sustain_length() {
        // Sustain of one beat (500ms) starting at tick 0
        let chart = test_chart(&[(0, 2, 192)]);
        let mut sched = NoteScheduler::new(&chart);

        sched.mark_judged(0, JudgeKind::Perfect);
        assert!(sched.begin_hold(&chart, 2, 0, 0.0).is_none());
        let ratio = sched.release_hold(&chart, 2, 250.0).unwrap();
        assert!((ratio - 0.5).abs() < 1e-9);
        // Second release finds nothing held
        assert!(sched.release_hold(&chart, 2, 300.0).is_none());
    }

    #[test]
    fn overdue_hold_completes_with_full_ratio() {
        let chart = test_chart(&[(0, 1, 192)]);
        let mut sched = NoteScheduler::new(&chart);

        sched.mark_judged(0, JudgeKind::Perfect);
        assert!(sched.begin_hold(&chart, 1, 0, 0.0).is_none());
        assert!(sched.finish_overdue_holds(&chart, 499.0).is_empty());
        assert_eq!(sched.finish_overdue_holds(&chart, 500.0), vec![0]);
        assert_eq!(sched.held_note(1), None);
    }

    #[test]
    fn new_hold_closes_the_open_one() {
        // Two quarter-beat sustains (250ms) in lane 0, half a beat apart.
        let chart = test_chart(&[(0, 0, 96), (192, 0, 96)]);
        let mut sched = NoteScheduler::new(&chart);

        sched.mark_judged(0, JudgeKind::Perfect);
        assert!(sched.begin_hold(&chart, 0, 0, 0.0).is_none());

        // Second hit lands with no release in between; the first sustain is
        // credited with the time it was actually held.
        sched.mark_judged(1, JudgeKind::Perfect);
        let ratio = sched.begin_hold(&chart, 0, 1, 125.0).unwrap();
        assert!((ratio - 0.5).abs() < 1e-9);
        assert_eq!(sched.held_note(0), Some(1));
    }
}
