use serde::{Deserialize, Serialize};

use super::TempoMap;

pub const LANE_COUNT: usize = 4;

/// Difficulty level, named after the chart file sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    #[default]
    Expert,
    Hard,
    Medium,
    Easy,
}

impl Difficulty {
    pub fn section_name(&self) -> &'static str {
        match self {
            Difficulty::Expert => "ExpertSingle",
            Difficulty::Hard => "HardSingle",
            Difficulty::Medium => "MediumSingle",
            Difficulty::Easy => "EasySingle",
        }
    }

    pub fn all() -> [Difficulty; 4] {
        [
            Difficulty::Expert,
            Difficulty::Hard,
            Difficulty::Medium,
            Difficulty::Easy,
        ]
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "expert" => Ok(Difficulty::Expert),
            "hard" => Ok(Difficulty::Hard),
            "medium" => Ok(Difficulty::Medium),
            "easy" => Ok(Difficulty::Easy),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub artist: String,
    pub genre: String,
    pub charter: String,
    /// Audio delay before tick 0, in milliseconds.
    pub offset_ms: f64,
    /// Ticks per beat.
    pub resolution: u32,
    pub music_stream: Option<String>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            name: String::new(),
            artist: String::new(),
            genre: String::new(),
            charter: String::new(),
            offset_ms: 0.0,
            resolution: TempoMap::DEFAULT_RESOLUTION,
            music_stream: None,
        }
    }
}

/// A single note. Identity is `(tick, lane)`; `sustain_ticks == 0` is a tap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub tick: u32,
    pub lane: usize,
    pub sustain_ticks: u32,
    /// Activation time, derived once from the tempo map.
    pub time_ms: f64,
    /// Sustain length in real time; 0 for taps.
    pub sustain_ms: f64,
}

impl Note {
    pub fn is_sustain(&self) -> bool {
        self.sustain_ticks > 0
    }

    pub fn end_ms(&self) -> f64 {
        self.time_ms + self.sustain_ms
    }
}

/// Named event marker from the `[Events]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionMarker {
    pub tick: u32,
    pub name: String,
    pub time_ms: f64,
}

/// Parsed, immutable chart: tempo map plus a globally tick-ordered note list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chart {
    pub metadata: Metadata,
    pub tempo: TempoMap,
    pub markers: Vec<SectionMarker>,
    pub notes: Vec<Note>,
}

impl Chart {
    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    pub fn build_lane_index(&self) -> [Vec<usize>; LANE_COUNT] {
        let mut index: [Vec<usize>; LANE_COUNT] = Default::default();
        for (i, note) in self.notes.iter().enumerate() {
            index[note.lane].push(i);
        }
        index
    }

    /// End of the last note (including sustain), in milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.notes
            .iter()
            .map(|n| n.end_ms())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_chart;

    #[test]
    fn lane_index_groups_by_lane() {
        let chart = test_chart(&[(0, 0, 0), (192, 1, 0), (384, 0, 0)]);
        let index = chart.build_lane_index();
        assert_eq!(index[0], vec![0, 2]);
        assert_eq!(index[1], vec![1]);
        assert!(index[2].is_empty());
    }

    #[test]
    fn duration_includes_sustain() {
        // 120 BPM, resolution 192: one beat = 500ms
        let chart = test_chart(&[(0, 0, 192)]);
        assert!((chart.duration_ms() - 500.0).abs() < 0.01);
    }

    #[test]
    fn difficulty_section_names() {
        assert_eq!(Difficulty::Expert.section_name(), "ExpertSingle");
        assert_eq!("easy".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert!("lunatic".parse::<Difficulty>().is_err());
    }
}
