use std::collections::HashSet;

use anyhow::Result;
use tracing::{debug, warn};

use super::{
    Chart, Difficulty, LANE_COUNT, Metadata, Note, SectionMarker, TempoChange, TempoMap,
    TimeSignature,
};

pub struct ChartParser;

impl ChartParser {
    /// Parse chart text for one difficulty.
    ///
    /// The parser is tolerant by design: unknown sections and unparseable
    /// lines are skipped with a warning, duplicate `(tick, lane)` entries
    /// keep the first occurrence, unsorted input is sorted, and a missing
    /// difficulty or sync section degrades to empty/default instead of
    /// failing the load.
    pub fn parse(text: &str, difficulty: Difficulty) -> Result<Chart> {
        let mut metadata = Metadata::default();
        let mut changes: Vec<TempoChange> = Vec::new();
        let mut signatures: Vec<TimeSignature> = Vec::new();
        let mut raw_markers: Vec<(u32, String)> = Vec::new();
        let mut raw_notes: Vec<(u32, usize, u32)> = Vec::new();
        let mut saw_difficulty = false;
        let mut saw_sync = false;

        let mut section: Option<String> = None;
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line == "{" {
                continue;
            }
            if line == "}" {
                section = None;
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                let name = line[1..line.len() - 1].to_string();
                if name == difficulty.section_name() {
                    saw_difficulty = true;
                } else if name == "SyncTrack" {
                    saw_sync = true;
                }
                section = Some(name);
                continue;
            }

            let Some(current) = section.as_deref() else {
                debug!(line, "skipping line outside any section");
                continue;
            };
            let Some((key, value)) = line.split_once('=') else {
                warn!(section = current, line, "skipping unparseable chart line");
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match current {
                "Song" => Self::apply_song_entry(&mut metadata, key, value),
                "SyncTrack" => {
                    Self::parse_sync_entry(key, value, &mut changes, &mut signatures);
                }
                "Events" => {
                    if let Some(name) = Self::parse_event_entry(key, value) {
                        if let Ok(tick) = key.parse::<u32>() {
                            raw_markers.push((tick, name));
                        }
                    }
                }
                other if other == difficulty.section_name() => {
                    Self::parse_note_entry(key, value, &mut raw_notes);
                }
                other if Difficulty::all().iter().any(|d| d.section_name() == other) => {
                    // Another difficulty; ignored for this load
                }
                other => {
                    debug!(section = other, "ignoring unknown chart section");
                }
            }
        }

        if !saw_sync {
            warn!("chart has no SyncTrack section; assuming 120 BPM");
        }
        if !saw_difficulty {
            warn!(
                difficulty = difficulty.section_name(),
                "chart has no section for requested difficulty; no notes loaded"
            );
        }

        let tempo = TempoMap::new(metadata.resolution, changes, signatures);

        // Keep-first on duplicate (tick, lane), then sort by global tick order
        let mut seen: HashSet<(u32, usize)> = HashSet::new();
        raw_notes.retain(|&(tick, lane, _)| seen.insert((tick, lane)));
        raw_notes.sort_by_key(|&(tick, lane, _)| (tick, lane));

        let notes = raw_notes
            .into_iter()
            .map(|(tick, lane, sustain_ticks)| {
                let time_ms = tempo.tick_to_ms(tick as f64);
                let sustain_ms = if sustain_ticks > 0 {
                    tempo.tick_to_ms((tick + sustain_ticks) as f64) - time_ms
                } else {
                    0.0
                };
                Note {
                    tick,
                    lane,
                    sustain_ticks,
                    time_ms,
                    sustain_ms,
                }
            })
            .collect();

        raw_markers.sort_by_key(|&(tick, _)| tick);
        let markers = raw_markers
            .into_iter()
            .map(|(tick, name)| SectionMarker {
                tick,
                time_ms: tempo.tick_to_ms(tick as f64),
                name,
            })
            .collect();

        Ok(Chart {
            metadata,
            tempo,
            markers,
            notes,
        })
    }

    fn apply_song_entry(metadata: &mut Metadata, key: &str, value: &str) {
        let unquoted = value.trim_matches('"');
        match key {
            "Name" => metadata.name = unquoted.to_string(),
            "Artist" => metadata.artist = unquoted.to_string(),
            "Genre" => metadata.genre = unquoted.to_string(),
            "Charter" => metadata.charter = unquoted.to_string(),
            "MusicStream" => metadata.music_stream = Some(unquoted.to_string()),
            "Offset" => match unquoted.parse::<f64>() {
                Ok(seconds) => metadata.offset_ms = seconds * 1000.0,
                Err(_) => warn!(value, "invalid Offset; keeping 0"),
            },
            "Resolution" => match unquoted.parse::<u32>() {
                Ok(res) if res > 0 => metadata.resolution = res,
                _ => warn!(value, "invalid Resolution; keeping default"),
            },
            _ => {}
        }
    }

    fn parse_sync_entry(
        key: &str,
        value: &str,
        changes: &mut Vec<TempoChange>,
        signatures: &mut Vec<TimeSignature>,
    ) {
        let Ok(tick) = key.parse::<u32>() else {
            warn!(key, "invalid SyncTrack tick");
            return;
        };
        let mut parts = value.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("B"), Some(us)) => match us.parse::<u32>() {
                Ok(us_per_beat) if us_per_beat > 0 => {
                    changes.push(TempoChange { tick, us_per_beat });
                }
                _ => warn!(tick, value, "invalid tempo entry"),
            },
            (Some("TS"), Some(num)) => match num.parse::<u32>() {
                Ok(numerator) if numerator > 0 => {
                    signatures.push(TimeSignature { tick, numerator });
                }
                _ => warn!(tick, value, "invalid time signature entry"),
            },
            _ => warn!(tick, value, "unknown SyncTrack entry"),
        }
    }

    fn parse_event_entry(key: &str, value: &str) -> Option<String> {
        if key.parse::<u32>().is_err() {
            warn!(key, "invalid event tick");
            return None;
        }
        let rest = value.strip_prefix('E')?.trim();
        Some(rest.trim_matches('"').to_string())
    }

    fn parse_note_entry(key: &str, value: &str, notes: &mut Vec<(u32, usize, u32)>) {
        let Ok(tick) = key.parse::<u32>() else {
            warn!(key, "invalid note tick");
            return;
        };
        let mut parts = value.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some("N"), Some(lane), Some(sustain)) => {
                let (Ok(lane), Ok(sustain)) = (lane.parse::<usize>(), sustain.parse::<u32>())
                else {
                    warn!(tick, value, "invalid note entry");
                    return;
                };
                if lane >= LANE_COUNT {
                    warn!(tick, lane, "note lane out of range; dropped");
                    return;
                }
                notes.push((tick, lane, sustain));
            }
            (Some(kind), _, _) => {
                debug!(tick, kind, "ignoring non-note chart entry");
            }
            _ => warn!(tick, value, "invalid note entry"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[Song]
{
  Name = "Forest Run"
  Artist = "Unknown"
  Offset = 0.5
  Resolution = 192
  Genre = "chiptune"
  MusicStream = "song.ogg"
}
[SyncTrack]
{
  0 = TS 4
  0 = B 500000
  384 = B 250000
}
[Events]
{
  192 = E "verse"
}
[ExpertSingle]
{
  384 = N 1 0
  0 = N 0 0
  192 = N 2 192
  192 = N 2 96
}
"#;

    #[test]
    fn parses_metadata_and_sorts_notes() {
        let chart = ChartParser::parse(SAMPLE, Difficulty::Expert).unwrap();
        assert_eq!(chart.metadata.name, "Forest Run");
        assert!((chart.metadata.offset_ms - 500.0).abs() < 1e-9);
        assert_eq!(chart.metadata.resolution, 192);

        // Unsorted input sorted ascending; duplicate (tick, lane) keeps first
        let ticks: Vec<u32> = chart.notes.iter().map(|n| n.tick).collect();
        assert_eq!(ticks, vec![0, 192, 384]);
        assert_eq!(chart.notes[1].sustain_ticks, 192);
    }

    #[test]
    fn derives_timestamps_from_tempo_map() {
        let chart = ChartParser::parse(SAMPLE, Difficulty::Expert).unwrap();
        // 120 BPM constant until tick 384: tick 192 = 500ms
        assert!((chart.notes[1].time_ms - 500.0).abs() < 1e-9);
        assert!((chart.notes[1].sustain_ms - 500.0).abs() < 1e-9);
        assert!((chart.notes[2].time_ms - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn missing_difficulty_is_empty_not_fatal() {
        let chart = ChartParser::parse(SAMPLE, Difficulty::Easy).unwrap();
        assert!(chart.notes.is_empty());
        assert_eq!(chart.markers.len(), 1);
    }

    #[test]
    fn missing_sync_track_defaults_to_120_bpm() {
        let chart =
            ChartParser::parse("[ExpertSingle]\n{\n192 = N 0 0\n}", Difficulty::Expert).unwrap();
        assert!((chart.tempo.initial_bpm() - 120.0).abs() < 1e-9);
        assert!((chart.notes[0].time_ms - 500.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_lane_is_dropped() {
        let chart = ChartParser::parse(
            "[ExpertSingle]\n{\n0 = N 7 0\n0 = N 3 0\n}",
            Difficulty::Expert,
        )
        .unwrap();
        assert_eq!(chart.notes.len(), 1);
        assert_eq!(chart.notes[0].lane, 3);
    }
}
