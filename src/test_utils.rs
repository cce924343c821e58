//! Shared fixtures for unit tests: canned charts and a driven clock.

use crate::chart::{Chart, Metadata, Note, TempoMap};

/// Build a chart at 120 BPM, resolution 192, from `(tick, lane, sustain)`
/// triples. One beat is 192 ticks = 500ms. Notes are sorted the way the
/// parser emits them.
pub fn test_chart(notes: &[(u32, usize, u32)]) -> Chart {
    let tempo = TempoMap::constant(192, 500_000);
    let mut notes: Vec<Note> = notes
        .iter()
        .map(|&(tick, lane, sustain_ticks)| Note {
            tick,
            lane,
            sustain_ticks,
            time_ms: tempo.tick_to_ms(tick as f64),
            sustain_ms: if sustain_ticks == 0 {
                0.0
            } else {
                tempo.tick_to_ms((tick + sustain_ticks) as f64) - tempo.tick_to_ms(tick as f64)
            },
        })
        .collect();
    notes.sort_by_key(|n| (n.tick, n.lane));

    Chart {
        metadata: Metadata {
            name: "Test Song".to_string(),
            ..Default::default()
        },
        tempo,
        markers: Vec::new(),
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_builder() {
        let chart = test_chart(&[(192, 0, 0), (0, 1, 96)]);
        // Sorted by tick.
        assert_eq!(chart.notes[0].tick, 0);
        assert!((chart.notes[0].sustain_ms - 250.0).abs() < 0.01);
        assert!((chart.notes[1].time_ms - 500.0).abs() < 0.01);
    }
}
