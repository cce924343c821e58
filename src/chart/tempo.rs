use serde::{Deserialize, Serialize};

/// Tempo change in chart-space. `us_per_beat` applies from `tick` forward
/// until superseded by the next change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TempoChange {
    pub tick: u32,
    pub us_per_beat: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeSignature {
    pub tick: u32,
    pub numerator: u32,
}

/// Cumulative breakpoint used for tick<->time conversion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Breakpoint {
    tick: u32,
    ms: f64,
    ms_per_tick: f64,
}

/// Tick-to-time mapping built once at chart load. Entries are strictly
/// increasing in tick; duplicates keep the first occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempoMap {
    resolution: u32,
    signatures: Vec<TimeSignature>,
    breakpoints: Vec<Breakpoint>,
}

impl TempoMap {
    pub const DEFAULT_RESOLUTION: u32 = 192;
    /// 120 BPM.
    pub const DEFAULT_US_PER_BEAT: u32 = 500_000;

    pub fn new(
        resolution: u32,
        mut changes: Vec<TempoChange>,
        mut signatures: Vec<TimeSignature>,
    ) -> Self {
        let resolution = if resolution == 0 {
            Self::DEFAULT_RESOLUTION
        } else {
            resolution
        };

        changes.sort_by_key(|c| c.tick);
        changes.dedup_by_key(|c| c.tick);
        signatures.sort_by_key(|s| s.tick);
        signatures.dedup_by_key(|s| s.tick);

        if changes.first().is_none_or(|c| c.tick != 0) {
            changes.insert(
                0,
                TempoChange {
                    tick: 0,
                    us_per_beat: Self::DEFAULT_US_PER_BEAT,
                },
            );
        }

        let mut breakpoints = Vec::with_capacity(changes.len());
        let mut ms = 0.0;
        let mut prev: Option<Breakpoint> = None;
        for change in &changes {
            if let Some(p) = prev {
                ms += (change.tick - p.tick) as f64 * p.ms_per_tick;
            }
            let bp = Breakpoint {
                tick: change.tick,
                ms,
                ms_per_tick: change.us_per_beat as f64 / 1000.0 / resolution as f64,
            };
            breakpoints.push(bp);
            prev = Some(bp);
        }

        Self {
            resolution,
            signatures,
            breakpoints,
        }
    }

    pub fn constant(resolution: u32, us_per_beat: u32) -> Self {
        Self::new(
            resolution,
            vec![TempoChange {
                tick: 0,
                us_per_beat,
            }],
            vec![TimeSignature {
                tick: 0,
                numerator: 4,
            }],
        )
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn signatures(&self) -> &[TimeSignature] {
        &self.signatures
    }

    pub fn initial_bpm(&self) -> f64 {
        let us = self.breakpoints[0].ms_per_tick * self.resolution as f64 * 1000.0;
        60_000_000.0 / us
    }

    fn segment_at_tick(&self, tick: f64) -> Breakpoint {
        let pos = self
            .breakpoints
            .partition_point(|bp| (bp.tick as f64) <= tick);
        self.breakpoints[pos.saturating_sub(1)]
    }

    fn segment_at_ms(&self, ms: f64) -> Breakpoint {
        let pos = self.breakpoints.partition_point(|bp| bp.ms <= ms);
        self.breakpoints[pos.saturating_sub(1)]
    }

    pub fn tick_to_ms(&self, tick: f64) -> f64 {
        let seg = self.segment_at_tick(tick);
        seg.ms + (tick - seg.tick as f64) * seg.ms_per_tick
    }

    pub fn ms_to_tick(&self, ms: f64) -> f64 {
        let seg = self.segment_at_ms(ms);
        seg.tick as f64 + (ms - seg.ms) / seg.ms_per_tick
    }
}

impl Default for TempoMap {
    fn default() -> Self {
        Self::constant(Self::DEFAULT_RESOLUTION, Self::DEFAULT_US_PER_BEAT)
    }
}
