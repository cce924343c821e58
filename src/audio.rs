use anyhow::Result;

use crate::clock::{SystemTimeProvider, TimeProvider};

/// Abstraction over the audio output shared between the engine and the
/// presentation layer. Decoding and device output live behind this seam;
/// the engine only controls playback state and reads the position that
/// drives the playback clock.
pub trait AudioOutput {
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);

    /// Set output gain (0.0..=1.0). Values are clamped.
    fn set_volume(&mut self, volume: f32);
    fn volume(&self) -> f32;

    /// Playback position in milliseconds, or None until started.
    fn position_ms(&self) -> Option<f64>;
}

enum PlaybackState {
    Idle,
    Playing { origin_ms: f64 },
    Paused { elapsed_ms: f64 },
}

/// Clock-backed output with no actual audio device. Position advances with
/// the time provider while playing and freezes across pause/resume without
/// losing elapsed time, which is all the engine needs from a real output.
pub struct SilentOutput<T: TimeProvider = SystemTimeProvider> {
    time: T,
    state: PlaybackState,
    volume: f32,
}

impl SilentOutput<SystemTimeProvider> {
    pub fn new() -> Self {
        Self::with_time(SystemTimeProvider::new())
    }
}

impl Default for SilentOutput<SystemTimeProvider> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeProvider> SilentOutput<T> {
    pub fn with_time(time: T) -> Self {
        Self {
            time,
            state: PlaybackState::Idle,
            volume: 1.0,
        }
    }
}

impl<T: TimeProvider> AudioOutput for SilentOutput<T> {
    fn start(&mut self) -> Result<()> {
        self.state = PlaybackState::Playing {
            origin_ms: self.time.now_ms(),
        };
        Ok(())
    }

    fn stop(&mut self) {
        self.state = PlaybackState::Idle;
    }

    fn pause(&mut self) {
        if let PlaybackState::Playing { origin_ms } = self.state {
            self.state = PlaybackState::Paused {
                elapsed_ms: self.time.now_ms() - origin_ms,
            };
        }
    }

    fn resume(&mut self) {
        if let PlaybackState::Paused { elapsed_ms } = self.state {
            self.state = PlaybackState::Playing {
                origin_ms: self.time.now_ms() - elapsed_ms,
            };
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn position_ms(&self) -> Option<f64> {
        match self.state {
            PlaybackState::Idle => None,
            PlaybackState::Playing { origin_ms } => Some(self.time.now_ms() - origin_ms),
            PlaybackState::Paused { elapsed_ms } => Some(elapsed_ms),
        }
    }
}
