use crate::audio::AudioOutput;

/// Abstraction over wall-clock sources.
/// Implementations: SystemTimeProvider (production), MockTimeProvider (testing).
pub trait TimeProvider {
    /// Current time in milliseconds from an arbitrary epoch.
    fn now_ms(&self) -> f64;
}

pub struct SystemTimeProvider {
    start: std::time::Instant,
}

impl SystemTimeProvider {
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

impl Default for SystemTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for SystemTimeProvider {
    fn now_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

/// Mock time provider for deterministic testing. Clones share the same
/// underlying clock so a test can advance time held inside an engine.
#[derive(Clone, Default)]
pub struct MockTimeProvider {
    current_ms: std::rc::Rc<std::cell::Cell<f64>>,
}

impl MockTimeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_time(&self, ms: f64) {
        self.current_ms.set(ms);
    }

    pub fn advance(&self, delta_ms: f64) {
        self.current_ms.set(self.current_ms.get() + delta_ms);
    }
}

impl TimeProvider for MockTimeProvider {
    fn now_ms(&self) -> f64 {
        self.current_ms.get()
    }
}

/// Maps the audio output's playback position to chart time. Backing the
/// clock with audio position means frame-rate jitter never accumulates as
/// chart drift. While the audio source reports no position the clock reads 0
/// and nothing is judged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaybackClock {
    offset_ms: f64,
}

impl PlaybackClock {
    pub fn new(offset_ms: f64) -> Self {
        Self { offset_ms }
    }

    /// Elapsed chart time in milliseconds; negative during the pre-roll
    /// before the chart offset elapses.
    pub fn now_ms(&self, audio: &dyn AudioOutput) -> f64 {
        match audio.position_ms() {
            Some(position) => position - self.offset_ms,
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SilentOutput;

    #[test]
    fn mock_time_provider_advance() {
        let tp = MockTimeProvider::new();
        assert_eq!(tp.now_ms(), 0.0);
        tp.advance(1000.0);
        assert_eq!(tp.now_ms(), 1000.0);
        let clone = tp.clone();
        clone.advance(500.0);
        assert_eq!(tp.now_ms(), 1500.0);
    }

    #[test]
    fn system_time_provider_monotonic() {
        let tp = SystemTimeProvider::new();
        let t1 = tp.now_ms();
        let t2 = tp.now_ms();
        assert!(t2 >= t1);
    }

    #[test]
    fn clock_reads_zero_until_audio_started() {
        let time = MockTimeProvider::new();
        let mut audio = SilentOutput::with_time(time.clone());
        let clock = PlaybackClock::new(0.0);

        assert_eq!(clock.now_ms(&audio), 0.0);

        audio.start().unwrap();
        time.advance(250.0);
        assert!((clock.now_ms(&audio) - 250.0).abs() < 1e-9);
    }

    #[test]
    fn clock_applies_chart_offset() {
        let time = MockTimeProvider::new();
        let mut audio = SilentOutput::with_time(time.clone());
        let clock = PlaybackClock::new(500.0);

        audio.start().unwrap();
        time.advance(200.0);
        assert!((clock.now_ms(&audio) + 300.0).abs() < 1e-9);
        time.advance(800.0);
        assert!((clock.now_ms(&audio) - 500.0).abs() < 1e-9);
    }
}
