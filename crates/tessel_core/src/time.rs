//! Deterministic time system
//!
//! Fixed-rate ticks. Tick-scoped state (pair buffers, the nearby cache) is
//! keyed by the tick counter, never by wall-clock time.

use std::time::Duration;

/// Default simulation tick rate (60 Hz = 16.666ms per tick)
pub const TICK_RATE_HZ: u32 = 60;
pub const TICK_DURATION: Duration = Duration::from_micros(16_666); // ~16.666ms

/// Simulation time tracker
#[derive(Debug, Clone)]
pub struct SimulationTime {
    tick_count: u64,
    tick_duration: Duration,
    accumulated_time: Duration,
}

impl SimulationTime {
    pub fn new() -> Self {
        Self::with_tick_duration(TICK_DURATION)
    }

    /// `hz` is clamped to at least one tick per second.
    pub fn with_rate(hz: u32) -> Self {
        Self::with_tick_duration(Duration::from_secs(1) / hz.max(1))
    }

    pub fn with_tick_duration(tick_duration: Duration) -> Self {
        Self {
            tick_count: 0,
            tick_duration,
            accumulated_time: Duration::ZERO,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    pub fn advance_tick(&mut self) {
        self.tick_count += 1;
        self.accumulated_time += self.tick_duration;
    }

    pub fn total_time(&self) -> Duration {
        self.accumulated_time
    }
}

impl Default for SimulationTime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advancing_accumulates_fixed_steps() {
        let mut time = SimulationTime::with_rate(50);
        for _ in 0..50 {
            time.advance_tick();
        }
        assert_eq!(time.tick_count(), 50);
        assert_eq!(time.total_time(), Duration::from_secs(1));
    }
}
