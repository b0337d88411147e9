//! Simulation tick timing against a fixed budget

use super::sample_window::SampleWindow;
use std::time::{Duration, Instant};

pub struct TickTimer {
    budget: Duration,
    tick_start: Instant,
    window: SampleWindow,
    overruns: u64,
}

impl TickTimer {
    pub fn new(window: usize, budget: Duration) -> Self {
        Self {
            budget,
            tick_start: Instant::now(),
            window: SampleWindow::new(window),
            overruns: 0,
        }
    }

    pub fn begin(&mut self) {
        self.tick_start = Instant::now();
    }

    /// Close the tick and return its duration.
    pub fn end(&mut self) -> Duration {
        let elapsed = self.tick_start.elapsed();
        self.record(elapsed);
        elapsed
    }

    /// Record an externally measured tick.
    pub fn record(&mut self, elapsed: Duration) {
        if elapsed > self.budget {
            self.overruns += 1;
        }
        self.window.push(elapsed);
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Ticks that took longer than the budget since creation.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    pub fn tick_time_ms(&self) -> f64 {
        self.window.mean().as_secs_f64() * 1000.0
    }

    pub fn tick_time_range_ms(&self) -> (f64, f64) {
        let (min, max) = self.window.min_max();
        (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
    }

    /// Ticks per second the current average would sustain.
    pub fn ticks_per_second(&self) -> f64 {
        let mean = self.window.mean().as_secs_f64();
        if mean > 0.0 {
            1.0 / mean
        } else {
            0.0
        }
    }
}
