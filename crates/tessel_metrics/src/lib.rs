//! Tessel Metrics - timing utilities for the simulation tick
//!
//! Provides zero-cost abstractions for metrics collection that completely
//! vanish in production builds via feature flags.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use tessel_metrics::{PhaseProfiler, TickTimer};
//!
//! let mut timer = TickTimer::new(120, TICK_DURATION);
//! timer.begin();
//! profiler.measure("broad_phase", || world.run_broad_phase());
//! timer.end();
//! println!("tick: {:.2} ms", timer.tick_time_ms());
//! ```
//!
//! In production builds (without `metrics` feature), all instrumentation
//! is compiled out to zero overhead.

#[cfg(feature = "metrics")]
mod phase_profiler;
#[cfg(feature = "metrics")]
mod sample_window;
#[cfg(feature = "metrics")]
mod tick_timer;

#[cfg(feature = "metrics")]
pub use phase_profiler::{PhaseProfiler, PhaseTiming};
#[cfg(feature = "metrics")]
pub use sample_window::SampleWindow;
#[cfg(feature = "metrics")]
pub use tick_timer::TickTimer;

// ============================================================================
// Macros for conditional compilation
// ============================================================================

/// Execute code only when the calling crate enables its `metrics` feature
#[macro_export]
macro_rules! metrics {
    ($($tt:tt)*) => {
        #[cfg(feature = "metrics")]
        {
            $($tt)*
        }
    };
}

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Clone, Copy)]
pub struct PhaseTiming {
    pub name: &'static str,
    pub last: std::time::Duration,
    pub total: std::time::Duration,
    pub calls: u64,
}

#[cfg(not(feature = "metrics"))]
#[derive(Default)]
pub struct PhaseProfiler;

#[cfg(not(feature = "metrics"))]
impl PhaseProfiler {
    pub fn new() -> Self { Self }
    pub fn record(&mut self, _name: &'static str, _elapsed: std::time::Duration) {}
    pub fn measure<F, R>(&mut self, _name: &'static str, f: F) -> R where F: FnOnce() -> R { f() }
    pub fn last(&self, _name: &str) -> std::time::Duration { std::time::Duration::ZERO }
    pub fn total(&self, _name: &str) -> std::time::Duration { std::time::Duration::ZERO }
    pub fn iter(&self) -> std::slice::Iter<'_, PhaseTiming> {
        let none: &[PhaseTiming] = &[];
        none.iter()
    }
    pub fn reset(&mut self) {}
}

#[cfg(not(feature = "metrics"))]
pub struct SampleWindow;

#[cfg(not(feature = "metrics"))]
impl SampleWindow {
    pub fn new(_capacity: usize) -> Self { Self }
    pub fn push(&mut self, _sample: std::time::Duration) {}
    pub fn mean(&self) -> std::time::Duration { std::time::Duration::ZERO }
}

#[cfg(not(feature = "metrics"))]
pub struct TickTimer;

#[cfg(not(feature = "metrics"))]
impl TickTimer {
    pub fn new(_window: usize, _budget: std::time::Duration) -> Self { Self }
    pub fn begin(&mut self) {}
    pub fn end(&mut self) -> std::time::Duration { std::time::Duration::ZERO }
    pub fn record(&mut self, _elapsed: std::time::Duration) {}
    pub fn overruns(&self) -> u64 { 0 }
    pub fn tick_time_ms(&self) -> f64 { 0.0 }
    pub fn tick_time_range_ms(&self) -> (f64, f64) { (0.0, 0.0) }
    pub fn ticks_per_second(&self) -> f64 { 0.0 }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_compiles_with_or_without_metrics() {
        let mut timer = super::TickTimer::new(60, std::time::Duration::from_millis(16));
        timer.begin();
        let _ = timer.end();
        let mut profiler = super::PhaseProfiler::new();
        assert_eq!(profiler.measure("noop", || 7), 7);
        let mut _window = super::SampleWindow::new(10);
    }
}
