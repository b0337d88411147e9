//! Per-phase timings for the tick pipeline

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct PhaseTiming {
    pub name: &'static str,
    pub last: Duration,
    pub total: Duration,
    pub calls: u64,
}

/// Phases are kept in first-recorded order so reports stay stable.
pub struct PhaseProfiler {
    phases: Vec<PhaseTiming>,
}

impl PhaseProfiler {
    pub fn new() -> Self {
        Self { phases: Vec::new() }
    }

    pub fn record(&mut self, name: &'static str, elapsed: Duration) {
        match self.phases.iter_mut().find(|p| p.name == name) {
            Some(phase) => {
                phase.last = elapsed;
                phase.total += elapsed;
                phase.calls += 1;
            }
            None => self.phases.push(PhaseTiming {
                name,
                last: elapsed,
                total: elapsed,
                calls: 1,
            }),
        }
    }

    pub fn measure<F, R>(&mut self, name: &'static str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        self.record(name, start.elapsed());
        result
    }

    pub fn last(&self, name: &str) -> Duration {
        self.find(name).map(|p| p.last).unwrap_or(Duration::ZERO)
    }

    pub fn total(&self, name: &str) -> Duration {
        self.find(name).map(|p| p.total).unwrap_or(Duration::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhaseTiming> {
        self.phases.iter()
    }

    pub fn reset(&mut self) {
        self.phases.clear();
    }

    fn find(&self, name: &str) -> Option<&PhaseTiming> {
        self.phases.iter().find(|p| p.name == name)
    }
}

impl Default for PhaseProfiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_per_phase() {
        let mut profiler = PhaseProfiler::new();
        profiler.record("scan", Duration::from_micros(300));
        profiler.record("merge", Duration::from_micros(50));
        profiler.record("scan", Duration::from_micros(100));

        assert_eq!(profiler.last("scan"), Duration::from_micros(100));
        assert_eq!(profiler.total("scan"), Duration::from_micros(400));
        assert_eq!(profiler.total("missing"), Duration::ZERO);
        let names: Vec<_> = profiler.iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["scan", "merge"]);
    }

    #[test]
    fn measure_returns_the_closure_result() {
        let mut profiler = PhaseProfiler::new();
        let value = profiler.measure("work", || 41 + 1);
        assert_eq!(value, 42);
        assert_eq!(profiler.iter().next().map(|p| p.calls), Some(1));
    }
}
