//! Fixed-size window of the most recent duration samples

use std::time::Duration;

pub struct SampleWindow {
    samples: Vec<Duration>,
    capacity: usize,
    next: usize,
}

impl SampleWindow {
    /// `capacity` is clamped to at least one sample.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            next: 0,
        }
    }

    /// Record a sample, overwriting the oldest once the window is full.
    pub fn push(&mut self, sample: Duration) {
        if self.samples.len() < self.capacity {
            self.samples.push(sample);
        } else {
            self.samples[self.next] = sample;
        }
        self.next = (self.next + 1) % self.capacity;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn mean(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.samples.iter().sum();
        sum / self.samples.len() as u32
    }

    /// `(min, max)` over the window; zeros when empty.
    pub fn min_max(&self) -> (Duration, Duration) {
        let min = self.samples.iter().min().copied().unwrap_or_default();
        let max = self.samples.iter().max().copied().unwrap_or_default();
        (min, max)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.next = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_forgets_oldest_sample() {
        let mut window = SampleWindow::new(3);
        for ms in [10, 20, 30] {
            window.push(Duration::from_millis(ms));
        }
        assert_eq!(window.mean(), Duration::from_millis(20));

        window.push(Duration::from_millis(40));
        assert_eq!(window.len(), 3);
        assert_eq!(window.mean(), Duration::from_millis(30));
        assert_eq!(
            window.min_max(),
            (Duration::from_millis(20), Duration::from_millis(40))
        );
    }

    #[test]
    fn empty_window_reports_zero() {
        let window = SampleWindow::new(0);
        assert!(window.is_empty());
        assert_eq!(window.mean(), Duration::ZERO);
        assert_eq!(window.min_max(), (Duration::ZERO, Duration::ZERO));
    }
}
