//! Rolling tick timing

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Fixed-size window of the most recent samples.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<Duration>,
    capacity: usize,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: Duration) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
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
        self.samples.iter().sum::<Duration>() / self.samples.len() as u32
    }

    pub fn range(&self) -> (Duration, Duration) {
        let min = self.samples.iter().min().copied().unwrap_or_default();
        let max = self.samples.iter().max().copied().unwrap_or_default();
        (min, max)
    }
}

/// Times repeated ticks (frames, update passes) over a rolling window.
#[derive(Debug, Clone)]
pub struct TickTimer {
    started: Option<Instant>,
    window: SampleWindow,
}

impl TickTimer {
    pub fn new(window: usize) -> Self {
        Self {
            started: None,
            window: SampleWindow::new(window),
        }
    }

    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Close the current tick. Returns its duration (zero if `start` was not called).
    pub fn stop(&mut self) -> Duration {
        let Some(started) = self.started.take() else {
            return Duration::ZERO;
        };
        let elapsed = started.elapsed();
        self.window.push(elapsed);
        elapsed
    }

    pub fn ticks_per_second(&self) -> f64 {
        let mean = self.window.mean().as_secs_f64();
        if mean > 0.0 {
            1.0 / mean
        } else {
            0.0
        }
    }

    pub fn mean_ms(&self) -> f64 {
        self.window.mean().as_secs_f64() * 1000.0
    }

    pub fn range_ms(&self) -> (f64, f64) {
        let (min, max) = self.window.range();
        (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
    }

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_drops_oldest() {
        let mut window = SampleWindow::new(3);
        for ms in [10, 20, 30, 40] {
            window.push(Duration::from_millis(ms));
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.mean(), Duration::from_millis(30));
        assert_eq!(
            window.range(),
            (Duration::from_millis(20), Duration::from_millis(40))
        );
    }

    #[test]
    fn test_stop_without_start_records_nothing() {
        let mut timer = TickTimer::new(8);
        assert_eq!(timer.stop(), Duration::ZERO);
        assert!(timer.window().is_empty());

        timer.start();
        timer.stop();
        assert_eq!(timer.window().len(), 1);
    }
}
