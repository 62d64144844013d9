//! Per-listener timing

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timing {
    pub total: Duration,
    pub calls: u32,
}

impl Timing {
    pub fn mean(&self) -> Duration {
        if self.calls == 0 {
            Duration::ZERO
        } else {
            self.total / self.calls
        }
    }
}

/// Accumulates wall time spent in named callbacks.
#[derive(Debug, Clone, Default)]
pub struct ListenerProfiler {
    timings: HashMap<String, Timing>,
}

impl ListenerProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time<F, R>(&mut self, name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        let timing = self.timings.entry(name.to_string()).or_default();
        timing.total += elapsed;
        timing.calls += 1;
        result
    }

    pub fn timing(&self, name: &str) -> Timing {
        self.timings.get(name).copied().unwrap_or_default()
    }

    /// Timings sorted by total time, slowest first.
    pub fn report(&self) -> Vec<(&str, Timing)> {
        let mut rows: Vec<_> = self
            .timings
            .iter()
            .map(|(name, timing)| (name.as_str(), *timing))
            .collect();
        rows.sort_by(|a, b| b.1.total.cmp(&a.1.total).then(a.0.cmp(b.0)));
        rows
    }

    pub fn reset(&mut self) {
        self.timings.clear();
    }
}
