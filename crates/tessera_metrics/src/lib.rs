//! Tessera Metrics - counters and timers for the registry and runtime
//!
//! Everything here compiles down to no-op stubs unless the `metrics`
//! feature is enabled, so instrumented code never needs its own `cfg`.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use tessera_metrics::TickTimer;
//!
//! let mut timer = TickTimer::new(60);
//! timer.start();
//! // ... one update ...
//! timer.stop();
//! println!("{:.1} ticks/s", timer.ticks_per_second());
//! ```

#[cfg(feature = "metrics")]
mod counters;
#[cfg(feature = "metrics")]
mod profiler;
#[cfg(feature = "metrics")]
mod tick_timer;

#[cfg(feature = "metrics")]
pub use counters::Counters;
#[cfg(feature = "metrics")]
pub use profiler::{ListenerProfiler, Timing};
#[cfg(feature = "metrics")]
pub use tick_timer::{SampleWindow, TickTimer};

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counters;

#[cfg(not(feature = "metrics"))]
impl Counters {
    pub fn new() -> Self { Self }
    pub fn add(&mut self, _name: &'static str, _by: u64) {}
    pub fn bump(&mut self, _name: &'static str) {}
    pub fn get(&self, _name: &str) -> u64 { 0 }
    pub fn reset(&mut self) {}
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ { std::iter::empty() }
}

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timing {
    pub total: std::time::Duration,
    pub calls: u32,
}

#[cfg(not(feature = "metrics"))]
impl Timing {
    pub fn mean(&self) -> std::time::Duration { std::time::Duration::ZERO }
}

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Clone, Default)]
pub struct ListenerProfiler;

#[cfg(not(feature = "metrics"))]
impl ListenerProfiler {
    pub fn new() -> Self { Self }
    pub fn time<F, R>(&mut self, _name: &str, f: F) -> R where F: FnOnce() -> R { f() }
    pub fn timing(&self, _name: &str) -> Timing { Timing::default() }
    pub fn report(&self) -> Vec<(&str, Timing)> { Vec::new() }
    pub fn reset(&mut self) {}
}

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Clone)]
pub struct TickTimer;

#[cfg(not(feature = "metrics"))]
impl TickTimer {
    pub fn new(_window: usize) -> Self { Self }
    pub fn start(&mut self) {}
    pub fn stop(&mut self) -> std::time::Duration { std::time::Duration::ZERO }
    pub fn ticks_per_second(&self) -> f64 { 0.0 }
    pub fn mean_ms(&self) -> f64 { 0.0 }
    pub fn range_ms(&self) -> (f64, f64) { (0.0, 0.0) }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_public_surface_compiles_either_way() {
        let mut counters = super::Counters::new();
        counters.bump("ticks");
        let mut profiler = super::ListenerProfiler::new();
        assert_eq!(profiler.time("noop", || 3), 3);
        let mut timer = super::TickTimer::new(4);
        timer.start();
        timer.stop();
    }
}
