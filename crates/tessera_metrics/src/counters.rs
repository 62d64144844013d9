//! Named event counters

use std::collections::BTreeMap;

/// Monotonic counters keyed by static names (`"entities_created"`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counters {
    values: BTreeMap<&'static str, u64>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add(&mut self, name: &'static str, by: u64) {
        *self.values.entry(name).or_insert(0) += by;
    }

    #[inline]
    pub fn bump(&mut self, name: &'static str) {
        self.add(name, 1);
    }

    pub fn get(&self, name: &str) -> u64 {
        self.values.get(name).copied().unwrap_or(0)
    }

    pub fn reset(&mut self) {
        self.values.clear();
    }

    /// Counters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.values.iter().map(|(name, value)| (*name, *value))
    }
}
