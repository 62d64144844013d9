//! Registry configuration

use crate::pool::SparseSet;
use serde::{Deserialize, Serialize};

/// Tunables applied when a registry is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Entity ids covered by one sparse page. Rounded up to a power of two.
    pub page_size: usize,
    /// Entities reserved up front in the entity pool.
    pub entity_capacity: usize,
    /// Default partition count for `View::par_each`; `0` means one per
    /// rayon worker thread.
    pub parallel_partitions: usize,
}

impl RegistryConfig {
    /// Copy of this config with out-of-range values corrected.
    pub fn normalized(&self) -> Self {
        Self {
            page_size: self.page_size.max(1).next_power_of_two(),
            entity_capacity: self.entity_capacity,
            parallel_partitions: self.parallel_partitions,
        }
    }

    /// Partition count to use for parallel iteration.
    pub fn partitions(&self) -> usize {
        match self.parallel_partitions {
            0 => rayon::current_num_threads().max(1),
            n => n,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            page_size: SparseSet::DEFAULT_PAGE_SIZE,
            entity_capacity: 0,
            parallel_partitions: 0,
        }
    }
}
