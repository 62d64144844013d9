//! Entity handles
//!
//! Entities are plain 32-bit ids. There is no generation counter: an id is
//! valid from `create` until `destroy`, after which the registry may hand the
//! same value out again.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity handle (densely reused index).
///
/// Format: a single `u32`. `u32::MAX` is reserved and never allocated, which
/// lets pools use it as an "absent" marker.
///
/// Example:
/// ```ignore
/// let entity = registry.create();
/// registry.destroy(entity);
/// // the next create() may return the same id
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u32);

impl EntityId {
    /// Largest id the registry will ever allocate.
    pub const MAX: u32 = u32::MAX - 1;

    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Index widened for slice access.
    #[inline]
    pub const fn to_usize(self) -> usize {
        self.0 as usize
    }

    /// Serialize to a raw integer (for save files and tooling)
    pub const fn to_bits(self) -> u32 {
        self.0
    }

    /// Deserialize from a raw integer
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }
}

impl From<u32> for EntityId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
