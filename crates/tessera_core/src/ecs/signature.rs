//! Per-entity component signature
//!
//! One `u64` per entity; bit *k* is set iff the entity holds the component
//! whose `TypeIndex` is *k*. This caps a registry at 64 component types.

use crate::ecs::TypeIndex;
use std::fmt;

/// Bitmask of attached components (up to 64 component types).
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Signature(u64);

impl Signature {
    /// Maximum number of distinct component types per registry.
    pub const CAPACITY: usize = u64::BITS as usize;

    pub const EMPTY: Self = Self(0);

    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of components present.
    #[inline]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    #[inline]
    pub const fn contains(self, index: TypeIndex) -> bool {
        self.0 & (1 << index.index()) != 0
    }

    #[inline]
    pub fn insert(&mut self, index: TypeIndex) {
        self.0 |= 1 << index.index();
    }

    #[inline]
    pub fn remove(&mut self, index: TypeIndex) {
        self.0 &= !(1 << index.index());
    }

    #[inline]
    pub const fn with(self, index: TypeIndex) -> Self {
        Self(self.0 | (1 << index.index()))
    }

    /// Bitwise union of two signatures.
    #[inline]
    pub const fn union(self, other: Signature) -> Self {
        Self(self.0 | other.0)
    }

    /// True if every bit of `other` is also set here.
    #[inline]
    pub const fn contains_all(self, other: Signature) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if at least one bit of `other` is also set here.
    #[inline]
    pub const fn intersects(self, other: Signature) -> bool {
        self.0 & other.0 != 0
    }

    /// Iterate the set bit positions in ascending order.
    pub fn indices(self) -> impl Iterator<Item = TypeIndex> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let next = bits.trailing_zeros();
            bits &= bits - 1;
            Some(TypeIndex::new(next as u8))
        })
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({:#066b})", self.0)
    }
}
