// type_map.rs - Compacts process-wide TypeIds into a small per-registry range
//
// Signatures are one machine word, so every registry needs its component
// types numbered 0..64. Indices are handed out on first use and never
// recycled, even when a pool is later torn down; reusing one would alias a
// stale signature bit onto a different type.

use crate::ecs::{Component, RegistryError, Signature};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

/// Dense, registry-local index of a component type (`0..Signature::CAPACITY`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeIndex(u8);

impl TypeIndex {
    pub(crate) const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Return the raw index, usable as a bit position or slot number.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Append-only `TypeId -> TypeIndex` map.
#[derive(Clone, Debug, Default)]
pub struct TypeMap {
    lookup: HashMap<TypeId, TypeIndex>,
    names: Vec<&'static str>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index previously assigned to `T`, if any.
    #[inline]
    pub fn index_of<T: Component>(&self) -> Option<TypeIndex> {
        self.lookup.get(&TypeId::of::<T>()).copied()
    }

    /// Index previously assigned to a raw `TypeId`, if any.
    #[inline]
    pub fn index_of_id(&self, type_id: TypeId) -> Option<TypeIndex> {
        self.lookup.get(&type_id).copied()
    }

    /// Index for `T`, assigning the next free one on first use.
    pub fn get_or_insert<T: Component>(&mut self) -> Result<TypeIndex, RegistryError> {
        self.get_or_insert_id(TypeId::of::<T>(), T::component_name())
    }

    pub(crate) fn get_or_insert_id(
        &mut self,
        type_id: TypeId,
        name: &'static str,
    ) -> Result<TypeIndex, RegistryError> {
        if let Some(&index) = self.lookup.get(&type_id) {
            return Ok(index);
        }
        if self.names.len() >= Signature::CAPACITY {
            tracing::warn!(component = name, "component type limit reached");
            return Err(RegistryError::TooManyComponentTypes {
                limit: Signature::CAPACITY,
                component: name,
            });
        }
        let index = TypeIndex::new(self.names.len() as u8);
        self.lookup.insert(type_id, index);
        self.names.push(name);
        Ok(index)
    }

    /// Diagnostic name of the type at `index`.
    pub fn name_of(&self, index: TypeIndex) -> Option<&'static str> {
        self.names.get(index.index()).copied()
    }

    /// Number of assigned indices.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate `(index, name)` in assignment order.
    pub fn iter(&self) -> impl Iterator<Item = (TypeIndex, &'static str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .map(|(i, &name)| (TypeIndex::new(i as u8), name))
    }
}
