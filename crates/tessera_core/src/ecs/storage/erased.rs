use crate::ecs::{Component, ComponentPool, EntityId, Registry, RegistryError};
use crate::pool::SparseSet;
use std::any::{Any, TypeId};

/// Type-erased view of a [`ComponentPool`].
///
/// The registry keeps one boxed pool per registered type and drives the
/// type-independent operations (destroy, clear, scene copy, manual ordering)
/// through this trait; typed access downcasts via `as_any`.
pub trait ErasedPool: Any + Send + Sync {
    /// Id bookkeeping of the underlying pool.
    fn set(&self) -> &SparseSet;

    fn len(&self) -> usize {
        self.set().len()
    }

    fn is_empty(&self) -> bool {
        self.set().is_empty()
    }

    fn contains(&self, id: EntityId) -> bool {
        self.set().contains(id)
    }

    /// Swap-remove `id`, dropping its value. Returns the prior dense index.
    fn remove(&mut self, id: EntityId) -> Option<usize>;

    /// Swap two dense slots. Panics if either is out of bounds.
    fn swap(&mut self, a: usize, b: usize);

    fn clear(&mut self);

    /// Deep copy of the whole pool.
    fn boxed_clone(&self) -> Box<dyn ErasedPool>;

    /// Copy of one entity's value, detached from the pool.
    fn clone_component(&self, id: EntityId) -> Option<Box<dyn ErasedComponent>>;

    fn component_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedPool for ComponentPool<T> {
    fn set(&self) -> &SparseSet {
        ComponentPool::set(self)
    }

    fn remove(&mut self, id: EntityId) -> Option<usize> {
        ComponentPool::remove(self, id).map(|(index, _)| index)
    }

    fn swap(&mut self, a: usize, b: usize) {
        ComponentPool::swap(self, a, b)
    }

    fn clear(&mut self) {
        ComponentPool::clear(self)
    }

    fn boxed_clone(&self) -> Box<dyn ErasedPool> {
        Box::new(self.clone())
    }

    fn clone_component(&self, id: EntityId) -> Option<Box<dyn ErasedComponent>> {
        self.get(id)
            .map(|value| Box::new(Detached(value.clone())) as Box<dyn ErasedComponent>)
    }

    fn component_name(&self) -> &'static str {
        <T as Component>::component_name()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A single detached component value that knows how to add a copy of itself
/// to a registry. Prefabs store their contents as these.
pub trait ErasedComponent: Any + Send + Sync {
    fn component_type(&self) -> TypeId;

    fn component_name(&self) -> &'static str;

    /// Make sure `registry` has a pool for this type.
    fn register_in(&self, registry: &mut Registry) -> Result<(), RegistryError>;

    /// Add a clone of this value to `id` (no-op if `id` already has the type).
    fn add_to(&self, registry: &mut Registry, id: EntityId) -> Result<(), RegistryError>;

    fn boxed_clone(&self) -> Box<dyn ErasedComponent>;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Owned component value behind [`ErasedComponent`].
#[derive(Clone, Debug)]
pub struct Detached<T>(pub T);

impl<T: Component> ErasedComponent for Detached<T> {
    fn component_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn component_name(&self) -> &'static str {
        <T as Component>::component_name()
    }

    fn register_in(&self, registry: &mut Registry) -> Result<(), RegistryError> {
        registry.register::<T>().map(|_| ())
    }

    fn add_to(&self, registry: &mut Registry, id: EntityId) -> Result<(), RegistryError> {
        registry.add(id, self.0.clone()).map(|_| ())
    }

    fn boxed_clone(&self) -> Box<dyn ErasedComponent> {
        Box::new(self.clone())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
