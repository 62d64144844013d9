//! Prefabs: detached bags of component values.
//!
//! A prefab owns one value per component type and can stamp copies of them
//! onto new entities in any registry. Values keep the order in which their
//! type was first inserted; instantiation adds them in that order.

use crate::ecs::{
    Component, Detached, EntityId, ErasedComponent, Registry, RegistryError, TypeMap,
};
use std::fmt;

#[derive(Default)]
pub struct Prefab {
    types: TypeMap,
    slots: Vec<Option<Box<dyn ErasedComponent>>>,
}

impl Prefab {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with<T: Component>(mut self, value: T) -> Result<Self, RegistryError> {
        self.insert(value)?;
        Ok(self)
    }

    /// Store `value`, returning the previous value of the same type.
    pub fn insert<T: Component>(&mut self, value: T) -> Result<Option<T>, RegistryError> {
        let previous = self.insert_erased(Box::new(Detached(value)))?;
        Ok(previous
            .and_then(|old| old.into_any().downcast::<Detached<T>>().ok())
            .map(|old| old.0))
    }

    fn insert_erased(
        &mut self,
        component: Box<dyn ErasedComponent>,
    ) -> Result<Option<Box<dyn ErasedComponent>>, RegistryError> {
        let index = self
            .types
            .get_or_insert_id(component.component_type(), component.component_name())?;
        let slot = index.index();
        if self.slots.len() <= slot {
            self.slots.resize_with(slot + 1, || None);
        }
        Ok(self.slots[slot].replace(component))
    }

    fn slot<T: Component>(&self) -> Option<&dyn ErasedComponent> {
        let index = self.types.index_of::<T>()?;
        self.slots.get(index.index())?.as_deref()
    }

    pub fn get<T: Component>(&self) -> Option<&T> {
        self.slot::<T>()?
            .as_any()
            .downcast_ref::<Detached<T>>()
            .map(|detached| &detached.0)
    }

    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        let index = self.types.index_of::<T>()?;
        self.slots
            .get_mut(index.index())?
            .as_mut()?
            .as_any_mut()
            .downcast_mut::<Detached<T>>()
            .map(|detached| &mut detached.0)
    }

    pub fn contains<T: Component>(&self) -> bool {
        self.slot::<T>().is_some()
    }

    pub fn remove<T: Component>(&mut self) -> Option<T> {
        let index = self.types.index_of::<T>()?;
        let component = self.slots.get_mut(index.index())?.take()?;
        component
            .into_any()
            .downcast::<Detached<T>>()
            .ok()
            .map(|detached| detached.0)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn component_names(&self) -> Vec<&'static str> {
        self.slots
            .iter()
            .flatten()
            .map(|component| component.component_name())
            .collect()
    }

    /// Snapshot every component of an existing entity.
    pub fn capture(registry: &Registry, id: EntityId) -> Result<Self, RegistryError> {
        let signature = registry
            .signature(id)
            .ok_or(RegistryError::NoSuchEntity { entity: id })?;
        let mut prefab = Self::new();
        for index in signature.indices() {
            if let Some(component) = registry.clone_component(index, id) {
                prefab.insert_erased(component)?;
            }
        }
        tracing::trace!(entity = %id, components = prefab.len(), "prefab captured");
        Ok(prefab)
    }

    /// Create a new entity holding a copy of every stored component.
    pub fn instantiate(&self, registry: &mut Registry) -> Result<EntityId, RegistryError> {
        self.instantiate_hinted(registry, None)
    }

    /// [`instantiate`](Self::instantiate) with an id hint, as
    /// [`Registry::create_hinted`].
    ///
    /// Every type is registered first, so a registration failure creates no
    /// entity.
    pub fn instantiate_hinted(
        &self,
        registry: &mut Registry,
        hint: Option<EntityId>,
    ) -> Result<EntityId, RegistryError> {
        for component in self.slots.iter().flatten() {
            component.register_in(registry)?;
        }
        let id = registry.create_hinted(hint);
        for component in self.slots.iter().flatten() {
            component.add_to(registry, id)?;
        }
        tracing::trace!(entity = %id, components = self.len(), "prefab instantiated");
        Ok(id)
    }
}

impl Clone for Prefab {
    fn clone(&self) -> Self {
        Self {
            types: self.types.clone(),
            slots: self
                .slots
                .iter()
                .map(|slot| slot.as_ref().map(|component| component.boxed_clone()))
                .collect(),
        }
    }
}

impl fmt::Debug for Prefab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prefab")
            .field("components", &self.component_names())
            .finish()
    }
}
