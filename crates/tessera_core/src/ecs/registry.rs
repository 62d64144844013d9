//! Registry: entity allocation, per-type pools and lifecycle signals.
//!
//! The registry owns
//! - an entity pool mapping every live id to its [`Signature`],
//! - one type-erased [`ComponentPool`] per registered component type,
//!   indexed by the type's compacted [`TypeIndex`],
//! - the free-id set and the `next_id` high-water mark,
//! - `on_create`/`on_destroy` plus per-type `on_add`/`on_remove` signals.
//!
//! All structural mutation goes through `&mut Registry`; references handed
//! out by `get`/`get_mut`/views borrow the registry and therefore cannot
//! outlive the next structural change.

use crate::ecs::free_ids::FreeIds;
use crate::ecs::{
    Bundle, Callback, Component, ComponentPool, ComponentSet, EntityId, ErasedComponent,
    ErasedPool, Query, RegistryConfig, RegistryError, Signal, Signature, TypeIndex, TypeMap, View,
};
use std::any::TypeId;
use tessera_metrics::Counters;
use tracing::{debug, trace};

/// Observer list for registry lifecycle events.
pub type RegistrySignal = Signal<Registry, EntityId>;

struct PoolSlot {
    pool: Box<dyn ErasedPool>,
    on_add: RegistrySignal,
    on_remove: RegistrySignal,
}

impl PoolSlot {
    fn new<T: Component>(page_size: usize) -> Self {
        Self {
            pool: Box::new(ComponentPool::<T>::with_page_size(page_size)),
            on_add: Signal::new(),
            on_remove: Signal::new(),
        }
    }
}

impl Clone for PoolSlot {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.boxed_clone(),
            on_add: self.on_add.clone(),
            on_remove: self.on_remove.clone(),
        }
    }
}

/// Owner of all entities and component pools of one scene.
#[derive(Clone)]
pub struct Registry {
    config: RegistryConfig,
    types: TypeMap,
    entities: ComponentPool<Signature>,
    pools: Vec<Option<PoolSlot>>,
    free_ids: FreeIds,
    next_id: u32,
    on_create: RegistrySignal,
    on_destroy: RegistrySignal,
    counters: Counters,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        let config = config.normalized();
        let mut entities = ComponentPool::with_page_size(config.page_size);
        entities.reserve(config.entity_capacity);
        Self {
            config,
            types: TypeMap::new(),
            entities,
            pools: Vec::new(),
            free_ids: FreeIds::new(),
            next_id: 0,
            on_create: Signal::new(),
            on_destroy: Signal::new(),
            counters: Counters::new(),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Structural change counters (`entities_created`, `components_added`, ...).
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// Create an entity with no components.
    ///
    /// # Panics
    /// If all `EntityId::MAX + 1` ids are alive.
    pub fn create(&mut self) -> EntityId {
        self.create_hinted(None)
    }

    /// Create an entity, using `hint` as its id when that id is free.
    ///
    /// An occupied (or reserved) hint falls back to normal allocation.
    /// Hinting above the high-water mark marks every skipped id as free.
    pub fn create_hinted(&mut self, hint: Option<EntityId>) -> EntityId {
        let id = match hint {
            Some(hint) if hint.index() <= EntityId::MAX && !self.entities.contains(hint) => {
                self.claim(hint);
                hint
            }
            Some(hint) => {
                debug!(hint = %hint, "hinted entity id unavailable, allocating");
                self.allocate()
            }
            None => self.allocate(),
        };

        self.entities.insert(id, Signature::EMPTY);
        self.counters.bump("entities_created");
        trace!(entity = %id, "entity created");

        let callbacks = self.on_create.snapshot();
        self.emit(callbacks, id);
        id
    }

    /// Create an entity and add every component of `bundle`, in order.
    ///
    /// Bundle types are registered before the entity is created, so a
    /// registration failure leaves the registry untouched.
    pub fn create_with<B: Bundle>(&mut self, bundle: B) -> Result<EntityId, RegistryError> {
        B::register(self)?;
        let id = self.create();
        bundle.add_to(self, id)?;
        Ok(id)
    }

    fn allocate(&mut self) -> EntityId {
        if let Some(index) = self.free_ids.pop_first() {
            return EntityId::new(index);
        }
        assert!(self.next_id <= EntityId::MAX, "entity id space exhausted");
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn claim(&mut self, id: EntityId) {
        let index = id.index();
        if index >= self.next_id {
            self.free_ids.insert_range(self.next_id, index);
            self.next_id = index + 1;
        } else {
            self.free_ids.remove(index);
        }
    }

    fn release(&mut self, index: u32) {
        if index + 1 == self.next_id {
            self.next_id = index;
            if let Some(start) = self.free_ids.pop_run_ending_at(index) {
                self.next_id = start;
            }
        } else {
            self.free_ids.insert(index);
        }
    }

    /// Destroy an entity and all of its components.
    ///
    /// Each component removal fires that type's `on_remove`, then
    /// `on_destroy` fires while the id is still alive. Returns `false` when
    /// the entity does not exist.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        let Some(signature) = self.entities.get(id).copied() else {
            return false;
        };
        for index in signature.indices() {
            self.remove_at(index, id);
        }

        let callbacks = self.on_destroy.snapshot();
        self.emit(callbacks, id);

        if self.entities.remove(id).is_none() {
            // destroyed again from inside a listener
            return true;
        }
        self.release(id.index());
        self.counters.bump("entities_destroyed");
        trace!(entity = %id, "entity destroyed");
        true
    }

    #[inline]
    pub fn exists(&self, id: EntityId) -> bool {
        self.entities.contains(id)
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Live entity ids in entity-pool order.
    pub fn entities(&self) -> &[EntityId] {
        self.entities.ids()
    }

    pub fn signature(&self, id: EntityId) -> Option<Signature> {
        self.entities.get(id).copied()
    }

    /// Drop every entity and component without firing any signal.
    ///
    /// Pools, type indices and observers survive.
    pub fn clear(&mut self) {
        self.entities.clear();
        for slot in self.pools.iter_mut().flatten() {
            slot.pool.clear();
        }
        self.free_ids.clear();
        self.next_id = 0;
        debug!("registry cleared");
    }

    // ------------------------------------------------------------------
    // Component types
    // ------------------------------------------------------------------

    /// Register `T`, creating its pool if needed.
    pub fn register<T: Component>(&mut self) -> Result<TypeIndex, RegistryError> {
        let index = self.types.get_or_insert::<T>()?;
        let slot = index.index();
        if self.pools.len() <= slot {
            self.pools.resize_with(slot + 1, || None);
        }
        if self.pools[slot].is_none() {
            self.pools[slot] = Some(PoolSlot::new::<T>(self.config.page_size));
            debug!(component = T::component_name(), index = %index, "component pool registered");
        }
        Ok(index)
    }

    /// Tear down the pool for `T` and clear its bit from every signature.
    ///
    /// The type keeps its index, so re-registering reuses the same bit.
    /// No signals fire. Returns `false` if `T` had no pool.
    pub fn unregister<T: Component>(&mut self) -> bool {
        let Some(index) = self.types.index_of::<T>() else {
            return false;
        };
        let Some(slot) = self.pools.get_mut(index.index()).and_then(Option::take) else {
            return false;
        };
        for &id in slot.pool.set().ids() {
            if let Some(signature) = self.entities.get_mut(id) {
                signature.remove(index);
            }
        }
        debug!(component = T::component_name(), index = %index, "component pool unregistered");
        true
    }

    pub fn is_registered<T: Component>(&self) -> bool {
        self.live_index::<T>().is_some()
    }

    pub fn type_index<T: Component>(&self) -> Option<TypeIndex> {
        self.types.index_of::<T>()
    }

    /// Names of the types with a live pool, in index order.
    pub fn component_types(&self) -> Vec<&'static str> {
        self.pools
            .iter()
            .flatten()
            .map(|slot| slot.pool.component_name())
            .collect()
    }

    /// Signature with a bit for every type of `S`, or `None` if any of them
    /// has no pool.
    pub fn signature_of<S: ComponentSet>(&self) -> Option<Signature> {
        let mut signature = Signature::EMPTY;
        let mut complete = true;
        S::each_type(|type_id, _| match self.live_index_of_id(type_id) {
            Some(index) => signature.insert(index),
            None => complete = false,
        });
        complete.then_some(signature)
    }

    /// Signature of the registered subset of `S`.
    pub(crate) fn registered_signature_of<S: ComponentSet>(&self) -> Signature {
        let mut signature = Signature::EMPTY;
        S::each_type(|type_id, _| {
            if let Some(index) = self.live_index_of_id(type_id) {
                signature.insert(index);
            }
        });
        signature
    }

    fn live_index<T: Component>(&self) -> Option<TypeIndex> {
        self.live_index_of_id(TypeId::of::<T>())
    }

    pub(crate) fn live_index_of_id(&self, type_id: TypeId) -> Option<TypeIndex> {
        let index = self.types.index_of_id(type_id)?;
        self.slot(index).map(|_| index)
    }

    fn slot(&self, index: TypeIndex) -> Option<&PoolSlot> {
        self.pools.get(index.index()).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, index: TypeIndex) -> Option<&mut PoolSlot> {
        self.pools.get_mut(index.index()).and_then(Option::as_mut)
    }

    /// Typed pool for `T`, if registered.
    pub fn pool<T: Component>(&self) -> Option<&ComponentPool<T>> {
        let index = self.live_index::<T>()?;
        self.slot(index)?.pool.as_any().downcast_ref()
    }

    fn pool_at_mut<T: Component>(
        &mut self,
        index: TypeIndex,
    ) -> Result<&mut ComponentPool<T>, RegistryError> {
        self.slot_mut(index)
            .and_then(|slot| slot.pool.as_any_mut().downcast_mut())
            .ok_or(RegistryError::UnregisteredComponent {
                component: T::component_name(),
            })
    }

    /// Dense values of `T` for in-place edits. Membership cannot change
    /// through this slice.
    pub fn values_mut<T: Component>(&mut self) -> Option<&mut [T]> {
        let index = self.live_index::<T>()?;
        self.pool_at_mut::<T>(index).ok().map(|pool| pool.values_mut())
    }

    /// Swap two dense slots of `T`'s pool (manual draw/sibling ordering).
    pub fn swap_slots<T: Component>(&mut self, a: usize, b: usize) -> Result<(), RegistryError> {
        let index = self
            .live_index::<T>()
            .ok_or(RegistryError::UnregisteredComponent {
                component: T::component_name(),
            })?;
        let pool = self.pool_at_mut::<T>(index)?;
        let len = pool.len();
        if let Some(&bad) = [a, b].iter().find(|&&i| i >= len) {
            return Err(RegistryError::SlotOutOfBounds {
                component: T::component_name(),
                index: bad,
                len,
            });
        }
        pool.swap(a, b);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Components
    // ------------------------------------------------------------------

    /// Attach `value` to `id`.
    ///
    /// If the entity already has a `T` the stored value is kept and
    /// returned; `value` is dropped.
    pub fn add<T: Component>(&mut self, id: EntityId, value: T) -> Result<&mut T, RegistryError> {
        self.add_with(id, || value)
    }

    /// Attach a `T` built by `make`, which only runs when the entity lacks one.
    pub fn add_with<T, F>(&mut self, id: EntityId, make: F) -> Result<&mut T, RegistryError>
    where
        T: Component,
        F: FnOnce() -> T,
    {
        if !self.entities.contains(id) {
            return Err(RegistryError::NoSuchEntity { entity: id });
        }
        let index = self.register::<T>()?;
        let (_, inserted) = self.pool_at_mut::<T>(index)?.insert_with(id, make);

        if inserted {
            if let Some(signature) = self.entities.get_mut(id) {
                signature.insert(index);
            }
            self.counters.bump("components_added");
            trace!(entity = %id, component = T::component_name(), "component added");

            let callbacks = self
                .slot(index)
                .map(|slot| slot.on_add.snapshot())
                .unwrap_or_default();
            self.emit(callbacks, id);
        }
        self.get_mut(id)
    }

    pub fn add_default<T>(&mut self, id: EntityId) -> Result<&mut T, RegistryError>
    where
        T: Component + Default,
    {
        self.add_with(id, T::default)
    }

    /// Attach `value`, overwriting an existing `T` in place.
    ///
    /// Overwriting does not fire `on_add`.
    pub fn add_or_replace<T: Component>(
        &mut self,
        id: EntityId,
        value: T,
    ) -> Result<&mut T, RegistryError> {
        if self.has::<T>(id) {
            let slot = self.get_mut::<T>(id)?;
            *slot = value;
            return Ok(slot);
        }
        self.add(id, value)
    }

    /// Add every component of `bundle` to an existing entity.
    pub fn add_bundle<B: Bundle>(&mut self, id: EntityId, bundle: B) -> Result<(), RegistryError> {
        if !self.entities.contains(id) {
            return Err(RegistryError::NoSuchEntity { entity: id });
        }
        B::register(self)?;
        bundle.add_to(self, id)
    }

    /// Detach `T` from `id`. `on_remove` fires before the value is dropped.
    ///
    /// Returns `Ok(false)` when the entity had no `T`.
    pub fn remove<T: Component>(&mut self, id: EntityId) -> Result<bool, RegistryError> {
        if !self.entities.contains(id) {
            return Err(RegistryError::NoSuchEntity { entity: id });
        }
        Ok(match self.live_index::<T>() {
            Some(index) => self.remove_at(index, id),
            None => false,
        })
    }

    /// Detach every type of `S`. Returns how many were present.
    pub fn remove_all<S: ComponentSet>(&mut self, id: EntityId) -> Result<usize, RegistryError> {
        if !self.entities.contains(id) {
            return Err(RegistryError::NoSuchEntity { entity: id });
        }
        let signature = self.registered_signature_of::<S>();
        Ok(signature
            .indices()
            .filter(|&index| self.remove_at(index, id))
            .count())
    }

    fn remove_at(&mut self, index: TypeIndex, id: EntityId) -> bool {
        let callbacks = match self.slot(index) {
            Some(slot) if slot.pool.contains(id) => slot.on_remove.snapshot(),
            _ => return false,
        };
        self.emit(callbacks, id);

        let removed = self
            .slot_mut(index)
            .and_then(|slot| slot.pool.remove(id))
            .is_some();
        if removed {
            if let Some(signature) = self.entities.get_mut(id) {
                signature.remove(index);
            }
            self.counters.bump("components_removed");
            trace!(
                entity = %id,
                component = self.types.name_of(index).unwrap_or("?"),
                "component removed"
            );
        }
        removed
    }

    pub fn get<T: Component>(&self, id: EntityId) -> Result<&T, RegistryError> {
        if !self.entities.contains(id) {
            return Err(RegistryError::NoSuchEntity { entity: id });
        }
        let pool = self
            .pool::<T>()
            .ok_or(RegistryError::UnregisteredComponent {
                component: T::component_name(),
            })?;
        pool.get(id).ok_or(RegistryError::MissingComponent {
            entity: id,
            component: T::component_name(),
        })
    }

    pub fn get_mut<T: Component>(&mut self, id: EntityId) -> Result<&mut T, RegistryError> {
        if !self.entities.contains(id) {
            return Err(RegistryError::NoSuchEntity { entity: id });
        }
        let index = self
            .live_index::<T>()
            .ok_or(RegistryError::UnregisteredComponent {
                component: T::component_name(),
            })?;
        self.pool_at_mut::<T>(index)?
            .get_mut(id)
            .ok_or(RegistryError::MissingComponent {
                entity: id,
                component: T::component_name(),
            })
    }

    /// `get` for callers that treat absence as normal.
    pub fn try_get<T: Component>(&self, id: EntityId) -> Option<&T> {
        self.pool::<T>()?.get(id)
    }

    /// True if `id` has a `T`. Unregistered types are simply absent.
    pub fn has<T: Component>(&self, id: EntityId) -> bool {
        self.pool::<T>().is_some_and(|pool| pool.contains(id))
    }

    /// True if `id` has every type of `S`.
    pub fn has_all<S: ComponentSet>(&self, id: EntityId) -> bool {
        match (self.signature(id), self.signature_of::<S>()) {
            (Some(signature), Some(required)) => signature.contains_all(required),
            _ => false,
        }
    }

    /// True if `id` has at least one type of `S`.
    pub fn has_any<S: ComponentSet>(&self, id: EntityId) -> bool {
        self.signature(id)
            .is_some_and(|signature| signature.intersects(self.registered_signature_of::<S>()))
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// View over every entity holding all components of `Q`.
    pub fn view<Q: Query>(&mut self) -> Result<View<'_, Q>, RegistryError> {
        View::new(self)
    }

    /// Shorthand for `view::<Q>()?.for_each(f)`.
    pub fn each<'r, Q, F>(&'r mut self, f: F) -> Result<(), RegistryError>
    where
        Q: Query,
        F: FnMut(EntityId, Q::Item<'r>),
    {
        self.view::<Q>()?.for_each(f);
        Ok(())
    }

    /// Detached copy of `id`'s component at `index`.
    pub(crate) fn clone_component(
        &self,
        index: TypeIndex,
        id: EntityId,
    ) -> Option<Box<dyn ErasedComponent>> {
        self.slot(index)?.pool.clone_component(id)
    }

    pub(crate) fn pool_len(&self, index: TypeIndex) -> usize {
        self.slot(index).map_or(0, |slot| slot.pool.len())
    }

    /// Dense ids of the pool at `index`, or of the entity pool for `None`.
    pub(crate) fn base_ids(&self, base: Option<TypeIndex>) -> &[EntityId] {
        match base {
            Some(index) => self
                .slot(index)
                .map(|slot| slot.pool.set().ids())
                .unwrap_or(&[]),
            None => self.entities.ids(),
        }
    }

    /// Whether `id` is a member of the pool at `index`, or alive for `None`.
    pub(crate) fn base_contains(&self, base: Option<TypeIndex>, id: EntityId) -> bool {
        match base {
            Some(index) => self.slot(index).is_some_and(|slot| slot.pool.contains(id)),
            None => self.entities.contains(id),
        }
    }

    /// Entity signatures alongside individually borrowable pools, for views.
    pub(crate) fn query_parts(
        &mut self,
    ) -> (&ComponentPool<Signature>, Vec<Option<&mut Box<dyn ErasedPool>>>) {
        let pools = self
            .pools
            .iter_mut()
            .map(|slot| slot.as_mut().map(|slot| &mut slot.pool))
            .collect();
        (&self.entities, pools)
    }

    // ------------------------------------------------------------------
    // Signals
    // ------------------------------------------------------------------

    pub fn on_create(&mut self) -> &mut RegistrySignal {
        &mut self.on_create
    }

    pub fn on_destroy(&mut self) -> &mut RegistrySignal {
        &mut self.on_destroy
    }

    /// Fired after a `T` is attached. Registers `T` if needed.
    pub fn on_add<T: Component>(&mut self) -> Result<&mut RegistrySignal, RegistryError> {
        let index = self.register::<T>()?;
        self.slot_mut(index)
            .map(|slot| &mut slot.on_add)
            .ok_or(RegistryError::UnregisteredComponent {
                component: T::component_name(),
            })
    }

    /// Fired before a `T` is detached, while it is still readable.
    pub fn on_remove<T: Component>(&mut self) -> Result<&mut RegistrySignal, RegistryError> {
        let index = self.register::<T>()?;
        self.slot_mut(index)
            .map(|slot| &mut slot.on_remove)
            .ok_or(RegistryError::UnregisteredComponent {
                component: T::component_name(),
            })
    }

    fn emit(&mut self, callbacks: Vec<Callback<Registry, EntityId>>, id: EntityId) {
        for callback in callbacks {
            callback(self, id);
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("entities", &self.entities.len())
            .field("next_id", &self.next_id)
            .field("free_ids", &self.free_ids.len())
            .field("free_runs", &self.free_ids.runs())
            .field("components", &self.component_types())
            .finish()
    }
}
