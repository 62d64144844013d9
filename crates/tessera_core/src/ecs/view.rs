//! Views: filtered, optionally partitioned iteration over a registry.
//!
//! A view walks the dense array of one *base* pool and yields every entity
//! whose signature holds all requested components and none of the excluded
//! ones. The base is the smallest requested pool; equally small pools are
//! ranked by type index, lowest first. A view over `()` walks the entity pool.
//!
//! ```ignore
//! registry
//!     .view::<(Position, Velocity)>()?
//!     .excluding::<(Frozen,)>()
//!     .each(|_, (pos, vel)| pos.0 += vel.0);
//! ```
//!
//! `each`/`par_each` hand out component references and therefore cannot
//! change structure. `each_entity` hands out the registry itself; a callback
//! may destroy its entity or remove the iterated component and iteration
//! still visits every entity present at the start exactly once. Entities
//! added while iterating may or may not be visited.

use crate::ecs::{
    Component, ComponentPool, ComponentSet, EntityId, ErasedPool, Registry, RegistryError,
    Signature, TypeIndex,
};
use crate::pool::SparseSet;
use rayon::prelude::*;
use std::any::TypeId;
use std::marker::PhantomData;

/// Raw access to one pool's values for the duration of a view pass.
#[doc(hidden)]
pub struct Column<'a, T> {
    set: &'a SparseSet,
    values: *mut T,
    len: usize,
    _marker: PhantomData<&'a mut [T]>,
}

impl<T> Clone for Column<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Column<'_, T> {}

// SAFETY: a column is only dereferenced for ids owned by the calling worker.
unsafe impl<T: Send + Sync> Send for Column<'_, T> {}
unsafe impl<T: Send + Sync> Sync for Column<'_, T> {}

impl<'a, T: Component> Column<'a, T> {
    fn new(pool: &'a mut Box<dyn ErasedPool>) -> Option<Self> {
        let pool = pool.as_any_mut().downcast_mut::<ComponentPool<T>>()?;
        let (set, values) = pool.split_mut();
        Some(Self {
            set,
            len: values.len(),
            values: values.as_mut_ptr(),
            _marker: PhantomData,
        })
    }

    /// # Safety
    /// No other reference to `id`'s value may be alive for `'a`.
    unsafe fn get(&self, id: EntityId) -> Option<&'a mut T> {
        let index = self.set.index_of(id)?;
        debug_assert!(index < self.len);
        // SAFETY: `index` is a live dense slot; uniqueness is on the caller.
        Some(unsafe { &mut *self.values.add(index) })
    }
}

/// A list of distinct component types fetched together by a view.
///
/// # Safety
/// `columns` must borrow each pool at most once and `fetch` must return
/// references into distinct slots for distinct ids.
pub unsafe trait Query: ComponentSet {
    /// One entity's components, as a tuple of `&mut T`.
    type Item<'a>;

    #[doc(hidden)]
    type Columns<'a>: Send + Sync;

    #[doc(hidden)]
    fn columns<'a>(
        indices: &[TypeIndex],
        pools: &mut [Option<&'a mut Box<dyn ErasedPool>>],
    ) -> Option<(Self::Columns<'a>, Vec<&'a SparseSet>)>;

    #[doc(hidden)]
    /// # Safety
    /// Each id may be fetched at most once while its items are alive.
    unsafe fn fetch<'a>(columns: &Self::Columns<'a>, id: EntityId) -> Option<Self::Item<'a>>;
}

unsafe impl Query for () {
    type Item<'a> = ();
    type Columns<'a> = ();

    fn columns<'a>(
        _indices: &[TypeIndex],
        _pools: &mut [Option<&'a mut Box<dyn ErasedPool>>],
    ) -> Option<((), Vec<&'a SparseSet>)> {
        Some(((), Vec::new()))
    }

    unsafe fn fetch<'a>(_columns: &Self::Columns<'a>, _id: EntityId) -> Option<Self::Item<'a>> {
        Some(())
    }
}

macro_rules! impl_query {
    ($($T:ident $column:ident),+) => {
        unsafe impl<$($T: Component),+> Query for ($($T,)+) {
            type Item<'a> = ($(&'a mut $T,)+);
            type Columns<'a> = ($(Column<'a, $T>,)+);

            fn columns<'a>(
                indices: &[TypeIndex],
                pools: &mut [Option<&'a mut Box<dyn ErasedPool>>],
            ) -> Option<(Self::Columns<'a>, Vec<&'a SparseSet>)> {
                let mut indices = indices.iter();
                let mut sets = Vec::with_capacity(<Self as ComponentSet>::LEN);
                let columns = ($(
                    {
                        let index = indices.next()?;
                        let pool = pools.get_mut(index.index())?.take()?;
                        let column = Column::<$T>::new(pool)?;
                        sets.push(column.set);
                        column
                    },
                )+);
                Some((columns, sets))
            }

            unsafe fn fetch<'a>(
                columns: &Self::Columns<'a>,
                id: EntityId,
            ) -> Option<Self::Item<'a>> {
                let ($($column,)+) = columns;
                // SAFETY: forwarded from the caller; the types are distinct
                // so the columns never overlap.
                Some(($(unsafe { $column.get(id)? },)+))
            }
        }
    };
}

impl_query!(T1 c1);
impl_query!(T1 c1, T2 c2);
impl_query!(T1 c1, T2 c2, T3 c3);
impl_query!(T1 c1, T2 c2, T3 c3, T4 c4);
impl_query!(T1 c1, T2 c2, T3 c3, T4 c4, T5 c5);
impl_query!(T1 c1, T2 c2, T3 c3, T4 c4, T5 c5, T6 c6);
impl_query!(T1 c1, T2 c2, T3 c3, T4 c4, T5 c5, T6 c6, T7 c7);
impl_query!(T1 c1, T2 c2, T3 c3, T4 c4, T5 c5, T6 c6, T7 c7, T8 c8);

/// `[start, end)` of piece `index` when `len` items are split into `count`
/// equal pieces. The last piece absorbs the remainder.
fn partition(len: usize, index: usize, count: usize) -> (usize, usize) {
    if count == 0 || index >= count {
        return (len, len);
    }
    let chunk = len / count;
    let start = index * chunk;
    let end = if index + 1 == count { len } else { start + chunk };
    (start, end)
}

#[inline]
fn accepts(
    signatures: &ComponentPool<Signature>,
    id: EntityId,
    include: Signature,
    exclude: Signature,
) -> bool {
    signatures
        .get(id)
        .is_some_and(|signature| signature.contains_all(include) && !signature.intersects(exclude))
}

/// A query over a registry. Built by [`Registry::view`].
pub struct View<'r, Q: Query> {
    registry: &'r mut Registry,
    indices: Vec<TypeIndex>,
    include: Signature,
    exclude: Signature,
    /// Position in `indices` of the pool driving iteration.
    base: Option<usize>,
    /// Some requested type has no pool, so nothing can match.
    empty: bool,
    piece: (usize, usize),
    _query: PhantomData<fn() -> Q>,
}

impl<'r, Q: Query> View<'r, Q> {
    pub(crate) fn new(registry: &'r mut Registry) -> Result<Self, RegistryError> {
        let mut seen: Vec<TypeId> = Vec::with_capacity(Q::LEN);
        let mut duplicate = None;
        let mut indices = Vec::with_capacity(Q::LEN);
        let mut empty = false;
        Q::each_type(|type_id, name| {
            if seen.contains(&type_id) {
                duplicate.get_or_insert(name);
                return;
            }
            seen.push(type_id);
            match registry.live_index_of_id(type_id) {
                Some(index) => indices.push(index),
                None => empty = true,
            }
        });
        if let Some(component) = duplicate {
            return Err(RegistryError::DuplicateQueryComponent { component });
        }

        let include = indices
            .iter()
            .fold(Signature::EMPTY, |signature, &index| signature.with(index));
        let base = indices
            .iter()
            .enumerate()
            .min_by_key(|&(_, index)| (registry.pool_len(*index), *index))
            .map(|(position, _)| position);
        tracing::trace!(query = ?Q::names(), ?base, empty, "view built");

        Ok(Self {
            registry,
            indices,
            include,
            exclude: Signature::EMPTY,
            base,
            empty,
            piece: (0, 1),
            _query: PhantomData,
        })
    }

    /// Skip entities holding any type of `S`. Types without a pool are
    /// ignored since no entity can hold them.
    pub fn excluding<S: ComponentSet>(mut self) -> Self {
        self.exclude = self
            .exclude
            .union(self.registry.registered_signature_of::<S>());
        self
    }

    /// Restrict the view to piece `index` of `count` equal slices of the base
    /// pool's dense range. Disjoint pieces may be iterated on separate
    /// threads; the last piece absorbs the remainder.
    pub fn sub_view(mut self, index: usize, count: usize) -> Self {
        self.piece = (index, count.max(1));
        self
    }

    fn base_index(&self) -> Option<TypeIndex> {
        self.base.map(|position| self.indices[position])
    }

    /// Length of the dense array being walked (before filtering).
    pub fn base_len(&self) -> usize {
        if self.empty {
            return 0;
        }
        self.registry.base_ids(self.base_index()).len()
    }

    fn range(&self) -> (usize, usize) {
        partition(self.base_len(), self.piece.0, self.piece.1)
    }

    fn accepts(&self, id: EntityId) -> bool {
        self.registry.signature(id).is_some_and(|signature| {
            signature.contains_all(self.include) && !signature.intersects(self.exclude)
        })
    }

    /// Matching entities in iteration order.
    pub fn entities(&self) -> Vec<EntityId> {
        if self.empty {
            return Vec::new();
        }
        let (start, end) = self.range();
        self.registry.base_ids(self.base_index())[start..end]
            .iter()
            .copied()
            .filter(|&id| self.accepts(id))
            .collect()
    }

    pub fn count(&self) -> usize {
        if self.empty {
            return 0;
        }
        let (start, end) = self.range();
        self.registry.base_ids(self.base_index())[start..end]
            .iter()
            .filter(|&&id| self.accepts(id))
            .count()
    }

    fn reborrow(&mut self) -> View<'_, Q> {
        View {
            registry: &mut *self.registry,
            indices: self.indices.clone(),
            include: self.include,
            exclude: self.exclude,
            base: self.base,
            empty: self.empty,
            piece: self.piece,
            _query: PhantomData,
        }
    }

    /// Call `f` with every matching entity and its components.
    pub fn each<'v, F>(&'v mut self, f: F)
    where
        F: FnMut(EntityId, Q::Item<'v>),
    {
        self.reborrow().for_each(f);
    }

    /// Consuming [`each`](Self::each); items live as long as the registry borrow.
    pub fn for_each<F>(self, mut f: F)
    where
        F: FnMut(EntityId, Q::Item<'r>),
    {
        if self.empty {
            return;
        }
        let (start, end) = self.range();
        let View {
            registry,
            indices,
            include,
            exclude,
            base,
            ..
        } = self;
        let (signatures, mut pools) = registry.query_parts();
        let Some((columns, sets)) = Q::columns(&indices, &mut pools) else {
            return;
        };
        let ids = match base {
            Some(position) => sets[position].ids(),
            None => signatures.ids(),
        };

        for &id in &ids[start..end] {
            if !accepts(signatures, id, include, exclude) {
                continue;
            }
            // SAFETY: every dense slot holds a distinct id and each id owns
            // one slot per pool, so items never alias.
            if let Some(item) = unsafe { Q::fetch(&columns, id) } {
                f(id, item);
            }
        }
    }

    /// [`each`](Self::each) across rayon workers, one sub-view per
    /// `RegistryConfig::parallel_partitions`.
    pub fn par_each<'v, F>(&'v mut self, f: F)
    where
        F: Fn(EntityId, Q::Item<'v>) + Send + Sync,
    {
        let partitions = self.registry.config().partitions();
        self.reborrow().run_parallel(partitions, f);
    }

    /// [`par_each`](Self::par_each) with an explicit partition count.
    pub fn par_each_partitioned<'v, F>(&'v mut self, partitions: usize, f: F)
    where
        F: Fn(EntityId, Q::Item<'v>) + Send + Sync,
    {
        self.reborrow().run_parallel(partitions, f);
    }

    fn run_parallel<F>(self, partitions: usize, f: F)
    where
        F: Fn(EntityId, Q::Item<'r>) + Send + Sync,
    {
        if self.empty {
            return;
        }
        let partitions = partitions.max(1);
        let (start, end) = self.range();
        let View {
            registry,
            indices,
            include,
            exclude,
            base,
            ..
        } = self;
        let (signatures, mut pools) = registry.query_parts();
        let Some((columns, sets)) = Q::columns(&indices, &mut pools) else {
            return;
        };
        let ids = match base {
            Some(position) => sets[position].ids(),
            None => signatures.ids(),
        };
        let ids = &ids[start..end];

        (0..partitions).into_par_iter().for_each(|piece| {
            let (lo, hi) = partition(ids.len(), piece, partitions);
            for &id in &ids[lo..hi] {
                if !accepts(signatures, id, include, exclude) {
                    continue;
                }
                // SAFETY: pieces are disjoint dense ranges, so each id and
                // its component slots are fetched by exactly one worker.
                if let Some(item) = unsafe { Q::fetch(&columns, id) } {
                    f(id, item);
                }
            }
        });
    }

    /// Call `f` with the registry and every matching entity.
    ///
    /// `f` may destroy the current entity or remove the iterated component:
    /// when the visited entity leaves the base pool, swap-and-pop has moved
    /// another entity into its slot, so that slot is visited again instead
    /// of skipped. The upper bound only ever shrinks with the base pool.
    pub fn each_entity<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut Registry, EntityId),
    {
        if self.empty {
            return;
        }
        let base = self.base_index();
        let (mut cursor, mut end) = self.range();

        loop {
            let ids = self.registry.base_ids(base);
            end = end.min(ids.len());
            if cursor >= end {
                break;
            }
            let id = ids[cursor];
            if self.accepts(id) {
                f(&mut *self.registry, id);
            }
            if self.registry.exists(id) && self.registry.base_contains(base, id) {
                cursor += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Position(f32);

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Velocity(f32);

    #[derive(Clone, Debug, Default)]
    struct Frozen;

    fn populated(n: u32) -> Registry {
        let mut registry = Registry::new();
        for i in 0..n {
            let id = registry.create_with((Position(0.0),)).unwrap();
            if i % 2 == 0 {
                registry.add(id, Velocity(i as f32)).unwrap();
            }
        }
        registry
    }

    #[test]
    fn test_partition_covers_range() {
        assert_eq!(partition(10, 0, 3), (0, 3));
        assert_eq!(partition(10, 1, 3), (3, 6));
        assert_eq!(partition(10, 2, 3), (6, 10));
        assert_eq!(partition(2, 0, 4), (0, 0));
        assert_eq!(partition(2, 3, 4), (0, 2));
        assert_eq!(partition(5, 4, 4), (5, 5));
    }

    #[test]
    fn test_each_visits_only_full_matches() {
        let mut registry = populated(10);
        let mut visited = Vec::new();
        registry
            .view::<(Position, Velocity)>()
            .unwrap()
            .each(|id, (position, velocity)| {
                position.0 += velocity.0;
                visited.push(id);
            });
        assert_eq!(visited.len(), 5);
        for id in visited {
            let expected = registry.get::<Velocity>(id).unwrap().0;
            assert_eq!(registry.get::<Position>(id).unwrap().0, expected);
        }
    }

    #[test]
    fn test_base_pool_is_smallest() {
        let mut registry = populated(10);
        let view = registry.view::<(Position, Velocity)>().unwrap();
        assert_eq!(view.base_len(), 5);
        assert_eq!(view.count(), 5);
    }

    #[test]
    fn test_base_pool_tie_takes_lowest_type_index() {
        let mut registry = Registry::new();
        registry.create_with((Velocity(0.0), Position(0.0))).unwrap();
        let velocity = registry.type_index::<Velocity>().unwrap();

        let view = registry.view::<(Position, Velocity)>().unwrap();
        assert_eq!(view.base_index(), Some(velocity));
    }

    #[test]
    fn test_exclusion_filter() {
        let mut registry = Registry::new();
        let a = registry.create_with((Position(0.0), Frozen)).unwrap();
        let b = registry.create_with((Position(0.0),)).unwrap();

        let view = registry.view::<(Position,)>().unwrap().excluding::<(Frozen,)>();
        assert_eq!(view.entities(), vec![b]);
        assert!(!view.entities().contains(&a));
    }

    #[test]
    fn test_unregistered_query_type_is_empty_and_registers_nothing() {
        let mut registry = populated(3);
        let mut calls = 0;
        registry
            .view::<(Position, Frozen)>()
            .unwrap()
            .each(|_, _| calls += 1);
        assert_eq!(calls, 0);
        assert!(!registry.is_registered::<Frozen>());
    }

    #[test]
    fn test_duplicate_query_type_is_rejected() {
        let mut registry = populated(1);
        let err = registry.view::<(Position, Position)>().err().unwrap();
        assert_eq!(
            err,
            RegistryError::DuplicateQueryComponent {
                component: Position::component_name()
            }
        );
    }

    #[test]
    fn test_unit_query_walks_entity_pool() {
        let mut registry = populated(4);
        let bare = registry.create();
        let view = registry.view::<()>().unwrap();
        assert_eq!(view.count(), 5);
        assert!(view.entities().contains(&bare));
    }

    #[test]
    fn test_sub_views_partition_without_overlap() {
        let mut registry = populated(11);
        let k = 4;
        let mut seen = HashSet::new();
        let mut total = 0;
        for piece in 0..k {
            let view = registry.view::<(Position,)>().unwrap().sub_view(piece, k);
            for id in view.entities() {
                assert!(seen.insert(id), "{id} visited twice");
                total += 1;
            }
        }
        assert_eq!(total, 11);
    }

    #[test]
    fn test_each_entity_survives_self_destruction() {
        let mut registry = Registry::new();
        registry.create();
        let ids: Vec<_> = (0..3)
            .map(|_| registry.create_with((Position(0.0),)).unwrap())
            .collect();

        let mut visits = Vec::new();
        registry
            .view::<(Position,)>()
            .unwrap()
            .each_entity(|registry, id| {
                visits.push(id);
                if id == ids[1] {
                    registry.destroy(id);
                }
            });
        assert_eq!(visits, ids);
        assert!(!registry.exists(ids[1]));
    }

    #[test]
    fn test_each_entity_survives_removing_base_component() {
        let mut registry = populated(20);
        let mut visits = HashSet::new();
        registry
            .view::<(Position,)>()
            .unwrap()
            .each_entity(|registry, id| {
                assert!(visits.insert(id));
                registry.remove::<Position>(id).unwrap();
            });
        assert_eq!(visits.len(), 20);
        assert!(registry.pool::<Position>().unwrap().is_empty());
    }

    #[test]
    fn test_each_entity_terminates_when_component_is_reset() {
        let mut registry = populated(10);
        let mut visits = 0;
        registry
            .view::<(Position,)>()
            .unwrap()
            .each_entity(|registry, id| {
                visits += 1;
                assert!(visits <= 20, "iteration kept revisiting reset entities");
                registry.remove::<Position>(id).unwrap();
                registry.add(id, Position(1.0)).unwrap();
            });
        let pool = registry.pool::<Position>().unwrap();
        assert_eq!(pool.len(), 10);
        assert!(pool.set().check_integrity());
    }

    #[test]
    fn test_each_entity_on_sub_views_visits_each_member_once() {
        let mut registry = populated(10);
        let mut visits: HashMap<EntityId, usize> = HashMap::new();

        // last piece covers dense slots 5..10
        registry
            .view::<(Position,)>()
            .unwrap()
            .sub_view(1, 2)
            .each_entity(|registry, id| {
                *visits.entry(id).or_default() += 1;
                registry.destroy(id);
            });
        let expected: HashSet<_> = (5..10).map(EntityId::new).collect();
        assert_eq!(visits.keys().copied().collect::<HashSet<_>>(), expected);
        assert!(visits.values().all(|&n| n == 1));
        assert_eq!(registry.len(), 5);

        // first piece of the remaining five covers slots 0..2; its bound
        // shrinks with the pool as later entities are swapped in
        visits.clear();
        registry
            .view::<(Position,)>()
            .unwrap()
            .sub_view(0, 2)
            .each_entity(|registry, id| {
                *visits.entry(id).or_default() += 1;
                registry.destroy(id);
            });
        assert_eq!(visits.get(&EntityId::new(0)), Some(&1));
        assert_eq!(visits.get(&EntityId::new(1)), Some(&1));
        assert!(visits.values().all(|&n| n == 1));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_par_each_touches_every_match_once() {
        let mut registry = populated(1000);
        let calls = AtomicUsize::new(0);
        registry
            .view::<(Position, Velocity)>()
            .unwrap()
            .par_each_partitioned(7, |_, (position, velocity)| {
                position.0 += velocity.0 + 1.0;
                calls.fetch_add(1, Ordering::Relaxed);
            });
        assert_eq!(calls.load(Ordering::Relaxed), 500);
        for (id, position) in registry.pool::<Position>().unwrap().iter() {
            let expected = registry
                .try_get::<Velocity>(id)
                .map_or(0.0, |velocity| velocity.0 + 1.0);
            assert_eq!(position.0, expected);
        }
    }

    #[test]
    fn test_registry_each_shorthand() {
        let mut registry = populated(6);
        let mut sum = 0.0;
        registry
            .each::<(Velocity,), _>(|_, (velocity,)| sum += velocity.0)
            .unwrap();
        assert_eq!(sum, 0.0 + 2.0 + 4.0);
    }
}
