use crate::ecs::EntityId;
use crate::pool::SparseSet;

/// Sparse-set pool holding one component type by value.
///
/// Values live in a dense `Vec<T>` that moves in lockstep with the id
/// bookkeeping of the inner [`SparseSet`]: `values[i]` belongs to
/// `set.ids()[i]`. Any insert or remove may reorder or reallocate the dense
/// array, so references into it never outlive a structural change.
#[derive(Clone, Debug)]
pub struct ComponentPool<T> {
    set: SparseSet,
    values: Vec<T>,
}

impl<T> ComponentPool<T> {
    pub fn new() -> Self {
        Self::with_page_size(SparseSet::DEFAULT_PAGE_SIZE)
    }

    /// Create a pool whose sparse pages each cover `page_size` ids.
    /// `page_size` must be a non-zero power of two.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            set: SparseSet::with_page_size(page_size),
            values: Vec::new(),
        }
    }

    /// Id bookkeeping (dense order matches `values()`).
    #[inline]
    pub fn set(&self) -> &SparseSet {
        &self.set
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: EntityId) -> bool {
        self.set.contains(id)
    }

    #[inline]
    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        self.set.index_of(id)
    }

    #[inline]
    pub fn ids(&self) -> &[EntityId] {
        self.set.ids()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.set.reserve(additional);
        self.values.reserve(additional);
    }

    /// Insert `value` for `id`. If `id` is already present the pool is left
    /// untouched and `value` is dropped.
    pub fn insert(&mut self, id: EntityId, value: T) -> (usize, bool) {
        self.insert_with(id, || value)
    }

    /// Insert the value produced by `make`, calling it only when `id` is absent.
    pub fn insert_with(&mut self, id: EntityId, make: impl FnOnce() -> T) -> (usize, bool) {
        let (index, inserted) = self.set.insert(id);
        if inserted {
            self.values.push(make());
        }
        debug_assert_eq!(self.set.len(), self.values.len());
        (index, inserted)
    }

    /// Insert or overwrite, returning the previous value if there was one.
    pub fn replace(&mut self, id: EntityId, value: T) -> (usize, Option<T>) {
        match self.set.index_of(id) {
            Some(index) => (index, Some(std::mem::replace(&mut self.values[index], value))),
            None => {
                let (index, _) = self.insert(id, value);
                (index, None)
            }
        }
    }

    /// Swap-remove `id`, returning its former dense index and its value.
    pub fn remove(&mut self, id: EntityId) -> Option<(usize, T)> {
        let index = self.set.remove(id)?;
        let value = self.values.swap_remove(index);
        Some((index, value))
    }

    #[inline]
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.set.index_of(id).map(|index| &self.values[index])
    }

    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        let index = self.set.index_of(id)?;
        Some(&mut self.values[index])
    }

    #[inline]
    pub fn get_at(&self, index: usize) -> Option<&T> {
        self.values.get(index)
    }

    #[inline]
    pub fn get_at_mut(&mut self, index: usize) -> Option<&mut T> {
        self.values.get_mut(index)
    }

    #[inline]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    #[inline]
    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// Iterate `(id, &value)` in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> + '_ {
        self.set.ids().iter().copied().zip(self.values.iter())
    }

    /// Iterate `(id, &mut value)` in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> + '_ {
        self.set.ids().iter().copied().zip(self.values.iter_mut())
    }

    /// Swap two dense slots (payload and bookkeeping).
    ///
    /// # Panics
    /// Panics if either index is out of bounds.
    pub fn swap(&mut self, a: usize, b: usize) {
        self.set.swap(a, b);
        self.values.swap(a, b);
    }

    /// Drop every value without per-entity notifications.
    pub fn clear(&mut self) {
        self.set.clear();
        self.values.clear();
    }

    /// Exchange the whole storage with `other`.
    pub fn swap_with(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    /// Borrow the id bookkeeping and the payload separately.
    #[inline]
    pub(crate) fn split_mut(&mut self) -> (&SparseSet, &mut [T]) {
        (&self.set, &mut self.values)
    }
}

impl<T: Clone> ComponentPool<T> {
    /// Replace this pool's contents with a deep copy of `other`.
    pub fn copy_from(&mut self, other: &Self) {
        self.clone_from(other);
    }
}

impl<T: Default> ComponentPool<T> {
    /// Insert a default-constructed value when `id` is absent.
    pub fn insert_default(&mut self, id: EntityId) -> (usize, bool) {
        self.insert_with(id, T::default)
    }
}

impl<T> Default for ComponentPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Health(i32);

    fn e(i: u32) -> EntityId {
        EntityId::new(i)
    }

    #[test]
    fn test_insert_keeps_existing_value() {
        let mut pool = ComponentPool::new();
        assert_eq!(pool.insert(e(1), Health(10)), (0, true));
        assert_eq!(pool.insert(e(1), Health(99)), (0, false));
        assert_eq!(pool.get(e(1)), Some(&Health(10)));
    }

    #[test]
    fn test_insert_with_only_constructs_when_absent() {
        let mut pool = ComponentPool::new();
        let mut calls = 0;
        pool.insert_with(e(1), || {
            calls += 1;
            Health(1)
        });
        pool.insert_with(e(1), || {
            calls += 1;
            Health(2)
        });
        assert_eq!(calls, 1);
        assert_eq!(pool.insert_default(e(2)), (1, true));
        assert_eq!(pool.get(e(2)), Some(&Health(0)));
    }

    #[test]
    fn test_remove_moves_last_value_into_hole() {
        let mut pool = ComponentPool::new();
        for i in 0..4 {
            pool.insert(e(i), Health(i as i32 * 10));
        }
        assert_eq!(pool.remove(e(0)), Some((0, Health(0))));
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.get_at(0), Some(&Health(30)));
        assert_eq!(pool.get(e(3)), Some(&Health(30)));
        assert_eq!(pool.remove(e(0)), None);
        assert!(pool.set().check_integrity());
    }

    #[test]
    fn test_swap_moves_values_with_ids() {
        let mut pool = ComponentPool::new();
        pool.insert(e(5), Health(5));
        pool.insert(e(6), Health(6));
        pool.swap(0, 1);
        assert_eq!(pool.ids(), &[e(6), e(5)]);
        assert_eq!(pool.values(), &[Health(6), Health(5)]);
        assert_eq!(pool.get(e(5)), Some(&Health(5)));
    }

    #[test]
    fn test_replace_and_copy() {
        let mut pool = ComponentPool::new();
        assert_eq!(pool.replace(e(1), Health(1)), (0, None));
        assert_eq!(pool.replace(e(1), Health(2)), (0, Some(Health(1))));

        let mut copy = ComponentPool::new();
        copy.insert(e(9), Health(9));
        copy.copy_from(&pool);
        assert_eq!(copy.len(), 1);
        assert_eq!(copy.get(e(1)), Some(&Health(2)));
        assert!(!copy.contains(e(9)));

        let mut other = ComponentPool::new();
        other.swap_with(&mut copy);
        assert!(copy.is_empty());
        assert_eq!(other.get(e(1)), Some(&Health(2)));
    }

    #[test]
    fn test_iter_mut_pairs_ids() {
        let mut pool = ComponentPool::new();
        pool.insert(e(2), Health(1));
        pool.insert(e(4), Health(1));
        for (id, hp) in pool.iter_mut() {
            hp.0 += id.index() as i32;
        }
        let seen: Vec<_> = pool.iter().map(|(id, hp)| (id.index(), hp.0)).collect();
        assert_eq!(seen, vec![(2, 3), (4, 5)]);
    }
}
