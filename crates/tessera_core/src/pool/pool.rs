use crate::ecs::EntityId;
use crate::pool::page::Page;

/// Entity-indexed sparse set.
///
/// `dense` lists member ids contiguously; `sparse` is split into pages of
/// `page_size` slots that are only allocated once an id in their range is
/// inserted, so the id space never has to be pre-sized. For every member,
/// `dense[sparse[id]] == id`.
#[derive(Clone, Debug)]
pub struct SparseSet {
    page_size: usize,
    shift: u32,
    mask: usize,
    pages: Vec<Option<Box<Page>>>,
    dense: Vec<EntityId>,
}

impl SparseSet {
    pub const DEFAULT_PAGE_SIZE: usize = 1024;

    pub fn new() -> Self {
        Self::with_page_size(Self::DEFAULT_PAGE_SIZE)
    }

    /// `page_size` must be a non-zero power of two.
    pub fn with_page_size(page_size: usize) -> Self {
        assert!(page_size.is_power_of_two() && page_size > 0);
        Self {
            page_size,
            shift: page_size.trailing_zeros(),
            mask: page_size - 1,
            pages: Vec::new(),
            dense: Vec::new(),
        }
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[inline]
    fn page_of(&self, id: EntityId) -> usize {
        id.to_usize() >> self.shift
    }

    #[inline]
    fn local_of(&self, id: EntityId) -> usize {
        id.to_usize() & self.mask
    }

    /// Number of sparse pages currently allocated.
    pub fn allocated_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.is_some()).count()
    }

    fn page_mut(&mut self, id: EntityId) -> &mut Page {
        let pid = self.page_of(id);
        if pid >= self.pages.len() {
            self.pages.resize_with(pid + 1, || None);
        }
        let page_size = self.page_size;
        self.pages[pid].get_or_insert_with(|| Box::new(Page::with_capacity(page_size)))
    }

    #[inline]
    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        self.pages
            .get(self.page_of(id))?
            .as_ref()?
            .get(self.local_of(id))
    }

    #[inline]
    pub fn contains(&self, id: EntityId) -> bool {
        self.index_of(id).is_some()
    }

    #[inline]
    pub fn id_at(&self, index: usize) -> Option<EntityId> {
        self.dense.get(index).copied()
    }

    /// Member ids in dense order.
    #[inline]
    pub fn ids(&self) -> &[EntityId] {
        &self.dense
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.dense.reserve(additional);
    }

    /// Insert `id`, returning its dense index and whether it was newly added.
    /// Inserting a member again is a no-op.
    pub fn insert(&mut self, id: EntityId) -> (usize, bool) {
        if let Some(index) = self.index_of(id) {
            return (index, false);
        }
        let index = self.dense.len();
        let local = self.local_of(id);
        self.page_mut(id).set(local, index);
        self.dense.push(id);
        (index, true)
    }

    /// Swap-remove `id`, returning the dense index it occupied.
    ///
    /// The last member moves into the vacated slot; callers holding parallel
    /// payload arrays must mirror this with `Vec::swap_remove`.
    pub fn remove(&mut self, id: EntityId) -> Option<usize> {
        let index = self.index_of(id)?;
        let last = self.dense.len() - 1;
        self.dense.swap_remove(index);
        if index != last {
            let moved = self.dense[index];
            let local = self.local_of(moved);
            self.page_mut(moved).set(local, index);
        }

        let pid = self.page_of(id);
        let local = self.local_of(id);
        if let Some(slot) = self.pages.get_mut(pid) {
            let emptied = slot.as_mut().map_or(false, |page| {
                page.unset(local);
                page.is_empty()
            });
            if emptied {
                *slot = None;
            }
        }
        while self.pages.last().map_or(false, Option::is_none) {
            self.pages.pop();
        }
        Some(index)
    }

    /// Swap two dense slots, keeping both sparse mappings correct.
    ///
    /// # Panics
    /// Panics if either index is out of bounds.
    pub fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            assert!(a < self.dense.len(), "dense index {a} out of bounds");
            return;
        }
        self.dense.swap(a, b);
        for index in [a, b] {
            let id = self.dense[index];
            let local = self.local_of(id);
            self.page_mut(id).set(local, index);
        }
    }

    /// Drop every member and every page.
    pub fn clear(&mut self) {
        self.dense.clear();
        self.pages.clear();
    }

    /// Verify `dense[sparse[id]] == id` for all members and that the sparse
    /// side holds exactly `len()` mappings.
    pub fn check_integrity(&self) -> bool {
        let mapped: usize = self.pages.iter().flatten().map(|page| page.occupied()).sum();
        mapped == self.dense.len()
            && self
                .dense
                .iter()
                .enumerate()
                .all(|(index, &id)| self.index_of(id) == Some(index))
    }
}

impl Default for SparseSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(i: u32) -> EntityId {
        EntityId::new(i)
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut set = SparseSet::with_page_size(4);
        assert_eq!(set.insert(e(3)), (0, true));
        assert_eq!(set.insert(e(9)), (1, true));
        assert_eq!(set.insert(e(3)), (0, false));
        assert_eq!(set.len(), 2);
        assert!(set.check_integrity());
    }

    #[test]
    fn test_pages_allocate_lazily() {
        let mut set = SparseSet::with_page_size(4);
        set.insert(e(1000));
        assert_eq!(set.allocated_pages(), 1);
        assert!(!set.contains(e(0)));
        assert!(!set.contains(e(5000)));
        set.remove(e(1000));
        assert_eq!(set.allocated_pages(), 0);
    }

    #[test]
    fn test_swap_and_pop() {
        let mut set = SparseSet::with_page_size(4);
        for i in 0..5 {
            set.insert(e(i));
        }
        assert_eq!(set.remove(e(1)), Some(1));
        assert_eq!(set.len(), 4);
        assert!(!set.contains(e(1)));
        // last member moved into the hole
        assert_eq!(set.id_at(1), Some(e(4)));
        assert_eq!(set.index_of(e(4)), Some(1));
        for i in [0, 2, 3, 4] {
            assert!(set.contains(e(i)));
        }
        assert!(set.check_integrity());
        assert_eq!(set.remove(e(1)), None);
    }

    #[test]
    fn test_remove_last_member() {
        let mut set = SparseSet::new();
        set.insert(e(7));
        assert_eq!(set.remove(e(7)), Some(0));
        assert!(set.is_empty());
        assert!(set.check_integrity());
    }

    #[test]
    fn test_swap_keeps_mappings() {
        let mut set = SparseSet::with_page_size(2);
        set.insert(e(10));
        set.insert(e(20));
        set.insert(e(30));
        set.swap(0, 2);
        assert_eq!(set.ids(), &[e(30), e(20), e(10)]);
        assert_eq!(set.index_of(e(10)), Some(2));
        assert_eq!(set.index_of(e(30)), Some(0));
        assert!(set.check_integrity());
    }

    #[test]
    fn test_clear() {
        let mut set = SparseSet::new();
        set.insert(e(1));
        set.insert(e(2));
        set.clear();
        assert!(set.is_empty());
        assert!(!set.contains(e(1)));
        assert_eq!(set.allocated_pages(), 0);
    }

    #[test]
    fn test_density_under_churn() {
        let mut set = SparseSet::with_page_size(8);
        for i in 0..64 {
            set.insert(e(i * 3));
        }
        for i in (0..64).filter(|i| i % 3 == 0) {
            set.remove(e(i * 3));
        }
        for i in 0..10 {
            set.insert(e(1000 + i));
        }
        assert!(set.check_integrity());
        let expected = 64 - (0..64).filter(|i| i % 3 == 0).count() + 10;
        assert_eq!(set.len(), expected);
    }
}
