/// Sentinel stored in a sparse slot when the entity is absent.
pub(crate) const ABSENT: u32 = u32::MAX;

/// One lazily allocated page of the sparse array: maps a run of
/// `capacity()` consecutive entity ids to dense indices.
#[derive(Clone, Debug)]
pub struct Page {
    slots: Box<[u32]>,
    occupied: usize,
}

impl Page {
    pub fn with_capacity(rows: usize) -> Self {
        Self {
            slots: vec![ABSENT; rows].into_boxed_slice(),
            occupied: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots currently pointing into the dense array.
    #[inline]
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    #[inline]
    pub fn get(&self, local: usize) -> Option<usize> {
        match self.slots[local] {
            ABSENT => None,
            index => Some(index as usize),
        }
    }

    /// Point `local` at `dense`, returning the previous mapping.
    #[inline]
    pub fn set(&mut self, local: usize, dense: usize) -> Option<usize> {
        debug_assert!(dense < ABSENT as usize, "dense index overflows sparse slot");
        let prev = self.get(local);
        if prev.is_none() {
            self.occupied += 1;
        }
        self.slots[local] = dense as u32;
        prev
    }

    /// Clear `local`, returning the previous mapping.
    #[inline]
    pub fn unset(&mut self, local: usize) -> Option<usize> {
        let prev = self.get(local);
        if prev.is_some() {
            self.occupied -= 1;
            self.slots[local] = ABSENT;
        }
        prev
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_tracks_occupancy() {
        let mut page = Page::with_capacity(8);
        assert!(page.is_empty());
        assert_eq!(page.set(3, 10), None);
        assert_eq!(page.set(3, 11), Some(10));
        assert_eq!(page.occupied(), 1);
        assert_eq!(page.get(3), Some(11));
        assert_eq!(page.unset(3), Some(11));
        assert_eq!(page.unset(3), None);
        assert!(page.is_empty());
    }
}
