//! Free entity ids below the registry's high-water mark.

use std::collections::BTreeMap;

/// Set of free ids stored as disjoint, non-adjacent `[start, end)` runs keyed
/// by `start`. Hinting a far-away id frees one run instead of every id in it.
#[derive(Clone, Debug, Default)]
pub(crate) struct FreeIds {
    runs: BTreeMap<u32, u32>,
    len: u64,
}

impl FreeIds {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Number of free ids (not runs).
    pub(crate) fn len(&self) -> u64 {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub(crate) fn runs(&self) -> usize {
        self.runs.len()
    }

    pub(crate) fn clear(&mut self) {
        self.runs.clear();
        self.len = 0;
    }

    fn run_containing(&self, id: u32) -> Option<(u32, u32)> {
        self.runs
            .range(..=id)
            .next_back()
            .filter(|&(_, &end)| id < end)
            .map(|(&start, &end)| (start, end))
    }

    pub(crate) fn contains(&self, id: u32) -> bool {
        self.run_containing(id).is_some()
    }

    /// Take the lowest free id.
    pub(crate) fn pop_first(&mut self) -> Option<u32> {
        let (start, end) = self.runs.pop_first()?;
        if start + 1 < end {
            self.runs.insert(start + 1, end);
        }
        self.len -= 1;
        Some(start)
    }

    /// Take `id` out of the set. Returns `false` if it was not free.
    pub(crate) fn remove(&mut self, id: u32) -> bool {
        let Some((start, end)) = self.run_containing(id) else {
            return false;
        };
        self.runs.remove(&start);
        if start < id {
            self.runs.insert(start, id);
        }
        if id + 1 < end {
            self.runs.insert(id + 1, end);
        }
        self.len -= 1;
        true
    }

    pub(crate) fn insert(&mut self, id: u32) {
        self.insert_range(id, id + 1);
    }

    /// Add `[start, end)`, which must not overlap a free run.
    pub(crate) fn insert_range(&mut self, start: u32, end: u32) {
        if start >= end {
            return;
        }
        debug_assert!(!self.contains(start) && !self.contains(end - 1));
        self.len += u64::from(end - start);

        let mut merged = (start, end);
        if let Some((&before, &before_end)) = self.runs.range(..start).next_back() {
            if before_end == start {
                self.runs.remove(&before);
                merged.0 = before;
            }
        }
        if let Some(after_end) = self.runs.remove(&end) {
            merged.1 = after_end;
        }
        self.runs.insert(merged.0, merged.1);
    }

    /// Remove the run ending exactly at `end`, returning its start.
    pub(crate) fn pop_run_ending_at(&mut self, end: u32) -> Option<u32> {
        let (&start, &run_end) = self.runs.range(..end).next_back()?;
        if run_end != end {
            return None;
        }
        self.runs.remove(&start);
        self.len -= u64::from(end - start);
        Some(start)
    }
}
