//! Process-wide path ID allocation.
//!
//! A *path* is a sequence of string attributes (e.g. `["area", "children"]`).
//! The same tuple must resolve to the same [`PathId`] no matter which
//! [`crate::id`]-scoped indexer instance asks for it, so the allocator is a
//! single shared table keyed by the full tuple, not by indexer.
//!
//! IDs are reference-counted: every indexer that creates a path node for an
//! ID calls [`PathIdAllocator::acquire`], and releases it when the path node
//! is torn down. The allocator never reuses a live ID, but an ID whose count
//! drops to zero is free to be GC'd by whoever owns the allocator — this
//! module only tracks the count, it does not decide *when* to collect.

use crate::id::PathId;
use std::collections::HashMap;

/// A path is a sequence of string attributes from the root.
pub type PathTuple = Vec<String>;

#[derive(Debug, Default)]
struct Entry {
    id: PathId,
    refs: usize,
}

/// Maps path tuples to stable, reference-counted [`PathId`]s.
#[derive(Debug, Default)]
pub struct PathIdAllocator {
    by_tuple: HashMap<PathTuple, Entry>,
    by_id: HashMap<PathId, PathTuple>,
    next: usize,
}

impl PathIdAllocator {
    /// Creates an empty allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ID for `tuple`, allocating a fresh one on first use, and
    /// increments its reference count.
    pub fn acquire(&mut self, tuple: PathTuple) -> PathId {
        if let Some(entry) = self.by_tuple.get_mut(&tuple) {
            entry.refs += 1;
            return entry.id;
        }
        self.next += 1;
        let id = PathId::new(self.next);
        self.by_id.insert(id, tuple.clone());
        self.by_tuple.insert(tuple, Entry { id, refs: 1 });
        id
    }

    /// Decrements the reference count for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not currently held (double release). Callers must
    /// balance every `acquire` with exactly one `release`.
    pub fn release(&mut self, id: PathId) {
        let tuple = self
            .by_id
            .get(&id)
            .expect("release of an unknown PathId")
            .clone();
        let entry = self
            .by_tuple
            .get_mut(&tuple)
            .expect("release of a PathId with no live entry");
        entry.refs = entry
            .refs
            .checked_sub(1)
            .expect("PathId released more times than it was acquired");
    }

    /// Returns the path tuple for `id`, if it has ever been allocated.
    #[must_use]
    pub fn tuple_of(&self, id: PathId) -> Option<&[String]> {
        self.by_id.get(&id).map(Vec::as_slice)
    }

    /// Returns the current reference count for `id` (0 if unknown or
    /// fully released).
    #[must_use]
    pub fn ref_count(&self, id: PathId) -> usize {
        self.by_id
            .get(&id)
            .and_then(|tuple| self.by_tuple.get(tuple))
            .map_or(0, |entry| entry.refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_tuple_yields_same_id() {
        let mut alloc = PathIdAllocator::new();
        let a = alloc.acquire(vec!["area".into(), "children".into()]);
        let b = alloc.acquire(vec!["area".into(), "children".into()]);
        assert_eq!(a, b);
        assert_eq!(alloc.ref_count(a), 2);
    }

    #[test]
    fn distinct_tuples_yield_distinct_ids() {
        let mut alloc = PathIdAllocator::new();
        let a = alloc.acquire(vec!["area".into()]);
        let b = alloc.acquire(vec!["area".into(), "children".into()]);
        assert_ne!(a, b);
    }

    #[test]
    #[should_panic(expected = "released more times")]
    fn double_release_is_forbidden() {
        let mut alloc = PathIdAllocator::new();
        let id = alloc.acquire(vec!["area".into()]);
        alloc.release(id);
        alloc.release(id);
    }
}
