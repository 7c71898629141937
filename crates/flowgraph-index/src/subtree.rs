//! Sub-tree monitoring: aggregators that roll up terminal-value updates
//! under a registered root, plus the shared compression registry.

use flowgraph_foundation::{ElementId, MonitorId, PathId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// An external subscriber to one sub-tree root's terminal-value stream.
pub trait SubTreeMonitor {
    fn id(&self) -> MonitorId;
    /// Called once per changed root, before any `subtree_update` for it,
    /// marking that this round's contributions are now complete.
    fn complete_update(&mut self, root: ElementId);
    /// Batch notification of which elements changed under `root`.
    fn subtree_update(&mut self, path_id: PathId, element_ids: &[ElementId], monitor: MonitorId);
    fn update_simple_element(
        &mut self,
        path_id: PathId,
        element_id: ElementId,
        type_name: Option<&str>,
        simple_compression: Option<u64>,
    );
    fn remove_simple_element(&mut self, path_id: PathId, element_id: ElementId);

    /// Fired when `element_id`'s covering-root count crosses the
    /// shared/unshared boundary (0↔1, or 1↔2+): `shared` is `true` once a
    /// second covering root starts overlapping it. Default no-op, since
    /// most monitors only care about terminal-value contributions.
    fn sub_tree_sharing_changed(&mut self, path_id: PathId, element_id: ElementId, shared: bool) {
        let _ = (path_id, element_id, shared);
    }
}

/// Per-root aggregator: every terminal contribution under one sub-tree
/// root, plus whether this round's `complete_update` has already fired.
#[derive(Debug, Default)]
pub struct SubTree {
    contributions: HashMap<ElementId, u64>,
    dirty: std::collections::HashSet<ElementId>,
    completed_this_round: bool,
}

impl SubTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_simple_element(&mut self, element_id: ElementId, compression: u64) {
        self.contributions.insert(element_id, compression);
        self.dirty.insert(element_id);
    }

    pub fn remove_simple_element(&mut self, element_id: ElementId) {
        self.contributions.remove(&element_id);
        self.dirty.insert(element_id);
    }

    /// Combines every live contribution into one aggregate value — a
    /// simple XOR-fold, collision-prone (two different multisets can
    /// fold to the same value) but cheap; callers that need certainty
    /// ask for a full compression instead.
    #[must_use]
    pub fn quick_compression(&self) -> u64 {
        self.contributions.values().fold(0u64, |acc, v| acc ^ v)
    }

    /// Marks this round complete, returning the (possibly empty) set of
    /// elements touched since the last call.
    pub fn complete_update(&mut self) -> Vec<ElementId> {
        self.completed_this_round = true;
        self.dirty.drain().collect()
    }

    #[must_use]
    pub fn has_completed_this_round(&self) -> bool {
        self.completed_this_round
    }

    pub fn reset_round(&mut self) {
        self.completed_this_round = false;
    }
}

/// Reference-counts simple-compression values so aggregators can share
/// identical sub-structures without recomputing a full compression.
///
/// # Panics
/// [`Self::release`] panics on a value that was not (or no longer)
/// held — double release is forbidden, matching the allocator's
/// discipline in `flowgraph-foundation`.
#[derive(Debug, Default)]
pub struct CompressionRegistry {
    refs: RefCell<HashMap<u64, usize>>,
}

impl CompressionRegistry {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn acquire(&self, value: u64) {
        *self.refs.borrow_mut().entry(value).or_insert(0) += 1;
    }

    pub fn release(&self, value: u64) {
        let mut refs = self.refs.borrow_mut();
        let count = refs
            .get_mut(&value)
            .expect("release of a compression value with no live entry");
        *count = count
            .checked_sub(1)
            .expect("compression value released more times than it was acquired");
        if *count == 0 {
            refs.remove(&value);
        }
    }

    #[must_use]
    pub fn ref_count(&self, value: u64) -> usize {
        self.refs.borrow().get(&value).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_update_drains_dirty_set_once() {
        let mut tree = SubTree::new();
        tree.update_simple_element(ElementId::new(1), 42);
        let touched = tree.complete_update();
        assert_eq!(touched, vec![ElementId::new(1)]);
        assert!(tree.complete_update().is_empty());
    }

    #[test]
    #[should_panic(expected = "no live entry")]
    fn double_release_of_compression_value_panics() {
        let registry = CompressionRegistry::new();
        registry.release(7);
    }
}
