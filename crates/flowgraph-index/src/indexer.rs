//! The indexer: owns the path-node tree, the data-element table, and the
//! path ID allocator, and drives the per-round epilogue.

use crate::data_element::DataElementTable;
use crate::error::{IndexError, Result};
use crate::key::Key;
use crate::path_node::PathNode;
use crate::query::QueryCalc;
use crate::subtree::{CompressionRegistry, SubTreeMonitor};
use flowgraph_foundation::{ElementId, MonitorId, PathId, PathIdAllocator, PathTuple, QueryId, ValueId};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use tracing::{debug, trace};

/// Owns every path node, the data-element ancestry table, and the path ID
/// allocator for one reactive graph.
pub struct Indexer {
    allocator: PathIdAllocator,
    nodes: HashMap<PathId, PathNode>,
    elements: DataElementTable,
    alphabetic_ranges: bool,
    compression: Rc<CompressionRegistry>,
}

impl Indexer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            allocator: PathIdAllocator::new(),
            nodes: HashMap::new(),
            elements: DataElementTable::new(),
            alphabetic_ranges: false,
            compression: CompressionRegistry::new(),
        }
    }

    /// The shared registry every path node acquires/releases simple
    /// compression values through.
    #[must_use]
    pub fn compression_registry(&self) -> &Rc<CompressionRegistry> {
        &self.compression
    }

    /// Globally upgrades (or downgrades) string sub-indexes to linear
    /// across every path node, present and future.
    pub fn set_alphabetic_ranges(&mut self, on: bool) {
        self.alphabetic_ranges = on;
        for node in self.nodes.values_mut() {
            node.set_alphabetic_ranges(on);
        }
    }

    fn path_node(&self, path_id: PathId) -> Result<&PathNode> {
        self.nodes.get(&path_id).ok_or(IndexError::UnknownPath(path_id))
    }

    fn path_node_mut(&mut self, path_id: PathId) -> Result<&mut PathNode> {
        self.nodes.get_mut(&path_id).ok_or(IndexError::UnknownPath(path_id))
    }

    /// Ensures every prefix node of `tuple` exists, acquiring a
    /// reference-counted [`PathId`] for each, and returns the leaf's ID.
    pub fn add_path(&mut self, tuple: PathTuple) -> PathId {
        let mut parent: Option<PathId> = None;
        let mut prefix = PathTuple::new();
        let mut leaf = None;
        for attr in tuple {
            prefix.push(attr.clone());
            let path_id = self.allocator.acquire(prefix.clone());
            if !self.nodes.contains_key(&path_id) {
                let mut node = PathNode::new(path_id, parent, self.compression.clone());
                node.alphabetic_ranges = self.alphabetic_ranges;
                self.nodes.insert(path_id, node);
                trace!(?path_id, attr = %attr, "path node created");
            }
            if let Some(parent_id) = parent {
                if let Some(parent_node) = self.nodes.get_mut(&parent_id) {
                    parent_node.set_child(attr, path_id);
                }
            }
            parent = Some(path_id);
            leaf = Some(path_id);
        }
        leaf.expect("add_path requires a non-empty tuple")
    }

    /// Registers a new data element at `path_id`, incrementing the
    /// operand count on the parent path node when `parent_element_id`'s
    /// own path equals `path_id` (the "operator at same path" invariant).
    pub fn add_data_element_node(
        &mut self,
        id: ElementId,
        path_id: PathId,
        parent_element_id: Option<ElementId>,
    ) -> Result<()> {
        self.path_node_mut(path_id)?.ensure_node(id);
        self.elements.add(id, path_id, parent_element_id);
        Ok(())
    }

    /// Increments reference count on an already-registered data element.
    pub fn acquire_data_element(&mut self, id: ElementId) {
        self.elements.acquire(id);
    }

    /// Releases a reference on a data element, removing it once the
    /// count reaches zero.
    pub fn release_data_element(&mut self, id: ElementId) {
        self.elements.release(id);
    }

    pub fn data_element_table(&self) -> &DataElementTable {
        &self.elements
    }

    // -- mode counters ----------------------------------------------------

    /// Increments `needTracing` on `path_id` and, recursively, on every
    /// ancestor.
    pub fn incr_need_tracing(&mut self, path_id: PathId) -> Result<()> {
        let parent = self.path_node(path_id)?.parent;
        let became_active = self.path_node_mut(path_id)?.incr_need_tracing();
        if became_active {
            debug!(?path_id, "path activated");
        }
        if let Some(parent_id) = parent {
            self.incr_need_tracing(parent_id)?;
        }
        Ok(())
    }

    /// Decrements `needTracing`. Propagation to ancestors mirrors the
    /// increment only at the call site (the original caller walked the
    /// whole chain on the way in); here each level is released
    /// independently by its own owning caller, matching the "every
    /// increment is balanced by exactly one decrement at the same level"
    /// discipline used by reference-counted resources elsewhere in this
    /// crate.
    pub fn decr_need_tracing(&mut self, path_id: PathId) -> Result<bool> {
        Ok(self.path_node_mut(path_id)?.decr_need_tracing())
    }

    pub fn incr_need_index(&mut self, path_id: PathId) -> Result<()> {
        self.path_node_mut(path_id)?.incr_need_index();
        Ok(())
    }

    pub fn decr_need_index(&mut self, path_id: PathId) -> Result<bool> {
        Ok(self.path_node_mut(path_id)?.decr_need_index())
    }

    pub fn incr_sub_tree(&mut self, path_id: PathId) -> Result<()> {
        self.path_node_mut(path_id)?.incr_sub_tree();
        Ok(())
    }

    pub fn decr_sub_tree(&mut self, path_id: PathId) -> Result<()> {
        self.path_node_mut(path_id)?.decr_sub_tree();
        Ok(())
    }

    pub fn incr_keep_active(&mut self, path_id: PathId) -> Result<()> {
        self.path_node_mut(path_id)?.incr_keep_active();
        Ok(())
    }

    pub fn decr_keep_active(&mut self, path_id: PathId) -> Result<bool> {
        Ok(self.path_node_mut(path_id)?.decr_keep_active())
    }

    // -- keys --------------------------------------------------------------

    /// Implements `setKeyValue`. `type_name` of `"attribute"` or
    /// `"nonAttribute"` dispatch to the special-purpose toggles instead of
    /// indexing a scalar key, and re-sync sub-tree coverage to this
    /// node's children if the toggle crossed the has-children-to-cover
    /// gate; anything else is indexed normally as a scalar.
    pub fn set_key_value(&mut self, path_id: PathId, element_id: ElementId, type_name: &str, key: Key) -> Result<()> {
        match type_name {
            "attribute" => {
                let was_gate_open = self.covers_children(path_id, element_id)?;
                self.path_node_mut(path_id)?
                    .set_has_attrs(element_id, matches!(key, Key::Bool(true)));
                self.resync_coverage_gate(path_id, element_id, was_gate_open);
            }
            "nonAttribute" => {
                let was_gate_open = self.covers_children(path_id, element_id)?;
                if let Key::Str(name) = key {
                    self.path_node_mut(path_id)?.set_non_attribute(element_id, Some(name), true);
                } else {
                    self.path_node_mut(path_id)?.set_non_attribute(element_id, None, false);
                }
                self.resync_coverage_gate(path_id, element_id, was_gate_open);
            }
            other => {
                self.path_node_mut(path_id)?.set_scalar_key(element_id, other.to_string(), key);
            }
        }
        Ok(())
    }

    /// Removes `nonAttribute` entry previously added, by name.
    pub fn clear_non_attribute(&mut self, path_id: PathId, element_id: ElementId, name: String) -> Result<()> {
        let was_gate_open = self.covers_children(path_id, element_id)?;
        self.path_node_mut(path_id)?.set_non_attribute(element_id, Some(name), false);
        self.resync_coverage_gate(path_id, element_id, was_gate_open);
        Ok(())
    }

    /// Folds a range operand's key into the dominating range node at
    /// `range_element`, returning whether the range became active.
    pub fn insert_range_operand(
        &mut self,
        path_id: PathId,
        range_element: ElementId,
        type_name: String,
        operand_element: ElementId,
        operand_key: Key,
    ) -> Result<bool> {
        Ok(self
            .path_node_mut(path_id)?
            .insert_range_operand(range_element, type_name, operand_element, operand_key))
    }

    /// Removes one operand from a range node, returning the range's
    /// resulting active state.
    pub fn remove_range_operand(&mut self, path_id: PathId, range_element: ElementId, operand_element: ElementId) -> Result<bool> {
        Ok(self.path_node_mut(path_id)?.remove_range_operand(range_element, operand_element))
    }

    /// Elements currently reachable under `type_name`'s sub-index for
    /// `key` at `path_id`. See
    /// [`PathNode::sub_index_matches_scalar`].
    #[must_use]
    pub fn sub_index_matches_scalar(&self, path_id: PathId, type_name: &str, key: &Key) -> Vec<ElementId> {
        self.nodes
            .get(&path_id)
            .map(|node| node.sub_index_matches_scalar(type_name, key))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_node_active(&self, path_id: PathId, element_id: ElementId, dominating_range_active: bool) -> bool {
        self.nodes
            .get(&path_id)
            .and_then(|node| node.entry(element_id))
            .is_some_and(|entry| entry.is_active(dominating_range_active))
    }

    pub fn remove_node(&mut self, path_id: PathId, element_id: ElementId) -> Result<()> {
        self.path_node_mut(path_id)?.remove_node(element_id);
        Ok(())
    }

    // -- queries -------------------------------------------------------

    /// Registers a selection query's criteria: each `(ValueId, Key)` pair
    /// names a value the query is disjoint across (see
    /// [`QueryCalc::disjoint_value_ids`]) and the scalar key that counts
    /// as a match for it.
    pub fn register_selection(
        &mut self,
        path_id: PathId,
        query_id: QueryId,
        calc: Rc<RefCell<dyn QueryCalc>>,
        value_ids: Vec<(ValueId, Key)>,
    ) -> Result<()> {
        self.path_node_mut(path_id)?.register_selection(query_id, calc, value_ids);
        Ok(())
    }

    pub fn register_non_indexed(&mut self, path_id: PathId, query_id: QueryId, calc: Rc<RefCell<dyn QueryCalc>>) -> Result<()> {
        self.path_node_mut(path_id)?.register_non_indexed(query_id, calc);
        Ok(())
    }

    pub fn register_key_update_subscriber(
        &mut self,
        path_id: PathId,
        query_id: QueryId,
        calc: Rc<RefCell<dyn QueryCalc>>,
    ) -> Result<()> {
        self.path_node_mut(path_id)?.register_key_update_subscriber(query_id, calc);
        Ok(())
    }

    pub fn add_match_delta(&mut self, path_id: PathId, query_id: QueryId, element_id: ElementId, delta: i64) -> Result<()> {
        self.path_node_mut(path_id)?.add_match_delta(query_id, element_id, delta);
        Ok(())
    }

    // -- sub-tree monitors -----------------------------------------------

    pub fn add_sub_tree_monitor(&mut self, path_id: PathId, monitor_id: MonitorId, monitor: Rc<RefCell<dyn SubTreeMonitor>>) -> Result<()> {
        self.path_node_mut(path_id)?.add_sub_tree_monitor(monitor_id, monitor);
        Ok(())
    }

    /// Registers `root` as a sub-tree root and extends its coverage down
    /// through every descendant reachable via an attribute or
    /// non-attribute edge.
    pub fn request_sub_tree(&mut self, path_id: PathId, root: ElementId) -> Result<()> {
        self.path_node_mut(path_id)?.request_sub_tree(root);
        self.extend_sub_tree_coverage(path_id, root, root);
        Ok(())
    }

    /// `true` if `element_id`'s own `hasAttrs`/`nonAttrs` state means its
    /// children (if it gains a covering root) should also be covered.
    fn covers_children(&self, path_id: PathId, element_id: ElementId) -> Result<bool> {
        Ok(self
            .path_node(path_id)?
            .entry(element_id)
            .is_some_and(|e| e.has_attrs || !e.non_attrs.is_empty()))
    }

    /// Re-extends or retracts sub-tree coverage to `element_id`'s
    /// children when a `hasAttrs`/`nonAttrs` toggle actually crossed the
    /// covers-children gate (compared to `was_gate_open`).
    fn resync_coverage_gate(&mut self, path_id: PathId, element_id: ElementId, was_gate_open: bool) {
        let Ok(now_gate_open) = self.covers_children(path_id, element_id) else {
            return;
        };
        if was_gate_open == now_gate_open {
            return;
        }
        if now_gate_open {
            self.extend_coverage_from_existing_roots(path_id, element_id);
        } else {
            self.retract_coverage_from_existing_roots(path_id, element_id);
        }
    }

    fn extend_coverage_from_existing_roots(&mut self, path_id: PathId, element_id: ElementId) {
        let roots: Vec<(PathId, ElementId)> = self
            .nodes
            .get(&path_id)
            .and_then(|n| n.entry(element_id))
            .map(|e| e.sub_tree_roots.iter().map(|(p, r)| (*p, *r)).collect())
            .unwrap_or_default();
        for (root_path, root) in roots {
            self.extend_sub_tree_coverage(root_path, root, element_id);
        }
    }

    fn retract_coverage_from_existing_roots(&mut self, path_id: PathId, element_id: ElementId) {
        let roots: Vec<PathId> = self
            .nodes
            .get(&path_id)
            .and_then(|n| n.entry(element_id))
            .map(|e| e.sub_tree_roots.keys().copied().collect())
            .unwrap_or_default();
        for root_path in roots {
            self.retract_sub_tree_coverage(root_path, element_id);
        }
    }

    /// Walks the data-element tree from `from`, covering every
    /// descendant reachable via an attribute/non-attribute edge with
    /// `(root_path, root)`, and firing
    /// [`SubTreeMonitor::sub_tree_sharing_changed`] on any element whose
    /// covering-root count crosses the shared/unshared boundary. `from`
    /// always expands its immediate children; deeper descendants are
    /// only reached while each intermediate node's own coverage gate
    /// (`hasAttrs`/`nonAttrs`) is open.
    fn extend_sub_tree_coverage(&mut self, root_path: PathId, root: ElementId, from: ElementId) {
        if from == root {
            self.nodes
                .get_mut(&root_path)
                .map(|n| n.cover_with_sub_tree_root(root, root_path, root));
        }
        let mut queue = VecDeque::from([from]);
        let mut visited: HashSet<ElementId> = HashSet::from([from]);
        while let Some(current) = queue.pop_front() {
            let Some(data) = self.elements.get(current) else {
                continue;
            };
            let current_path = data.path_id;
            let descend = current == from || self.covers_children(current_path, current).unwrap_or(false);
            if !descend {
                continue;
            }
            let children: Vec<(PathId, ElementId)> = self
                .elements
                .get(current)
                .map(|d| d.children.iter().flat_map(|(p, s)| s.iter().map(move |e| (*p, *e))).collect())
                .unwrap_or_default();
            for (child_path, child) in children {
                let was_len = self
                    .nodes
                    .get(&child_path)
                    .and_then(|n| n.entry(child))
                    .map(|e| e.sub_tree_roots.len())
                    .unwrap_or(0);
                let new_len = self
                    .nodes
                    .get_mut(&child_path)
                    .map(|n| n.cover_with_sub_tree_root(child, root_path, root))
                    .unwrap_or(0);
                self.notify_sharing_change(child_path, child, was_len, new_len);
                if visited.insert(child) {
                    queue.push_back(child);
                }
            }
        }
    }

    /// Mirror of [`Self::extend_sub_tree_coverage`] that detaches
    /// `root_path` from every descendant reachable from `from`.
    fn retract_sub_tree_coverage(&mut self, root_path: PathId, from: ElementId) {
        let mut queue = VecDeque::from([from]);
        let mut visited: HashSet<ElementId> = HashSet::from([from]);
        while let Some(current) = queue.pop_front() {
            let Some(data) = self.elements.get(current) else {
                continue;
            };
            let current_path = data.path_id;
            let descend = current == from || self.covers_children(current_path, current).unwrap_or(false);
            if !descend {
                continue;
            }
            let children: Vec<(PathId, ElementId)> = self
                .elements
                .get(current)
                .map(|d| d.children.iter().flat_map(|(p, s)| s.iter().map(move |e| (*p, *e))).collect())
                .unwrap_or_default();
            for (child_path, child) in children {
                let was_len = self
                    .nodes
                    .get(&child_path)
                    .and_then(|n| n.entry(child))
                    .map(|e| e.sub_tree_roots.len())
                    .unwrap_or(0);
                let new_len = self
                    .nodes
                    .get_mut(&child_path)
                    .map(|n| n.uncover_sub_tree_root(child, root_path))
                    .unwrap_or(0);
                self.notify_sharing_change(child_path, child, was_len, new_len);
                if visited.insert(child) {
                    queue.push_back(child);
                }
            }
        }
    }

    fn notify_sharing_change(&self, path_id: PathId, element_id: ElementId, was_len: usize, new_len: usize) {
        let was_shared = was_len > 1;
        let is_shared = new_len > 1;
        if was_shared == is_shared {
            return;
        }
        if let Some(node) = self.nodes.get(&path_id) {
            for monitor in node.sub_tree_monitors().values() {
                monitor.borrow_mut().sub_tree_sharing_changed(path_id, element_id, is_shared);
            }
        }
    }

    pub fn update_sub_tree_element(&mut self, path_id: PathId, root: ElementId, element_id: ElementId, compression: u64) -> Result<()> {
        if let Some(tree) = self.path_node_mut(path_id)?.sub_tree_mut(root) {
            tree.update_simple_element(element_id, compression);
        }
        Ok(())
    }

    // -- epilogue ----------------------------------------------------------

    /// Runs the epilogue for every path node touched this round, in
    /// ascending [`PathId`] order for determinism, and returns the total
    /// number of callbacks fired (for callers that want to log flush
    /// volume).
    pub fn run_epilogue(&mut self) -> usize {
        let mut path_ids: Vec<_> = self.nodes.keys().copied().collect();
        path_ids.sort();
        let mut fired = 0;
        for path_id in path_ids {
            if let Some(node) = self.nodes.get_mut(&path_id) {
                let count = node.run_epilogue();
                if count > 0 {
                    debug!(?path_id, callbacks = count, "epilogue flushed");
                }
                fired += count;
            }
        }
        fired
    }
}

impl Default for Indexer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryCalc;
    use std::collections::HashMap as Map;

    struct RecordingCalc {
        id: QueryId,
        path_id: PathId,
        added: Vec<ElementId>,
        removed: Vec<ElementId>,
        deltas: Map<ElementId, i64>,
    }

    impl RecordingCalc {
        fn new(id: QueryId, path_id: PathId) -> Self {
            Self {
                id,
                path_id,
                added: Vec::new(),
                removed: Vec::new(),
                deltas: Map::new(),
            }
        }
    }

    impl QueryCalc for RecordingCalc {
        fn id(&self) -> QueryId {
            self.id
        }
        fn path_id(&self) -> PathId {
            self.path_id
        }
        fn is_selection(&self) -> bool {
            true
        }
        fn add_matches(&mut self, element_ids: &[ElementId]) {
            self.added.extend_from_slice(element_ids);
        }
        fn remove_matches(&mut self, element_ids: &[ElementId]) {
            self.removed.extend_from_slice(element_ids);
        }
        fn remove_all_indexer_matches(&mut self) {
            self.deltas.clear();
        }
        fn update_match_count(&mut self, deltas: &Map<ElementId, i64>) {
            for (k, v) in deltas {
                *self.deltas.entry(*k).or_insert(0) += v;
            }
        }
        fn update_keys(
            &mut self,
            _element_ids: &[ElementId],
            _types: &[Option<String>],
            _keys: &[Option<Key>],
            _prev_types: &[Option<String>],
            _prev_keys: &[Option<Key>],
        ) {
        }
        fn disjoint_value_ids(&self) -> Vec<ValueId> {
            Vec::new()
        }
    }

    #[test]
    fn add_path_creates_every_prefix_once() {
        let mut indexer = Indexer::new();
        let leaf = indexer.add_path(vec!["area".into(), "children".into()]);
        let leaf_again = indexer.add_path(vec!["area".into(), "children".into()]);
        assert_eq!(leaf, leaf_again);
        assert_eq!(indexer.nodes.len(), 2);
    }

    #[test]
    fn match_count_flushes_through_epilogue() {
        let mut indexer = Indexer::new();
        let path = indexer.add_path(vec!["value".into()]);
        let query = QueryId::new(1);
        let calc = Rc::new(RefCell::new(RecordingCalc::new(query, path)));
        indexer
            .register_selection(path, query, calc.clone(), vec![(ValueId::new(1), Key::Int(5))])
            .unwrap();
        indexer.add_match_delta(path, query, ElementId::new(1), 1).unwrap();
        indexer.run_epilogue();
        assert_eq!(calc.borrow().deltas.get(&ElementId::new(1)), Some(&1));
    }

    #[test]
    fn setting_a_matching_scalar_key_wires_a_real_match_delta() {
        let mut indexer = Indexer::new();
        let path = indexer.add_path(vec!["value".into()]);
        let query = QueryId::new(1);
        let calc = Rc::new(RefCell::new(RecordingCalc::new(query, path)));
        indexer
            .register_selection(path, query, calc.clone(), vec![(ValueId::new(1), Key::Int(5))])
            .unwrap();
        let element = ElementId::new(1);
        indexer.add_data_element_node(element, path, None).unwrap();
        indexer.set_key_value(path, element, "int", Key::Int(5)).unwrap();
        indexer.run_epilogue();
        assert_eq!(calc.borrow().deltas.get(&element), Some(&1));
    }

    #[test]
    fn covering_a_child_through_attribute_activation_notifies_sharing() {
        let mut indexer = Indexer::new();
        let root_path = indexer.add_path(vec!["root".into()]);
        let child_path = indexer.add_path(vec!["root".into(), "child".into()]);
        let root = ElementId::new(1);
        let child = ElementId::new(2);
        indexer.add_data_element_node(root, root_path, None).unwrap();
        indexer.add_data_element_node(child, child_path, Some(root)).unwrap();

        indexer
            .set_key_value(root_path, root, "attribute", Key::Bool(true))
            .unwrap();
        indexer.request_sub_tree(root_path, root).unwrap();

        assert!(indexer
            .nodes
            .get(&child_path)
            .and_then(|n| n.entry(child))
            .unwrap()
            .sub_tree_roots
            .contains_key(&root_path));
    }

    #[test]
    fn unknown_path_is_reported_not_panicked() {
        let mut indexer = Indexer::new();
        let bogus = PathId::new(999);
        assert!(matches!(
            indexer.incr_need_tracing(bogus),
            Err(IndexError::UnknownPath(_))
        ));
    }

    #[test]
    fn removing_a_node_defers_its_key_to_the_epilogue() {
        let mut indexer = Indexer::new();
        let path = indexer.add_path(vec!["value".into()]);
        let element = ElementId::new(1);
        indexer.add_data_element_node(element, path, None).unwrap();
        indexer
            .set_key_value(path, element, "int", Key::Int(5))
            .unwrap();
        indexer.remove_node(path, element).unwrap();
        assert!(indexer.path_node(path).unwrap().entry(element).is_none());
    }
}
