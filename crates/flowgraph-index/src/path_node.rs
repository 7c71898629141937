//! One path node: the indexer-side object holding all per-path state.

use crate::key::Key;
use crate::node_entry::{NodeEntry, NodeKey};
use crate::query::QueryCalc;
use crate::range_key::RangeKey;
use crate::subtree::{CompressionRegistry, SubTree, SubTreeMonitor};
use crate::sub_index::SubIndex;
use flowgraph_foundation::{ElementId, MonitorId, PathId, QueryId, ValueId};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Per-round added/removed element scratch lists rarely hold more than a
/// handful of entries; inline storage avoids a heap allocation on the
/// common path.
type ElementScratch = SmallVec<[ElementId; 8]>;

/// A single changed-key record, queued for the epilogue's key-update
/// subscriber flush. Carries old and new state so subscribers can diff.
#[derive(Debug, Clone)]
pub struct KeyUpdate {
    pub element_id: ElementId,
    pub type_name: Option<String>,
    pub key: Option<Key>,
    pub prev_type_name: Option<String>,
    pub prev_key: Option<Key>,
}

/// The indexer-side object for one path ID.
pub struct PathNode {
    path_id: PathId,
    pub(crate) parent: Option<PathId>,
    children: HashMap<String, PathId>,
    tracing_children: HashSet<PathId>,

    need_tracing: u32,
    need_index: u32,
    sub_tree: u32,
    keep_active: u32,
    deactivation_pending: bool,
    trace: bool,
    pub alphabetic_ranges: bool,

    nodes: HashMap<ElementId, NodeEntry>,
    added_nodes: ElementScratch,
    removed_nodes: ElementScratch,
    prev_keys: HashMap<ElementId, Option<NodeKey>>,
    key_update_queue: Vec<KeyUpdate>,

    sub_indexes: HashMap<String, SubIndex>,

    query_calcs: HashMap<QueryId, Rc<RefCell<dyn QueryCalc>>>,
    non_indexed_query_calcs: HashMap<QueryId, Rc<RefCell<dyn QueryCalc>>>,
    key_update_query_calcs: HashMap<QueryId, Rc<RefCell<dyn QueryCalc>>>,
    /// Each registered selection's criteria: the value ID a match
    /// contributes under, paired with the scalar key that counts as a
    /// match for it.
    query_value_ids: HashMap<QueryId, Vec<(ValueId, Key)>>,
    query_match_list: HashMap<QueryId, HashMap<ElementId, i64>>,

    sub_tree_monitors: HashMap<MonitorId, Rc<RefCell<dyn SubTreeMonitor>>>,
    sub_trees: HashMap<ElementId, SubTree>,
    sub_tree_root_update_ids: HashSet<ElementId>,
    removed_sub_trees: HashMap<ElementId, SubTree>,

    compression: Rc<CompressionRegistry>,
}

impl PathNode {
    #[must_use]
    pub fn new(path_id: PathId, parent: Option<PathId>, compression: Rc<CompressionRegistry>) -> Self {
        Self {
            path_id,
            parent,
            children: HashMap::new(),
            tracing_children: HashSet::new(),
            need_tracing: 0,
            need_index: 0,
            sub_tree: 0,
            keep_active: 0,
            deactivation_pending: false,
            trace: false,
            alphabetic_ranges: false,
            nodes: HashMap::new(),
            added_nodes: SmallVec::new(),
            removed_nodes: SmallVec::new(),
            prev_keys: HashMap::new(),
            key_update_queue: Vec::new(),
            sub_indexes: HashMap::new(),
            query_calcs: HashMap::new(),
            non_indexed_query_calcs: HashMap::new(),
            key_update_query_calcs: HashMap::new(),
            query_value_ids: HashMap::new(),
            query_match_list: HashMap::new(),
            sub_tree_monitors: HashMap::new(),
            sub_trees: HashMap::new(),
            sub_tree_root_update_ids: HashSet::new(),
            removed_sub_trees: HashMap::new(),
            compression,
        }
    }

    #[must_use]
    pub fn path_id(&self) -> PathId {
        self.path_id
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.trace || self.sub_tree > 0
    }

    #[must_use]
    pub fn child(&self, attr: &str) -> Option<PathId> {
        self.children.get(attr).copied()
    }

    pub fn set_child(&mut self, attr: String, child: PathId) {
        self.children.insert(attr, child);
    }

    // -- mode counters -----------------------------------------------

    /// `true` if tracing just turned on as a result of this increment.
    pub fn incr_need_tracing(&mut self) -> bool {
        let was_active = self.is_active();
        self.need_tracing += 1;
        if !self.trace {
            self.trace = true;
        }
        !was_active && self.is_active()
    }

    /// Deactivation on `need_tracing` reaching zero is *scheduled*, not
    /// immediate: callers observe [`Self::deactivation_pending`] and run
    /// the actual GC pass later. Returns `true` once `need_tracing` hits
    /// zero (deactivation now eligible, modulo `keep_active`).
    pub fn decr_need_tracing(&mut self) -> bool {
        self.need_tracing = self.need_tracing.saturating_sub(1);
        if self.need_tracing == 0 {
            if self.keep_active > 0 {
                self.deactivation_pending = true;
                false
            } else {
                self.trace = false;
                true
            }
        } else {
            false
        }
    }

    pub fn incr_need_index(&mut self) {
        self.need_index += 1;
    }

    /// Returns `true` once `need_index` reaches zero (sub-index
    /// destruction now eligible).
    pub fn decr_need_index(&mut self) -> bool {
        self.need_index = self.need_index.saturating_sub(1);
        self.need_index == 0
    }

    #[must_use]
    pub fn needs_index(&self) -> bool {
        self.need_index > 0
    }

    pub fn incr_sub_tree(&mut self) {
        self.sub_tree += 1;
    }

    pub fn decr_sub_tree(&mut self) {
        self.sub_tree = self.sub_tree.saturating_sub(1);
    }

    pub fn incr_keep_active(&mut self) {
        self.keep_active += 1;
    }

    /// Releases one `keep_active` hold. If this drops the count to zero
    /// and a deactivation was pending, fires it now and returns `true`.
    pub fn decr_keep_active(&mut self) -> bool {
        self.keep_active = self.keep_active.saturating_sub(1);
        if self.keep_active == 0 && self.deactivation_pending {
            self.deactivation_pending = false;
            self.trace = false;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn is_deactivation_blocked(&self) -> bool {
        self.deactivation_pending && self.keep_active > 0
    }

    // -- sub-indexes ---------------------------------------------------

    fn sub_index_for_type(&mut self, type_name: &str, sample: &Key) -> Option<&mut SubIndex> {
        if matches!(
            type_name,
            "attributeValue" | "functionApplication" | "defun" | "negation" | "range"
        ) {
            return None;
        }
        let entry = self.sub_indexes.entry(type_name.to_string()).or_insert_with(|| {
            if sample.is_always_discrete() || (matches!(sample, Key::Str(_)) && !self.alphabetic_ranges) {
                SubIndex::new_discrete()
            } else {
                SubIndex::new_linear()
            }
        });
        Some(entry)
    }

    /// Upgrades any existing string discrete sub-index to linear, for
    /// every type currently indexed as strings — the effect of turning
    /// `alphabetic_ranges` on.
    pub fn set_alphabetic_ranges(&mut self, on: bool) {
        self.alphabetic_ranges = on;
        if on {
            for index in self.sub_indexes.values_mut() {
                index.upgrade_to_linear();
            }
        }
    }

    /// Elements currently reachable under `type_name`'s sub-index for
    /// `key` — a range node appears here exactly while it is active and
    /// `key` falls in its hull; otherwise its live operands do. Exposed
    /// for callers (and tests) that need to observe actual sub-index
    /// membership rather than just an activation flag.
    #[must_use]
    pub fn sub_index_matches_scalar(&self, type_name: &str, key: &Key) -> Vec<ElementId> {
        self.sub_indexes
            .get(type_name)
            .map(|index| index.matches_scalar(key))
            .unwrap_or_default()
    }

    // -- node entries ----------------------------------------------------

    #[must_use]
    pub fn nodes(&self) -> &HashMap<ElementId, NodeEntry> {
        &self.nodes
    }

    pub fn ensure_node(&mut self, element_id: ElementId) -> bool {
        if self.nodes.contains_key(&element_id) {
            false
        } else {
            self.nodes.insert(element_id, NodeEntry::new(element_id));
            self.added_nodes.push(element_id);
            true
        }
    }

    /// Sets a plain scalar key on `element_id`, updating the sub-index
    /// and queuing a key-update record, acquiring this key's compressed
    /// representation and releasing the previous one, and flushing any
    /// selection match-count deltas the transition produces. Returns the
    /// previous key, if any.
    pub fn set_scalar_key(
        &mut self,
        element_id: ElementId,
        type_name: String,
        key: Key,
    ) -> Option<NodeKey> {
        self.ensure_node(element_id);
        let (prev_type, prev_key, prev_compressed) = {
            let entry = self.nodes.get_mut(&element_id).expect("just ensured");
            (entry.type_name.clone(), entry.key.take(), entry.simple_compressed_value.take())
        };
        if let Some(NodeKey::Scalar(old)) = &prev_key {
            if let Some(old_type) = &prev_type {
                if let Some(index) = self.sub_indexes.get_mut(old_type) {
                    index.remove(old, element_id);
                }
            }
        }
        if let Some(index) = self.sub_index_for_type(&type_name, &key) {
            index.insert(&key, element_id);
        }

        let compressed = NodeEntry::compute_simple_compression(&type_name, &key);
        self.compression.acquire(compressed);
        if let Some(prev) = prev_compressed {
            self.compression.release(prev);
        }

        let entry = self.nodes.get_mut(&element_id).expect("just ensured");
        entry.type_name = Some(type_name.clone());
        entry.key = Some(NodeKey::Scalar(key.clone()));
        entry.simple_compressed_value = Some(compressed);

        self.key_update_queue.push(KeyUpdate {
            element_id,
            type_name: Some(type_name),
            key: Some(key.clone()),
            prev_type_name: prev_type,
            prev_key: match &prev_key {
                Some(NodeKey::Scalar(k)) => Some(k.clone()),
                _ => None,
            },
        });

        let prev_scalar_key = match &prev_key {
            Some(NodeKey::Scalar(k)) => Some(k.clone()),
            _ => None,
        };
        self.recompute_selection_deltas(element_id, prev_scalar_key.as_ref(), Some(&key));

        prev_key
    }

    /// Toggles `hasAttrs` on `element_id` — the `"attribute"` special
    /// type. Turning it on extends sub-tree coverage to this node's
    /// attribute children; turning it off detaches it.
    pub fn set_has_attrs(&mut self, element_id: ElementId, on: bool) {
        self.ensure_node(element_id);
        let entry = self.nodes.get_mut(&element_id).expect("just ensured");
        entry.has_attrs = on;
    }

    /// Adds or removes a `nonAttrs` entry — the `"nonAttribute"` special
    /// type. A negative `child` (by convention, the caller passes the
    /// element to remove as `Some` with `add: false`) removes it; `None`
    /// clears every entry.
    pub fn set_non_attribute(&mut self, element_id: ElementId, child: Option<String>, add: bool) {
        self.ensure_node(element_id);
        let entry = self.nodes.get_mut(&element_id).expect("just ensured");
        match child {
            Some(name) if add => {
                entry.non_attrs.insert(name);
            }
            Some(name) => {
                entry.non_attrs.remove(&name);
            }
            None => entry.non_attrs.clear(),
        }
    }

    /// Turns `range_element` into a range node (if it isn't one yet) and
    /// folds in one operand child's key. Flips sub-index visibility
    /// between the range's own hull entry (active: single type) and the
    /// operand's individual entry (inactive: mixed types or empty), and
    /// recomputes any registered selection's match-count delta against
    /// the hull transition. Returns the range's resulting active state.
    pub fn insert_range_operand(
        &mut self,
        range_element: ElementId,
        type_name: String,
        operand_element: ElementId,
        operand_key: Key,
    ) -> bool {
        self.ensure_node(range_element);
        let entry = self.nodes.get_mut(&range_element).expect("just ensured");
        entry.type_name.get_or_insert_with(|| type_name.clone());
        let range = match &mut entry.key {
            Some(NodeKey::Range(r)) => r,
            _ => {
                entry.key = Some(NodeKey::Range(RangeKey::new()));
                let Some(NodeKey::Range(r)) = &mut entry.key else {
                    unreachable!()
                };
                r
            }
        };
        let prev = RangeSnapshot::capture(range);
        range.insert(operand_element, operand_key.clone(), false);
        let next = RangeSnapshot::capture(range);
        let is_active = next.active;

        self.ensure_node(operand_element);
        if let Some(op_entry) = self.nodes.get_mut(&operand_element) {
            op_entry.range_node_id = Some(range_element);
            op_entry.type_name = Some(type_name.clone());
            op_entry.key = Some(NodeKey::Scalar(operand_key));
        }

        self.resync_range_visibility(range_element, &type_name, &prev, &next);
        self.recompute_range_query_deltas(range_element, &prev, &next);
        is_active
    }

    /// Removes one operand from `range_element`'s range, rebuilding the
    /// hull from the live operand set and flipping sub-index visibility
    /// if the activation state or hull bounds changed. Returns the
    /// range's resulting active state, or `false` if `range_element`
    /// isn't a known range node.
    pub fn remove_range_operand(&mut self, range_element: ElementId, operand_element: ElementId) -> bool {
        let Some((prev, next, type_name)) = (|| {
            let entry = self.nodes.get_mut(&range_element)?;
            let NodeKey::Range(range) = entry.key.as_mut()? else {
                return None;
            };
            let prev = RangeSnapshot::capture(range);
            range.remove(operand_element);
            let next = RangeSnapshot::capture(range);
            Some((prev, next, entry.type_name.clone().unwrap_or_default()))
        })() else {
            return false;
        };

        self.remove_node(operand_element);
        self.resync_range_visibility(range_element, &type_name, &prev, &next);
        self.recompute_range_query_deltas(range_element, &prev, &next);
        next.active
    }

    /// Clears and rebuilds this range's contribution to `self.sub_indexes`:
    /// the hull (under its min/max keys) while active, every individual
    /// operand while inactive.
    fn resync_range_visibility(&mut self, range_element: ElementId, type_name: &str, prev: &RangeSnapshot, next: &RangeSnapshot) {
        if prev.active {
            if let Some(index) = self.sub_indexes.get_mut(type_name) {
                if let Some(min) = &prev.min {
                    index.remove(min, range_element);
                }
                if let Some(max) = &prev.max {
                    if Some(max) != prev.min.as_ref() {
                        index.remove(max, range_element);
                    }
                }
            }
        } else if let Some(index) = self.sub_indexes.get_mut(type_name) {
            for (op_id, (key, _)) in &prev.operands {
                index.remove(key, *op_id);
            }
        }

        if next.active {
            if let Some(min) = next.min.clone() {
                if let Some(index) = self.sub_index_for_type(type_name, &min) {
                    index.insert(&min, range_element);
                }
            }
            if let Some(max) = &next.max {
                if Some(max) != next.min.as_ref() {
                    if let Some(index) = self.sub_index_for_type(type_name, max) {
                        index.insert(max, range_element);
                    }
                }
            }
        } else {
            for (op_id, (key, _)) in &next.operands {
                if let Some(index) = self.sub_index_for_type(type_name, key) {
                    index.insert(key, *op_id);
                }
            }
        }
    }

    /// Recomputes match-count deltas for every selection registered at
    /// this path whose criterion key fell inside the range's hull before
    /// this change, after, or both — the range-operator counterpart of
    /// [`Self::recompute_selection_deltas`].
    fn recompute_range_query_deltas(&mut self, range_element: ElementId, prev: &RangeSnapshot, next: &RangeSnapshot) {
        let mut deltas: Vec<(QueryId, i64)> = Vec::new();
        for (query_id, calc) in &self.query_calcs {
            let Some(values) = self.query_value_ids.get(query_id) else {
                continue;
            };
            let relevant: HashSet<ValueId> = calc.borrow().disjoint_value_ids().into_iter().collect();
            let mut delta = 0i64;
            for (value_id, crit_key) in values {
                if !relevant.contains(value_id) {
                    continue;
                }
                let was_match = prev.active
                    && key_in_hull(crit_key, prev.min.as_ref(), prev.min_open, prev.max.as_ref(), prev.max_open);
                let is_match = next.active
                    && key_in_hull(crit_key, next.min.as_ref(), next.min_open, next.max.as_ref(), next.max_open);
                match (was_match, is_match) {
                    (true, false) => delta -= 1,
                    (false, true) => delta += 1,
                    _ => {}
                }
            }
            if delta != 0 {
                deltas.push((*query_id, delta));
            }
        }
        for (query_id, delta) in deltas {
            self.add_match_delta(query_id, range_element, delta);
        }
    }

    #[must_use]
    pub fn entry(&self, element_id: ElementId) -> Option<&NodeEntry> {
        self.nodes.get(&element_id)
    }

    /// Removes a node entry immediately (per the partial-removal
    /// protocol), releasing its held compression value, deferring its
    /// key-state side effects to the epilogue by recording it in
    /// `removed_nodes`; its previous key is snapshotted into `prev_keys`
    /// so a query asking "what changed" still sees it.
    pub fn remove_node(&mut self, element_id: ElementId) {
        if let Some(entry) = self.nodes.remove(&element_id) {
            if let Some(compressed) = entry.simple_compressed_value {
                self.compression.release(compressed);
            }
            self.prev_keys.insert(element_id, entry.key);
            self.removed_nodes.push(element_id);
        }
    }

    // -- queries -----------------------------------------------------

    /// Registers a selection query's criteria: each `(ValueId, Key)`
    /// pair names a value this selection is disjoint across and the
    /// scalar key that counts as a match for it.
    pub fn register_selection(
        &mut self,
        id: QueryId,
        calc: Rc<RefCell<dyn QueryCalc>>,
        value_ids: Vec<(ValueId, Key)>,
    ) {
        self.query_calcs.insert(id, calc);
        self.query_value_ids.insert(id, value_ids);
    }

    /// Recomputes match-count deltas for every selection registered at
    /// this path whose `disjoint_value_ids()` intersect the criteria this
    /// key transition could have flipped, comparing each criterion's key
    /// against `prev_key`/`new_key` for an exact-match transition.
    fn recompute_selection_deltas(&mut self, element_id: ElementId, prev_key: Option<&Key>, new_key: Option<&Key>) {
        let mut deltas: Vec<(QueryId, i64)> = Vec::new();
        for (query_id, calc) in &self.query_calcs {
            let Some(values) = self.query_value_ids.get(query_id) else {
                continue;
            };
            let relevant: HashSet<ValueId> = calc.borrow().disjoint_value_ids().into_iter().collect();
            let mut delta = 0i64;
            for (value_id, crit_key) in values {
                if !relevant.contains(value_id) {
                    continue;
                }
                let was_match = prev_key.is_some_and(|k| k == crit_key);
                let is_match = new_key.is_some_and(|k| k == crit_key);
                match (was_match, is_match) {
                    (true, false) => delta -= 1,
                    (false, true) => delta += 1,
                    _ => {}
                }
            }
            if delta != 0 {
                deltas.push((*query_id, delta));
            }
        }
        for (query_id, delta) in deltas {
            self.add_match_delta(query_id, element_id, delta);
        }
    }

    pub fn register_non_indexed(&mut self, id: QueryId, calc: Rc<RefCell<dyn QueryCalc>>) {
        self.non_indexed_query_calcs.insert(id, calc);
    }

    pub fn register_key_update_subscriber(&mut self, id: QueryId, calc: Rc<RefCell<dyn QueryCalc>>) {
        self.key_update_query_calcs.insert(id, calc);
    }

    /// Accumulates a match-count delta for one (query, element) pair.
    pub fn add_match_delta(&mut self, query: QueryId, element_id: ElementId, delta: i64) {
        *self
            .query_match_list
            .entry(query)
            .or_default()
            .entry(element_id)
            .or_insert(0) += delta;
    }

    pub fn queue_added_node(&mut self, element_id: ElementId) {
        self.added_nodes.push(element_id);
    }

    // -- sub-tree monitors ---------------------------------------------

    pub fn add_sub_tree_monitor(&mut self, id: MonitorId, monitor: Rc<RefCell<dyn SubTreeMonitor>>) {
        self.sub_tree_monitors.insert(id, monitor);
        self.incr_sub_tree();
    }

    /// Registers `root` as needing a sub-tree retrieval, creating its
    /// aggregator if this is the first request, and marking it for
    /// `complete_update` in the next epilogue pass.
    pub fn request_sub_tree(&mut self, root: ElementId) {
        self.sub_trees.entry(root).or_insert_with(SubTree::new);
        self.sub_tree_root_update_ids.insert(root);
        if let Some(entry) = self.nodes.get_mut(&root) {
            entry.num_sub_tree_requests += 1;
        }
    }

    pub fn sub_tree_mut(&mut self, root: ElementId) -> Option<&mut SubTree> {
        self.sub_trees.get_mut(&root)
    }

    #[must_use]
    pub fn sub_tree_monitors(&self) -> &HashMap<MonitorId, Rc<RefCell<dyn SubTreeMonitor>>> {
        &self.sub_tree_monitors
    }

    /// Records `root_path -> root` as one of `element_id`'s covering
    /// sub-tree roots. Returns the entry's new covering-root count.
    pub fn cover_with_sub_tree_root(&mut self, element_id: ElementId, root_path: PathId, root: ElementId) -> usize {
        self.ensure_node(element_id);
        let entry = self.nodes.get_mut(&element_id).expect("just ensured");
        entry.sub_tree_roots.insert(root_path, root);
        entry.sub_tree_roots.len()
    }

    /// Drops `root_path` from `element_id`'s covering sub-tree roots, if
    /// present. Returns the entry's new covering-root count.
    pub fn uncover_sub_tree_root(&mut self, element_id: ElementId, root_path: PathId) -> usize {
        match self.nodes.get_mut(&element_id) {
            Some(entry) => {
                entry.sub_tree_roots.remove(&root_path);
                entry.sub_tree_roots.len()
            }
            None => 0,
        }
    }

    // -- epilogue --------------------------------------------------------

    /// Runs the per-round epilogue in the documented order:
    /// (1) push additions to non-indexed queries,
    /// (2) flush match-count deltas to selections,
    /// (3) push removals to non-indexed queries,
    /// (4) destroy suspended sub-trees whose revival window has closed,
    /// (5) flush the key-update queue,
    /// (6) run the sub-tree epilogue (registration completion, then
    ///     update callbacks),
    /// (7) clear `prev_keys`.
    ///
    /// Returns the number of distinct callbacks invoked, for a caller
    /// that wants to log flush volume.
    pub fn run_epilogue(&mut self) -> usize {
        let mut fired = 0usize;

        if !self.added_nodes.is_empty() {
            let added = std::mem::take(&mut self.added_nodes);
            for calc in self.non_indexed_query_calcs.values() {
                calc.borrow_mut().add_matches(&added);
                fired += 1;
            }
        }

        if !self.query_match_list.is_empty() {
            let deltas = std::mem::take(&mut self.query_match_list);
            for (query_id, delta) in deltas {
                if let Some(calc) = self.query_calcs.get(&query_id) {
                    calc.borrow_mut().update_match_count(&delta);
                    fired += 1;
                }
            }
        }

        if !self.removed_nodes.is_empty() {
            let removed = std::mem::take(&mut self.removed_nodes);
            for calc in self.non_indexed_query_calcs.values() {
                calc.borrow_mut().remove_matches(&removed);
                fired += 1;
            }
        }

        // Suspended sub-trees past their revival window are dropped for
        // good; a re-add within the same cycle never reaches this point
        // because `request_sub_tree` re-inserts the live entry first.
        self.removed_sub_trees.clear();

        if !self.key_update_queue.is_empty() {
            let updates = std::mem::take(&mut self.key_update_queue);
            let element_ids: Vec<_> = updates.iter().map(|u| u.element_id).collect();
            let types: Vec<_> = updates.iter().map(|u| u.type_name.clone()).collect();
            let keys: Vec<_> = updates.iter().map(|u| u.key.clone()).collect();
            let prev_types: Vec<_> = updates.iter().map(|u| u.prev_type_name.clone()).collect();
            let prev_keys: Vec<_> = updates.iter().map(|u| u.prev_key.clone()).collect();
            for calc in self.key_update_query_calcs.values() {
                calc.borrow_mut()
                    .update_keys(&element_ids, &types, &keys, &prev_types, &prev_keys);
                fired += 1;
            }
        }

        for root in std::mem::take(&mut self.sub_tree_root_update_ids) {
            if let Some(tree) = self.sub_trees.get_mut(&root) {
                let touched = tree.complete_update();
                for monitor in self.sub_tree_monitors.values() {
                    monitor.borrow_mut().complete_update(root);
                    if !touched.is_empty() {
                        let id = monitor.borrow().id();
                        monitor.borrow_mut().subtree_update(self.path_id, &touched, id);
                    }
                    fired += 1;
                }
            }
        }

        self.prev_keys.clear();
        fired
    }
}

/// A point-in-time snapshot of a range's activation state, used to diff
/// sub-index visibility and selection match counts around an operand
/// insert or remove.
struct RangeSnapshot {
    active: bool,
    min: Option<Key>,
    max: Option<Key>,
    min_open: bool,
    max_open: bool,
    operands: HashMap<ElementId, (Key, bool)>,
}

impl RangeSnapshot {
    fn capture(range: &RangeKey) -> Self {
        Self {
            active: range.is_active(),
            min: range.min().cloned(),
            max: range.max().cloned(),
            min_open: range.min_open(),
            max_open: range.max_open(),
            operands: range.operands().clone(),
        }
    }
}

/// `true` if `key` falls within `[min, max]` (respecting open bounds).
/// `None` bounds are treated as unconstrained on that side.
fn key_in_hull(key: &Key, min: Option<&Key>, min_open: bool, max: Option<&Key>, max_open: bool) -> bool {
    let above_min = match min {
        Some(m) if min_open => key > m,
        Some(m) => key >= m,
        None => true,
    };
    let below_max = match max {
        Some(m) if max_open => key < m,
        Some(m) => key <= m,
        None => true,
    };
    above_min && below_max
}
