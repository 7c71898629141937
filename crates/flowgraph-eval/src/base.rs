//! Embeddable scheduling bookkeeping.
//!
//! Per the "dynamic polymorphism of evaluation nodes" design note: rather
//! than re-implementing queue bookkeeping in every concrete evaluator, a
//! node composes a [`BaseEvaluator`] field and delegates the bookkeeping
//! methods of [`crate::evaluator::Evaluator`] to it.

use flowgraph_foundation::WatcherId;
use std::cell::Cell;

/// Where a node currently sits in the queue, if anywhere.
///
/// `None` is not-queued, `Some(slot)` records enough to unschedule in
/// O(1) without a linear search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Priority level the node is queued at.
    pub priority: crate::priority::Priority,
    /// Scheduling step (topological layer) within that priority.
    pub step: usize,
    /// Index within the step's [`crate::list::EvaluatorList`].
    pub index: usize,
    /// Whether the node sits in the deferred parallel queue rather than
    /// the active one.
    pub deferred: bool,
}

/// Scheduling bookkeeping shared by every evaluation node.
///
/// Embed this in a concrete node type and delegate to it; see
/// [`crate::evaluator::Evaluator::base`].
#[derive(Debug)]
pub struct BaseEvaluator {
    watcher_id: WatcherId,
    slot: Cell<Option<Slot>>,
    active: Cell<bool>,
}

impl BaseEvaluator {
    /// Creates bookkeeping for a node identified by `watcher_id`.
    ///
    /// Nodes are constructed inactive and not scheduled, per the
    /// evaluation-node lifecycle in the data model.
    #[must_use]
    pub fn new(watcher_id: WatcherId) -> Self {
        Self {
            watcher_id,
            slot: Cell::new(None),
            active: Cell::new(false),
        }
    }

    /// This node's identity.
    #[must_use]
    pub fn watcher_id(&self) -> WatcherId {
        self.watcher_id
    }

    /// `true` once [`BaseEvaluator::activate`] has run and before
    /// [`BaseEvaluator::deactivate`].
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Marks the node active. Called by `Evaluator::activate`.
    pub fn activate(&self) {
        self.active.set(true);
    }

    /// Marks the node inactive. Called by `Evaluator::deactivate`.
    pub fn deactivate(&self) {
        self.active.set(false);
        self.slot.set(None);
    }

    /// `true` if the node currently occupies a slot in either the active
    /// or deferred queue.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.slot.get().is_some()
    }

    /// `true` if the node's current slot is in the deferred queue.
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        self.slot.get().is_some_and(|s| s.deferred)
    }

    #[must_use]
    pub(crate) fn slot(&self) -> Option<Slot> {
        self.slot.get()
    }

    pub(crate) fn set_slot(&self, slot: Option<Slot>) {
        self.slot.set(slot);
    }
}
