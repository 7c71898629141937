//! The evaluator contract: a reactive computation node the queue can
//! schedule, preempt, and drive through `update_output`.

use crate::base::BaseEvaluator;
use crate::priority::Priority;
use std::cell::RefCell;
use std::rc::Rc;

/// A reactive computation cell with inputs, an output, and a scheduling
/// class.
///
/// Concrete node kinds (test nodes, user-defined computations) implement
/// this trait and embed a [`BaseEvaluator`] for bookkeeping. The queue
/// never owns these exclusively — it holds `Rc<RefCell<dyn Evaluator>>`
/// handles, so the same node can be referenced by its dependents without
/// the queue and the dependency graph fighting over ownership: nothing
/// owns a node exclusively, and cycles between dependents resolve
/// through `RefCell` borrow scoping rather than a second index.
pub trait Evaluator {
    /// Scheduling bookkeeping for this node.
    fn base(&self) -> &BaseEvaluator;

    /// Immutable after registration.
    fn schedule_priority(&self) -> Priority;

    /// Immutable after registration.
    fn schedule_step(&self) -> usize;

    /// Called by the scheduler when this node's turn comes. May schedule
    /// other nodes (including itself, at a lower step, which rewinds the
    /// draining cursor — see `EvaluationQueue::run_queue`).
    fn update_output(&mut self);
}

/// Shared handle to an evaluator, used by both the queue and the
/// dependency graph.
pub type EvalHandle = Rc<RefCell<dyn Evaluator>>;
