//! Per-priority step-ordered queue.
//!
//! One [`SinglePriorityQueue`] exists per priority level. It holds an
//! array of [`EvaluatorList`]s indexed by scheduling step, plus a parallel
//! array of identical shape for deferred evaluators.

use crate::base::Slot;
use crate::evaluator::EvalHandle;
use crate::list::EvaluatorList;
use crate::priority::Priority;

/// The active/deferred step buckets for one priority level.
pub struct SinglePriorityQueue {
    priority: Priority,
    active: Vec<EvaluatorList>,
    deferred: Vec<EvaluatorList>,
    /// Next step to resume draining from. Persists across interrupted
    /// `run_queue` calls and is lowered whenever something schedules at
    /// an earlier step than this (the "rewind" mechanism).
    low: usize,
    active_count: usize,
}

impl SinglePriorityQueue {
    /// Creates an empty queue for `priority`.
    #[must_use]
    pub fn new(priority: Priority) -> Self {
        Self {
            priority,
            active: Vec::new(),
            deferred: Vec::new(),
            low: 0,
            active_count: 0,
        }
    }

    /// This queue's priority level.
    #[must_use]
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// `true` if no active (non-deferred) evaluator is scheduled here.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active_count == 0
    }

    /// The step draining will resume from on the next `run_queue` call.
    #[must_use]
    pub fn low_watermark(&self) -> usize {
        self.low
    }

    fn ensure_step(list: &mut Vec<EvaluatorList>, step: usize) {
        if step >= list.len() {
            list.resize_with(step + 1, EvaluatorList::new);
        }
    }

    /// Schedules `handle` at `step` in the active queue. Rewinds `low` if
    /// `step` precedes it.
    pub fn schedule(&mut self, handle: EvalHandle, step: usize) -> Slot {
        Self::ensure_step(&mut self.active, step);
        let index = self.active[step].push(handle);
        self.active_count += 1;
        if step < self.low {
            self.low = step;
        }
        Slot {
            priority: self.priority,
            step,
            index,
            deferred: false,
        }
    }

    /// Removes the evaluator at `slot` from whichever queue it occupies.
    pub fn unschedule(&mut self, slot: Slot) {
        if slot.deferred {
            if let Some(list) = self.deferred.get_mut(slot.step) {
                list.remove(slot.index);
            }
        } else if let Some(list) = self.active.get_mut(slot.step) {
            if list.len() > 0 {
                list.remove(slot.index);
                self.active_count = self.active_count.saturating_sub(1);
            }
        }
    }

    /// Moves the evaluator at `slot` into the deferred queue, returning
    /// its new slot.
    pub fn defer(&mut self, handle: EvalHandle, slot: Slot) -> Slot {
        if !slot.deferred {
            if let Some(list) = self.active.get_mut(slot.step) {
                list.remove(slot.index);
                self.active_count = self.active_count.saturating_sub(1);
            }
        }
        Self::ensure_step(&mut self.deferred, slot.step);
        let index = self.deferred[slot.step].push(handle);
        Slot {
            priority: self.priority,
            step: slot.step,
            index,
            deferred: true,
        }
    }

    /// Moves the evaluator at `slot` back into the active queue, returning
    /// its new slot.
    pub fn undefer(&mut self, handle: EvalHandle, slot: Slot) -> Slot {
        if slot.deferred {
            if let Some(list) = self.deferred.get_mut(slot.step) {
                list.remove(slot.index);
            }
        }
        let new_slot = self.schedule(handle, slot.step);
        if slot.step < self.low {
            self.low = slot.step;
        }
        new_slot
    }

    /// The result of one [`Self::step_once`] call.
    pub fn step_once(&mut self) -> StepOutcome {
        loop {
            if self.low >= self.active.len() {
                self.low = self.active.len();
                return StepOutcome::Exhausted;
            }
            let step = self.low;
            if let Some((handle, _index)) = self.active[step].pop_one() {
                self.active_count = self.active_count.saturating_sub(1);
                return StepOutcome::Node(handle, step);
            }
            // The list at `step` reports empty: this step is fully
            // drained. Only advance past it if nothing rewound `low` to
            // or below it while we were popping (a predecessor scheduled
            // at an earlier step during a node we just ran).
            if self.low == step {
                self.low = step + 1;
            }
            return StepOutcome::StepBoundary(step);
        }
    }

    /// Drains active steps from `self.low` upward, calling `on_node` for
    /// each evaluator and `on_step_boundary` once a step is fully drained
    /// (even if the step had no entries — this is what lets a caller hang
    /// an epilogue flush off "every step boundary" rather than just
    /// nonempty ones). Stops early when `should_stop` returns `true`,
    /// leaving `low` wherever it got to so a later call resumes cleanly.
    ///
    /// Not reentrancy-safe: `on_node` must not schedule back onto this
    /// same queue. [`crate::queue::EvaluationQueue`] drives its own
    /// per-node loop via [`Self::step_once`] instead, precisely so that
    /// nodes scheduling other nodes mid-run works.
    pub fn drain(
        &mut self,
        mut on_node: impl FnMut(EvalHandle),
        mut on_step_boundary: impl FnMut(usize),
        mut should_stop: impl FnMut() -> bool,
    ) {
        loop {
            if should_stop() {
                return;
            }
            match self.step_once() {
                StepOutcome::Exhausted => return,
                StepOutcome::StepBoundary(step) => on_step_boundary(step),
                StepOutcome::Node(handle, _step) => on_node(handle),
            }
        }
    }
}

/// What happened on one call to [`SinglePriorityQueue::step_once`].
pub enum StepOutcome {
    /// A node was popped and is ready to run.
    Node(EvalHandle, usize),
    /// The step just drained completely (possibly with zero entries).
    StepBoundary(usize),
    /// Nothing left to drain at or above `low`.
    Exhausted,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::BaseEvaluator;
    use flowgraph_foundation::{IdGenerator, WatcherId};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Dummy {
        base: BaseEvaluator,
    }
    impl crate::evaluator::Evaluator for Dummy {
        fn base(&self) -> &BaseEvaluator {
            &self.base
        }
        fn schedule_priority(&self) -> Priority {
            Priority::new(0)
        }
        fn schedule_step(&self) -> usize {
            0
        }
        fn update_output(&mut self) {}
    }

    fn make(ids: &mut IdGenerator<WatcherId>) -> EvalHandle {
        Rc::new(RefCell::new(Dummy {
            base: BaseEvaluator::new(ids.alloc()),
        }))
    }

    #[test]
    fn drains_steps_in_ascending_order() {
        let mut ids = IdGenerator::new();
        let mut q = SinglePriorityQueue::new(Priority::new(0));
        let a = make(&mut ids);
        let a_id = a.borrow().base().watcher_id();
        let b = make(&mut ids);
        let b_id = b.borrow().base().watcher_id();
        q.schedule(a, 5);
        q.schedule(b, 1);

        let mut node_order = Vec::new();
        let mut step_order = Vec::new();
        q.drain(
            |h| node_order.push(h.borrow().base().watcher_id()),
            |step| step_order.push(step),
            || false,
        );
        assert_eq!(node_order, vec![b_id, a_id]);
        assert_eq!(step_order, vec![0, 1, 2, 3, 4, 5]);
        assert!(q.is_empty());
    }

    #[test]
    fn schedule_at_earlier_step_rewinds_low() {
        let mut ids = IdGenerator::new();
        let mut q = SinglePriorityQueue::new(Priority::new(0));
        q.low = 10;
        q.schedule(make(&mut ids), 3);
        assert_eq!(q.low_watermark(), 3);
    }
}
