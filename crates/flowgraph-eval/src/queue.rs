//! The top-level evaluation queue: one [`SinglePriorityQueue`] per
//! priority level, plus cycle/write-commit bookkeeping and suspension.
//!
//! Drains at single-node granularity through an `Rc<RefCell<EvaluationQueue>>`
//! so that a node's `update_output` can reach back in and schedule other
//! nodes (including ones at a higher priority, which must preempt) without
//! fighting a borrow already held by the draining loop. The loop never
//! holds the `RefCell` borrow while a node runs; it pops one unit of work,
//! drops the borrow, runs the node, then re-borrows.

use crate::base::Slot;
use crate::config::Config;
use crate::cycle::CycleState;
use crate::error::{EvalError, Result};
use crate::evaluator::EvalHandle;
use crate::priority::Priority;
use crate::priority_queue::{SinglePriorityQueue, StepOutcome};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use web_time::Instant;

/// Global scheduler: N priority levels, each a step-ordered queue, plus
/// cycle/write-commit state and a suspension flag.
pub struct EvaluationQueue {
    config: Config,
    priorities: Vec<SinglePriorityQueue>,
    cycle: CycleState,
    suspended: Cell<bool>,
    reset_warnings_issued: Cell<u32>,
}

impl EvaluationQueue {
    /// Builds a queue with `config.num_priorities` levels, indices
    /// `0..num_priorities`, higher index runs first.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let priorities = (0..config.num_priorities)
            .map(|level| SinglePriorityQueue::new(Priority::new(level)))
            .collect();
        Self {
            config,
            priorities,
            cycle: CycleState::default(),
            suspended: Cell::new(false),
            reset_warnings_issued: Cell::new(0),
        }
    }

    /// Number of configured priority levels.
    #[must_use]
    pub fn num_priorities(&self) -> u32 {
        self.config.num_priorities
    }

    /// Current cycle number.
    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cycle.cycle()
    }

    /// `true` while [`Self::suspend`] is in effect.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspended.get()
    }

    /// Interrupts all priority queues and makes `run_queue` return
    /// immediately until [`Self::resume`] is called.
    pub fn suspend(&mut self) {
        self.suspended.set(true);
    }

    /// Clears the suspension flag set by [`Self::suspend`].
    pub fn resume(&mut self) {
        self.suspended.set(false);
    }

    fn priority_index(&self, priority: Priority) -> Result<usize> {
        let idx = priority.index();
        if idx >= self.priorities.len() {
            return Err(EvalError::PriorityOutOfRange {
                level: priority.level(),
                num_priorities: self.config.num_priorities,
            });
        }
        Ok(idx)
    }

    /// Schedules `handle` at its own `schedule_priority`/`schedule_step`.
    /// A no-op if the node is already scheduled (matches the "if
    /// `scheduledAtPosition == -1`, push" rule — re-scheduling an already
    /// queued node does not move it).
    pub fn schedule(&mut self, handle: EvalHandle) -> Result<()> {
        let already_scheduled = handle.borrow().base().is_scheduled();
        if already_scheduled {
            return Ok(());
        }
        let (priority, step) = {
            let node = handle.borrow();
            (node.schedule_priority(), node.schedule_step())
        };
        let idx = self.priority_index(priority)?;
        let low_before = self.priorities[idx].low_watermark();
        let slot = self.priorities[idx].schedule(handle.clone(), step);
        handle.borrow().base().set_slot(Some(slot));
        if step < low_before {
            self.note_rewind(priority);
        }
        tracing::trace!(watcher_id = ?handle.borrow().base().watcher_id(), priority = priority.level(), step, "scheduled");
        Ok(())
    }

    /// Removes `handle` from whichever queue it currently occupies.
    /// A no-op if it is not scheduled.
    pub fn unschedule(&mut self, handle: &EvalHandle) -> Result<()> {
        let Some(slot) = handle.borrow().base().slot() else {
            return Ok(());
        };
        let idx = self.priority_index(slot.priority)?;
        self.priorities[idx].unschedule(slot);
        handle.borrow().base().set_slot(None);
        Ok(())
    }

    /// Moves `handle` into the deferred queue at its current slot.
    pub fn defer(&mut self, handle: EvalHandle) -> Result<()> {
        let Some(slot) = handle.borrow().base().slot() else {
            return Ok(());
        };
        let idx = self.priority_index(slot.priority)?;
        let new_slot = self.priorities[idx].defer(handle.clone(), slot);
        handle.borrow().base().set_slot(Some(new_slot));
        Ok(())
    }

    /// Moves `handle` back into the active queue at its current slot.
    pub fn undefer(&mut self, handle: EvalHandle) -> Result<()> {
        let Some(slot) = handle.borrow().base().slot() else {
            return Ok(());
        };
        let idx = self.priority_index(slot.priority)?;
        let low_before = self.priorities[idx].low_watermark();
        let new_slot = self.priorities[idx].undefer(handle.clone(), slot);
        handle.borrow().base().set_slot(Some(new_slot));
        if new_slot.step < low_before {
            self.note_rewind(slot.priority);
        }
        Ok(())
    }

    fn note_rewind(&self, priority: Priority) {
        let Some(threshold) = self.config.queue_reset_warning_threshold else {
            return;
        };
        let count = self.reset_warnings_issued.get() + 1;
        self.reset_warnings_issued.set(count);
        if count >= threshold {
            tracing::warn!(
                priority = priority.level(),
                count,
                "evaluation queue has rewound its low watermark repeatedly; a node may be stuck re-scheduling a predecessor step"
            );
            self.reset_warnings_issued.set(0);
        }
    }

    /// Highest priority index at or above `min_index` with active work,
    /// scanning from the top since higher indices run first.
    fn highest_nonempty_at_or_above(&self, min_index: usize) -> Option<usize> {
        self.priorities
            .iter()
            .enumerate()
            .rev()
            .filter(|(idx, _)| *idx >= min_index)
            .find(|(_, q)| !q.is_empty())
            .map(|(idx, _)| idx)
    }

    /// Pops exactly one unit of work at or above `min_index`: either a
    /// node ready to run, or a step-boundary event to forward, or neither
    /// if everything at or above `min_index` is drained.
    fn pop_one_at_or_above(&mut self, min_index: usize) -> Option<PopResult> {
        let idx = self.highest_nonempty_at_or_above(min_index)?;
        match self.priorities[idx].step_once() {
            StepOutcome::Node(handle, step) => Some(PopResult::Node {
                handle,
                priority: self.priorities[idx].priority(),
                step,
            }),
            StepOutcome::StepBoundary(step) => Some(PopResult::StepBoundary {
                priority: self.priorities[idx].priority(),
                step,
            }),
            StepOutcome::Exhausted => {
                // This level just ran dry; a later call will pick the
                // next highest nonempty level, if any, at or above min.
                self.pop_one_at_or_above(min_index)
            }
        }
    }

    /// Drains from the highest nonempty priority at or above `min_priority`
    /// down to `min_priority`, in (priority desc, step asc) order, until
    /// either everything in range is drained (returns `true`), or the
    /// queue is suspended, the deadline passes, or the per-slice
    /// evaluation cap is hit (returns `false`; the caller should
    /// reschedule a continuation).
    ///
    /// `on_step_boundary` fires once per step, even empty ones, so a
    /// caller (typically the indexer epilogue, wired in by
    /// `flowgraph-runtime`) can hang per-step flush work off it.
    pub fn run_queue(
        queue: &Rc<RefCell<Self>>,
        min_priority: Priority,
        deadline: Instant,
        mut on_step_boundary: impl FnMut(Priority, usize),
    ) -> bool {
        let min_index = min_priority.index();
        let max_evaluations = queue.borrow().config.max_evaluations_per_slice;
        let mut processed = 0usize;
        loop {
            if queue.borrow().suspended.get() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            if processed >= max_evaluations {
                return false;
            }
            let popped = queue.borrow_mut().pop_one_at_or_above(min_index);
            match popped {
                None => return true,
                Some(PopResult::StepBoundary { priority, step }) => {
                    on_step_boundary(priority, step);
                }
                Some(PopResult::Node { handle, .. }) => {
                    handle.borrow_mut().update_output();
                    processed += 1;
                }
            }
        }
    }

    /// Runs exactly as [`Self::run_queue`] (from the lowest configured
    /// priority), but stops as soon as `target` becomes unscheduled by
    /// any mechanism — not only by running its own `update_output`, but
    /// also if some other node's evaluation withdrew it.
    pub fn run_until(
        queue: &Rc<RefCell<Self>>,
        target: &EvalHandle,
        deadline: Instant,
        mut on_step_boundary: impl FnMut(Priority, usize),
    ) -> bool {
        if !target.borrow().base().is_scheduled() {
            return true;
        }
        loop {
            if queue.borrow().suspended.get() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            let popped = queue.borrow_mut().pop_one_at_or_above(0);
            match popped {
                None => return true,
                Some(PopResult::StepBoundary { priority, step }) => {
                    on_step_boundary(priority, step);
                }
                Some(PopResult::Node { handle, .. }) => {
                    handle.borrow_mut().update_output();
                }
            }
            if !target.borrow().base().is_scheduled() {
                return true;
            }
        }
    }

    /// Registers a one-shot pre-write hook for the next commit.
    pub fn add_pre_write_hook(&mut self, hook: Rc<dyn crate::cycle::PreWriteHook>) {
        self.cycle.add_pre_write_hook(hook);
    }

    /// Registers a one-shot end-of-cycle hook for the next release.
    pub fn add_end_of_cycle_hook(&mut self, hook: Rc<dyn crate::cycle::EndOfCycleHook>) {
        self.cycle.add_end_of_cycle_hook(hook);
    }

    /// Holds a pending write merger until [`Self::commit_writes`].
    pub fn hold(&mut self, merger: Box<dyn crate::cycle::WriteMerger>) {
        self.cycle.hold(merger);
    }

    /// Latches `node` for this cycle (idempotent).
    pub fn latch(&mut self, node: Rc<RefCell<dyn crate::cycle::Writable>>) {
        self.cycle.latch(node);
    }

    /// Fires pre-write hooks, commits held writes, and releases latched
    /// nodes — the "positioning completed" external signal.
    pub fn commit_writes(&mut self) {
        self.cycle.fire_pre_write();
        self.cycle.commit_writes();
    }

    /// Fires end-of-cycle hooks and advances the cycle counter. Call
    /// after [`Self::commit_writes`] once a content cycle is fully
    /// settled.
    pub fn mark_end_of_evaluation_moment(&mut self) {
        self.cycle.fire_end_of_cycle_and_advance();
    }
}

enum PopResult {
    Node {
        handle: EvalHandle,
        priority: Priority,
        step: usize,
    },
    StepBoundary {
        priority: Priority,
        step: usize,
    },
}
