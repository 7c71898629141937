//! Cycle boundary hooks and the write-commit/latch protocol.
//!
//! A monotone `cycle` counter increments at
//! [`crate::queue::EvaluationQueue::mark_end_of_evaluation_moment`]. Two
//! one-shot hook lists fire around it: [`PreWriteHook`] just before write
//! commit, [`EndOfCycleHook`] after latched writes are released. "One-shot"
//! means a hook is removed from the list once called; it must re-register
//! itself if it wants the next cycle too.

use flowgraph_foundation::WatcherId;
use std::rc::Rc;

/// Fires once, just before a cycle's write commit.
pub trait PreWriteHook {
    /// Identity used to dedupe re-registration within one cycle.
    fn watcher_id(&self) -> WatcherId;
    /// Called with the cycle number that is about to commit writes.
    fn on_pre_write(&self, cycle: u64);
}

/// Fires once, after a cycle's latched writes are released.
pub trait EndOfCycleHook {
    /// Identity used to dedupe re-registration within one cycle.
    fn watcher_id(&self) -> WatcherId;
    /// Called with the cycle number that just finished.
    fn on_end_of_cycle(&self, cycle: u64);
}

/// A pending write to merge into shared state when positioning completes.
pub trait WriteMerger {
    /// Applies this merger's write.
    fn commit(&mut self);
}

/// A node that can be write-latched for the duration of a content cycle.
pub trait Writable {
    /// Identity used for latch idempotence.
    fn watcher_id(&self) -> WatcherId;
    /// Called once the latch is released.
    fn release(&mut self);
}

/// Bookkeeping for the hook lists plus the latch/commit protocol.
///
/// Owned by [`crate::queue::EvaluationQueue`]; split out so the queue's
/// scheduling logic and its write/latch logic can be read (and tested)
/// independently.
#[derive(Default)]
pub struct CycleState {
    cycle: u64,
    pre_write: Vec<Rc<dyn PreWriteHook>>,
    end_of_cycle: Vec<Rc<dyn EndOfCycleHook>>,
    held_writes: Vec<Box<dyn WriteMerger>>,
    latched: Vec<Rc<std::cell::RefCell<dyn Writable>>>,
    latched_ids: std::collections::HashSet<WatcherId>,
}

impl CycleState {
    /// Current cycle number.
    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Registers a one-shot pre-write hook for the *next* commit.
    pub fn add_pre_write_hook(&mut self, hook: Rc<dyn PreWriteHook>) {
        self.pre_write.push(hook);
    }

    /// Registers a one-shot end-of-cycle hook for the *next* release.
    pub fn add_end_of_cycle_hook(&mut self, hook: Rc<dyn EndOfCycleHook>) {
        self.end_of_cycle.push(hook);
    }

    /// Holds a pending write merger until [`CycleState::commit_writes`].
    pub fn hold(&mut self, merger: Box<dyn WriteMerger>) {
        self.held_writes.push(merger);
    }

    /// Latches `node` for this cycle. Idempotent: latching the same node
    /// twice in one cycle is a no-op the second time.
    pub fn latch(&mut self, node: Rc<std::cell::RefCell<dyn Writable>>) {
        let id = node.borrow().watcher_id();
        if self.latched_ids.insert(id) {
            self.latched.push(node);
        }
    }

    /// Number of nodes currently latched this cycle.
    #[must_use]
    pub fn latched_count(&self) -> usize {
        self.latched.len()
    }

    /// Runs every registered pre-write hook, then clears the list (they
    /// are one-shot).
    pub fn fire_pre_write(&mut self) {
        let hooks = std::mem::take(&mut self.pre_write);
        for hook in &hooks {
            hook.on_pre_write(self.cycle);
        }
    }

    /// Commits every held write merger in registration order, then
    /// releases every latched node exactly once, clearing `isLatched` and
    /// invoking `release()`.
    pub fn commit_writes(&mut self) {
        let mergers = std::mem::take(&mut self.held_writes);
        for mut merger in mergers {
            merger.commit();
        }
        self.release_latched();
    }

    fn release_latched(&mut self) {
        let latched = std::mem::take(&mut self.latched);
        self.latched_ids.clear();
        for node in &latched {
            node.borrow_mut().release();
        }
    }

    /// Runs every registered end-of-cycle hook, clears the list, and
    /// advances the cycle counter.
    pub fn fire_end_of_cycle_and_advance(&mut self) {
        let hooks = std::mem::take(&mut self.end_of_cycle);
        for hook in &hooks {
            hook.on_end_of_cycle(self.cycle);
        }
        self.cycle += 1;
    }
}
