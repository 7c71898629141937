//! A growable, self-compacting queue of scheduled evaluators.
//!
//! Entries are popped by clearing their slot rather than shifting the
//! array, so a drain pass is a single linear scan. Once every slot
//! between `pos` and `end` has been cleared the buffer resets to empty
//! and its storage is reused, so a long-running queue does not grow
//! unbounded across cycles.

use crate::evaluator::EvalHandle;

/// One (priority, step) bucket's worth of scheduled evaluators.
#[derive(Default)]
pub struct EvaluatorList {
    slots: Vec<Option<EvalHandle>>,
    /// Index of the first slot that might still be occupied.
    pos: usize,
    /// One past the last occupied slot.
    end: usize,
    /// Number of `Some` entries currently held; tracked separately so
    /// emptiness is O(1) even with stale cleared slots between `pos` and
    /// `end`.
    count: usize,
}

impl EvaluatorList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if no evaluator is currently queued here.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of evaluators currently queued here.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Appends `handle`, returning the index to remember for O(1) removal.
    pub fn push(&mut self, handle: EvalHandle) -> usize {
        let index = self.end;
        if index >= self.slots.len() {
            self.slots.push(Some(handle));
        } else {
            self.slots[index] = Some(handle);
        }
        self.end += 1;
        self.count += 1;
        index
    }

    /// Clears the slot at `index`, if still occupied. Compacts the list
    /// back to empty when the cleared slot was the last live one.
    pub fn remove(&mut self, index: usize) {
        if index >= self.slots.len() {
            return;
        }
        if self.slots[index].take().is_some() {
            self.count = self.count.saturating_sub(1);
        }
        if index == self.pos {
            self.advance_pos();
        }
        if self.count == 0 {
            self.reset();
        }
    }

    fn advance_pos(&mut self) {
        while self.pos < self.end && self.slots.get(self.pos).is_some_and(Option::is_none) {
            self.pos += 1;
        }
    }

    fn reset(&mut self) {
        self.slots.clear();
        self.pos = 0;
        self.end = 0;
    }

    /// Pops exactly one live entry in FIFO order, if any remain.
    ///
    /// This is the reentrancy-safe primitive: the caller holds no borrow
    /// across whatever the popped handle's `update_output` does, so that
    /// work can turn around and schedule onto this same list (or any
    /// other) without conflicting with an in-progress drain.
    pub fn pop_one(&mut self) -> Option<(EvalHandle, usize)> {
        self.advance_pos();
        if self.pos >= self.end {
            if self.count == 0 {
                self.reset();
            }
            return None;
        }
        let index = self.pos;
        let handle = self.slots[index].take()?;
        self.count -= 1;
        self.pos += 1;
        if self.count == 0 {
            self.reset();
        }
        Some((handle, index))
    }

    /// Drains every live entry in FIFO order, calling `f` with the handle
    /// and its slot index. Entries appended to this list *during* the
    /// drain (i.e. a node that re-schedules itself at the same step) are
    /// visited in the same pass, matching "ties within one step are FIFO
    /// of insertion." Checks `should_stop` before each node so a caller
    /// can interrupt mid-list. Only safe to call when nothing invoked
    /// through `f` can reach back into this list (see [`Self::pop_one`]
    /// for the reentrancy-safe alternative).
    pub fn drain_fifo_until(
        &mut self,
        mut f: impl FnMut(EvalHandle, usize),
        mut should_stop: impl FnMut() -> bool,
    ) {
        loop {
            if should_stop() {
                return;
            }
            let Some((handle, index)) = self.pop_one() else {
                return;
            };
            f(handle, index);
        }
    }
}
