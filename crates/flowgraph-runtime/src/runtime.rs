//! Ties the evaluation queue, the path-node indexer, and the event queue
//! into one reactive graph driven from a single logical thread.

use crate::error::Result;
use flowgraph_eval::{EvaluationQueue, Priority};
use flowgraph_events::{AreaGraph, EventQueue};
use flowgraph_index::Indexer;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;
use web_time::Instant;

/// Configuration for one [`Runtime`].
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub eval: flowgraph_eval::Config,
    pub events: flowgraph_events::Config,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            eval: flowgraph_eval::Config::new(),
            events: flowgraph_events::Config::new(),
        }
    }
}

/// The runtime facade. Owns the three subsystems and sequences a tick so
/// that a write commit always strictly follows the evaluation cycle that
/// produced it: drain the evaluation queue, run the indexer epilogue
/// against whatever the drained nodes touched, then commit writes and
/// advance the cycle counter.
pub struct Runtime {
    eval_queue: Rc<RefCell<EvaluationQueue>>,
    indexer: Indexer,
    events: EventQueue,
}

impl Runtime {
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            eval_queue: Rc::new(RefCell::new(EvaluationQueue::new(config.eval))),
            indexer: Indexer::new(),
            events: EventQueue::new(config.events),
        }
    }

    #[must_use]
    pub fn eval_queue(&self) -> &Rc<RefCell<EvaluationQueue>> {
        &self.eval_queue
    }

    #[must_use]
    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    #[must_use]
    pub fn indexer_mut(&mut self) -> &mut Indexer {
        &mut self.indexer
    }

    #[must_use]
    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    #[must_use]
    pub fn events_mut(&mut self) -> &mut EventQueue {
        &mut self.events
    }

    /// Drains every queued input event one state transition at a time,
    /// against `graph`, until the event queue is empty or `deadline`
    /// passes.
    pub fn drain_events(&mut self, graph: &dyn AreaGraph, deadline: Instant) -> bool {
        while !self.events.is_empty() {
            if Instant::now() >= deadline {
                return false;
            }
            self.events.next_queued_event(graph);
        }
        true
    }

    /// Runs one evaluation cycle: drains the evaluation queue from
    /// `min_priority` down to the floor, flushing the indexer epilogue at
    /// every step boundary the drain crosses (not only once at the end) so
    /// a node scheduled later in the same drain sees match updates from
    /// earlier steps, commits held writes, then marks the evaluation
    /// moment complete and advances the cycle counter.
    ///
    /// Returns `false` if `deadline` or the per-slice evaluation cap cut
    /// the drain short; the caller should reschedule a continuation
    /// rather than treat the cycle as settled.
    pub fn run_cycle(&mut self, min_priority: Priority, deadline: Instant) -> Result<bool> {
        let indexer = &mut self.indexer;
        let mut callbacks = 0usize;
        let drained = EvaluationQueue::run_queue(&self.eval_queue, min_priority, deadline, |_, _| {
            callbacks += indexer.run_epilogue();
        });
        callbacks += self.indexer.run_epilogue();
        debug!(drained, callbacks, "evaluation cycle settled");
        self.eval_queue.borrow_mut().commit_writes();
        if drained {
            self.eval_queue.borrow_mut().mark_end_of_evaluation_moment();
        }
        Ok(drained)
    }

    /// Convenience for a test/demo driver: runs cycles back to back until
    /// one fully drains within `deadline`, then returns.
    pub fn run_to_quiescence(&mut self, deadline: Instant) -> Result<()> {
        loop {
            let settled = self.run_cycle(Priority::new(0), deadline)?;
            if settled || Instant::now() >= deadline {
                return Ok(());
            }
        }
    }
}
