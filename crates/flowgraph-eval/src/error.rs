//! Evaluation queue errors.
//!
//! The queue's core loop is infallible by design: a node that misbehaves
//! trips a `debug_assert!`, it does not return a `Result`. [`EvalError`]
//! exists only for the caller-facing edges — constructing a queue or a
//! node with a priority level that was never configured.

use flowgraph_foundation::FoundationError;
use thiserror::Error;

/// Errors surfaced by [`crate::queue::EvaluationQueue`] construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EvalError {
    /// A priority level outside `0..num_priorities` was used.
    #[error("priority level {level} is out of range (configured for {num_priorities} levels)")]
    PriorityOutOfRange {
        /// The offending level.
        level: u32,
        /// How many levels the queue was configured for.
        num_priorities: u32,
    },

    /// Wraps a shared foundation error.
    #[error(transparent)]
    Foundation(#[from] FoundationError),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, EvalError>;
