//! Event-queue errors.
//!
//! Most of the queue's state machine is infallible by construction (a
//! `QueuedEvent` only ever moves `waiting → start → recipients* → end →
//! done`); [`EventError`] exists for the caller-facing edges named in the
//! error-handling design: a test dispatch that targets an area that does
//! not exist or matches more than one, and a focus request onto an area
//! with no active input.

use flowgraph_foundation::{AreaId, FoundationError};
use thiserror::Error;

/// Errors surfaced by [`crate::queue::EventQueue`]'s caller-facing API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EventError {
    /// A dispatch named an area reference that resolved to nothing.
    #[error("no area matches the given reference")]
    AreaNotFound,

    /// A dispatch named an area reference that resolved to more than one
    /// area; the caller's test runner treats this as end-of-run.
    #[error("area reference is ambiguous ({count} areas matched)")]
    AmbiguousArea {
        /// How many areas matched.
        count: usize,
    },

    /// A focus request targeted an area with no active input element.
    #[error("area {0} has no active input element to focus")]
    NoActiveInput(AreaId),

    /// Wraps a shared foundation error.
    #[error(transparent)]
    Foundation(#[from] FoundationError),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, EventError>;
