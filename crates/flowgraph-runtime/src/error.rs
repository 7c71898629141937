//! Composed runtime errors.

use thiserror::Error;

/// Unifies the three subsystem error enums behind one type for callers
/// that hold a [`crate::runtime::Runtime`] and don't want to match on
/// which subsystem raised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RuntimeError {
    #[error(transparent)]
    Eval(#[from] flowgraph_eval::EvalError),

    #[error(transparent)]
    Event(#[from] flowgraph_events::EventError),

    #[error(transparent)]
    Index(#[from] flowgraph_index::IndexError),

    #[error(transparent)]
    Foundation(#[from] flowgraph_foundation::FoundationError),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, RuntimeError>;
