//! Indexer-facing errors.
//!
//! Most of the indexer's invariants are enforced with `debug_assert!` —
//! a node removed twice or a key set on a path that was never added is a
//! programming error, not a `Result`. [`IndexError`] covers the
//! transient-but-observable edges: looking up a query or path that was
//! never registered, or constructing a range key with no keys in it.

use flowgraph_foundation::FoundationError;
use thiserror::Error;

/// Errors surfaced by [`crate::indexer::Indexer`]'s caller-facing API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IndexError {
    /// A path ID was used before [`crate::indexer::Indexer::add_path`].
    #[error("path {0} has no node in this indexer")]
    UnknownPath(flowgraph_foundation::PathId),

    /// A query ID was used before registration.
    #[error("query {0} is not registered at this path")]
    UnknownQuery(flowgraph_foundation::QueryId),

    /// A range key was constructed with no contained keys.
    #[error("a range key must contain at least one key")]
    EmptyRange,

    /// Wraps a shared foundation error.
    #[error(transparent)]
    Foundation(#[from] FoundationError),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, IndexError>;
