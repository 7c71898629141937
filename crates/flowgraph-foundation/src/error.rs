//! Shared error taxonomy.
//!
//! The runtime's core (evaluation queue, event queue, indexer) is mostly
//! infallible by design — per-spec, programming-invariant violations are
//! fatal assertions, not recoverable errors, and transient indexer
//! inconsistencies are tolerated silently. [`FoundationError`] exists for
//! the genuinely fallible, caller-facing edges: a test node targeting an
//! ambiguous or missing area, a focus request with no active input
//! element, or a malformed range-key construction. Each downstream crate
//! defines its own error enum and wraps this one via `#[from]`.

use thiserror::Error;

/// Errors shared by every subsystem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FoundationError {
    /// A test node (or other external caller) targeted an area reference
    /// that does not resolve to exactly one area.
    #[error("area lookup for {query:?} matched {matches} areas, expected exactly one")]
    AmbiguousAreaLookup {
        /// The query string the caller used to look up the area.
        query: String,
        /// How many areas actually matched.
        matches: usize,
    },

    /// A focus transfer was requested onto an area with no active input
    /// element.
    #[error("area {area} has no active input element to focus")]
    NoActiveInputElement {
        /// Display form of the area reference.
        area: String,
    },

    /// A range key mixed key types in a way that makes a requested
    /// operation meaningless (e.g. asking for the min of an inactive,
    /// mixed-type range).
    #[error("range key is inactive (mixed types): {reason}")]
    InactiveRangeKey {
        /// Human-readable explanation.
        reason: String,
    },
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, FoundationError>;
