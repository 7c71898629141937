//! Type-safe IDs shared across the runtime.
//!
//! Every identity that crosses a subsystem boundary — a path in the
//! indexer, a data element, a watcher, a registered query, a sub-tree
//! monitor, an external area — gets its own newtype instead of a bare
//! `usize`. Mixing a [`PathId`] and an [`ElementId`] is then a type error
//! instead of a silent bug.
//!
//! All IDs are backed by `NonZeroUsize`, so `Option<Id>` is the same size
//! as `Id` and 0 is reserved as a sentinel that can never be allocated.

use std::num::NonZeroUsize;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(NonZeroUsize);

        impl $name {
            /// Creates an ID from a 1-based raw value.
            ///
            /// # Panics
            ///
            /// Panics if `raw` is zero.
            #[must_use]
            pub fn new(raw: usize) -> Self {
                Self(NonZeroUsize::new(raw).expect(concat!(stringify!($name), " must be non-zero")))
            }

            /// Creates an ID from a 1-based raw value, returning `None` for zero.
            #[must_use]
            pub fn new_checked(raw: usize) -> Option<Self> {
                NonZeroUsize::new(raw).map(Self)
            }

            /// Returns the raw value.
            #[must_use]
            pub const fn get(self) -> usize {
                self.0.get()
            }

            /// Returns a zero-based index suitable for `Vec` indexing.
            #[must_use]
            pub const fn index(self) -> usize {
                self.0.get() - 1
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

define_id!(
    /// Identifies a path (a sequence of string attributes) stable across
    /// indexer instances; allocated by the process-wide [`crate::path_id::PathIdAllocator`].
    PathId
);

define_id!(
    /// Identifies a data element: a node occurrence inside a multi-valued
    /// subtree, scoped to one indexer instance.
    ElementId
);

define_id!(
    /// Identifies an evaluation node (watcher) in the evaluation queue.
    WatcherId
);

define_id!(
    /// Identifies a registered query-calc subscribed to a path node.
    QueryId
);

define_id!(
    /// Identifies a sub-tree monitor registered with the indexer.
    MonitorId
);

define_id!(
    /// Identifies an external display-hierarchy node ("area").
    AreaId
);

define_id!(
    /// Identifies a selection value registered by a query at a path
    /// (a value registered at a path, as opposed to a whole element).
    ValueId
);

define_id!(
    /// Identifies a change-notification listener registration.
    ListenerId
);

/// A monotone generator for one ID type.
///
/// Every allocator in the runtime (path IDs, watcher IDs, query IDs, ...)
/// is an instance of this counter; it never reuses a value, so
/// watcher/query identities stay monotone for the life of the process.
#[derive(Debug)]
pub struct IdGenerator<T> {
    next: usize,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> Default for IdGenerator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IdGenerator<T> {
    /// Creates a generator whose first allocation is `1`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: 0,
            _marker: std::marker::PhantomData,
        }
    }
}

macro_rules! impl_generator {
    ($name:ident) => {
        impl IdGenerator<$name> {
            /// Allocates the next ID.
            pub fn alloc(&mut self) -> $name {
                self.next += 1;
                $name::new(self.next)
            }
        }
    };
}

impl_generator!(PathId);
impl_generator!(ElementId);
impl_generator!(WatcherId);
impl_generator!(QueryId);
impl_generator!(MonitorId);
impl_generator!(ValueId);
impl_generator!(ListenerId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_niche_optimized() {
        assert_eq!(
            std::mem::size_of::<ElementId>(),
            std::mem::size_of::<Option<ElementId>>()
        );
    }

    #[test]
    fn generator_is_monotone_and_one_based() {
        let mut gen = IdGenerator::<WatcherId>::new();
        let a = gen.alloc();
        let b = gen.alloc();
        assert_eq!(a.get(), 1);
        assert_eq!(b.get(), 2);
        assert_ne!(a, b);
    }

    #[test]
    #[should_panic(expected = "must be non-zero")]
    fn zero_is_rejected() {
        let _ = PathId::new(0);
    }
}
