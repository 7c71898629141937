//! Range keys: the operator/operand algebra for a range node.
//!
//! Stored as persistent data per the "open/closed ranges as algebraic
//! data" design note: `{min, max, min_open, max_open, types_seen,
//! count_per_type}` with an explicit `active` predicate, rather than a
//! mutable "range object" updated in place. Snapshotting into a node's
//! `prev_keys` is then a cheap `Clone`.

use crate::key::{Key, KeyType};
use flowgraph_foundation::ElementId;
use std::collections::HashMap;

/// An ordered multiset of typed keys belonging to a range node's operand
/// children, plus enough bookkeeping to answer "is this range active".
#[derive(Debug, Clone, Default)]
pub struct RangeKey {
    min: Option<Key>,
    max: Option<Key>,
    min_open: bool,
    max_open: bool,
    count_per_type: HashMap<KeyTypeTag, usize>,
    /// Every live operand, keyed by its own element ID, so a removal can
    /// rebuild the hull from the surviving set and a caller can flip
    /// per-operand sub-index visibility.
    operands: HashMap<ElementId, (Key, bool)>,
}

/// Hashable stand-in for [`KeyType`] (which itself has no need to be
/// hashable outside this module).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct KeyTypeTag(u8);

fn tag(t: KeyType) -> KeyTypeTag {
    KeyTypeTag(match t {
        KeyType::Bool => 0,
        KeyType::Int => 1,
        KeyType::Float => 2,
        KeyType::Str => 3,
        KeyType::Element => 4,
    })
}

impl RangeKey {
    /// An empty range (no operands yet).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if this range currently contains no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count_per_type.values().sum::<usize>() == 0
    }

    /// How many distinct key types are currently present.
    #[must_use]
    pub fn distinct_types(&self) -> usize {
        self.count_per_type.values().filter(|&&n| n > 0).count()
    }

    /// Active iff non-empty and every contained key shares one type —
    /// the convex-hull interpretation applies and `min`/`max` are
    /// meaningful. Inactive (mixed types, or empty) falls back to the
    /// ordered-set interpretation where operand nodes are the visible
    /// terminals.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.is_empty() && self.distinct_types() == 1
    }

    #[must_use]
    pub fn min(&self) -> Option<&Key> {
        self.min.as_ref()
    }

    #[must_use]
    pub fn max(&self) -> Option<&Key> {
        self.max.as_ref()
    }

    #[must_use]
    pub fn min_open(&self) -> bool {
        self.min_open
    }

    #[must_use]
    pub fn max_open(&self) -> bool {
        self.max_open
    }

    /// Every live operand, by element ID.
    #[must_use]
    pub fn operands(&self) -> &HashMap<ElementId, (Key, bool)> {
        &self.operands
    }

    /// Folds `operand`'s `key` into the range, recomputing `min`/`max` if
    /// this key's type is the one the convex hull is tracking.
    pub fn insert(&mut self, operand: ElementId, key: Key, open: bool) {
        *self.count_per_type.entry(tag(key.key_type())).or_insert(0) += 1;
        match (&self.min, &self.max) {
            (None, None) => {
                self.min_open = open;
                self.max_open = open;
                self.min = Some(key.clone());
                self.max = Some(key.clone());
            }
            _ => {
                if self.min.as_ref().is_some_and(|m| &key < m) {
                    self.min = Some(key.clone());
                    self.min_open = open;
                }
                if self.max.as_ref().is_some_and(|m| &key > m) {
                    self.max = Some(key.clone());
                    self.max_open = open;
                }
            }
        }
        self.operands.insert(operand, (key, open));
    }

    /// Removes one occurrence of `type_of` from the count. Does not
    /// recompute `min`/`max` precisely (a removed extremum is corrected
    /// on the next `insert`/full rebuild) — callers holding a precise
    /// range recompute it from the live operand set when a removal
    /// affects the current min or max.
    pub fn remove_one(&mut self, removed_type: KeyType) {
        if let Some(count) = self.count_per_type.get_mut(&tag(removed_type)) {
            *count = count.saturating_sub(1);
        }
    }

    /// Removes `operand` outright, decrementing its type count and
    /// rebuilding `min`/`max` from the surviving operand set if the
    /// removed key was the current extremum. Returns the removed
    /// `(key, open)` pair, if `operand` was present.
    pub fn remove(&mut self, operand: ElementId) -> Option<(Key, bool)> {
        let removed = self.operands.remove(&operand)?;
        self.remove_one(removed.0.key_type());
        let was_extremum = self.min.as_ref() == Some(&removed.0) || self.max.as_ref() == Some(&removed.0);
        if was_extremum {
            let rebuilt = Self::rebuild(self.operands.values().map(|(k, o)| (k.clone(), *o)));
            self.min = rebuilt.min;
            self.max = rebuilt.max;
            self.min_open = rebuilt.min_open;
            self.max_open = rebuilt.max_open;
        }
        Some(removed)
    }

    /// Rebuilds min/max/open flags from a fresh iterator of (key, open)
    /// pairs — used after a removal that may have invalidated the
    /// current extremum, or when constructing a range from scratch.
    pub fn rebuild(keys: impl IntoIterator<Item = (Key, bool)>) -> Self {
        let mut range = Self::new();
        for (key, open) in keys {
            // `rebuild` only needs min/max/open, not operand identity, so
            // the element ID is irrelevant here.
            range.insert(ElementId::new(1), key, open);
        }
        range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(n: usize) -> ElementId {
        ElementId::new(n)
    }

    #[test]
    fn single_type_range_is_active_with_min_max() {
        let mut r = RangeKey::new();
        r.insert(op(1), Key::Int(5), false);
        r.insert(op(2), Key::Int(3), false);
        assert!(r.is_active());
        assert_eq!(r.min(), Some(&Key::Int(3)));
        assert_eq!(r.max(), Some(&Key::Int(5)));
    }

    #[test]
    fn mixed_type_range_is_inactive() {
        let mut r = RangeKey::new();
        r.insert(op(1), Key::Int(3), false);
        r.insert(op(2), Key::Str("a".into()), false);
        assert!(!r.is_active());
    }

    #[test]
    fn empty_range_is_inactive() {
        assert!(!RangeKey::new().is_active());
    }

    #[test]
    fn removing_the_current_minimum_rebuilds_it_from_the_survivors() {
        let mut r = RangeKey::new();
        r.insert(op(1), Key::Int(3), false);
        r.insert(op(2), Key::Int(5), false);
        r.insert(op(3), Key::Int(9), false);
        assert_eq!(r.min(), Some(&Key::Int(3)));

        r.remove(op(1));
        assert_eq!(r.min(), Some(&Key::Int(5)));
        assert_eq!(r.max(), Some(&Key::Int(9)));
        assert!(r.is_active());
    }

    #[test]
    fn removing_the_mixed_type_operand_reactivates_the_range() {
        let mut r = RangeKey::new();
        r.insert(op(1), Key::Int(3), false);
        r.insert(op(2), Key::Int(5), false);
        r.insert(op(3), Key::Str("oops".into()), false);
        assert!(!r.is_active());

        r.remove(op(3));
        assert!(r.is_active());
        assert_eq!(r.min(), Some(&Key::Int(3)));
        assert_eq!(r.max(), Some(&Key::Int(5)));
    }
}
