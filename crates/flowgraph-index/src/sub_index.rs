//! Per-(path, value-type) sub-indexes: discrete hash or linear ordered.

use crate::key::Key;
use flowgraph_foundation::ElementId;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;

/// The hashable subset of [`Key`] eligible for discrete indexing: bool,
/// element-reference, and string (unless `alphabetic_ranges` upgrades
/// strings to a linear index).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DiscreteKey {
    Bool(bool),
    Str(String),
    Element(ElementId),
}

impl DiscreteKey {
    fn from_key(key: &Key) -> Option<Self> {
        match key {
            Key::Bool(b) => Some(DiscreteKey::Bool(*b)),
            Key::Str(s) => Some(DiscreteKey::Str(s.clone())),
            Key::Element(e) => Some(DiscreteKey::Element(*e)),
            Key::Int(_) | Key::Float(_) => None,
        }
    }
}

/// One path node's sub-index for one value type: either exact-match
/// (discrete) or interval-capable (linear).
#[derive(Debug)]
pub enum SubIndex {
    Discrete(HashMap<DiscreteKey, HashSet<ElementId>>),
    Linear(BTreeMap<Key, HashSet<ElementId>>),
}

impl SubIndex {
    #[must_use]
    pub fn new_discrete() -> Self {
        SubIndex::Discrete(HashMap::new())
    }

    #[must_use]
    pub fn new_linear() -> Self {
        SubIndex::Linear(BTreeMap::new())
    }

    /// Converts a discrete string index to linear in place, preserving
    /// every entry — the effect of turning `alphabetic_ranges` on.
    pub fn upgrade_to_linear(&mut self) {
        if let SubIndex::Discrete(map) = self {
            let mut linear = BTreeMap::new();
            for (key, elements) in map.drain() {
                if let DiscreteKey::Str(s) = key {
                    linear.insert(Key::Str(s), elements);
                }
            }
            *self = SubIndex::Linear(linear);
        }
    }

    /// Indexes `element` under `key`.
    pub fn insert(&mut self, key: &Key, element: ElementId) {
        match self {
            SubIndex::Discrete(map) => {
                if let Some(dk) = DiscreteKey::from_key(key) {
                    map.entry(dk).or_default().insert(element);
                }
            }
            SubIndex::Linear(map) => {
                map.entry(key.clone()).or_default().insert(element);
            }
        }
    }

    /// Removes `element` from under `key`. No-op if absent.
    pub fn remove(&mut self, key: &Key, element: ElementId) {
        match self {
            SubIndex::Discrete(map) => {
                if let Some(dk) = DiscreteKey::from_key(key) {
                    if let Some(set) = map.get_mut(&dk) {
                        set.remove(&element);
                        if set.is_empty() {
                            map.remove(&dk);
                        }
                    }
                }
            }
            SubIndex::Linear(map) => {
                if let Some(set) = map.get_mut(key) {
                    set.remove(&element);
                    if set.is_empty() {
                        map.remove(key);
                    }
                }
            }
        }
    }

    /// Elements whose key exactly equals `key`.
    #[must_use]
    pub fn matches_scalar(&self, key: &Key) -> Vec<ElementId> {
        match self {
            SubIndex::Discrete(map) => DiscreteKey::from_key(key)
                .and_then(|dk| map.get(&dk))
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default(),
            SubIndex::Linear(map) => map
                .get(key)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default(),
        }
    }

    /// Elements whose key falls in `[min, max]` (open bounds as given).
    /// Only meaningful for a [`SubIndex::Linear`]; a discrete index
    /// returns nothing, matching "discrete types have no interval
    /// queries."
    #[must_use]
    pub fn matches_range(
        &self,
        min: Option<(&Key, bool)>,
        max: Option<(&Key, bool)>,
    ) -> Vec<ElementId> {
        let SubIndex::Linear(map) = self else {
            return Vec::new();
        };
        let lower = match min {
            Some((k, true)) => Bound::Excluded(k.clone()),
            Some((k, false)) => Bound::Included(k.clone()),
            None => Bound::Unbounded,
        };
        let upper = match max {
            Some((k, true)) => Bound::Excluded(k.clone()),
            Some((k, false)) => Bound::Included(k.clone()),
            None => Bound::Unbounded,
        };
        map.range((lower, upper))
            .flat_map(|(_, set)| set.iter().copied())
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            SubIndex::Discrete(map) => map.is_empty(),
            SubIndex::Linear(map) => map.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discrete_round_trip() {
        let mut idx = SubIndex::new_discrete();
        let e = ElementId::new(1);
        idx.insert(&Key::Bool(true), e);
        assert_eq!(idx.matches_scalar(&Key::Bool(true)), vec![e]);
        idx.remove(&Key::Bool(true), e);
        assert!(idx.matches_scalar(&Key::Bool(true)).is_empty());
    }

    #[test]
    fn linear_range_query() {
        let mut idx = SubIndex::new_linear();
        let e1 = ElementId::new(1);
        let e2 = ElementId::new(2);
        let e3 = ElementId::new(3);
        idx.insert(&Key::Int(1), e1);
        idx.insert(&Key::Int(5), e2);
        idx.insert(&Key::Int(10), e3);
        let mut matches = idx.matches_range(Some((&Key::Int(1), false)), Some((&Key::Int(5), false)));
        matches.sort();
        assert_eq!(matches, vec![e1, e2]);
    }

    #[test]
    fn upgrading_string_index_preserves_entries() {
        let mut idx = SubIndex::new_discrete();
        let e = ElementId::new(7);
        idx.insert(&Key::Str("b".into()), e);
        idx.upgrade_to_linear();
        assert_eq!(idx.matches_scalar(&Key::Str("b".into())), vec![e]);
    }
}
