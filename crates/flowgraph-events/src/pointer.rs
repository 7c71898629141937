//! Pointer-in-area tracking: button state, position, modifiers, and the
//! overlapping/propagated area set.

use crate::area::{AreaGraph, PropagateEdge};
use crate::payload::{Modifiers, MouseButton};
use flowgraph_foundation::AreaId;
use std::collections::{HashSet, VecDeque};

/// Tracks which areas currently report the pointer inside them, so that
/// only the delta between old and new sets is emitted as
/// `pointerInArea`/`dragInArea` updates.
#[derive(Debug, Default)]
pub struct PointerState {
    pub client_x: f64,
    pub client_y: f64,
    pub buttons_down: HashSet<MouseButton>,
    pub modifiers: Modifiers,
    in_area: HashSet<AreaId>,
}

/// The areas that entered or left the pointer-in-area set on the last
/// recomputation.
#[derive(Debug, Default, Clone)]
pub struct PointerInAreaDelta {
    pub entered: Vec<AreaId>,
    pub left: Vec<AreaId>,
}

impl PointerState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn current_areas(&self) -> &HashSet<AreaId> {
        &self.in_area
    }

    /// Implements `updatePointerInArea`: direct hit-test from the
    /// overlapping-areas list (stopping at the first opaque area), then
    /// propagation up through each area's declared edge (or embedding by
    /// default). Areas destroyed since the last call are dropped from
    /// both the old and new sets before diffing.
    pub fn recompute(&mut self, graph: &dyn AreaGraph, x: f64, y: f64) -> PointerInAreaDelta {
        self.client_x = x;
        self.client_y = y;
        self.in_area.retain(|&a| graph.exists(a));

        let mut new_set = HashSet::new();
        let mut queue = VecDeque::new();
        for area in graph.overlapping_areas(x, y) {
            if new_set.insert(area) {
                queue.push_back(area);
            }
            if graph.is_opaque(area) {
                break;
            }
        }

        while let Some(area) = queue.pop_front() {
            let next = match graph.propagate_directive(area) {
                Some(PropagateEdge::Embedding) | None => graph.embedding(area),
                Some(PropagateEdge::Expression) => graph.expression(area),
                Some(PropagateEdge::Referred) => graph.referred(area),
                Some(PropagateEdge::Named(target)) => Some(target),
            };
            if let Some(next_area) = next {
                if graph.exists(next_area) && new_set.insert(next_area) {
                    queue.push_back(next_area);
                }
            }
        }

        let entered: Vec<_> = new_set.difference(&self.in_area).copied().collect();
        let left: Vec<_> = self.in_area.difference(&new_set).copied().collect();
        self.in_area = new_set;
        PointerInAreaDelta { entered, left }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Fixture {
        embedding: HashMap<AreaId, AreaId>,
        opaque: HashMap<AreaId, bool>,
        points: HashMap<(i64, i64), Vec<AreaId>>,
    }

    impl AreaGraph for Fixture {
        fn exists(&self, _area: AreaId) -> bool {
            true
        }
        fn is_opaque(&self, area: AreaId) -> bool {
            self.opaque.get(&area).copied().unwrap_or(false)
        }
        fn overlapping_areas(&self, x: f64, y: f64) -> Vec<AreaId> {
            self.points.get(&(x as i64, y as i64)).cloned().unwrap_or_default()
        }
        fn embedding(&self, area: AreaId) -> Option<AreaId> {
            self.embedding.get(&area).copied()
        }
        fn expression(&self, _area: AreaId) -> Option<AreaId> {
            None
        }
        fn referred(&self, _area: AreaId) -> Option<AreaId> {
            None
        }
        fn can_receive_focus(&self, _area: AreaId) -> bool {
            false
        }
        fn can_handle_click(&self, _area: AreaId) -> bool {
            false
        }
        fn has_active_input(&self, _area: AreaId) -> bool {
            false
        }
    }

    #[test]
    fn opaque_area_stops_direct_hit_test_but_not_propagation() {
        let child = AreaId::new(1);
        let parent = AreaId::new(2);
        let behind = AreaId::new(3);
        let fixture = Fixture {
            embedding: [(child, parent)].into_iter().collect(),
            opaque: [(child, true)].into_iter().collect(),
            points: [((5, 5), vec![child, behind])].into_iter().collect(),
        };

        let mut pointer = PointerState::new();
        let delta = pointer.recompute(&fixture, 5.0, 5.0);

        assert!(delta.entered.contains(&child));
        assert!(delta.entered.contains(&parent));
        assert!(!delta.entered.contains(&behind));
    }

    #[test]
    fn moving_away_emits_a_left_delta() {
        let area = AreaId::new(1);
        let fixture = Fixture {
            embedding: HashMap::new(),
            opaque: HashMap::new(),
            points: [((0, 0), vec![area])].into_iter().collect(),
        };

        let mut pointer = PointerState::new();
        pointer.recompute(&fixture, 0.0, 0.0);
        let delta = pointer.recompute(&fixture, 100.0, 100.0);

        assert_eq!(delta.left, vec![area]);
        assert!(delta.entered.is_empty());
    }
}
