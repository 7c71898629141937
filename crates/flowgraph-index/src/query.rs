//! The query-calc contract: how a registered query receives index
//! updates.

use crate::key::Key;
use flowgraph_foundation::{ElementId, PathId, QueryId, ValueId};

/// A registered query's view onto the indexer.
///
/// Implemented by whatever owns the query (an evaluation node, in the
/// common case); the indexer only ever calls through this trait, never
/// reaching into the query's own state.
pub trait QueryCalc {
    /// This query's identity.
    fn id(&self) -> QueryId;
    /// The path this query is anchored at.
    fn path_id(&self) -> PathId;
    /// `true` for a selection query (one or more registered match
    /// values); `false` for a plain projection/match-all query.
    fn is_selection(&self) -> bool;
    /// `true` if this query should not force its path node to trace.
    fn no_path_node_tracing(&self) -> bool {
        false
    }
    /// `true` if this query should not be indexed (projection-only).
    fn do_not_index(&self) -> bool {
        false
    }

    /// Non-indexed queries: additions since the last epilogue flush.
    fn add_matches(&mut self, element_ids: &[ElementId]);
    /// Non-indexed queries: removals since the last epilogue flush.
    fn remove_matches(&mut self, element_ids: &[ElementId]);
    /// Drops every match this query currently holds (query torn down).
    fn remove_all_indexer_matches(&mut self);

    /// Selections: net match-count delta per element since the last
    /// flush, keyed by element ID.
    fn update_match_count(&mut self, deltas: &std::collections::HashMap<ElementId, i64>);

    /// Key-update subscribers: parallel arrays for changed nodes.
    fn update_keys(
        &mut self,
        element_ids: &[ElementId],
        types: &[Option<String>],
        keys: &[Option<Key>],
        prev_types: &[Option<String>],
        prev_keys: &[Option<Key>],
    );

    /// The set of value IDs this selection is disjoint across (used by
    /// the indexer to decide which sub-index lookups feed this query).
    fn disjoint_value_ids(&self) -> Vec<ValueId>;
}
