//! The interface the event queue needs onto the external display
//! hierarchy, without depending on any concrete area/layer type.

use flowgraph_foundation::AreaId;

/// Which edge `updatePointerInArea` should follow when an area declares a
/// `propagatePointerInArea` directive instead of the default (embedding).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagateEdge {
    Embedding,
    Expression,
    Referred,
    Named(AreaId),
}

/// Abstracts the embedding/expression/referred edges and hit-testing the
/// pointer-in-area algorithm walks. A host application implements this
/// over its own area/layer tree; test code implements it over a small
/// in-memory tree.
pub trait AreaGraph {
    /// `true` if `area` still exists (areas may be destroyed between
    /// pointer updates).
    fn exists(&self, area: AreaId) -> bool;

    /// `true` if pointer/drag events stop propagating past `area`.
    fn is_opaque(&self, area: AreaId) -> bool;

    /// Areas under point `(x, y)`, front-to-back in z-order.
    fn overlapping_areas(&self, x: f64, y: f64) -> Vec<AreaId>;

    fn embedding(&self, area: AreaId) -> Option<AreaId>;
    fn expression(&self, area: AreaId) -> Option<AreaId>;
    fn referred(&self, area: AreaId) -> Option<AreaId>;

    /// An explicit `propagatePointerInArea` directive, if `area` declares
    /// one; `None` means "propagate to embedding" (the default).
    fn propagate_directive(&self, area: AreaId) -> Option<PropagateEdge> {
        None
    }

    fn can_receive_focus(&self, area: AreaId) -> bool;
    fn can_handle_click(&self, area: AreaId) -> bool;
    fn has_active_input(&self, area: AreaId) -> bool;

    /// A native clickable child of `area` that is not `area` itself, for
    /// the synthesized click-dispatch rule in focus/click completion.
    fn clickable_child(&self, area: AreaId) -> Option<AreaId> {
        None
    }
}
