//! Event kinds and payloads.

use flowgraph_foundation::AreaId;

/// Keyboard modifier state, shared by mouse and key payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub control: bool,
    pub alt: bool,
    pub meta: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// The sub-type of a raw input event, used to decide coalescing family,
/// propagation restrictions, and protected-from-cancellation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MouseDown,
    MouseUp,
    MouseMove,
    Click,
    DoubleClick,
    MouseGestureExpired,
    Wheel,
    PointerMove,
    TouchStart,
    TouchMove,
    TouchEnd,
    KeyDown,
    KeyUp,
    FileChoice,
    Drop,
    /// A `pointerInArea` param transition: entered (`true`) or left
    /// (`false`) with no mouse button held.
    PointerInArea,
    /// A `dragInArea` param transition: same as `PointerInArea` but with
    /// at least one mouse button held.
    DragInArea,
}

impl EventKind {
    /// `button-up`/`key-up` survive cancellation and timeout discard even
    /// for non-default aborts.
    #[must_use]
    pub fn is_protected(self) -> bool {
        matches!(self, EventKind::MouseUp | EventKind::KeyUp)
    }

    /// The coalescing family this kind belongs to, if it is a continuous
    /// event type eligible for move-coalescing on enqueue.
    #[must_use]
    pub fn coalesce_family(self) -> Option<crate::config::CoalesceFamily> {
        use crate::config::CoalesceFamily;
        match self {
            EventKind::MouseMove => Some(CoalesceFamily::MouseMove),
            EventKind::PointerMove => Some(CoalesceFamily::PointerMove),
            EventKind::TouchMove => Some(CoalesceFamily::TouchMove),
            EventKind::Wheel => Some(CoalesceFamily::Wheel),
            _ => None,
        }
    }

    /// `DoubleClick`/`MouseGestureExpired` are only deliverable to areas
    /// that received a preceding `Click` — enforced by the caller holding
    /// the set of areas that most recently saw a `Click`.
    #[must_use]
    pub fn requires_preceding_click(self) -> bool {
        matches!(self, EventKind::DoubleClick | EventKind::MouseGestureExpired)
    }
}

/// The data carried by one raw input event, independent of its delivery
/// state machine.
#[derive(Debug, Clone)]
pub enum EventPayload {
    Mouse {
        kind: EventKind,
        client_x: f64,
        client_y: f64,
        button: Option<MouseButton>,
        modifiers: Modifiers,
    },
    Touch {
        kind: EventKind,
    },
    Key {
        kind: EventKind,
        key: String,
        char: Option<char>,
        modifiers: Modifiers,
    },
    FileChoice {
        files: Vec<String>,
        target_area: AreaId,
    },
    Drop {
        files: Vec<String>,
        target_area: AreaId,
    },
    /// A `pointerInArea`/`dragInArea` param update for one area, carrying
    /// whether the pointer just entered (`true`) or left (`false`) it.
    AreaParam {
        kind: EventKind,
        value: bool,
    },
}

impl EventPayload {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::Mouse { kind, .. } | EventPayload::Touch { kind } | EventPayload::Key { kind, .. } => *kind,
            EventPayload::FileChoice { .. } => EventKind::FileChoice,
            EventPayload::Drop { .. } => EventKind::Drop,
            EventPayload::AreaParam { kind, .. } => *kind,
        }
    }

    /// `true` for the events that terminate focus/click completion per
    /// §4.2's "focus/click completion" rule.
    #[must_use]
    pub fn completes_focus(&self) -> bool {
        matches!(
            self.kind(),
            EventKind::MouseDown | EventKind::Drop | EventKind::FileChoice
        )
    }
}
