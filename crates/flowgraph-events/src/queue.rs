//! The serialized event queue: one `QueuedEvent` in flight at a time,
//! advancing `waiting → start → recipients* → end → done`.

use crate::area::AreaGraph;
use crate::config::Config;
use crate::payload::{EventKind, EventPayload};
use crate::pointer::PointerState;
use flowgraph_foundation::AreaId;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, trace};

/// Where a queued event is in its delivery lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventState {
    Waiting,
    Start,
    Recipients { index: usize },
    End,
    Done,
}

/// A message synthesized for one recipient during a `Recipients` tick.
#[derive(Debug, Clone)]
pub struct Message {
    pub recipient: AreaId,
    pub payload: EventPayload,
    /// `false` when this tick instead recorded a focus/click candidate
    /// and suppressed the normal sub-type emission, per §4.2's "if the
    /// recipient can receive focus or handle click... skip subType
    /// emission this tick."
    pub emitted: bool,
}

/// One event working its way through the delivery state machine.
#[derive(Debug, Clone)]
pub struct QueuedEvent {
    pub id: u64,
    pub payload: EventPayload,
    pub recipients: Vec<AreaId>,
    pub state: EventState,
    pub is_protected: bool,
}

impl QueuedEvent {
    fn new(id: u64, payload: EventPayload) -> Self {
        let is_protected = payload.kind().is_protected();
        Self {
            id,
            payload,
            recipients: Vec::new(),
            state: EventState::Waiting,
            is_protected,
        }
    }
}

/// Turns raw input events into an ordered, serialized message-delivery
/// sequence across a set of recipient areas.
pub struct EventQueue {
    config: Config,
    queue: VecDeque<QueuedEvent>,
    next_id: u64,
    pointer: PointerState,
    focused_input_element: Option<AreaId>,
    /// Areas that received the most recently delivered `Click`, used to
    /// restrict `DoubleClick`/`MouseGestureExpired` delivery.
    last_click_recipients: HashSet<AreaId>,
    published: Vec<Message>,
}

impl EventQueue {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            queue: VecDeque::new(),
            next_id: 1,
            pointer: PointerState::new(),
            focused_input_element: None,
            last_click_recipients: HashSet::new(),
            published: Vec::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[must_use]
    pub fn focused_input_element(&self) -> Option<AreaId> {
        self.focused_input_element
    }

    #[must_use]
    pub fn published_messages(&self) -> &[Message] {
        &self.published
    }

    #[must_use]
    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    /// Enqueues a raw input event. Continuous event types coalesce with
    /// any prior queued event of the same family that has not yet left
    /// `waiting`, replacing it in place so queue length never grows past
    /// one pending move per family.
    pub fn enqueue(&mut self, payload: EventPayload) -> u64 {
        if let Some(family) = payload.kind().coalesce_family() {
            if let Some(existing) = self
                .queue
                .iter_mut()
                .find(|e| e.state == EventState::Waiting && e.payload.kind().coalesce_family() == Some(family))
            {
                trace!(family = ?family, "coalescing continuous event");
                existing.payload = payload;
                return existing.id;
            }
        }
        let id = self.next_id;
        self.next_id += 1;
        self.queue.push_back(QueuedEvent::new(id, payload));
        id
    }

    /// Drops every queued event of `kind`, except those already past
    /// `waiting` (in flight) and protected ones.
    pub fn cancel_events_of_type(&mut self, kind: EventKind) {
        self.queue
            .retain(|e| e.is_protected || e.payload.kind() != kind || e.state != EventState::Waiting);
    }

    /// Discards every unprotected queued event still in `waiting` — the
    /// timeout-discard policy. Protected events (`button-up`/`key-up`)
    /// always replay.
    pub fn discard_timed_out(&mut self) {
        self.queue.retain(|e| e.is_protected || e.state != EventState::Waiting);
    }

    /// Collapses the named event's remaining recipients to `["end"]`.
    /// Allowed for any event's default abort, and additionally for key
    /// events on a non-default abort.
    pub fn abort_message_propagation(&mut self, id: u64, default_abort: bool) {
        if let Some(event) = self.queue.iter_mut().find(|e| e.id == id) {
            let allowed = default_abort || matches!(event.payload.kind(), EventKind::KeyDown | EventKind::KeyUp);
            if allowed {
                event.recipients.clear();
                event.state = EventState::End;
            }
        }
    }

    /// Advances the front event by exactly one state transition, per
    /// `nextQueuedEvent`. Returns `true` if a transition happened.
    pub fn next_queued_event(&mut self, graph: &dyn AreaGraph) -> bool {
        let Some(state) = self.queue.front().map(|e| e.state) else {
            return false;
        };
        match state {
            EventState::Waiting => {
                self.first_contact(graph);
                true
            }
            EventState::Start => {
                let event = self.queue.front_mut().expect("front checked above");
                event.state = if event.recipients.is_empty() {
                    EventState::End
                } else {
                    EventState::Recipients { index: 0 }
                };
                true
            }
            EventState::Recipients { index } => {
                self.deliver_to_recipient(index, graph);
                let event = self.queue.front_mut().expect("front checked above");
                let next_index = index + 1;
                event.state = if next_index >= event.recipients.len() {
                    EventState::End
                } else {
                    EventState::Recipients { index: next_index }
                };
                true
            }
            EventState::End => {
                self.complete_focus_and_click(graph);
                let event = self.queue.front_mut().expect("front checked above");
                event.state = EventState::Done;
                true
            }
            EventState::Done => {
                let done = self.queue.pop_front().expect("front checked above");
                debug!(id = done.id, "event reached done");
                true
            }
        }
    }

    fn first_contact(&mut self, graph: &dyn AreaGraph) {
        let event = self.queue.front().expect("caller checked non-empty");
        let kind = event.payload.kind();

        if let EventPayload::Mouse { button, kind, client_x, client_y, modifiers, .. } = &event.payload {
            let (button, kind, x, y, modifiers) = (*button, *kind, *client_x, *client_y, *modifiers);
            self.pointer.modifiers = modifiers;
            if let Some(button) = button {
                match kind {
                    EventKind::MouseDown => {
                        self.pointer.buttons_down.insert(button);
                    }
                    EventKind::MouseUp => {
                        self.pointer.buttons_down.remove(&button);
                    }
                    _ => {}
                }
            }
            let delta = self.pointer.recompute(graph, x, y);
            let area_kind = if self.pointer.buttons_down.is_empty() {
                EventKind::PointerInArea
            } else {
                EventKind::DragInArea
            };
            for &area in &delta.entered {
                self.published.push(Message {
                    recipient: area,
                    payload: EventPayload::AreaParam { kind: area_kind, value: true },
                    emitted: true,
                });
            }
            for &area in &delta.left {
                self.published.push(Message {
                    recipient: area,
                    payload: EventPayload::AreaParam { kind: area_kind, value: false },
                    emitted: true,
                });
            }
        }

        let mut recipients = self.pointer.current_areas().iter().copied().collect::<Vec<_>>();
        if kind.requires_preceding_click() {
            recipients.retain(|a| self.last_click_recipients.contains(a));
        }

        let event = self.queue.front_mut().expect("caller checked non-empty");
        event.recipients = recipients;
        event.state = EventState::Start;
    }

    fn deliver_to_recipient(&mut self, index: usize, graph: &dyn AreaGraph) {
        let event = self.queue.front().expect("caller checked non-empty");
        let recipient = event.recipients[index];
        let payload = event.payload.clone();
        let kind = payload.kind();

        // The actual focus transfer happens in `complete_focus_and_click`
        // once the event reaches `end`; here we only suppress this
        // recipient's normal sub-type emission for this tick.
        let suppress_subtype = graph.can_receive_focus(recipient) || graph.can_handle_click(recipient);
        if kind == EventKind::Click {
            self.last_click_recipients.insert(recipient);
        }

        self.published.push(Message {
            recipient,
            payload,
            emitted: !suppress_subtype,
        });
    }

    fn complete_focus_and_click(&mut self, graph: &dyn AreaGraph) {
        let event = self.queue.front().expect("caller checked non-empty");
        if !event.payload.completes_focus() || event.recipients.is_empty() {
            return;
        }
        let candidate = event
            .recipients
            .iter()
            .copied()
            .find(|&a| graph.can_receive_focus(a) || graph.can_handle_click(a));
        let Some(candidate) = candidate else { return };

        if self.focused_input_element != Some(candidate) {
            debug!(?candidate, "focus transferred");
            self.focused_input_element = Some(candidate);
        }

        if let Some(child) = graph.clickable_child(candidate) {
            self.published.push(Message {
                recipient: child,
                payload: EventPayload::Mouse {
                    kind: EventKind::Click,
                    client_x: self.pointer.client_x,
                    client_y: self.pointer.client_y,
                    button: None,
                    modifiers: self.pointer.modifiers,
                },
                emitted: true,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoAreas;
    impl AreaGraph for NoAreas {
        fn exists(&self, _area: AreaId) -> bool {
            true
        }
        fn is_opaque(&self, _area: AreaId) -> bool {
            false
        }
        fn overlapping_areas(&self, _x: f64, _y: f64) -> Vec<AreaId> {
            Vec::new()
        }
        fn embedding(&self, _area: AreaId) -> Option<AreaId> {
            None
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

    fn mouse_move(x: f64) -> EventPayload {
        EventPayload::Mouse {
            kind: EventKind::MouseMove,
            client_x: x,
            client_y: 0.0,
            button: None,
            modifiers: crate::payload::Modifiers::default(),
        }
    }

    #[test]
    fn coalescing_replaces_the_pending_move_in_place() {
        let mut queue = EventQueue::new(Config::new());
        let first = queue.enqueue(mouse_move(1.0));
        let second = queue.enqueue(mouse_move(2.0));
        assert_eq!(first, second);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn an_event_with_no_recipients_skips_straight_to_end() {
        let graph = NoAreas;
        let mut queue = EventQueue::new(Config::new());
        queue.enqueue(mouse_move(1.0));
        queue.next_queued_event(&graph); // waiting -> start
        queue.next_queued_event(&graph); // start -> end (no recipients)
        assert_eq!(queue.queue.front().unwrap().state, EventState::End);
    }

    #[test]
    fn cancel_events_of_type_drops_only_waiting_unprotected_events() {
        let mut queue = EventQueue::new(Config::new());
        queue.enqueue(mouse_move(1.0));
        queue.cancel_events_of_type(EventKind::MouseMove);
        assert!(queue.is_empty());
    }
}
