//! Cross-subsystem scenarios driving evaluation, indexing, and event
//! delivery through one [`Runtime`].

use flowgraph_eval::{BaseEvaluator, EvalHandle, EvaluationQueue, Evaluator, Priority};
use flowgraph_events::{AreaGraph, EventKind, EventPayload, Modifiers, MouseButton};
use flowgraph_foundation::{AreaId, ElementId, IdGenerator, WatcherId};
use flowgraph_index::Key;
use flowgraph_runtime::{Runtime, RuntimeConfig};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use web_time::Instant;

fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(3600)
}

/// A node that just records that it ran.
struct WritesKey {
    base: BaseEvaluator,
    ran: Rc<RefCell<bool>>,
}

impl Evaluator for WritesKey {
    fn base(&self) -> &BaseEvaluator {
        &self.base
    }
    fn schedule_priority(&self) -> Priority {
        Priority::new(0)
    }
    fn schedule_step(&self) -> usize {
        0
    }
    fn update_output(&mut self) {
        *self.ran.borrow_mut() = true;
    }
}

/// A single-area fixture: one area that always overlaps the test point
/// and can receive focus.
struct SingleArea(AreaId);

impl AreaGraph for SingleArea {
    fn exists(&self, _area: AreaId) -> bool {
        true
    }
    fn is_opaque(&self, _area: AreaId) -> bool {
        false
    }
    fn overlapping_areas(&self, _x: f64, _y: f64) -> Vec<AreaId> {
        vec![self.0]
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
        true
    }
    fn can_handle_click(&self, _area: AreaId) -> bool {
        false
    }
    fn has_active_input(&self, _area: AreaId) -> bool {
        true
    }
}

/// A full tick: schedule a node, run a cycle, and check the cycle counter
/// only advances once the drain actually settles.
#[test]
fn run_cycle_advances_the_cycle_counter_once_settled() {
    let mut runtime = Runtime::new(RuntimeConfig::default());
    let mut ids = IdGenerator::<WatcherId>::new();
    let ran = Rc::new(RefCell::new(false));

    let node: EvalHandle = Rc::new(RefCell::new(WritesKey {
        base: BaseEvaluator::new(ids.alloc()),
        ran: ran.clone(),
    }));
    runtime.eval_queue().borrow_mut().schedule(node).unwrap();

    let cycle_before = runtime.eval_queue().borrow().cycle();
    let settled = runtime.run_cycle(Priority::new(0), far_future()).unwrap();

    assert!(settled);
    assert!(*ran.borrow());
    assert_eq!(runtime.eval_queue().borrow().cycle(), cycle_before + 1);
}

/// Indexed writes registered before a cycle settles are visible to the
/// indexer's own epilogue accounting, and the epilogue runs exactly once
/// per settled cycle.
#[test]
fn indexer_epilogue_runs_as_part_of_the_cycle() {
    let mut runtime = Runtime::new(RuntimeConfig::default());

    let path_id = runtime.indexer_mut().add_path(vec!["area".into(), "width".into()]);
    let element_id = ElementId::new(1);
    runtime
        .indexer_mut()
        .add_data_element_node(element_id, path_id, None)
        .unwrap();
    runtime
        .indexer_mut()
        .set_key_value(path_id, element_id, "number", Key::Int(42))
        .unwrap();

    let settled = runtime.run_cycle(Priority::new(0), far_future()).unwrap();
    assert!(settled);
    assert!(!runtime.indexer().is_node_active(path_id, element_id, false));
}

/// A mousedown delivered through `drain_events` transfers focus to the
/// single focusable area once the event reaches `done`, matching the
/// event queue's own completion contract.
#[test]
fn drain_events_settles_focus_transfer() {
    let mut runtime = Runtime::new(RuntimeConfig::default());
    let area = AreaId::new(1);
    let graph = SingleArea(area);

    runtime.events_mut().enqueue(EventPayload::Mouse {
        kind: EventKind::MouseDown,
        client_x: 1.0,
        client_y: 1.0,
        button: Some(MouseButton::Left),
        modifiers: Modifiers::default(),
    });

    let drained = runtime.drain_events(&graph, far_future());
    assert!(drained);
    assert_eq!(runtime.events().focused_input_element(), Some(area));
}

/// `run_to_quiescence` keeps cycling until the eval queue is fully
/// drained, even when a node reschedules a second node mid-cycle.
#[test]
fn run_to_quiescence_drains_a_chain_of_rescheduling_nodes() {
    let mut runtime = Runtime::new(RuntimeConfig::default());
    let mut ids = IdGenerator::<WatcherId>::new();
    let order: Rc<RefCell<Vec<WatcherId>>> = Rc::new(RefCell::new(Vec::new()));

    struct Chained {
        base: BaseEvaluator,
        order: Rc<RefCell<Vec<WatcherId>>>,
        next: RefCell<Option<EvalHandle>>,
        queue: Rc<RefCell<EvaluationQueue>>,
    }
    impl Evaluator for Chained {
        fn base(&self) -> &BaseEvaluator {
            &self.base
        }
        fn schedule_priority(&self) -> Priority {
            Priority::new(0)
        }
        fn schedule_step(&self) -> usize {
            0
        }
        fn update_output(&mut self) {
            self.order.borrow_mut().push(self.base.watcher_id());
            if let Some(next) = self.next.borrow_mut().take() {
                self.queue.borrow_mut().schedule(next).unwrap();
            }
        }
    }

    let second: EvalHandle = Rc::new(RefCell::new(Chained {
        base: BaseEvaluator::new(ids.alloc()),
        order: order.clone(),
        next: RefCell::new(None),
        queue: runtime.eval_queue().clone(),
    }));
    let second_id = second.borrow().base().watcher_id();

    let first: EvalHandle = Rc::new(RefCell::new(Chained {
        base: BaseEvaluator::new(ids.alloc()),
        order: order.clone(),
        next: RefCell::new(Some(second.clone())),
        queue: runtime.eval_queue().clone(),
    }));
    let first_id = first.borrow().base().watcher_id();

    runtime.eval_queue().borrow_mut().schedule(first).unwrap();
    runtime.run_to_quiescence(far_future()).unwrap();

    assert_eq!(*order.borrow(), vec![first_id, second_id]);
}

