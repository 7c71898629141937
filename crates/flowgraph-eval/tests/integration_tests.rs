use flowgraph_eval::{BaseEvaluator, Config, EvalHandle, EvaluationQueue, Evaluator, Priority};
use flowgraph_foundation::{IdGenerator, WatcherId};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

struct ScriptedNode {
    base: BaseEvaluator,
    priority: Priority,
    step: usize,
    order: Rc<RefCell<Vec<WatcherId>>>,
    queue: Rc<RefCell<EvaluationQueue>>,
    then_schedule: RefCell<Vec<EvalHandle>>,
}

impl Evaluator for ScriptedNode {
    fn base(&self) -> &BaseEvaluator {
        &self.base
    }
    fn schedule_priority(&self) -> Priority {
        self.priority
    }
    fn schedule_step(&self) -> usize {
        self.step
    }
    fn update_output(&mut self) {
        self.order.borrow_mut().push(self.base.watcher_id());
        for dependent in self.then_schedule.borrow_mut().drain(..) {
            self.queue.borrow_mut().schedule(dependent).unwrap();
        }
    }
}

fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(3600)
}

/// Builds a node and returns both its concrete handle (so the test can
/// script `then_schedule` before erasing it) and its watcher ID.
fn node(
    ids: &mut IdGenerator<WatcherId>,
    queue: &Rc<RefCell<EvaluationQueue>>,
    order: &Rc<RefCell<Vec<WatcherId>>>,
    priority: u32,
    step: usize,
) -> (Rc<RefCell<ScriptedNode>>, WatcherId) {
    let id = ids.alloc();
    let concrete = Rc::new(RefCell::new(ScriptedNode {
        base: BaseEvaluator::new(id),
        priority: Priority::new(priority),
        step,
        order: order.clone(),
        queue: queue.clone(),
        then_schedule: RefCell::new(Vec::new()),
    }));
    (concrete, id)
}

/// End-to-end scenario: a priority-0 node scheduled at step 5 kicks off a
/// priority-1 node mid-run; the higher-priority node must drain to
/// completion before priority 0 resumes, and the lower level picks back
/// up exactly where it left off.
#[test]
fn priority_preemption_resumes_lower_priority_afterward() {
    let mut ids = IdGenerator::new();
    let queue = Rc::new(RefCell::new(EvaluationQueue::new(
        Config::new().with_num_priorities(2),
    )));
    let order = Rc::new(RefCell::new(Vec::new()));

    let (b, b_id) = node(&mut ids, &queue, &order, 1, 0);
    let (c, c_id) = node(&mut ids, &queue, &order, 0, 6);
    let (a, a_id) = node(&mut ids, &queue, &order, 0, 5);
    a.borrow().then_schedule.borrow_mut().push(b);

    queue.borrow_mut().schedule(a).unwrap();
    queue.borrow_mut().schedule(c).unwrap();

    let completed = EvaluationQueue::run_queue(&queue, Priority::new(0), far_future(), |_, _| {});

    assert!(completed);
    assert_eq!(*order.borrow(), vec![a_id, b_id, c_id]);
}

/// A node that nobody re-schedules during the cycle following its own run
/// must not run again when the queue is drained a second time.
#[test]
fn node_does_not_rerun_without_a_fresh_schedule() {
    let mut ids = IdGenerator::new();
    let queue = Rc::new(RefCell::new(EvaluationQueue::new(Config::new())));
    let order = Rc::new(RefCell::new(Vec::new()));
    let (a, _) = node(&mut ids, &queue, &order, 0, 0);

    queue.borrow_mut().schedule(a).unwrap();
    EvaluationQueue::run_queue(&queue, Priority::new(0), far_future(), |_, _| {});
    assert_eq!(order.borrow().len(), 1);

    let completed = EvaluationQueue::run_queue(&queue, Priority::new(0), far_future(), |_, _| {});
    assert!(completed);
    assert_eq!(order.borrow().len(), 1);
}

/// Latching the same node twice in a cycle releases it exactly once.
#[test]
fn latch_idempotence_across_one_cycle() {
    use flowgraph_eval::Writable;

    struct CountingWritable {
        id: WatcherId,
        released: RefCell<u32>,
    }
    impl Writable for CountingWritable {
        fn watcher_id(&self) -> WatcherId {
            self.id
        }
        fn release(&mut self) {
            *self.released.borrow_mut() += 1;
        }
    }

    let mut ids = IdGenerator::<WatcherId>::new();
    let mut queue = EvaluationQueue::new(Config::new());
    let counting_node = Rc::new(RefCell::new(CountingWritable {
        id: ids.alloc(),
        released: RefCell::new(0),
    }));
    queue.latch(counting_node.clone());
    queue.latch(counting_node.clone());
    queue.commit_writes();
    assert_eq!(*counting_node.borrow().released.borrow(), 1);
}

/// `run_until` must stop as soon as its target is withdrawn, even when
/// the withdrawal is not the target's own doing.
#[test]
fn run_until_stops_when_target_withdrawn_by_another_node() {
    let mut ids = IdGenerator::new();
    let queue = Rc::new(RefCell::new(EvaluationQueue::new(Config::new())));
    let order = Rc::new(RefCell::new(Vec::new()));

    let (target, _) = node(&mut ids, &queue, &order, 0, 1);
    let target_handle: EvalHandle = target.clone();

    let (withdrawer, _) = node(&mut ids, &queue, &order, 0, 0);

    queue.borrow_mut().schedule(withdrawer).unwrap();
    queue.borrow_mut().schedule(target_handle.clone()).unwrap();

    // Drain the withdrawer's step (priority 0, step 0), then withdraw the
    // target before its own step runs.
    let deadline = far_future();
    EvaluationQueue::run_until(&queue, &target_handle, deadline, |_, step| {
        if step == 0 {
            queue.borrow_mut().unschedule(&target_handle).unwrap();
        }
    });

    assert!(!target_handle.borrow().base().is_scheduled());
}
