// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Executor contract tests: exactly-once execution, shutdown semantics and
//! the BSP run/reconcile ordering.
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rrt_core::{
    BspConfig, BspExecutor, Executor, ExecutorError, Reconcile, Task, WorkStealingConfig,
    WorkStealingExecutor,
};

/// Counts how often it runs.
struct Counting {
    runs: AtomicUsize,
    pause: Duration,
}

impl Counting {
    fn new(pause: Duration) -> Arc<Self> {
        Arc::new(Self {
            runs: AtomicUsize::new(0),
            pause,
        })
    }
}

/// Run number observed by a [`Counting`] task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Count(usize);

impl Reconcile for Count {
    fn reconcile(&self) {}
}

impl Task for Counting {
    type Output = Count;

    fn run(&self) -> Count {
        if !self.pause.is_zero() {
            thread::sleep(self.pause);
        }
        Count(self.runs.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Run(usize),
    Reconciled(usize),
}

type Log = Arc<Mutex<Vec<Event>>>;

/// Output that logs when it is reconciled.
#[derive(Clone)]
struct Tracer {
    id: usize,
    log: Log,
}

impl Reconcile for Tracer {
    fn reconcile(&self) {
        self.log.lock().unwrap().push(Event::Reconciled(self.id));
    }
}

struct Traced {
    id: usize,
    log: Log,
}

impl Task for Traced {
    type Output = Tracer;

    fn run(&self) -> Tracer {
        self.log.lock().unwrap().push(Event::Run(self.id));
        Tracer {
            id: self.id,
            log: Arc::clone(&self.log),
        }
    }
}

struct Explode;

impl Task for Explode {
    type Output = Count;

    fn run(&self) -> Count {
        panic!("task failure under test");
    }
}

fn run_bsp_traced(workers: usize, tasks: usize) -> Vec<Event> {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let mut pool = BspExecutor::new(BspConfig::new(workers));
    let handles: Vec<_> = (0..tasks)
        .map(|id| {
            pool.submit(Arc::new(Traced {
                id,
                log: Arc::clone(&log),
            }))
            .expect("submit")
        })
        .collect();
    pool.execute().expect("execute");
    let stats = pool.shutdown().expect("shutdown");
    assert_eq!(stats.completed, tasks);
    for (id, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.wait().expect("completed").id, id);
    }
    let events = log.lock().unwrap().clone();
    events
}

#[test]
fn work_stealing_runs_each_task_exactly_once() {
    let tasks: Vec<_> = (0..1_000).map(|_| Counting::new(Duration::ZERO)).collect();
    let mut pool = WorkStealingExecutor::new(WorkStealingConfig::new(4, 8));
    let handles: Vec<_> = tasks
        .iter()
        .map(|t| pool.submit(Arc::clone(t)).expect("submit"))
        .collect();
    pool.execute().expect("execute");
    let stats = pool.shutdown().expect("shutdown");

    assert_eq!(stats.completed, 1_000);
    for (task, handle) in tasks.iter().zip(handles) {
        assert_eq!(handle.wait().expect("completed"), Count(1));
        assert_eq!(task.runs.load(Ordering::SeqCst), 1);
    }
}

#[test]
fn idle_workers_steal_from_loaded_peers() {
    // Round-robin dealing puts every slow task on worker 0; the others drain
    // their instant tasks and then have to steal.
    let tasks: Vec<_> = (0..64)
        .map(|i| {
            let pause = if i % 4 == 0 { 5 } else { 0 };
            Counting::new(Duration::from_millis(pause))
        })
        .collect();
    let mut pool = WorkStealingExecutor::new(WorkStealingConfig::new(4, 2));
    for task in &tasks {
        let _ = pool.submit(Arc::clone(task)).expect("submit");
    }
    pool.execute().expect("execute");
    let stats = pool.shutdown().expect("shutdown");
    assert_eq!(stats.completed, 64);
    assert!(stats.stolen > 0, "no task changed hands");
    assert!(tasks.iter().all(|t| t.runs.load(Ordering::SeqCst) == 1));
}

#[test]
fn shutdown_returns_only_after_every_completion_fired() {
    for workers in [1, 3] {
        let mut pool = WorkStealingExecutor::new(WorkStealingConfig::new(workers, 4));
        let handles: Vec<_> = (0..50)
            .map(|_| {
                pool.submit(Counting::new(Duration::from_micros(200)))
                    .expect("submit")
            })
            .collect();
        pool.execute().expect("execute");
        pool.shutdown().expect("shutdown");
        assert!(handles.iter().all(rrt_core::Completion::is_complete));

        let mut pool = BspExecutor::new(BspConfig::new(workers));
        let handles: Vec<_> = (0..50)
            .map(|_| {
                pool.submit(Counting::new(Duration::from_micros(200)))
                    .expect("submit")
            })
            .collect();
        pool.execute().expect("execute");
        pool.shutdown().expect("shutdown");
        assert!(handles.iter().all(rrt_core::Completion::is_complete));
    }
}

#[test]
fn lifecycle_misuse_is_reported() {
    let mut pool = WorkStealingExecutor::new(WorkStealingConfig::new(2, 4));
    let _ = pool.submit(Counting::new(Duration::ZERO)).expect("submit");
    assert!(matches!(
        pool.shutdown(),
        Err(ExecutorError::NotStarted { pending: 1 })
    ));
    pool.execute().expect("execute");
    assert!(matches!(
        pool.submit(Counting::new(Duration::ZERO)),
        Err(ExecutorError::AlreadyStarted)
    ));
    assert!(matches!(pool.execute(), Err(ExecutorError::AlreadyStarted)));
    assert_eq!(pool.shutdown().expect("shutdown").completed, 1);

    let mut pool: BspExecutor<Counting> = BspExecutor::new(BspConfig::new(2));
    assert_eq!(pool.shutdown().expect("nothing submitted").completed, 0);
}

#[test]
fn panicking_task_is_abandoned_and_reported() {
    let mut pool = WorkStealingExecutor::<Explode>::new(WorkStealingConfig::new(2, 4));
    let boom = pool.submit(Arc::new(Explode)).expect("submit");
    pool.execute().expect("execute");
    assert!(matches!(
        pool.shutdown(),
        Err(ExecutorError::WorkerPanicked { .. })
    ));
    assert!(matches!(boom.wait(), Err(ExecutorError::Abandoned)));

    let mut pool = BspExecutor::<Explode>::new(BspConfig::new(2));
    let boom = pool.submit(Arc::new(Explode)).expect("submit");
    pool.execute().expect("execute");
    assert!(matches!(
        pool.shutdown(),
        Err(ExecutorError::WorkerPanicked { .. })
    ));
    assert!(matches!(boom.wait(), Err(ExecutorError::Abandoned)));
}

#[test]
fn bsp_single_worker_alternates_run_and_reconcile_newest_first() {
    let events = run_bsp_traced(1, 3);
    assert_eq!(
        events,
        vec![
            Event::Run(2),
            Event::Reconciled(2),
            Event::Run(1),
            Event::Reconciled(1),
            Event::Run(0),
            Event::Reconciled(0),
        ]
    );
}

#[test]
fn bsp_reconciles_each_round_before_the_next_runs() {
    const WORKERS: usize = 4;
    const TASKS: usize = 30;

    let events = run_bsp_traced(WORKERS, TASKS);
    assert_eq!(events.len(), 2 * TASKS);

    // Tasks are dealt newest first, WORKERS per round.
    let round_of = |id: usize| (TASKS - 1 - id) / WORKERS;
    let position = |wanted: Event| events.iter().position(|e| *e == wanted).unwrap();

    for id in 0..TASKS {
        let ran = position(Event::Run(id));
        let reconciled = position(Event::Reconciled(id));
        assert!(ran < reconciled, "task {id} reconciled before it ran");
        for later in (0..TASKS).filter(|&other| round_of(other) == round_of(id) + 1) {
            assert!(
                reconciled < position(Event::Run(later)),
                "task {later} ran before round {} was reconciled",
                round_of(id)
            );
        }
    }
    let reconciled = events
        .iter()
        .filter(|e| matches!(e, Event::Reconciled(_)))
        .count();
    assert_eq!(reconciled, TASKS);
}
