// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Bulk-synchronous executor.
//!
//! Workers run in lock-step supersteps. Each round every worker runs at most
//! one task, then waits at the barrier. The last worker to arrive runs the
//! global phase alone:
//!
//! 1. reconcile every output recorded in the previous round;
//! 2. deal the next tasks to the per-worker slots, most recently submitted
//!    first;
//! 3. raise the shutdown flag once nothing is left to deal.
//!
//! Outputs of the final round are reconciled by [`Executor::shutdown`] after
//! the workers have been joined, so every output is reconciled exactly once.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::{clamp_workers, default_workers, Completion, Executor, ExecutorStats, Job, Reconcile, Task};
use crate::error::ExecutorError;
use crate::milestone::lock;

/// BSP pool parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BspConfig {
    /// Number of worker threads (at least one).
    pub workers: usize,
}

impl BspConfig {
    /// Creates a config; zero workers is clamped to one.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: clamp_workers(workers),
        }
    }
}

impl Default for BspConfig {
    fn default() -> Self {
        Self::new(default_workers())
    }
}

/// Everything the barrier protects.
struct RoundState<T: Task> {
    waiting: usize,
    generation: u64,
    pending: Vec<Job<T>>,
    current: Vec<Option<Job<T>>>,
    results: Vec<Option<T::Output>>,
    shutdown: bool,
    supersteps: usize,
    completed: usize,
    panicked: Option<usize>,
}

impl<T: Task> RoundState<T>
where
    T::Output: Reconcile,
{
    /// Reconciles and clears every recorded output; returns how many.
    fn reconcile(&mut self) -> usize {
        let mut reconciled = 0;
        for output in self.results.iter_mut().filter_map(Option::take) {
            output.reconcile();
            reconciled += 1;
        }
        reconciled
    }

    /// The single-threaded global phase between two rounds.
    fn superstep(&mut self) {
        let reconciled = self.reconcile();
        let mut assigned = 0;
        for slot in &mut self.current {
            let Some(job) = self.pending.pop() else {
                break;
            };
            *slot = Some(job);
            assigned += 1;
        }
        if self.pending.is_empty() {
            self.shutdown = true;
        }
        self.supersteps += 1;
        debug!(
            round = self.supersteps,
            assigned,
            reconciled,
            remaining = self.pending.len(),
            "bsp superstep"
        );
    }
}

/// Shared context handed to every BSP worker.
struct BspContext<T: Task> {
    workers: usize,
    round: Mutex<RoundState<T>>,
    barrier: Condvar,
}

impl<T: Task> BspContext<T> {
    fn lock(&self) -> MutexGuard<'_, RoundState<T>> {
        lock(&self.round)
    }

    /// Drops undealt tasks and releases every worker for good.
    fn abort(&self) {
        let mut round = self.lock();
        round.pending.clear();
        round.shutdown = true;
        self.barrier.notify_all();
    }
}

impl<T: Task> BspContext<T>
where
    T::Output: Clone + Reconcile,
{
    /// Barrier: blocks until every worker has arrived, then returns this
    /// worker's task for the next round and whether it is the last round.
    fn sync(&self, worker: usize) -> (Option<Job<T>>, bool) {
        let mut round = self.lock();
        if round.shutdown {
            // Only reachable after an abort.
            return (None, true);
        }
        if round.waiting + 1 < self.workers {
            round.waiting += 1;
            let generation = round.generation;
            while round.generation == generation && !round.shutdown {
                round = self
                    .barrier
                    .wait(round)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        } else {
            trace!(worker, "last at barrier, running superstep");
            round.superstep();
            round.waiting = 0;
            round.generation = round.generation.wrapping_add(1);
            self.barrier.notify_all();
        }
        let job = round.current.get_mut(worker).and_then(Option::take);
        (job, round.shutdown)
    }

    fn run(&self, worker: usize, job: Job<T>) {
        let Job { task, done } = job;
        match catch_unwind(AssertUnwindSafe(|| task.run())) {
            Ok(output) => {
                done.fire(output.clone());
                let mut round = self.lock();
                round.results[worker] = Some(output);
                round.completed += 1;
            }
            Err(_) => {
                warn!(worker, "task panicked");
                drop(done);
                self.lock().panicked.get_or_insert(worker);
            }
        }
    }
}

fn worker_loop<T: Task>(worker: usize, context: Arc<BspContext<T>>)
where
    T::Output: Clone + Reconcile,
{
    loop {
        let (job, last) = context.sync(worker);
        if let Some(job) = job {
            context.run(worker, job);
        }
        if last {
            break;
        }
    }
}

/// Executor that runs tasks in barrier-separated supersteps.
///
/// Outputs are reconciled ([`Reconcile::reconcile`]) during the global phase
/// that follows the round that produced them, before any task of the next
/// round starts.
pub struct BspExecutor<T: Task> {
    config: BspConfig,
    pending: Vec<Job<T>>,
    started: bool,
    context: Option<Arc<BspContext<T>>>,
    handles: Vec<JoinHandle<()>>,
}

impl<T: Task> BspExecutor<T>
where
    T::Output: Clone + Reconcile,
{
    /// Creates an idle pool; no thread starts before [`Executor::execute`].
    pub fn new(config: BspConfig) -> Self {
        Self {
            config: BspConfig::new(config.workers),
            pending: Vec::new(),
            started: false,
            context: None,
            handles: Vec::new(),
        }
    }

    /// The effective (clamped) configuration.
    pub fn config(&self) -> BspConfig {
        self.config
    }

    fn join(&mut self) -> Result<(), ExecutorError> {
        let mut failed = None;
        for (worker, handle) in self.handles.drain(..).enumerate() {
            if handle.join().is_err() {
                failed.get_or_insert(worker);
            }
        }
        match failed {
            Some(worker) => Err(ExecutorError::WorkerPanicked { worker }),
            None => Ok(()),
        }
    }
}

impl<T: Task> Executor<T> for BspExecutor<T>
where
    T::Output: Clone + Reconcile,
{
    fn submit(&mut self, task: Arc<T>) -> Result<Completion<T::Output>, ExecutorError> {
        if self.started {
            return Err(ExecutorError::AlreadyStarted);
        }
        let (job, handle) = Job::new(task);
        self.pending.push(job);
        Ok(handle)
    }

    fn execute(&mut self) -> Result<(), ExecutorError> {
        if self.started {
            return Err(ExecutorError::AlreadyStarted);
        }
        // Latched first: a failed start cannot be retried.
        self.started = true;
        let workers = self.config.workers;
        let context = Arc::new(BspContext {
            workers,
            round: Mutex::new(RoundState {
                waiting: 0,
                generation: 0,
                pending: std::mem::take(&mut self.pending),
                current: (0..workers).map(|_| None).collect(),
                results: (0..workers).map(|_| None).collect(),
                shutdown: false,
                supersteps: 0,
                completed: 0,
                panicked: None,
            }),
            barrier: Condvar::new(),
        });
        debug!(
            workers,
            tasks = context.lock().pending.len(),
            "bsp executor starting"
        );
        self.context = Some(Arc::clone(&context));

        for worker in 0..workers {
            let worker_context = Arc::clone(&context);
            let spawned = thread::Builder::new()
                .name(format!("rrt-bsp-{worker}"))
                .spawn(move || worker_loop(worker, worker_context));
            match spawned {
                Ok(handle) => self.handles.push(handle),
                Err(err) => {
                    // The barrier can never fill without this worker.
                    context.abort();
                    let _ = self.join();
                    self.context = None;
                    return Err(ExecutorError::Spawn(err));
                }
            }
        }
        Ok(())
    }

    fn shutdown(&mut self) -> Result<ExecutorStats, ExecutorError> {
        let Some(context) = self.context.clone() else {
            return match self.pending.len() {
                0 => Ok(ExecutorStats::default()),
                pending => Err(ExecutorError::NotStarted { pending }),
            };
        };
        self.join()?;

        let mut round = context.lock();
        let trailing = round.reconcile();
        let stats = ExecutorStats {
            completed: round.completed,
            stolen: 0,
            supersteps: round.supersteps,
        };
        debug!(
            completed = stats.completed,
            supersteps = stats.supersteps,
            trailing,
            "bsp executor stopped"
        );
        match round.panicked {
            Some(worker) => Err(ExecutorError::WorkerPanicked { worker }),
            None => Ok(stats),
        }
    }
}

impl<T: Task> Drop for BspExecutor<T> {
    fn drop(&mut self) {
        if let Some(context) = &self.context {
            context.abort();
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}
