// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Work-stealing executor.
//!
//! Submitted tasks live in a shared arena; the per-worker deques carry only
//! arena indices. Each index is pushed exactly once and the deque hands every
//! pushed index to exactly one popper, so each arena slot is taken once and
//! its lock is never contended.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::{clamp_workers, default_workers, Completion, Executor, ExecutorStats, Job, Task};
use crate::deque::{deque, Stealer, Worker};
use crate::error::ExecutorError;
use crate::milestone::lock;

/// Default upper bound on items moved by one steal.
pub const DEFAULT_STEAL_THRESHOLD: usize = 100;

/// Work-stealing pool parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkStealingConfig {
    /// Number of worker threads (at least one).
    pub workers: usize,
    /// Maximum number of tasks moved by a single steal.
    pub steal_threshold: usize,
}

impl WorkStealingConfig {
    /// Creates a config; zero values are clamped to one.
    pub fn new(workers: usize, steal_threshold: usize) -> Self {
        Self {
            workers: clamp_workers(workers),
            steal_threshold: steal_threshold.max(1),
        }
    }
}

impl Default for WorkStealingConfig {
    fn default() -> Self {
        Self::new(default_workers(), DEFAULT_STEAL_THRESHOLD)
    }
}

#[derive(Debug, Default)]
struct Progress {
    outstanding: usize,
    panicked: Option<usize>,
}

struct Shared<T: Task> {
    jobs: Box<[Mutex<Option<Job<T>>>]>,
    stealers: Vec<Stealer<usize>>,
    steal_threshold: usize,
    progress: Mutex<Progress>,
    settled: Condvar,
    stop: AtomicBool,
    completed: AtomicUsize,
    stolen: AtomicUsize,
}

impl<T: Task> Shared<T> {
    fn run(&self, worker: usize, index: usize) {
        let Some(job) = self.jobs.get(index).and_then(|slot| lock(slot).take()) else {
            return;
        };
        let Job { task, done } = job;
        match catch_unwind(AssertUnwindSafe(|| task.run())) {
            Ok(output) => {
                done.fire(output);
                self.completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                warn!(worker, "task panicked");
                // Dropping `done` resolves the handle as abandoned.
                drop(done);
                lock(&self.progress).panicked.get_or_insert(worker);
            }
        }

        let mut progress = lock(&self.progress);
        progress.outstanding = progress.outstanding.saturating_sub(1);
        if progress.outstanding == 0 {
            self.settled.notify_all();
        }
    }

    /// Moves up to `steal_threshold` indices from a random peer into `local`.
    fn steal_into<R: Rng>(&self, worker: usize, local: &Worker<usize>, rng: &mut R) {
        let peers = self.stealers.len();
        if peers < 2 {
            return;
        }
        let mut victim = rng.gen_range(0..peers - 1);
        if victim >= worker {
            victim += 1;
        }

        let mut moved = 0;
        while moved < self.steal_threshold {
            let Some(index) = self.stealers[victim].pop_top() else {
                break;
            };
            moved += 1;
            if let Err(err) = local.push_bottom(index) {
                warn!(worker, %err, "local deque full, running stolen task in place");
                self.run(worker, index);
            }
        }
        if moved > 0 {
            self.stolen.fetch_add(moved, Ordering::Relaxed);
            trace!(worker, victim, moved, "stole batch");
        }
    }
}

fn worker_loop<T: Task>(worker: usize, local: Worker<usize>, shared: Arc<Shared<T>>) {
    let mut rng = rand::thread_rng();
    while !shared.stop.load(Ordering::Acquire) {
        if local.is_empty() {
            shared.steal_into(worker, &local, &mut rng);
        }
        match local.pop_bottom() {
            Some(index) => shared.run(worker, index),
            None => thread::yield_now(),
        }
    }
}

/// Executor that balances load by random-victim batch stealing.
///
/// Tasks are dealt round-robin to the workers' deques at submission. Workers
/// pop locally (LIFO) and, once empty, steal the oldest tasks of a random
/// peer.
pub struct WorkStealingExecutor<T: Task> {
    config: WorkStealingConfig,
    queues: Vec<Worker<usize>>,
    staged: Vec<Job<T>>,
    started: bool,
    shared: Option<Arc<Shared<T>>>,
    handles: Vec<JoinHandle<()>>,
}

impl<T: Task> WorkStealingExecutor<T> {
    /// Creates an idle pool; no thread starts before [`Executor::execute`].
    pub fn new(config: WorkStealingConfig) -> Self {
        let config = WorkStealingConfig::new(config.workers, config.steal_threshold);
        Self {
            queues: (0..config.workers).map(|_| deque().0).collect(),
            config,
            staged: Vec::new(),
            started: false,
            shared: None,
            handles: Vec::new(),
        }
    }

    /// The effective (clamped) configuration.
    pub fn config(&self) -> WorkStealingConfig {
        self.config
    }

    fn stop_and_join(&mut self) -> Result<(), ExecutorError> {
        if let Some(shared) = &self.shared {
            shared.stop.store(true, Ordering::Release);
        }
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

impl<T: Task> Executor<T> for WorkStealingExecutor<T> {
    fn submit(&mut self, task: Arc<T>) -> Result<Completion<T::Output>, ExecutorError> {
        if self.started {
            return Err(ExecutorError::AlreadyStarted);
        }
        let index = self.staged.len();
        self.queues[index % self.queues.len()].push_bottom(index)?;
        let (job, handle) = Job::new(task);
        self.staged.push(job);
        Ok(handle)
    }

    fn execute(&mut self) -> Result<(), ExecutorError> {
        if self.started {
            return Err(ExecutorError::AlreadyStarted);
        }
        // Latched first: the queues leave with the workers, even on failure.
        self.started = true;
        let jobs: Box<[_]> = self.staged.drain(..).map(|job| Mutex::new(Some(job))).collect();
        let shared = Arc::new(Shared {
            progress: Mutex::new(Progress {
                outstanding: jobs.len(),
                panicked: None,
            }),
            jobs,
            stealers: self.queues.iter().map(Worker::stealer).collect(),
            steal_threshold: self.config.steal_threshold,
            settled: Condvar::new(),
            stop: AtomicBool::new(false),
            completed: AtomicUsize::new(0),
            stolen: AtomicUsize::new(0),
        });
        debug!(
            workers = self.config.workers,
            tasks = shared.jobs.len(),
            steal_threshold = self.config.steal_threshold,
            "work-stealing executor starting"
        );
        self.shared = Some(Arc::clone(&shared));

        let queues = std::mem::take(&mut self.queues);
        for (worker, local) in queues.into_iter().enumerate() {
            let shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("rrt-ws-{worker}"))
                .spawn(move || worker_loop(worker, local, shared));
            match spawned {
                Ok(handle) => self.handles.push(handle),
                Err(err) => {
                    // Unspawned workers' tasks can never run: tear the pool
                    // down so their handles resolve as abandoned.
                    let _ = self.stop_and_join();
                    self.shared = None;
                    return Err(ExecutorError::Spawn(err));
                }
            }
        }
        Ok(())
    }

    fn shutdown(&mut self) -> Result<ExecutorStats, ExecutorError> {
        let Some(shared) = self.shared.clone() else {
            return match self.staged.len() {
                0 => Ok(ExecutorStats::default()),
                pending => Err(ExecutorError::NotStarted { pending }),
            };
        };

        let panicked = {
            let mut progress = lock(&shared.progress);
            while progress.outstanding > 0 {
                progress = shared
                    .settled
                    .wait(progress)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            progress.panicked
        };
        self.stop_and_join()?;

        let stats = ExecutorStats {
            completed: shared.completed.load(Ordering::Relaxed),
            stolen: shared.stolen.load(Ordering::Relaxed),
            supersteps: 0,
        };
        debug!(
            completed = stats.completed,
            stolen = stats.stolen,
            "work-stealing executor stopped"
        );
        match panicked {
            Some(worker) => Err(ExecutorError::WorkerPanicked { worker }),
            None => Ok(stats),
        }
    }
}

impl<T: Task> Drop for WorkStealingExecutor<T> {
    fn drop(&mut self) {
        // Unrun jobs are dropped with the arena and resolve as abandoned.
        let _ = self.stop_and_join();
    }
}
