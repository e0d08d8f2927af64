// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use thiserror::Error;

/// Failure to grow a [`crate::deque::Worker`].
///
/// Growth failure is resource exhaustion and is terminal for the run.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DequeError {
    /// The ring has already doubled the maximum number of times.
    #[error("deque cannot grow beyond {max_capacity} slots")]
    CapacityExhausted {
        /// Largest capacity the deque supports.
        max_capacity: usize,
    },
}

/// Errors surfaced by the executors.
///
/// Optimistic conflicts and lost steal races are not errors and never appear
/// here; they are retried where they happen.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// `submit` or `execute` was called after `execute`.
    #[error("executor already started")]
    AlreadyStarted,
    /// `shutdown` was called with submitted work but without `execute`.
    #[error("executor has {pending} submitted task(s) but was never started")]
    NotStarted {
        /// Number of tasks that will never run.
        pending: usize,
    },
    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
    /// A worker thread unwound while running a task.
    #[error("worker {worker} panicked")]
    WorkerPanicked {
        /// Index of the worker that panicked.
        worker: usize,
    },
    /// A task queue could not grow.
    #[error(transparent)]
    Deque(#[from] DequeError),
    /// The task behind a completion handle was dropped without running.
    #[error("task was dropped before it completed")]
    Abandoned,
}

/// Errors surfaced by [`crate::planner::plan`].
#[derive(Debug, Error)]
pub enum PlanError {
    /// The configuration space failed validation.
    #[error("invalid configuration space: {0}")]
    Config(#[from] rrt_geom::GeomError),
    /// The executor failed.
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}
