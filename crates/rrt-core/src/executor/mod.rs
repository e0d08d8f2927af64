// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Executors: thread pools that run independent tasks to completion.
//!
//! Two strategies share one driver-facing contract ([`Executor`]):
//!
//! - [`WorkStealingExecutor`]: per-worker lock-free deques, random-victim
//!   batch stealing, no global synchronisation between tasks.
//! - [`BspExecutor`]: lock-step supersteps; the last worker to reach the
//!   barrier reconciles the previous round's outputs and deals out the next
//!   round's tasks.
//!
//! Lifecycle: `submit` every task, `execute` once, then `shutdown`, which
//! blocks until every submitted task has resolved and every worker thread has
//! been joined.

use std::sync::Arc;

use serde::Serialize;

use crate::error::ExecutorError;

mod bsp;
mod completion;
mod work_stealing;

pub use bsp::{BspConfig, BspExecutor};
pub use completion::{Completer, Completion};
pub use work_stealing::{WorkStealingConfig, WorkStealingExecutor, DEFAULT_STEAL_THRESHOLD};

/// A unit of work an executor can run on any of its threads.
pub trait Task: Send + Sync + 'static {
    /// Value produced by one run.
    type Output: Send + 'static;

    /// Runs the task to completion.
    fn run(&self) -> Self::Output;
}

/// Deferred global update applied by the BSP executor to each output during
/// the single-threaded phase between supersteps.
pub trait Reconcile {
    /// Applies the update. Called exactly once per produced output.
    fn reconcile(&self);
}

/// Driver-facing executor contract.
pub trait Executor<T: Task> {
    /// Queues `task` and returns its completion handle.
    ///
    /// Tasks are accepted only before [`Executor::execute`].
    fn submit(&mut self, task: Arc<T>) -> Result<Completion<T::Output>, ExecutorError>;

    /// Starts the worker threads. Does not block.
    fn execute(&mut self) -> Result<(), ExecutorError>;

    /// Blocks until every submitted task has resolved, then stops and joins
    /// the workers.
    fn shutdown(&mut self) -> Result<ExecutorStats, ExecutorError>;
}

/// Counters reported by [`Executor::shutdown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutorStats {
    /// Tasks that ran to completion.
    pub completed: usize,
    /// Tasks moved between workers by stealing.
    pub stolen: usize,
    /// Global synchronisation phases run (BSP only).
    pub supersteps: usize,
}

/// A submitted task together with its completion marker.
pub(crate) struct Job<T: Task> {
    task: Arc<T>,
    done: Completer<T::Output>,
}

impl<T: Task> Job<T> {
    pub(crate) fn new(task: Arc<T>) -> (Self, Completion<T::Output>) {
        let (done, handle) = completion::channel();
        (Self { task, done }, handle)
    }
}

/// Clamps a configured worker count to at least one.
pub(crate) fn clamp_workers(workers: usize) -> usize {
    workers.max(1)
}

/// Worker count matching the machine, falling back to one.
pub(crate) fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}
