// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Planner driver: build the tree, pick a strategy, run every update task.

use std::sync::Arc;

use rrt_geom::ConfigSpace;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{ExecutorError, PlanError};
use crate::executor::{
    BspConfig, BspExecutor, Executor, ExecutorStats, WorkStealingConfig, WorkStealingExecutor,
    DEFAULT_STEAL_THRESHOLD,
};
use crate::rewire::CostUpdate;
use crate::tree::PathTree;
use crate::update::UpdateTask;

/// How update tasks are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    /// Every task runs inline on the calling thread.
    #[default]
    Sequential,
    /// Work-stealing pool; tasks propagate their own cost changes.
    WorkStealing {
        /// Worker threads.
        workers: usize,
        /// Maximum tasks moved per steal.
        #[serde(default = "default_steal_threshold")]
        steal_threshold: usize,
    },
    /// Bulk-synchronous pool; samples are committed between supersteps, so a
    /// fixed seed and worker count always grow the same tree.
    Bsp {
        /// Worker threads.
        workers: usize,
    },
}

fn default_steal_threshold() -> usize {
    DEFAULT_STEAL_THRESHOLD
}

impl Strategy {
    /// How tasks run under this strategy must handle cost propagation.
    pub fn cost_update(&self) -> CostUpdate {
        match self {
            Self::Sequential | Self::WorkStealing { .. } => CostUpdate::Inline,
            Self::Bsp { .. } => CostUpdate::Deferred,
        }
    }
}

/// One planning run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Number of update tasks (samples) to run.
    pub samples: usize,
    /// Scheduling strategy.
    #[serde(default)]
    pub strategy: Strategy,
    /// Base seed; fresh entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Result of [`plan`].
#[derive(Debug)]
pub struct PlanOutcome {
    /// The final tree.
    pub tree: Arc<PathTree>,
    /// Executor counters (`completed == samples` for the sequential strategy).
    pub stats: ExecutorStats,
}

/// Seed of the `index`-th task, derived from the run's base seed.
///
/// SplitMix64 finaliser over `base + index * golden-ratio`, so neighbouring
/// indices get unrelated streams.
pub fn seed_for(base: u64, index: usize) -> u64 {
    let mut z = base.wrapping_add((index as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Grows an RRT* tree over `space` with `config.samples` update tasks.
#[instrument(skip_all, fields(samples = config.samples, strategy = ?config.strategy))]
pub fn plan(space: ConfigSpace, config: &PlannerConfig) -> Result<PlanOutcome, PlanError> {
    space.validate()?;
    let tree = Arc::new(PathTree::new(space));
    let base = config.seed.unwrap_or_else(rand::random);
    let update = config.strategy.cost_update();

    let stats = match config.strategy {
        Strategy::Sequential => {
            for index in 0..config.samples {
                UpdateTask::new(Arc::clone(&tree), update, seed_for(base, index)).grow();
            }
            ExecutorStats {
                completed: config.samples,
                ..ExecutorStats::default()
            }
        }
        Strategy::WorkStealing {
            workers,
            steal_threshold,
        } => drive(
            WorkStealingExecutor::new(WorkStealingConfig::new(workers, steal_threshold)),
            &tree,
            update,
            config.samples,
            base,
        )?,
        Strategy::Bsp { workers } => drive(
            BspExecutor::new(BspConfig::new(workers)),
            &tree,
            update,
            config.samples,
            base,
        )?,
    };

    info!(
        milestones = tree.len(),
        goal_cost = ?tree.goal_cost(),
        completed = stats.completed,
        "planning finished"
    );
    Ok(PlanOutcome { tree, stats })
}

fn drive<E: Executor<UpdateTask>>(
    mut executor: E,
    tree: &Arc<PathTree>,
    update: CostUpdate,
    samples: usize,
    base: u64,
) -> Result<ExecutorStats, ExecutorError> {
    let handles = (0..samples)
        .map(|index| {
            executor.submit(Arc::new(UpdateTask::new(
                Arc::clone(tree),
                update,
                seed_for(base, index),
            )))
        })
        .collect::<Result<Vec<_>, _>>()?;
    executor.execute()?;
    let stats = executor.shutdown()?;
    for handle in handles {
        handle.wait()?;
    }
    Ok(stats)
}
