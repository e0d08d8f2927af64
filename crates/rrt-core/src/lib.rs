// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! rrt-core: concurrent RRT* tree growth.
//!
//! The crate grows an RRT* search tree with many independent update tasks,
//! either inline, on a work-stealing pool built on a lock-free deque, or on a
//! bulk-synchronous pool whose tasks only read the tree and whose samples are
//! committed, in a fixed order, between supersteps.
//! The tree is shared by every worker; each milestone is locked on its own
//! and re-parented only through an optimistic compare-then-apply step.
//!
//! ```no_run
//! use rrt_core::{plan, PlannerConfig, Strategy};
//! use rrt_geom::{ConfigSpace, Point};
//!
//! let space = ConfigSpace::new(10.0, 10.0, 5.0, Point::new(0.0, 0.0), Point::new(9.0, 9.0));
//! let config = PlannerConfig {
//!     samples: 500,
//!     strategy: Strategy::Bsp { workers: 4 },
//!     seed: Some(7),
//! };
//! let outcome = plan(space, &config)?;
//! println!("goal cost: {:?}", outcome.tree.goal_cost());
//! # Ok::<(), rrt_core::PlanError>(())
//! ```
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

/// Lock-free work-stealing deque of machine words.
pub mod deque;
mod error;
/// Executors and the task abstraction they run.
pub mod executor;
/// Shared, individually locked tree nodes.
pub mod milestone;
/// Planner driver and its configuration.
pub mod planner;
/// RRT* rewiring.
pub mod rewire;
/// Random sampling and tree extension.
pub mod sample;
/// The shared search tree.
pub mod tree;
/// The sample-connect-rewire task.
pub mod update;

pub use error::{DequeError, ExecutorError, PlanError};
pub use executor::{
    BspConfig, BspExecutor, Completion, Executor, ExecutorStats, Reconcile, Task,
    WorkStealingConfig, WorkStealingExecutor,
};
pub use milestone::{Milestone, SetParent};
pub use planner::{plan, PlanOutcome, PlannerConfig, Strategy};
pub use rewire::CostUpdate;
pub use tree::{Edge, PathTree, TreeSnapshot};
pub use sample::Proposal;
pub use update::{Growth, UpdateTask};
