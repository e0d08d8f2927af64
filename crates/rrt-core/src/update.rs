// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The unit of work: grow the tree by one milestone.

use std::sync::{Arc, OnceLock};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::trace;

use crate::executor::{Reconcile, Task};
use crate::milestone::{Milestone, SetParent};
use crate::rewire::{rewire, CostUpdate};
use crate::sample::{propose, sample_point, Proposal};
use crate::tree::PathTree;

/// Draws one sample, connects it and rewires around it.
///
/// The task owns its random seed, so the milestone it produces depends only
/// on the seed and on the tree state it observes.
#[derive(Debug)]
pub struct UpdateTask {
    tree: Arc<PathTree>,
    cost_update: CostUpdate,
    seed: u64,
    produced: OnceLock<Arc<Milestone>>,
}

/// What one run of an [`UpdateTask`] produced.
///
/// Under [`CostUpdate::Inline`] the milestone is already connected, rewired
/// and propagated. Under [`CostUpdate::Deferred`] the run only read the tree:
/// the milestone is still detached and [`Reconcile::reconcile`] commits it.
#[derive(Debug, Clone)]
pub struct Growth {
    tree: Arc<PathTree>,
    milestone: Arc<Milestone>,
    proposal: Option<Proposal>,
}

impl Growth {
    /// The new milestone.
    pub fn milestone(&self) -> &Arc<Milestone> {
        &self.milestone
    }

    /// Returns `true` once the milestone is part of the tree.
    pub fn is_committed(&self) -> bool {
        self.milestone.is_connected()
    }
}

impl UpdateTask {
    /// Creates a task over `tree`.
    pub fn new(tree: Arc<PathTree>, cost_update: CostUpdate, seed: u64) -> Self {
        Self {
            tree,
            cost_update,
            seed,
            produced: OnceLock::new(),
        }
    }

    /// The milestone produced by the first run, if the task has run.
    pub fn milestone(&self) -> Option<&Arc<Milestone>> {
        self.produced.get()
    }

    /// Runs one sample-connect-rewire step.
    pub fn grow(&self) -> Growth {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let growth = match self.cost_update {
            CostUpdate::Inline => {
                let milestone = sample_point(&self.tree, &mut rng);
                rewire(&milestone, &self.tree, CostUpdate::Inline);
                Growth {
                    tree: Arc::clone(&self.tree),
                    milestone,
                    proposal: None,
                }
            }
            CostUpdate::Deferred => {
                let proposal = propose(&self.tree, &mut rng);
                Growth {
                    tree: Arc::clone(&self.tree),
                    milestone: Milestone::new(proposal.point),
                    proposal: Some(proposal),
                }
            }
        };
        // A second run still produces a fresh milestone but does not replace
        // the recorded one.
        let _ = self.produced.set(Arc::clone(&growth.milestone));
        growth
    }
}

impl Task for UpdateTask {
    type Output = Growth;

    fn run(&self) -> Growth {
        self.grow()
    }
}

impl Reconcile for Growth {
    fn reconcile(&self) {
        if let Some(proposal) = &self.proposal {
            if proposal.attach(&self.milestone, &self.tree) == SetParent::Conflict {
                trace!(
                    x = self.milestone.point().x,
                    y = self.milestone.point().y,
                    "milestone already committed"
                );
                return;
            }
            rewire(&self.milestone, &self.tree, CostUpdate::Deferred);
        }
        self.milestone.update_children_cost();
    }
}
