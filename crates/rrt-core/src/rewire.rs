// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! RRT* rewiring around a freshly inserted milestone.
//!
//! Every decision is taken on unlocked cost reads and applied through
//! [`Milestone::set_parent`]. A conflict means the baseline moved; the
//! decision is re-evaluated with fresh values until it either applies or no
//! longer improves anything.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::milestone::{Milestone, SetParent};
use crate::tree::PathTree;

/// Number of nearest milestones considered for rewiring.
pub const NEIGHBOURHOOD: usize = 10;

/// Who propagates cost changes below a rewired milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostUpdate {
    /// The task propagates immediately (work-stealing and sequential modes).
    Inline,
    /// Tasks only read the tree; the scheduler commits each sample and
    /// propagates during the phase between supersteps (BSP mode).
    Deferred,
}

/// Rewires the tree around `milestone`, which must already be connected and
/// registered.
pub fn rewire(milestone: &Arc<Milestone>, tree: &PathTree, update: CostUpdate) {
    rewire_neighbourhood(milestone, tree);
    connect_goal(milestone, tree);

    if update == CostUpdate::Inline {
        milestone.update_children_cost();
    }
}

fn rewire_neighbourhood(milestone: &Arc<Milestone>, tree: &PathTree) {
    for neighbour in tree.neighbours(milestone, NEIGHBOURHOOD) {
        let edge = milestone.point().distance(&neighbour.point());
        loop {
            let own_cost = milestone.cost();
            let neighbour_cost = neighbour.cost();

            let settled = if own_cost + edge < neighbour_cost {
                try_rewire(&neighbour, milestone, neighbour_cost, edge, tree)
            } else if neighbour_cost + edge < own_cost {
                try_rewire(milestone, &neighbour, own_cost, edge, tree)
            } else {
                true
            };
            if settled {
                break;
            }
        }
    }
}

fn connect_goal(milestone: &Arc<Milestone>, tree: &PathTree) {
    let goal = tree.goal();
    let edge = milestone.point().distance(&goal.point());
    if edge >= tree.space().visibility {
        return;
    }
    loop {
        let goal_cost = goal.cost();
        if milestone.cost() + edge >= goal_cost {
            break;
        }
        if try_rewire(goal, milestone, goal_cost, edge, tree) {
            break;
        }
    }
}

/// Hangs `child` under `parent` if the segment between them is clear.
///
/// Returns `false` only when the attempt must be re-evaluated.
fn try_rewire(child: &Arc<Milestone>, parent: &Arc<Milestone>, child_cost: f32, edge: f32, tree: &PathTree) -> bool {
    if !tree.space().visible(&child.point(), &parent.point()) {
        return true;
    }
    match child.set_parent(parent, child_cost, edge) {
        SetParent::Applied => true,
        SetParent::Conflict => {
            trace!(
                x = child.point().x,
                y = child.point().y,
                "rewire conflict, re-evaluating"
            );
            false
        }
    }
}
