// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Drawing a random sample and connecting it to the tree.

use std::sync::Arc;

use rand::Rng;
use rrt_geom::Point;

use crate::milestone::{Milestone, SetParent};
use crate::tree::PathTree;

/// Moves from `from` toward `toward`, stopping after at most `radius`.
///
/// Returns `None` when the two points coincide (there is no direction to
/// move in).
pub fn steer(from: &Point, toward: &Point, radius: f32) -> Option<Point> {
    let length = from.distance(toward);
    if length.is_nan() || length <= 0.0 {
        return None;
    }
    let scale = radius.min(length) / length;
    Some(Point::new(
        from.x + (toward.x - from.x) * scale,
        from.y + (toward.y - from.y) * scale,
    ))
}

/// A connectable sample: where a new milestone goes and the registered
/// milestone it hangs off.
#[derive(Debug, Clone)]
pub struct Proposal {
    /// Position of the new milestone.
    pub point: Point,
    /// Registered milestone the new one connects to.
    pub parent: Arc<Milestone>,
}

impl Proposal {
    /// Hangs `milestone` (placed at [`Proposal::point`]) under the proposed
    /// parent and registers it.
    ///
    /// Registers nothing on [`SetParent::Conflict`], which only happens when
    /// `milestone` is already connected.
    pub fn attach(&self, milestone: &Arc<Milestone>, tree: &PathTree) -> SetParent {
        let edge = self.parent.point().distance(&milestone.point());
        let linked = milestone.set_parent(&self.parent, f32::INFINITY, edge);
        if linked == SetParent::Applied {
            tree.insert(Arc::clone(milestone));
        }
        linked
    }
}

/// Draws points uniformly in the window until one can be connected.
///
/// Only reads the tree. Never gives up: the start milestone is always in the
/// registry, so some direction is always open.
pub fn propose<R: Rng>(tree: &PathTree, rng: &mut R) -> Proposal {
    let space = tree.space();
    loop {
        let candidate = Point::new(
            rng.gen::<f32>() * space.width,
            rng.gen::<f32>() * space.height,
        );
        if let Some(proposal) = try_propose(tree, candidate) {
            return proposal;
        }
    }
}

/// Draws a sample, connects it and returns the new, registered milestone.
pub fn sample_point<R: Rng>(tree: &PathTree, rng: &mut R) -> Arc<Milestone> {
    loop {
        let proposal = propose(tree, rng);
        let milestone = Milestone::new(proposal.point);
        if proposal.attach(&milestone, tree) == SetParent::Applied {
            return milestone;
        }
    }
}

/// Steers from the nearest milestone toward `candidate`; `None` if the
/// steered segment is obstructed.
fn try_propose(tree: &PathTree, candidate: Point) -> Option<Proposal> {
    let parent = tree.nearest(&candidate, 1).into_iter().next()?;
    let space = tree.space();
    let point = steer(&parent.point(), &candidate, space.visibility)?;
    space
        .visible(&point, &parent.point())
        .then_some(Proposal { point, parent })
}
