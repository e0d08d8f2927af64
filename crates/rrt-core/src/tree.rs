// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The shared search tree: an append-only milestone registry plus the start
//! and goal milestones.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use rrt_geom::{ConfigSpace, Point};
use serde::Serialize;

use crate::milestone::Milestone;

/// One parent-to-child edge of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Edge {
    /// Parent position.
    pub from: Point,
    /// Child position.
    pub to: Point,
}

/// Point-in-time copy of the tree's shape, suitable for export and
/// comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeSnapshot {
    /// Every edge, in registry order, followed by the goal edge if connected.
    pub edges: Vec<Edge>,
    /// Start-to-goal path (empty while the goal is unreached).
    pub goal_path: Vec<Point>,
    /// Goal cost, `None` while unreached.
    pub goal_cost: Option<f32>,
}

/// The tree being grown by the planner.
///
/// The registry only ever grows. Neighbour queries take the read lock;
/// inserts take the write lock. The goal is *not* in the registry: it is
/// reached only through the goal-improvement step of
/// [`crate::rewire::rewire`], never as a nearest neighbour.
#[derive(Debug)]
pub struct PathTree {
    space: ConfigSpace,
    start: Arc<Milestone>,
    goal: Arc<Milestone>,
    registry: RwLock<Vec<Arc<Milestone>>>,
}

#[derive(Debug)]
struct Candidate {
    distance: f32,
    seq: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.seq.cmp(&other.seq))
    }
}

impl PathTree {
    /// Creates a tree for `space`, rooted at its start point.
    pub fn new(space: ConfigSpace) -> Self {
        let start = Milestone::root(space.start);
        let goal = Milestone::new(space.goal);
        Self {
            registry: RwLock::new(vec![Arc::clone(&start)]),
            space,
            start,
            goal,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Arc<Milestone>>> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// The configuration space this tree lives in.
    pub fn space(&self) -> &ConfigSpace {
        &self.space
    }

    /// The root milestone.
    pub fn start(&self) -> &Arc<Milestone> {
        &self.start
    }

    /// The goal milestone.
    pub fn goal(&self) -> &Arc<Milestone> {
        &self.goal
    }

    /// Appends a milestone to the registry.
    pub fn insert(&self, milestone: Arc<Milestone>) {
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(milestone);
    }

    /// Number of registered milestones (the start included, the goal not).
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Always `false`: the start milestone is registered at construction.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Snapshot of the registry in insertion order.
    pub fn milestones(&self) -> Vec<Arc<Milestone>> {
        self.read().clone()
    }

    /// The `k` registered milestones closest to `point`, nearest first.
    ///
    /// Ties are broken by insertion order.
    pub fn nearest(&self, point: &Point, k: usize) -> Vec<Arc<Milestone>> {
        if k == 0 {
            return Vec::new();
        }
        let registry = self.read();
        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);
        for (seq, milestone) in registry.iter().enumerate() {
            let candidate = Candidate {
                distance: milestone.point().distance(point),
                seq,
            };
            if heap.len() < k {
                heap.push(candidate);
            } else if heap.peek().is_some_and(|worst| candidate < *worst) {
                heap.pop();
                heap.push(candidate);
            }
        }
        heap.into_sorted_vec()
            .into_iter()
            .map(|c| Arc::clone(&registry[c.seq]))
            .collect()
    }

    /// The `k` milestones nearest to `milestone`, with `milestone` itself
    /// filtered out of the result.
    pub fn neighbours(&self, milestone: &Arc<Milestone>, k: usize) -> Vec<Arc<Milestone>> {
        let mut near = self.nearest(&milestone.point(), k);
        near.retain(|n| !Arc::ptr_eq(n, milestone));
        near
    }

    /// Cost of the best known path to the goal, `None` while unreached.
    pub fn goal_cost(&self) -> Option<f32> {
        let cost = self.goal.cost();
        cost.is_finite().then_some(cost)
    }

    /// The current start-to-goal path, empty while the goal is unreached.
    pub fn goal_path(&self) -> Vec<Point> {
        if self.goal_cost().is_none() {
            return Vec::new();
        }
        // Bounded walk: every milestone appears at most once on a path.
        let limit = self.len() + 1;
        let mut path = vec![self.goal.point()];
        let mut node = self.goal.parent();
        while let Some(current) = node {
            if path.len() > limit {
                break;
            }
            path.push(current.point());
            node = current.parent();
        }
        path.reverse();
        path
    }

    /// Every parent-to-child edge, registry order, goal edge last.
    pub fn edges(&self) -> Vec<Edge> {
        self.milestones()
            .iter()
            .chain(std::iter::once(&self.goal))
            .filter_map(|m| {
                m.parent().map(|p| Edge {
                    from: p.point(),
                    to: m.point(),
                })
            })
            .collect()
    }

    /// Copies the tree's current shape.
    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot {
            edges: self.edges(),
            goal_path: self.goal_path(),
            goal_cost: self.goal_cost(),
        }
    }
}
