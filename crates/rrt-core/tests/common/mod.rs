// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use std::sync::Arc;

use rrt_core::{Milestone, PathTree};
use rrt_geom::{ConfigSpace, Point, Rect};

/// Tolerance for accumulated f32 path costs.
pub const COST_EPS: f32 = 1e-3;

/// 10x10 window, start (0,0), goal (9,9), radius 5, no obstacles.
pub fn open_field() -> ConfigSpace {
    ConfigSpace::new(10.0, 10.0, 5.0, Point::new(0.0, 0.0), Point::new(9.0, 9.0))
}

/// The wall that blocks the straight start-goal line of [`walled_field`].
pub fn wall() -> Rect {
    Rect::new(Point::new(4.0, 2.0), 2.0, 6.0)
}

/// [`open_field`] with [`wall`] across the diagonal.
pub fn walled_field() -> ConfigSpace {
    open_field().with_obstacle(wall())
}

/// Straight-line start-goal distance of [`open_field`].
pub fn straight_line() -> f32 {
    Point::new(0.0, 0.0).distance(&Point::new(9.0, 9.0))
}

/// Every registered milestone plus the goal.
pub fn all_nodes(tree: &PathTree) -> Vec<Arc<Milestone>> {
    let mut nodes = tree.milestones();
    nodes.push(Arc::clone(tree.goal()));
    nodes
}

/// Asserts `cost == parent.cost + edge` for every connected node.
pub fn assert_cost_invariant(tree: &PathTree) {
    for node in all_nodes(tree) {
        let Some(parent) = node.parent() else {
            continue;
        };
        let expected = parent.cost() + node.point().distance(&parent.point());
        assert!(
            (node.cost() - expected).abs() <= COST_EPS * expected.max(1.0),
            "cost drift at {:?}: {} vs {}",
            node.point(),
            node.cost(),
            expected
        );
        assert!((node.edge_length() - node.point().distance(&parent.point())).abs() < 1e-4);
    }
}

/// Asserts the parent/children relation is consistent in both directions.
pub fn assert_links_consistent(tree: &PathTree) {
    for node in all_nodes(tree) {
        for child in node.children() {
            let parent = child.parent().expect("child has a parent");
            assert!(Arc::ptr_eq(&parent, &node), "child lists a different parent");
        }
        if let Some(parent) = node.parent() {
            let listed = parent.children().iter().filter(|c| Arc::ptr_eq(c, &node)).count();
            assert_eq!(listed, 1, "node listed {listed} times by its parent");
        }
    }
}

/// Tiny deterministic RNG (xorshift64*) for interleaving decisions.
#[derive(Clone)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Creates a PRNG; a zero seed is replaced with 1.
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    /// Next pseudo-random `u64`.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }
}
