// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Milestones: the shared, individually locked nodes of the search tree.
//!
//! Each milestone guards its `{parent, cost}` pair with its own mutex, so
//! rewiring unrelated subtrees never serialises. The cost is additionally
//! published through an atomic word: it is *written* only while the node lock
//! is held, but any thread may *read* it without locking. Readers use costs
//! only for heuristic decisions; [`Milestone::set_parent`] re-validates under
//! the lock before mutating anything.
//!
//! Ownership: parents hold strong references to their children and children
//! hold weak references to their parents, so the tree never forms an `Arc`
//! cycle. The [`crate::tree::PathTree`] registry keeps every milestone alive
//! for the whole run.
//!
//! # Monotonicity
//!
//! `set_parent` only applies a re-parenting that strictly lowers the node's
//! cost, and propagation only ever replaces a cost by `parent.cost + edge`,
//! which never exceeds the stored value. Costs therefore never increase, a
//! descendant's cost is always above its ancestor's, and a node can never be
//! re-parented under one of its own descendants.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use rrt_geom::Point;

/// Outcome of an optimistic [`Milestone::set_parent`] attempt.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetParent {
    /// The node now hangs off the new parent.
    Applied,
    /// The node's cost moved since the caller read it, or the change would no
    /// longer be an improvement. Nothing was mutated; re-read and decide again.
    Conflict,
}

#[derive(Debug)]
struct Link {
    parent: Weak<Milestone>,
    edge: f32,
}

/// One node of the search tree.
///
/// Identity is the allocation: compare milestones with [`Arc::ptr_eq`].
pub struct Milestone {
    point: Point,
    link: Mutex<Link>,
    cost: AtomicU32,
    children: Mutex<Vec<Arc<Milestone>>>,
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Milestone {
    /// Creates an unconnected milestone. Its cost is `+inf` until it gains a
    /// parent.
    pub fn new(point: Point) -> Arc<Self> {
        Self::with_cost(point, f32::INFINITY)
    }

    /// Creates a tree root with cost zero.
    pub fn root(point: Point) -> Arc<Self> {
        Self::with_cost(point, 0.0)
    }

    fn with_cost(point: Point, cost: f32) -> Arc<Self> {
        Arc::new(Self {
            point,
            link: Mutex::new(Link {
                parent: Weak::new(),
                edge: 0.0,
            }),
            cost: AtomicU32::new(cost.to_bits()),
            children: Mutex::new(Vec::new()),
        })
    }

    /// Position in the plane.
    pub fn point(&self) -> Point {
        self.point
    }

    /// Cost of the current tree path from the root (`+inf` if unconnected).
    pub fn cost(&self) -> f32 {
        f32::from_bits(self.cost.load(Ordering::Acquire))
    }

    /// Returns `true` once the milestone has a finite cost.
    pub fn is_connected(&self) -> bool {
        self.cost().is_finite()
    }

    /// Current parent, if any.
    pub fn parent(&self) -> Option<Arc<Self>> {
        lock(&self.link).parent.upgrade()
    }

    /// Length of the edge to the current parent (zero for roots).
    pub fn edge_length(&self) -> f32 {
        lock(&self.link).edge
    }

    /// Snapshot of the current children.
    pub fn children(&self) -> Vec<Arc<Self>> {
        lock(&self.children).clone()
    }

    /// Optimistically re-parents `self` under `new_parent`.
    ///
    /// Under the node lock: if the cost still equals `expected_cost` and
    /// `new_parent.cost() + edge` is strictly lower, detaches from the old
    /// parent, attaches to `new_parent` and sets the new cost. Otherwise
    /// returns [`SetParent::Conflict`] without touching anything.
    pub fn set_parent(self: &Arc<Self>, new_parent: &Arc<Self>, expected_cost: f32, edge: f32) -> SetParent {
        if Arc::ptr_eq(self, new_parent) {
            return SetParent::Conflict;
        }

        let mut link = lock(&self.link);
        let current = self.cost();
        if current.to_bits() != expected_cost.to_bits() {
            return SetParent::Conflict;
        }
        let cost = new_parent.cost() + edge;
        if cost.is_nan() || cost >= current {
            return SetParent::Conflict;
        }

        // Re-link before publishing the cost so concurrent propagation into
        // this node waits on our lock and then sees the new parent.
        if let Some(old) = link.parent.upgrade() {
            old.remove_child(self);
        }
        new_parent.add_child(Arc::clone(self));
        link.parent = Arc::downgrade(new_parent);
        link.edge = edge;
        self.cost.store(cost.to_bits(), Ordering::Release);
        SetParent::Applied
    }

    /// Recomputes `cost = parent.cost + edge` for every descendant.
    ///
    /// Each descendant is locked individually; the traversal uses an explicit
    /// work-list so deep trees do not grow the call stack.
    pub fn update_children_cost(&self) {
        let mut stack = self.children();
        while let Some(node) = stack.pop() {
            node.refresh_cost();
            stack.extend(node.children());
        }
    }

    /// Re-derives this node's cost from its parent's current cost.
    fn refresh_cost(&self) {
        let link = lock(&self.link);
        if let Some(parent) = link.parent.upgrade() {
            let cost = parent.cost() + link.edge;
            self.cost.store(cost.to_bits(), Ordering::Release);
        }
    }

    fn add_child(&self, child: Arc<Self>) {
        lock(&self.children).push(child);
    }

    fn remove_child(&self, child: &Arc<Self>) {
        lock(&self.children).retain(|c| !Arc::ptr_eq(c, child));
    }
}

impl fmt::Debug for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Milestone")
            .field("point", &self.point)
            .field("cost", &self.cost())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f32, y: f32) -> Arc<Milestone> {
        Milestone::new(Point::new(x, y))
    }

    #[test]
    fn set_parent_links_both_directions() {
        let root = Milestone::root(Point::new(0.0, 0.0));
        let child = at(3.0, 4.0);
        assert_eq!(child.set_parent(&root, f32::INFINITY, 5.0), SetParent::Applied);
        assert_eq!(child.cost(), 5.0);
        assert!(child.parent().is_some_and(|p| Arc::ptr_eq(&p, &root)));
        assert_eq!(root.children().len(), 1);
    }

    #[test]
    fn stale_expected_cost_is_a_conflict() {
        let root = Milestone::root(Point::new(0.0, 0.0));
        let child = at(3.0, 4.0);
        assert_eq!(child.set_parent(&root, 1.0, 5.0), SetParent::Conflict);
        assert!(child.parent().is_none());
        assert!(root.children().is_empty());
        assert!(!child.is_connected());
    }

    #[test]
    fn non_improving_reparent_is_rejected() {
        let root = Milestone::root(Point::new(0.0, 0.0));
        let a = at(1.0, 0.0);
        let b = at(2.0, 0.0);
        assert_eq!(a.set_parent(&root, f32::INFINITY, 1.0), SetParent::Applied);
        assert_eq!(b.set_parent(&a, f32::INFINITY, 1.0), SetParent::Applied);
        // Hanging `a` under its own child can never lower its cost.
        assert_eq!(a.set_parent(&b, 1.0, 1.0), SetParent::Conflict);
        assert!(a.parent().is_some_and(|p| Arc::ptr_eq(&p, &root)));
    }

    #[test]
    fn reparent_moves_child_between_parents() {
        let root = Milestone::root(Point::new(0.0, 0.0));
        let far = at(0.0, 5.0);
        let near = at(1.0, 0.0);
        let node = at(1.0, 1.0);
        assert_eq!(far.set_parent(&root, f32::INFINITY, 5.0), SetParent::Applied);
        assert_eq!(near.set_parent(&root, f32::INFINITY, 1.0), SetParent::Applied);
        assert_eq!(node.set_parent(&far, f32::INFINITY, 4.0), SetParent::Applied);
        assert_eq!(node.set_parent(&near, 9.0, 1.0), SetParent::Applied);
        assert!(far.children().is_empty());
        assert_eq!(near.children().len(), 1);
        assert_eq!(node.cost(), 2.0);
    }

    #[test]
    fn update_children_cost_reaches_every_descendant() {
        let root = Milestone::root(Point::new(0.0, 0.0));
        let detour = at(0.0, 10.0);
        let shortcut = at(1.0, 0.0);
        assert_eq!(detour.set_parent(&root, f32::INFINITY, 10.0), SetParent::Applied);
        assert_eq!(shortcut.set_parent(&root, f32::INFINITY, 1.0), SetParent::Applied);

        let mut chain = vec![Arc::clone(&detour)];
        for i in 1..=200 {
            let prev = Arc::clone(&chain[i - 1]);
            let node = at(0.0, 10.0 + i as f32);
            assert_eq!(node.set_parent(&prev, f32::INFINITY, 1.0), SetParent::Applied);
            chain.push(node);
        }

        // Move the chain's head onto the shortcut, then propagate.
        assert_eq!(detour.set_parent(&shortcut, 10.0, 2.0), SetParent::Applied);
        detour.update_children_cost();
        for (i, node) in chain.iter().enumerate() {
            assert_eq!(node.cost(), 3.0 + i as f32, "node {i}");
        }
    }
}
