// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![forbid(unsafe_code)]
#![doc = r"Planar geometry for the RRT* planner.

This crate provides:
- Points in the plane (`Point`) and Euclidean distance.
- Segment orientation and intersection tests.
- Rectangle obstacles and the tagged `Obstacle` enum.
- The configuration space (`ConfigSpace`): window bounds, visibility radius,
  start/goal points and obstacles, with the segment-visibility predicate.

Design notes:
- Float32 throughout, matching the planner's milestone costs.
- Touching counts as blocking: a segment that grazes an obstacle edge or
  corner is not visible.
- Everything here is immutable once built and therefore `Send + Sync`.
"]

mod error;
/// Tagged obstacle shapes and their segment-collision tests.
pub mod obstacle;
/// Planar points.
pub mod point;
/// Orientation and segment-intersection primitives.
pub mod segment;
/// Configuration space: window, radius, endpoints and obstacles.
pub mod space;

pub use error::GeomError;
pub use obstacle::{Obstacle, Rect};
pub use point::Point;
pub use segment::{orientation, segments_intersect, Orientation};
pub use space::ConfigSpace;
