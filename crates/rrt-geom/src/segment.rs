// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Orientation and segment-intersection primitives.
//!
//! The intersection test is the classic orientation-based one: two segments
//! intersect when each straddles the line through the other, or when an
//! endpoint of one lies on the other (the collinear cases).

use crate::point::Point;

/// Turn direction of the ordered triple `(p, q, r)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// The three points lie on one line.
    Collinear,
    /// `p -> q -> r` turns clockwise.
    Clockwise,
    /// `p -> q -> r` turns counter-clockwise.
    CounterClockwise,
}

/// Classifies the turn made by `p -> q -> r`.
///
/// The cross product is evaluated in `f64`; inputs are `f32`, so the products
/// are exact and the sign is reliable.
#[must_use]
pub fn orientation(p: &Point, q: &Point, r: &Point) -> Orientation {
    let (px, py) = (f64::from(p.x), f64::from(p.y));
    let (qx, qy) = (f64::from(q.x), f64::from(q.y));
    let (rx, ry) = (f64::from(r.x), f64::from(r.y));
    let cross = (qy - py) * (rx - qx) - (qx - px) * (ry - qy);
    if cross > 0.0 {
        Orientation::Clockwise
    } else if cross < 0.0 {
        Orientation::CounterClockwise
    } else {
        Orientation::Collinear
    }
}

/// For collinear `p`, `q`, `r`: returns `true` if `q` lies within the
/// bounding box of segment `pr`.
#[must_use]
pub fn on_segment(p: &Point, q: &Point, r: &Point) -> bool {
    q.x <= p.x.max(r.x) && q.x >= p.x.min(r.x) && q.y <= p.y.max(r.y) && q.y >= p.y.min(r.y)
}

/// Returns `true` if segment `p1q1` and segment `p2q2` share at least one point.
#[must_use]
pub fn segments_intersect(p1: &Point, q1: &Point, p2: &Point, q2: &Point) -> bool {
    let o1 = orientation(p1, q1, p2);
    let o2 = orientation(p1, q1, q2);
    let o3 = orientation(p2, q2, p1);
    let o4 = orientation(p2, q2, q1);

    if o1 != o2 && o3 != o4 {
        return true;
    }

    (o1 == Orientation::Collinear && on_segment(p1, p2, q1))
        || (o2 == Orientation::Collinear && on_segment(p1, q2, q1))
        || (o3 == Orientation::Collinear && on_segment(p2, p1, q2))
        || (o4 == Orientation::Collinear && on_segment(p2, q1, q2))
}
