// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use serde::{Deserialize, Serialize};

use crate::point::Point;
use crate::segment::segments_intersect;

/// Axis-aligned rectangle anchored at its minimum corner.
///
/// Invariants (checked by [`crate::ConfigSpace::validate`]):
/// - `width` and `height` are finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Minimum (lower-left) corner.
    pub origin: Point,
    /// Extent along x.
    pub width: f32,
    /// Extent along y.
    pub height: f32,
}

impl Rect {
    /// Creates a rectangle from its minimum corner and extents.
    #[must_use]
    pub const fn new(origin: Point, width: f32, height: f32) -> Self {
        Self { origin, width, height }
    }

    /// The four boundary edges, counter-clockwise from the minimum corner.
    #[must_use]
    pub fn edges(&self) -> [(Point, Point); 4] {
        let ll = self.origin;
        let lr = Point::new(ll.x + self.width, ll.y);
        let ur = Point::new(ll.x + self.width, ll.y + self.height);
        let ul = Point::new(ll.x, ll.y + self.height);
        [(ll, lr), (lr, ur), (ur, ul), (ul, ll)]
    }

    /// Returns `true` if segment `ab` crosses or touches the boundary.
    ///
    /// A segment lying strictly inside the rectangle does not touch the
    /// boundary and is not reported; the sampler never produces one because
    /// every segment it tests starts at a milestone already reachable from
    /// outside.
    #[must_use]
    pub fn blocks(&self, a: &Point, b: &Point) -> bool {
        self.edges()
            .iter()
            .any(|(e0, e1)| segments_intersect(e0, e1, a, b))
    }

    /// Returns `true` if `p` lies inside the rectangle or on its boundary.
    #[must_use]
    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.origin.x
            && p.y >= self.origin.y
            && p.x <= self.origin.x + self.width
            && p.y <= self.origin.y + self.height
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        self.origin.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width >= 0.0
            && self.height >= 0.0
    }
}

/// An obstacle in the configuration space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Obstacle {
    /// Axis-aligned rectangle.
    Rectangle(Rect),
}

impl Obstacle {
    /// Returns `true` if the obstacle obstructs segment `ab`.
    #[must_use]
    pub fn blocks(&self, a: &Point, b: &Point) -> bool {
        match self {
            Self::Rectangle(rect) => rect.blocks(a, b),
        }
    }

    /// Returns `true` if `p` lies in the obstacle's closed region.
    #[must_use]
    pub fn contains(&self, p: &Point) -> bool {
        match self {
            Self::Rectangle(rect) => rect.contains(p),
        }
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        match self {
            Self::Rectangle(rect) => rect.is_well_formed(),
        }
    }
}

impl From<Rect> for Obstacle {
    fn from(rect: Rect) -> Self {
        Self::Rectangle(rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_through_rectangle_is_blocked() {
        let rect = Rect::new(Point::new(1.0, 1.0), 0.5, 0.5);
        assert!(rect.blocks(&Point::new(0.0, 0.0), &Point::new(2.0, 2.0)));
    }

    #[test]
    fn collinear_segment_beside_rectangle_is_clear() {
        let rect = Rect::new(Point::new(0.0, 0.5), 0.5, 0.5);
        assert!(!rect.blocks(&Point::new(1.0, 0.5), &Point::new(1.5, 0.5)));
    }

    #[test]
    fn segment_ending_on_boundary_is_blocked() {
        let rect = Rect::new(Point::new(0.0, 0.5), 1.0, 1.0);
        assert!(rect.blocks(&Point::new(0.5, 0.0), &Point::new(0.5, 0.5)));
        assert!(!rect.blocks(&Point::new(0.5, 0.0), &Point::new(0.5, 0.25)));
    }

    #[test]
    fn containment_includes_the_boundary() {
        let rect = Rect::new(Point::new(1.0, 1.0), 2.0, 1.0);
        assert!(rect.contains(&Point::new(2.0, 1.5)));
        assert!(rect.contains(&Point::new(3.0, 2.0)));
        assert!(!rect.contains(&Point::new(3.5, 1.5)));
        // Fully inside: no boundary crossing, yet the point is covered.
        assert!(!rect.blocks(&Point::new(1.5, 1.2), &Point::new(2.5, 1.8)));
    }
}
