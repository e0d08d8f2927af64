// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use serde::{Deserialize, Serialize};

use crate::error::GeomError;
use crate::obstacle::Obstacle;
use crate::point::Point;

/// The planning problem: window, connection radius, endpoints and obstacles.
///
/// The window spans `[0, width) x [0, height)`. Once handed to the planner
/// the space is read-only and shared by every worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSpace {
    /// Window extent along x.
    pub width: f32,
    /// Window extent along y.
    pub height: f32,
    /// Maximum length of a single tree edge.
    pub visibility: f32,
    /// Root of the search tree.
    pub start: Point,
    /// Point the planner tries to reach.
    pub goal: Point,
    /// Obstacles; segments touching any of them are not visible.
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
}

impl ConfigSpace {
    /// Creates an obstacle-free space.
    #[must_use]
    pub fn new(width: f32, height: f32, visibility: f32, start: Point, goal: Point) -> Self {
        Self {
            width,
            height,
            visibility,
            start,
            goal,
            obstacles: Vec::new(),
        }
    }

    /// Adds an obstacle, builder style.
    #[must_use]
    pub fn with_obstacle(mut self, obstacle: impl Into<Obstacle>) -> Self {
        self.obstacles.push(obstacle.into());
        self
    }

    /// Returns `true` if no obstacle obstructs the straight segment `ab`.
    #[must_use]
    pub fn visible(&self, a: &Point, b: &Point) -> bool {
        !self.obstacles.iter().any(|o| o.blocks(a, b))
    }

    /// Returns `true` if `p` lies inside the closed window.
    #[must_use]
    pub fn contains(&self, p: &Point) -> bool {
        p.is_finite() && p.x >= 0.0 && p.y >= 0.0 && p.x <= self.width && p.y <= self.height
    }

    /// Checks the invariants the planner relies on.
    pub fn validate(&self) -> Result<(), GeomError> {
        let window_ok = |v: f32| v.is_finite() && v > 0.0;
        if !window_ok(self.width) || !window_ok(self.height) {
            return Err(GeomError::InvalidWindow {
                width: self.width,
                height: self.height,
            });
        }
        if !window_ok(self.visibility) {
            return Err(GeomError::InvalidVisibility(self.visibility));
        }
        for (which, p) in [("start", self.start), ("goal", self.goal)] {
            if !self.contains(&p) {
                return Err(GeomError::OutOfWindow {
                    which,
                    x: p.x,
                    y: p.y,
                    width: self.width,
                    height: self.height,
                });
            }
        }
        if let Some(index) = self.obstacles.iter().position(|o| !o.is_well_formed()) {
            return Err(GeomError::InvalidObstacle { index });
        }
        for (which, p) in [("start", self.start), ("goal", self.goal)] {
            if let Some(index) = self.obstacles.iter().position(|o| o.contains(&p)) {
                return Err(GeomError::InsideObstacle {
                    which,
                    x: p.x,
                    y: p.y,
                    index,
                });
            }
        }
        Ok(())
    }
}
