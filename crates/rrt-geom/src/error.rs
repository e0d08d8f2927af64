// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use thiserror::Error;

/// Reasons a configuration space is rejected by [`crate::ConfigSpace::validate`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeomError {
    /// Window width or height is not a positive finite number.
    #[error("window must be positive and finite, got {width}x{height}")]
    InvalidWindow {
        /// Offending width.
        width: f32,
        /// Offending height.
        height: f32,
    },
    /// Visibility radius is not a positive finite number.
    #[error("visibility radius must be positive and finite, got {0}")]
    InvalidVisibility(f32),
    /// A named endpoint lies outside the window or is not finite.
    #[error("{which} point ({x}, {y}) lies outside the {width}x{height} window")]
    OutOfWindow {
        /// `"start"` or `"goal"`.
        which: &'static str,
        /// Endpoint x coordinate.
        x: f32,
        /// Endpoint y coordinate.
        y: f32,
        /// Window width.
        width: f32,
        /// Window height.
        height: f32,
    },
    /// An obstacle has a negative or non-finite extent.
    #[error("obstacle {index} has an invalid extent")]
    InvalidObstacle {
        /// Position of the obstacle in the configuration list.
        index: usize,
    },
    /// A named endpoint lies inside (or on the boundary of) an obstacle.
    #[error("{which} point ({x}, {y}) lies inside obstacle {index}")]
    InsideObstacle {
        /// `"start"` or `"goal"`.
        which: &'static str,
        /// Endpoint x coordinate.
        x: f32,
        /// Endpoint y coordinate.
        y: f32,
        /// Position of the obstacle in the configuration list.
        index: usize,
    },
}
