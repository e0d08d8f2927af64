// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Integration tests for segment visibility and configuration loading.
#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use rrt_geom::{segments_intersect, ConfigSpace, Obstacle, Point, Rect};

fn coord() -> impl Strategy<Value = f32> {
    (-1000i32..1000).prop_map(|v| v as f32 / 10.0)
}

fn point() -> impl Strategy<Value = Point> {
    (coord(), coord()).prop_map(|(x, y)| Point::new(x, y))
}

proptest! {
    #[test]
    fn intersection_ignores_segment_order_and_direction(
        a in point(), b in point(), c in point(), d in point()
    ) {
        let base = segments_intersect(&a, &b, &c, &d);
        prop_assert_eq!(base, segments_intersect(&c, &d, &a, &b));
        prop_assert_eq!(base, segments_intersect(&b, &a, &d, &c));
    }

    #[test]
    fn segment_always_meets_itself(a in point(), b in point()) {
        prop_assert!(segments_intersect(&a, &b, &a, &b));
    }

    #[test]
    fn visibility_is_symmetric(a in point(), b in point()) {
        let space = ConfigSpace::new(100.0, 100.0, 5.0, Point::new(0.0, 0.0), Point::new(1.0, 1.0))
            .with_obstacle(Rect::new(Point::new(-10.0, -10.0), 20.0, 5.0))
            .with_obstacle(Rect::new(Point::new(30.0, 30.0), 4.0, 40.0));
        prop_assert_eq!(space.visible(&a, &b), space.visible(&b, &a));
    }
}

#[test]
fn config_space_loads_from_json() {
    let json = r#"{
        "width": 10.0,
        "height": 10.0,
        "visibility": 5.0,
        "start": { "x": 0.0, "y": 0.0 },
        "goal": { "x": 9.0, "y": 9.0 },
        "obstacles": [
            { "kind": "rectangle", "origin": { "x": 4.0, "y": 2.0 }, "width": 2.0, "height": 6.0 }
        ]
    }"#;
    let space: ConfigSpace = serde_json::from_str(json).expect("parse config");
    assert_eq!(space.obstacles.len(), 1);
    assert_eq!(
        space.obstacles[0],
        Obstacle::Rectangle(Rect::new(Point::new(4.0, 2.0), 2.0, 6.0))
    );
    space.validate().expect("valid config");
    assert!(!space.visible(&space.start, &space.goal));
}

#[test]
fn obstacles_default_to_empty() {
    let json = r#"{
        "width": 4.0, "height": 3.0, "visibility": 1.0,
        "start": { "x": 0.5, "y": 0.5 }, "goal": { "x": 3.5, "y": 2.5 }
    }"#;
    let space: ConfigSpace = serde_json::from_str(json).expect("parse config");
    assert!(space.obstacles.is_empty());
    assert!(space.visible(&space.start, &space.goal));
}
