// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property-based tests for the straight skeleton.
//!
//! Run with: cargo test -p roof-skeleton -- proptest

use nalgebra::{Point2, Point3};
use proptest::prelude::*;
use roof_skeleton::{make_hip_roof, straight_skeleton, LevelEventKind, RoofLineKind};

// =============================================================================
// Strategies
// =============================================================================

/// Axis-aligned rectangle `(x, y, width, height)` with `height > width`.
fn arb_rectangle() -> impl Strategy<Value = (f64, f64, f64, f64)> {
    (-50.0..50.0f64, -50.0..50.0f64, 1.0..20.0f64, 0.5..20.0f64)
        .prop_map(|(x, y, width, delta)| (x, y, width, width + delta))
}

/// Regular polygon `(center, radius, sides)` in counter-clockwise order.
fn arb_regular_polygon() -> impl Strategy<Value = (Point2<f64>, f64, usize)> {
    (-50.0..50.0f64, -50.0..50.0f64, 1.0..50.0f64, 3usize..=12)
        .prop_map(|(cx, cy, radius, sides)| (Point2::new(cx, cy), radius, sides))
}

/// Star-shaped polygon around the origin: jittered angles, random radii, in
/// counter-clockwise order. Usually non-convex.
fn arb_star_polygon() -> impl Strategy<Value = Vec<(f64, f64)>> {
    (5usize..=16).prop_flat_map(|sides| {
        prop::collection::vec((-0.35..0.35f64, 2.0..10.0f64), sides).prop_map(move |corners| {
            let step = std::f64::consts::TAU / sides as f64;
            corners
                .into_iter()
                .enumerate()
                .map(|(i, (jitter, radius))| {
                    let angle = (i as f64 + jitter) * step;
                    (radius * angle.cos(), radius * angle.sin())
                })
                .collect()
        })
    })
}

fn rectangle_points(x: f64, y: f64, width: f64, height: f64) -> Vec<Point3<f64>> {
    vec![
        Point3::new(x, y, 0.0),
        Point3::new(x + width, y, 0.0),
        Point3::new(x + width, y + height, 0.0),
        Point3::new(x, y + height, 0.0),
    ]
}

fn regular_points(center: Point2<f64>, radius: f64, sides: usize) -> Vec<Point3<f64>> {
    (0..sides)
        .map(|i| {
            let angle = std::f64::consts::TAU * i as f64 / sides as f64;
            Point3::new(center.x + radius * angle.cos(), center.y + radius * angle.sin(), 0.0)
        })
        .collect()
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A rectangle roof has one ridge, as long as the difference of its sides.
    #[test]
    fn proptest_rectangle_ridge_length((x, y, width, height) in arb_rectangle()) {
        let roof = make_hip_roof(&rectangle_points(x, y, width, height), 45.0).unwrap();

        let ridges: Vec<_> = roof.lines_of(RoofLineKind::Ridge).collect();
        prop_assert_eq!(ridges.len(), 1);
        prop_assert!((ridges[0].length() - (height - width)).abs() < 1e-6);
        prop_assert_eq!(roof.lines_of(RoofLineKind::Hip).count(), 4);
        prop_assert!((roof.ridge_height() - width / 2.0).abs() < 1e-6);
        prop_assert!(roof.skeleton.as_ref().unwrap().is_complete());
    }

    /// Clockwise input yields the same skeleton nodes as counter-clockwise input.
    #[test]
    fn proptest_winding_independence((x, y, width, height) in arb_rectangle()) {
        let ccw = rectangle_points(x, y, width, height);
        let cw: Vec<_> = ccw.iter().rev().copied().collect();

        let a = straight_skeleton(&ccw).unwrap();
        let b = straight_skeleton(&cw).unwrap();

        prop_assert_eq!(a.event_nodes().count(), b.event_nodes().count());
        for node in a.event_nodes() {
            prop_assert!(b.find_node(&node.point, 1e-6).is_some());
        }
        prop_assert!((a.max_height() - b.max_height()).abs() < 1e-9);
    }

    /// A regular polygon collapses to its center in a single pick at the apothem.
    #[test]
    fn proptest_regular_polygon_picks_at_center((center, radius, sides) in arb_regular_polygon()) {
        let skeleton = straight_skeleton(&regular_points(center, radius, sides)).unwrap();

        prop_assert_eq!(skeleton.stats.initial_edge_events, sides);
        prop_assert_eq!(skeleton.levels_of(LevelEventKind::Pick).count(), 1);
        prop_assert_eq!(skeleton.levels_of(LevelEventKind::MultiSplit).count(), 0);

        let apothem = radius * (std::f64::consts::PI / sides as f64).cos();
        prop_assert!((skeleton.max_height() - apothem).abs() < 1e-6);
        prop_assert!(skeleton.find_node(&center, 1e-6).is_some());
        prop_assert!(skeleton.is_complete());
    }

    /// Star-shaped footprints resolve every loop and consume each corner once.
    #[test]
    fn proptest_star_polygon_resolves(corners in arb_star_polygon()) {
        let points: Vec<_> = corners.iter().map(|&(x, y)| Point3::new(x, y, 0.0)).collect();
        let skeleton = straight_skeleton(&points);
        prop_assert!(skeleton.is_ok(), "{:?} failed: {:?}", corners, skeleton.as_ref().err());
        let skeleton = skeleton.unwrap();

        prop_assert!(skeleton.is_complete(), "{:?} left {} loops", corners, skeleton.stats.unresolved_loops);
        for corner in 0..corners.len() {
            let outgoing = skeleton.arcs.iter().filter(|a| a.from == corner).count();
            prop_assert_eq!(outgoing, 1);
        }
    }

    /// Every footprint corner is consumed exactly once.
    #[test]
    fn proptest_every_corner_has_one_arc((center, radius, sides) in arb_regular_polygon()) {
        let skeleton = straight_skeleton(&regular_points(center, radius, sides)).unwrap();

        for corner in 0..sides {
            let outgoing = skeleton.arcs.iter().filter(|a| a.from == corner).count();
            prop_assert_eq!(outgoing, 1);
        }
    }
}
