// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Footprint validation and normalization.

use nalgebra::{Point2, Point3};

use crate::error::{Error, Result};
use crate::geometry::signed_area;

/// A validated footprint ready for the simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    /// Counter-clockwise ring, first point not repeated.
    pub points: Vec<Point2<f64>>,
    /// Common z of the input points.
    pub base_z: f64,
    /// `true` when the input was clockwise and has been reversed.
    pub reversed: bool,
}

/// Checks a footprint and brings it into counter-clockwise order.
///
/// Rejects rings with fewer than three points, a closing point equal to the
/// first, points off the plane of the first point, and zero area.
pub fn init_polygon(polygon: &[Point3<f64>], epsilon: f64) -> Result<Footprint> {
    let (Some(first), Some(last)) = (polygon.first(), polygon.last()) else {
        return Err(Error::InvalidPolygon("polygon has no points".into()));
    };
    if polygon.len() < 3 {
        return Err(Error::InvalidPolygon(format!(
            "polygon needs at least 3 points, got {}",
            polygon.len()
        )));
    }
    if first == last {
        return Err(Error::InvalidPolygon("first point repeats as last point".into()));
    }
    if polygon.iter().any(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite())) {
        return Err(Error::InvalidPolygon("polygon has non-finite coordinates".into()));
    }

    let base_z = first.z;
    if let Some(p) = polygon.iter().find(|p| (p.z - base_z).abs() > epsilon) {
        return Err(Error::InvalidPolygon(format!(
            "point ({}, {}, {}) is not at base height {}",
            p.x, p.y, p.z, base_z
        )));
    }

    let mut points: Vec<Point2<f64>> = polygon.iter().map(|p| Point2::new(p.x, p.y)).collect();
    let area = signed_area(&points);
    if area.abs() < epsilon {
        return Err(Error::InvalidPolygon("polygon has zero area".into()));
    }

    let reversed = area < 0.0;
    if reversed {
        points.reverse();
    }
    Ok(Footprint {
        points,
        base_z,
        reversed,
    })
}
