// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Roof generators built on the straight skeleton.
//!
//! A skeleton node at wavefront height `h` sits at
//! `base_z + h * tan(pitch)` on the roof. Every skeleton arc becomes one roof
//! line. Facet outlines are not assembled, so [`Roof::facets`] stays empty.

use nalgebra::{Point3, Vector3};

use crate::config::SkeletonConfig;
use crate::error::{Error, Result};
use crate::output::Skeleton;
use crate::polygon::init_polygon;
use crate::simulation::SkeletonBuilder;

/// Classification of a roof line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoofLineKind {
    /// From a convex footprint corner up to the roof.
    Hip,
    /// From a reflex footprint corner up to the roof.
    Valley,
    /// Between two points above the eaves.
    Ridge,
}

/// A roof line in the footprint's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoofLine {
    pub start: Point3<f64>,
    pub end: Point3<f64>,
    pub kind: RoofLineKind,
}

impl RoofLine {
    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }

    pub fn direction(&self) -> Vector3<f64> {
        self.end - self.start
    }
}

/// Generated roof geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Roof {
    /// Eave height, the z of the input footprint.
    pub base_z: f64,
    pub pitch_degrees: f64,
    pub lines: Vec<RoofLine>,
    /// Facet outlines. Always empty: facets are not assembled from the
    /// skeleton.
    pub facets: Vec<Vec<Point3<f64>>>,
    /// The underlying skeleton, `None` for generators that do not run one.
    pub skeleton: Option<Skeleton>,
}

impl Roof {
    fn empty(base_z: f64, pitch_degrees: f64) -> Self {
        Self {
            base_z,
            pitch_degrees,
            lines: Vec::new(),
            facets: Vec::new(),
            skeleton: None,
        }
    }

    /// Highest point of the roof.
    pub fn ridge_height(&self) -> f64 {
        self.lines
            .iter()
            .flat_map(|l| [l.start.z, l.end.z])
            .fold(self.base_z, f64::max)
    }

    pub fn lines_of(&self, kind: RoofLineKind) -> impl Iterator<Item = &RoofLine> {
        self.lines.iter().filter(move |l| l.kind == kind)
    }
}

/// Hip roof: every footprint edge gets a sloped face rising at `pitch_degrees`.
pub fn make_hip_roof(polygon: &[Point3<f64>], pitch_degrees: f64) -> Result<Roof> {
    make_hip_roof_with_config(polygon, pitch_degrees, &SkeletonConfig::default())
}

pub fn make_hip_roof_with_config(polygon: &[Point3<f64>], pitch_degrees: f64, config: &SkeletonConfig) -> Result<Roof> {
    let slope = slope(pitch_degrees)?;
    let footprint = init_polygon(polygon, config.epsilon)?;
    let base_z = footprint.base_z;
    let skeleton = SkeletonBuilder::with_config(config.clone()).build_footprint(&footprint)?;

    let lift = |i: usize| {
        let node = &skeleton.nodes[i];
        Point3::new(node.point.x, node.point.y, base_z + node.height * slope)
    };
    let lines = skeleton
        .arcs
        .iter()
        .filter(|a| a.from < skeleton.nodes.len() && a.to < skeleton.nodes.len())
        .map(|a| {
            let from = &skeleton.nodes[a.from];
            let to = &skeleton.nodes[a.to];
            let kind = if from.height > config.epsilon && to.height > config.epsilon {
                RoofLineKind::Ridge
            } else if from.reflex || to.reflex {
                RoofLineKind::Valley
            } else {
                RoofLineKind::Hip
            };
            RoofLine {
                start: lift(a.from),
                end: lift(a.to),
                kind,
            }
        })
        .collect();

    Ok(Roof {
        base_z,
        pitch_degrees,
        lines,
        facets: Vec::new(),
        skeleton: Some(skeleton),
    })
}

/// Gable roof. Gable end adjustment is not applied, so the geometry is that
/// of [`make_hip_roof`].
pub fn make_gable_roof(polygon: &[Point3<f64>], pitch_degrees: f64) -> Result<Roof> {
    make_gable_roof_with_config(polygon, pitch_degrees, &SkeletonConfig::default())
}

pub fn make_gable_roof_with_config(
    polygon: &[Point3<f64>],
    pitch_degrees: f64,
    config: &SkeletonConfig,
) -> Result<Roof> {
    let roof = make_hip_roof_with_config(polygon, pitch_degrees, config)?;
    tracing::debug!(lines = roof.lines.len(), "Gable end adjustment not applied, returning hip geometry");
    Ok(roof)
}

/// Shed roof. Only validates its input and returns an empty roof.
pub fn make_shed_roof(polygon: &[Point3<f64>], pitch_degrees: f64, direction_degrees: f64) -> Result<Roof> {
    make_shed_roof_with_config(polygon, pitch_degrees, direction_degrees, &SkeletonConfig::default())
}

pub fn make_shed_roof_with_config(
    polygon: &[Point3<f64>],
    pitch_degrees: f64,
    direction_degrees: f64,
    config: &SkeletonConfig,
) -> Result<Roof> {
    slope(pitch_degrees)?;
    let footprint = init_polygon(polygon, config.epsilon)?;
    tracing::warn!(
        points = footprint.points.len(),
        pitch_degrees,
        direction_degrees,
        "Shed roofs are not generated, returning an empty roof"
    );
    Ok(Roof::empty(footprint.base_z, pitch_degrees))
}

/// Rise per unit of horizontal run.
fn slope(pitch_degrees: f64) -> Result<f64> {
    if !pitch_degrees.is_finite() || !(0.0..90.0).contains(&pitch_degrees) {
        return Err(Error::InvalidPitch(pitch_degrees));
    }
    Ok(pitch_degrees.to_radians().tan())
}
