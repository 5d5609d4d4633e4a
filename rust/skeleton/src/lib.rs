// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Roof Skeleton
//!
//! Straight-skeleton computation for building footprints and the hip roof
//! geometry derived from it.
//!
//! The skeleton is computed with an event-driven wavefront simulation in the
//! style of Felkel and Obdržálek: the footprint edges move inward at unit
//! speed, and the shrinking outline is tracked as loops of active vertices
//! (LAVs) stored in slot-map arenas. Events are processed one height level at
//! a time, grouping coincident events into chains so degenerate
//! configurations (several corners meeting at one point) are handled as a
//! single step.
//!
//! ## Quick start
//!
//! ```
//! use nalgebra::Point3;
//! use roof_skeleton::{make_hip_roof, RoofLineKind};
//!
//! let footprint = [
//!     Point3::new(0.0, 0.0, 3.0),
//!     Point3::new(6.0, 0.0, 3.0),
//!     Point3::new(6.0, 2.0, 3.0),
//!     Point3::new(0.0, 2.0, 3.0),
//! ];
//! let roof = make_hip_roof(&footprint, 45.0).unwrap();
//!
//! assert_eq!(roof.lines_of(RoofLineKind::Ridge).count(), 1);
//! assert_eq!(roof.lines_of(RoofLineKind::Hip).count(), 4);
//! ```
//!
//! Errors separate bad input ([`Error::InvalidPolygon`], [`Error::InvalidPitch`])
//! from failures of the simulation itself; see [`Error::is_internal`].

pub mod arena;
pub mod chain;
pub mod compute;
pub mod config;
pub mod error;
pub mod event;
pub mod geometry;
pub mod keys;
pub mod lav;
pub mod output;
pub mod polygon;
pub mod roof;
pub mod serialization;
pub mod simulation;

pub use arena::{EdgeData, LavData, SkeletonArena, VertexData};
pub use chain::{Chain, ChainBoundary, ChainKind, LevelEvent};
pub use config::SkeletonConfig;
pub use error::{Error, Result};
pub use event::{EventKind, EventQueue, QueueEvent, SplitCandidate, SplitTarget};
pub use geometry::{LineLinear2d, Ray2d};
pub use keys::{EdgeKey, LavKey, VertexKey};
pub use output::{LevelEventKind, LevelRecord, Skeleton, SkeletonArc, SkeletonNode, SkeletonStats};
pub use polygon::{init_polygon, Footprint};
pub use roof::{
    make_gable_roof, make_gable_roof_with_config, make_hip_roof, make_hip_roof_with_config,
    make_shed_roof, make_shed_roof_with_config, Roof, RoofLine, RoofLineKind,
};
pub use serialization::SkeletonSnapshot;
pub use simulation::SkeletonBuilder;

/// Computes the straight skeleton of a footprint with default settings.
pub fn straight_skeleton(polygon: &[nalgebra::Point3<f64>]) -> Result<Skeleton> {
    SkeletonBuilder::new().build(polygon)
}
