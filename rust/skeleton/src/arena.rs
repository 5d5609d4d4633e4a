// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based storage for the shrinking wavefront.
//!
//! The [`SkeletonArena`] owns the original footprint edges, every wavefront
//! vertex ever created, and the set of active vertex loops (LAVs). Each LAV is
//! a doubly linked cycle threaded through the vertices themselves
//! (`prev`/`next` keys plus the owning `lav` key), so splitting or merging
//! loops only rewrites a handful of links.
//!
//! Edges never change after initialization. Vertices are never removed from
//! the arena: a consumed vertex is flagged `processed` and unlinked from its
//! loop, which lets queued events referencing it detect that they are stale.

use nalgebra::{Point2, Vector2};
use slotmap::SlotMap;

use crate::error::{Error, Result};
use crate::geometry::{calc_bisector, normalize_or_zero, LineLinear2d, Ray2d};
use crate::keys::*;

/// An original footprint edge with the bisectors at both of its corners.
#[derive(Debug, Clone)]
pub struct EdgeData {
    pub begin: Point2<f64>,
    pub end: Point2<f64>,
    /// Unit direction from `begin` to `end`.
    pub direction: Vector2<f64>,
    /// Supporting line.
    pub line: LineLinear2d,
    /// Bisector at `begin`, shared with the previous edge.
    pub bisector_previous: Ray2d,
    /// Bisector at `end`, shared with the next edge.
    pub bisector_next: Ray2d,
}

/// A wavefront vertex moving along its bisector.
#[derive(Debug, Clone)]
pub struct VertexData {
    pub point: Point2<f64>,
    /// Height at which the vertex was born.
    pub distance: f64,
    pub bisector: Ray2d,
    pub previous_edge: EdgeKey,
    pub next_edge: EdgeKey,
    /// Set once the vertex has been consumed by an event.
    pub processed: bool,
    /// Index of the skeleton node this vertex starts from.
    pub node: usize,
    // Loop membership. `prev`/`next` point at the vertex itself while it is
    // not linked into a loop.
    pub(crate) lav: Option<LavKey>,
    pub(crate) prev: VertexKey,
    pub(crate) next: VertexKey,
}

/// Bookkeeping for one active vertex loop.
#[derive(Debug, Clone)]
pub struct LavData {
    pub(crate) head: VertexKey,
    pub(crate) len: usize,
}

/// Central owner of edges, vertices and loops for one skeleton run.
///
/// # Example
///
/// ```
/// use nalgebra::Point2;
/// use roof_skeleton::SkeletonArena;
///
/// let square = [
///     Point2::new(0.0, 0.0),
///     Point2::new(1.0, 0.0),
///     Point2::new(1.0, 1.0),
///     Point2::new(0.0, 1.0),
/// ];
/// let arena = SkeletonArena::from_ring(&square);
///
/// assert_eq!(arena.edge_count(), 4);
/// assert_eq!(arena.live_vertex_count(), 4);
/// assert_eq!(arena.lav_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct SkeletonArena {
    pub(crate) edges: SlotMap<EdgeKey, EdgeData>,
    /// Edge keys in footprint order.
    pub(crate) edge_order: Vec<EdgeKey>,
    pub(crate) vertices: SlotMap<VertexKey, VertexData>,
    pub(crate) lavs: SlotMap<LavKey, LavData>,
}

impl SkeletonArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds edges, corner bisectors and the initial loop from a
    /// counter-clockwise ring (first point not repeated).
    ///
    /// Edge `i` runs from point `i` to point `i + 1`; the vertex for edge `i`
    /// sits at its end, between edge `i` and edge `i + 1`. Vertex nodes are
    /// numbered in the same order.
    pub fn from_ring(points: &[Point2<f64>]) -> Self {
        let mut arena = Self::new();
        let n = points.len();
        if n == 0 {
            return arena;
        }

        let directions: Vec<Vector2<f64>> = (0..n)
            .map(|i| normalize_or_zero(&(points[(i + 1) % n] - points[i])))
            .collect();

        // Bisector at the end of edge i.
        let corner_bisectors: Vec<Ray2d> = (0..n)
            .map(|i| calc_bisector(points[(i + 1) % n], &directions[i], &directions[(i + 1) % n]))
            .collect();

        for i in 0..n {
            let begin = points[i];
            let end = points[(i + 1) % n];
            let key = arena.edges.insert(EdgeData {
                begin,
                end,
                direction: directions[i],
                line: LineLinear2d::new(&begin, &end),
                bisector_previous: corner_bisectors[(i + n - 1) % n],
                bisector_next: corner_bisectors[i],
            });
            arena.edge_order.push(key);
        }

        let mut ring = Vec::with_capacity(n);
        for i in 0..n {
            let edge = arena.edge_order[i];
            let next_edge = arena.edge_order[(i + 1) % n];
            let point = points[(i + 1) % n];
            ring.push(arena.add_vertex(point, 0.0, corner_bisectors[i], edge, next_edge, i));
        }
        arena.create_lav(&ring);
        arena
    }

    // --- Edge operations ---

    /// Returns the edge data for the given key.
    pub fn edge(&self, key: EdgeKey) -> Result<&EdgeData> {
        self.edges.get(key).ok_or(Error::EdgeNotFound(key))
    }

    /// Returns the number of footprint edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edge keys in footprint order.
    pub fn edge_keys(&self) -> &[EdgeKey] {
        &self.edge_order
    }

    // --- Vertex operations ---

    /// Adds an unlinked, live vertex.
    pub fn add_vertex(
        &mut self,
        point: Point2<f64>,
        distance: f64,
        bisector: Ray2d,
        previous_edge: EdgeKey,
        next_edge: EdgeKey,
        node: usize,
    ) -> VertexKey {
        self.vertices.insert_with_key(|key| VertexData {
            point,
            distance,
            bisector,
            previous_edge,
            next_edge,
            processed: false,
            node,
            lav: None,
            prev: key,
            next: key,
        })
    }

    /// Returns the vertex data for the given key.
    pub fn vertex(&self, key: VertexKey) -> Result<&VertexData> {
        self.vertices.get(key).ok_or(Error::VertexNotFound(key))
    }

    pub(crate) fn vertex_mut(&mut self, key: VertexKey) -> Result<&mut VertexData> {
        self.vertices.get_mut(key).ok_or(Error::VertexNotFound(key))
    }

    /// Returns `true` if the vertex exists and has not been consumed.
    pub fn is_live(&self, key: VertexKey) -> bool {
        self.vertices.get(key).is_some_and(|v| !v.processed)
    }

    /// Returns the number of vertices ever created.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of vertices still linked into a loop.
    pub fn live_vertex_count(&self) -> usize {
        self.lavs.values().map(|lav| lav.len).sum()
    }

    // --- LAV operations ---

    /// Returns the number of loops, including loops emptied during the
    /// current level that have not been dropped yet.
    pub fn lav_count(&self) -> usize {
        self.lavs.len()
    }

    /// Loop keys in storage order.
    pub fn lav_keys(&self) -> Vec<LavKey> {
        self.lavs.keys().collect()
    }

    pub(crate) fn lav(&self, key: LavKey) -> Result<&LavData> {
        self.lavs.get(key).ok_or(Error::LavNotFound(key))
    }

    pub(crate) fn lav_mut(&mut self, key: LavKey) -> Result<&mut LavData> {
        self.lavs.get_mut(key).ok_or(Error::LavNotFound(key))
    }

    /// Number of vertices in a loop.
    pub fn lav_len(&self, key: LavKey) -> Result<usize> {
        Ok(self.lav(key)?.len)
    }
}
