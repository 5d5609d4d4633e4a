// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event computation for wavefront vertices.
//!
//! Edge events come from intersecting the bisectors of loop neighbours. Split
//! events test a vertex bisector against every footprint edge: the candidate
//! point is where the bisector meets the angle bisector between one of the
//! vertex's own edges and the tested edge, and it only counts when it falls
//! inside the region swept by that edge (between the edge's corner
//! bisectors).

use smallvec::SmallVec;

use crate::arena::{EdgeData, SkeletonArena, VertexData};
use crate::error::Result;
use crate::event::{QueueEvent, SplitCandidate, SplitTarget};
use crate::geometry::{calc_vector_bisector, distance_to_line, Ray2d};
use crate::keys::{EdgeKey, VertexKey};

/// Events seeded before the first iteration.
#[derive(Debug, Default)]
pub(crate) struct InitialEvents {
    pub events: Vec<QueueEvent>,
    pub edge_events: usize,
    pub split_events: usize,
}

impl SkeletonArena {
    /// Edge event where the bisectors of two loop neighbours meet.
    ///
    /// The event height is the distance from the meeting point to the edge
    /// shared by the two vertices.
    pub(crate) fn edge_event(&self, previous: VertexKey, next: VertexKey) -> Result<Option<QueueEvent>> {
        let pv = self.vertex(previous)?;
        let nv = self.vertex(next)?;
        let Some(point) = pv.bisector.intersect_ray(&nv.bisector) else {
            return Ok(None);
        };
        if point == pv.point || point == nv.point {
            return Ok(None);
        }
        let edge = self.edge(pv.next_edge)?;
        let distance = distance_to_line(&point, &edge.begin, &edge.end);
        Ok(Some(QueueEvent::edge(point, distance, previous, next)))
    }

    /// Edge events of a vertex with both loop neighbours, keeping only the
    /// closer one (both when they tie within `epsilon`).
    ///
    /// Also returns the squared distance from the vertex to the kept event,
    /// used to prune split candidates.
    pub(crate) fn closer_edge_events(
        &self,
        key: VertexKey,
        epsilon: f64,
    ) -> Result<(SmallVec<[QueueEvent; 2]>, Option<f64>)> {
        let source = self.vertex(key)?.point;
        let next = self.next(key)?;
        let prev = self.prev(key)?;

        let forward = self.edge_event(key, next)?;
        let backward = self.edge_event(prev, key)?;
        let d1 = forward.map(|e| (e.point - source).norm_squared());
        let d2 = backward.map(|e| (e.point - source).norm_squared());

        let mut out = SmallVec::new();
        match (forward, d1, backward, d2) {
            (Some(f), Some(d1), Some(b), Some(d2)) => {
                if d1 - epsilon < d2 {
                    out.push(f);
                }
                if d2 - epsilon < d1 {
                    out.push(b);
                }
                Ok((out, Some(d1.min(d2))))
            }
            (Some(f), Some(d1), _, _) => {
                out.push(f);
                Ok((out, Some(d1)))
            }
            (_, _, Some(b), Some(d2)) => {
                out.push(b);
                Ok((out, Some(d2)))
            }
            _ => Ok((out, None)),
        }
    }

    /// Split candidates of a vertex against every non-incident footprint
    /// edge in front of it, nearest first.
    pub(crate) fn split_candidates(&self, key: VertexKey, epsilon: f64) -> Result<Vec<SplitCandidate>> {
        let vertex = self.vertex(key)?;
        let prev_edge = self.edge(vertex.previous_edge)?;
        let next_edge = self.edge(vertex.next_edge)?;

        let mut out = Vec::new();
        for &edge_key in &self.edge_order {
            if edge_key == vertex.previous_edge || edge_key == vertex.next_edge {
                continue;
            }
            let edge = self.edge(edge_key)?;
            if edge_behind_bisector(&vertex.bisector, edge, epsilon) {
                continue;
            }
            let Some(vertex_edge) = less_parallel_edge(prev_edge, next_edge, edge, epsilon) else {
                continue;
            };
            if let Some(candidate) = candidate_point_for_split(vertex, vertex_edge, edge_key, edge, epsilon) {
                out.push(candidate);
            }
        }
        out.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Ok(out)
    }

    /// Split events of a vertex. With a `bound`, candidates farther from the
    /// vertex than that squared distance (plus `epsilon`) are dropped.
    pub(crate) fn split_events(&self, key: VertexKey, bound: Option<f64>, epsilon: f64) -> Result<Vec<QueueEvent>> {
        let source = self.vertex(key)?.point;
        Ok(self
            .split_candidates(key, epsilon)?
            .into_iter()
            .filter(|c| bound.map_or(true, |limit| (c.point - source).norm_squared() <= limit + epsilon))
            .map(|c| match c.opposite {
                SplitTarget::Point(corner) => {
                    tracing::trace!(
                        corner_x = corner.x,
                        corner_y = corner.y,
                        height = c.distance,
                        "Split candidate lands on a footprint corner"
                    );
                    QueueEvent::split_vertex(c.point, c.distance, key)
                }
                SplitTarget::Edge(edge) => QueueEvent::split(c.point, c.distance, key, edge),
            })
            .collect())
    }

    /// All events for a freshly created vertex: the closer edge event(s),
    /// then split events no farther than that.
    pub(crate) fn vertex_events(&self, key: VertexKey, epsilon: f64) -> Result<Vec<QueueEvent>> {
        let (edge_events, bound) = self.closer_edge_events(key, epsilon)?;
        let mut events: Vec<QueueEvent> = edge_events.into_vec();
        events.extend(self.split_events(key, bound, epsilon)?);
        Ok(events)
    }

    /// Unpruned split events for every loop vertex, then one edge event per
    /// adjacent pair.
    pub(crate) fn initial_events(&self, epsilon: f64) -> Result<InitialEvents> {
        let mut seeded = InitialEvents::default();
        let mut ring = Vec::new();
        for lav in self.lavs.keys() {
            ring.extend(self.lav_vertices(lav)?);
        }

        for &key in &ring {
            let splits = self.split_events(key, None, epsilon)?;
            seeded.split_events += splits.len();
            seeded.events.extend(splits);
        }
        for &key in &ring {
            let next = self.next(key)?;
            if let Some(event) = self.edge_event(key, next)? {
                seeded.edge_events += 1;
                seeded.events.push(event);
            }
        }
        Ok(seeded)
    }
}

/// `true` when the bisector never reaches the edge's supporting line.
fn edge_behind_bisector(bisector: &Ray2d, edge: &EdgeData, epsilon: f64) -> bool {
    bisector.collide(&edge.line, epsilon).is_none()
}

/// The vertex edge least parallel to `edge`, or `None` when both are
/// (anti)parallel to it.
fn less_parallel_edge<'a>(
    prev: &'a EdgeData,
    next: &'a EdgeData,
    edge: &EdgeData,
    epsilon: f64,
) -> Option<&'a EdgeData> {
    let prev_dot = edge.direction.dot(&prev.direction).abs();
    let next_dot = edge.direction.dot(&next.direction).abs();
    if prev_dot + next_dot >= 2.0 - epsilon {
        return None;
    }
    Some(if prev_dot > next_dot { next } else { prev })
}

fn candidate_point_for_split(
    vertex: &VertexData,
    vertex_edge: &EdgeData,
    edge_key: EdgeKey,
    edge: &EdgeData,
    epsilon: f64,
) -> Option<SplitCandidate> {
    let edges_bisector = calc_vector_bisector(&vertex_edge.direction, &edge.direction);
    let edges_collide = vertex_edge.line.collide(&edge.line)?;
    let bisector_line = Ray2d::new(edges_collide, edges_bisector).linear_form();
    let point = vertex.bisector.collide(&bisector_line, epsilon)?;

    let inside = edge.bisector_previous.is_on_right_side(&point, epsilon)
        && edge.bisector_next.is_on_left_side(&point, epsilon);
    if !inside {
        return None;
    }

    let distance = distance_to_line(&point, &edge.begin, &edge.end);
    let on_corner = edge.bisector_previous.is_on_left_side(&point, epsilon)
        || edge.bisector_next.is_on_right_side(&point, epsilon);
    let opposite = if on_corner {
        SplitTarget::Point(edge.begin)
    } else {
        SplitTarget::Edge(edge_key)
    };
    Some(SplitCandidate { point, distance, opposite })
}
