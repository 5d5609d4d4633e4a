// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The wavefront simulation: level-by-level event processing.
//!
//! Each iteration of the main loop pops one level of same-height events,
//! groups it into [`LevelEvent`]s and dispatches them:
//!
//! - **pick**: a closed chain retires its whole loop at one apex;
//! - **multi-edge**: a run of vertices collapses into one new vertex;
//! - **multi-split**: chains meeting at a point cut or merge loops, creating
//!   one new vertex between every pair of neighbouring chains.
//!
//! After a level, two-vertex loops become ridge arcs, events at or below the
//! level height are dropped and emptied loops are removed.

use nalgebra::{Point2, Point3};
use rustc_hash::FxHashSet;

use crate::arena::SkeletonArena;
use crate::chain::{group_level, load_level, Chain, ChainBoundary, ChainKind, LevelEvent};
use crate::config::SkeletonConfig;
use crate::error::{Error, Result};
use crate::event::EventQueue;
use crate::geometry::{calc_bisector, calc_vector_bisector, normalize_or_zero, perp_dot};
use crate::keys::{EdgeKey, VertexKey};
use crate::output::{LevelEventKind, LevelRecord, Skeleton};
use crate::polygon::{init_polygon, Footprint};

/// Entry point for computing straight skeletons.
///
/// # Example
///
/// ```
/// use nalgebra::Point3;
/// use roof_skeleton::SkeletonBuilder;
///
/// let square = [
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(2.0, 0.0, 0.0),
///     Point3::new(2.0, 2.0, 0.0),
///     Point3::new(0.0, 2.0, 0.0),
/// ];
/// let skeleton = SkeletonBuilder::new().build(&square).unwrap();
///
/// assert!(skeleton.is_complete());
/// assert!((skeleton.max_height() - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SkeletonBuilder {
    config: SkeletonConfig,
}

impl SkeletonBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SkeletonConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SkeletonConfig {
        &self.config
    }

    /// Validates and normalizes the footprint, then runs the simulation.
    pub fn build(&self, polygon: &[Point3<f64>]) -> Result<Skeleton> {
        let footprint = init_polygon(polygon, self.config.epsilon)?;
        self.build_footprint(&footprint)
    }

    /// Runs the simulation on an already validated footprint.
    pub(crate) fn build_footprint(&self, footprint: &Footprint) -> Result<Skeleton> {
        tracing::debug!(
            points = footprint.points.len(),
            base_z = footprint.base_z,
            reversed = footprint.reversed,
            "Normalized footprint"
        );
        Simulation::new(&footprint.points, &self.config)?.run()
    }

    /// Same as [`Self::build`] for a planar footprint.
    pub fn build_2d(&self, polygon: &[Point2<f64>]) -> Result<Skeleton> {
        let lifted: Vec<Point3<f64>> = polygon.iter().map(|p| Point3::new(p.x, p.y, 0.0)).collect();
        self.build(&lifted)
    }
}

/// State owned by one run.
struct Simulation<'a> {
    config: &'a SkeletonConfig,
    arena: SkeletonArena,
    queue: EventQueue,
    skeleton: Skeleton,
}

impl<'a> Simulation<'a> {
    /// Seeds corner nodes and the initial event queue from a CCW ring.
    fn new(points: &[Point2<f64>], config: &'a SkeletonConfig) -> Result<Self> {
        let arena = SkeletonArena::from_ring(points);
        let mut skeleton = Skeleton::default();

        for lav in arena.lav_keys() {
            for key in arena.lav_vertices(lav)? {
                let v = arena.vertex(key)?;
                let incoming = arena.edge(v.previous_edge)?.direction;
                let outgoing = arena.edge(v.next_edge)?.direction;
                let node = skeleton.add_node(v.point, 0.0, perp_dot(&incoming, &outgoing) < 0.0);
                debug_assert_eq!(node, v.node);
            }
        }

        let seeded = arena.initial_events(config.epsilon)?;
        skeleton.stats.initial_edge_events = seeded.edge_events;
        skeleton.stats.initial_split_events = seeded.split_events;

        let mut queue = EventQueue::new();
        queue.extend(seeded.events);

        Ok(Self {
            config,
            arena,
            queue,
            skeleton,
        })
    }

    fn run(mut self) -> Result<Skeleton> {
        let span = tracing::info_span!("straight_skeleton", points = self.arena.edge_count());
        let _enter = span.enter();

        tracing::debug!(
            edge_events = self.skeleton.stats.initial_edge_events,
            split_events = self.skeleton.stats.initial_split_events,
            "Seeded event queue"
        );

        let epsilon = self.config.epsilon;
        let mut last_height = 0.0_f64;
        let mut iterations = 0;

        while !self.queue.is_empty() {
            iterations += 1;
            if iterations > self.config.max_iterations {
                return Err(Error::IterationLimitExceeded {
                    limit: self.config.max_iterations,
                    height: last_height,
                });
            }

            let level_start = self.queue.next_sequence();
            let level = load_level(&mut self.queue, &self.arena, epsilon);
            let Some(first) = level.first() else {
                break;
            };
            let height = first.distance;
            if height < last_height - epsilon {
                return Err(Error::invariant(format!(
                    "level height {height} is below the previous level {last_height}"
                ))
                .at_event(first.kind_name(), (first.point.x, first.point.y), height));
            }
            last_height = last_height.max(height);

            for event in group_level(level, epsilon)? {
                if event.is_stale(&self.arena) {
                    self.skeleton.stats.skipped_level_events += 1;
                    tracing::debug!(
                        kind = %event.kind,
                        x = event.point.x,
                        y = event.point.y,
                        height = event.distance,
                        "Skipped level event with consumed vertices"
                    );
                    continue;
                }
                self.dispatch(&event)
                    .map_err(|e| e.at_event(event.kind.as_str(), (event.point.x, event.point.y), event.distance))?;
            }

            self.collapse_small_lavs()?;
            // Events found while handling this level are kept even at the
            // level height; they belong to vertices born in it.
            let dropped = self.queue.remove_up_to(height + epsilon, level_start);
            if dropped > 0 {
                tracing::trace!(dropped, height, "Dropped events at or below level");
            }
            self.arena.remove_empty_lavs();
        }

        self.skeleton.stats.iterations = iterations;
        self.skeleton.stats.unresolved_loops = self.arena.lav_count();
        if self.skeleton.stats.unresolved_loops > 0 {
            tracing::warn!(
                loops = self.skeleton.stats.unresolved_loops,
                vertices = self.arena.live_vertex_count(),
                "Event queue exhausted with unresolved loops"
            );
        }
        tracing::info!(
            iterations,
            nodes = self.skeleton.nodes.len(),
            arcs = self.skeleton.arcs.len(),
            levels = self.skeleton.levels.len(),
            "Straight skeleton complete"
        );
        Ok(self.skeleton)
    }

    fn dispatch(&mut self, event: &LevelEvent) -> Result<()> {
        let handled = match event.kind {
            LevelEventKind::Pick => Some(self.pick(event)?),
            LevelEventKind::MultiEdge => Some(self.multi_edge(event)?),
            LevelEventKind::MultiSplit => self.multi_split(event)?,
        };
        let Some(chains) = handled else {
            return Ok(());
        };

        tracing::debug!(
            kind = %event.kind,
            x = event.point.x,
            y = event.point.y,
            height = event.distance,
            chains,
            "Processed level event"
        );
        self.skeleton.levels.push(LevelRecord {
            kind: event.kind,
            point: event.point,
            height: event.distance,
            chains,
        });
        Ok(())
    }

    /// A closed chain: the whole loop ends at the apex.
    fn pick(&mut self, event: &LevelEvent) -> Result<usize> {
        let node = self.skeleton.add_node(event.point, event.distance, false);
        for chain in &event.chains {
            for &key in &chain.members {
                self.retire_at(key, node)?;
            }
        }
        Ok(event.chains.len())
    }

    /// An open edge chain: its run collapses into one vertex.
    fn multi_edge(&mut self, event: &LevelEvent) -> Result<usize> {
        let [chain] = event.chains.as_slice() else {
            return Err(Error::invariant(format!(
                "multi-edge event with {} chains",
                event.chains.len()
            )));
        };
        let Some(&first) = chain.members.first() else {
            return Err(Error::invariant("multi-edge chain without members"));
        };
        if !chain.is_linked(&self.arena) {
            return Err(Error::invariant("multi-edge chain members are not consecutive in one loop"));
        }
        let boundary = chain.boundary(&self.arena)?;

        let node = self.skeleton.add_node(event.point, event.distance, false);
        let new = self.new_vertex(event, boundary.previous_edge, boundary.next_edge, node)?;
        self.arena.insert_before(first, new)?;
        for &key in &chain.members {
            self.retire_at(key, node)?;
        }
        self.push_vertex_events(new, event.distance - self.config.epsilon)?;
        Ok(1)
    }

    /// Chains meeting at one point. Returns `None` when fewer than two
    /// chains remain after opposite-edge resolution.
    ///
    /// A split chain is dropped when no live segment of its opposite edge
    /// reaches the event point; its parent gets fresh events above the
    /// current height.
    fn multi_split(&mut self, event: &LevelEvent) -> Result<Option<usize>> {
        let center = event.point;

        let mut chains: Vec<(&Chain, ChainBoundary)> = Vec::with_capacity(event.chains.len());
        for chain in &event.chains {
            chains.push((chain, chain.boundary(&self.arena)?));
        }
        let mut covered: FxHashSet<EdgeKey> = chains
            .iter()
            .flat_map(|(_, b)| [b.previous_edge, b.next_edge])
            .collect();

        let mut opposite_chains: Vec<Chain> = Vec::new();
        let mut unreachable: FxHashSet<EdgeKey> = FxHashSet::default();
        let mut rejected: Vec<VertexKey> = Vec::new();
        let mut kept: Vec<(&Chain, ChainBoundary)> = Vec::with_capacity(chains.len());
        for (chain, boundary) in chains {
            if let (ChainKind::Split, Some(edge)) = (chain.kind, chain.opposite_edge) {
                if unreachable.contains(&edge) {
                    rejected.extend(chain.members.iter().copied());
                    continue;
                }
                if covered.insert(edge) {
                    let candidates = self.arena.vertices_on_edge(edge)?;
                    let parent_lav = chain.members.first().and_then(|&p| self.arena.lav_of(p).ok());
                    match self
                        .arena
                        .choose_opposite_edge_vertex(&candidates, edge, &center, parent_lav)?
                    {
                        Some(next) => {
                            let previous = self.arena.prev(next)?;
                            opposite_chains.push(Chain::opposite_edge(edge, previous, next));
                        }
                        None => {
                            tracing::debug!(
                                x = center.x,
                                y = center.y,
                                candidates = candidates.len(),
                                "Dropped split chain whose opposite edge does not reach the event point"
                            );
                            unreachable.insert(edge);
                            rejected.extend(chain.members.iter().copied());
                            continue;
                        }
                    }
                }
            }
            kept.push((chain, boundary));
        }
        for chain in &opposite_chains {
            kept.push((chain, chain.boundary(&self.arena)?));
        }

        if kept.len() < 2 {
            tracing::debug!(
                x = center.x,
                y = center.y,
                height = event.distance,
                chains = kept.len(),
                "Skipped multi-split with a single chain"
            );
            self.requeue_rejected(&rejected, event.distance)?;
            return Ok(None);
        }

        let mut ordered = Vec::with_capacity(kept.len());
        for (chain, boundary) in kept {
            let begin = self.arena.edge(boundary.previous_edge)?.begin;
            let angle = (begin.y - center.y).atan2(begin.x - center.x);
            ordered.push((angle, chain, boundary));
        }
        ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

        let node = self.skeleton.add_node(center, event.distance, false);
        let mut created: Vec<VertexKey> = Vec::with_capacity(ordered.len());
        for i in 0..ordered.len() {
            let (_, _, begin) = ordered[i];
            let (_, _, end) = ordered[(i + 1) % ordered.len()];
            created.push(self.split_pair(event, &begin, &end, node)?);
        }

        for (_, chain, _) in &ordered {
            for &key in &chain.members {
                self.retire_at(key, node)?;
            }
        }
        for key in created {
            if self.arena.is_live(key) {
                self.push_vertex_events(key, event.distance - self.config.epsilon)?;
            }
        }
        self.requeue_rejected(&rejected, event.distance)?;
        Ok(Some(ordered.len()))
    }

    /// New vertex between two neighbouring chains of a multi-split, linked by
    /// cutting or merging the loops that hold its boundary vertices.
    fn split_pair(
        &mut self,
        event: &LevelEvent,
        begin: &ChainBoundary,
        end: &ChainBoundary,
        node: usize,
    ) -> Result<VertexKey> {
        let begin_next = begin.next_vertex;
        let end_prev = end.previous_vertex;
        if self.arena.vertex(begin_next)?.previous_edge != begin.next_edge
            || self.arena.vertex(end_prev)?.next_edge != end.previous_edge
        {
            return Err(Error::invariant("multi-split boundary vertices do not match the chain edges"));
        }

        let new = self.new_vertex(event, end.previous_edge, begin.next_edge, node)?;
        self.correct_bisector_direction(new, begin_next, end_prev)?;

        if self.arena.same_lav(begin_next, end_prev) {
            self.arena.cut(begin_next, end_prev, new)?;
        } else {
            self.arena.merge(begin_next, end_prev, new)?;
        }
        Ok(new)
    }

    /// Near-antiparallel edges give an ill-conditioned bisector; orient it by
    /// the neighbouring wavefront points instead.
    fn correct_bisector_direction(&mut self, key: VertexKey, begin_next: VertexKey, end_prev: VertexKey) -> Result<()> {
        let (point, previous_edge, next_edge) = {
            let v = self.arena.vertex(key)?;
            (v.point, v.previous_edge, v.next_edge)
        };
        let incoming = self.arena.edge(previous_edge)?.direction;
        let outgoing = self.arena.edge(next_edge)?.direction;
        if incoming.dot(&outgoing) >= self.config.antiparallel_threshold {
            return Ok(());
        }

        let to_point = normalize_or_zero(&(point - self.arena.vertex(end_prev)?.point));
        let from_point = normalize_or_zero(&(self.arena.vertex(begin_next)?.point - point));
        let expected = calc_vector_bisector(&to_point, &from_point);

        let vertex = self.arena.vertex_mut(key)?;
        if vertex.bisector.direction.dot(&expected) < 0.0 {
            vertex.bisector = vertex.bisector.reversed();
        }
        Ok(())
    }

    fn new_vertex(
        &mut self,
        event: &LevelEvent,
        previous_edge: EdgeKey,
        next_edge: EdgeKey,
        node: usize,
    ) -> Result<VertexKey> {
        let incoming = self.arena.edge(previous_edge)?.direction;
        let outgoing = self.arena.edge(next_edge)?.direction;
        let bisector = calc_bisector(event.point, &incoming, &outgoing);
        Ok(self
            .arena
            .add_vertex(event.point, event.distance, bisector, previous_edge, next_edge, node))
    }

    /// Two-vertex loops become a ridge arc; one-vertex loops just end.
    fn collapse_small_lavs(&mut self) -> Result<()> {
        for lav in self.arena.lav_keys() {
            let ring = self.arena.lav_vertices(lav)?;
            match ring.as_slice() {
                [a, b] => {
                    let (va, vb) = (self.arena.vertex(*a)?, self.arena.vertex(*b)?);
                    if (va.point - vb.point).norm() > self.config.epsilon {
                        self.skeleton.add_arc(va.node, vb.node);
                    }
                    self.arena.retire(*a)?;
                    self.arena.retire(*b)?;
                }
                [single] => self.arena.retire(*single)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Ends a vertex's path at `node`.
    fn retire_at(&mut self, key: VertexKey, node: usize) -> Result<()> {
        let from = self.arena.vertex(key)?.node;
        self.skeleton.add_arc(from, node);
        self.arena.retire(key)
    }

    /// Recomputes events for split parents whose split was rejected. Only
    /// events strictly above `height` are queued so the rejected split is not
    /// found again.
    fn requeue_rejected(&mut self, parents: &[VertexKey], height: f64) -> Result<()> {
        for &key in parents {
            if self.arena.is_live(key) {
                self.push_vertex_events(key, height + self.config.epsilon)?;
            }
        }
        Ok(())
    }

    /// Queues the events of a vertex, dropping those below `floor`.
    fn push_vertex_events(&mut self, key: VertexKey, floor: f64) -> Result<()> {
        for event in self.arena.vertex_events(key, self.config.epsilon)? {
            if event.distance < floor {
                tracing::trace!(kind = event.kind_name(), height = event.distance, "Dropped event below its level");
                continue;
            }
            tracing::trace!(kind = event.kind_name(), height = event.distance, "Queued event");
            self.queue.push(event);
        }
        Ok(())
    }
}
