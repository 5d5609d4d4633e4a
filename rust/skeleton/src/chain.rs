// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Level loading, event clustering and chain classification.
//!
//! All live events within epsilon of the lowest queued height form one
//! level. A level is partitioned into clusters of events that share a vertex
//! or meet at the same point; each cluster becomes one [`LevelEvent`] made of
//! chains:
//!
//! - edge chains: runs of edge events linked through shared vertices, closed
//!   when the run wraps around its whole loop;
//! - split chains: one split (or split-vertex) event per parent vertex;
//! - opposite-edge chains: synthesised while handling a multi-split, one per
//!   edge that a split runs into.

use std::collections::VecDeque;

use nalgebra::Point2;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::arena::SkeletonArena;
use crate::error::{Error, Result};
use crate::event::{EventKind, EventQueue, QueueEvent};
use crate::keys::{EdgeKey, VertexKey};
use crate::output::LevelEventKind;

/// Chain classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainKind {
    /// Open run of edge events.
    Edge,
    /// Run of edge events covering a whole loop.
    ClosedEdge,
    /// A single split or split-vertex event.
    Split,
    /// Live part of an edge hit by a split, bounded by two loop vertices.
    OppositeEdge,
}

/// Loop neighbours and outer edges of a chain at the moment it is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainBoundary {
    pub previous_vertex: VertexKey,
    pub next_vertex: VertexKey,
    pub previous_edge: EdgeKey,
    pub next_edge: EdgeKey,
}

/// A run of linked same-height events, handled as one unit.
#[derive(Debug, Clone)]
pub struct Chain {
    pub kind: ChainKind,
    /// Vertices consumed when the chain is handled, in loop order.
    pub members: SmallVec<[VertexKey; 4]>,
    /// Edge a split runs into, or the edge of an opposite-edge chain.
    pub opposite_edge: Option<EdgeKey>,
    fixed_boundary: Option<ChainBoundary>,
}

impl Chain {
    fn edge_run(run: &VecDeque<QueueEvent>) -> Self {
        let mut members: SmallVec<[VertexKey; 4]> = SmallVec::new();
        let mut closed = false;
        if let (Some(first), Some(last)) = (run.front(), run.back()) {
            if let (EventKind::Edge { previous: head, .. }, EventKind::Edge { next: tail, .. }) = (first.kind, last.kind) {
                closed = head == tail;
                members.push(head);
            }
        }
        for event in run {
            if let EventKind::Edge { next, .. } = event.kind {
                members.push(next);
            }
        }
        if closed {
            members.pop();
        }
        Self {
            kind: if closed { ChainKind::ClosedEdge } else { ChainKind::Edge },
            members,
            opposite_edge: None,
            fixed_boundary: None,
        }
    }

    fn split(event: QueueEvent, parent: VertexKey) -> Self {
        let opposite_edge = match event.kind {
            EventKind::Split { opposite_edge, .. } => Some(opposite_edge),
            _ => None,
        };
        let mut members = SmallVec::new();
        members.push(parent);
        Self {
            kind: ChainKind::Split,
            members,
            opposite_edge,
            fixed_boundary: None,
        }
    }

    /// Opposite-edge chain for `edge`, whose live part ends at `next_vertex`.
    pub(crate) fn opposite_edge(edge: EdgeKey, previous_vertex: VertexKey, next_vertex: VertexKey) -> Self {
        Self {
            kind: ChainKind::OppositeEdge,
            members: SmallVec::new(),
            opposite_edge: Some(edge),
            fixed_boundary: Some(ChainBoundary {
                previous_vertex,
                next_vertex,
                previous_edge: edge,
                next_edge: edge,
            }),
        }
    }

    /// Loop neighbours just outside the chain's members and the edges that
    /// bound it. Opposite-edge chains return the boundary captured when they
    /// were created.
    pub fn boundary(&self, arena: &SkeletonArena) -> Result<ChainBoundary> {
        if let Some(boundary) = self.fixed_boundary {
            return Ok(boundary);
        }
        let (Some(&first), Some(&last)) = (self.members.first(), self.members.last()) else {
            return Err(Error::invariant("chain without members"));
        };
        Ok(ChainBoundary {
            previous_vertex: arena.prev(first)?,
            next_vertex: arena.next(last)?,
            previous_edge: arena.vertex(first)?.previous_edge,
            next_edge: arena.vertex(last)?.next_edge,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.kind == ChainKind::ClosedEdge
    }

    /// `true` when an edge chain's members still follow each other in one
    /// loop; a closed chain must also wrap from its last member to its first.
    /// Split and opposite-edge chains are always linked.
    pub fn is_linked(&self, arena: &SkeletonArena) -> bool {
        let follows = |a: VertexKey, b: VertexKey| arena.next(a).map_or(false, |n| n == b);
        match self.kind {
            ChainKind::Edge => self.members.windows(2).all(|w| follows(w[0], w[1])),
            ChainKind::ClosedEdge => {
                self.members.windows(2).all(|w| follows(w[0], w[1]))
                    && match (self.members.last(), self.members.first()) {
                        (Some(&last), Some(&first)) => follows(last, first),
                        _ => false,
                    }
            }
            ChainKind::Split | ChainKind::OppositeEdge => true,
        }
    }
}

/// A classified cluster of events at one point and height.
#[derive(Debug, Clone)]
pub struct LevelEvent {
    pub kind: LevelEventKind,
    pub point: Point2<f64>,
    pub distance: f64,
    pub chains: Vec<Chain>,
}

impl LevelEvent {
    /// `true` when an earlier event in the same level consumed one of the
    /// vertices this event relies on, or pulled an edge chain apart by
    /// inserting a vertex between its members.
    pub fn is_stale(&self, arena: &SkeletonArena) -> bool {
        self.chains
            .iter()
            .any(|c| c.members.iter().any(|&v| !arena.is_live(v)) || !c.is_linked(arena))
    }
}

/// Pops the next level: the first live event plus every following event
/// within `epsilon` of its height. Obsolete events are discarded.
pub(crate) fn load_level(queue: &mut EventQueue, arena: &SkeletonArena, epsilon: f64) -> Vec<QueueEvent> {
    let mut level = Vec::new();

    let start = loop {
        match queue.pop() {
            None => return level,
            Some(event) if event.is_obsolete(arena) => {
                tracing::trace!(kind = event.kind_name(), height = event.distance, "Dropped obsolete event");
            }
            Some(event) => break event,
        }
    };
    let level_height = start.distance;
    level.push(start);

    while let Some(event) = queue.peek() {
        if event.distance - level_height >= epsilon {
            break;
        }
        if let Some(event) = queue.pop() {
            if !event.is_obsolete(arena) {
                level.push(event);
            }
        }
    }
    level
}

/// Partitions a level into clusters and classifies each one.
pub(crate) fn group_level(level: Vec<QueueEvent>, epsilon: f64) -> Result<Vec<LevelEvent>> {
    let mut used = vec![false; level.len()];
    let mut out = Vec::new();

    for seed in 0..level.len() {
        if used[seed] {
            continue;
        }
        used[seed] = true;
        let anchor = level[seed];
        let mut cluster = vec![anchor];
        let mut parents: FxHashSet<VertexKey> = anchor.vertices().into_iter().collect();

        // Grow to a fixpoint: a late joiner can link earlier events.
        loop {
            let mut grew = false;
            for j in 0..level.len() {
                if used[j] {
                    continue;
                }
                let candidate = &level[j];
                let shares_vertex = candidate.vertices().iter().any(|v| parents.contains(v));
                let same_point = (candidate.point - anchor.point).norm() < epsilon;
                if shares_vertex || same_point {
                    used[j] = true;
                    parents.extend(candidate.vertices());
                    cluster.push(*candidate);
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }

        let chains = create_chains(&cluster);
        if let Some(event) = level_event(anchor.point, anchor.distance, chains)? {
            out.push(event);
        }
    }
    Ok(out)
}

/// Builds chains from one cluster.
pub(crate) fn create_chains(cluster: &[QueueEvent]) -> Vec<Chain> {
    let mut seen_pairs: FxHashSet<(VertexKey, VertexKey)> = FxHashSet::default();
    let edge_events: Vec<QueueEvent> = cluster
        .iter()
        .filter(|e| match e.kind {
            EventKind::Edge { previous, next } => seen_pairs.insert((previous, next)),
            _ => false,
        })
        .copied()
        .collect();

    let mut chains = edge_chains(edge_events);
    let in_edge_chain: FxHashSet<VertexKey> = chains.iter().flat_map(|c| c.members.iter().copied()).collect();

    let mut split_parents: FxHashSet<VertexKey> = FxHashSet::default();
    let true_splits = cluster.iter().filter(|e| matches!(e.kind, EventKind::Split { .. }));
    let vertex_splits = cluster.iter().filter(|e| matches!(e.kind, EventKind::SplitVertex { .. }));
    for event in true_splits.chain(vertex_splits) {
        let Some(parent) = event.parent() else { continue };
        if in_edge_chain.contains(&parent) || !split_parents.insert(parent) {
            continue;
        }
        chains.push(Chain::split(*event, parent));
    }
    chains
}

/// Links edge events into maximal runs through shared vertices.
fn edge_chains(mut pending: Vec<QueueEvent>) -> Vec<Chain> {
    let mut chains = Vec::new();
    while !pending.is_empty() {
        let mut run = VecDeque::new();
        run.push_back(pending.remove(0));

        loop {
            let (Some(front), Some(back)) = (run.front(), run.back()) else { break };
            let (EventKind::Edge { previous: head, .. }, EventKind::Edge { next: tail, .. }) = (front.kind, back.kind) else {
                break;
            };
            if head == tail {
                break;
            }
            let position = pending.iter().position(|e| match e.kind {
                EventKind::Edge { previous, next } => previous == tail || next == head,
                _ => false,
            });
            let Some(i) = position else { break };
            let event = pending.remove(i);
            match event.kind {
                EventKind::Edge { previous, .. } if previous == tail => run.push_back(event),
                _ => run.push_front(event),
            }
        }
        chains.push(Chain::edge_run(&run));
    }
    chains
}

/// Classifies a cluster's chains. Returns `None` for an empty cluster.
pub(crate) fn level_event(point: Point2<f64>, distance: f64, chains: Vec<Chain>) -> Result<Option<LevelEvent>> {
    let kind = match chains.as_slice() {
        [] => return Ok(None),
        [single] => match single.kind {
            ChainKind::ClosedEdge => LevelEventKind::Pick,
            ChainKind::Edge => LevelEventKind::MultiEdge,
            ChainKind::Split | ChainKind::OppositeEdge => LevelEventKind::MultiSplit,
        },
        many => {
            if many.iter().any(Chain::is_closed) {
                return Err(Error::invariant("closed edge chain among several chains")
                    .at_event("multi-split", (point.x, point.y), distance));
            }
            LevelEventKind::MultiSplit
        }
    };
    Ok(Some(LevelEvent { kind, point, distance, chains }))
}
