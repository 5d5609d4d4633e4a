// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The skeleton graph traced by one simulation run.
//!
//! Nodes are footprint corners (height 0) and event points. Every consumed
//! wavefront vertex contributes one arc from the node it was born at to the
//! node where it was consumed; loops that shrink to two vertices contribute
//! the ridge arc between them.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// A skeleton node: a footprint corner or an event point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkeletonNode {
    pub point: Point2<f64>,
    /// Wavefront height (offset distance) of the node.
    pub height: f64,
    /// Reflex footprint corner. Always `false` for event nodes.
    pub reflex: bool,
}

/// Arc between two nodes, by index into [`Skeleton::nodes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SkeletonArc {
    pub from: usize,
    pub to: usize,
}

/// Classification of one processed level event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelEventKind {
    /// A whole loop collapses to one apex.
    Pick,
    /// A run of loop vertices collapses into one new vertex.
    MultiEdge,
    /// One or more chains meet at a point and loops are cut or merged.
    MultiSplit,
}

impl LevelEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LevelEventKind::Pick => "pick",
            LevelEventKind::MultiEdge => "multi-edge",
            LevelEventKind::MultiSplit => "multi-split",
        }
    }
}

impl std::fmt::Display for LevelEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dispatched level event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelRecord {
    pub kind: LevelEventKind,
    pub point: Point2<f64>,
    pub height: f64,
    /// Number of chains taking part, opposite-edge chains included.
    pub chains: usize,
}

/// Counters collected over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkeletonStats {
    /// Main-loop iterations.
    pub iterations: usize,
    /// Edge events seeded before the first iteration.
    pub initial_edge_events: usize,
    /// Split and split-vertex events seeded before the first iteration.
    pub initial_split_events: usize,
    /// Level events skipped because an earlier event at the same height
    /// already consumed one of their vertices.
    pub skipped_level_events: usize,
    /// Loops still active when the queue ran dry.
    pub unresolved_loops: usize,
}

/// Result of a straight-skeleton run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skeleton {
    pub nodes: Vec<SkeletonNode>,
    pub arcs: Vec<SkeletonArc>,
    pub levels: Vec<LevelRecord>,
    pub stats: SkeletonStats,
}

impl Skeleton {
    pub(crate) fn add_node(&mut self, point: Point2<f64>, height: f64, reflex: bool) -> usize {
        self.nodes.push(SkeletonNode { point, height, reflex });
        self.nodes.len() - 1
    }

    pub(crate) fn add_arc(&mut self, from: usize, to: usize) {
        if from != to {
            self.arcs.push(SkeletonArc { from, to });
        }
    }

    /// Height of the highest node.
    pub fn max_height(&self) -> f64 {
        self.nodes.iter().map(|n| n.height).fold(0.0, f64::max)
    }

    /// Nodes created by events (height above zero), in creation order.
    pub fn event_nodes(&self) -> impl Iterator<Item = &SkeletonNode> {
        self.nodes.iter().filter(|n| n.height > 0.0)
    }

    /// Index of the first node within `tolerance` of `point`.
    pub fn find_node(&self, point: &Point2<f64>, tolerance: f64) -> Option<usize> {
        self.nodes
            .iter()
            .position(|n| (n.point - point).norm() <= tolerance)
    }

    /// Arc endpoints as node pairs.
    pub fn arc_nodes(&self) -> impl Iterator<Item = (&SkeletonNode, &SkeletonNode)> {
        self.arcs
            .iter()
            .filter_map(|a| Some((self.nodes.get(a.from)?, self.nodes.get(a.to)?)))
    }

    /// Level events of the given kind.
    pub fn levels_of(&self, kind: LevelEventKind) -> impl Iterator<Item = &LevelRecord> {
        self.levels.iter().filter(move |l| l.kind == kind)
    }

    /// `true` when every loop was resolved.
    pub fn is_complete(&self) -> bool {
        self.stats.unresolved_loops == 0
    }
}
