// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Queue events and the height-ordered event queue.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use nalgebra::Point2;
use smallvec::{smallvec, SmallVec};

use crate::arena::SkeletonArena;
use crate::keys::{EdgeKey, VertexKey};

/// What happens at a queued event point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Two loop-adjacent vertices meet.
    Edge { previous: VertexKey, next: VertexKey },
    /// A vertex runs into a non-adjacent edge.
    Split { parent: VertexKey, opposite_edge: EdgeKey },
    /// A split that lands on an edge endpoint.
    SplitVertex { parent: VertexKey },
}

/// A candidate event at `point`, reached at height `distance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueEvent {
    pub point: Point2<f64>,
    pub distance: f64,
    pub kind: EventKind,
}

impl QueueEvent {
    pub fn edge(point: Point2<f64>, distance: f64, previous: VertexKey, next: VertexKey) -> Self {
        Self { point, distance, kind: EventKind::Edge { previous, next } }
    }

    pub fn split(point: Point2<f64>, distance: f64, parent: VertexKey, opposite_edge: EdgeKey) -> Self {
        Self { point, distance, kind: EventKind::Split { parent, opposite_edge } }
    }

    pub fn split_vertex(point: Point2<f64>, distance: f64, parent: VertexKey) -> Self {
        Self { point, distance, kind: EventKind::SplitVertex { parent } }
    }

    /// Vertices this event consumes.
    pub fn vertices(&self) -> SmallVec<[VertexKey; 2]> {
        match self.kind {
            EventKind::Edge { previous, next } => smallvec![previous, next],
            EventKind::Split { parent, .. } | EventKind::SplitVertex { parent } => smallvec![parent],
        }
    }

    /// Split parent, if this is a split of either flavour.
    pub fn parent(&self) -> Option<VertexKey> {
        match self.kind {
            EventKind::Edge { .. } => None,
            EventKind::Split { parent, .. } | EventKind::SplitVertex { parent } => Some(parent),
        }
    }

    /// An event is obsolete once any vertex it references has been consumed.
    /// An edge event is also obsolete once its vertices stop being loop
    /// neighbours.
    pub fn is_obsolete(&self, arena: &SkeletonArena) -> bool {
        match self.kind {
            EventKind::Edge { previous, next } => {
                !arena.is_live(previous)
                    || !arena.is_live(next)
                    || arena.next(previous).map_or(true, |n| n != next)
            }
            EventKind::Split { parent, .. } | EventKind::SplitVertex { parent } => !arena.is_live(parent),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            EventKind::Edge { .. } => "edge",
            EventKind::Split { .. } => "split",
            EventKind::SplitVertex { .. } => "split-vertex",
        }
    }
}

/// Proposed split of a vertex against one footprint edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitCandidate {
    pub point: Point2<f64>,
    pub distance: f64,
    pub opposite: SplitTarget,
}

/// What a split candidate runs into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitTarget {
    /// The interior of an edge.
    Edge(EdgeKey),
    /// The corner at the given point.
    Point(Point2<f64>),
}

#[derive(Debug)]
struct Queued {
    event: QueueEvent,
    seq: u64,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    // Reversed so the max-heap pops the lowest height first, FIFO on ties.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .event
            .distance
            .total_cmp(&self.event.distance)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-heap of events keyed by height. Events pushed at equal heights pop in
/// insertion order.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Queued>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: QueueEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Queued { event, seq });
    }

    pub fn pop(&mut self) -> Option<QueueEvent> {
        self.heap.pop().map(|q| q.event)
    }

    pub fn peek(&self) -> Option<&QueueEvent> {
        self.heap.peek().map(|q| &q.event)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Sequence number the next pushed event will receive.
    pub fn next_sequence(&self) -> u64 {
        self.next_seq
    }

    /// Drops events at or below `height` that were pushed before sequence
    /// number `before`; returns how many were dropped.
    pub fn remove_up_to(&mut self, height: f64, before: u64) -> usize {
        let len = self.heap.len();
        self.heap.retain(|q| q.event.distance > height || q.seq >= before);
        len - self.heap.len()
    }
}

impl Extend<QueueEvent> for EventQueue {
    fn extend<I: IntoIterator<Item = QueueEvent>>(&mut self, iter: I) {
        for event in iter {
            self.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn keys() -> (VertexKey, VertexKey) {
        let mut map: SlotMap<VertexKey, ()> = SlotMap::with_key();
        (map.insert(()), map.insert(()))
    }

    #[test]
    fn pops_lowest_height_first() {
        let (a, b) = keys();
        let mut queue = EventQueue::new();
        queue.push(QueueEvent::split_vertex(Point2::new(0.0, 0.0), 3.0, a));
        queue.push(QueueEvent::edge(Point2::new(1.0, 0.0), 1.0, a, b));
        queue.push(QueueEvent::split_vertex(Point2::new(2.0, 0.0), 2.0, b));

        let heights: Vec<f64> = std::iter::from_fn(|| queue.pop()).map(|e| e.distance).collect();
        assert_eq!(heights, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn ties_pop_in_insertion_order() {
        let (a, b) = keys();
        let mut queue = EventQueue::new();
        queue.push(QueueEvent::split_vertex(Point2::new(0.0, 0.0), 1.0, a));
        queue.push(QueueEvent::split_vertex(Point2::new(1.0, 0.0), 1.0, b));
        queue.push(QueueEvent::edge(Point2::new(2.0, 0.0), 1.0, a, b));

        assert_eq!(queue.pop().unwrap().point.x, 0.0);
        assert_eq!(queue.pop().unwrap().point.x, 1.0);
        assert_eq!(queue.pop().unwrap().point.x, 2.0);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn remove_up_to_keeps_higher_and_newer_events() {
        let (a, b) = keys();
        let mut queue = EventQueue::new();
        queue.extend([
            QueueEvent::edge(Point2::origin(), 0.5, a, b),
            QueueEvent::edge(Point2::origin(), 1.0, a, b),
            QueueEvent::edge(Point2::origin(), 1.5, a, b),
        ]);

        let mark = queue.next_sequence();
        queue.push(QueueEvent::edge(Point2::origin(), 1.0, a, b));

        assert_eq!(queue.remove_up_to(1.0, mark), 2);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().unwrap().distance, 1.0);
        assert_eq!(queue.pop().unwrap().distance, 1.5);
    }

    #[test]
    fn event_vertices() {
        let (a, b) = keys();
        let edge = QueueEvent::edge(Point2::origin(), 1.0, a, b);
        assert_eq!(edge.vertices().as_slice(), &[a, b]);
        assert_eq!(edge.parent(), None);
        assert_eq!(edge.kind_name(), "edge");

        let split = QueueEvent::split_vertex(Point2::origin(), 1.0, b);
        assert_eq!(split.vertices().as_slice(), &[b]);
        assert_eq!(split.parent(), Some(b));
    }

    #[test]
    fn edge_event_is_obsolete_once_its_pair_is_separated() {
        use crate::geometry::Ray2d;
        use nalgebra::Vector2;

        let ring = [
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 4.0),
            Point2::new(0.0, 4.0),
        ];
        let mut arena = SkeletonArena::from_ring(&ring);
        let keys = arena.lav_vertices(arena.lav_keys()[0]).unwrap();
        let edge = QueueEvent::edge(Point2::new(2.0, 2.0), 2.0, keys[0], keys[1]);
        let split = QueueEvent::split_vertex(Point2::new(2.0, 2.0), 2.0, keys[1]);
        assert!(!edge.is_obsolete(&arena));

        let (e0, e1) = (arena.edge_keys()[0], arena.edge_keys()[1]);
        let between = arena.add_vertex(
            Point2::new(2.0, 0.5),
            0.5,
            Ray2d::new(Point2::new(2.0, 0.5), Vector2::y()),
            e0,
            e1,
            9,
        );
        arena.insert_before(keys[1], between).unwrap();

        assert!(arena.is_live(keys[0]) && arena.is_live(keys[1]));
        assert!(edge.is_obsolete(&arena));
        assert!(!split.is_obsolete(&arena));

        arena.retire(keys[1]).unwrap();
        assert!(split.is_obsolete(&arena));
    }
}
