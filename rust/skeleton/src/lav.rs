// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Active vertex loop (LAV) operations on the [`SkeletonArena`].
//!
//! Loops are cycles threaded through `VertexData::prev`/`next`. Every walk is
//! bounded by the loop's recorded length so a corrupted link surfaces as an
//! [`Error::InternalInvariantViolation`] instead of spinning forever.

use nalgebra::Point2;
use slotmap::Key;

use crate::arena::{LavData, SkeletonArena};
use crate::error::{Error, Result};
use crate::geometry::is_inside_polygon;
use crate::keys::*;

/// Side-test slack for event points that land on a segment's end bisector.
const SEGMENT_TOLERANCE: f64 = 1e-7;

impl SkeletonArena {
    /// Creates a loop from vertices in order and links them cyclically.
    pub(crate) fn create_lav(&mut self, ring: &[VertexKey]) -> LavKey {
        let head = ring.first().copied().unwrap_or_default();
        let lav = self.lavs.insert(LavData { head, len: ring.len() });
        let n = ring.len();
        for (i, &key) in ring.iter().enumerate() {
            if let Some(v) = self.vertices.get_mut(key) {
                v.lav = Some(lav);
                v.prev = ring[(i + n - 1) % n];
                v.next = ring[(i + 1) % n];
            }
        }
        lav
    }

    /// Next vertex in the loop.
    pub fn next(&self, key: VertexKey) -> Result<VertexKey> {
        Ok(self.vertex(key)?.next)
    }

    /// Previous vertex in the loop.
    pub fn prev(&self, key: VertexKey) -> Result<VertexKey> {
        Ok(self.vertex(key)?.prev)
    }

    /// Walks `offset` steps around the loop (negative walks backwards).
    pub fn offset_vertex(&self, key: VertexKey, offset: isize) -> Result<VertexKey> {
        let mut current = key;
        for _ in 0..offset.unsigned_abs() {
            current = if offset < 0 { self.prev(current)? } else { self.next(current)? };
        }
        Ok(current)
    }

    /// Loop the vertex currently belongs to.
    pub fn lav_of(&self, key: VertexKey) -> Result<LavKey> {
        self.vertex(key)?
            .lav
            .ok_or_else(|| Error::invariant(format!("vertex {:?} is not in any active loop", key.data())))
    }

    /// `true` when both vertices are linked into the same loop.
    pub fn same_lav(&self, a: VertexKey, b: VertexKey) -> bool {
        match (self.vertices.get(a), self.vertices.get(b)) {
            (Some(va), Some(vb)) => va.lav.is_some() && va.lav == vb.lav,
            _ => false,
        }
    }

    /// Vertices of a loop in order, starting at its head.
    pub fn lav_vertices(&self, lav: LavKey) -> Result<Vec<VertexKey>> {
        let data = self.lav(lav)?;
        let mut out = Vec::with_capacity(data.len);
        let mut current = data.head;
        for _ in 0..data.len {
            out.push(current);
            current = self.next(current)?;
        }
        Ok(out)
    }

    /// Wavefront positions of a loop in order.
    pub fn lav_points(&self, lav: LavKey) -> Result<Vec<Point2<f64>>> {
        self.lav_vertices(lav)?
            .into_iter()
            .map(|key| Ok(self.vertex(key)?.point))
            .collect()
    }

    /// Links an unlinked vertex into `anchor`'s loop, right before `anchor`.
    pub(crate) fn insert_before(&mut self, anchor: VertexKey, key: VertexKey) -> Result<()> {
        let lav = self.lav_of(anchor)?;
        let before = self.prev(anchor)?;
        self.link(before, key)?;
        self.link(key, anchor)?;
        self.vertex_mut(key)?.lav = Some(lav);
        self.lav_mut(lav)?.len += 1;
        Ok(())
    }

    /// Unlinks a vertex from its loop and marks it processed. The loop may be
    /// left empty; empty loops are dropped by [`Self::remove_empty_lavs`].
    pub(crate) fn retire(&mut self, key: VertexKey) -> Result<()> {
        let Some(lav) = self.vertex(key)?.lav else {
            self.vertex_mut(key)?.processed = true;
            return Ok(());
        };
        let prev = self.prev(key)?;
        let next = self.next(key)?;
        {
            let data = self.lav_mut(lav)?;
            data.len -= 1;
            if data.head == key {
                data.head = next;
            }
        }
        if prev != key {
            self.link(prev, next)?;
        }
        let v = self.vertex_mut(key)?;
        v.processed = true;
        v.lav = None;
        v.prev = key;
        v.next = key;
        Ok(())
    }

    /// Moves the arc `begin..=end` (walking forward) out of its loop into a
    /// new loop headed by the unlinked vertex `head`.
    pub(crate) fn cut(&mut self, begin: VertexKey, end: VertexKey, head: VertexKey) -> Result<LavKey> {
        let old = self.lav_of(begin)?;
        if self.lav_of(end)? != old {
            return Err(Error::invariant("cut boundaries lie in different loops"));
        }
        let old_len = self.lav(old)?.len;

        let mut arc = Vec::new();
        let mut current = begin;
        loop {
            arc.push(current);
            if current == end {
                break;
            }
            if arc.len() >= old_len {
                return Err(Error::invariant("cut end is not reachable from cut begin"));
            }
            current = self.next(current)?;
        }

        let before = self.prev(begin)?;
        let after = self.next(end)?;
        let remaining = old_len - arc.len();
        {
            let head_in_arc = arc.contains(&self.lav(old)?.head);
            let data = self.lav_mut(old)?;
            data.len = remaining;
            if head_in_arc {
                data.head = after;
            }
        }
        if remaining > 0 {
            self.link(before, after)?;
        }

        let lav = self.lavs.insert(LavData { head, len: arc.len() + 1 });
        for &key in &arc {
            self.vertex_mut(key)?.lav = Some(lav);
        }
        self.vertex_mut(head)?.lav = Some(lav);
        self.link(head, begin)?;
        self.link(end, head)?;
        Ok(lav)
    }

    /// Splices the loop of `merged_prev` into the loop of `base_next`.
    ///
    /// The merged loop keeps its cyclic order and ends at `merged_prev`,
    /// followed by the unlinked vertex `new`, then `base_next`:
    /// `x -> next(merged_prev) -> .. -> merged_prev -> new -> base_next`,
    /// where `x` was the predecessor of `base_next`.
    pub(crate) fn merge(&mut self, base_next: VertexKey, merged_prev: VertexKey, new: VertexKey) -> Result<()> {
        let base = self.lav_of(base_next)?;
        let merged = self.lav_of(merged_prev)?;
        if base == merged {
            return Err(Error::invariant("merge of a loop with itself"));
        }

        let members = self.lav_vertices(merged)?;
        for &key in &members {
            self.vertex_mut(key)?.lav = Some(base);
        }
        let merged_len = members.len();
        self.lavs.remove(merged);

        let x = self.prev(base_next)?;
        let merged_start = self.next(merged_prev)?;
        self.link(x, merged_start)?;
        self.link(merged_prev, new)?;
        self.link(new, base_next)?;
        self.vertex_mut(new)?.lav = Some(base);
        self.lav_mut(base)?.len += merged_len + 1;
        Ok(())
    }

    /// Among all loops, the vertex whose previous edge is `edge`, or whose
    /// predecessor's next edge is `edge`. At most one hit per loop.
    pub(crate) fn vertices_on_edge(&self, edge: EdgeKey) -> Result<Vec<VertexKey>> {
        let mut hits = Vec::new();
        for lav in self.lavs.keys() {
            for key in self.lav_vertices(lav)? {
                let v = self.vertex(key)?;
                if v.previous_edge == edge || self.vertex(v.prev)?.next_edge == edge {
                    hits.push(key);
                    break;
                }
            }
        }
        Ok(hits)
    }

    /// Picks which candidate loop holds the live part of `edge` that the
    /// event point `center` runs into.
    ///
    /// A candidate `v` bounds the live segment `prev(v)..v`; it is only
    /// considered when `center` lies between the bisectors of `prev(v)` and
    /// `v`. Among several such candidates, the one in loop `prefer` wins, then
    /// the one whose span projected on the edge strictly contains `center`,
    /// then an even-odd containment test against each candidate loop.
    /// Returns `None` when no live segment of the edge reaches `center`.
    pub(crate) fn choose_opposite_edge_vertex(
        &self,
        candidates: &[VertexKey],
        edge: EdgeKey,
        center: &Point2<f64>,
        prefer: Option<LavKey>,
    ) -> Result<Option<VertexKey>> {
        let mut valid = Vec::with_capacity(candidates.len());
        for &end in candidates {
            if self.segment_reaches(end, center)? {
                valid.push(end);
            }
        }
        match valid.as_slice() {
            [] => return Ok(None),
            [only] => return Ok(Some(*only)),
            _ => {}
        }

        if let Some(lav) = prefer {
            let mut in_lav = valid.iter().filter(|&&v| self.vertex(v).map_or(false, |d| d.lav == Some(lav)));
            if let (Some(&only), None) = (in_lav.next(), in_lav.next()) {
                return Ok(Some(only));
            }
        }

        let edge_data = self.edge(edge)?;
        let start = edge_data.begin;
        let dir = edge_data.direction;
        let center_dot = dir.dot(&(center - start));

        for &end in &valid {
            let begin = self.prev(end)?;
            let begin_dot = dir.dot(&(self.vertex(begin)?.point - start));
            let end_dot = dir.dot(&(self.vertex(end)?.point - start));
            if (begin_dot < center_dot && center_dot < end_dot)
                || (begin_dot > center_dot && center_dot > end_dot)
            {
                return Ok(Some(end));
            }
        }

        for &end in &valid {
            let points = self.lav_points(self.lav_of(end)?)?;
            if is_inside_polygon(center, &points) {
                return Ok(Some(end));
            }
        }

        tracing::debug!(
            candidates = valid.len(),
            x = center.x,
            y = center.y,
            "Several live segments reach the split point; taking the first"
        );
        Ok(valid.first().copied())
    }

    /// `true` when `center` lies in the region swept by the live segment
    /// `prev(end)..end`, between the bisectors of its two vertices.
    pub(crate) fn segment_reaches(&self, end: VertexKey, center: &Point2<f64>) -> Result<bool> {
        let end_vertex = self.vertex(end)?;
        let begin_vertex = self.vertex(end_vertex.prev)?;
        Ok(begin_vertex.bisector.is_on_right_side(center, SEGMENT_TOLERANCE)
            && end_vertex.bisector.is_on_left_side(center, SEGMENT_TOLERANCE))
    }

    /// Drops loops that no longer hold any vertex.
    pub(crate) fn remove_empty_lavs(&mut self) {
        self.lavs.retain(|_, lav| lav.len > 0);
    }

    fn link(&mut self, from: VertexKey, to: VertexKey) -> Result<()> {
        self.vertex_mut(from)?.next = to;
        self.vertex_mut(to)?.prev = from;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Ray2d;
    use nalgebra::Vector2;

    fn ring(points: &[(f64, f64)]) -> SkeletonArena {
        let pts: Vec<_> = points.iter().map(|&(x, y)| Point2::new(x, y)).collect();
        SkeletonArena::from_ring(&pts)
    }

    fn hexagon() -> SkeletonArena {
        ring(&[(0.0, 0.0), (2.0, 0.0), (3.0, 1.0), (2.0, 2.0), (0.0, 2.0), (-1.0, 1.0)])
    }

    fn loose_vertex(arena: &mut SkeletonArena, x: f64, y: f64) -> VertexKey {
        let e0 = arena.edge_keys()[0];
        let e1 = arena.edge_keys()[1];
        arena.add_vertex(
            Point2::new(x, y),
            1.0,
            Ray2d::new(Point2::new(x, y), Vector2::y()),
            e0,
            e1,
            99,
        )
    }

    fn only_lav(arena: &SkeletonArena) -> LavKey {
        arena.lav_keys()[0]
    }

    #[test]
    fn offsets_wrap_around() {
        let arena = hexagon();
        let lav = only_lav(&arena);
        let keys = arena.lav_vertices(lav).unwrap();

        assert_eq!(arena.offset_vertex(keys[0], 1).unwrap(), keys[1]);
        assert_eq!(arena.offset_vertex(keys[0], -1).unwrap(), keys[5]);
        assert_eq!(arena.offset_vertex(keys[5], 1).unwrap(), keys[0]);
        assert_eq!(arena.offset_vertex(keys[2], 6).unwrap(), keys[2]);
        assert_eq!(arena.offset_vertex(keys[2], 0).unwrap(), keys[2]);
    }

    #[test]
    fn loop_links_follow_edge_adjacency() {
        let arena = hexagon();
        let keys = arena.lav_vertices(only_lav(&arena)).unwrap();
        for &key in &keys {
            let v = arena.vertex(key).unwrap();
            let next = arena.vertex(v.next).unwrap();
            assert_eq!(v.next_edge, next.previous_edge);
        }
    }

    #[test]
    fn cut_moves_arc_into_new_loop() {
        let mut arena = hexagon();
        let lav = only_lav(&arena);
        let keys = arena.lav_vertices(lav).unwrap();
        let head = loose_vertex(&mut arena, 1.0, 1.0);

        let new_lav = arena.cut(keys[1], keys[3], head).unwrap();

        assert_eq!(arena.lav_vertices(new_lav).unwrap(), vec![head, keys[1], keys[2], keys[3]]);
        assert_eq!(arena.lav_len(lav).unwrap(), 3);
        assert_eq!(arena.next(keys[0]).unwrap(), keys[4]);
        assert_eq!(arena.prev(keys[4]).unwrap(), keys[0]);
        assert!(arena.same_lav(head, keys[2]));
        assert!(!arena.same_lav(keys[0], keys[2]));
    }

    #[test]
    fn cut_of_entire_loop_leaves_it_empty() {
        let mut arena = hexagon();
        let lav = only_lav(&arena);
        let keys = arena.lav_vertices(lav).unwrap();
        let head = loose_vertex(&mut arena, 1.0, 1.0);

        let new_lav = arena.cut(keys[2], keys[1], head).unwrap();
        assert_eq!(arena.lav_len(new_lav).unwrap(), 7);
        assert_eq!(arena.lav_len(lav).unwrap(), 0);

        arena.remove_empty_lavs();
        assert_eq!(arena.lav_count(), 1);
    }

    #[test]
    fn merge_keeps_cyclic_order() {
        let mut arena = hexagon();
        let lav = only_lav(&arena);
        let keys = arena.lav_vertices(lav).unwrap();
        let splitter = loose_vertex(&mut arena, 1.0, 1.0);
        let second = arena.cut(keys[3], keys[5], splitter).unwrap();
        // lav: k0 k1 k2; second: s k3 k4 k5

        let joiner = loose_vertex(&mut arena, 1.5, 1.0);
        arena.merge(keys[1], keys[4], joiner).unwrap();

        assert!(arena.lavs.get(second).is_none());
        let merged = arena.lav_vertices(arena.lav_of(keys[1]).unwrap()).unwrap();
        assert_eq!(merged.len(), 8);

        // k0 -> k5 -> s -> k3 -> k4 -> joiner -> k1 -> k2 -> k0
        let start = merged.iter().position(|&k| k == keys[0]).unwrap();
        let rotated: Vec<_> = merged[start..].iter().chain(&merged[..start]).copied().collect();
        assert_eq!(rotated, vec![keys[0], keys[5], splitter, keys[3], keys[4], joiner, keys[1], keys[2]]);
    }

    #[test]
    fn retire_unlinks_and_marks_processed() {
        let mut arena = hexagon();
        let lav = only_lav(&arena);
        let keys = arena.lav_vertices(lav).unwrap();

        arena.retire(keys[0]).unwrap();

        assert!(!arena.is_live(keys[0]));
        assert_eq!(arena.lav_len(lav).unwrap(), 5);
        assert_eq!(arena.next(keys[5]).unwrap(), keys[1]);
        assert!(arena.lav_of(keys[0]).is_err());
        assert_eq!(arena.lav_vertices(lav).unwrap()[0], keys[1]);
    }

    #[test]
    fn insert_before_splices_vertex() {
        let mut arena = hexagon();
        let lav = only_lav(&arena);
        let keys = arena.lav_vertices(lav).unwrap();
        let extra = loose_vertex(&mut arena, 2.5, 0.5);

        arena.insert_before(keys[2], extra).unwrap();

        assert_eq!(arena.next(keys[1]).unwrap(), extra);
        assert_eq!(arena.next(extra).unwrap(), keys[2]);
        assert_eq!(arena.lav_len(lav).unwrap(), 7);
    }

    #[test]
    fn edge_lookup_finds_owning_vertex() {
        let arena = hexagon();
        let edge = arena.edge_keys()[2];
        let hits = arena.vertices_on_edge(edge).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(arena.vertex(hits[0]).unwrap().previous_edge, edge);
    }

    #[test]
    fn opposite_edge_prefers_projected_span() {
        // Loops sharing the bottom edge of a wide rectangle.
        let mut arena = ring(&[(0.0, 0.0), (10.0, 0.0), (10.0, 2.0), (0.0, 2.0)]);
        let bottom = arena.edge_keys()[0];
        let left = arena.edge_keys()[3];
        let right = arena.edge_keys()[1];
        let make = |arena: &mut SkeletonArena, x: f64, prev_edge, next_edge| {
            arena.add_vertex(
                Point2::new(x, 1.0),
                1.0,
                Ray2d::new(Point2::new(x, 1.0), Vector2::y()),
                prev_edge,
                next_edge,
                0,
            )
        };
        let a0 = make(&mut arena, 1.0, left, bottom);
        let a1 = make(&mut arena, 4.0, bottom, left);
        let b0 = make(&mut arena, 6.0, right, bottom);
        let b1 = make(&mut arena, 9.0, bottom, right);
        let lav_a = arena.create_lav(&[a0, a1]);
        arena.create_lav(&[b0, b1]);

        let candidates = [a1, b1];
        let center = Point2::new(7.0, 1.0);
        let chosen = arena.choose_opposite_edge_vertex(&candidates, bottom, &center, None).unwrap();
        assert_eq!(chosen, Some(b1));

        let center = Point2::new(2.0, 1.0);
        let chosen = arena.choose_opposite_edge_vertex(&candidates, bottom, &center, None).unwrap();
        assert_eq!(chosen, Some(a1));

        assert_eq!(arena.choose_opposite_edge_vertex(&[], bottom, &center, None).unwrap(), None);
        assert_eq!(arena.choose_opposite_edge_vertex(&[a1], bottom, &center, None).unwrap(), Some(a1));

        // Overlapping spans: the preferred loop wins, otherwise the first
        // projected span.
        let c0 = make(&mut arena, 0.5, left, bottom);
        let c1 = make(&mut arena, 3.0, bottom, left);
        let lav_c = arena.create_lav(&[c0, c1]);
        let both = [a1, c1];
        assert_eq!(arena.choose_opposite_edge_vertex(&both, bottom, &center, Some(lav_c)).unwrap(), Some(c1));
        assert_eq!(arena.choose_opposite_edge_vertex(&both, bottom, &center, Some(lav_a)).unwrap(), Some(a1));
        assert_eq!(arena.choose_opposite_edge_vertex(&both, bottom, &center, None).unwrap(), Some(a1));
    }

    #[test]
    fn single_candidate_outside_its_segment_is_rejected() {
        let mut arena = ring(&[(0.0, 0.0), (10.0, 0.0), (10.0, 2.0), (0.0, 2.0)]);
        let bottom = arena.edge_keys()[0];
        let left = arena.edge_keys()[3];
        let v0 = arena.add_vertex(
            Point2::new(1.0, 1.0),
            1.0,
            Ray2d::new(Point2::new(1.0, 1.0), Vector2::new(1.0, 1.0).normalize()),
            left,
            bottom,
            0,
        );
        let v1 = arena.add_vertex(
            Point2::new(4.0, 1.0),
            1.0,
            Ray2d::new(Point2::new(4.0, 1.0), Vector2::new(-1.0, 1.0).normalize()),
            bottom,
            left,
            0,
        );
        arena.create_lav(&[v0, v1]);

        // The live part of the bottom edge spans x in [1, 4] at height 1.
        assert!(arena.segment_reaches(v1, &Point2::new(2.5, 1.0)).unwrap());
        assert!(!arena.segment_reaches(v1, &Point2::new(7.0, 1.0)).unwrap());
        // On the end bisector, within tolerance.
        assert!(arena.segment_reaches(v1, &Point2::new(3.0, 2.0)).unwrap());

        let chosen = arena.choose_opposite_edge_vertex(&[v1], bottom, &Point2::new(7.0, 1.0), None).unwrap();
        assert_eq!(chosen, None);
        let chosen = arena.choose_opposite_edge_vertex(&[v1], bottom, &Point2::new(2.5, 1.2), None).unwrap();
        assert_eq!(chosen, Some(v1));
    }
}
