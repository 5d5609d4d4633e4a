// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D geometric primitives for the wavefront simulation.
//!
//! Lines are kept in implicit form `Ax + By + C = 0`, rays as origin plus
//! (not necessarily unit) direction. All tests take an explicit epsilon so
//! that the caller decides how tolerant a query is; line/line intersection
//! itself only rejects exactly parallel lines.

use nalgebra::{Point2, Vector2};

/// Rotates a vector 90° counter-clockwise.
#[inline]
pub fn orthogonal_left(v: &Vector2<f64>) -> Vector2<f64> {
    Vector2::new(-v.y, v.x)
}

/// Rotates a vector 90° clockwise.
#[inline]
pub fn orthogonal_right(v: &Vector2<f64>) -> Vector2<f64> {
    Vector2::new(v.y, -v.x)
}

/// 2D cross product (z component of the 3D cross product).
#[inline]
pub fn perp_dot(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// A line in implicit form `Ax + By + C = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineLinear2d {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl LineLinear2d {
    /// Line through two points.
    pub fn new(p1: &Point2<f64>, p2: &Point2<f64>) -> Self {
        Self {
            a: p1.y - p2.y,
            b: p2.x - p1.x,
            c: p1.x * p2.y - p2.x * p1.y,
        }
    }

    pub fn from_coefficients(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// Intersection point of two lines, `None` when they are exactly parallel.
    pub fn collide(&self, other: &LineLinear2d) -> Option<Point2<f64>> {
        let wab = self.a * other.b - other.a * self.b;
        if wab == 0.0 {
            return None;
        }
        let wbc = self.b * other.c - other.b * self.c;
        let wca = self.c * other.a - other.c * self.a;
        Some(Point2::new(wbc / wab, wca / wab))
    }
}

/// A half-line starting at `origin` and running along `direction`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray2d {
    pub origin: Point2<f64>,
    pub direction: Vector2<f64>,
}

impl Ray2d {
    pub fn new(origin: Point2<f64>, direction: Vector2<f64>) -> Self {
        Self { origin, direction }
    }

    /// Same origin, opposite direction.
    pub fn reversed(&self) -> Self {
        Self::new(self.origin, -self.direction)
    }

    /// Implicit form of the ray's supporting line.
    pub fn linear_form(&self) -> LineLinear2d {
        let a = self.direction.y;
        let b = -self.direction.x;
        let c = -(a * self.origin.x + b * self.origin.y);
        LineLinear2d::from_coefficients(a, b, c)
    }

    /// Intersection with a line, rejected when it lies behind the origin
    /// (or within `epsilon` of it along the direction).
    pub fn collide(&self, line: &LineLinear2d, epsilon: f64) -> Option<Point2<f64>> {
        let hit = self.linear_form().collide(line)?;
        if self.direction.dot(&(hit - self.origin)) < epsilon {
            return None;
        }
        Some(hit)
    }

    pub fn is_on_left_side(&self, p: &Point2<f64>, epsilon: f64) -> bool {
        orthogonal_right(&self.direction).dot(&(p - self.origin)) < epsilon
    }

    pub fn is_on_right_side(&self, p: &Point2<f64>, epsilon: f64) -> bool {
        orthogonal_right(&self.direction).dot(&(p - self.origin)) > -epsilon
    }

    /// `p` is assumed collinear; tests that it is not behind the origin.
    fn in_collinear_ray(&self, p: &Point2<f64>) -> bool {
        self.direction.dot(&(p - self.origin)) >= 0.0
    }

    /// First intersection point of two rays.
    ///
    /// Overlapping collinear rays yield the earliest shared point along
    /// `other`. A zero-length ray is treated as a point.
    pub fn intersect_ray(&self, other: &Ray2d) -> Option<Point2<f64>> {
        const PARALLEL_EPSILON: f64 = 1e-10;

        let u = self.direction;
        let v = other.direction;
        let w = self.origin - other.origin;
        let d = perp_dot(&u, &v);

        if d.abs() < PARALLEL_EPSILON {
            if perp_dot(&u, &w) != 0.0 || perp_dot(&v, &w) != 0.0 {
                return None;
            }

            let du = u.dot(&u);
            let dv = v.dot(&v);
            if du == 0.0 && dv == 0.0 {
                return (self.origin == other.origin).then_some(self.origin);
            }
            if du == 0.0 {
                return other.in_collinear_ray(&self.origin).then_some(self.origin);
            }
            if dv == 0.0 {
                return self.in_collinear_ray(&other.origin).then_some(other.origin);
            }

            // Parametrise both ends of `self` on `other`.
            let w2 = (self.origin + u) - other.origin;
            let (mut t0, mut t1) = if v.x != 0.0 {
                (w.x / v.x, w2.x / v.x)
            } else {
                (w.y / v.y, w2.y / v.y)
            };
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            if t1 < 0.0 {
                return None;
            }
            let t0 = t0.max(0.0);
            return Some(other.origin + v * t0);
        }

        let s = perp_dot(&v, &w) / d;
        if s < 0.0 {
            return None;
        }
        let t = perp_dot(&u, &w) / d;
        if t < 0.0 {
            return None;
        }
        Some(self.origin + u * s)
    }
}

/// Direction of the angle bisector between two unit edge directions.
///
/// Points into the polygon interior for both convex and reflex corners. The
/// result is not normalized.
pub fn calc_vector_bisector(norm1: &Vector2<f64>, norm2: &Vector2<f64>) -> Vector2<f64> {
    let e1v = orthogonal_left(norm1);
    if norm1.dot(norm2) > 0.0 {
        return e1v + orthogonal_left(norm2);
    }

    let ret = norm2 - norm1;
    if e1v.dot(norm2) < 0.0 {
        -ret
    } else {
        ret
    }
}

/// Bisector ray at `origin` between an incoming and an outgoing edge.
pub fn calc_bisector(origin: Point2<f64>, incoming: &Vector2<f64>, outgoing: &Vector2<f64>) -> Ray2d {
    Ray2d::new(
        origin,
        calc_vector_bisector(&normalize_or_zero(incoming), &normalize_or_zero(outgoing)),
    )
}

/// Unit vector, or the zero vector for zero-length input.
pub fn normalize_or_zero(v: &Vector2<f64>) -> Vector2<f64> {
    v.try_normalize(0.0).unwrap_or_else(Vector2::zeros)
}

/// Perpendicular distance from `point` to the line through `begin` and `end`.
pub fn distance_to_line(point: &Point2<f64>, begin: &Point2<f64>, end: &Point2<f64>) -> f64 {
    let n = normalize_or_zero(&(end - begin));
    let offset = point - begin;
    let projected = n * n.dot(&offset);
    (offset - projected).norm()
}

/// Shoelace signed area; positive for counter-clockwise rings.
pub fn signed_area(points: &[Point2<f64>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let p = &points[i];
            let q = &points[(i + 1) % n];
            p.x * q.y - q.x * p.y
        })
        .sum();
    twice * 0.5
}

/// Even-odd point-in-polygon test.
pub fn is_inside_polygon(point: &Point2<f64>, ring: &[Point2<f64>]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut odd = false;
    for i in 0..n {
        let a = &ring[i];
        let b = &ring[(i + 1) % n];
        if (a.y < point.y && b.y >= point.y) || (b.y < point.y && a.y >= point.y) {
            let x = a.x + (point.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if x < point.x {
                odd = !odd;
            }
        }
    }
    odd
}
