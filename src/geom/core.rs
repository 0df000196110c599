use std::ops::{Add, AddAssign, Mul};

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Point3
// ─────────────────────────────────────────────────────────────────────────────

/// A position in scanner space.
///
/// Points can be scaled and summed directly: exemplar accumulation keeps
/// running weighted sums of positions, which only become positions again after
/// dividing by the total weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const ORIGIN: Self = Self::new(0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub const fn scaled(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// `self * (1 - t) + rhs * t`.
    #[must_use]
    pub fn lerp(self, rhs: Self, t: f64) -> Self {
        self.scaled(1.0 - t) + rhs.scaled(t)
    }

    #[must_use]
    pub const fn distance_squared_to(self, other: Self) -> f64 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        dx * dx + dy * dy + dz * dz
    }

    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        self.distance_squared_to(other).sqrt()
    }

    /// All three coordinates are neither NaN nor infinite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Point3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Point3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Mul<f64> for Point3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        self.scaled(rhs)
    }
}

impl Mul<Point3> for f64 {
    type Output = Point3;
    fn mul(self, rhs: Point3) -> Self::Output {
        rhs.scaled(self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transform
// ─────────────────────────────────────────────────────────────────────────────

/// Voxel-to-scanner affine transform, stored as the three rows image headers
/// carry. The implicit fourth row is `[0, 0, 0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    rows: [[f64; 4]; 3],
}

impl Transform {
    #[must_use]
    pub const fn identity() -> Self {
        Self::from_rows([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
        ])
    }

    #[must_use]
    pub const fn from_rows(rows: [[f64; 4]; 3]) -> Self {
        Self { rows }
    }

    #[must_use]
    pub const fn rows(&self) -> [[f64; 4]; 3] {
        self.rows
    }

    #[must_use]
    pub fn apply_point(self, p: Point3) -> Point3 {
        let [x, y, z] = self
            .rows
            .map(|[a, b, c, d]| a * p.x + b * p.y + c * p.z + d);
        Point3::new(x, y, z)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tolerance
// ─────────────────────────────────────────────────────────────────────────────

/// Epsilon for approximate comparisons.
///
/// - `Tolerance::DEFAULT` (1e-9): exact geometry up to rounding.
/// - `Tolerance::LOOSE` (1e-6): values that went through summation in a
///   different order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub eps: f64,
}

impl Tolerance {
    pub const DEFAULT: Self = Self { eps: 1e-9 };
    pub const LOOSE: Self = Self { eps: 1e-6 };

    #[must_use]
    pub const fn default_geom() -> Self {
        Self::DEFAULT
    }

    #[must_use]
    pub fn approx_eq_f64(self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.eps
    }

    #[must_use]
    pub fn approx_eq_point3(self, a: Point3, b: Point3) -> bool {
        a.distance_squared_to(b) <= self.eps * self.eps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_sum_of_points() {
        let mut acc = Point3::ORIGIN;
        acc += Point3::new(1.0, 2.0, 3.0) * 2.0;
        acc += 0.5 * Point3::new(4.0, 0.0, -2.0);
        assert_eq!(acc, Point3::new(4.0, 4.0, 5.0));
    }

    #[test]
    fn lerp_hits_both_ends() {
        let a = Point3::ORIGIN;
        let b = Point3::new(10.0, 20.0, 30.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Point3::new(5.0, 10.0, 15.0));
    }

    #[test]
    fn distances() {
        let a = Point3::new(1.0, 2.0, 3.0);
        let b = Point3::new(4.0, 6.0, 3.0);
        assert_eq!(a.distance_squared_to(b), 25.0);
        assert_eq!(a.distance_to(b), 5.0);
    }

    #[test]
    fn non_finite_coordinates() {
        assert!(Point3::new(1.0, -2.0, 3.0).is_finite());
        assert!(!Point3::new(f64::NAN, 0.0, 0.0).is_finite());
        assert!(!Point3::new(0.0, 0.0, f64::NEG_INFINITY).is_finite());
    }

    #[test]
    fn transform_applies_header_rows() {
        let rows = [
            [0.0, -1.0, 0.0, 10.0],
            [1.0, 0.0, 0.0, -5.0],
            [0.0, 0.0, 2.0, 1.5],
        ];
        let t = Transform::from_rows(rows);
        assert_eq!(t.rows(), rows);
        assert_eq!(
            t.apply_point(Point3::new(1.0, 2.0, 3.0)),
            Point3::new(8.0, -4.0, 7.5)
        );
        let p = Point3::new(-3.0, 0.5, 7.0);
        assert_eq!(Transform::default().apply_point(p), p);
    }

    #[test]
    fn tolerance_point_comparison() {
        let tol = Tolerance::default_geom();
        let a = Point3::new(1.0, 2.0, 3.0);
        assert!(tol.approx_eq_point3(a, Point3::new(1.0 + 1e-10, 2.0, 3.0)));
        assert!(!tol.approx_eq_point3(a, Point3::new(1.0 + 1e-8, 2.0, 3.0)));
        assert!(Tolerance::LOOSE.approx_eq_f64(1.0, 1.0 + 1e-7));
    }
}
