//! Homogeneous (weighted) points for rational curves and surfaces.

use std::ops::{Add, AddAssign, Mul, Sub};

use glam::{DVec3, DVec4};
use serde::{Deserialize, Serialize};

use crate::control_point::ControlPoint;
use crate::Point3;

/// A control point in homogeneous form `(w*x, w*y, w*z, w)`.
///
/// A NURBS curve is a polynomial B-spline in this 4D space, so every
/// non-rational algorithm applies unchanged to `WeightedPoint` control
/// points. Project back with [`WeightedPoint::to_point`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedPoint(DVec4);

impl WeightedPoint {
    /// Homogenize a Cartesian point with the given weight.
    pub fn new(point: Point3, weight: f64) -> Self {
        Self((point * weight).extend(weight))
    }

    pub fn from_homogeneous(h: DVec4) -> Self {
        Self(h)
    }

    pub fn homogeneous(self) -> DVec4 {
        self.0
    }

    /// The weighted coordinates `(w*x, w*y, w*z)`.
    pub fn weighted_xyz(self) -> DVec3 {
        self.0.truncate()
    }

    pub fn w(self) -> f64 {
        self.0.w
    }

    /// Project to Cartesian space. A zero weight leaves the coordinates as they
    /// are, since the point is then at infinity.
    pub fn to_point(self) -> Point3 {
        let w = self.0.w;
        if w.abs() < 1e-15 {
            self.0.truncate()
        } else {
            self.0.truncate() / w
        }
    }
}

impl From<Point3> for WeightedPoint {
    fn from(p: Point3) -> Self {
        Self::new(p, 1.0)
    }
}

impl Add for WeightedPoint {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for WeightedPoint {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<f64> for WeightedPoint {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self(self.0 * rhs)
    }
}

impl Mul<WeightedPoint> for f64 {
    type Output = WeightedPoint;

    fn mul(self, rhs: WeightedPoint) -> WeightedPoint {
        WeightedPoint(rhs.0 * self)
    }
}

impl AddAssign for WeightedPoint {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl ControlPoint for WeightedPoint {
    fn distance_to(self, other: Self) -> f64 {
        (self.0 - other.0).length()
    }

    fn norm(self) -> f64 {
        self.0.length()
    }

    fn weight(self) -> f64 {
        self.0.w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use glam::dvec3;

    #[test]
    fn test_homogenize_and_project() {
        let p = dvec3(1.0, -2.0, 3.0);
        let wp = WeightedPoint::new(p, 2.0);
        assert_eq!(wp.homogeneous(), DVec4::new(2.0, -4.0, 6.0, 2.0));
        assert_eq!(wp.weighted_xyz(), dvec3(2.0, -4.0, 6.0));
        assert_abs_diff_eq!(wp.w(), 2.0);
        assert!((wp.to_point() - p).length() < 1e-15);
    }

    #[test]
    fn test_blend_is_rational() {
        // Blending in homogeneous space pulls toward the heavier point.
        let a = WeightedPoint::new(dvec3(0.0, 0.0, 0.0), 1.0);
        let b = WeightedPoint::new(dvec3(1.0, 0.0, 0.0), 3.0);
        let mid = a * 0.5 + 0.5 * b;
        assert_abs_diff_eq!(mid.to_point().x, 0.75, epsilon = 1e-15);
        assert_abs_diff_eq!(ControlPoint::weight(mid), 2.0, epsilon = 1e-15);
    }

    #[test]
    fn test_zero_weight_projection() {
        let wp = WeightedPoint::from_homogeneous(DVec4::new(1.0, 2.0, 3.0, 0.0));
        assert_eq!(wp.to_point(), dvec3(1.0, 2.0, 3.0));
    }
}
