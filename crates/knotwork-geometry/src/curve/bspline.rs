//! B-spline and NURBS curve implementations.

use knotwork_core::traits::Validate;
use knotwork_core::{GeomError, Result, Tolerance};
use knotwork_math::{ControlPoint, Point3, Vector3, WeightedPoint};
use serde::{Deserialize, Serialize};

use super::Curve;
use crate::nurbs::validate::check_bspline;
use crate::nurbs::{deboor, degree, knot_vector, refine};

/// A B-spline curve defined by degree, knot vector, and control points.
///
/// The curve is immutable: every refinement or degree change returns a new
/// curve describing the same geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BSplineCurve<P = Point3> {
    degree: usize,
    knots: Vec<f64>,
    control_points: Vec<P>,
}

/// A NURBS (Non-Uniform Rational B-Spline) curve, stored with homogeneous
/// control points.
pub type NurbsCurve = BSplineCurve<WeightedPoint>;

impl<P: ControlPoint> BSplineCurve<P> {
    /// Build a curve from parts known to be consistent.
    pub fn new(degree: usize, knots: Vec<f64>, control_points: Vec<P>) -> Self {
        debug_assert!(
            knots.len() == control_points.len() + degree + 1,
            "Knot vector length must be n + p + 1, got {} knots for {} CPs with degree {}",
            knots.len(),
            control_points.len(),
            degree
        );
        Self {
            degree,
            knots,
            control_points,
        }
    }

    /// Build a curve, rejecting inconsistent input.
    pub fn try_new(degree: usize, knots: Vec<f64>, control_points: Vec<P>) -> Result<Self> {
        check_bspline(degree, &knots, control_points.len())?;
        Ok(Self {
            degree,
            knots,
            control_points,
        })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    pub fn control_points(&self) -> &[P] {
        &self.control_points
    }

    pub fn into_parts(self) -> (usize, Vec<f64>, Vec<P>) {
        (self.degree, self.knots, self.control_points)
    }

    /// Parameter range `[knots[p], knots[m - p]]`.
    pub fn domain(&self) -> (f64, f64) {
        knot_vector::domain(self.degree, &self.knots)
    }

    pub fn is_clamped(&self) -> bool {
        knot_vector::is_clamped(self.degree, &self.knots)
    }

    /// Evaluate the curve (in control point space) at `t`.
    pub fn evaluate(&self, t: f64) -> Result<P> {
        deboor::curve_point(self.degree, &self.knots, t, &self.control_points)
    }

    /// The point and its derivatives up to `order` at `t`.
    pub fn derivatives(&self, order: usize, t: f64) -> Result<Vec<P>> {
        deboor::curve_derivatives(self.degree, order, &self.knots, t, &self.control_points)
    }

    pub fn continuity_at(&self, knot: f64) -> Result<i32> {
        knot_vector::continuity(self.degree, &self.knots, knot)
    }

    pub fn insert_knot(&self, u: f64, times: usize) -> Result<Self> {
        refine::insert_knot(self.degree, &self.knots, &self.control_points, u, times)
    }

    pub fn refine(&self, insert: &[f64]) -> Result<Self> {
        refine::refine_knot_vector(self.degree, &self.knots, &self.control_points, insert)
    }

    /// Remove `u` exactly `times` times using the default tolerance.
    pub fn remove_knot(&self, u: f64, times: usize) -> Result<Self> {
        refine::remove_knot(
            self.degree,
            &self.knots,
            &self.control_points,
            u,
            times,
            Tolerance::default(),
        )
    }

    pub fn to_bezier_segments(&self) -> Result<Vec<Vec<P>>> {
        refine::decompose_to_bezier(self.degree, &self.knots, &self.control_points)
    }

    pub fn elevate_degree(&self, times: usize) -> Result<Self> {
        degree::elevate_degree(self.degree, &self.knots, &self.control_points, times)
    }

    pub fn reduce_degree(&self, tolerance: Tolerance) -> Result<Self> {
        degree::reduce_degree(self.degree, &self.knots, &self.control_points, tolerance)
    }

    /// The same curve reparameterized onto `[min, max]`.
    pub fn rescaled(&self, min: f64, max: f64) -> Result<Self> {
        let knots = knot_vector::rescale(&self.knots, min, max)?;
        Ok(Self::new(self.degree, knots, self.control_points.clone()))
    }
}

impl<P: ControlPoint> Validate for BSplineCurve<P> {
    fn validate(&self) -> Result<()> {
        check_bspline(self.degree, &self.knots, self.control_points.len())
    }
}

impl NurbsCurve {
    /// Build a rational curve from Cartesian points and positive weights.
    pub fn from_weighted(
        degree: usize,
        knots: Vec<f64>,
        points: &[Point3],
        weights: &[f64],
    ) -> Result<Self> {
        if points.len() != weights.len() {
            return Err(GeomError::invalid(
                "weights",
                format!(
                    "expected {} weights, got {}",
                    points.len(),
                    weights.len()
                ),
            ));
        }
        if weights.iter().any(|&w| !(w > 0.0)) {
            return Err(GeomError::invalid("weights", "all weights must be positive"));
        }
        let control_points = points
            .iter()
            .zip(weights)
            .map(|(&p, &w)| WeightedPoint::new(p, w))
            .collect();
        Self::try_new(degree, knots, control_points)
    }

    pub fn weights(&self) -> Vec<f64> {
        self.control_points.iter().map(|cp| cp.w()).collect()
    }

    /// Derivatives of the projected (Cartesian) curve up to `order` at `t`.
    pub fn rational_derivatives(&self, order: usize, t: f64) -> Result<Vec<Vector3>> {
        deboor::rational_curve_derivatives(self.degree, order, &self.knots, t, &self.control_points)
    }
}

impl Curve for BSplineCurve<Point3> {
    fn point_at(&self, t: f64) -> Result<Point3> {
        self.evaluate(t)
    }

    fn tangent_at(&self, t: f64) -> Result<Vector3> {
        Ok(self.derivatives(1, t)?[1])
    }

    fn domain(&self) -> (f64, f64) {
        BSplineCurve::domain(self)
    }
}

impl Curve for NurbsCurve {
    fn point_at(&self, t: f64) -> Result<Point3> {
        deboor::rational_curve_point(self.degree, &self.knots, t, &self.control_points)
    }

    fn tangent_at(&self, t: f64) -> Result<Vector3> {
        Ok(self.rational_derivatives(1, t)?[1])
    }

    fn domain(&self) -> (f64, f64) {
        BSplineCurve::domain(self)
    }
}
