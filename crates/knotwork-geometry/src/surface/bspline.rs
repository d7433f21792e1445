//! B-spline and NURBS surface implementations.

use knotwork_core::traits::Validate;
use knotwork_core::{almost_equal, GeomError, Result, Tolerance};
use knotwork_math::{ControlPoint, DVec3, Point3, Vector3, WeightedPoint};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{Direction, Surface};
use crate::curve::BSplineCurve;
use crate::nurbs::validate::check_grid;
use crate::nurbs::{deboor, knot_vector, refine};

/// A B-spline surface defined by degrees, knot vectors, and a 2D grid of control points.
///
/// `control_points[i][j]` is the control point at row `i` (u-direction) and column `j` (v-direction).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BSplineSurface<P = Point3> {
    degree_u: usize,
    degree_v: usize,
    knots_u: Vec<f64>,
    knots_v: Vec<f64>,
    control_points: Vec<Vec<P>>,
}

/// A NURBS surface, stored with homogeneous control points.
pub type NurbsSurface = BSplineSurface<WeightedPoint>;

/// Control grid of one Bezier patch, `patch[k][l]` with `k` along U.
pub type BezierPatch<P> = Vec<Vec<P>>;

impl<P: ControlPoint> BSplineSurface<P> {
    pub fn new(
        degree_u: usize,
        degree_v: usize,
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        control_points: Vec<Vec<P>>,
    ) -> Self {
        let n_u = control_points.len();
        let n_v = control_points.first().map_or(0, Vec::len);
        debug_assert!(
            knots_u.len() == n_u + degree_u + 1,
            "knots_u length mismatch: {} != {} + {} + 1",
            knots_u.len(),
            n_u,
            degree_u
        );
        debug_assert!(
            knots_v.len() == n_v + degree_v + 1,
            "knots_v length mismatch: {} != {} + {} + 1",
            knots_v.len(),
            n_v,
            degree_v
        );
        Self {
            degree_u,
            degree_v,
            knots_u,
            knots_v,
            control_points,
        }
    }

    pub fn try_new(
        degree_u: usize,
        degree_v: usize,
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        control_points: Vec<Vec<P>>,
    ) -> Result<Self> {
        if control_points.is_empty() {
            return Err(GeomError::invalid(
                "control_points",
                "control grid must not be empty",
            ));
        }
        check_grid(degree_u, degree_v, &knots_u, &knots_v, &control_points)?;
        Ok(Self {
            degree_u,
            degree_v,
            knots_u,
            knots_v,
            control_points,
        })
    }

    pub fn degree_u(&self) -> usize {
        self.degree_u
    }

    pub fn degree_v(&self) -> usize {
        self.degree_v
    }

    pub fn knots_u(&self) -> &[f64] {
        &self.knots_u
    }

    pub fn knots_v(&self) -> &[f64] {
        &self.knots_v
    }

    pub fn control_points(&self) -> &[Vec<P>] {
        &self.control_points
    }

    pub fn domain_u(&self) -> (f64, f64) {
        knot_vector::domain(self.degree_u, &self.knots_u)
    }

    pub fn domain_v(&self) -> (f64, f64) {
        knot_vector::domain(self.degree_v, &self.knots_v)
    }

    /// Evaluate the surface (in control point space) at `(u, v)`.
    pub fn evaluate(&self, u: f64, v: f64) -> Result<P> {
        deboor::surface_point(
            self.degree_u,
            self.degree_v,
            &self.knots_u,
            &self.knots_v,
            &self.control_points,
            u,
            v,
        )
    }

    /// Partial derivatives up to total order `order`; `skl[k][l]` is taken
    /// `k` times along U and `l` times along V.
    pub fn derivatives(&self, order: usize, u: f64, v: f64) -> Result<Vec<Vec<P>>> {
        deboor::surface_derivatives(
            self.degree_u,
            self.degree_v,
            &self.knots_u,
            &self.knots_v,
            &self.control_points,
            order,
            u,
            v,
        )
    }

    /// Split a surface clamped in both directions into Bezier patches.
    ///
    /// `patches[a][b]` covers the `a`-th non-empty span along U and the
    /// `b`-th along V, and holds a `(degree_u + 1) x (degree_v + 1)` grid.
    pub fn to_bezier_patches(&self) -> Result<Vec<Vec<BezierPatch<P>>>> {
        check_grid(
            self.degree_u,
            self.degree_v,
            &self.knots_u,
            &self.knots_v,
            &self.control_points,
        )?;
        log::trace!("decompose surface into Bezier patches");

        // columns[j][a] is the a-th Bezier segment of column j
        let columns = self
            .lines(Direction::U)
            .into_par_iter()
            .map(|column| refine::decompose_to_bezier(self.degree_u, &self.knots_u, &column))
            .collect::<Result<Vec<_>>>()?;
        let segments_u = columns[0].len();

        (0..segments_u)
            .into_par_iter()
            .map(|a| -> Result<Vec<BezierPatch<P>>> {
                let rows = (0..=self.degree_u)
                    .map(|k| {
                        let row: Vec<P> = columns.iter().map(|column| column[a][k]).collect();
                        refine::decompose_to_bezier(self.degree_v, &self.knots_v, &row)
                    })
                    .collect::<Result<Vec<_>>>()?;
                let segments_v = rows[0].len();
                Ok((0..segments_v)
                    .map(|b| rows.iter().map(|row| row[b].clone()).collect())
                    .collect())
            })
            .collect()
    }

    pub fn insert_knot(&self, direction: Direction, knot: f64, times: usize) -> Result<Self> {
        log::trace!("insert knot {} x{} along {:?}", knot, times, direction);
        self.map_direction(direction, |curve| curve.insert_knot(knot, times))
    }

    pub fn refine(&self, direction: Direction, insert: &[f64]) -> Result<Self> {
        log::trace!("refine {} knots along {:?}", insert.len(), direction);
        self.map_direction(direction, |curve| curve.refine(insert))
    }

    /// Remove `knot` `times` times along `direction`; every row or column
    /// must allow the removal within the default tolerance.
    pub fn remove_knot(&self, direction: Direction, knot: f64, times: usize) -> Result<Self> {
        log::trace!("remove knot {} x{} along {:?}", knot, times, direction);
        self.map_direction(direction, |curve| curve.remove_knot(knot, times))
    }

    pub fn elevate_degree(&self, direction: Direction, times: usize) -> Result<Self> {
        log::trace!("elevate degree by {} along {:?}", times, direction);
        self.map_direction(direction, |curve| curve.elevate_degree(times))
    }

    pub fn reduce_degree(&self, direction: Direction, tolerance: Tolerance) -> Result<Self> {
        log::trace!("reduce degree along {:?}", direction);
        self.map_direction(direction, |curve| curve.reduce_degree(tolerance))
    }

    /// Extract the control polygons running along `direction`: columns for
    /// `U`, rows for `V`.
    fn lines(&self, direction: Direction) -> Vec<Vec<P>> {
        match direction {
            Direction::U => {
                let columns = self.control_points[0].len();
                (0..columns)
                    .map(|j| self.control_points.iter().map(|row| row[j]).collect())
                    .collect()
            }
            Direction::V => self.control_points.clone(),
        }
    }

    /// Apply a curve operation to every control polygon along `direction`
    /// and rebuild the grid. All polygons must come back with the same knot
    /// vector.
    fn map_direction<F>(&self, direction: Direction, op: F) -> Result<Self>
    where
        F: Fn(&BSplineCurve<P>) -> Result<BSplineCurve<P>> + Send + Sync,
    {
        check_grid(
            self.degree_u,
            self.degree_v,
            &self.knots_u,
            &self.knots_v,
            &self.control_points,
        )?;
        let (degree, knots) = match direction {
            Direction::U => (self.degree_u, &self.knots_u),
            Direction::V => (self.degree_v, &self.knots_v),
        };

        let curves = self
            .lines(direction)
            .into_par_iter()
            .map(|line| op(&BSplineCurve::new(degree, knots.clone(), line)))
            .collect::<Result<Vec<_>>>()?;

        let (new_degree, new_knots) = match curves.first() {
            Some(first) => (first.degree(), first.knots().to_vec()),
            None => {
                return Err(GeomError::invalid(
                    "control_points",
                    "control grid must not be empty",
                ))
            }
        };
        let consistent = curves.iter().all(|curve| {
            curve.knots().len() == new_knots.len()
                && curve
                    .knots()
                    .iter()
                    .zip(&new_knots)
                    .all(|(&a, &b)| almost_equal(a, b))
        });
        if !consistent {
            log::debug!("{:?} operation produced differing knot vectors", direction);
            return Err(GeomError::infeasible(format!(
                "control polygons along {direction:?} ended with different knot vectors"
            )));
        }

        let lines: Vec<Vec<P>> = curves
            .into_iter()
            .map(|curve| curve.into_parts().2)
            .collect();
        Ok(match direction {
            Direction::U => {
                let rows = lines[0].len();
                let grid = (0..rows)
                    .map(|i| lines.iter().map(|column| column[i]).collect())
                    .collect();
                Self::new(new_degree, self.degree_v, new_knots, self.knots_v.clone(), grid)
            }
            Direction::V => Self::new(
                self.degree_u,
                new_degree,
                self.knots_u.clone(),
                new_knots,
                lines,
            ),
        })
    }
}

impl<P: ControlPoint> Validate for BSplineSurface<P> {
    fn validate(&self) -> Result<()> {
        check_grid(
            self.degree_u,
            self.degree_v,
            &self.knots_u,
            &self.knots_v,
            &self.control_points,
        )
    }
}

impl NurbsSurface {
    /// Build a rational surface from a Cartesian grid and matching positive weights.
    pub fn from_weighted(
        degree_u: usize,
        degree_v: usize,
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        points: &[Vec<Point3>],
        weights: &[Vec<f64>],
    ) -> Result<Self> {
        let shape_matches = points.len() == weights.len()
            && points.iter().zip(weights).all(|(p, w)| p.len() == w.len());
        if !shape_matches {
            return Err(GeomError::invalid(
                "weights",
                "weight grid must have the same shape as the point grid",
            ));
        }
        if weights.iter().flatten().any(|&w| !(w > 0.0)) {
            return Err(GeomError::invalid("weights", "weights must be positive"));
        }
        let grid = points
            .iter()
            .zip(weights)
            .map(|(row, w)| {
                row.iter()
                    .zip(w)
                    .map(|(&p, &w)| WeightedPoint::new(p, w))
                    .collect()
            })
            .collect();
        Self::try_new(degree_u, degree_v, knots_u, knots_v, grid)
    }

    pub fn weights(&self) -> Vec<Vec<f64>> {
        self.control_points
            .iter()
            .map(|row| row.iter().map(|cp| cp.w()).collect())
            .collect()
    }

    /// Cartesian partial derivatives up to total order `order`, same layout
    /// as [`BSplineSurface::derivatives`].
    pub fn rational_derivatives(&self, order: usize, u: f64, v: f64) -> Result<Vec<Vec<Vector3>>> {
        deboor::rational_surface_derivatives(
            self.degree_u,
            self.degree_v,
            &self.knots_u,
            &self.knots_v,
            &self.control_points,
            order,
            u,
            v,
        )
    }
}

fn unit_normal(su: Vector3, sv: Vector3) -> Vector3 {
    let n = su.cross(sv);
    let len = n.length();
    if len < 1e-15 {
        DVec3::Z
    } else {
        n / len
    }
}

impl Surface for BSplineSurface<Point3> {
    fn point_at(&self, u: f64, v: f64) -> Result<Point3> {
        self.evaluate(u, v)
    }

    fn normal_at(&self, u: f64, v: f64) -> Result<Vector3> {
        let (_, su, sv) = deboor::surface_first_derivatives(
            self.degree_u,
            self.degree_v,
            &self.knots_u,
            &self.knots_v,
            &self.control_points,
            u,
            v,
        )?;
        Ok(unit_normal(su, sv))
    }

    fn domain_u(&self) -> (f64, f64) {
        BSplineSurface::domain_u(self)
    }

    fn domain_v(&self) -> (f64, f64) {
        BSplineSurface::domain_v(self)
    }
}

impl Surface for NurbsSurface {
    fn point_at(&self, u: f64, v: f64) -> Result<Point3> {
        self.evaluate(u, v).map(WeightedPoint::to_point)
    }

    fn normal_at(&self, u: f64, v: f64) -> Result<Vector3> {
        let skl = self.rational_derivatives(1, u, v)?;
        Ok(unit_normal(skl[1][0], skl[0][1]))
    }

    fn domain_u(&self) -> (f64, f64) {
        BSplineSurface::domain_u(self)
    }

    fn domain_v(&self) -> (f64, f64) {
        BSplineSurface::domain_v(self)
    }
}
