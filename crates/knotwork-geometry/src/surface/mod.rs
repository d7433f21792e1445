//! Surface traits and implementations.

mod bspline;

use knotwork_core::Result;
use knotwork_math::{Point3, Vector3};
use serde::{Deserialize, Serialize};

pub use bspline::{BSplineSurface, BezierPatch, NurbsSurface};

/// Parametric direction of a tensor-product surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Along the rows of the control grid (first index).
    U,
    /// Along the columns of the control grid (second index).
    V,
}

/// Trait for parametric surfaces in 3D space.
pub trait Surface: Send + Sync {
    /// Evaluate the surface at parameters `(u, v)`.
    fn point_at(&self, u: f64, v: f64) -> Result<Point3>;

    /// Evaluate the unit surface normal at parameters `(u, v)`.
    fn normal_at(&self, u: f64, v: f64) -> Result<Vector3>;

    /// Return the u-parameter domain `(u_min, u_max)`.
    fn domain_u(&self) -> (f64, f64);

    /// Return the v-parameter domain `(v_min, v_max)`.
    fn domain_v(&self) -> (f64, f64);
}
