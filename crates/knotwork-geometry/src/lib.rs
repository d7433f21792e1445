//! Knotwork geometry: knot vector algebra, B-spline/NURBS curves and surfaces.

pub mod curve;
pub mod nurbs;
pub mod surface;

pub use curve::{BSplineCurve, Curve, NurbsCurve};
pub use surface::{BSplineSurface, BezierPatch, Direction, NurbsSurface, Surface};
