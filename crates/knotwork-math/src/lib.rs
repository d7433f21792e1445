//! Knotwork math primitives: point types and the control point algebra the
//! spline algorithms are written against.

pub mod control_point;
pub mod weighted;

pub use glam::{dvec2, dvec3, dvec4, DVec2, DVec3, DVec4};
pub use control_point::ControlPoint;
pub use weighted::WeightedPoint;

pub type Point2 = DVec2;
pub type Point3 = DVec3;
pub type Vector2 = DVec2;
pub type Vector3 = DVec3;
