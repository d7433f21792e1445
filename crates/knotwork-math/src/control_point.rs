use std::fmt::Debug;
use std::ops::{Add, AddAssign, Mul, Sub};

use glam::{DVec2, DVec3, DVec4};

/// The algebra a control point must support for spline evaluation and
/// refinement: a zero value, addition, subtraction and scaling by a basis
/// coefficient.
///
/// Cartesian points carry an implicit weight of one. Homogeneous points
/// (see [`crate::WeightedPoint`]) report their actual weight so that
/// tolerance checks can be scaled the same way for both.
pub trait ControlPoint:
    Copy
    + Default
    + Debug
    + PartialEq
    + Send
    + Sync
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f64, Output = Self>
    + AddAssign
{
    fn zero() -> Self {
        Self::default()
    }

    /// Euclidean distance in the point's own space (4D for homogeneous points).
    fn distance_to(self, other: Self) -> f64;

    /// Euclidean norm, the distance from the origin.
    fn norm(self) -> f64;

    fn weight(self) -> f64 {
        1.0
    }
}

impl ControlPoint for f64 {
    fn distance_to(self, other: Self) -> f64 {
        (self - other).abs()
    }

    fn norm(self) -> f64 {
        self.abs()
    }
}

macro_rules! impl_control_point_for_glam {
    ($($ty:ty),*) => {
        $(
            impl ControlPoint for $ty {
                fn distance_to(self, other: Self) -> f64 {
                    (self - other).length()
                }

                fn norm(self) -> f64 {
                    self.length()
                }
            }
        )*
    };
}

impl_control_point_for_glam!(DVec2, DVec3, DVec4);
