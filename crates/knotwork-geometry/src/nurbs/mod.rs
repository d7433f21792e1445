//! NURBS core algorithms: knot vector algebra, basis functions, evaluation,
//! refinement and degree change.

pub mod deboor;
pub mod degree;
pub mod knot;
pub mod knot_vector;
pub mod multiplicity;
pub mod refine;
pub mod validate;

pub use deboor::*;
pub use degree::{elevate_bezier, elevate_degree, reduce_bezier, reduce_degree};
pub use knot::{
    all_basis_functions, basis_functions, basis_functions_derivatives, find_span, knot_span_index,
};
pub use knot_vector::*;
pub use multiplicity::{
    internal_knot_multiplicity_map, knot_multiplicity, knot_multiplicity_map, KnotMultiplicityMap,
};
pub use refine::{decompose_to_bezier, insert_knot, refine_knot_vector, remove_knot, remove_knot_up_to};
pub use validate::{is_valid_bspline, is_valid_knot_vector};
