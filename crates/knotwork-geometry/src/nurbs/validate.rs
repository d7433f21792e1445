//! Argument checks shared by the curve and surface algorithms.
//!
//! Every public algorithm validates its inputs up front so that a violated
//! precondition is reported before any partial computation.

use knotwork_core::{GeomError, Result};

/// A knot vector is valid when it is non-decreasing.
pub fn is_valid_knot_vector(knots: &[f64]) -> bool {
    knots.windows(2).all(|w| w[0] <= w[1])
}

/// `m = n + p + 1`: knot count equals control point count plus degree plus one.
pub fn is_valid_bspline(degree: usize, knot_count: usize, control_point_count: usize) -> bool {
    knot_count == control_point_count + degree + 1
}

pub(crate) fn check_degree(degree: usize) -> Result<()> {
    if degree == 0 {
        return Err(GeomError::invalid("degree", "must be greater than zero"));
    }
    Ok(())
}

pub(crate) fn check_knot_vector(knots: &[f64]) -> Result<()> {
    if knots.is_empty() {
        return Err(GeomError::invalid("knots", "knot vector must not be empty"));
    }
    if !is_valid_knot_vector(knots) {
        return Err(GeomError::invalid(
            "knots",
            "knot vector must be a non-decreasing sequence",
        ));
    }
    Ok(())
}

/// `t` must lie in `[knots.first, knots.last]`.
pub(crate) fn check_parameter(name: &'static str, knots: &[f64], t: f64) -> Result<()> {
    let min = knots[0];
    let max = knots[knots.len() - 1];
    if !(t >= min && t <= max) {
        return Err(GeomError::OutOfRange {
            name,
            value: t,
            min,
            max,
        });
    }
    Ok(())
}

/// `t` must lie in the spline domain `[knots[p], knots[m - p]]`.
///
/// Knot insertion works span by span and needs the full `degree + 1`
/// control points around `t`, which only exist inside the domain.
pub(crate) fn check_domain(name: &'static str, degree: usize, knots: &[f64], t: f64) -> Result<()> {
    let min = knots[degree];
    let max = knots[knots.len() - degree - 1];
    if !(t >= min && t <= max) {
        return Err(GeomError::OutOfRange {
            name,
            value: t,
            min,
            max,
        });
    }
    Ok(())
}

/// Full entry check for an algorithm consuming `(degree, knots, control points)`.
pub(crate) fn check_bspline(degree: usize, knots: &[f64], control_point_count: usize) -> Result<()> {
    check_degree(degree)?;
    check_knot_vector(knots)?;
    if control_point_count == 0 {
        return Err(GeomError::invalid(
            "control_points",
            "at least one control point is required",
        ));
    }
    if !is_valid_bspline(degree, knots.len(), control_point_count) {
        return Err(GeomError::invalid(
            "control_points",
            format!(
                "knot count must equal control point count + degree + 1, got {} knots for {} control points with degree {}",
                knots.len(),
                control_point_count,
                degree
            ),
        ));
    }
    Ok(())
}

/// Entry check for a tensor-product control grid `grid[i][j]` (`i` along U).
pub(crate) fn check_grid<P>(
    degree_u: usize,
    degree_v: usize,
    knots_u: &[f64],
    knots_v: &[f64],
    grid: &[Vec<P>],
) -> Result<()> {
    check_bspline(degree_u, knots_u, grid.len())?;
    let columns = grid[0].len();
    if grid.iter().any(|row| row.len() != columns) {
        return Err(GeomError::invalid(
            "control_points",
            "all rows of the control grid must have the same length",
        ));
    }
    check_bspline(degree_v, knots_v, columns)
}
