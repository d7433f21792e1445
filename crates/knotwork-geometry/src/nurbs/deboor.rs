//! Point and derivative evaluation for B-spline and NURBS curves and surfaces.
//!
//! Every routine is generic over [`ControlPoint`], so the same code evaluates
//! Cartesian curves and (in homogeneous form) rational ones.

use knotwork_core::{almost_equal, GeomError, Result};
use knotwork_math::{ControlPoint, Point3, Vector3, WeightedPoint};
use num_integer::binomial;

use super::knot::{all_basis_functions, basis_functions, basis_functions_derivatives, knot_span_index};
use super::validate::{check_bspline, check_grid, check_parameter};

/// Evaluate a B-spline curve point at parameter `t`.
pub fn curve_point<P: ControlPoint>(
    degree: usize,
    knots: &[f64],
    t: f64,
    control_points: &[P],
) -> Result<P> {
    check_bspline(degree, knots, control_points.len())?;
    check_parameter("t", knots, t)?;

    let span = knot_span_index(degree, knots, t);
    let basis = basis_functions(degree, knots, span, t);

    let mut point = P::zero();
    for (i, &b) in basis.iter().enumerate() {
        point += control_points[span - degree + i] * b;
    }
    Ok(point)
}

/// Evaluate the curve and its derivatives up to `order` at `t`.
///
/// Returns `order + 1` entries; derivatives above the degree vanish and are
/// left at zero.
pub fn curve_derivatives<P: ControlPoint>(
    degree: usize,
    order: usize,
    knots: &[f64],
    t: f64,
    control_points: &[P],
) -> Result<Vec<P>> {
    check_bspline(degree, knots, control_points.len())?;
    check_parameter("t", knots, t)?;

    let mut derivatives = vec![P::zero(); order + 1];
    let du = order.min(degree);
    let span = knot_span_index(degree, knots, t);
    let nders = basis_functions_derivatives(degree, knots, span, du, t);

    for (k, row) in nders.iter().enumerate() {
        for (j, &n) in row.iter().enumerate() {
            derivatives[k] += control_points[span - degree + j] * n;
        }
    }
    Ok(derivatives)
}

/// Control points of the derivative curves, restricted to `r1..=r2`.
///
/// `pk[k][i]` is the `i`-th control point of the `k`-th derivative curve
/// (offset by `r1`); row `k` holds `r2 - r1 - k + 1` points. Zero-length knot
/// intervals contribute zero. Rows stop at `order.min(degree).min(r2 - r1)`,
/// since higher derivative curves vanish or have no control points left.
pub fn control_points_of_derivatives<P: ControlPoint>(
    degree: usize,
    order: usize,
    r1: usize,
    r2: usize,
    knots: &[f64],
    control_points: &[P],
) -> Result<Vec<Vec<P>>> {
    check_bspline(degree, knots, control_points.len())?;
    if r1 > r2 {
        return Err(GeomError::invalid(
            "r1",
            format!("range start {r1} is past range end {r2}"),
        ));
    }
    if r2 >= control_points.len() {
        return Err(GeomError::OutOfRange {
            name: "r2",
            value: r2 as f64,
            min: 0.0,
            max: (control_points.len() - 1) as f64,
        });
    }

    let r = r2 - r1;
    let rows = order.min(degree).min(r);
    let mut pk: Vec<Vec<P>> = Vec::with_capacity(rows + 1);
    pk.push(control_points[r1..=r2].to_vec());

    for k in 1..=rows {
        let coefficient = (degree - k + 1) as f64;
        let prev = &pk[k - 1];
        let row = (0..=r - k)
            .map(|i| {
                let span = knots[r1 + i + degree + 1] - knots[r1 + i + k];
                if almost_equal(span, 0.0) {
                    P::zero()
                } else {
                    (prev[i + 1] - prev[i]) * (coefficient / span)
                }
            })
            .collect();
        pk.push(row);
    }
    Ok(pk)
}

/// Curve derivatives through the all-degree basis table and the derivative
/// control points.
///
/// Agrees with [`curve_derivatives`]; worth it when many parameters in the
/// same span are evaluated against the same derivative control points.
pub fn curve_derivatives_by_all_basis<P: ControlPoint>(
    degree: usize,
    order: usize,
    knots: &[f64],
    t: f64,
    control_points: &[P],
) -> Result<Vec<P>> {
    check_bspline(degree, knots, control_points.len())?;
    check_parameter("t", knots, t)?;

    let du = order.min(degree);
    let mut derivatives = vec![P::zero(); order + 1];
    let span = knot_span_index(degree, knots, t);
    let table = all_basis_functions(degree, knots, span, t);
    let pk = control_points_of_derivatives(degree, du, span - degree, span, knots, control_points)?;

    for k in 0..=du {
        for j in 0..=degree - k {
            derivatives[k] += pk[k][j] * table[j][degree - k];
        }
    }
    Ok(derivatives)
}

/// Evaluate a curve point by repeated knot insertion ("corner cutting").
pub fn curve_point_by_corner_cut<P: ControlPoint>(
    degree: usize,
    knots: &[f64],
    t: f64,
    control_points: &[P],
) -> Result<P> {
    check_bspline(degree, knots, control_points.len())?;
    check_parameter("t", knots, t)?;

    let p = degree;
    let n = control_points.len() - 1;
    if t == knots[n + 1] && knots[n + 1..].iter().all(|&x| x == t) {
        return Ok(control_points[n]);
    }

    let k = knot_span_index(degree, knots, t);
    // exact count, matching the span search
    let s = knots[..=k].iter().rev().take_while(|&&x| x == t).count();
    let r = p.saturating_sub(s);

    let mut rw: Vec<P> = control_points[k - p..=k - p + r].to_vec();
    for j in 1..=r {
        for i in 0..=r - j {
            let lo = knots[k - p + j + i];
            let alpha = (t - lo) / (knots[i + k + 1] - lo);
            rw[i] = rw[i + 1] * alpha + rw[i] * (1.0 - alpha);
        }
    }
    Ok(rw[0])
}

/// Evaluate a rational (NURBS) curve point at `t`.
pub fn rational_curve_point(
    degree: usize,
    knots: &[f64],
    t: f64,
    control_points: &[WeightedPoint],
) -> Result<Point3> {
    curve_point(degree, knots, t, control_points).map(WeightedPoint::to_point)
}

/// Derivatives of a rational curve up to `order` at `t`.
///
/// Evaluates the homogeneous derivatives `A(k)`, `w(k)` and applies
/// `C(k) = (A(k) - sum_{i=1..k} binom(k, i) w(i) C(k-i)) / w(0)`.
pub fn rational_curve_derivatives(
    degree: usize,
    order: usize,
    knots: &[f64],
    t: f64,
    control_points: &[WeightedPoint],
) -> Result<Vec<Vector3>> {
    let homogeneous = curve_derivatives(degree, order, knots, t, control_points)?;
    let w0 = homogeneous[0].w();

    let mut derivatives: Vec<Vector3> = Vec::with_capacity(order + 1);
    for k in 0..=order {
        let mut v = homogeneous[k].weighted_xyz();
        for i in 1..=k {
            let coefficient = binomial(k as u64, i as u64) as f64;
            v -= coefficient * homogeneous[i].w() * derivatives[k - i];
        }
        derivatives.push(v / w0);
    }
    Ok(derivatives)
}

/// Evaluate a tensor-product surface point at `(u, v)`.
///
/// `control_points[i][j]` is the control point at row `i` (u-direction) and
/// column `j` (v-direction).
#[allow(clippy::needless_range_loop)]
pub fn surface_point<P: ControlPoint>(
    degree_u: usize,
    degree_v: usize,
    knots_u: &[f64],
    knots_v: &[f64],
    control_points: &[Vec<P>],
    u: f64,
    v: f64,
) -> Result<P> {
    check_grid(degree_u, degree_v, knots_u, knots_v, control_points)?;
    check_parameter("u", knots_u, u)?;
    check_parameter("v", knots_v, v)?;

    let span_u = knot_span_index(degree_u, knots_u, u);
    let basis_u = basis_functions(degree_u, knots_u, span_u, u);
    let span_v = knot_span_index(degree_v, knots_v, v);
    let basis_v = basis_functions(degree_v, knots_v, span_v, v);

    let mut point = P::zero();
    for i in 0..=degree_u {
        let u_idx = span_u - degree_u + i;
        for j in 0..=degree_v {
            let v_idx = span_v - degree_v + j;
            point += control_points[u_idx][v_idx] * (basis_u[i] * basis_v[j]);
        }
    }
    Ok(point)
}

/// Partial derivatives of a surface up to total order `order` at `(u, v)`.
///
/// `skl[k][l]` is the derivative taken `k` times along U and `l` times along
/// V, for `k + l <= order`. Entries past either degree vanish and stay zero.
#[allow(clippy::too_many_arguments, clippy::needless_range_loop)]
pub fn surface_derivatives<P: ControlPoint>(
    degree_u: usize,
    degree_v: usize,
    knots_u: &[f64],
    knots_v: &[f64],
    control_points: &[Vec<P>],
    order: usize,
    u: f64,
    v: f64,
) -> Result<Vec<Vec<P>>> {
    check_grid(degree_u, degree_v, knots_u, knots_v, control_points)?;
    check_parameter("u", knots_u, u)?;
    check_parameter("v", knots_v, v)?;

    let du = order.min(degree_u);
    let dv = order.min(degree_v);
    let mut skl: Vec<Vec<P>> = (0..=order).map(|k| vec![P::zero(); order - k + 1]).collect();

    let span_u = knot_span_index(degree_u, knots_u, u);
    let ders_u = basis_functions_derivatives(degree_u, knots_u, span_u, du, u);
    let span_v = knot_span_index(degree_v, knots_v, v);
    let ders_v = basis_functions_derivatives(degree_v, knots_v, span_v, dv, v);

    let mut temp = vec![P::zero(); degree_v + 1];
    for k in 0..=du {
        for (s, slot) in temp.iter_mut().enumerate() {
            *slot = P::zero();
            for (r, &n) in ders_u[k].iter().enumerate() {
                *slot += control_points[span_u - degree_u + r][span_v - degree_v + s] * n;
            }
        }
        for l in 0..=(order - k).min(dv) {
            for (s, &n) in ders_v[l].iter().enumerate() {
                skl[k][l] += temp[s] * n;
            }
        }
    }
    Ok(skl)
}

/// Surface point and first partial derivatives `(S, Su, Sv)` at `(u, v)`.
pub fn surface_first_derivatives<P: ControlPoint>(
    degree_u: usize,
    degree_v: usize,
    knots_u: &[f64],
    knots_v: &[f64],
    control_points: &[Vec<P>],
    u: f64,
    v: f64,
) -> Result<(P, P, P)> {
    let skl = surface_derivatives(degree_u, degree_v, knots_u, knots_v, control_points, 1, u, v)?;
    Ok((skl[0][0], skl[1][0], skl[0][1]))
}

/// Partial derivatives of a rational surface up to total order `order`.
///
/// Same layout as [`surface_derivatives`]. The homogeneous derivatives
/// `A(k,l)` and `w(k,l)` go through the two-parameter quotient rule.
#[allow(clippy::too_many_arguments)]
pub fn rational_surface_derivatives(
    degree_u: usize,
    degree_v: usize,
    knots_u: &[f64],
    knots_v: &[f64],
    control_points: &[Vec<WeightedPoint>],
    order: usize,
    u: f64,
    v: f64,
) -> Result<Vec<Vec<Vector3>>> {
    let homogeneous =
        surface_derivatives(degree_u, degree_v, knots_u, knots_v, control_points, order, u, v)?;
    let w = |k: usize, l: usize| homogeneous[k][l].w();
    let bin = |n: usize, k: usize| binomial(n as u64, k as u64) as f64;

    let mut skl: Vec<Vec<Vector3>> = (0..=order).map(|k| vec![Vector3::ZERO; order - k + 1]).collect();
    for k in 0..=order {
        for l in 0..=order - k {
            let mut value = homogeneous[k][l].weighted_xyz();
            for j in 1..=l {
                value -= bin(l, j) * w(0, j) * skl[k][l - j];
            }
            for i in 1..=k {
                value -= bin(k, i) * w(i, 0) * skl[k - i][l];
                let mut mixed = Vector3::ZERO;
                for j in 1..=l {
                    mixed += bin(l, j) * w(i, j) * skl[k - i][l - j];
                }
                value -= bin(k, i) * mixed;
            }
            skl[k][l] = value / w(0, 0);
        }
    }
    Ok(skl)
}
