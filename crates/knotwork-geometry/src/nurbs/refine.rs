//! Knot insertion, refinement, removal and Bezier decomposition for curves.
//!
//! Each routine takes `(degree, knots, control points)` and returns a new
//! curve describing the same geometry; inputs are never modified.

use knotwork_core::{almost_equal, GeomError, Result, Tolerance};
use knotwork_math::ControlPoint;

use super::knot::knot_span_index;
use super::knot_vector::is_clamped;
use super::multiplicity::{
    internal_knot_multiplicity_map, knot_multiplicity, knot_multiplicity_map, snap_to_knot,
};
use super::validate::{check_bspline, check_domain, is_valid_knot_vector};
use crate::curve::BSplineCurve;

/// Insert `u` into the knot vector `times` times.
///
/// `u` must lie in the curve domain. Fails with [`GeomError::Infeasible`]
/// when the resulting multiplicity would exceed `degree`.
pub fn insert_knot<P: ControlPoint>(
    degree: usize,
    knots: &[f64],
    control_points: &[P],
    u: f64,
    times: usize,
) -> Result<BSplineCurve<P>> {
    check_bspline(degree, knots, control_points.len())?;
    check_domain("u", degree, knots, u)?;
    if times == 0 {
        return Ok(BSplineCurve::new(degree, knots.to_vec(), control_points.to_vec()));
    }

    let u = snap_to_knot(knots, u);
    let s = knot_multiplicity(knots, u);
    if s + times > degree {
        log::debug!(
            "cannot insert knot {} {} times: multiplicity {} with degree {}",
            u,
            times,
            s,
            degree
        );
        return Err(GeomError::infeasible(format!(
            "inserting knot {u} {times} times would raise its multiplicity {s} above degree {degree}"
        )));
    }

    let p = degree;
    let r = times;
    let np = control_points.len() - 1;
    let k = match knots.iter().rposition(|&knot| knot == u) {
        Some(last) if s > 0 => last,
        _ => knot_span_index(degree, knots, u),
    };

    let mut new_knots = Vec::with_capacity(knots.len() + r);
    new_knots.extend_from_slice(&knots[..=k]);
    new_knots.extend(std::iter::repeat(u).take(r));
    new_knots.extend_from_slice(&knots[k + 1..]);

    let mut qw = vec![P::zero(); np + 1 + r];
    qw[..=k - p].copy_from_slice(&control_points[..=k - p]);
    for i in k - s..=np {
        qw[i + r] = control_points[i];
    }

    let mut rw: Vec<P> = control_points[k - p..=k - s].to_vec();
    let mut l = 0;
    for j in 1..=r {
        l = k - p + j;
        for i in 0..=p - j - s {
            let alpha = (u - knots[l + i]) / (knots[i + k + 1] - knots[l + i]);
            rw[i] = rw[i + 1] * alpha + rw[i] * (1.0 - alpha);
        }
        qw[l] = rw[0];
        qw[k + r - j - s] = rw[p - j - s];
    }
    for i in l + 1..k - s {
        qw[i] = rw[i - l];
    }

    Ok(BSplineCurve::new(degree, new_knots, qw))
}

/// Insert a sorted list of knots in one pass.
///
/// Every knot must lie in the curve domain.
pub fn refine_knot_vector<P: ControlPoint>(
    degree: usize,
    knots: &[f64],
    control_points: &[P],
    insert: &[f64],
) -> Result<BSplineCurve<P>> {
    check_bspline(degree, knots, control_points.len())?;
    if insert.is_empty() {
        return Ok(BSplineCurve::new(degree, knots.to_vec(), control_points.to_vec()));
    }
    if !is_valid_knot_vector(insert) {
        return Err(GeomError::invalid(
            "insert",
            "knots to insert must be sorted ascending",
        ));
    }
    for &x in insert {
        check_domain("insert", degree, knots, x)?;
    }

    let x: Vec<f64> = insert.iter().map(|&v| snap_to_knot(knots, v)).collect();
    for (value, extra) in knot_multiplicity_map(&x).iter() {
        let existing = knot_multiplicity(knots, value);
        if existing + extra > degree + 1 {
            log::debug!(
                "refinement rejected: knot {} would reach multiplicity {}",
                value,
                existing + extra
            );
            return Err(GeomError::infeasible(format!(
                "refining would raise knot {value} to multiplicity {} with degree {degree}",
                existing + extra
            )));
        }
    }

    let p = degree;
    let n = control_points.len() - 1;
    let m = n + p + 1;
    let r = x.len() - 1;

    let a = knot_span_index(p, knots, x[0]);
    let b = knot_span_index(p, knots, x[r]) + 1;

    let mut qw = vec![P::zero(); n + r + 2];
    let mut ubar = vec![0.0; m + r + 2];

    qw[..=a - p].copy_from_slice(&control_points[..=a - p]);
    for j in b - 1..=n {
        qw[j + r + 1] = control_points[j];
    }
    ubar[..=a].copy_from_slice(&knots[..=a]);
    for j in b + p..=m {
        ubar[j + r + 1] = knots[j];
    }

    let mut i = b + p - 1;
    let mut k = b + p + r;
    for j in (0..=r).rev() {
        while x[j] <= knots[i] && i > a {
            qw[k - p - 1] = control_points[i - p - 1];
            ubar[k] = knots[i];
            k -= 1;
            i -= 1;
        }
        qw[k - p - 1] = qw[k - p];
        for l in 1..=p {
            let ind = k - p + l;
            let alpha = ubar[k + l] - x[j];
            if almost_equal(alpha, 0.0) {
                qw[ind - 1] = qw[ind];
            } else {
                let alpha = alpha / (ubar[k + l] - knots[i - l + 1]);
                qw[ind - 1] = qw[ind - 1] * alpha + qw[ind] * (1.0 - alpha);
            }
        }
        ubar[k] = x[j];
        // k only reaches zero after the final pass
        k = k.saturating_sub(1);
    }

    Ok(BSplineCurve::new(degree, ubar, qw))
}

/// Split a clamped curve into Bezier segments.
///
/// Returns one `degree + 1` point control polygon per non-empty knot span, in
/// parameter order; consecutive segments share their end points.
pub fn decompose_to_bezier<P: ControlPoint>(
    degree: usize,
    knots: &[f64],
    control_points: &[P],
) -> Result<Vec<Vec<P>>> {
    check_bspline(degree, knots, control_points.len())?;
    if !is_clamped(degree, knots) {
        return Err(GeomError::invalid(
            "knots",
            "Bezier decomposition requires a clamped knot vector",
        ));
    }
    if let Some((knot, mult)) = internal_knot_multiplicity_map(knots)
        .iter()
        .find(|&(_, mult)| mult > degree)
    {
        return Err(GeomError::invalid(
            "knots",
            format!("internal knot {knot} has multiplicity {mult} above degree {degree}"),
        ));
    }

    let p = degree;
    let m = knots.len() - 1;
    let segment_count = knot_multiplicity_map(knots).len().saturating_sub(1).max(1);

    let mut segments = vec![vec![P::zero(); p + 1]; segment_count];
    segments[0].copy_from_slice(&control_points[..=p]);

    let mut alphas = vec![0.0; p];
    let mut a = p;
    let mut b = p + 1;
    let mut nb = 0;

    while b < m {
        let i = b;
        while b < m && almost_equal(knots[b + 1], knots[b]) {
            b += 1;
        }
        let mult = b - i + 1;

        if mult < p {
            let numer = knots[b] - knots[a];
            for j in (mult + 1..=p).rev() {
                alphas[j - mult - 1] = numer / (knots[a + j] - knots[a]);
            }
            let r = p - mult;
            for j in 1..=r {
                let save = r - j;
                let s = mult + j;
                for k in (s..=p).rev() {
                    let alpha = alphas[k - s];
                    let blended = segments[nb][k] * alpha + segments[nb][k - 1] * (1.0 - alpha);
                    segments[nb][k] = blended;
                }
                if b < m {
                    let shared = segments[nb][p];
                    segments[nb + 1][save] = shared;
                }
            }
        }

        nb += 1;
        if b < m {
            for i in p - mult..=p {
                segments[nb][i] = control_points[b - p + i];
            }
            a = b;
            b += 1;
        }
    }

    segments.truncate(nb.max(1));
    Ok(segments)
}

/// Remove the internal knot `u` exactly `times` times.
///
/// Fails with [`GeomError::Infeasible`] if any of the removals would change
/// the curve by more than the tolerance.
pub fn remove_knot<P: ControlPoint>(
    degree: usize,
    knots: &[f64],
    control_points: &[P],
    u: f64,
    times: usize,
    tolerance: Tolerance,
) -> Result<BSplineCurve<P>> {
    let (curve, removed) = remove_knot_up_to(degree, knots, control_points, u, times, tolerance)?;
    if removed < times {
        log::debug!(
            "knot {} removable only {} of {} times within {}",
            u,
            removed,
            times,
            tolerance.linear
        );
        return Err(GeomError::infeasible(format!(
            "knot {u} can be removed only {removed} of {times} times without changing the curve"
        )));
    }
    Ok(curve)
}

/// Remove the internal knot `u` up to `times` times, stopping at the first
/// removal that would not be exact.
///
/// Returns the resulting curve and the number of removals performed.
pub fn remove_knot_up_to<P: ControlPoint>(
    degree: usize,
    knots: &[f64],
    control_points: &[P],
    u: f64,
    times: usize,
    tolerance: Tolerance,
) -> Result<(BSplineCurve<P>, usize)> {
    check_bspline(degree, knots, control_points.len())?;

    let p = degree;
    let n = control_points.len() - 1;
    let m = n + p + 1;

    let r = knots
        .iter()
        .rposition(|&k| almost_equal(k, u))
        .ok_or_else(|| GeomError::invalid("u", format!("{u} is not a knot of the curve")))?;
    let u = knots[r];
    let s = knot_multiplicity(knots, u);

    let (start, end) = (knots[p], knots[m - p]);
    if u <= start || u >= end || almost_equal(u, start) || almost_equal(u, end) {
        return Err(GeomError::invalid(
            "u",
            format!("only knots inside the curve domain can be removed, got {u}"),
        ));
    }
    if times > s {
        return Err(GeomError::invalid(
            "times",
            format!("knot {u} has multiplicity {s}, cannot remove it {times} times"),
        ));
    }
    if times == 0 {
        return Ok((
            BSplineCurve::new(degree, knots.to_vec(), control_points.to_vec()),
            0,
        ));
    }

    // TOL = d * w_min / (1 + |P|_max)
    let w_min = control_points
        .iter()
        .map(|cp| cp.weight())
        .fold(f64::INFINITY, f64::min);
    let p_max = control_points
        .iter()
        .map(|cp| cp.norm())
        .fold(0.0, f64::max);
    let tol = tolerance.linear * w_min.abs() / (1.0 + p_max);

    let ord = (p + 1) as isize;
    let (ri, si, pi) = (r as isize, s as isize, p as isize);
    let fout = ((2 * ri - si - pi) / 2) as usize;
    let mut first = ri - pi;
    let mut last = ri - si;

    let mut pw = control_points.to_vec();
    let mut temp = vec![P::zero(); 2 * p + 2];
    let kn = |idx: isize| knots[idx as usize];

    let mut t = 0usize;
    while t < times {
        let ti = t as isize;
        let off = first - 1;
        temp[0] = pw[off as usize];
        temp[(last + 1 - off) as usize] = pw[(last + 1) as usize];

        let (mut i, mut j) = (first, last);
        let (mut ii, mut jj) = (1isize, last - off);
        while j - i > ti {
            let alfi = (u - kn(i)) / (kn(i + ord + ti) - kn(i));
            let alfj = (u - kn(j - ti)) / (kn(j + ord) - kn(j - ti));
            temp[ii as usize] =
                (pw[i as usize] - temp[(ii - 1) as usize] * (1.0 - alfi)) * (1.0 / alfi);
            temp[jj as usize] =
                (pw[j as usize] - temp[(jj + 1) as usize] * alfj) * (1.0 / (1.0 - alfj));
            i += 1;
            ii += 1;
            j -= 1;
            jj -= 1;
        }

        let removable = if j - i < ti {
            temp[(ii - 1) as usize].distance_to(temp[(jj + 1) as usize]) <= tol
        } else {
            let alfi = (u - kn(i)) / (kn(i + ord + ti) - kn(i));
            let blended =
                temp[(ii + ti + 1) as usize] * alfi + temp[(ii - 1) as usize] * (1.0 - alfi);
            pw[i as usize].distance_to(blended) <= tol
        };
        if !removable {
            break;
        }

        let (mut i, mut j) = (first, last);
        while j - i > ti {
            pw[i as usize] = temp[(i - off) as usize];
            pw[j as usize] = temp[(j - off) as usize];
            i += 1;
            j -= 1;
        }
        first -= 1;
        last += 1;
        t += 1;
    }

    if t == 0 {
        return Ok((
            BSplineCurve::new(degree, knots.to_vec(), control_points.to_vec()),
            0,
        ));
    }

    let mut new_knots = knots.to_vec();
    for k in r + 1..=m {
        new_knots[k - t] = new_knots[k];
    }
    new_knots.truncate(m + 1 - t);

    let mut j = fout;
    let mut i = j;
    for k in 1..t {
        if k % 2 == 1 {
            i += 1;
        } else {
            j -= 1;
        }
    }
    for k in i + 1..=n {
        pw[j] = pw[k];
        j += 1;
    }
    pw.truncate(n + 1 - t);

    Ok((BSplineCurve::new(degree, new_knots, pw), t))
}
