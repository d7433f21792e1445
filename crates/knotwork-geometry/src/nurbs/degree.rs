//! Degree elevation and reduction of B-spline curves.
//!
//! Both operations go through Bezier decomposition: each segment is elevated
//! or reduced on its own, the segments are joined with full-multiplicity
//! internal knots, and the surplus knots are removed again.

use knotwork_core::{GeomError, Result, Tolerance};
use knotwork_math::ControlPoint;
use num_integer::binomial;

use super::multiplicity::knot_multiplicity_map;
use super::refine::{decompose_to_bezier, remove_knot_up_to};
use super::validate::check_bspline;
use crate::curve::BSplineCurve;

/// Raise the degree of a Bezier control polygon by `times`.
pub fn elevate_bezier<P: ControlPoint>(segment: &[P], times: usize) -> Vec<P> {
    let p = segment.len() - 1;
    let q = p + times;
    (0..=q)
        .map(|i| {
            let denominator = binomial(q as u64, i as u64) as f64;
            let mut point = P::zero();
            for j in i.saturating_sub(times)..=p.min(i) {
                let c = binomial(p as u64, j as u64) * binomial(times as u64, (i - j) as u64);
                point += segment[j] * (c as f64 / denominator);
            }
            point
        })
        .collect()
}

/// Lower the degree of a Bezier control polygon by one.
///
/// Returns the reduced polygon and the largest deviation between the
/// original polygon and the re-elevated reduced one. The deviation is zero
/// (up to rounding) exactly when the segment has degree `p - 1`.
pub fn reduce_bezier<P: ControlPoint>(segment: &[P]) -> (Vec<P>, f64) {
    let p = segment.len() - 1;
    let r = (p - 1) / 2;
    let mut reduced = vec![P::zero(); p];
    reduced[0] = segment[0];
    reduced[p - 1] = segment[p];

    for i in 1..=r {
        let alpha = i as f64 / p as f64;
        reduced[i] = (segment[i] - reduced[i - 1] * alpha) * (1.0 / (1.0 - alpha));
    }
    for i in (r + 2..p).rev() {
        let alpha = i as f64 / p as f64;
        reduced[i - 1] = (segment[i] - reduced[i] * (1.0 - alpha)) * (1.0 / alpha);
    }

    let error = elevate_bezier(&reduced, 1)
        .into_iter()
        .zip(segment)
        .map(|(a, &b)| a.distance_to(b))
        .fold(0.0, f64::max);
    (reduced, error)
}

/// Join Bezier segments of `degree` into one curve with internal knots of
/// multiplicity `degree`, placed at the `breaks` parameters.
fn join_segments<P: ControlPoint>(degree: usize, breaks: &[f64], segments: &[Vec<P>]) -> BSplineCurve<P> {
    let mut knots = Vec::with_capacity(breaks.len() * degree + 2);
    knots.extend(std::iter::repeat(breaks[0]).take(degree + 1));
    for &u in &breaks[1..breaks.len() - 1] {
        knots.extend(std::iter::repeat(u).take(degree));
    }
    knots.extend(std::iter::repeat(breaks[breaks.len() - 1]).take(degree + 1));

    let mut control_points = segments[0].clone();
    for segment in &segments[1..] {
        control_points.extend_from_slice(&segment[1..]);
    }
    BSplineCurve::new(degree, knots, control_points)
}

/// Raise the degree of a clamped curve by `times` without changing its shape.
///
/// Every internal knot of multiplicity `m` ends up with multiplicity
/// `m + times`.
pub fn elevate_degree<P: ControlPoint>(
    degree: usize,
    knots: &[f64],
    control_points: &[P],
    times: usize,
) -> Result<BSplineCurve<P>> {
    check_bspline(degree, knots, control_points.len())?;
    if times == 0 {
        return Ok(BSplineCurve::new(degree, knots.to_vec(), control_points.to_vec()));
    }

    let segments: Vec<Vec<P>> = decompose_to_bezier(degree, knots, control_points)?
        .iter()
        .map(|segment| elevate_bezier(segment, times))
        .collect();

    let multiplicities = knot_multiplicity_map(knots);
    let breaks = multiplicities.knots();
    let mut curve = join_segments(degree + times, &breaks, &segments);

    for (u, m) in multiplicities.internal().iter() {
        let surplus = degree - m;
        if surplus == 0 {
            continue;
        }
        let (next, removed) = remove_knot_up_to(
            curve.degree(),
            curve.knots(),
            curve.control_points(),
            u,
            surplus,
            Tolerance::default(),
        )?;
        if removed < surplus {
            // The curve is still exact, only less compact.
            log::warn!(
                "degree elevation kept {} extra copies of knot {}",
                surplus - removed,
                u
            );
        }
        curve = next;
    }
    Ok(curve)
}

/// Lower the degree of a clamped curve by one, if that can be done exactly.
///
/// Fails with [`GeomError::Infeasible`] when some Bezier segment is not of
/// lower degree within `tolerance.linear`, or when the joined curve cannot
/// recover the original continuity at an internal knot.
pub fn reduce_degree<P: ControlPoint>(
    degree: usize,
    knots: &[f64],
    control_points: &[P],
    tolerance: Tolerance,
) -> Result<BSplineCurve<P>> {
    check_bspline(degree, knots, control_points.len())?;
    if degree < 2 {
        return Err(GeomError::invalid(
            "degree",
            format!("cannot reduce a curve of degree {degree}"),
        ));
    }

    let mut segments = Vec::new();
    for (index, segment) in decompose_to_bezier(degree, knots, control_points)?
        .iter()
        .enumerate()
    {
        let (reduced, error) = reduce_bezier(segment);
        if error > tolerance.linear {
            log::debug!(
                "Bezier segment {} is not reducible: deviation {:e} exceeds {:e}",
                index,
                error,
                tolerance.linear
            );
            return Err(GeomError::infeasible(format!(
                "segment {index} cannot be reduced to degree {} (deviation {error:e})",
                degree - 1
            )));
        }
        segments.push(reduced);
    }

    let multiplicities = knot_multiplicity_map(knots);
    let breaks = multiplicities.knots();
    let mut curve = join_segments(degree - 1, &breaks, &segments);

    for (u, m) in multiplicities.internal().iter() {
        let excess = degree - m;
        if excess == 0 {
            continue;
        }
        let (next, removed) = remove_knot_up_to(
            curve.degree(),
            curve.knots(),
            curve.control_points(),
            u,
            excess,
            tolerance,
        )?;
        if removed < excess {
            log::debug!(
                "reduced curve keeps knot {}: removed {} of {} copies",
                u,
                removed,
                excess
            );
            return Err(GeomError::infeasible(format!(
                "reduced curve cannot reach the original continuity at knot {u}"
            )));
        }
        curve = next;
    }
    Ok(curve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nurbs::deboor::curve_point;
    use crate::nurbs::multiplicity::knot_multiplicity;
    use approx::assert_abs_diff_eq;
    use knotwork_math::{DVec2, DVec3};

    fn cubic() -> BSplineCurve<DVec3> {
        BSplineCurve::new(
            3,
            vec![0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 2.0, 3.0, 3.0, 3.0, 3.0],
            vec![
                DVec3::new(0.0, 0.0, 0.0),
                DVec3::new(1.0, 2.0, 0.0),
                DVec3::new(2.0, 3.0, 1.0),
                DVec3::new(4.0, 1.0, 0.0),
                DVec3::new(5.0, -1.0, 2.0),
                DVec3::new(6.0, 0.0, 1.0),
                DVec3::new(7.0, 2.0, 0.0),
            ],
        )
    }

    #[test]
    fn test_elevate_bezier_line() {
        let line = [DVec2::new(0.0, 0.0), DVec2::new(3.0, 3.0)];
        let elevated = elevate_bezier(&line, 2);
        assert_eq!(elevated.len(), 4);
        for (i, p) in elevated.iter().enumerate() {
            assert_abs_diff_eq!(p.x, i as f64, epsilon = 1e-12);
            assert_abs_diff_eq!(p.y, i as f64, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_reduce_bezier_recovers_elevated() {
        let quadratic = [
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 2.0),
            DVec2::new(2.0, 0.0),
        ];
        for times in 1..=3 {
            let mut segment = elevate_bezier(&quadratic, times);
            for _ in 0..times {
                let (reduced, error) = reduce_bezier(&segment);
                assert!(error < 1e-12);
                segment = reduced;
            }
            for (a, b) in segment.iter().zip(quadratic.iter()) {
                assert_abs_diff_eq!(a.x, b.x, epsilon = 1e-12);
                assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_reduce_bezier_reports_deviation() {
        let cubic = [
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 3.0),
            DVec2::new(2.0, -3.0),
            DVec2::new(3.0, 0.0),
        ];
        let (_, error) = reduce_bezier(&cubic);
        assert!(error > 0.1);
    }

    #[test]
    fn test_elevate_degree_preserves_shape() {
        let curve = cubic();
        let elevated = elevate_degree(3, curve.knots(), curve.control_points(), 2).unwrap();
        assert_eq!(elevated.degree(), 5);
        assert_eq!(knot_multiplicity(elevated.knots(), 0.0), 6);
        assert_eq!(knot_multiplicity(elevated.knots(), 1.0), 3);
        assert_eq!(knot_multiplicity(elevated.knots(), 2.0), 4);
        assert_eq!(knot_multiplicity(elevated.knots(), 3.0), 6);
        assert_eq!(
            elevated.control_points().len(),
            elevated.knots().len() - elevated.degree() - 1
        );

        for i in 0..=30 {
            let t = 3.0 * i as f64 / 30.0;
            let a = curve.evaluate(t).unwrap();
            let b = elevated.evaluate(t).unwrap();
            assert_abs_diff_eq!((a - b).length(), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_elevate_then_reduce_round_trip() {
        let curve = cubic();
        let elevated = curve.elevate_degree(1).unwrap();
        let reduced = elevated.reduce_degree(Tolerance::default()).unwrap();

        assert_eq!(reduced.degree(), 3);
        assert_eq!(reduced.knots().len(), curve.knots().len());
        for (a, b) in reduced.knots().iter().zip(curve.knots()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }
        for (a, b) in reduced.control_points().iter().zip(curve.control_points()) {
            assert_abs_diff_eq!((*a - *b).length(), 0.0, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_reduce_genuine_cubic_is_infeasible() {
        let curve = cubic();
        let err = curve.reduce_degree(Tolerance::default()).unwrap_err();
        assert!(err.is_infeasible());
    }

    #[test]
    fn test_reduce_linear_is_invalid() {
        let knots = [0.0, 0.0, 1.0, 1.0];
        let cps = [DVec3::ZERO, DVec3::X];
        let err = reduce_degree(1, &knots, &cps, Tolerance::default()).unwrap_err();
        assert!(matches!(err, GeomError::InvalidArgument { name: "degree", .. }));
    }

    #[test]
    fn test_elevate_zero_times() {
        let curve = cubic();
        let same = curve.elevate_degree(0).unwrap();
        assert_eq!(same, curve);
    }

    #[test]
    fn test_elevated_bezier_matches_curve_point() {
        let knots = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let cps = [
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 2.0),
            DVec2::new(2.0, 0.0),
        ];
        let elevated = elevate_degree(2, &knots, &cps, 1).unwrap();
        let t = 0.5;
        let p = curve_point(3, elevated.knots(), t, elevated.control_points()).unwrap();
        assert_abs_diff_eq!(p.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 1.0, epsilon = 1e-12);
    }
}
