use approx::assert_abs_diff_eq;
use knotwork_core::{traits::Validate, GeomError, Tolerance};
use knotwork_geometry::nurbs::{
    self, curve_derivatives, curve_derivatives_by_all_basis, curve_point,
    curve_point_by_corner_cut, inserted_knot_elements, inserted_knot_elements_pair,
    knot_multiplicity_map,
};
use knotwork_geometry::{BSplineCurve, Curve, NurbsCurve};
use knotwork_math::{dvec2, DVec2, DVec3, Point3};

fn sample_params(domain: (f64, f64), count: usize) -> impl Iterator<Item = f64> {
    let (t0, t1) = domain;
    (0..=count).map(move |i| t0 + (t1 - t0) * i as f64 / count as f64)
}

fn assert_same_shape(a: &BSplineCurve<DVec3>, b: &BSplineCurve<DVec3>) {
    for t in sample_params(a.domain(), 50) {
        let pa = a.evaluate(t).unwrap();
        let pb = b.evaluate(t).unwrap();
        assert_abs_diff_eq!((pa - pb).length(), 0.0, epsilon = 1e-9);
    }
}

fn spiral() -> BSplineCurve<DVec3> {
    let points = (0..8)
        .map(|i| {
            let a = i as f64 * 0.8;
            DVec3::new(a.cos() * (1.0 + 0.2 * i as f64), a.sin(), 0.3 * i as f64)
        })
        .collect();
    BSplineCurve::try_new(
        3,
        vec![0.0, 0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 2.5, 4.0, 4.0, 4.0, 4.0],
        points,
    )
    .unwrap()
}

fn quadratic_arc() -> BSplineCurve<DVec3> {
    BSplineCurve::try_new(
        2,
        vec![0.0, 0.0, 0.0, 1.0, 3.0, 3.0, 3.0],
        vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 2.0, 0.0),
            DVec3::new(3.0, 2.0, 1.0),
            DVec3::new(4.0, 0.0, 1.0),
        ],
    )
    .unwrap()
}

#[test]
fn test_bezier_midpoint_scenario() {
    let knots = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
    let cps = [dvec2(0.0, 0.0), dvec2(1.0, 2.0), dvec2(2.0, 0.0)];
    let p: DVec2 = curve_point(2, &knots, 0.5, &cps).unwrap();
    assert_abs_diff_eq!(p.x, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(p.y, 1.0, epsilon = 1e-12);
}

#[test]
fn test_multiplicity_sum_equals_knot_count() {
    let curve = spiral();
    let total: usize = knot_multiplicity_map(curve.knots()).iter().map(|(_, m)| m).sum();
    assert_eq!(total, curve.knots().len());
}

#[test]
fn test_point_evaluators_agree() {
    let curve = spiral();
    let (p, knots, cps) = (curve.degree(), curve.knots(), curve.control_points());
    for t in sample_params(curve.domain(), 40) {
        let point = curve_point(p, knots, t, cps).unwrap();
        let derivs = curve_derivatives(p, 3, knots, t, cps).unwrap();
        let by_table = curve_derivatives_by_all_basis(p, 3, knots, t, cps).unwrap();
        let cut = curve_point_by_corner_cut(p, knots, t, cps).unwrap();

        assert_abs_diff_eq!((point - derivs[0]).length(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!((point - cut).length(), 0.0, epsilon = 1e-9);
        for (a, b) in derivs.iter().zip(&by_table) {
            assert_abs_diff_eq!((*a - *b).length(), 0.0, epsilon = 1e-7);
        }
    }
}

#[test]
fn test_point_evaluators_agree_near_knots() {
    let curve = spiral();
    let (p, knots, cps) = (curve.degree(), curve.knots(), curve.control_points());
    for knot in [0.5, 1.0, 2.5] {
        for t in [knot - 5e-8, knot + 5e-8] {
            let point = curve_point(p, knots, t, cps).unwrap();
            let cut = curve_point_by_corner_cut(p, knots, t, cps).unwrap();
            assert_abs_diff_eq!((point - cut).length(), 0.0, epsilon = 1e-9);
        }
    }
}

fn uniform_cubic() -> BSplineCurve<DVec3> {
    let points = (0..6)
        .map(|i| DVec3::new(i as f64, if i % 2 == 0 { 0.0 } else { 1.5 }, 0.1 * i as f64))
        .collect();
    BSplineCurve::try_new(3, (0..10).map(f64::from).collect(), points).unwrap()
}

#[test]
fn test_unclamped_refinement_stays_in_domain() {
    let curve = uniform_cubic();
    assert_eq!(curve.domain(), (3.0, 6.0));

    for u in [0.5, 2.9, 6.1, 8.0] {
        let err = curve.insert_knot(u, 1).unwrap_err();
        assert!(matches!(err, GeomError::OutOfRange { .. }), "u={} gave {:?}", u, err);
    }
    assert!(matches!(
        curve.refine(&[1.0, 4.0]),
        Err(GeomError::OutOfRange { .. })
    ));

    let inserted = curve.insert_knot(4.0, 2).unwrap();
    inserted.validate().unwrap();
    assert_same_shape(&curve, &inserted);

    let refined = curve.refine(&[3.0, 3.5, 5.0, 6.0]).unwrap();
    refined.validate().unwrap();
    assert_same_shape(&curve, &refined);
}

#[test]
fn test_refinement_family_preserves_shape() {
    let curve = spiral();

    let inserted = curve.insert_knot(1.7, 2).unwrap();
    inserted.validate().unwrap();
    assert_same_shape(&curve, &inserted);

    let refined = curve.refine(&[0.25, 0.5, 2.0, 3.0, 3.0]).unwrap();
    refined.validate().unwrap();
    assert_same_shape(&curve, &refined);

    let restored = inserted.remove_knot(1.7, 2).unwrap();
    assert_eq!(restored.knots().len(), curve.knots().len());
    assert_same_shape(&curve, &restored);

    let elevated = curve.elevate_degree(2).unwrap();
    assert_eq!(elevated.degree(), 5);
    assert_same_shape(&curve, &elevated);
}

#[test]
fn test_elevate_then_reduce_recovers_curve() {
    for curve in [spiral(), quadratic_arc()] {
        let reduced = curve
            .elevate_degree(1)
            .and_then(|c| c.reduce_degree(Tolerance::default()))
            .unwrap();
        assert_eq!(reduced.degree(), curve.degree());
        assert_eq!(reduced.knots().len(), curve.knots().len());
        for (a, b) in reduced.knots().iter().zip(curve.knots()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }
        for (a, b) in reduced.control_points().iter().zip(curve.control_points()) {
            assert_abs_diff_eq!((*a - *b).length(), 0.0, epsilon = 1e-7);
        }
    }
}

#[test]
fn test_bezier_segments_cover_curve() {
    let curve = spiral();
    let segments = curve.to_bezier_segments().unwrap();
    // distinct knots 0, 0.5, 1, 2.5, 4
    assert_eq!(segments.len(), 4);
    assert_eq!(segments[0][0], curve.control_points()[0]);
    assert_eq!(
        segments[3][3],
        curve.control_points()[curve.control_points().len() - 1]
    );
}

#[test]
fn test_pair_alignment_makes_curves_compatible() {
    let a = spiral();
    let b = quadratic_arc().elevate_degree(1).unwrap().rescaled(0.0, 4.0).unwrap();

    let (insert_a, insert_b) = inserted_knot_elements_pair(a.knots(), b.knots());
    let a2 = a.refine(&insert_a).unwrap();
    let b2 = b.refine(&insert_b).unwrap();

    assert_eq!(a2.knots().len(), b2.knots().len());
    for (x, y) in a2.knots().iter().zip(b2.knots()) {
        assert_abs_diff_eq!(*x, *y, epsilon = 1e-9);
    }
    assert_same_shape(&a, &a2);
    assert_same_shape(&b, &b2);

    let all = inserted_knot_elements(&[a.knots().to_vec(), b.knots().to_vec()]);
    assert_eq!(all[0], insert_a);
    assert_eq!(all[1], insert_b);
}

#[test]
fn test_over_insertion_reports_infeasible() {
    let curve = spiral();
    let err = curve.insert_knot(1.0, 2).unwrap_err();
    assert!(err.is_infeasible());
}

#[test]
fn test_rational_circle_properties() {
    let w = std::f64::consts::FRAC_1_SQRT_2;
    let points: Vec<Point3> = [
        (1.0, 0.0),
        (1.0, 1.0),
        (0.0, 1.0),
        (-1.0, 1.0),
        (-1.0, 0.0),
        (-1.0, -1.0),
        (0.0, -1.0),
        (1.0, -1.0),
        (1.0, 0.0),
    ]
    .iter()
    .map(|&(x, y)| DVec3::new(x, y, 0.0))
    .collect();
    let weights = [1.0, w, 1.0, w, 1.0, w, 1.0, w, 1.0];
    let knots = vec![
        0.0, 0.0, 0.0, 0.25, 0.25, 0.5, 0.5, 0.75, 0.75, 1.0, 1.0, 1.0,
    ];
    let circle = NurbsCurve::from_weighted(2, knots, &points, &weights).unwrap();

    for t in sample_params(Curve::domain(&circle), 40) {
        let p = circle.point_at(t).unwrap();
        assert_abs_diff_eq!(p.length(), 1.0, epsilon = 1e-12);
        let d = nurbs::rational_curve_derivatives(2, 2, circle.knots(), t, circle.control_points())
            .unwrap();
        assert_abs_diff_eq!(d[1].dot(p), 0.0, epsilon = 1e-9);
    }
    assert!(circle.is_closed());

    let refined = circle.refine(&[0.1, 0.6]).unwrap();
    let elevated = refined.elevate_degree(1).unwrap();
    for t in sample_params((0.0, 1.0), 40) {
        let p = elevated.point_at(t).unwrap();
        assert_abs_diff_eq!(p.length(), 1.0, epsilon = 1e-9);
    }
}
