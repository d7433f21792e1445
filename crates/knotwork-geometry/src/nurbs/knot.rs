//! Knot span search and B-spline basis function evaluation.

/// Find the knot span index for parameter `t` in the knot vector.
///
/// Returns the index `i` such that `knots[i] <= t < knots[i+1]`,
/// with special handling for the upper boundary.
///
/// # Arguments
/// * `degree` - Degree of the B-spline
/// * `knots` - The knot vector
/// * `n` - Number of control points minus 1
/// * `t` - Parameter value
pub fn find_span(degree: usize, knots: &[f64], n: usize, t: f64) -> usize {
    // Special case: t at upper boundary
    if t >= knots[n + 1] {
        return n;
    }
    if t <= knots[degree] {
        return degree;
    }

    // Binary search
    let mut low = degree;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;

    while t < knots[mid] || t >= knots[mid + 1] {
        if t < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }

    mid
}

/// [`find_span`] with the control point count derived from the knot vector
/// length (`n = knots.len() - degree - 2`).
pub fn knot_span_index(degree: usize, knots: &[f64], t: f64) -> usize {
    let n = knots.len() - degree - 2;
    find_span(degree, knots, n, t)
}

/// Compute the non-vanishing basis functions at parameter `t`.
///
/// Returns a vector of `degree + 1` basis function values N_{span-degree,degree}(t)
/// through N_{span,degree}(t).
///
/// # Arguments
/// * `degree` - Degree of the B-spline
/// * `knots` - The knot vector
/// * `span` - The knot span index (from `find_span`)
/// * `t` - Parameter value
pub fn basis_functions(degree: usize, knots: &[f64], span: usize, t: f64) -> Vec<f64> {
    let mut n = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];

    n[0] = 1.0;

    for j in 1..=degree {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;

        for r in 0..j {
            let temp = n[r] / (right[r + 1] + left[j - r]);
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }

        n[j] = saved;
    }

    n
}

/// Compute the nonzero basis functions of every degree `0..=degree` at `t`.
///
/// `table[j][i]` is the `j`-th nonzero basis function of degree `i`, i.e.
/// N_{span-i+j,i}(t). Entries with `j > i` are zero.
pub fn all_basis_functions(degree: usize, knots: &[f64], span: usize, t: f64) -> Vec<Vec<f64>> {
    let mut table = vec![vec![0.0; degree + 1]; degree + 1];
    for i in 0..=degree {
        let basis = basis_functions(i, knots, span, t);
        for (j, value) in basis.into_iter().enumerate() {
            table[j][i] = value;
        }
    }
    table
}

/// Compute the nonzero basis functions and their derivatives up to `order`.
///
/// Returns `ders` with `ders[k][j]` the `k`-th derivative of the `j`-th
/// nonzero basis function N_{span-degree+j,degree}. Rows with `k > degree`
/// are identically zero.
pub fn basis_functions_derivatives(
    degree: usize,
    knots: &[f64],
    span: usize,
    order: usize,
    t: f64,
) -> Vec<Vec<f64>> {
    let p = degree;
    let mut ders = vec![vec![0.0; p + 1]; order + 1];

    // ndu holds basis functions (upper triangle) and knot differences (lower).
    let mut ndu = vec![vec![0.0; p + 1]; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];

    ndu[0][0] = 1.0;

    for j in 1..=p {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;

        for r in 0..j {
            // Lower triangle
            ndu[j][r] = right[r + 1] + left[j - r];
            let temp = ndu[r][j - 1] / ndu[j][r];

            // Upper triangle
            ndu[r][j] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        ndu[j][j] = saved;
    }

    for j in 0..=p {
        ders[0][j] = ndu[j][p];
    }

    let du = order.min(p);
    let mut a = vec![vec![0.0; p + 1]; 2];

    for r in 0..=p {
        let mut s1 = 0;
        let mut s2 = 1;
        a[0][0] = 1.0;

        for k in 1..=du {
            let mut d = 0.0;
            let rk = r as isize - k as isize;
            let pk = p - k;

            if r >= k {
                let rk = rk as usize;
                a[s2][0] = a[s1][0] / ndu[pk + 1][rk];
                d = a[s2][0] * ndu[rk][pk];
            }

            let j1 = if rk >= -1 { 1 } else { (-rk) as usize };
            let j2 = if r <= pk + 1 { k - 1 } else { p - r };

            for j in j1..=j2 {
                let idx = (rk + j as isize) as usize;
                a[s2][j] = (a[s1][j] - a[s1][j - 1]) / ndu[pk + 1][idx];
                d += a[s2][j] * ndu[idx][pk];
            }

            if r <= pk {
                a[s2][k] = -a[s1][k - 1] / ndu[pk + 1][r];
                d += a[s2][k] * ndu[r][pk];
            }

            ders[k][r] = d;
            std::mem::swap(&mut s1, &mut s2);
        }
    }

    // Multiply through by p!/(p-k)!
    let mut factor = p as f64;
    for k in 1..=du {
        for val in ders[k].iter_mut() {
            *val *= factor;
        }
        factor *= (p - k) as f64;
    }

    ders
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_find_span_uniform() {
        // Degree 2, 5 control points, uniform knot vector
        let knots = vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 3.0];
        let n = 4; // 5 control points - 1
        let degree = 2;

        assert_eq!(find_span(degree, &knots, n, 0.0), 2);
        assert_eq!(find_span(degree, &knots, n, 0.5), 2);
        assert_eq!(find_span(degree, &knots, n, 1.0), 3);
        assert_eq!(find_span(degree, &knots, n, 1.5), 3);
        assert_eq!(find_span(degree, &knots, n, 2.5), 4);
        assert_eq!(find_span(degree, &knots, n, 3.0), 4);
        assert_eq!(knot_span_index(degree, &knots, 2.5), 4);
    }

    #[test]
    fn test_find_span_repeated_knot() {
        let knots = vec![0.0, 0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 2.0];
        assert_eq!(knot_span_index(2, &knots, 0.999), 2);
        assert_eq!(knot_span_index(2, &knots, 1.0), 4);
    }

    #[test]
    fn test_basis_functions_partition_of_unity() {
        let knots = vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 3.0];
        let degree = 2;
        let n = 4;

        // Basis functions should sum to 1 (partition of unity)
        for &t in &[0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0] {
            let span = find_span(degree, &knots, n, t);
            let basis = basis_functions(degree, &knots, span, t);
            let sum: f64 = basis.iter().sum();
            assert!(
                (sum - 1.0).abs() < 1e-12,
                "Partition of unity failed at t={}: sum={}",
                t,
                sum
            );
        }
    }

    #[test]
    fn test_basis_functions_non_negative() {
        let knots = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let degree = 3;
        let n = 3;

        for i in 0..=20 {
            let t = i as f64 / 20.0;
            let span = find_span(degree, &knots, n, t);
            let basis = basis_functions(degree, &knots, span, t);
            for (j, &val) in basis.iter().enumerate() {
                assert!(
                    val >= -1e-15,
                    "Negative basis at t={}, j={}: {}",
                    t,
                    j,
                    val
                );
            }
        }
    }

    #[test]
    fn test_basis_known_values() {
        // The NURBS Book example 2.3: U = {0,0,0,1,2,3,4,4,5,5,5}, p = 2, u = 5/2
        let knots = vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 4.0, 5.0, 5.0, 5.0];
        let span = knot_span_index(2, &knots, 2.5);
        assert_eq!(span, 4);
        let basis = basis_functions(2, &knots, span, 2.5);
        assert_abs_diff_eq!(basis[0], 1.0 / 8.0, epsilon = 1e-12);
        assert_abs_diff_eq!(basis[1], 6.0 / 8.0, epsilon = 1e-12);
        assert_abs_diff_eq!(basis[2], 1.0 / 8.0, epsilon = 1e-12);
    }

    #[test]
    fn test_basis_derivatives_cubic_bezier() {
        // Bernstein cubic: B0 = (1-t)^3, B1 = 3t(1-t)^2, B2 = 3t^2(1-t), B3 = t^3
        let knots = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let t = 0.25;
        let span = knot_span_index(3, &knots, t);
        let ders = basis_functions_derivatives(3, &knots, span, 4, t);
        assert_eq!(ders.len(), 5);

        let s = 1.0 - t;
        let values = [s * s * s, 3.0 * t * s * s, 3.0 * t * t * s, t * t * t];
        let first = [
            -3.0 * s * s,
            3.0 * s * s - 6.0 * t * s,
            6.0 * t * s - 3.0 * t * t,
            3.0 * t * t,
        ];
        let second = [6.0 * s, -12.0 * s + 6.0 * t, 6.0 * s - 12.0 * t, 6.0 * t];
        let third = [-6.0, 18.0, -18.0, 6.0];
        for j in 0..4 {
            assert_abs_diff_eq!(ders[0][j], values[j], epsilon = 1e-12);
            assert_abs_diff_eq!(ders[1][j], first[j], epsilon = 1e-12);
            assert_abs_diff_eq!(ders[2][j], second[j], epsilon = 1e-12);
            assert_abs_diff_eq!(ders[3][j], third[j], epsilon = 1e-12);
            assert_abs_diff_eq!(ders[4][j], 0.0);
        }
    }

    #[test]
    fn test_basis_derivatives_sum_to_zero() {
        let knots = vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 4.0, 5.0, 5.0, 5.0];
        for &t in &[0.3, 1.7, 2.5, 4.2] {
            let span = knot_span_index(2, &knots, t);
            let ders = basis_functions_derivatives(2, &knots, span, 2, t);
            for k in 1..=2 {
                let sum: f64 = ders[k].iter().sum();
                assert_abs_diff_eq!(sum, 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_all_basis_functions_table() {
        let knots = vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 3.0];
        let t = 1.5;
        let span = knot_span_index(2, &knots, t);
        let table = all_basis_functions(2, &knots, span, t);
        assert_abs_diff_eq!(table[0][0], 1.0);
        for i in 0..=2 {
            let column: f64 = (0..=i).map(|j| table[j][i]).sum();
            assert_abs_diff_eq!(column, 1.0, epsilon = 1e-12);
        }
        let top = basis_functions(2, &knots, span, t);
        for j in 0..=2 {
            assert_abs_diff_eq!(table[j][2], top[j], epsilon = 1e-15);
        }
    }
}
