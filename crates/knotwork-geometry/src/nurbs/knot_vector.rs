//! Set-like algebra over knot vectors: continuity, rescaling, alignment of
//! several knot vectors and uniformity tests.

use knotwork_core::{almost_equal, GeomError, Result};

use super::multiplicity::{knot_multiplicity, knot_multiplicity_map, KnotMultiplicityMap};
use super::validate::{check_degree, check_knot_vector};

/// Continuity at `knot`: `degree - multiplicity`.
///
/// A negative value means the curve is discontinuous there (multiplicity
/// above `degree`).
pub fn continuity(degree: usize, knots: &[f64], knot: f64) -> Result<i32> {
    check_degree(degree)?;
    let multiplicity = knot_multiplicity(knots, knot);
    Ok(degree as i32 - multiplicity as i32)
}

/// Linearly remap the knot domain onto `[min, max]`.
///
/// The first knot maps to `min` and the last to `max`; multiplicities and
/// relative spacing are preserved.
pub fn rescale(knots: &[f64], min: f64, max: f64) -> Result<Vec<f64>> {
    check_knot_vector(knots)?;
    if !(max > min) {
        return Err(GeomError::invalid(
            "max",
            format!("target domain [{min}, {max}] is empty"),
        ));
    }
    let orig_min = knots[0];
    let orig_max = knots[knots.len() - 1];
    if almost_equal(orig_min, orig_max) {
        return Err(GeomError::invalid(
            "knots",
            "knot vector spans a zero-length domain",
        ));
    }

    let k = (max - min) / (orig_max - orig_min);
    let last = knots.len() - 1;
    Ok(knots
        .iter()
        .enumerate()
        .map(|(i, &v)| match i {
            // Pin the ends so that round-off never leaves the target domain.
            0 => min,
            i if i == last => max,
            _ => min + (v - orig_min) * k,
        })
        .collect())
}

/// Knots needed to raise the multiplicity of `start` and `end` to `degree`.
///
/// Inserting the result isolates the `[start, end]` piece of a curve so it can
/// be split off or trimmed.
pub fn inserted_knot_elements_in_range(
    degree: usize,
    knots: &[f64],
    start: f64,
    end: f64,
) -> Result<Vec<f64>> {
    check_knot_vector(knots)?;

    let mut result = Vec::new();
    for param in [start, end] {
        let multiplicity = knot_multiplicity(knots, param);
        if multiplicity < degree {
            result.extend(std::iter::repeat(param).take(degree - multiplicity));
        }
    }
    Ok(result)
}

/// Minimal insertions that make two knot vectors' multiplicity maps equal.
///
/// Returns `(insert0, insert1)`: the knots to insert into `knots0` and
/// `knots1` respectively, each sorted ascending.
pub fn inserted_knot_elements_pair(knots0: &[f64], knots1: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let map0 = knot_multiplicity_map(knots0);
    let map1 = knot_multiplicity_map(knots1);

    let mut insert0 = Vec::new();
    let mut insert1 = Vec::new();

    for (knot, count0) in map0.iter() {
        let count1 = map1.get(knot).unwrap_or(0);
        if count0 > count1 {
            insert1.extend(std::iter::repeat(knot).take(count0 - count1));
        } else {
            insert0.extend(std::iter::repeat(knot).take(count1 - count0));
        }
    }
    for (knot, count1) in map1.iter() {
        if !map0.contains(knot) {
            insert0.extend(std::iter::repeat(knot).take(count1));
        }
    }

    insert0.sort_by(f64::total_cmp);
    insert1.sort_by(f64::total_cmp);
    (insert0, insert1)
}

/// N-way generalization of [`inserted_knot_elements_pair`].
///
/// Every knot is raised to its maximum multiplicity across all inputs; the
/// result holds one ascending insertion list per input, in input order.
pub fn inserted_knot_elements(knot_vectors: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let maps: Vec<KnotMultiplicityMap> = knot_vectors
        .iter()
        .map(|kv| knot_multiplicity_map(kv))
        .collect();

    let mut combined = KnotMultiplicityMap::new();
    for map in &maps {
        for (knot, count) in map.iter() {
            combined.insert_max(knot, count);
        }
    }

    maps.iter()
        .map(|map| {
            let mut elements = Vec::new();
            for (knot, count) in combined.iter() {
                let own = map.get(knot).unwrap_or(0);
                elements.extend(std::iter::repeat(knot).take(count - own));
            }
            elements
        })
        .collect()
}

/// True when all consecutive distinct knots are equally spaced.
///
/// Fewer than two distinct knots define no spacing and are never uniform.
pub fn is_uniform(knots: &[f64]) -> bool {
    let distinct = knot_multiplicity_map(knots).knots();
    if distinct.len() < 2 {
        return false;
    }
    let standard = distinct[1] - distinct[0];
    distinct
        .windows(2)
        .all(|w| almost_equal(w[1] - w[0], standard))
}

/// True when the first and last knot both appear `degree + 1` times.
pub fn is_clamped(degree: usize, knots: &[f64]) -> bool {
    let order = degree + 1;
    if knots.len() < 2 * order {
        return false;
    }
    let first = knots[0];
    let last = knots[knots.len() - 1];
    knots[..order].iter().all(|&k| almost_equal(k, first))
        && knots[knots.len() - order..]
            .iter()
            .all(|&k| almost_equal(k, last))
}

/// The valid parameter range `[knots[p], knots[m - p]]` of a degree-`p` spline.
pub fn domain(degree: usize, knots: &[f64]) -> (f64, f64) {
    (knots[degree], knots[knots.len() - degree - 1])
}
