//! Knot multiplicity analysis under tolerance-based knot equality.

use knotwork_core::almost_equal;

/// Count the entries of `knots` equal to `knot` (tolerance comparison).
pub fn knot_multiplicity(knots: &[f64], knot: f64) -> usize {
    knots.iter().filter(|&&k| almost_equal(k, knot)).count()
}

/// Snap `u` onto an existing knot value when one compares equal to it.
pub(crate) fn snap_to_knot(knots: &[f64], u: f64) -> f64 {
    knots
        .iter()
        .copied()
        .find(|&k| almost_equal(k, u))
        .unwrap_or(u)
}

/// Distinct knot values with their multiplicities, in ascending knot order.
///
/// Keys are unique up to [`almost_equal`], so lookups never depend on exact
/// floating-point equality and the map is never hashed on `f64`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnotMultiplicityMap {
    entries: Vec<(f64, usize)>,
}

impl KnotMultiplicityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the map of a knot vector with one pass over its entries.
    pub fn from_knots(knots: &[f64]) -> Self {
        let mut map = Self::new();
        for &knot in knots {
            if !map.contains(knot) {
                map.insert_max(knot, knot_multiplicity(knots, knot));
            }
        }
        map
    }

    /// Position of `knot` if present, otherwise the insertion point.
    fn locate(&self, knot: f64) -> Result<usize, usize> {
        let idx = self.entries.partition_point(|&(k, _)| k < knot);
        if idx < self.entries.len() && almost_equal(self.entries[idx].0, knot) {
            return Ok(idx);
        }
        if idx > 0 && almost_equal(self.entries[idx - 1].0, knot) {
            return Ok(idx - 1);
        }
        Err(idx)
    }

    pub fn get(&self, knot: f64) -> Option<usize> {
        self.locate(knot).ok().map(|idx| self.entries[idx].1)
    }

    pub fn contains(&self, knot: f64) -> bool {
        self.locate(knot).is_ok()
    }

    /// Record `multiplicity` for `knot`, keeping the larger value when the
    /// knot is already present.
    pub fn insert_max(&mut self, knot: f64, multiplicity: usize) {
        match self.locate(knot) {
            Ok(idx) => {
                let entry = &mut self.entries[idx].1;
                *entry = (*entry).max(multiplicity);
            }
            Err(idx) => self.entries.insert(idx, (knot, multiplicity)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, usize)> + '_ {
        self.entries.iter().copied()
    }

    pub fn knots(&self) -> Vec<f64> {
        self.entries.iter().map(|&(k, _)| k).collect()
    }

    pub fn first(&self) -> Option<(f64, usize)> {
        self.entries.first().copied()
    }

    pub fn last(&self) -> Option<(f64, usize)> {
        self.entries.last().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all multiplicities.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|&(_, m)| m).sum()
    }

    /// The map without its first and last distinct knot.
    pub fn internal(&self) -> Self {
        if self.entries.len() <= 2 {
            return Self::new();
        }
        Self {
            entries: self.entries[1..self.entries.len() - 1].to_vec(),
        }
    }
}

impl FromIterator<(f64, usize)> for KnotMultiplicityMap {
    fn from_iter<I: IntoIterator<Item = (f64, usize)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (knot, multiplicity) in iter {
            map.insert_max(knot, multiplicity);
        }
        map
    }
}

pub fn knot_multiplicity_map(knots: &[f64]) -> KnotMultiplicityMap {
    KnotMultiplicityMap::from_knots(knots)
}

/// Multiplicities of the knots strictly between the first and last distinct
/// knot. Empty when the vector has two or fewer distinct knots.
pub fn internal_knot_multiplicity_map(knots: &[f64]) -> KnotMultiplicityMap {
    knot_multiplicity_map(knots).internal()
}
