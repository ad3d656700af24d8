//! Factor algebra: product, marginalization, conditioning, restriction and
//! sampling.
//!
//! Every operation is value-producing: inputs are never mutated and a new
//! [`Factor`] (or a bare scalar wrapped in [`Reduced`]) is returned.
//!
//! ```text
//! φ₁(X, Y) * φ₂(Y, Z) = φ(X, Y, Z)          product
//! ∑_Y φ(X, Y)         = φ(X)                marginalize
//! φ(X | Y)            = φ(X, Y) / ∑_X φ     condition
//! φ(X, Y = y)         = φ(X)                restrict_by_value
//! ```

use std::collections::BTreeSet;

use scirs2_core::ndarray::{ArrayD, Axis, IxDyn};
use scirs2_core::random::Rng;

use crate::error::{PgmError, Result};
use crate::factor::{Factor, IndexTuples};

/// Selection of axes an operation applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Axes {
    /// No axis
    None,
    /// Every axis of the factor
    All,
    /// The named subset
    Named(Vec<String>),
}

impl Axes {
    /// Select the given axis names.
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Axes::Named(names.into_iter().map(Into::into).collect())
    }
}

/// Result of an operation that may remove every axis of a factor.
#[derive(Debug, Clone, PartialEq)]
pub enum Reduced {
    /// All axes were consumed; only a probability mass remains
    Scalar(f64),
    /// Some axes remain
    Table(Factor),
}

impl Reduced {
    /// The remaining factor, if any axis is left.
    pub fn into_factor(self) -> Option<Factor> {
        match self {
            Reduced::Table(factor) => Some(factor),
            Reduced::Scalar(_) => None,
        }
    }

    /// The scalar mass, if every axis was consumed.
    pub fn scalar(&self) -> Option<f64> {
        match self {
            Reduced::Scalar(value) => Some(*value),
            Reduced::Table(_) => None,
        }
    }

    /// Total mass: the scalar itself, or the sum of the remaining table.
    pub fn total(&self) -> f64 {
        match self {
            Reduced::Scalar(value) => *value,
            Reduced::Table(factor) => factor.total(),
        }
    }

    /// Multiply the mass by a constant.
    pub fn scale(self, by: f64) -> Reduced {
        match self {
            Reduced::Scalar(value) => Reduced::Scalar(value * by),
            Reduced::Table(factor) => {
                let values = factor.values() * by;
                Reduced::Table(Factor::from_parts(factor.variables().to_vec(), values))
            }
        }
    }
}

impl Factor {
    /// Compute the product of two factors.
    ///
    /// The result has this factor's axes in order, followed by the axes of
    /// `other` not already present. Shared variables are aligned by name and
    /// must have equal cardinalities.
    pub fn product(&self, other: &Factor) -> Result<Factor> {
        let mut variables = self.variables().to_vec();
        let mut shape = self.cardinalities().to_vec();

        // Position of each axis of `other` within the result
        let mut other_axes = Vec::with_capacity(other.ndim());
        for (var, &card) in other.variables().iter().zip(other.cardinalities()) {
            match self.axis_index(var) {
                Some(idx) => {
                    if shape[idx] != card {
                        return Err(PgmError::CardinalityConflict {
                            variable: var.clone(),
                            left: shape[idx],
                            right: card,
                        });
                    }
                    other_axes.push(idx);
                }
                None => {
                    other_axes.push(variables.len());
                    variables.push(var.clone());
                    shape.push(card);
                }
            }
        }

        let rank = self.ndim();
        let mut other_index = vec![0; other.ndim()];
        let values: Vec<f64> = IndexTuples::new(shape.clone())
            .map(|index| {
                for (slot, &pos) in other_index.iter_mut().zip(&other_axes) {
                    *slot = index[pos];
                }
                self.values()[&index[..rank]] * other.values()[other_index.as_slice()]
            })
            .collect();

        let values = ArrayD::from_shape_vec(IxDyn(&shape), values)?;
        Ok(Factor::from_parts(variables, values))
    }

    /// Sum out the selected axes.
    ///
    /// Summing out every axis yields [`Reduced::Scalar`] holding the grand
    /// total; selecting no axis returns the factor unchanged.
    pub fn marginalize(&self, axes: &Axes) -> Result<Reduced> {
        let positions = match axes {
            Axes::None => return Ok(Reduced::Table(self.clone())),
            Axes::All => return Ok(Reduced::Scalar(self.total())),
            Axes::Named(names) => self.axis_positions(names)?,
        };

        if positions.is_empty() {
            return Ok(Reduced::Table(self.clone()));
        }
        if positions.len() == self.ndim() {
            return Ok(Reduced::Scalar(self.total()));
        }

        let mut values = self.values().clone();
        for &axis in positions.iter().rev() {
            values = values.sum_axis(Axis(axis));
        }
        let variables = self.variables_without(&positions);

        Ok(Reduced::Table(Factor::from_parts(variables, values)))
    }

    /// Normalize the table.
    ///
    /// With [`Axes::None`] (or an empty name list) the whole table is divided
    /// by its grand total. Otherwise every slice obtained by fixing the
    /// selected axes is normalized independently over the remaining axes,
    /// giving φ(rest | selected). Zero mass yields NaN entries; use
    /// [`Factor::sample`] where a guard is needed.
    pub fn condition(&self, axes: &Axes) -> Result<Factor> {
        let keep: BTreeSet<usize> = match axes {
            Axes::None => BTreeSet::new(),
            Axes::All => (0..self.ndim()).collect(),
            Axes::Named(names) => self.axis_positions(names)?,
        };

        if keep.is_empty() {
            let values = self.values() / self.total();
            return Ok(Factor::from_parts(self.variables().to_vec(), values));
        }

        let summed: Vec<usize> = (0..self.ndim()).filter(|i| !keep.contains(i)).collect();

        let mut norm = self.values().clone();
        for &axis in summed.iter().rev() {
            norm = norm.sum_axis(Axis(axis));
        }
        // Re-insert the summed axes with length one so the sums broadcast
        for &axis in &summed {
            norm = norm.insert_axis(Axis(axis));
        }

        let values = self.values() / &norm;
        Ok(Factor::from_parts(self.variables().to_vec(), values))
    }

    /// Fix the named axes to the given values and drop them.
    ///
    /// Names and values are paired positionally. Restricting every axis
    /// yields [`Reduced::Scalar`] holding the selected cell.
    pub fn restrict_by_value<S: AsRef<str>>(&self, names: &[S], values: &[usize]) -> Result<Reduced> {
        if names.len() != values.len() {
            return Err(PgmError::DimensionMismatch {
                expected: names.len(),
                got: values.len(),
            });
        }
        if names.is_empty() {
            return Ok(Reduced::Table(self.clone()));
        }

        let mut fixed: Vec<Option<usize>> = vec![None; self.ndim()];
        for (name, &value) in names.iter().zip(values) {
            let name = name.as_ref();
            let idx = self
                .axis_index(name)
                .ok_or_else(|| PgmError::VariableNotFound(name.to_string()))?;
            if fixed[idx].is_some() {
                return Err(PgmError::DuplicateVariable(name.to_string()));
            }
            let card = self.cardinalities()[idx];
            if value >= card {
                return Err(PgmError::IndexOutOfRange {
                    variable: name.to_string(),
                    value,
                    cardinality: card,
                });
            }
            fixed[idx] = Some(value);
        }

        if fixed.iter().all(Option::is_some) {
            let index: Vec<usize> = fixed.into_iter().flatten().collect();
            return Ok(Reduced::Scalar(self.values()[index.as_slice()]));
        }

        let mut table = self.values().clone();
        for (axis, value) in fixed.iter().enumerate().rev() {
            if let Some(value) = value {
                table = table.index_axis_move(Axis(axis), *value);
            }
        }
        let variables = self
            .variables()
            .iter()
            .zip(&fixed)
            .filter(|(_, value)| value.is_none())
            .map(|(var, _)| var.clone())
            .collect();

        Ok(Reduced::Table(Factor::from_parts(variables, table)))
    }

    /// Restrict by the pairs whose name is an axis of this factor, ignoring
    /// the rest.
    ///
    /// This is how global evidence is applied to each factor of a model.
    pub fn restrict_present<S: AsRef<str>>(&self, names: &[S], values: &[usize]) -> Result<Reduced> {
        if names.len() != values.len() {
            return Err(PgmError::DimensionMismatch {
                expected: names.len(),
                got: values.len(),
            });
        }
        let (present, present_values): (Vec<&str>, Vec<usize>) = names
            .iter()
            .map(|name| name.as_ref())
            .zip(values.iter().copied())
            .filter(|(name, _)| self.contains(name))
            .unzip();

        self.restrict_by_value(present.as_slice(), present_values.as_slice())
    }

    /// Draw `count` index tuples independently, with replacement, weighted by
    /// the table entries.
    ///
    /// The table is normalized internally, so it need not sum to one.
    pub fn sample<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Result<Vec<Vec<usize>>> {
        let mut cumulative = Vec::with_capacity(self.len());
        let mut total = 0.0;
        for &value in self.values().iter() {
            total += value;
            cumulative.push(total);
        }
        if !(total > 0.0 && total.is_finite()) {
            return Err(PgmError::DegenerateDistribution);
        }

        // Guard against u landing on the total through rounding
        let last = self
            .values()
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v > 0.0)
            .map(|(i, _)| i)
            .last()
            .ok_or(PgmError::DegenerateDistribution)?;

        let shape = self.cardinalities();
        let draws = (0..count)
            .map(|_| {
                let u = rng.random::<f64>() * total;
                let flat = cumulative.partition_point(|&c| c <= u).min(last);
                unravel(flat, shape)
            })
            .collect();

        Ok(draws)
    }

    /// Sorted, de-duplicated axis positions of `names`.
    fn axis_positions(&self, names: &[String]) -> Result<BTreeSet<usize>> {
        names
            .iter()
            .map(|name| {
                self.axis_index(name)
                    .ok_or_else(|| PgmError::VariableNotFound(name.clone()))
            })
            .collect()
    }

    fn variables_without(&self, positions: &BTreeSet<usize>) -> Vec<String> {
        self.variables()
            .iter()
            .enumerate()
            .filter(|(i, _)| !positions.contains(i))
            .map(|(_, var)| var.clone())
            .collect()
    }
}

/// Multiply a list of factors left to right.
///
/// A single factor is returned unchanged.
pub fn multiple_factor_product<'a, I>(factors: I) -> Result<Factor>
where
    I: IntoIterator<Item = &'a Factor>,
{
    let mut iter = factors.into_iter();
    let first = iter
        .next()
        .ok_or_else(|| PgmError::InvalidModel("No factors to multiply".to_string()))?;

    iter.try_fold(first.clone(), |acc, factor| acc.product(factor))
}

/// Convert a row-major flat position into an index tuple.
fn unravel(mut flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut index = vec![0; shape.len()];
    for (slot, &dim) in index.iter_mut().zip(shape).rev() {
        *slot = flat % dim;
        flat /= dim;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use scirs2_core::random::{SeedableRng, StdRng};

    fn xy() -> Factor {
        Factor::from_values(["x", "y"], &[2, 2], vec![0.1, 0.2, 0.3, 0.4]).unwrap()
    }

    #[test]
    fn test_factor_product_disjoint() {
        // φ₁(X) and φ₂(Y) → φ(X,Y)
        let f1 = Factor::from_values(["x"], &[2], vec![0.6, 0.4]).unwrap();
        let f2 = Factor::from_values(["y"], &[2], vec![0.7, 0.3]).unwrap();

        let product = f1.product(&f2).unwrap();
        assert_eq!(product.variables(), &["x".to_string(), "y".to_string()]);
        assert_abs_diff_eq!(product.get(&[0, 0]).unwrap(), 0.6 * 0.7, epsilon = 1e-12);
        assert_abs_diff_eq!(product.get(&[0, 1]).unwrap(), 0.6 * 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(product.get(&[1, 0]).unwrap(), 0.4 * 0.7, epsilon = 1e-12);
        assert_abs_diff_eq!(product.get(&[1, 1]).unwrap(), 0.4 * 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_factor_product_with_shared_vars() {
        // φ₁(X,Y) and φ₂(Z,Y) → φ(X,Y,Z)
        let f1 = xy();
        let f2 =
            Factor::from_values(["z", "y"], &[3, 2], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();

        let product = f1.product(&f2).unwrap();
        assert_eq!(
            product.variables(),
            &["x".to_string(), "y".to_string(), "z".to_string()]
        );
        assert_eq!(product.cardinalities(), &[2, 2, 3]);
        for x in 0..2 {
            for y in 0..2 {
                for z in 0..3 {
                    let expected = f1.get(&[x, y]).unwrap() * f2.get(&[z, y]).unwrap();
                    assert_abs_diff_eq!(
                        product.get(&[x, y, z]).unwrap(),
                        expected,
                        epsilon = 1e-12
                    );
                }
            }
        }
    }

    #[test]
    fn test_factor_product_cardinality_conflict() {
        let f1 = xy();
        let f2 = Factor::new(["y"], &[3]).unwrap();
        assert_eq!(
            f1.product(&f2).unwrap_err(),
            PgmError::CardinalityConflict {
                variable: "y".to_string(),
                left: 2,
                right: 3
            }
        );
    }

    #[test]
    fn test_multiple_factor_product() {
        let single = vec![xy()];
        assert_eq!(multiple_factor_product(&single).unwrap(), xy());

        let f3 = Factor::from_values(["z"], &[2], vec![0.5, 2.0]).unwrap();
        let list = vec![xy(), f3.clone()];
        let product = multiple_factor_product(&list).unwrap();
        assert_eq!(product, xy().product(&f3).unwrap());

        let empty: Vec<Factor> = Vec::new();
        assert!(multiple_factor_product(&empty).is_err());
    }

    #[test]
    fn test_factor_marginalize() {
        // φ(X,Y) → φ(X)
        let marginal = xy()
            .marginalize(&Axes::named(["y"]))
            .unwrap()
            .into_factor()
            .unwrap();
        assert_eq!(marginal.variables(), &["x".to_string()]);
        // Sum over Y: [0.1+0.2, 0.3+0.4] = [0.3, 0.7]
        assert_abs_diff_eq!(marginal.get(&[0]).unwrap(), 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(marginal.get(&[1]).unwrap(), 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_marginalize_identity_and_scalar() {
        let f = xy();
        assert_eq!(f.marginalize(&Axes::None).unwrap(), Reduced::Table(f.clone()));
        assert_eq!(
            f.marginalize(&Axes::Named(Vec::new())).unwrap(),
            Reduced::Table(f.clone())
        );

        let total = f.marginalize(&Axes::named(["x", "y"])).unwrap();
        assert_abs_diff_eq!(total.scalar().unwrap(), 1.0, epsilon = 1e-12);
        let total = f.marginalize(&Axes::All).unwrap();
        assert_abs_diff_eq!(total.scalar().unwrap(), 1.0, epsilon = 1e-12);

        assert_eq!(
            f.marginalize(&Axes::named(["w"])).unwrap_err(),
            PgmError::VariableNotFound("w".to_string())
        );
    }

    #[test]
    fn test_condition_global() {
        let f = Factor::from_values(["x", "y"], &[2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let normalized = f.condition(&Axes::None).unwrap();
        assert_abs_diff_eq!(normalized.total(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalized.get(&[1, 1]).unwrap(), 0.4, epsilon = 1e-12);
        // Input untouched
        assert_abs_diff_eq!(f.total(), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_condition_per_slice() {
        // φ(Y | X): each row sums to one
        let f = Factor::from_values(["x", "y"], &[2, 2], vec![1.0, 3.0, 2.0, 2.0]).unwrap();
        let conditional = f.condition(&Axes::named(["x"])).unwrap();
        assert_abs_diff_eq!(conditional.get(&[0, 0]).unwrap(), 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(conditional.get(&[0, 1]).unwrap(), 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(conditional.get(&[1, 0]).unwrap(), 0.5, epsilon = 1e-12);

        // φ(X | Y): each column sums to one
        let conditional = f.condition(&Axes::named(["y"])).unwrap();
        assert_abs_diff_eq!(conditional.get(&[0, 0]).unwrap(), 1.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(conditional.get(&[1, 1]).unwrap(), 0.4, epsilon = 1e-12);

        assert!(f.condition(&Axes::named(["w"])).is_err());
    }

    #[test]
    fn test_condition_three_axes() {
        let values: Vec<f64> = (1..=12).map(|i| i as f64).collect();
        let f = Factor::from_values(["a", "b", "c"], &[2, 3, 2], values).unwrap();
        let conditional = f.condition(&Axes::named(["c", "a"])).unwrap();
        for a in 0..2 {
            for c in 0..2 {
                let slice: f64 = (0..3).map(|b| conditional.get(&[a, b, c]).unwrap()).sum();
                assert_abs_diff_eq!(slice, 1.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_condition_zero_mass_is_nan() {
        let f = Factor::new(["x"], &[2]).unwrap();
        let normalized = f.condition(&Axes::None).unwrap();
        assert!(normalized.get(&[0]).unwrap().is_nan());
    }

    #[test]
    fn test_condition_on_every_axis() {
        let f = Factor::from_values(["x", "y"], &[2, 2], vec![0.1, 0.0, 3.0, 0.4]).unwrap();
        let conditioned = f.condition(&Axes::All).unwrap();
        assert_eq!(conditioned.variables(), f.variables());
        assert_abs_diff_eq!(conditioned.get(&[0, 0]).unwrap(), 1.0);
        assert_abs_diff_eq!(conditioned.get(&[1, 0]).unwrap(), 1.0);
        assert_abs_diff_eq!(conditioned.get(&[1, 1]).unwrap(), 1.0);
        assert!(conditioned.get(&[0, 1]).unwrap().is_nan());

        // No axis to keep: falls back to global normalization
        let constant = Factor::from_values(Vec::<String>::new(), &[], vec![4.0]).unwrap();
        let normalized = constant.condition(&Axes::All).unwrap();
        assert_eq!(normalized.ndim(), 0);
        assert_abs_diff_eq!(normalized.get(&[]).unwrap(), 1.0);
    }

    #[test]
    fn test_factor_restrict() {
        // φ(X,Y) with evidence Y=1 → φ(X)
        let reduced = xy()
            .restrict_by_value(&["y"], &[1])
            .unwrap()
            .into_factor()
            .unwrap();
        assert_eq!(reduced.variables(), &["x".to_string()]);
        assert_abs_diff_eq!(reduced.get(&[0]).unwrap(), 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(reduced.get(&[1]).unwrap(), 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_restrict_edge_cases() {
        let f = xy();
        let none: [&str; 0] = [];
        assert_eq!(f.restrict_by_value(&none, &[]).unwrap(), Reduced::Table(f.clone()));

        // Positional pairing, names in any order
        let cell = f.restrict_by_value(&["y", "x"], &[0, 1]).unwrap();
        assert_eq!(cell, Reduced::Scalar(0.3));

        assert_eq!(
            f.restrict_by_value(&["w"], &[0]).unwrap_err(),
            PgmError::VariableNotFound("w".to_string())
        );
        assert!(matches!(
            f.restrict_by_value(&["x"], &[2]),
            Err(PgmError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            f.restrict_by_value(&["x"], &[0, 1]),
            Err(PgmError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_restrict_present_ignores_foreign_names() {
        let f = xy();
        let reduced = f.restrict_present(&["w", "x"], &[5, 1]).unwrap();
        let reduced = reduced.into_factor().unwrap();
        assert_eq!(reduced.variables(), &["y".to_string()]);
        assert_abs_diff_eq!(reduced.get(&[1]).unwrap(), 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_sample_bernoulli_frequency() {
        let f = Factor::from_values(["a"], &[2], vec![0.25, 0.75]).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let draws = f.sample(10_000, &mut rng).unwrap();
        assert_eq!(draws.len(), 10_000);
        let ones = draws.iter().filter(|d| d[0] == 1).count() as f64;
        assert!((ones / 10_000.0 - 0.75).abs() < 0.05);
    }

    #[test]
    fn test_sample_unnormalized_and_zero_cells() {
        let f = Factor::from_values(["a", "b"], &[2, 2], vec![0.0, 3.0, 0.0, 1.0]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let draws = f.sample(2_000, &mut rng).unwrap();
        assert!(draws.iter().all(|d| d[1] == 1));
        let first = draws.iter().filter(|d| d[0] == 0).count() as f64 / 2_000.0;
        assert!((first - 0.75).abs() < 0.05);
    }

    #[test]
    fn test_sample_degenerate() {
        let f = Factor::new(["a"], &[3]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            f.sample(1, &mut rng).unwrap_err(),
            PgmError::DegenerateDistribution
        );
    }

    #[test]
    fn test_unravel() {
        assert_eq!(unravel(0, &[2, 3]), vec![0, 0]);
        assert_eq!(unravel(4, &[2, 3]), vec![1, 1]);
        assert_eq!(unravel(5, &[2, 1, 3]), vec![1, 0, 2]);
    }

    #[test]
    fn test_reduced_scale() {
        let scaled = Reduced::Table(xy()).scale(2.0);
        assert_abs_diff_eq!(scaled.total(), 2.0, epsilon = 1e-12);
        assert_eq!(Reduced::Scalar(0.5).scale(4.0), Reduced::Scalar(2.0));
    }
}
