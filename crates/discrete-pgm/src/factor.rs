//! Factor representation: a named, multi-axis table of nonnegative weights.
//!
//! A factor φ(X₁, ..., Xₖ) stores one dense `ArrayD<f64>` whose axis `i`
//! belongs to variable `Xᵢ`. The canonical enumeration of index tuples is
//! row-major: the first axis varies slowest, the last axis fastest. That is
//! also the order expected by [`Factor::set_all`] and used by sampling.

use std::collections::HashSet;
use std::fmt;

use scirs2_core::ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use crate::error::{PgmError, Result};

/// A factor in a discrete probabilistic graphical model.
///
/// Deserialization runs the same checks as [`Factor::from_array`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FactorData")]
pub struct Factor {
    variables: Vec<String>,
    values: ArrayD<f64>,
}

/// Unchecked wire form of a [`Factor`].
#[derive(Deserialize)]
struct FactorData {
    variables: Vec<String>,
    values: ArrayD<f64>,
}

impl TryFrom<FactorData> for Factor {
    type Error = PgmError;

    fn try_from(data: FactorData) -> Result<Self> {
        Factor::from_array(data.variables, data.values)
    }
}

impl Factor {
    /// Create a zero-filled factor over `names` with the given cardinalities.
    pub fn new<I, S>(names: I, cardinalities: &[usize]) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let variables: Vec<String> = names.into_iter().map(Into::into).collect();
        if variables.len() != cardinalities.len() {
            return Err(PgmError::DimensionMismatch {
                expected: variables.len(),
                got: cardinalities.len(),
            });
        }
        check_axes(&variables, cardinalities)?;

        Ok(Self {
            variables,
            values: ArrayD::zeros(IxDyn(cardinalities)),
        })
    }

    /// Create a factor and populate it in canonical order.
    pub fn from_values<I, S>(names: I, cardinalities: &[usize], values: Vec<f64>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut factor = Self::new(names, cardinalities)?;
        factor.set_all(values)?;
        Ok(factor)
    }

    /// Wrap an existing table; its rank must equal the number of names.
    pub fn from_array<I, S>(names: I, values: ArrayD<f64>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let variables: Vec<String> = names.into_iter().map(Into::into).collect();
        if values.ndim() != variables.len() {
            return Err(PgmError::DimensionMismatch {
                expected: variables.len(),
                got: values.ndim(),
            });
        }
        check_axes(&variables, values.shape())?;

        Ok(Self { variables, values })
    }

    /// Internal constructor for results of the algebra, whose axes are
    /// already known to be valid.
    pub(crate) fn from_parts(variables: Vec<String>, values: ArrayD<f64>) -> Self {
        debug_assert_eq!(variables.len(), values.ndim());
        Self { variables, values }
    }

    /// A factor with the same axes and every entry set to zero.
    pub fn zeros_like(&self) -> Self {
        Self {
            variables: self.variables.clone(),
            values: ArrayD::zeros(self.values.raw_dim()),
        }
    }

    /// Axis names, in axis order.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// The underlying table.
    pub fn values(&self) -> &ArrayD<f64> {
        &self.values
    }

    /// Per-axis cardinalities, in axis order.
    pub fn cardinalities(&self) -> &[usize] {
        self.values.shape()
    }

    /// Number of axes.
    pub fn ndim(&self) -> usize {
        self.variables.len()
    }

    /// Number of cells in the table.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the table has no cells. Never true for a validly built factor.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Position of `var` among the axes.
    pub fn axis_index(&self, var: &str) -> Option<usize> {
        self.variables.iter().position(|v| v == var)
    }

    /// Whether `var` is one of the axes.
    pub fn contains(&self, var: &str) -> bool {
        self.axis_index(var).is_some()
    }

    /// Cardinality of a variable.
    pub fn cardinality(&self, var: &str) -> Option<usize> {
        self.axis_index(var).map(|idx| self.values.shape()[idx])
    }

    /// Sum of every entry.
    pub fn total(&self) -> f64 {
        self.values.sum()
    }

    /// Read the entry at a full index tuple.
    pub fn get(&self, index: &[usize]) -> Result<f64> {
        self.check_index(index)?;
        Ok(self.values[index])
    }

    /// Write the entry at a full index tuple.
    pub fn set(&mut self, index: &[usize], value: f64) -> Result<()> {
        self.check_index(index)?;
        self.values[index] = value;
        Ok(())
    }

    /// Replace every entry from a flat sequence in canonical order.
    pub fn set_all(&mut self, values: Vec<f64>) -> Result<()> {
        if values.len() != self.values.len() {
            return Err(PgmError::SizeMismatch {
                expected: self.values.len(),
                got: values.len(),
            });
        }
        self.values = ArrayD::from_shape_vec(self.values.raw_dim(), values)?;
        Ok(())
    }

    /// The table flattened in canonical order.
    pub fn flat_values(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    /// Every index tuple of the table in canonical order.
    pub fn index_tuples(&self) -> IndexTuples {
        IndexTuples::new(self.values.shape().to_vec())
    }

    /// Reorder the axes. `order` must be a permutation of the axis names.
    pub fn permute<S: AsRef<str>>(&self, order: &[S]) -> Result<Factor> {
        if order.len() != self.variables.len() {
            return Err(PgmError::DimensionMismatch {
                expected: self.variables.len(),
                got: order.len(),
            });
        }

        let mut seen = HashSet::new();
        let mut axes = Vec::with_capacity(order.len());
        for name in order {
            let name = name.as_ref();
            if !seen.insert(name) {
                return Err(PgmError::DuplicateVariable(name.to_string()));
            }
            let idx = self
                .axis_index(name)
                .ok_or_else(|| PgmError::VariableNotFound(name.to_string()))?;
            axes.push(idx);
        }

        let values = self
            .values
            .clone()
            .permuted_axes(IxDyn(&axes))
            .as_standard_layout()
            .into_owned();
        let variables = axes.iter().map(|&i| self.variables[i].clone()).collect();

        Ok(Factor { variables, values })
    }

    fn check_index(&self, index: &[usize]) -> Result<()> {
        if index.len() != self.variables.len() {
            return Err(PgmError::DimensionMismatch {
                expected: self.variables.len(),
                got: index.len(),
            });
        }
        for ((var, &value), &card) in self
            .variables
            .iter()
            .zip(index)
            .zip(self.values.shape())
        {
            if value >= card {
                return Err(PgmError::IndexOutOfRange {
                    variable: var.clone(),
                    value,
                    cardinality: card,
                });
            }
        }
        Ok(())
    }
}

fn check_axes(variables: &[String], cardinalities: &[usize]) -> Result<()> {
    let mut seen = HashSet::new();
    for (var, &card) in variables.iter().zip(cardinalities) {
        if !seen.insert(var.as_str()) {
            return Err(PgmError::DuplicateVariable(var.clone()));
        }
        if card == 0 {
            return Err(PgmError::InvalidCardinality {
                variable: var.clone(),
                cardinality: card,
            });
        }
    }
    Ok(())
}

/// Row-major iterator over every index tuple of a table shape.
#[derive(Debug, Clone)]
pub struct IndexTuples {
    shape: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl IndexTuples {
    /// Enumerate the index tuples of `shape`.
    pub fn new(shape: Vec<usize>) -> Self {
        let next = if shape.contains(&0) {
            None
        } else {
            Some(vec![0; shape.len()])
        };
        Self { shape, next }
    }
}

impl Iterator for IndexTuples {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;

        let mut successor = current.clone();
        for axis in (0..successor.len()).rev() {
            successor[axis] += 1;
            if successor[axis] < self.shape[axis] {
                self.next = Some(successor);
                break;
            }
            successor[axis] = 0;
        }

        Some(current)
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths: Vec<usize> = self.variables.iter().map(|v| v.len() + 2).collect();

        for (var, &width) in self.variables.iter().zip(&widths) {
            write!(f, "{:<width$}", var, width = width)?;
        }
        writeln!(f, "Values (10 dp)")?;

        for (index, &value) in self.index_tuples().zip(self.values.iter()) {
            for (&i, &width) in index.iter().zip(&widths) {
                write!(f, "{:<width$}", i, width = width)?;
            }
            // Debug keeps the decimal point on integral values
            writeln!(f, "{:?}", (value * 1e10).round() / 1e10)?;
        }
        Ok(())
    }
}
