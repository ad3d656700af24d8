//! Observed variable values.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{PgmError, Result};

/// Assignment of values to variables.
pub type Assignment = HashMap<String, usize>;

/// Ordered evidence: observed variable names paired with their values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    names: Vec<String>,
    values: Vec<usize>,
}

impl Evidence {
    /// Pair names with values positionally.
    pub fn new<I, S>(names: I, values: Vec<usize>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.len() != values.len() {
            return Err(PgmError::DimensionMismatch {
                expected: names.len(),
                got: values.len(),
            });
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(PgmError::DuplicateVariable(name.clone()));
            }
        }
        Ok(Self { names, values })
    }

    /// No observations.
    pub fn none() -> Self {
        Self::default()
    }

    /// Add one observation.
    pub fn observe(mut self, name: impl Into<String>, value: usize) -> Result<Self> {
        let name = name.into();
        if self.contains(&name) {
            return Err(PgmError::DuplicateVariable(name));
        }
        self.names.push(name);
        self.values.push(value);
        Ok(self)
    }

    /// Observed names, in insertion order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Observed values, aligned with [`Evidence::names`].
    pub fn values(&self) -> &[usize] {
        &self.values
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether nothing is observed.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Whether `name` is observed.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Observed value of `name`.
    pub fn get(&self, name: &str) -> Option<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx])
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// Unordered view of the observations.
    pub fn to_assignment(&self) -> Assignment {
        self.iter().map(|(n, v)| (n.to_string(), v)).collect()
    }
}
