//! Configuration for inference queries and samplers.
//!
//! Both configurations are plain serde-serializable structs so that
//! surrounding tooling can load them from JSON or TOML.

use scirs2_core::random::{thread_rng, SeedableRng, StdRng};
use serde::{Deserialize, Serialize};

/// Configuration for sampling-based inference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Seed for reproducibility (fresh entropy when `None`)
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SamplingConfig {
    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the random number generator described by this configuration.
    pub fn rng(&self) -> StdRng {
        if let Some(seed) = self.seed {
            StdRng::seed_from_u64(seed)
        } else {
            StdRng::from_rng(&mut thread_rng())
        }
    }
}

/// Configuration for variable elimination queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EliminationConfig {
    /// Check evidence names and the elimination order before running
    #[serde(default = "default_validate_order")]
    pub validate_order: bool,
    /// Variables the caller expects in the answer.
    ///
    /// When set, every model variable must be observed, eliminated or
    /// queried, otherwise the query fails with `IncompleteElimination`.
    #[serde(default)]
    pub query: Option<Vec<String>>,
}

fn default_validate_order() -> bool {
    true
}

impl Default for EliminationConfig {
    fn default() -> Self {
        Self {
            validate_order: default_validate_order(),
            query: None,
        }
    }
}

impl EliminationConfig {
    /// Declare the expected query variables.
    pub fn with_query<I, S>(mut self, query: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query = Some(query.into_iter().map(Into::into).collect());
        self
    }

    /// Skip the order validation pass.
    pub fn unchecked(mut self) -> Self {
        self.validate_order = false;
        self
    }
}
