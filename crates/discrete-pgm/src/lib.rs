//! Discrete probabilistic graphical models over named factor tables.
//!
//! This crate provides the factor algebra underlying discrete PGMs together
//! with exact and sampling-based inference built on it.
//!
//! # Core Concepts
//!
//! - **Factors**: non-negative tables over named, finite-cardinality variables
//! - **Algebra**: product, marginalization, conditioning, restriction, sampling
//! - **Exact inference**: sum-product variable elimination with a caller-chosen order
//! - **Approximate inference**: ancestral sampling, likelihood weighting, Gibbs sampling
//!
//! # Architecture
//!
//! ```text
//! Factor ──► algebra ──► VariableElimination ──► posterior Factor
//!    │                         ▲
//!    └──► validation ──────────┤
//!                              ▼
//!                          sampling ──► Sample / WeightedSample / GibbsTrace
//! ```
//!
//! # Example
//!
//! ```
//! use discrete_pgm::{Evidence, Factor, VariableElimination};
//!
//! let p_a = Factor::from_values(["A"], &[2], vec![0.6, 0.4]).unwrap();
//! let p_b_given_a = Factor::from_values(["B", "A"], &[2, 2], vec![0.9, 0.2, 0.1, 0.8]).unwrap();
//!
//! let ve = VariableElimination::new(["A"]);
//! let p_b = ve.query(&[p_a, p_b_given_a], &Evidence::none()).unwrap();
//! assert!((p_b.get(&[1]).unwrap() - 0.38).abs() < 1e-12);
//! ```

mod algebra;
mod config;
mod error;
mod evidence;
mod factor;
mod sampling;
mod validation;
mod variable_elimination;

pub use algebra::{multiple_factor_product, Axes, Reduced};
pub use config::{EliminationConfig, SamplingConfig};
pub use error::{PgmError, Result};
pub use evidence::{Assignment, Evidence};
pub use factor::{Factor, IndexTuples};
pub use sampling::{
    ancestral_sample, effective_sample_size, gibbs_sample, likelihood_weighted_sample,
    weighted_marginal, GibbsChain, GibbsTrace, Sample, Sampler, WeightedSample,
};
pub use validation::{
    model_cardinalities, validate_directed, validate_elimination, validate_evidence,
};
pub use variable_elimination::{
    full_joint_elimination, sum_product_variable_elimination, VariableElimination,
};
