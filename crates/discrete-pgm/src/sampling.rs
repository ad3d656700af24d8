//! Sampling-based inference for discrete PGMs.
//!
//! # Algorithms
//!
//! - **Ancestral sampling**: draws every variable from its conditional once
//!   its parents are assigned (directed models only)
//! - **Likelihood weighting**: ancestral sampling with observed variables
//!   clamped, weighted by the likelihood of the evidence
//! - **Gibbs sampling**: MCMC over the full conditionals obtained from each
//!   variable's Markov blanket factor
//!
//! Every algorithm takes the random number generator explicitly; use a seeded
//! `StdRng` (or [`Sampler`] with a seeded [`SamplingConfig`]) for
//! reproducible runs.

use std::collections::HashMap;

use scirs2_core::random::{Rng, StdRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::algebra::{multiple_factor_product, Axes, Reduced};
use crate::config::SamplingConfig;
use crate::error::{PgmError, Result};
use crate::evidence::{Assignment, Evidence};
use crate::factor::Factor;
use crate::validation::{model_cardinalities, validate_directed, validate_evidence};

/// One joint draw: variable names with their sampled values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Variable names, in the order they were resolved
    pub names: Vec<String>,
    /// Values aligned with `names`
    pub values: Vec<usize>,
}

impl Sample {
    /// Value of a variable in this draw.
    pub fn get(&self, name: &str) -> Option<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx])
    }

    /// Unordered view of the draw.
    pub fn to_assignment(&self) -> Assignment {
        self.names
            .iter()
            .cloned()
            .zip(self.values.iter().copied())
            .collect()
    }
}

/// Weighted sample for importance sampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedSample {
    /// The drawn assignment
    pub sample: Sample,
    /// The unnormalized importance weight
    pub weight: f64,
}

/// Draw one joint sample from a directed factorization.
///
/// Each factor owns its first axis; its remaining axes are parents. The
/// returned names follow the order in which variables were resolved, which
/// is a topological order of the model.
pub fn ancestral_sample<R: Rng + ?Sized>(factors: &[Factor], rng: &mut R) -> Result<Sample> {
    validate_directed(factors)?;
    let (sample, _) = topological_scan(factors, None, rng)?;
    Ok(sample)
}

/// Draw one likelihood-weighted sample.
///
/// Observed variables are clamped to their evidence value and the weight is
/// multiplied by their conditional probability under the partial assignment;
/// every other variable is sampled as in [`ancestral_sample`].
pub fn likelihood_weighted_sample<R: Rng + ?Sized>(
    factors: &[Factor],
    evidence: &Evidence,
    rng: &mut R,
) -> Result<WeightedSample> {
    validate_directed(factors)?;
    validate_evidence(&model_cardinalities(factors)?, evidence)?;
    let (sample, weight) = topological_scan(factors, Some(evidence), rng)?;
    Ok(WeightedSample { sample, weight })
}

/// Run `steps` Gibbs sweeps and return every visited state.
///
/// No burn-in or thinning is applied; see [`GibbsTrace::empirical_marginal`].
///
/// The initial state ignores the factor weights. With deterministic factors
/// it may have zero probability under the evidence, and a full conditional
/// can then be all zeros: the run fails with
/// [`PgmError::DegenerateDistribution`]. Retry with another generator state,
/// or drive a [`GibbsChain`] from a positive-mass state with
/// [`GibbsChain::sweep`].
pub fn gibbs_sample<R: Rng + ?Sized>(
    factors: &[Factor],
    evidence: &Evidence,
    steps: usize,
    rng: &mut R,
) -> Result<GibbsTrace> {
    let mut chain = GibbsChain::new(factors, evidence, rng)?;
    let mut states = Vec::with_capacity(steps);
    for _ in 0..steps {
        states.push(chain.step(rng)?);
    }
    debug!(steps, variables = chain.names().len(), "gibbs chain finished");

    Ok(GibbsTrace {
        names: chain.names().to_vec(),
        states,
    })
}

/// Resolve variables in passes: a factor is ready once every parent was
/// assigned before the pass started.
fn topological_scan<R: Rng + ?Sized>(
    factors: &[Factor],
    evidence: Option<&Evidence>,
    rng: &mut R,
) -> Result<(Sample, f64)> {
    let mut names: Vec<String> = Vec::with_capacity(factors.len());
    let mut values: Vec<usize> = Vec::with_capacity(factors.len());
    let mut weight = 1.0;
    let mut remaining: Vec<&Factor> = factors.iter().collect();
    let mut pass = 0;

    while !remaining.is_empty() {
        let (ready, waiting): (Vec<&Factor>, Vec<&Factor>) = remaining
            .into_iter()
            .partition(|f| f.variables()[1..].iter().all(|p| names.contains(p)));

        if ready.is_empty() {
            return Err(PgmError::InvalidModel(
                "no factor has all of its parents assigned".to_string(),
            ));
        }

        let mut new_names = Vec::with_capacity(ready.len());
        let mut new_values = Vec::with_capacity(ready.len());
        for factor in ready {
            let owned = &factor.variables()[0];
            let conditional = match factor.restrict_present(names.as_slice(), values.as_slice())? {
                Reduced::Table(table) => table,
                Reduced::Scalar(_) => {
                    return Err(PgmError::InvalidModel(format!(
                        "variable '{}' assigned twice",
                        owned
                    )))
                }
            };

            let value = match evidence.and_then(|e| e.get(owned)) {
                Some(observed) => {
                    let conditional = conditional.condition(&Axes::None)?;
                    weight *= conditional.get(&[observed])?;
                    observed
                }
                None => draw_one(&conditional, rng)?,
            };
            trace!(variable = %owned, value, "resolved variable");

            new_names.push(owned.clone());
            new_values.push(value);
        }

        names.extend(new_names);
        values.extend(new_values);
        remaining = waiting;
        pass += 1;
    }
    debug!(passes = pass, variables = names.len(), weight, "topological scan finished");

    Ok((Sample { names, values }, weight))
}

/// Draw a single value from a one-axis factor.
fn draw_one<R: Rng + ?Sized>(factor: &Factor, rng: &mut R) -> Result<usize> {
    factor
        .sample(1, rng)?
        .first()
        .and_then(|index| index.first().copied())
        .ok_or(PgmError::DegenerateDistribution)
}

/// State of a Gibbs sampler.
///
/// The chain owns its current assignment; [`GibbsChain::step`] computes a
/// complete new assignment from a snapshot and only then replaces the
/// current one, so callers never observe a partially updated state.
#[derive(Debug, Clone)]
pub struct GibbsChain {
    names: Vec<String>,
    positions: HashMap<String, usize>,
    blankets: Vec<Factor>,
    fixed: Vec<bool>,
    state: Vec<usize>,
}

impl GibbsChain {
    /// Build the Markov blanket factors and a uniform random initial state
    /// with the evidence pinned.
    ///
    /// Variables are scanned in lexicographic order of their names.
    pub fn new<R: Rng + ?Sized>(factors: &[Factor], evidence: &Evidence, rng: &mut R) -> Result<Self> {
        let cards = model_cardinalities(factors)?;
        validate_evidence(&cards, evidence)?;

        let names: Vec<String> = cards.keys().cloned().collect();
        let positions: HashMap<String, usize> = names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();

        let blankets = names
            .iter()
            .map(|name| multiple_factor_product(factors.iter().filter(|f| f.contains(name))))
            .collect::<Result<Vec<Factor>>>()?;

        let mut state: Vec<usize> = cards.values().map(|&card| rng.random_range(0..card)).collect();
        let mut fixed = vec![false; names.len()];
        for (name, value) in evidence.iter() {
            let idx = positions[name];
            state[idx] = value;
            fixed[idx] = true;
        }

        Ok(Self {
            names,
            positions,
            blankets,
            fixed,
            state,
        })
    }

    /// Variable names, in scan order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Copy of the current assignment, aligned with [`GibbsChain::names`].
    pub fn state(&self) -> Vec<usize> {
        self.state.clone()
    }

    /// The Markov blanket factor of a variable.
    pub fn blanket(&self, name: &str) -> Option<&Factor> {
        self.positions.get(name).map(|&idx| &self.blankets[idx])
    }

    /// Resample every unobserved variable once and return the new state.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Vec<usize>> {
        let next = self.sweep(&self.state, rng)?;
        self.state.clone_from(&next);
        Ok(next)
    }

    /// One full sweep starting from `state`, which is left untouched.
    ///
    /// Fails with [`PgmError::DegenerateDistribution`] when a full conditional
    /// has no mass under `state`.
    pub fn sweep<R: Rng + ?Sized>(&self, state: &[usize], rng: &mut R) -> Result<Vec<usize>> {
        if state.len() != self.names.len() {
            return Err(PgmError::DimensionMismatch {
                expected: self.names.len(),
                got: state.len(),
            });
        }

        let mut next = state.to_vec();
        for (idx, name) in self.names.iter().enumerate() {
            if self.fixed[idx] {
                continue;
            }

            let blanket = &self.blankets[idx];
            let (others, values): (Vec<&str>, Vec<usize>) = blanket
                .variables()
                .iter()
                .filter(|v| *v != name)
                .map(|v| (v.as_str(), next[self.positions[v]]))
                .unzip();

            let conditional = blanket
                .restrict_by_value(others.as_slice(), values.as_slice())?
                .into_factor()
                .ok_or_else(|| PgmError::VariableNotFound(name.clone()))?;
            next[idx] = draw_one(&conditional, rng)?;
        }

        Ok(next)
    }
}

/// States visited by a Gibbs chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GibbsTrace {
    /// Variable names, in scan order
    pub names: Vec<String>,
    /// One full assignment per step, aligned with `names`
    pub states: Vec<Vec<usize>>,
}

impl GibbsTrace {
    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether no step was recorded.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// The values of one variable across the chain.
    pub fn column(&self, name: &str) -> Result<Vec<usize>> {
        let idx = self
            .names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| PgmError::VariableNotFound(name.to_string()))?;
        Ok(self.states.iter().map(|state| state[idx]).collect())
    }

    /// Empirical marginal of a variable after discarding `burn_in` steps.
    pub fn empirical_marginal(&self, name: &str, cardinality: usize, burn_in: usize) -> Result<Factor> {
        let column = self.column(name)?;
        let kept = column.get(burn_in..).unwrap_or_default();
        if kept.is_empty() {
            return Err(PgmError::DegenerateDistribution);
        }

        let mut counts = Factor::new([name], &[cardinality])?;
        for &value in kept {
            let current = counts.get(&[value])?;
            counts.set(&[value], current + 1.0)?;
        }
        counts.condition(&Axes::None)
    }
}

/// Self-normalized importance estimate of a variable's marginal.
pub fn weighted_marginal(samples: &[WeightedSample], name: &str, cardinality: usize) -> Result<Factor> {
    let mut totals = Factor::new([name], &[cardinality])?;
    for weighted in samples {
        let value = weighted
            .sample
            .get(name)
            .ok_or_else(|| PgmError::VariableNotFound(name.to_string()))?;
        let current = totals.get(&[value])?;
        totals.set(&[value], current + weighted.weight)?;
    }

    let total = totals.total();
    if total.is_nan() || total <= 0.0 {
        return Err(PgmError::DegenerateDistribution);
    }
    totals.condition(&Axes::None)
}

/// Effective sample size of a set of importance weights.
///
/// Equal weights give the number of samples; a single dominant weight
/// gives one.
pub fn effective_sample_size(samples: &[WeightedSample]) -> f64 {
    let sum_w: f64 = samples.iter().map(|s| s.weight).sum();
    let sum_w2: f64 = samples.iter().map(|s| s.weight * s.weight).sum();

    if sum_w2 > 0.0 {
        (sum_w * sum_w) / sum_w2
    } else {
        0.0
    }
}

/// Sampling front end owning its random number generator.
#[derive(Debug, Clone)]
pub struct Sampler {
    rng: StdRng,
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(&SamplingConfig::default())
    }
}

impl Sampler {
    /// Create from a configuration.
    pub fn new(config: &SamplingConfig) -> Self {
        Self { rng: config.rng() }
    }

    /// Create with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self::new(&SamplingConfig::default().with_seed(seed))
    }

    /// Access the generator, e.g. for [`Factor::sample`].
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Draw `count` ancestral samples.
    pub fn ancestral(&mut self, factors: &[Factor], count: usize) -> Result<Vec<Sample>> {
        validate_directed(factors)?;
        (0..count)
            .map(|_| topological_scan(factors, None, &mut self.rng).map(|(sample, _)| sample))
            .collect()
    }

    /// Draw `count` likelihood-weighted samples.
    pub fn likelihood_weighted(
        &mut self,
        factors: &[Factor],
        evidence: &Evidence,
        count: usize,
    ) -> Result<Vec<WeightedSample>> {
        validate_directed(factors)?;
        validate_evidence(&model_cardinalities(factors)?, evidence)?;
        (0..count)
            .map(|_| {
                topological_scan(factors, Some(evidence), &mut self.rng)
                    .map(|(sample, weight)| WeightedSample { sample, weight })
            })
            .collect()
    }

    /// Run a Gibbs chain for `steps` sweeps.
    pub fn gibbs(&mut self, factors: &[Factor], evidence: &Evidence, steps: usize) -> Result<GibbsTrace> {
        gibbs_sample(factors, evidence, steps, &mut self.rng)
    }
}
