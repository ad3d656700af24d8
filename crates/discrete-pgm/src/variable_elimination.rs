//! Variable Elimination algorithm for exact inference.
//!
//! Evidence is applied to every factor first, then variables are summed out
//! one by one in the caller's order: the factors mentioning the variable are
//! multiplied together and the variable is marginalized out of the product.
//! What remains is multiplied into one table and normalized. Runtime and
//! intermediate table sizes depend entirely on the elimination order; no
//! ordering heuristic is applied.

use tracing::{debug, trace};

use crate::algebra::{multiple_factor_product, Axes, Reduced};
use crate::config::EliminationConfig;
use crate::error::{PgmError, Result};
use crate::evidence::Evidence;
use crate::factor::Factor;
use crate::validation::validate_elimination;

/// Variable elimination with a caller-supplied elimination order.
#[derive(Debug, Clone, Default)]
pub struct VariableElimination {
    /// Variables to sum out, in this exact sequence
    pub order: Vec<String>,
    /// Validation behaviour
    pub config: EliminationConfig,
}

impl VariableElimination {
    /// Create with a specific elimination order.
    pub fn new<I, S>(order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            order: order.into_iter().map(Into::into).collect(),
            config: EliminationConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: EliminationConfig) -> Self {
        self.config = config;
        self
    }

    /// Compute the normalized distribution over the variables that are
    /// neither observed nor eliminated, given the evidence.
    ///
    /// Factors fully instantiated by the evidence, and eliminated clusters
    /// that reduce to a constant, are dropped; the final normalization makes
    /// this harmless for the answer. Use
    /// [`VariableElimination::query_unnormalized`] to keep that mass.
    pub fn query(&self, factors: &[Factor], evidence: &Evidence) -> Result<Factor> {
        let (remaining, _) = self.eliminate(factors, evidence)?;
        if remaining.is_empty() {
            return Err(PgmError::EmptyQuery);
        }

        let joint = multiple_factor_product(&remaining)?;
        joint.condition(&Axes::None)
    }

    /// Like [`VariableElimination::query`] but without the final
    /// normalization and keeping every constant dropped along the way.
    ///
    /// The total of the result is the unnormalized probability of the
    /// evidence, e.g. P(evidence) for a normalized directed model. When every
    /// variable was observed or eliminated the result is a scalar.
    pub fn query_unnormalized(&self, factors: &[Factor], evidence: &Evidence) -> Result<Reduced> {
        let (remaining, mass) = self.eliminate(factors, evidence)?;
        if remaining.is_empty() {
            return Ok(Reduced::Scalar(mass));
        }

        let joint = multiple_factor_product(&remaining)?;
        Ok(Reduced::Table(joint).scale(mass))
    }

    /// Answer the same query by building the full joint first.
    ///
    /// Exponential in the number of variables; exists to cross-check
    /// [`VariableElimination::query`].
    pub fn query_full_joint(&self, factors: &[Factor], evidence: &Evidence) -> Result<Factor> {
        self.validate(factors, evidence)?;

        let joint = multiple_factor_product(factors)?;
        let observed = match joint.restrict_by_value(evidence.names(), evidence.values())? {
            Reduced::Table(factor) => factor,
            Reduced::Scalar(_) => return Err(PgmError::EmptyQuery),
        };

        match observed.marginalize(&Axes::Named(self.order.clone()))? {
            Reduced::Table(factor) if factor.ndim() > 0 => factor.condition(&Axes::None),
            _ => Err(PgmError::EmptyQuery),
        }
    }

    /// Run evidence restriction and sequential elimination.
    ///
    /// Returns the remaining working set and the product of every constant
    /// that was dropped from it. Zero-axis factors count as constants.
    fn eliminate(&self, factors: &[Factor], evidence: &Evidence) -> Result<(Vec<Factor>, f64)> {
        self.validate(factors, evidence)?;

        let mut mass = 1.0;
        let mut working = Vec::with_capacity(factors.len());
        for factor in factors {
            match factor.restrict_present(evidence.names(), evidence.values())? {
                Reduced::Table(reduced) if reduced.ndim() > 0 => working.push(reduced),
                Reduced::Table(constant) => mass *= constant.total(),
                Reduced::Scalar(value) => {
                    trace!(axes = ?factor.variables(), value, "factor fully observed");
                    mass *= value;
                }
            }
        }

        for var in &self.order {
            let (containing, rest): (Vec<Factor>, Vec<Factor>) =
                working.into_iter().partition(|f| f.contains(var));
            working = rest;

            if containing.is_empty() {
                // Variable not in any factor, nothing to eliminate
                continue;
            }

            let product = multiple_factor_product(&containing)?;
            match product.marginalize(&Axes::named([var.as_str()]))? {
                Reduced::Table(reduced) => {
                    debug!(
                        variable = %var,
                        cluster = containing.len(),
                        rank = reduced.ndim(),
                        "eliminated variable"
                    );
                    working.push(reduced);
                }
                Reduced::Scalar(value) => {
                    debug!(variable = %var, cluster = containing.len(), "eliminated self-contained cluster");
                    mass *= value;
                }
            }
        }

        Ok((working, mass))
    }

    fn validate(&self, factors: &[Factor], evidence: &Evidence) -> Result<()> {
        if self.config.validate_order {
            validate_elimination(factors, evidence, &self.order, self.config.query.as_deref())?;
        }
        Ok(())
    }
}

/// Sum-product variable elimination.
///
/// Observes `known_names` at `evidence_values`, sums out `eliminate_names`
/// in order, and returns the normalized distribution over what is left.
pub fn sum_product_variable_elimination<K: AsRef<str>, E: AsRef<str>>(
    factors: &[Factor],
    known_names: &[K],
    evidence_values: &[usize],
    eliminate_names: &[E],
) -> Result<Factor> {
    let (evidence, engine) = build_query(known_names, evidence_values, eliminate_names)?;
    engine.query(factors, &evidence)
}

/// Exact inference through the full joint table.
///
/// Same contract as [`sum_product_variable_elimination`].
pub fn full_joint_elimination<K: AsRef<str>, E: AsRef<str>>(
    factors: &[Factor],
    known_names: &[K],
    evidence_values: &[usize],
    eliminate_names: &[E],
) -> Result<Factor> {
    let (evidence, engine) = build_query(known_names, evidence_values, eliminate_names)?;
    engine.query_full_joint(factors, &evidence)
}

fn build_query<K: AsRef<str>, E: AsRef<str>>(
    known_names: &[K],
    evidence_values: &[usize],
    eliminate_names: &[E],
) -> Result<(Evidence, VariableElimination)> {
    let evidence = Evidence::new(
        known_names.iter().map(|n| n.as_ref()),
        evidence_values.to_vec(),
    )?;
    let engine = VariableElimination::new(eliminate_names.iter().map(|n| n.as_ref()));
    Ok((evidence, engine))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// P(A), P(B | A) with B a copy of A
    fn identity_model() -> Vec<Factor> {
        vec![
            Factor::from_values(["A"], &[2], vec![0.5, 0.5]).unwrap(),
            Factor::from_values(["B", "A"], &[2, 2], vec![1.0, 0.0, 0.0, 1.0]).unwrap(),
        ]
    }

    /// A -> B -> C chain with a ternary C
    fn chain_model() -> Vec<Factor> {
        vec![
            Factor::from_values(["A"], &[2], vec![0.6, 0.4]).unwrap(),
            Factor::from_values(["B", "A"], &[2, 2], vec![0.9, 0.2, 0.1, 0.8]).unwrap(),
            Factor::from_values(
                ["C", "B"],
                &[3, 2],
                vec![0.5, 0.1, 0.3, 0.3, 0.2, 0.6],
            )
            .unwrap(),
        ]
    }

    #[test]
    fn test_identity_mapping_marginal() {
        let marginal = VariableElimination::new(["A"])
            .query(&identity_model(), &Evidence::none())
            .unwrap();
        assert_eq!(marginal.variables(), &["B".to_string()]);
        assert_eq!(marginal.get(&[0]).unwrap(), 0.5);
        assert_eq!(marginal.get(&[1]).unwrap(), 0.5);
    }

    #[test]
    fn test_chain_marginal() {
        let marginal = VariableElimination::new(["A", "B"])
            .query(&chain_model(), &Evidence::none())
            .unwrap();
        // P(B=0) = 0.6*0.9 + 0.4*0.2 = 0.62
        let p_c0 = 0.62 * 0.5 + 0.38 * 0.1;
        assert_abs_diff_eq!(marginal.get(&[0]).unwrap(), p_c0, epsilon = 1e-12);
        assert_abs_diff_eq!(marginal.total(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_posterior_with_evidence() {
        let evidence = Evidence::new(["B"], vec![1]).unwrap();
        let posterior = VariableElimination::new(["C"])
            .query(&chain_model(), &evidence)
            .unwrap();
        assert_eq!(posterior.variables(), &["A".to_string()]);
        // P(A=1 | B=1) = 0.4*0.8 / (0.6*0.1 + 0.4*0.8)
        assert_abs_diff_eq!(
            posterior.get(&[1]).unwrap(),
            0.32 / 0.38,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_leftover_variables_stay_as_axes() {
        let joint = VariableElimination::new(Vec::<String>::new())
            .query(&chain_model(), &Evidence::new(["C"], vec![2]).unwrap())
            .unwrap();
        assert_eq!(joint.ndim(), 2);
        assert_abs_diff_eq!(joint.total(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_declared_query_must_be_covered() {
        let engine = VariableElimination::new(["A"])
            .with_config(EliminationConfig::default().with_query(["C"]));
        assert_eq!(
            engine.query(&chain_model(), &Evidence::none()).unwrap_err(),
            PgmError::IncompleteElimination(vec!["B".to_string()])
        );
    }

    #[test]
    fn test_unknown_variables_fail() {
        let err = VariableElimination::new(["Z"])
            .query(&chain_model(), &Evidence::none())
            .unwrap_err();
        assert_eq!(err, PgmError::VariableNotFound("Z".to_string()));

        let err = VariableElimination::new(["A"])
            .query(&chain_model(), &Evidence::new(["Q"], vec![0]).unwrap())
            .unwrap_err();
        assert_eq!(err, PgmError::VariableNotFound("Q".to_string()));
    }

    #[test]
    fn test_unchecked_order_skips_unknown_variables() {
        let engine = VariableElimination::new(["Z", "A", "B"])
            .with_config(EliminationConfig::default().unchecked());
        let marginal = engine.query(&chain_model(), &Evidence::none()).unwrap();
        assert_eq!(marginal.variables(), &["C".to_string()]);
    }

    #[test]
    fn test_everything_eliminated_is_empty_query() {
        let engine = VariableElimination::new(["A", "B", "C"]);
        assert_eq!(
            engine.query(&chain_model(), &Evidence::none()).unwrap_err(),
            PgmError::EmptyQuery
        );
        assert_eq!(
            engine.query_full_joint(&chain_model(), &Evidence::none()).unwrap_err(),
            PgmError::EmptyQuery
        );
    }

    #[test]
    fn test_unnormalized_query_keeps_evidence_mass() {
        let model = chain_model();
        let evidence = Evidence::new(["A", "B"], vec![1, 1]).unwrap();

        // P(A=1, B=1) = 0.4 * 0.8, C remains and sums to one
        let reduced = VariableElimination::new(Vec::<String>::new())
            .query_unnormalized(&model, &evidence)
            .unwrap();
        assert_abs_diff_eq!(reduced.total(), 0.32, epsilon = 1e-12);

        // Eliminating C leaves a scalar P(A=1, B=1)
        let reduced = VariableElimination::new(["C"])
            .query_unnormalized(&model, &evidence)
            .unwrap();
        assert_abs_diff_eq!(reduced.scalar().unwrap(), 0.32, epsilon = 1e-12);
    }

    #[test]
    fn test_probability_of_evidence() {
        let evidence = Evidence::new(["C"], vec![0]).unwrap();
        let reduced = VariableElimination::new(["A", "B"])
            .query_unnormalized(&chain_model(), &evidence)
            .unwrap();
        assert_abs_diff_eq!(
            reduced.scalar().unwrap(),
            0.62 * 0.5 + 0.38 * 0.1,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_full_joint_agrees() {
        let model = chain_model();
        let evidence = Evidence::new(["C"], vec![1]).unwrap();
        let engine = VariableElimination::new(["B"]);
        let fast = engine.query(&model, &evidence).unwrap();
        let slow = engine.query_full_joint(&model, &evidence).unwrap();
        assert_eq!(fast.variables(), slow.variables());
        for (a, b) in fast.flat_values().iter().zip(slow.flat_values()) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_free_functions() {
        let model = identity_model();
        let fast = sum_product_variable_elimination(&model, &["B"], &[1], &[] as &[&str]).unwrap();
        let slow = full_joint_elimination(&model, &["B"], &[1], &[] as &[&str]).unwrap();
        assert_eq!(fast.variables(), &["A".to_string()]);
        assert_abs_diff_eq!(fast.get(&[1]).unwrap(), 1.0, epsilon = 1e-12);
        assert_eq!(fast, slow);
    }

    #[test]
    fn test_mixed_name_types() {
        let model = chain_model();
        let known = vec!["C".to_string()];
        let posterior = sum_product_variable_elimination(&model, known.as_slice(), &[1], &["B"]).unwrap();
        let oracle = full_joint_elimination(&model, known.as_slice(), &[1], &["B"]).unwrap();
        assert_eq!(posterior.variables(), &["A".to_string()]);
        assert_abs_diff_eq!(
            posterior.get(&[0]).unwrap(),
            oracle.get(&[0]).unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_zero_axis_factor_is_a_constant() {
        let constant = Factor::from_values(Vec::<String>::new(), &[], vec![2.0]).unwrap();
        let prior = Factor::from_values(["A"], &[2], vec![0.5, 0.5]).unwrap();
        let model = vec![constant, prior];

        // Everything eliminated: both paths report an empty answer
        let engine = VariableElimination::new(["A"]);
        assert_eq!(engine.query(&model, &Evidence::none()).unwrap_err(), PgmError::EmptyQuery);
        assert_eq!(
            engine.query_full_joint(&model, &Evidence::none()).unwrap_err(),
            PgmError::EmptyQuery
        );
        let mass = engine.query_unnormalized(&model, &Evidence::none()).unwrap();
        assert_eq!(mass.scalar(), Some(2.0));

        // Nothing eliminated: the constant only scales the unnormalized answer
        let engine = VariableElimination::default();
        let fast = engine.query(&model, &Evidence::none()).unwrap();
        let slow = engine.query_full_joint(&model, &Evidence::none()).unwrap();
        assert_eq!(fast.variables(), &["A".to_string()]);
        assert_eq!(fast, slow);
        let unnormalized = engine.query_unnormalized(&model, &Evidence::none()).unwrap();
        assert_abs_diff_eq!(unnormalized.total(), 2.0, epsilon = 1e-12);

        // A model made of constants alone has no answer either way
        let only = vec![Factor::from_values(Vec::<String>::new(), &[], vec![3.0]).unwrap()];
        assert_eq!(engine.query(&only, &Evidence::none()).unwrap_err(), PgmError::EmptyQuery);
        assert_eq!(
            engine.query_full_joint(&only, &Evidence::none()).unwrap_err(),
            PgmError::EmptyQuery
        );
        assert_eq!(
            engine.query_unnormalized(&only, &Evidence::none()).unwrap().scalar(),
            Some(3.0)
        );
    }
}
