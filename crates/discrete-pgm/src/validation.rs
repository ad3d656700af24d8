//! Structural checks run before inference.
//!
//! - [`model_cardinalities`]: every variable has one cardinality model-wide
//! - [`validate_evidence`]: observed names exist and values are in range
//! - [`validate_directed`]: the factors form a directed acyclic factorization
//! - [`validate_elimination`]: the elimination order is well formed

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::error::{PgmError, Result};
use crate::evidence::Evidence;
use crate::factor::Factor;

/// Collect every variable of the model with its cardinality.
pub fn model_cardinalities(factors: &[Factor]) -> Result<BTreeMap<String, usize>> {
    let mut cards = BTreeMap::new();
    for factor in factors {
        for (var, &card) in factor.variables().iter().zip(factor.cardinalities()) {
            match cards.get(var) {
                Some(&known) if known != card => {
                    return Err(PgmError::CardinalityConflict {
                        variable: var.clone(),
                        left: known,
                        right: card,
                    });
                }
                Some(_) => {}
                None => {
                    cards.insert(var.clone(), card);
                }
            }
        }
    }
    Ok(cards)
}

/// Check that every observed variable occurs in the model with a valid value.
pub fn validate_evidence(cards: &BTreeMap<String, usize>, evidence: &Evidence) -> Result<()> {
    for (name, value) in evidence.iter() {
        let card = *cards
            .get(name)
            .ok_or_else(|| PgmError::VariableNotFound(name.to_string()))?;
        if value >= card {
            return Err(PgmError::IndexOutOfRange {
                variable: name.to_string(),
                value,
                cardinality: card,
            });
        }
    }
    Ok(())
}

/// Check that `factors` is a directed factorization.
///
/// Each factor owns its first axis and its remaining axes are parents. Owners
/// must be unique, every parent must be owned by some factor, and the
/// parent relation must be acyclic. Returns the factor indices in a
/// topological order.
pub fn validate_directed(factors: &[Factor]) -> Result<Vec<usize>> {
    let mut owner_of: HashMap<&str, usize> = HashMap::with_capacity(factors.len());
    for (idx, factor) in factors.iter().enumerate() {
        let owned = factor
            .variables()
            .first()
            .ok_or_else(|| PgmError::InvalidModel(format!("factor {} has no axes", idx)))?;
        if owner_of.insert(owned.as_str(), idx).is_some() {
            return Err(PgmError::InvalidModel(format!(
                "variable '{}' is owned by more than one factor",
                owned
            )));
        }
    }

    // Kahn's algorithm over the parent -> child edges
    let mut in_degree = vec![0usize; factors.len()];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); factors.len()];
    for (idx, factor) in factors.iter().enumerate() {
        let owned = &factor.variables()[0];
        for parent in &factor.variables()[1..] {
            let &parent_idx = owner_of.get(parent.as_str()).ok_or_else(|| {
                PgmError::InvalidModel(format!(
                    "parent '{}' of '{}' is not owned by any factor",
                    parent, owned
                ))
            })?;
            children[parent_idx].push(idx);
            in_degree[idx] += 1;
        }
    }

    let mut ready: VecDeque<usize> = (0..factors.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(factors.len());
    while let Some(idx) = ready.pop_front() {
        order.push(idx);
        for &child in &children[idx] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                ready.push_back(child);
            }
        }
    }

    if order.len() != factors.len() {
        let mut cyclic: Vec<&str> = (0..factors.len())
            .filter(|&i| in_degree[i] > 0)
            .map(|i| factors[i].variables()[0].as_str())
            .collect();
        cyclic.sort_unstable();
        return Err(PgmError::InvalidModel(format!(
            "cycle through variables {:?}",
            cyclic
        )));
    }

    Ok(order)
}

/// Check an elimination query before running it.
///
/// Evidence and eliminated names must occur in the model, the order must not
/// repeat a variable or eliminate an observed one, and, when `query` is
/// given, every model variable must be observed, eliminated or queried.
pub fn validate_elimination(
    factors: &[Factor],
    evidence: &Evidence,
    order: &[String],
    query: Option<&[String]>,
) -> Result<()> {
    let cards = model_cardinalities(factors)?;
    validate_evidence(&cards, evidence)?;

    let mut seen = HashSet::with_capacity(order.len());
    for var in order {
        if !cards.contains_key(var) {
            return Err(PgmError::VariableNotFound(var.clone()));
        }
        if !seen.insert(var.as_str()) {
            return Err(PgmError::InvalidOrder(format!(
                "'{}' appears more than once in the elimination order",
                var
            )));
        }
        if evidence.contains(var) {
            return Err(PgmError::InvalidOrder(format!(
                "'{}' is both observed and eliminated",
                var
            )));
        }
    }

    if let Some(query) = query {
        for var in query {
            if !cards.contains_key(var) {
                return Err(PgmError::VariableNotFound(var.clone()));
            }
            if evidence.contains(var) || seen.contains(var.as_str()) {
                return Err(PgmError::InvalidOrder(format!(
                    "query variable '{}' is observed or eliminated",
                    var
                )));
            }
        }

        let leftover: Vec<String> = cards
            .keys()
            .filter(|var| {
                !evidence.contains(var) && !seen.contains(var.as_str()) && !query.contains(var)
            })
            .cloned()
            .collect();
        if !leftover.is_empty() {
            return Err(PgmError::IncompleteElimination(leftover));
        }
    }

    Ok(())
}
