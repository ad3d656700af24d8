//! Bayesian Network Example: Student Performance Model
//!
//! This example builds the classic student network and answers the same
//! posterior query with variable elimination, likelihood weighting and Gibbs
//! sampling.
//!
//! Run with `RUST_LOG=discrete_pgm=debug` to see the elimination steps.

use discrete_pgm::{
    weighted_marginal, Axes, EliminationConfig, Evidence, Factor, Sampler, SamplingConfig,
    VariableElimination,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().compact())
        .try_init()?;

    println!("=== Bayesian Network: Student Performance Model ===\n");

    // Structure: Difficulty → Grade ← Intelligence
    //                          ↓
    //                        Letter
    let p_difficulty = Factor::from_values(["Difficulty"], &[2], vec![0.6, 0.4])?;
    let p_intelligence = Factor::from_values(["Intelligence"], &[2], vec![0.7, 0.3])?;

    // Unnormalized counts, turned into P(Grade | Intelligence, Difficulty)
    let grade_counts = Factor::from_values(
        ["Grade", "Intelligence", "Difficulty"],
        &[3, 2, 2],
        vec![
            30.0, 5.0, 90.0, 50.0, // A
            40.0, 25.0, 8.0, 30.0, // B
            30.0, 70.0, 2.0, 20.0, // C
        ],
    )?;
    let p_grade = grade_counts.condition(&Axes::named(["Intelligence", "Difficulty"]))?;

    let p_letter = Factor::from_values(
        ["Letter", "Grade"],
        &[2, 3],
        vec![0.1, 0.4, 0.99, 0.9, 0.6, 0.01],
    )?;

    println!("P(Letter | Grade):\n{}", p_letter);

    let model = vec![p_difficulty, p_intelligence, p_grade, p_letter];
    let evidence = Evidence::new(["Letter"], vec![1])?;

    // Exact answer
    let config = EliminationConfig::default().with_query(["Intelligence"]);
    let engine = VariableElimination::new(["Difficulty", "Grade"]).with_config(config);
    let exact = engine.query(&model, &evidence)?;
    println!("Variable elimination, P(Intelligence | Letter = strong):\n{}", exact);

    // Probability of the evidence itself
    let mass = VariableElimination::new(["Difficulty", "Intelligence", "Grade"])
        .query_unnormalized(&model, &evidence)?;
    println!("P(Letter = strong) = {:.6}\n", mass.total());

    // Approximate answers
    let mut sampler = Sampler::new(&SamplingConfig::default().with_seed(42));

    let weighted = sampler.likelihood_weighted(&model, &evidence, 10_000)?;
    let lw = weighted_marginal(&weighted, "Intelligence", 2)?;
    println!("Likelihood weighting (10000 samples):\n{}", lw);

    let trace = sampler.gibbs(&model, &evidence, 10_000)?;
    let gibbs = trace.empirical_marginal("Intelligence", 2, 500)?;
    println!("Gibbs sampling (10000 steps, 500 burn-in):\n{}", gibbs);

    println!("=== Summary ===");
    println!(
        "P(Intelligence = high | Letter = strong): exact {:.4}, LW {:.4}, Gibbs {:.4}",
        exact.get(&[1])?,
        lw.get(&[1])?,
        gibbs.get(&[1])?
    );

    Ok(())
}
