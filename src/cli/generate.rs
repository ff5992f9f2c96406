//! The `generate` command: print random trees from a primitive set.

use super::output::{JsonIndividual, format_tree_line};
use super::{CliError, OutputFormat, PrimitiveChoice};
use clap::ValueEnum;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::sync::Arc;
use treegp::gp::{DepthRange, Fitness, Individual, Method, generate};

/// Tree construction method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum MethodArg {
    /// Every leaf at the chosen depth.
    Full,
    /// Leaves anywhere up to the chosen depth.
    Grow,
    /// Full or grow with equal probability.
    Ramped,
}

impl From<MethodArg> for Method {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Full => Self::Full,
            MethodArg::Grow => Self::Grow,
            MethodArg::Ramped => Self::RampedHalfAndHalf,
        }
    }
}

/// Execute the generate command.
pub(crate) fn execute(
    count: usize,
    method: MethodArg,
    min_depth: usize,
    max_depth: usize,
    seed: Option<u64>,
    primitives: PrimitiveChoice,
    format: OutputFormat,
) -> Result<(), CliError> {
    let pset = Arc::new(primitives.build()?);
    let mut rng = SmallRng::seed_from_u64(seed.unwrap_or_else(rand::random));
    let depth = DepthRange::new(min_depth, max_depth);

    let mut individuals = Vec::with_capacity(count);
    for _ in 0..count {
        let tree = generate(&pset, method.into(), depth, &mut rng)?;
        individuals.push(Individual::new(tree, Arc::clone(&pset), Fitness::minimizing()));
    }

    match format {
        OutputFormat::Text => {
            for individual in &individuals {
                println!("{}", format_tree_line(individual.tree(), &individual.to_string()));
            }
        }
        OutputFormat::Json => {
            let trees: Vec<JsonIndividual> = individuals
                .iter()
                .map(JsonIndividual::from_individual)
                .collect();
            println!("{}", serde_json::to_string_pretty(&trees)?);
        }
    }

    Ok(())
}
