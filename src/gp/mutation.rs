//! Uniform subtree mutation.
//!
//! A node is picked uniformly and the subtree it roots is replaced by a
//! freshly generated one of the same type.

use super::generate::{DepthRange, GenerationError, Method, generate_typed};
use super::individual::Individual;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration for mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    /// Probability that an offspring is mutated.
    pub probability: f64,
    /// How replacement subtrees are built.
    pub method: Method,
    /// Heights of replacement subtrees.
    pub depth: DepthRange,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            probability: 0.1,
            method: Method::Full,
            depth: DepthRange::new(0, 2),
        }
    }
}

/// Replace a random subtree of `individual` with a new random one.
///
/// Returns an unevaluated child; the parent is untouched.
///
/// # Errors
///
/// Fails if the replacement subtree cannot be generated.
pub fn mutate<R: Rng>(
    individual: &Individual,
    method: Method,
    depth: DepthRange,
    rng: &mut R,
) -> Result<Individual, GenerationError> {
    let tree = individual.tree();
    let index = rng.gen_range(0..tree.len());
    let ty = tree.nodes()[index].ret();
    let replacement = generate_typed(individual.pset(), method, depth, ty, rng)?;
    Ok(individual.offspring(tree.replace_subtree(index, replacement.nodes())))
}
