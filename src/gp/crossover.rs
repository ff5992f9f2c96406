//! One-point subtree crossover.
//!
//! A node is picked in each parent, restricted to a type both parents
//! contain, and the two subtrees rooted there are swapped. Any node may be
//! picked, the root included.

use super::individual::Individual;
use super::primitives::Ty;
use super::tree::Tree;
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for crossover.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossoverConfig {
    /// Probability that a consecutive pair of offspring is mated.
    pub probability: f64,
}

impl Default for CrossoverConfig {
    fn default() -> Self {
        Self { probability: 0.5 }
    }
}

/// Swap the subtree at `i` in `a` with the subtree at `j` in `b`.
///
/// # Panics
///
/// Panics if either index is out of bounds.
#[must_use]
pub fn swap_subtrees(a: &Tree, i: usize, b: &Tree, j: usize) -> (Tree, Tree) {
    (
        a.replace_subtree(i, b.subtree_nodes(j)),
        b.replace_subtree(j, a.subtree_nodes(i)),
    )
}

/// Mate two individuals.
///
/// Returns two unevaluated children. When the parents share no node type
/// the parents are returned unchanged, fitness included.
#[must_use]
pub fn crossover<R: Rng>(a: &Individual, b: &Individual, rng: &mut R) -> (Individual, Individual) {
    match crossover_points(a.tree(), b.tree(), rng) {
        Some((i, j)) => {
            let (left, right) = swap_subtrees(a.tree(), i, b.tree(), j);
            (a.offspring(left), b.offspring(right))
        }
        None => {
            debug!("parents share no node type; skipping crossover");
            (a.clone(), b.clone())
        }
    }
}

/// Pick a crossover point in each tree with matching types.
fn crossover_points<R: Rng>(a: &Tree, b: &Tree, rng: &mut R) -> Option<(usize, usize)> {
    let by_type_a = positions_by_type(a);
    let by_type_b = positions_by_type(b);
    let common: Vec<Ty> = by_type_a
        .keys()
        .filter(|ty| by_type_b.contains_key(*ty))
        .copied()
        .collect();
    if common.is_empty() {
        return None;
    }
    let ty = common[rng.gen_range(0..common.len())];
    let in_a = &by_type_a[&ty];
    let in_b = &by_type_b[&ty];
    let i = in_a[rng.gen_range(0..in_a.len())];
    let j = in_b[rng.gen_range(0..in_b.len())];
    Some((i, j))
}

fn positions_by_type(tree: &Tree) -> BTreeMap<Ty, Vec<usize>> {
    let mut positions: BTreeMap<Ty, Vec<usize>> = BTreeMap::new();
    for (index, node) in tree.nodes().iter().enumerate() {
        positions.entry(node.ret()).or_default().push(index);
    }
    positions
}
