//! Tournament selection.
//!
//! Each pick draws `tournament_size` contestants uniformly with replacement
//! and keeps the best. Ties go to the contestant drawn first.

use super::individual::Individual;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration for selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Number of individuals competing in each tournament.
    pub tournament_size: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { tournament_size: 3 }
    }
}

/// Run `k` tournaments over `population` and return the winners' indices.
///
/// The same individual may win several times. An empty population yields
/// no winners.
#[must_use]
pub fn select_tournament<R: Rng>(
    population: &[Individual],
    k: usize,
    tournament_size: usize,
    rng: &mut R,
) -> Vec<usize> {
    if population.is_empty() {
        return Vec::new();
    }
    (0..k)
        .map(|_| tournament_select(population, tournament_size, rng))
        .collect()
}

/// One tournament: draw contestants and return the index of the best.
fn tournament_select<R: Rng>(population: &[Individual], tournament_size: usize, rng: &mut R) -> usize {
    let pop_size = population.len();
    let mut best_idx = rng.gen_range(0..pop_size);

    for _ in 1..tournament_size.max(1) {
        let idx = rng.gen_range(0..pop_size);
        if population[idx]
            .fitness()
            .is_better_than(population[best_idx].fitness())
        {
            best_idx = idx;
        }
    }

    best_idx
}
