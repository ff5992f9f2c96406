//! Bounded archive of the best individuals seen during a run.

use super::individual::Individual;
use std::slice;

/// The best distinct individuals ever evaluated, best first.
///
/// Individuals with equal trees are stored once. Among equal fitness the
/// earlier entry ranks first.
#[derive(Debug, Clone, Default)]
pub struct HallOfFame {
    capacity: usize,
    entries: Vec<Individual>,
}

impl HallOfFame {
    /// Empty archive holding at most `capacity` individuals.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Offer every evaluated member of `population` to the archive.
    pub fn update(&mut self, population: &[Individual]) {
        for individual in population {
            self.insert(individual);
        }
    }

    /// Offer one individual; returns whether it was stored.
    pub fn insert(&mut self, individual: &Individual) -> bool {
        if self.capacity == 0 || !individual.fitness().is_valid() {
            return false;
        }
        if self.entries.len() == self.capacity
            && !self
                .entries
                .last()
                .is_some_and(|worst| individual.fitness().is_better_than(worst.fitness()))
        {
            return false;
        }
        if self.entries.iter().any(|e| e.tree() == individual.tree()) {
            return false;
        }
        let position = self
            .entries
            .iter()
            .position(|e| individual.fitness().is_better_than(e.fitness()))
            .unwrap_or(self.entries.len());
        self.entries.insert(position, individual.clone());
        self.entries.truncate(self.capacity);
        true
    }

    /// Maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The best individual seen so far.
    #[must_use]
    pub fn best(&self) -> Option<&Individual> {
        self.entries.first()
    }

    /// Entry at rank `index`, 0 being the best.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Individual> {
        self.entries.get(index)
    }

    /// Entries, best first.
    pub fn iter(&self) -> slice::Iter<'_, Individual> {
        self.entries.iter()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<'a> IntoIterator for &'a HallOfFame {
    type Item = &'a Individual;
    type IntoIter = slice::Iter<'a, Individual>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::fitness::Fitness;
    use crate::gp::primitives::{PrimitiveSet, Ty};
    use crate::gp::tree::{Node, Tree};
    use std::sync::Arc;

    /// Individuals with distinct single-leaf trees and the given errors.
    fn population(errors: &[f64]) -> Vec<Individual> {
        let mut pset = PrimitiveSet::new("MAIN", 0);
        for i in 0..errors.len() {
            pset.add_terminal(&format!("c{i}"), 0.0).unwrap();
        }
        let pset = Arc::new(pset);
        errors
            .iter()
            .enumerate()
            .map(|(i, &error)| individual(&pset, i, error))
            .collect()
    }

    fn individual(pset: &Arc<PrimitiveSet>, terminal: usize, error: f64) -> Individual {
        let tree = Tree::from_nodes(vec![Node::terminal(terminal, Ty::ANY)]).unwrap();
        let mut ind = Individual::new(tree, Arc::clone(pset), Fitness::minimizing());
        ind.fitness_mut().set_values(vec![error]).unwrap();
        ind
    }

    fn errors(hof: &HallOfFame) -> Vec<f64> {
        hof.iter()
            .map(|ind| ind.fitness().values().unwrap()[0])
            .collect()
    }

    #[test]
    fn test_keeps_best_sorted() {
        let mut hof = HallOfFame::new(3);
        hof.update(&population(&[5.0, 1.0, 4.0, 2.0, 3.0]));
        assert_eq!(errors(&hof), vec![1.0, 2.0, 3.0]);
        assert_eq!(hof.len(), 3);
    }

    #[test]
    fn test_persists_across_updates() {
        let mut hof = HallOfFame::new(1);
        let pop = population(&[1.0, 9.0]);
        hof.update(&pop[..1]);
        hof.update(&pop[1..]);
        assert_eq!(errors(&hof), vec![1.0]);
    }

    #[test]
    fn test_deduplicates_trees() {
        let pop = population(&[1.0]);
        let mut hof = HallOfFame::new(5);
        hof.update(&pop);
        hof.update(&pop);
        assert_eq!(hof.len(), 1);
    }

    #[test]
    fn test_ties_keep_earlier_first() {
        let pop = population(&[1.0, 1.0]);
        let mut hof = HallOfFame::new(1);
        hof.update(&pop);
        assert_eq!(hof.best().unwrap().tree(), pop[0].tree());

        let mut hof = HallOfFame::new(2);
        hof.update(&pop);
        assert_eq!(hof.get(0).unwrap().tree(), pop[0].tree());
        assert_eq!(hof.get(1).unwrap().tree(), pop[1].tree());
    }

    #[test]
    fn test_zero_capacity() {
        let mut hof = HallOfFame::new(0);
        hof.update(&population(&[1.0, 2.0]));
        assert!(hof.is_empty());
        assert!(hof.best().is_none());
    }

    #[test]
    fn test_ignores_unevaluated() {
        let mut pop = population(&[1.0]);
        pop[0].fitness_mut().invalidate();
        let mut hof = HallOfFame::new(2);
        assert!(!hof.insert(&pop[0]));
        assert!(hof.is_empty());
    }
}
