//! Per-generation statistics and the logbook that collects them.
//!
//! A [`Statistics`] object maps each individual to one number through a key
//! function and reduces those numbers with named aggregates. The evolution
//! loop records one [`Record`] per generation in a [`Logbook`].

// Statistics divide by population sizes
#![allow(clippy::cast_precision_loss)]

use super::individual::Individual;
use serde::Serialize;
use std::fmt;

type KeyFn = dyn Fn(&Individual) -> f64;
type AggregateFn = dyn Fn(&[f64]) -> f64;

/// Named aggregates over a key extracted from every individual.
pub struct Statistics {
    key: Box<KeyFn>,
    aggregates: Vec<(String, Box<AggregateFn>)>,
}

impl Statistics {
    /// Statistics over `key(individual)`, with no aggregates yet.
    #[must_use]
    pub fn new(key: impl Fn(&Individual) -> f64 + 'static) -> Self {
        Self {
            key: Box::new(key),
            aggregates: Vec::new(),
        }
    }

    /// Statistics over the first raw objective value. Unevaluated individuals
    /// map to NaN.
    #[must_use]
    pub fn fitness() -> Self {
        Self::new(|individual| {
            individual
                .fitness()
                .values()
                .and_then(|values| values.first().copied())
                .unwrap_or(f64::NAN)
        })
    }

    /// Register an aggregate under `name`. Aggregates are reported in
    /// registration order.
    #[must_use]
    pub fn register(mut self, name: &str, aggregate: impl Fn(&[f64]) -> f64 + 'static) -> Self {
        self.aggregates.push((name.to_string(), Box::new(aggregate)));
        self
    }

    /// Register `avg`, `std`, `min` and `max`.
    #[must_use]
    pub fn standard(self) -> Self {
        self.register("avg", mean)
            .register("std", std_dev)
            .register("min", min)
            .register("max", max)
    }

    /// Names of the registered aggregates.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.aggregates.iter().map(|(name, _)| name.as_str())
    }

    /// Apply every aggregate to the keys of `population`.
    #[must_use]
    pub fn compile(&self, population: &[Individual]) -> Vec<(String, f64)> {
        let keys: Vec<f64> = population.iter().map(|ind| (self.key)(ind)).collect();
        self.aggregates
            .iter()
            .map(|(name, aggregate)| (name.clone(), aggregate(&keys)))
            .collect()
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self::fitness().standard()
    }
}

impl fmt::Debug for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statistics")
            .field("aggregates", &self.names().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Statistics of one generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// Generation number, 0 being the initial population.
    pub generation: usize,
    /// Number of fitness evaluations performed in this generation.
    pub evaluations: usize,
    /// Aggregate values in registration order.
    pub values: Vec<(String, f64)>,
}

impl Record {
    /// Value of the aggregate called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| *value)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen {:>3}  nevals {:>4}", self.generation, self.evaluations)?;
        for (name, value) in &self.values {
            write!(f, "  {name} {value:.6}")?;
        }
        Ok(())
    }
}

/// Append-only sequence of generation records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Logbook {
    records: Vec<Record>,
}

impl Logbook {
    /// Empty logbook.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// All records, oldest first.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Most recent record.
    #[must_use]
    pub fn last(&self) -> Option<&Record> {
        self.records.last()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One aggregate across all generations.
    #[must_use]
    pub fn column(&self, name: &str) -> Vec<f64> {
        self.records
            .iter()
            .map(|record| record.get(name).unwrap_or(f64::NAN))
            .collect()
    }
}

/// Arithmetic mean; NaN for no values.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; NaN for no values.
#[must_use]
pub fn std_dev(values: &[f64]) -> f64 {
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Smallest value; NaN for no values.
#[must_use]
pub fn min(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::min).unwrap_or(f64::NAN)
}

/// Largest value; NaN for no values.
#[must_use]
pub fn max(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::max).unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::fitness::Fitness;
    use crate::gp::primitives::{PrimitiveSet, Ty};
    use crate::gp::tree::{Node, Tree};
    use std::sync::Arc;

    fn population(errors: &[f64]) -> Vec<Individual> {
        let pset = Arc::new(PrimitiveSet::new("MAIN", 1));
        errors
            .iter()
            .map(|&error| {
                let tree = Tree::from_nodes(vec![Node::terminal(0, Ty::ANY)]).unwrap();
                let mut ind = Individual::new(tree, Arc::clone(&pset), Fitness::minimizing());
                ind.fitness_mut().set_values(vec![error]).unwrap();
                ind
            })
            .collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_aggregates() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!(close(mean(&values), 5.0));
        assert!(close(std_dev(&values), 2.0));
        assert!(close(min(&values), 2.0));
        assert!(close(max(&values), 9.0));
    }

    #[test]
    fn test_empty_is_nan() {
        assert!(mean(&[]).is_nan());
        assert!(std_dev(&[]).is_nan());
        assert!(min(&[]).is_nan());
        assert!(max(&[]).is_nan());
    }

    #[test]
    fn test_standard_compile_order() {
        let stats = Statistics::default();
        let record = stats.compile(&population(&[1.0, 3.0]));
        let names: Vec<&str> = record.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["avg", "std", "min", "max"]);
        assert!(close(record[0].1, 2.0));
        assert!(close(record[1].1, 1.0));
        assert!(close(record[2].1, 1.0));
        assert!(close(record[3].1, 3.0));
    }

    #[test]
    fn test_custom_key_and_aggregate() {
        let stats = Statistics::new(|ind| ind.tree().len() as f64).register("total", |v| v.iter().sum());
        let record = stats.compile(&population(&[1.0, 2.0, 3.0]));
        assert_eq!(record.len(), 1);
        assert!(close(record[0].1, 3.0));
    }

    #[test]
    fn test_logbook_column() {
        let mut logbook = Logbook::new();
        for generation in 0..3 {
            logbook.push(Record {
                generation,
                evaluations: 10,
                values: vec![("min".to_string(), generation as f64)],
            });
        }
        assert_eq!(logbook.len(), 3);
        assert_eq!(logbook.column("min"), vec![0.0, 1.0, 2.0]);
        assert_eq!(logbook.last().unwrap().get("min"), Some(2.0));
        assert_eq!(logbook.last().unwrap().get("max"), None);
    }

    #[test]
    fn test_record_display() {
        let record = Record {
            generation: 4,
            evaluations: 57,
            values: vec![("min".to_string(), 0.5)],
        };
        assert_eq!(record.to_string(), "gen   4  nevals   57  min 0.500000");
    }
}
