//! Fitness records and the evaluation seam.
//!
//! A [`Fitness`] holds raw objective values plus the weights that give each
//! objective its direction: negative weights minimize, positive maximize.
//! Comparison is lexicographic over `value * weight`, so "greater" always
//! means "better" regardless of direction.

use super::individual::Individual;
use crate::error::{EvalError, EvalResult};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Objective values of one individual, or nothing if not yet evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fitness {
    weights: Vec<f64>,
    values: Option<Vec<f64>>,
}

impl Fitness {
    /// Unevaluated fitness with the given objective weights.
    #[must_use]
    pub fn new(weights: Vec<f64>) -> Self {
        Self {
            weights,
            values: None,
        }
    }

    /// Single objective, lower is better.
    #[must_use]
    pub fn minimizing() -> Self {
        Self::new(vec![-1.0])
    }

    /// Single objective, higher is better.
    #[must_use]
    pub fn maximizing() -> Self {
        Self::new(vec![1.0])
    }

    /// Objective weights.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Raw objective values, if evaluated.
    #[must_use]
    pub fn values(&self) -> Option<&[f64]> {
        self.values.as_deref()
    }

    /// True once values have been assigned.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.values.is_some()
    }

    /// Assign raw objective values.
    ///
    /// # Errors
    ///
    /// Fails, leaving the record unchanged, if the number of values differs
    /// from the number of weights.
    pub fn set_values(&mut self, values: Vec<f64>) -> EvalResult<()> {
        if values.len() != self.weights.len() {
            return Err(EvalError::ObjectiveCount {
                expected: self.weights.len(),
                got: values.len(),
            });
        }
        self.values = Some(values);
        Ok(())
    }

    /// Assign the worst possible value to every objective: `+inf` where
    /// minimizing, `-inf` where maximizing.
    pub fn set_worst(&mut self) {
        self.values = Some(
            self.weights
                .iter()
                .map(|w| {
                    if *w < 0.0 {
                        f64::INFINITY
                    } else {
                        f64::NEG_INFINITY
                    }
                })
                .collect(),
        );
    }

    /// Forget the values; the record becomes unevaluated.
    pub fn invalidate(&mut self) {
        self.values = None;
    }

    /// `value * weight` per objective, if evaluated.
    #[must_use]
    pub fn weighted(&self) -> Option<Vec<f64>> {
        self.values.as_ref().map(|values| {
            values
                .iter()
                .zip(&self.weights)
                .map(|(value, weight)| value * weight)
                .collect()
        })
    }

    /// Order by weighted values, lexicographically. Unevaluated records are
    /// below every evaluated one.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self.weighted(), other.weighted()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a
                .iter()
                .zip(&b)
                .map(|(x, y)| compare_weighted(*x, *y))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal),
        }
    }

    /// Strictly better than `other`.
    #[must_use]
    pub fn is_better_than(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Greater
    }
}

/// Numeric order, with NaN below every number.
fn compare_weighted(x: f64, y: f64) -> Ordering {
    match (x.is_nan(), y.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
    }
}

/// Anything that can score an individual.
///
/// Implemented for every `Fn(&Individual) -> EvalResult<Vec<f64>>`. The
/// returned vector must have one value per fitness weight.
pub trait Evaluate: Sync {
    /// Raw objective values for `individual`.
    ///
    /// # Errors
    ///
    /// Any failure to score the individual.
    fn evaluate(&self, individual: &Individual) -> EvalResult<Vec<f64>>;
}

impl<F> Evaluate for F
where
    F: Fn(&Individual) -> EvalResult<Vec<f64>> + Sync,
{
    fn evaluate(&self, individual: &Individual) -> EvalResult<Vec<f64>> {
        self(individual)
    }
}

/// Score the individuals at `indices`, in that order.
///
/// With `parallel` set the work is spread over the rayon pool; the result
/// order still follows `indices`.
pub fn evaluate_indices<E: Evaluate + ?Sized>(
    evaluator: &E,
    population: &[Individual],
    indices: &[usize],
    parallel: bool,
) -> Vec<EvalResult<Vec<f64>>> {
    if parallel {
        indices
            .par_iter()
            .map(|&index| evaluator.evaluate(&population[index]))
            .collect()
    } else {
        indices
            .iter()
            .map(|&index| evaluator.evaluate(&population[index]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluated(weights: Vec<f64>, values: Vec<f64>) -> Fitness {
        let mut fitness = Fitness::new(weights);
        fitness.set_values(values).unwrap();
        fitness
    }

    #[test]
    fn test_minimizing_prefers_lower() {
        let low = evaluated(vec![-1.0], vec![1.0]);
        let high = evaluated(vec![-1.0], vec![2.0]);
        assert!(low.is_better_than(&high));
        assert!(!high.is_better_than(&low));
    }

    #[test]
    fn test_maximizing_prefers_higher() {
        let low = evaluated(vec![1.0], vec![1.0]);
        let high = evaluated(vec![1.0], vec![2.0]);
        assert!(high.is_better_than(&low));
    }

    #[test]
    fn test_lexicographic() {
        let a = evaluated(vec![1.0, -1.0], vec![3.0, 10.0]);
        let b = evaluated(vec![1.0, -1.0], vec![3.0, 5.0]);
        let c = evaluated(vec![1.0, -1.0], vec![4.0, 100.0]);
        assert!(b.is_better_than(&a));
        assert!(c.is_better_than(&b));
    }

    #[test]
    fn test_ties_are_not_better() {
        let a = evaluated(vec![-1.0], vec![1.0]);
        let b = evaluated(vec![-1.0], vec![1.0]);
        assert_eq!(a.compare(&b), Ordering::Equal);
        assert!(!a.is_better_than(&b));
    }

    #[test]
    fn test_invalid_is_worst() {
        let invalid = Fitness::minimizing();
        let valid = evaluated(vec![-1.0], vec![f64::MAX]);
        assert!(valid.is_better_than(&invalid));
        assert!(!invalid.is_valid());
    }

    #[test]
    fn test_objective_count_mismatch() {
        let mut fitness = Fitness::minimizing();
        assert_eq!(
            fitness.set_values(vec![1.0, 2.0]),
            Err(EvalError::ObjectiveCount {
                expected: 1,
                got: 2
            })
        );
        assert!(!fitness.is_valid());
    }

    #[test]
    fn test_worst_sentinel() {
        let mut worst = Fitness::new(vec![-1.0, 1.0]);
        worst.set_worst();
        assert_eq!(worst.values(), Some(&[f64::INFINITY, f64::NEG_INFINITY][..]));
        let any = evaluated(vec![-1.0, 1.0], vec![1e300, -1e300]);
        assert!(any.is_better_than(&worst));
    }

    #[test]
    fn test_nan_is_below_everything() {
        let nan = evaluated(vec![-1.0], vec![f64::NAN]);
        let inf = evaluated(vec![-1.0], vec![f64::INFINITY]);
        assert!(inf.is_better_than(&nan));
        assert!(!nan.is_better_than(&inf));
    }

    #[test]
    fn test_invalidate() {
        let mut fitness = evaluated(vec![-1.0], vec![0.5]);
        fitness.invalidate();
        assert_eq!(fitness.values(), None);
    }
}
