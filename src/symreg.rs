//! Symbolic regression of a univariate function.
//!
//! Provides the arithmetic primitive sets, a sum-of-squared-errors fitness
//! over fixed sample points, and the quartic benchmark
//! `x^4 + x^3 + x^2 + x` sampled at `x = -1.0, -0.9, ..., 0.9`.

use crate::error::{EvalResult, SetupError};
use crate::gp::{Evaluate, Individual, Operation, PrimitiveSet, Program};
use rand::Rng;

/// Division that yields 0 when the divisor is exactly zero.
#[must_use]
pub fn safe_div(left: f64, right: f64) -> f64 {
    if right == 0.0 { 0.0 } else { left / right }
}

/// The benchmark target.
#[must_use]
pub fn quartic(x: f64) -> f64 {
    x.powi(4) + x.powi(3) + x.powi(2) + x
}

/// `add`, `sub`, `mul`, `div` (protected) and `neg` over one input `x`.
///
/// # Errors
///
/// Never in practice; registration errors are propagated.
pub fn arithmetic_set() -> Result<PrimitiveSet, SetupError> {
    let mut pset = PrimitiveSet::new("MAIN", 1);
    pset.add_primitive("add", 2, Operation::binary(|a, b| a + b))?;
    pset.add_primitive("sub", 2, Operation::binary(|a, b| a - b))?;
    pset.add_primitive("mul", 2, Operation::binary(|a, b| a * b))?;
    pset.add_primitive("div", 2, Operation::binary(safe_div))?;
    pset.add_primitive("neg", 1, Operation::unary(|a| -a))?;
    pset.rename_arguments(&[("ARG0", "x")])?;
    Ok(pset)
}

/// [`arithmetic_set`] plus `cos`, `sin` and an ephemeral integer constant
/// drawn from {-1, 0, 1}.
///
/// # Errors
///
/// Never in practice; registration errors are propagated.
pub fn trigonometric_set() -> Result<PrimitiveSet, SetupError> {
    let mut pset = arithmetic_set()?;
    pset.add_primitive("cos", 1, Operation::unary(f64::cos))?;
    pset.add_primitive("sin", 1, Operation::unary(f64::sin))?;
    pset.add_ephemeral_constant("rand101", |rng| f64::from(rng.gen_range(-1_i32..=1)))?;
    Ok(pset)
}

/// Fitness: sum of squared errors over fixed `(x, y)` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Regression {
    samples: Vec<(f64, f64)>,
}

impl Regression {
    /// Regression against explicit `(x, y)` pairs.
    #[must_use]
    pub fn new(samples: Vec<(f64, f64)>) -> Self {
        Self { samples }
    }

    /// Regression against `target` sampled at `xs`.
    #[must_use]
    pub fn from_fn(xs: impl IntoIterator<Item = f64>, target: impl Fn(f64) -> f64) -> Self {
        Self::new(xs.into_iter().map(|x| (x, target(x))).collect())
    }

    /// The quartic benchmark at `x = i / 10` for `i` in `-10..10`.
    #[must_use]
    pub fn quartic() -> Self {
        Self::from_fn((-10..10).map(|i| f64::from(i) / 10.0), quartic)
    }

    /// The sample points.
    #[must_use]
    pub fn samples(&self) -> &[(f64, f64)] {
        &self.samples
    }

    /// Sum of squared errors of `program` over the samples, in sample order.
    ///
    /// # Errors
    ///
    /// Propagates evaluation failures of the program.
    pub fn sum_squared_error(&self, program: &Program<'_>) -> EvalResult<f64> {
        self.samples.iter().try_fold(0.0, |total, &(x, y)| {
            let diff = program.call(&[x])? - y;
            Ok(total + diff * diff)
        })
    }
}

impl Evaluate for Regression {
    fn evaluate(&self, individual: &Individual) -> EvalResult<Vec<f64>> {
        let program = individual.compile()?;
        Ok(vec![self.sum_squared_error(&program)?])
    }
}
