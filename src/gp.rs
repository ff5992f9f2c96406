//! Tree-based genetic programming.
//!
//! Individuals are expression trees stored as flat prefix-order node
//! arrays over a shared [`PrimitiveSet`]. The [`Engine`] evolves a
//! population of them with tournament selection, subtree crossover and
//! subtree mutation, keeping a [`HallOfFame`] and a [`Logbook`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Evolution Loop (Engine)           │
//! ├─────────────────────────────────────┤
//! │  Selection │ Crossover │ Mutation   │
//! ├─────────────────────────────────────┤
//! │  Fitness │ Hall of Fame │ Stats     │
//! ├─────────────────────────────────────┤
//! │  Generation │ Tree → Program        │
//! ├─────────────────────────────────────┤
//! │         Primitive Set               │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use treegp::gp::{Engine, EvolutionConfig, Individual, Operation, PrimitiveSet};
//! use treegp::EvalResult;
//!
//! let mut pset = PrimitiveSet::new("MAIN", 1);
//! pset.add_primitive("add", 2, Operation::binary(|a, b| a + b))?;
//! pset.add_primitive("mul", 2, Operation::binary(|a, b| a * b))?;
//! pset.rename_arguments(&[("ARG0", "x")])?;
//!
//! let target = |ind: &Individual| -> EvalResult<Vec<f64>> {
//!     let program = ind.compile()?;
//!     let mut error = 0.0;
//!     for i in -10..10 {
//!         let x = f64::from(i) / 10.0;
//!         error += (program.call(&[x])? - (x * x + x)).powi(2);
//!     }
//!     Ok(vec![error])
//! };
//!
//! let config = EvolutionConfig {
//!     population_size: 50,
//!     generations: 5,
//!     ..EvolutionConfig::default()
//! };
//! let outcome = Engine::new(Arc::new(pset), config, target)?.run()?;
//! assert_eq!(outcome.logbook.len(), 6);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod compiler;
mod crossover;
mod evolution;
mod fitness;
mod generate;
mod hall_of_fame;
mod individual;
mod mutation;
mod primitives;
mod selection;
mod statistics;
mod tree;

pub use compiler::{CompileError, Program, compile};
pub use crossover::{CrossoverConfig, crossover, swap_subtrees};
pub use evolution::{Engine, EvaluationPolicy, EvolutionConfig, EvolutionError, Outcome};
pub use fitness::{Evaluate, Fitness, evaluate_indices};
pub use generate::{DepthRange, GenerationError, InitConfig, Method, generate, generate_typed};
pub use hall_of_fame::HallOfFame;
pub use individual::Individual;
pub use mutation::{MutationConfig, mutate};
pub use primitives::{Operation, Primitive, PrimitiveSet, Terminal, TerminalKind, Ty};
pub use selection::{SelectionConfig, select_tournament};
pub use statistics::{Logbook, Record, Statistics, max, mean, min, std_dev};
pub use tree::{Node, NodeKind, Tree, TreeDisplay, TreeError};
