//! Main evolution loop for genetic programming.
//!
//! [`Engine`] runs the simple generational algorithm: evaluate the initial
//! population, then for each generation select by tournament, mate
//! consecutive pairs, mutate, evaluate whatever lost its fitness, update
//! the hall of fame, replace the population and record statistics.
//!
//! Every random draw comes from the engine's one generator, in a fixed
//! order, so a seed fully determines a run. Parallel evaluation does not
//! change that: evaluation never touches the generator.

use super::crossover::{CrossoverConfig, crossover};
use super::fitness::{Evaluate, Fitness, evaluate_indices};
use super::generate::{GenerationError, InitConfig, generate};
use super::hall_of_fame::HallOfFame;
use super::individual::Individual;
use super::mutation::{MutationConfig, mutate};
use super::primitives::PrimitiveSet;
use super::selection::{SelectionConfig, select_tournament};
use super::statistics::{Logbook, Record, Statistics};
use crate::error::{EvalError, SetupError};
use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// What to do when evaluating an individual fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluationPolicy {
    /// Abort the run with the error.
    #[default]
    Strict,
    /// Log a warning and give the individual the worst possible fitness.
    Lenient,
}

/// Configuration for the evolution process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Population size.
    pub population_size: usize,
    /// Number of generations to run after the initial one.
    pub generations: usize,
    /// RNG seed for reproducibility.
    pub seed: u64,
    /// How the initial population is built.
    pub init: InitConfig,
    /// Selection configuration.
    pub selection: SelectionConfig,
    /// Crossover configuration.
    pub crossover: CrossoverConfig,
    /// Mutation configuration.
    pub mutation: MutationConfig,
    /// Number of individuals kept in the hall of fame.
    pub hall_of_fame_size: usize,
    /// Offspring taller than this are replaced by their parent.
    pub max_height: Option<usize>,
    /// Objective weights; negative minimizes.
    pub weights: Vec<f64>,
    /// Handling of evaluation failures.
    pub policy: EvaluationPolicy,
    /// Evaluate individuals on the rayon pool.
    pub parallel_evaluation: bool,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            generations: 40,
            seed: 318,
            init: InitConfig::default(),
            selection: SelectionConfig::default(),
            crossover: CrossoverConfig::default(),
            mutation: MutationConfig::default(),
            hall_of_fame_size: 1,
            max_height: Some(17),
            weights: vec![-1.0],
            policy: EvaluationPolicy::Strict,
            parallel_evaluation: false,
        }
    }
}

impl EvolutionConfig {
    /// Load a configuration from a JSON file. Missing fields take their
    /// default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<Self, EvolutionError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Check every parameter range.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::InvalidParameter`] naming the first bad value.
    pub fn validate(&self) -> Result<(), SetupError> {
        let invalid = |msg: String| Err(SetupError::InvalidParameter(msg));
        if self.population_size == 0 {
            return invalid("population_size must be at least 1".to_string());
        }
        for (name, p) in [
            ("crossover.probability", self.crossover.probability),
            ("mutation.probability", self.mutation.probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return invalid(format!("{name} must be within [0, 1], got {p}"));
            }
        }
        if self.selection.tournament_size == 0 {
            return invalid("selection.tournament_size must be at least 1".to_string());
        }
        for (name, depth) in [
            ("init.depth", self.init.depth),
            ("mutation.depth", self.mutation.depth),
        ] {
            if depth.min > depth.max {
                return invalid(format!(
                    "{name} minimum {} exceeds maximum {}",
                    depth.min, depth.max
                ));
            }
        }
        if self.max_height.is_some_and(|limit| limit < self.init.depth.max) {
            return invalid(format!(
                "max_height is below the initial tree height {}",
                self.init.depth.max
            ));
        }
        if self.weights.is_empty() {
            return invalid("weights must not be empty".to_string());
        }
        if let Some(w) = self.weights.iter().find(|w| !w.is_finite() || **w == 0.0) {
            return invalid(format!("weights must be finite and non-zero, got {w}"));
        }
        Ok(())
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Final population, all evaluated.
    pub population: Vec<Individual>,
    /// One record per generation, the initial one included.
    pub logbook: Logbook,
    /// Best individuals seen across the whole run.
    pub hall_of_fame: HallOfFame,
}

impl Outcome {
    /// Best individual ever evaluated, if the hall of fame kept any.
    #[must_use]
    pub fn best(&self) -> Option<&Individual> {
        self.hall_of_fame.best()
    }
}

/// The evolution engine.
pub struct Engine<E, R = SmallRng> {
    pset: Arc<PrimitiveSet>,
    config: EvolutionConfig,
    evaluator: E,
    statistics: Statistics,
    rng: R,
}

impl<E: Evaluate> Engine<E, SmallRng> {
    /// Engine seeded from `config.seed`.
    ///
    /// # Errors
    ///
    /// Fails if the configuration or the primitive set is invalid.
    pub fn new(
        pset: Arc<PrimitiveSet>,
        config: EvolutionConfig,
        evaluator: E,
    ) -> Result<Self, EvolutionError> {
        let rng = SmallRng::seed_from_u64(config.seed);
        Self::with_rng(pset, config, evaluator, rng)
    }
}

impl<E: Evaluate, R: Rng> Engine<E, R> {
    /// Engine drawing from a caller-supplied generator; `config.seed` is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Fails if the configuration or the primitive set is invalid.
    pub fn with_rng(
        pset: Arc<PrimitiveSet>,
        config: EvolutionConfig,
        evaluator: E,
        rng: R,
    ) -> Result<Self, EvolutionError> {
        config.validate()?;
        pset.validate()?;
        Ok(Self {
            pset,
            config,
            evaluator,
            statistics: Statistics::default(),
            rng,
        })
    }

    /// Replace the default statistics (avg, std, min, max of the first
    /// objective).
    #[must_use]
    pub fn with_statistics(mut self, statistics: Statistics) -> Self {
        self.statistics = statistics;
        self
    }

    /// The run configuration.
    #[must_use]
    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// The shared primitive set.
    #[must_use]
    pub fn pset(&self) -> &Arc<PrimitiveSet> {
        &self.pset
    }

    /// Generate the initial, unevaluated population.
    ///
    /// # Errors
    ///
    /// Fails if a tree cannot be generated.
    pub fn init_population(&mut self) -> Result<Vec<Individual>, EvolutionError> {
        let init = self.config.init;
        (0..self.config.population_size)
            .map(|_| {
                let tree = generate(&self.pset, init.method, init.depth, &mut self.rng)?;
                Ok(Individual::new(
                    tree,
                    Arc::clone(&self.pset),
                    Fitness::new(self.config.weights.clone()),
                ))
            })
            .collect()
    }

    /// Generate a population and evolve it.
    ///
    /// # Errors
    ///
    /// See [`Engine::evolve`].
    pub fn run(&mut self) -> Result<Outcome, EvolutionError> {
        self.run_observed(|_| {})
    }

    /// Like [`Engine::run`], calling `observer` after each generation.
    ///
    /// # Errors
    ///
    /// See [`Engine::evolve`].
    pub fn run_observed<O: FnMut(&Record)>(&mut self, observer: O) -> Result<Outcome, EvolutionError> {
        let population = self.init_population()?;
        self.evolve(population, observer)
    }

    /// Evolve `population` for the configured number of generations.
    ///
    /// # Errors
    ///
    /// Fails if an evaluation fails under [`EvaluationPolicy::Strict`].
    pub fn evolve<O: FnMut(&Record)>(
        &mut self,
        mut population: Vec<Individual>,
        mut observer: O,
    ) -> Result<Outcome, EvolutionError> {
        let mut hall_of_fame = HallOfFame::new(self.config.hall_of_fame_size);
        let mut logbook = Logbook::new();

        let evaluations = self.evaluate_invalid(&mut population)?;
        hall_of_fame.update(&population);
        self.record(&mut logbook, 0, evaluations, &population, &mut observer);

        for generation in 1..=self.config.generations {
            let winners = select_tournament(
                &population,
                population.len(),
                self.config.selection.tournament_size,
                &mut self.rng,
            );
            let mut offspring: Vec<Individual> =
                winners.into_iter().map(|i| population[i].clone()).collect();

            self.vary(&mut offspring);

            let evaluations = self.evaluate_invalid(&mut offspring)?;
            hall_of_fame.update(&offspring);
            population = offspring;
            self.record(&mut logbook, generation, evaluations, &population, &mut observer);
        }

        Ok(Outcome {
            population,
            logbook,
            hall_of_fame,
        })
    }

    /// Evaluate every individual without a valid fitness; returns how many
    /// were evaluated.
    ///
    /// # Errors
    ///
    /// Under [`EvaluationPolicy::Strict`], the first failure in population
    /// order.
    pub fn evaluate_invalid(&self, population: &mut [Individual]) -> Result<usize, EvolutionError> {
        let pending: Vec<usize> = population
            .iter()
            .enumerate()
            .filter(|(_, ind)| !ind.fitness().is_valid())
            .map(|(i, _)| i)
            .collect();
        let results = evaluate_indices(
            &self.evaluator,
            population,
            &pending,
            self.config.parallel_evaluation,
        );

        for (&index, result) in pending.iter().zip(results) {
            let outcome = result.and_then(|values| population[index].fitness_mut().set_values(values));
            let Err(source) = outcome else {
                continue;
            };
            match self.config.policy {
                EvaluationPolicy::Strict => {
                    return Err(EvolutionError::Evaluation { index, source });
                }
                EvaluationPolicy::Lenient => {
                    warn!("individual {index} failed evaluation: {source}; assigning worst fitness");
                    population[index].fitness_mut().set_worst();
                }
            }
        }
        Ok(pending.len())
    }

    /// Crossover on consecutive pairs, then mutation on each offspring.
    ///
    /// An operator that cannot apply leaves its offspring unchanged.
    fn vary(&mut self, offspring: &mut [Individual]) {
        for pair in offspring.chunks_exact_mut(2) {
            if !self.rng.gen_bool(self.config.crossover.probability) {
                continue;
            }
            let [first, second] = pair else {
                continue;
            };
            let (left, right) = crossover(first, second, &mut self.rng);
            *first = self.limit_height(left, first);
            *second = self.limit_height(right, second);
        }

        let MutationConfig {
            probability,
            method,
            depth,
        } = self.config.mutation;
        for individual in offspring.iter_mut() {
            if !self.rng.gen_bool(probability) {
                continue;
            }
            match mutate(individual, method, depth, &mut self.rng) {
                Ok(mutant) => *individual = self.limit_height(mutant, individual),
                Err(e) => debug!("mutation skipped: {e}"),
            }
        }
    }

    /// `child`, unless it exceeds the height limit, in which case a copy of
    /// `parent`.
    fn limit_height(&self, child: Individual, parent: &Individual) -> Individual {
        match self.config.max_height {
            Some(limit) if child.tree().depth() > limit => {
                debug!(
                    "offspring of height {} exceeds limit {limit}; keeping parent",
                    child.tree().depth()
                );
                parent.clone()
            }
            _ => child,
        }
    }

    fn record<O: FnMut(&Record)>(
        &self,
        logbook: &mut Logbook,
        generation: usize,
        evaluations: usize,
        population: &[Individual],
        observer: &mut O,
    ) {
        let record = Record {
            generation,
            evaluations,
            values: self.statistics.compile(population),
        };
        info!("{record}");
        observer(&record);
        logbook.push(record);
    }
}

impl<E, R> fmt::Debug for Engine<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("pset", &self.pset.name())
            .field("config", &self.config)
            .field("statistics", &self.statistics)
            .finish_non_exhaustive()
    }
}

/// Error during evolution.
#[derive(Debug)]
pub enum EvolutionError {
    /// Invalid configuration or primitive set.
    Setup(SetupError),
    /// A tree could not be generated.
    Generation(GenerationError),
    /// Evaluating an individual failed under the strict policy.
    Evaluation {
        /// Position of the individual in its population.
        index: usize,
        /// The underlying failure.
        source: EvalError,
    },
    /// File I/O error.
    Io(std::io::Error),
    /// Malformed configuration file.
    Json(serde_json::Error),
}

impl fmt::Display for EvolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup(e) => write!(f, "setup error: {e}"),
            Self::Generation(e) => write!(f, "generation error: {e}"),
            Self::Evaluation { index, source } => {
                write!(f, "evaluation of individual {index} failed: {source}")
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Json(e) => write!(f, "config error: {e}"),
        }
    }
}

impl std::error::Error for EvolutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Setup(e) => Some(e),
            Self::Generation(e) => Some(e),
            Self::Evaluation { source, .. } => Some(source),
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
        }
    }
}

impl From<SetupError> for EvolutionError {
    fn from(e: SetupError) -> Self {
        Self::Setup(e)
    }
}

impl From<GenerationError> for EvolutionError {
    fn from(e: GenerationError) -> Self {
        Self::Generation(e)
    }
}

impl From<std::io::Error> for EvolutionError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for EvolutionError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
