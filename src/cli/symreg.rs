//! The `symreg` command: evolve an expression for the quartic benchmark.

use super::output::{JsonRun, format_logbook_text};
use super::{CliError, OutputFormat, PrimitiveChoice};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use treegp::gp::{Engine, EvaluationPolicy, EvolutionConfig};
use treegp::symreg::Regression;

/// Arguments of the `symreg` command. Flags override the config file,
/// which overrides the defaults.
#[derive(clap::Args, Debug)]
pub(crate) struct SymregArgs {
    /// JSON configuration file (missing fields keep their defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Random seed (default: 318)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Population size (default: 100)
    #[arg(short, long)]
    population: Option<usize>,

    /// Number of generations (default: 40)
    #[arg(short, long)]
    generations: Option<usize>,

    /// Crossover probability per pair (default: 0.5)
    #[arg(long)]
    cxpb: Option<f64>,

    /// Mutation probability per individual (default: 0.1)
    #[arg(long)]
    mutpb: Option<f64>,

    /// Tournament size (default: 3)
    #[arg(short = 'k', long)]
    tournament_size: Option<usize>,

    /// Hall of fame size (default: 1)
    #[arg(long)]
    hall_of_fame: Option<usize>,

    /// Primitive set to evolve with
    #[arg(long, default_value = "trigonometric")]
    primitives: PrimitiveChoice,

    /// Give failing individuals the worst fitness instead of aborting
    #[arg(long)]
    lenient: bool,

    /// Evaluate individuals in parallel
    #[arg(short = 'j', long)]
    parallel: bool,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Show progress bar
    #[arg(long)]
    progress: bool,
}

impl SymregArgs {
    /// Layer the flags over the config file over the defaults.
    fn resolve_config(&self) -> Result<EvolutionConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => EvolutionConfig::from_json_file(path)?,
            None => EvolutionConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(population) = self.population {
            config.population_size = population;
        }
        if let Some(generations) = self.generations {
            config.generations = generations;
        }
        if let Some(cxpb) = self.cxpb {
            config.crossover.probability = cxpb;
        }
        if let Some(mutpb) = self.mutpb {
            config.mutation.probability = mutpb;
        }
        if let Some(size) = self.tournament_size {
            config.selection.tournament_size = size;
        }
        if let Some(size) = self.hall_of_fame {
            config.hall_of_fame_size = size;
        }
        if self.lenient {
            config.policy = EvaluationPolicy::Lenient;
        }
        if self.parallel {
            config.parallel_evaluation = true;
        }
        Ok(config)
    }
}

/// Execute the symreg command.
pub(crate) fn execute(args: &SymregArgs) -> Result<(), CliError> {
    let config = args.resolve_config()?;
    let pset = Arc::new(args.primitives.build()?);
    info!(
        "evolving {} individuals for {} generations (seed {})",
        config.population_size, config.generations, config.seed
    );

    let pb = if args.progress {
        let pb = ProgressBar::new(config.generations as u64 + 1);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} generations {msg}")
                .map_err(|e| CliError::new(format!("progress template: {e}")))?
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let start = Instant::now();
    let mut engine = Engine::new(pset, config, Regression::quartic())?;
    let outcome = engine.run_observed(|record| {
        if let Some(pb) = &pb {
            if let Some(min) = record.get("min") {
                pb.set_message(format!("min {min:.6}"));
            }
            pb.inc(1);
        }
    })?;
    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }
    let duration = start.elapsed();

    match args.format {
        OutputFormat::Text => {
            print!("{}", format_logbook_text(&outcome.logbook));
            println!();
            for (rank, individual) in outcome.hall_of_fame.iter().enumerate() {
                let error = individual
                    .fitness()
                    .values()
                    .and_then(|values| values.first().copied())
                    .unwrap_or(f64::NAN);
                println!("#{} {individual}  (error {error:.6})", rank + 1);
            }
            println!();
            println!("Duration: {:.2}s", duration.as_secs_f64());
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&JsonRun::from_outcome(engine.config(), &outcome))?;
            println!("{json}");
        }
    }

    Ok(())
}
