//! Treegp CLI - evolve and inspect expression trees.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod cli;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

/// Treegp - A deterministic tree-based genetic programming engine
#[derive(Parser, Debug)]
#[command(name = "treegp")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Evolve an expression for x^4 + x^3 + x^2 + x
    Symreg(cli::symreg::SymregArgs),

    /// Print random trees
    Generate {
        /// Number of trees (default: 10)
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,

        /// Construction method: full, grow, or ramped
        #[arg(short, long, default_value = "ramped")]
        method: cli::generate::MethodArg,

        /// Minimum tree height (default: 1)
        #[arg(long, default_value = "1")]
        min_depth: usize,

        /// Maximum tree height (default: 3)
        #[arg(long, default_value = "3")]
        max_depth: usize,

        /// Random seed (default: random)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Primitive set to draw from
        #[arg(long, default_value = "trigonometric")]
        primitives: cli::PrimitiveChoice,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let result = match args.command {
        Commands::Symreg(symreg) => cli::symreg::execute(&symreg),

        Commands::Generate {
            count,
            method,
            min_depth,
            max_depth,
            seed,
            primitives,
            format,
        } => cli::generate::execute(count, method, min_depth, max_depth, seed, primitives, format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
