//! CLI command implementations for treegp.

pub(crate) mod generate;
pub(crate) mod symreg;

mod output;

use clap::ValueEnum;
use std::error::Error;
use std::fmt;
use treegp::SetupError;
use treegp::gp::{EvolutionError, GenerationError};

/// Output format for commands that print results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Primitive set to evolve with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum PrimitiveChoice {
    /// add, sub, mul, div, neg.
    Arithmetic,
    /// Arithmetic plus cos, sin and an ephemeral constant in {-1, 0, 1}.
    Trigonometric,
}

impl PrimitiveChoice {
    /// Build the chosen set.
    pub(crate) fn build(self) -> Result<treegp::gp::PrimitiveSet, CliError> {
        let pset = match self {
            Self::Arithmetic => treegp::symreg::arithmetic_set()?,
            Self::Trigonometric => treegp::symreg::trigonometric_set()?,
        };
        Ok(pset)
    }
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<SetupError> for CliError {
    fn from(e: SetupError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<GenerationError> for CliError {
    fn from(e: GenerationError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<EvolutionError> for CliError {
    fn from(e: EvolutionError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(format!("JSON serialization failed: {e}"))
    }
}
