//! Output formatting utilities for CLI.

use serde::Serialize;
use std::fmt::Write;
use treegp::gp::{EvolutionConfig, Individual, Logbook, Outcome, Tree};

/// JSON-serializable run result.
#[derive(Debug, Serialize)]
pub(super) struct JsonRun<'a> {
    /// Configuration the run used.
    pub(super) config: &'a EvolutionConfig,
    /// One record per generation.
    pub(super) logbook: &'a Logbook,
    /// Hall of fame, best first.
    pub(super) hall_of_fame: Vec<JsonIndividual>,
}

/// JSON-serializable individual.
#[derive(Debug, Serialize)]
pub(super) struct JsonIndividual {
    /// Expression in `name(arg, arg)` form.
    pub(super) expression: String,
    /// Raw objective values (null if unevaluated).
    pub(super) fitness: Option<Vec<f64>>,
    /// Node count.
    pub(super) size: usize,
    /// Tree height.
    pub(super) depth: usize,
}

impl<'a> JsonRun<'a> {
    /// Create from a finished run.
    pub(super) fn from_outcome(config: &'a EvolutionConfig, outcome: &'a Outcome) -> Self {
        Self {
            config,
            logbook: &outcome.logbook,
            hall_of_fame: outcome
                .hall_of_fame
                .iter()
                .map(JsonIndividual::from_individual)
                .collect(),
        }
    }
}

impl JsonIndividual {
    /// Create from an individual.
    pub(super) fn from_individual(individual: &Individual) -> Self {
        Self {
            expression: individual.to_string(),
            fitness: individual.fitness().values().map(<[f64]>::to_vec),
            size: individual.tree().len(),
            depth: individual.tree().depth(),
        }
    }
}

/// Format a logbook as an aligned table.
pub(super) fn format_logbook_text(logbook: &Logbook) -> String {
    let mut output = String::new();
    let Some(first) = logbook.records().first() else {
        return output;
    };

    let _ = write!(output, "{:>5} {:>7}", "gen", "nevals");
    for (name, _) in &first.values {
        let _ = write!(output, " {name:>14}");
    }
    output.push('\n');

    for record in logbook.records() {
        let _ = write!(output, "{:>5} {:>7}", record.generation, record.evaluations);
        for (_, value) in &record.values {
            let _ = write!(output, " {value:>14.6}");
        }
        output.push('\n');
    }

    output
}

/// Format one generated tree as a text line.
pub(super) fn format_tree_line(tree: &Tree, expression: &str) -> String {
    format!(
        "[size {:>3} depth {:>2}] {expression}",
        tree.len(),
        tree.depth()
    )
}
