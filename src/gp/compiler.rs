//! Compile trees into callable programs.
//!
//! Compilation resolves every node against the primitive set once and lays
//! the tree out in postfix order, so a call is a single pass over a flat
//! instruction list with an operand stack. The program borrows the set;
//! nothing is rebuilt per call.

use super::primitives::{Primitive, PrimitiveSet, TerminalKind};
use super::tree::{NodeKind, Tree};
use crate::error::{EvalError, EvalResult};
use std::fmt;

/// Failure resolving a tree against a primitive set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileError {
    /// A node refers to a primitive the set does not have.
    UnknownPrimitive(usize),
    /// A node refers to a terminal the set does not have.
    UnknownTerminal(usize),
    /// A node's arity differs from its primitive's.
    ArityMismatch {
        /// Position of the node in the tree.
        index: usize,
        /// Arity of the primitive.
        expected: usize,
        /// Arity recorded in the node.
        found: usize,
    },
    /// An argument node points at a terminal that is not an argument, or
    /// at an input position outside the set.
    BadArgument(usize),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPrimitive(index) => write!(f, "unknown primitive #{index}"),
            Self::UnknownTerminal(index) => write!(f, "unknown terminal #{index}"),
            Self::ArityMismatch {
                index,
                expected,
                found,
            } => write!(
                f,
                "node {index} has {found} children but its primitive takes {expected}"
            ),
            Self::BadArgument(index) => write!(f, "invalid input reference at node {index}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<CompileError> for EvalError {
    fn from(e: CompileError) -> Self {
        Self::Compile(e.to_string())
    }
}

#[derive(Debug, Clone, Copy)]
enum Instruction<'a> {
    Constant(f64),
    Input(usize),
    Apply(&'a Primitive),
}

/// A compiled tree.
#[derive(Debug, Clone)]
pub struct Program<'a> {
    code: Vec<Instruction<'a>>,
    inputs: usize,
}

/// Compile `tree` against `pset`.
///
/// # Errors
///
/// Fails if a node refers to something `pset` does not contain.
pub fn compile<'a>(tree: &Tree, pset: &'a PrimitiveSet) -> Result<Program<'a>, CompileError> {
    let mut code = Vec::with_capacity(tree.len());
    emit(tree, 0, pset, &mut code)?;
    Ok(Program {
        code,
        inputs: pset.input_count(),
    })
}

/// Emit the subtree at `index` in postfix order.
fn emit<'a>(
    tree: &Tree,
    index: usize,
    pset: &'a PrimitiveSet,
    code: &mut Vec<Instruction<'a>>,
) -> Result<(), CompileError> {
    let node = tree.nodes()[index];
    match node.kind() {
        NodeKind::Primitive(p) => {
            let primitive = pset.primitive(p).ok_or(CompileError::UnknownPrimitive(p))?;
            if primitive.arity() != node.arity() {
                return Err(CompileError::ArityMismatch {
                    index,
                    expected: primitive.arity(),
                    found: node.arity(),
                });
            }
            let mut child = index + 1;
            for _ in 0..node.arity() {
                emit(tree, child, pset, code)?;
                child += tree.nodes()[child].size();
            }
            code.push(Instruction::Apply(primitive));
        }
        NodeKind::Terminal(t) => {
            let terminal = pset.terminal(t).ok_or(CompileError::UnknownTerminal(t))?;
            code.push(match terminal.kind() {
                TerminalKind::Constant(value) => Instruction::Constant(*value),
                TerminalKind::Argument(position) if *position < pset.input_count() => {
                    Instruction::Input(*position)
                }
                TerminalKind::Argument(_) | TerminalKind::Ephemeral(_) => {
                    return Err(CompileError::BadArgument(index));
                }
            });
        }
        NodeKind::Ephemeral { terminal, value } => {
            pset.terminal(terminal)
                .ok_or(CompileError::UnknownTerminal(terminal))?;
            code.push(Instruction::Constant(value));
        }
    }
    Ok(())
}

impl Program<'_> {
    /// Number of inputs the program expects.
    #[must_use]
    pub fn inputs(&self) -> usize {
        self.inputs
    }

    /// Evaluate the program on `args`.
    ///
    /// # Errors
    ///
    /// Fails on a wrong input count, or when a checked primitive rejects its
    /// operands.
    pub fn call(&self, args: &[f64]) -> EvalResult<f64> {
        if args.len() != self.inputs {
            return Err(EvalError::ArgumentCount {
                expected: self.inputs,
                got: args.len(),
            });
        }
        let mut stack: Vec<f64> = Vec::with_capacity(self.code.len());
        for instruction in &self.code {
            match *instruction {
                Instruction::Constant(value) => stack.push(value),
                Instruction::Input(position) => stack.push(args[position]),
                Instruction::Apply(primitive) => {
                    let start = stack
                        .len()
                        .checked_sub(primitive.arity())
                        .ok_or_else(|| EvalError::Compile("operand stack underflow".to_string()))?;
                    let value = primitive.operation().apply(&stack[start..]).map_err(|reason| {
                        EvalError::Domain {
                            primitive: primitive.name().to_string(),
                            reason,
                        }
                    })?;
                    stack.truncate(start);
                    stack.push(value);
                }
            }
        }
        stack
            .pop()
            .ok_or_else(|| EvalError::Compile("empty program".to_string()))
    }

    /// The program as a plain closure.
    #[must_use]
    pub fn as_fn(&self) -> impl Fn(&[f64]) -> EvalResult<f64> + '_ {
        move |args| self.call(args)
    }
}
