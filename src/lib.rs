// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Treegp: a deterministic tree-based genetic programming engine.
//!
//! This crate evolves expression trees for symbolic regression:
//! - Typed primitive sets with ephemeral constants
//! - Flat prefix-order trees with O(1) subtree ranges
//! - Seeded, bit-reproducible runs, with optional parallel evaluation
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Problems (symreg)                 │
//! ├─────────────────────────────────────┤
//! │   GP engine (gp)                    │
//! ├─────────────────────────────────────┤
//! │   Errors (error)                    │
//! └─────────────────────────────────────┘
//! ```

pub mod error;
pub mod gp;
pub mod symreg;

pub use error::{EvalError, EvalResult, SetupError};
