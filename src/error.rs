//! Error types shared across the engine.
//!
//! Setup errors are fatal and surface before the first generation runs.
//! Evaluation errors are local to one individual; the evolution loop decides
//! what to do with them according to its [`EvaluationPolicy`].
//!
//! [`EvaluationPolicy`]: crate::gp::EvaluationPolicy

use crate::gp::Ty;
use std::fmt;

/// Configuration error detected while building a primitive set or an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// Declared arity does not match the operation's parameter count.
    ArityMismatch {
        /// Name of the offending primitive.
        name: String,
        /// Arity declared at registration.
        declared: usize,
        /// Parameter count of the supplied operation.
        actual: usize,
    },
    /// A primitive, terminal or argument with this name already exists.
    DuplicateName(String),
    /// Tried to rename an argument that the set does not declare.
    UnknownArgument(String),
    /// A primitive argument type that no terminal or primitive can produce.
    UnsatisfiableType {
        /// Primitive whose argument cannot be filled.
        primitive: String,
        /// The unsatisfiable type.
        ty: Ty,
    },
    /// A configuration value outside its valid range.
    InvalidParameter(String),
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArityMismatch {
                name,
                declared,
                actual,
            } => write!(
                f,
                "primitive '{name}' declared with arity {declared} but its operation takes {actual}"
            ),
            Self::DuplicateName(name) => write!(f, "name '{name}' is already registered"),
            Self::UnknownArgument(name) => write!(f, "no argument named '{name}'"),
            Self::UnsatisfiableType { primitive, ty } => {
                write!(f, "no terminal of type {ty} required by '{primitive}'")
            }
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
        }
    }
}

impl std::error::Error for SetupError {}

/// Failure while evaluating one individual.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// The compiled program was called with the wrong number of inputs.
    ArgumentCount {
        /// Inputs the primitive set declares.
        expected: usize,
        /// Inputs supplied by the caller.
        got: usize,
    },
    /// A user operation rejected its operands.
    Domain {
        /// Name of the failing primitive.
        primitive: String,
        /// Reason reported by the operation.
        reason: String,
    },
    /// The fitness function returned a different number of objectives than weights.
    ObjectiveCount {
        /// Number of fitness weights.
        expected: usize,
        /// Number of values returned.
        got: usize,
    },
    /// The tree could not be compiled against its primitive set.
    Compile(String),
    /// Free-form failure raised by a fitness function.
    Failed(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArgumentCount { expected, got } => {
                write!(f, "expected {expected} inputs, got {got}")
            }
            Self::Domain { primitive, reason } => write!(f, "{primitive}: {reason}"),
            Self::ObjectiveCount { expected, got } => {
                write!(f, "expected {expected} objective values, got {got}")
            }
            Self::Compile(msg) => write!(f, "compile error: {msg}"),
            Self::Failed(msg) => write!(f, "evaluation failed: {msg}"),
        }
    }
}

impl std::error::Error for EvalError {}

/// Result type for evaluation of a single individual.
pub type EvalResult<T> = Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_error_display() {
        let err = SetupError::ArityMismatch {
            name: "add".to_string(),
            declared: 3,
            actual: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("add"));
        assert!(msg.contains('3'));
        assert!(msg.contains('2'));
    }

    #[test]
    fn test_eval_error_display() {
        let err = EvalError::Domain {
            primitive: "log".to_string(),
            reason: "negative operand".to_string(),
        };
        assert_eq!(err.to_string(), "log: negative operand");
    }
}
