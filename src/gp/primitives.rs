//! Registry of the operations and terminals that trees are built from.
//!
//! A [`PrimitiveSet`] is built once, validated, and then shared read-only
//! (behind an `Arc`) by every individual of a run. Nodes refer to its
//! entries by index, so the set must not change while trees built from it
//! are alive.

use crate::error::SetupError;
use rand::RngCore;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Type tag of the values flowing between nodes.
///
/// Untyped sets use [`Ty::ANY`] everywhere, so any node can fill any slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ty(&'static str);

impl Ty {
    /// The single type of an untyped primitive set.
    pub const ANY: Self = Self("any");

    /// Create a named type tag.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Name of this type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

type UnaryFn = dyn Fn(f64) -> f64 + Send + Sync;
type BinaryFn = dyn Fn(f64, f64) -> f64 + Send + Sync;
type CheckedFn = dyn Fn(&[f64]) -> Result<f64, String> + Send + Sync;
type SampleFn = dyn Fn(&mut dyn RngCore) -> f64 + Send + Sync;

/// Executable body of a primitive.
///
/// The variant fixes the parameter count, which is checked against the
/// arity declared at registration.
#[derive(Clone)]
pub enum Operation {
    /// One operand, infallible.
    Unary(Arc<UnaryFn>),
    /// Two operands, infallible.
    Binary(Arc<BinaryFn>),
    /// Any number of operands; an `Err` becomes an evaluation failure.
    Checked {
        /// Number of operands the function expects.
        arity: usize,
        /// The function itself.
        func: Arc<CheckedFn>,
    },
}

impl Operation {
    /// Wrap a one-operand function.
    #[must_use]
    pub fn unary(func: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        Self::Unary(Arc::new(func))
    }

    /// Wrap a two-operand function.
    #[must_use]
    pub fn binary(func: impl Fn(f64, f64) -> f64 + Send + Sync + 'static) -> Self {
        Self::Binary(Arc::new(func))
    }

    /// Wrap a fallible function over `arity` operands.
    #[must_use]
    pub fn checked(
        arity: usize,
        func: impl Fn(&[f64]) -> Result<f64, String> + Send + Sync + 'static,
    ) -> Self {
        Self::Checked {
            arity,
            func: Arc::new(func),
        }
    }

    /// Number of operands this operation consumes.
    #[must_use]
    pub fn arity(&self) -> usize {
        match self {
            Self::Unary(_) => 1,
            Self::Binary(_) => 2,
            Self::Checked { arity, .. } => *arity,
        }
    }

    /// Apply the operation to its operands.
    ///
    /// # Errors
    ///
    /// Returns the reason reported by a checked operation, or an operand
    /// count mismatch.
    pub fn apply(&self, args: &[f64]) -> Result<f64, String> {
        match (self, args) {
            (Self::Unary(func), [a]) => Ok(func(*a)),
            (Self::Binary(func), [a, b]) => Ok(func(*a, *b)),
            (Self::Checked { arity, func }, _) if args.len() == *arity => func(args),
            _ => Err(format!(
                "expected {} operands, got {}",
                self.arity(),
                args.len()
            )),
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unary(_) => f.write_str("Unary"),
            Self::Binary(_) => f.write_str("Binary"),
            Self::Checked { arity, .. } => write!(f, "Checked({arity})"),
        }
    }
}

/// A named operation usable as an internal tree node.
#[derive(Debug, Clone)]
pub struct Primitive {
    name: String,
    args: Vec<Ty>,
    ret: Ty,
    op: Operation,
}

impl Primitive {
    /// Registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of children a node of this primitive has.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Types of the arguments, in order.
    #[must_use]
    pub fn args(&self) -> &[Ty] {
        &self.args
    }

    /// Type of the produced value.
    #[must_use]
    pub fn ret(&self) -> Ty {
        self.ret
    }

    /// The executable body.
    #[must_use]
    pub fn operation(&self) -> &Operation {
        &self.op
    }
}

/// What a terminal evaluates to.
#[derive(Clone)]
pub enum TerminalKind {
    /// A fixed value.
    Constant(f64),
    /// The input argument at this position.
    Argument(usize),
    /// A value sampled once when a node is created, then frozen in the node.
    Ephemeral(Arc<SampleFn>),
}

impl fmt::Debug for TerminalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => write!(f, "Constant({value})"),
            Self::Argument(position) => write!(f, "Argument({position})"),
            Self::Ephemeral(_) => f.write_str("Ephemeral"),
        }
    }
}

/// A zero-arity entry of the set.
#[derive(Debug, Clone)]
pub struct Terminal {
    name: String,
    ret: Ty,
    kind: TerminalKind,
}

impl Terminal {
    /// Registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type of the produced value.
    #[must_use]
    pub fn ret(&self) -> Ty {
        self.ret
    }

    /// Constant, argument or ephemeral.
    #[must_use]
    pub fn kind(&self) -> &TerminalKind {
        &self.kind
    }
}

/// Typed registry of primitives and terminals.
#[derive(Debug, Clone)]
pub struct PrimitiveSet {
    name: String,
    ret: Ty,
    primitives: Vec<Primitive>,
    terminals: Vec<Terminal>,
    names: HashSet<String>,
    primitives_by_type: HashMap<Ty, Vec<usize>>,
    terminals_by_type: HashMap<Ty, Vec<usize>>,
    /// Terminal index of each input, by position.
    arguments: Vec<usize>,
}

impl PrimitiveSet {
    /// Create an untyped set whose trees take `arity` inputs named `ARG0`, `ARG1`, ...
    #[must_use]
    pub fn new(name: &str, arity: usize) -> Self {
        Self::typed(name, &vec![Ty::ANY; arity], Ty::ANY)
    }

    /// Create a typed set whose trees take inputs of `inputs` types and produce `ret`.
    #[must_use]
    pub fn typed(name: &str, inputs: &[Ty], ret: Ty) -> Self {
        let mut set = Self {
            name: name.to_string(),
            ret,
            primitives: Vec::new(),
            terminals: Vec::new(),
            names: HashSet::new(),
            primitives_by_type: HashMap::new(),
            terminals_by_type: HashMap::new(),
            arguments: Vec::with_capacity(inputs.len()),
        };
        for (position, &ty) in inputs.iter().enumerate() {
            let name = format!("ARG{position}");
            set.names.insert(name.clone());
            let index = set.push_terminal(Terminal {
                name,
                ret: ty,
                kind: TerminalKind::Argument(position),
            });
            set.arguments.push(index);
        }
        set
    }

    /// Register an untyped primitive.
    ///
    /// # Errors
    ///
    /// Fails if `arity` differs from the operation's operand count or the
    /// name is taken.
    pub fn add_primitive(
        &mut self,
        name: &str,
        arity: usize,
        op: Operation,
    ) -> Result<(), SetupError> {
        self.add_typed_primitive(name, op, &vec![Ty::ANY; arity], Ty::ANY)
    }

    /// Register a primitive taking `args` and producing `ret`.
    ///
    /// # Errors
    ///
    /// Fails if `args.len()` differs from the operation's operand count, if
    /// the operation takes no operands, or if the name is taken.
    pub fn add_typed_primitive(
        &mut self,
        name: &str,
        op: Operation,
        args: &[Ty],
        ret: Ty,
    ) -> Result<(), SetupError> {
        if args.is_empty() || args.len() != op.arity() {
            return Err(SetupError::ArityMismatch {
                name: name.to_string(),
                declared: args.len(),
                actual: op.arity(),
            });
        }
        self.claim_name(name)?;
        let index = self.primitives.len();
        self.primitives.push(Primitive {
            name: name.to_string(),
            args: args.to_vec(),
            ret,
            op,
        });
        self.primitives_by_type.entry(ret).or_default().push(index);
        Ok(())
    }

    /// Register an untyped constant terminal.
    ///
    /// # Errors
    ///
    /// Fails if the name is taken.
    pub fn add_terminal(&mut self, name: &str, value: f64) -> Result<(), SetupError> {
        self.add_typed_terminal(name, value, Ty::ANY)
    }

    /// Register a constant terminal of type `ty`.
    ///
    /// # Errors
    ///
    /// Fails if the name is taken.
    pub fn add_typed_terminal(&mut self, name: &str, value: f64, ty: Ty) -> Result<(), SetupError> {
        self.claim_name(name)?;
        self.push_terminal(Terminal {
            name: name.to_string(),
            ret: ty,
            kind: TerminalKind::Constant(value),
        });
        Ok(())
    }

    /// Register an untyped ephemeral constant drawn from `sample`.
    ///
    /// # Errors
    ///
    /// Fails if the name is taken.
    pub fn add_ephemeral_constant(
        &mut self,
        name: &str,
        sample: impl Fn(&mut dyn RngCore) -> f64 + Send + Sync + 'static,
    ) -> Result<(), SetupError> {
        self.add_typed_ephemeral_constant(name, Ty::ANY, sample)
    }

    /// Register an ephemeral constant of type `ty` drawn from `sample`.
    ///
    /// # Errors
    ///
    /// Fails if the name is taken.
    pub fn add_typed_ephemeral_constant(
        &mut self,
        name: &str,
        ty: Ty,
        sample: impl Fn(&mut dyn RngCore) -> f64 + Send + Sync + 'static,
    ) -> Result<(), SetupError> {
        self.claim_name(name)?;
        self.push_terminal(Terminal {
            name: name.to_string(),
            ret: ty,
            kind: TerminalKind::Ephemeral(Arc::new(sample)),
        });
        Ok(())
    }

    /// Rename input arguments, e.g. `[("ARG0", "x")]`.
    ///
    /// # Errors
    ///
    /// Fails if an old name is not an argument or a new name is taken; the
    /// set is left unchanged in that case.
    pub fn rename_arguments(&mut self, mapping: &[(&str, &str)]) -> Result<(), SetupError> {
        let mut renames = Vec::with_capacity(mapping.len());
        let mut names = self.names.clone();
        for &(old, new) in mapping {
            let index = self
                .arguments
                .iter()
                .copied()
                .find(|&i| self.terminals[i].name == old)
                .ok_or_else(|| SetupError::UnknownArgument(old.to_string()))?;
            names.remove(old);
            if !names.insert(new.to_string()) {
                return Err(SetupError::DuplicateName(new.to_string()));
            }
            renames.push((index, new.to_string()));
        }
        for (index, new) in renames {
            self.terminals[index].name = new;
        }
        self.names = names;
        Ok(())
    }

    /// Check that every argument type of every primitive, and the set's own
    /// return type, has at least one terminal.
    ///
    /// Generation closes every branch with a terminal, so a type that only
    /// primitives produce cannot appear in a finite tree.
    ///
    /// # Errors
    ///
    /// Returns the first unsatisfiable type found.
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.terminals_of(self.ret).is_empty() {
            return Err(SetupError::UnsatisfiableType {
                primitive: self.name.clone(),
                ty: self.ret,
            });
        }
        for primitive in &self.primitives {
            if let Some(&ty) = primitive
                .args
                .iter()
                .find(|&&ty| self.terminals_of(ty).is_empty())
            {
                return Err(SetupError::UnsatisfiableType {
                    primitive: primitive.name.clone(),
                    ty,
                });
            }
        }
        Ok(())
    }

    /// Name given at construction.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type produced by complete trees.
    #[must_use]
    pub fn ret(&self) -> Ty {
        self.ret
    }

    /// Number of inputs a compiled tree takes.
    #[must_use]
    pub fn input_count(&self) -> usize {
        self.arguments.len()
    }

    /// Current names of the inputs, by position.
    #[must_use]
    pub fn argument_names(&self) -> Vec<&str> {
        self.arguments
            .iter()
            .map(|&i| self.terminals[i].name.as_str())
            .collect()
    }

    /// All primitives, indexed as nodes refer to them.
    #[must_use]
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// All terminals, indexed as nodes refer to them.
    #[must_use]
    pub fn terminals(&self) -> &[Terminal] {
        &self.terminals
    }

    /// Primitive at `index`, if any.
    #[must_use]
    pub fn primitive(&self, index: usize) -> Option<&Primitive> {
        self.primitives.get(index)
    }

    /// Terminal at `index`, if any.
    #[must_use]
    pub fn terminal(&self, index: usize) -> Option<&Terminal> {
        self.terminals.get(index)
    }

    /// Indices of the primitives returning `ty`.
    #[must_use]
    pub fn primitives_of(&self, ty: Ty) -> &[usize] {
        self.primitives_by_type.get(&ty).map_or(&[], Vec::as_slice)
    }

    /// Indices of the terminals returning `ty`.
    #[must_use]
    pub fn terminals_of(&self, ty: Ty) -> &[usize] {
        self.terminals_by_type.get(&ty).map_or(&[], Vec::as_slice)
    }

    fn claim_name(&mut self, name: &str) -> Result<(), SetupError> {
        if self.names.insert(name.to_string()) {
            Ok(())
        } else {
            Err(SetupError::DuplicateName(name.to_string()))
        }
    }

    fn push_terminal(&mut self, terminal: Terminal) -> usize {
        let index = self.terminals.len();
        self.terminals_by_type
            .entry(terminal.ret)
            .or_default()
            .push(index);
        self.terminals.push(terminal);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn arithmetic() -> PrimitiveSet {
        let mut pset = PrimitiveSet::new("MAIN", 1);
        pset.add_primitive("add", 2, Operation::binary(|a, b| a + b))
            .unwrap();
        pset.add_primitive("neg", 1, Operation::unary(|a| -a)).unwrap();
        pset
    }

    #[test]
    fn test_arguments_are_terminals() {
        let pset = PrimitiveSet::new("MAIN", 2);
        assert_eq!(pset.input_count(), 2);
        assert_eq!(pset.argument_names(), vec!["ARG0", "ARG1"]);
        assert_eq!(pset.terminals_of(Ty::ANY).len(), 2);
        assert!(pset.primitives_of(Ty::ANY).is_empty());
    }

    #[test]
    fn test_partition_by_arity() {
        let mut pset = arithmetic();
        pset.add_terminal("one", 1.0).unwrap();
        assert_eq!(pset.primitives_of(Ty::ANY).len(), 2);
        assert_eq!(pset.terminals_of(Ty::ANY).len(), 2);
    }

    #[test]
    fn test_arity_mismatch_rejected() {
        let mut pset = PrimitiveSet::new("MAIN", 1);
        let result = pset.add_primitive("add", 3, Operation::binary(|a, b| a + b));
        assert!(matches!(
            result,
            Err(SetupError::ArityMismatch {
                declared: 3,
                actual: 2,
                ..
            })
        ));
        assert!(pset.primitives().is_empty());
    }

    #[test]
    fn test_zero_arity_primitive_rejected() {
        let mut pset = PrimitiveSet::new("MAIN", 1);
        let result = pset.add_primitive("nothing", 0, Operation::checked(0, |_| Ok(1.0)));
        assert!(matches!(result, Err(SetupError::ArityMismatch { .. })));
    }

    #[test]
    fn test_name_collision_rejected() {
        let mut pset = arithmetic();
        let result = pset.add_primitive("add", 2, Operation::binary(|a, b| a * b));
        assert_eq!(result, Err(SetupError::DuplicateName("add".to_string())));

        let result = pset.add_terminal("ARG0", 1.0);
        assert_eq!(result, Err(SetupError::DuplicateName("ARG0".to_string())));
    }

    #[test]
    fn test_rename_arguments() {
        let mut pset = arithmetic();
        pset.rename_arguments(&[("ARG0", "x")]).unwrap();
        assert_eq!(pset.argument_names(), vec!["x"]);

        // The old name is free again, the new one is taken.
        pset.add_terminal("ARG0", 0.0).unwrap();
        assert!(pset.add_terminal("x", 0.0).is_err());
    }

    #[test]
    fn test_rename_unknown_argument() {
        let mut pset = arithmetic();
        let result = pset.rename_arguments(&[("ARG7", "y")]);
        assert_eq!(result, Err(SetupError::UnknownArgument("ARG7".to_string())));
        assert_eq!(pset.argument_names(), vec!["ARG0"]);
    }

    #[test]
    fn test_rename_into_collision_leaves_set_unchanged() {
        let mut pset = arithmetic();
        let result = pset.rename_arguments(&[("ARG0", "add")]);
        assert_eq!(result, Err(SetupError::DuplicateName("add".to_string())));
        assert_eq!(pset.argument_names(), vec!["ARG0"]);
    }

    #[test]
    fn test_ephemeral_sampling() {
        let mut pset = PrimitiveSet::new("MAIN", 0);
        pset.add_ephemeral_constant("rand101", |rng| f64::from(rng.gen_range(-1_i32..=1)))
            .unwrap();
        let terminal = &pset.terminals()[0];
        let TerminalKind::Ephemeral(sample) = terminal.kind() else {
            panic!("expected ephemeral terminal");
        };
        let mut rng = rand::rngs::mock::StepRng::new(0, 1);
        let value = sample(&mut rng);
        assert!((-1.0..=1.0).contains(&value));
    }

    #[test]
    fn test_typed_validation() {
        let boolean = Ty::new("bool");
        let mut pset = PrimitiveSet::typed("MAIN", &[Ty::new("float")], Ty::new("float"));
        pset.add_typed_primitive(
            "if",
            Operation::checked(3, |args| Ok(if args[0] > 0.0 { args[1] } else { args[2] })),
            &[boolean, Ty::new("float"), Ty::new("float")],
            Ty::new("float"),
        )
        .unwrap();
        assert_eq!(
            pset.validate(),
            Err(SetupError::UnsatisfiableType {
                primitive: "if".to_string(),
                ty: boolean,
            })
        );

        pset.add_typed_terminal("true", 1.0, boolean).unwrap();
        assert!(pset.validate().is_ok());
    }

    #[test]
    fn test_type_without_terminal_rejected() {
        let (float, boolean) = (Ty::new("float"), Ty::new("bool"));
        let mut pset = PrimitiveSet::typed("MAIN", &[float], float);
        pset.add_typed_primitive(
            "if",
            Operation::checked(3, |args| Ok(if args[0] > 0.0 { args[1] } else { args[2] })),
            &[boolean, float, float],
            float,
        )
        .unwrap();
        // bool is produced by `gt`, but nothing can end a bool branch.
        pset.add_typed_primitive(
            "gt",
            Operation::binary(|a, b| if a > b { 1.0 } else { 0.0 }),
            &[float, float],
            boolean,
        )
        .unwrap();
        assert_eq!(
            pset.validate(),
            Err(SetupError::UnsatisfiableType {
                primitive: "if".to_string(),
                ty: boolean,
            })
        );
    }

    #[test]
    fn test_operation_apply() {
        let add = Operation::binary(|a, b| a + b);
        assert_eq!(add.apply(&[1.0, 2.0]), Ok(3.0));
        assert!(add.apply(&[1.0]).is_err());

        let sqrt = Operation::checked(1, |args| {
            if args[0] < 0.0 {
                Err("negative operand".to_string())
            } else {
                Ok(args[0].sqrt())
            }
        });
        assert_eq!(sqrt.apply(&[4.0]), Ok(2.0));
        assert_eq!(sqrt.apply(&[-4.0]), Err("negative operand".to_string()));
    }
}
