//! Random tree construction: Full, Grow and Ramped half-and-half.
//!
//! Trees are built iteratively with an explicit stack of `(depth, type)`
//! slots still to fill, emitting nodes in prefix order. Depths count edges
//! from the root, so a lone terminal has depth 0.

use super::primitives::{PrimitiveSet, TerminalKind, Ty};
use super::tree::{Node, Tree, TreeError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tree construction strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    /// Every leaf sits exactly at the chosen height.
    Full,
    /// Leaves may appear anywhere between the minimum depth and the chosen height.
    Grow,
    /// Full or Grow with equal probability.
    #[default]
    RampedHalfAndHalf,
}

/// Inclusive range of tree heights to draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthRange {
    /// Smallest height.
    pub min: usize,
    /// Largest height.
    pub max: usize,
}

impl DepthRange {
    /// Heights from `min` to `max`, both included.
    #[must_use]
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    /// Reject ranges with `min > max`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::InvalidDepth`].
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.min > self.max {
            Err(GenerationError::InvalidDepth {
                min: self.min,
                max: self.max,
            })
        } else {
            Ok(())
        }
    }
}

/// How initial trees are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitConfig {
    /// Construction strategy.
    pub method: Method,
    /// Heights to draw from.
    pub depth: DepthRange,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            method: Method::RampedHalfAndHalf,
            depth: DepthRange::new(1, 2),
        }
    }
}

/// Failure building a random tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationError {
    /// A slot of this type must be filled but no terminal produces it.
    NoTerminal(Ty),
    /// Minimum height above maximum height.
    InvalidDepth {
        /// Requested minimum.
        min: usize,
        /// Requested maximum.
        max: usize,
    },
    /// The emitted node sequence was not a tree.
    Malformed(TreeError),
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTerminal(ty) => write!(f, "no terminal of type {ty} available"),
            Self::InvalidDepth { min, max } => {
                write!(f, "minimum depth {min} exceeds maximum depth {max}")
            }
            Self::Malformed(e) => write!(f, "generated malformed tree: {e}"),
        }
    }
}

impl std::error::Error for GenerationError {}

impl From<TreeError> for GenerationError {
    fn from(e: TreeError) -> Self {
        Self::Malformed(e)
    }
}

/// Build a random tree producing the primitive set's return type.
///
/// # Errors
///
/// Fails on an invalid depth range, or when a slot's type has no terminal
/// and the height bound forces one.
pub fn generate<R: Rng>(
    pset: &PrimitiveSet,
    method: Method,
    depth: DepthRange,
    rng: &mut R,
) -> Result<Tree, GenerationError> {
    generate_typed(pset, method, depth, pset.ret(), rng)
}

/// Build a random tree whose root produces `ty`.
///
/// The height is drawn uniformly from `depth`; Ramped half-and-half then
/// flips a fair coin between Full and Grow.
///
/// # Errors
///
/// See [`generate`].
pub fn generate_typed<R: Rng>(
    pset: &PrimitiveSet,
    method: Method,
    depth: DepthRange,
    ty: Ty,
    rng: &mut R,
) -> Result<Tree, GenerationError> {
    depth.validate()?;
    let height = rng.gen_range(depth.min..=depth.max);
    let method = match method {
        Method::RampedHalfAndHalf => {
            if rng.gen_bool(0.5) {
                Method::Full
            } else {
                Method::Grow
            }
        }
        other => other,
    };
    build(pset, method, depth.min, height, ty, rng)
}

fn build<R: Rng>(
    pset: &PrimitiveSet,
    method: Method,
    min_depth: usize,
    height: usize,
    ty: Ty,
    rng: &mut R,
) -> Result<Tree, GenerationError> {
    let mut nodes = Vec::new();
    let mut open = vec![(0_usize, ty)];

    while let Some((depth, ty)) = open.pop() {
        let primitives = pset.primitives_of(ty);
        let terminals = pset.terminals_of(ty);

        let pick = if depth >= height || primitives.is_empty() {
            Pick::Terminal
        } else if method == Method::Full || depth < min_depth || terminals.is_empty() {
            Pick::Primitive
        } else {
            // Grow: every candidate of the right type is equally likely.
            let choice = rng.gen_range(0..primitives.len() + terminals.len());
            if choice < terminals.len() {
                Pick::TerminalAt(terminals[choice])
            } else {
                Pick::PrimitiveAt(primitives[choice - terminals.len()])
            }
        };

        let node = match pick {
            Pick::Terminal => {
                if terminals.is_empty() {
                    return Err(GenerationError::NoTerminal(ty));
                }
                let index = terminals[rng.gen_range(0..terminals.len())];
                instantiate_terminal(pset, index, rng)
            }
            Pick::TerminalAt(index) => instantiate_terminal(pset, index, rng),
            Pick::Primitive => {
                let index = primitives[rng.gen_range(0..primitives.len())];
                push_children(pset, index, depth, &mut open)
            }
            Pick::PrimitiveAt(index) => push_children(pset, index, depth, &mut open),
        };
        nodes.push(node);
    }

    Tree::from_nodes(nodes).map_err(GenerationError::from)
}

enum Pick {
    Terminal,
    TerminalAt(usize),
    Primitive,
    PrimitiveAt(usize),
}

/// Queue the argument slots of primitive `index` and return its node.
fn push_children(
    pset: &PrimitiveSet,
    index: usize,
    depth: usize,
    open: &mut Vec<(usize, Ty)>,
) -> Node {
    let primitive = &pset.primitives()[index];
    // Reversed so the first argument is popped first.
    open.extend(primitive.args().iter().rev().map(|&arg| (depth + 1, arg)));
    Node::primitive(index, primitive.arity(), primitive.ret())
}

/// Leaf for terminal `index`, sampling ephemerals now.
fn instantiate_terminal<R: Rng>(pset: &PrimitiveSet, index: usize, rng: &mut R) -> Node {
    let terminal = &pset.terminals()[index];
    match terminal.kind() {
        TerminalKind::Ephemeral(sample) => Node::ephemeral(index, sample(rng), terminal.ret()),
        TerminalKind::Constant(_) | TerminalKind::Argument(_) => {
            Node::terminal(index, terminal.ret())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::primitives::Operation;
    use crate::gp::tree::NodeKind;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn pset() -> PrimitiveSet {
        let mut pset = PrimitiveSet::new("MAIN", 1);
        pset.add_primitive("add", 2, Operation::binary(|a, b| a + b))
            .unwrap();
        pset.add_primitive("neg", 1, Operation::unary(|a| -a)).unwrap();
        pset.add_ephemeral_constant("rand101", |rng| f64::from(rng.gen_range(-1_i32..=1)))
            .unwrap();
        pset
    }

    #[test]
    fn test_full_leaves_at_exact_depth() {
        let pset = pset();
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..50 {
            let tree = generate(&pset, Method::Full, DepthRange::new(3, 3), &mut rng).unwrap();
            assert!(tree.is_well_formed());
            let depths = tree.node_depths();
            for (node, depth) in tree.nodes().iter().zip(depths) {
                if node.is_terminal() {
                    assert_eq!(depth, 3);
                } else {
                    assert!(depth < 3);
                }
            }
        }
    }

    #[test]
    fn test_grow_within_bounds() {
        let pset = pset();
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..100 {
            let tree = generate(&pset, Method::Grow, DepthRange::new(1, 4), &mut rng).unwrap();
            assert!(tree.is_well_formed());
            assert!(tree.depth() >= 1);
            assert!(tree.depth() <= 4);
        }
    }

    #[test]
    fn test_ramped_within_bounds() {
        let pset = pset();
        let mut rng = SmallRng::seed_from_u64(318);
        for _ in 0..100 {
            let tree = generate(
                &pset,
                Method::RampedHalfAndHalf,
                DepthRange::new(1, 2),
                &mut rng,
            )
            .unwrap();
            assert!((1..=2).contains(&tree.depth()));
        }
    }

    #[test]
    fn test_zero_depth_is_single_terminal() {
        let pset = pset();
        let mut rng = SmallRng::seed_from_u64(1);
        let tree = generate(&pset, Method::Full, DepthRange::new(0, 0), &mut rng).unwrap();
        assert_eq!(tree.len(), 1);
        assert!(tree.root().is_terminal());
    }

    #[test]
    fn test_same_seed_same_tree() {
        let pset = pset();
        let mut a = SmallRng::seed_from_u64(99);
        let mut b = SmallRng::seed_from_u64(99);
        for _ in 0..20 {
            let left = generate(&pset, Method::RampedHalfAndHalf, DepthRange::new(1, 5), &mut a);
            let right = generate(&pset, Method::RampedHalfAndHalf, DepthRange::new(1, 5), &mut b);
            assert_eq!(left, right);
        }
    }

    #[test]
    fn test_ephemeral_values_frozen() {
        let pset = pset();
        let mut rng = SmallRng::seed_from_u64(3);
        let tree = generate(&pset, Method::Full, DepthRange::new(4, 4), &mut rng).unwrap();
        for node in tree.nodes() {
            if let NodeKind::Ephemeral { value, .. } = node.kind() {
                assert!([-1.0, 0.0, 1.0].iter().any(|v| (v - value).abs() < f64::EPSILON));
            }
        }
    }

    #[test]
    fn test_invalid_depth() {
        let pset = pset();
        let mut rng = SmallRng::seed_from_u64(0);
        let result = generate(&pset, Method::Grow, DepthRange::new(3, 1), &mut rng);
        assert_eq!(result, Err(GenerationError::InvalidDepth { min: 3, max: 1 }));
    }

    #[test]
    fn test_missing_terminal_type() {
        let float = Ty::new("float");
        let mut pset = PrimitiveSet::typed("MAIN", &[], float);
        pset.add_typed_primitive("neg", Operation::unary(|a| -a), &[float], float)
            .unwrap();
        let mut rng = SmallRng::seed_from_u64(0);
        let result = generate(&pset, Method::Full, DepthRange::new(2, 2), &mut rng);
        assert_eq!(result, Err(GenerationError::NoTerminal(float)));
    }

    #[test]
    fn test_typed_slots_respected() {
        let float = Ty::new("float");
        let boolean = Ty::new("bool");
        let mut pset = PrimitiveSet::typed("MAIN", &[float], float);
        pset.add_typed_primitive(
            "if",
            Operation::checked(3, |args| Ok(if args[0] > 0.0 { args[1] } else { args[2] })),
            &[boolean, float, float],
            float,
        )
        .unwrap();
        pset.add_typed_primitive("add", Operation::binary(|a, b| a + b), &[float, float], float)
            .unwrap();
        pset.add_typed_terminal("true", 1.0, boolean).unwrap();

        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..50 {
            let tree = generate(&pset, Method::Full, DepthRange::new(3, 3), &mut rng).unwrap();
            assert!(tree.is_well_formed());
            for (index, node) in tree.nodes().iter().enumerate() {
                if let NodeKind::Primitive(p) = node.kind() {
                    let mut child = index + 1;
                    for &expected in pset.primitives()[p].args() {
                        assert_eq!(tree.nodes()[child].ret(), expected);
                        child += tree.nodes()[child].size();
                    }
                }
            }
        }
    }
}
