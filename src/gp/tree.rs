//! Flat prefix-order expression trees.
//!
//! A tree is a `Vec<Node>` in depth-first prefix order. Every node records the
//! size of the subtree it roots, so the subtree at index `i` is always the
//! contiguous range `i..i + size`. Crossover and mutation are splices over
//! those ranges; no pointers, no recursion over boxed children.
//!
//! ```text
//!   add(x, mul(x, x))
//!
//!   index  0    1  2    3  4
//!   node   add  x  mul  x  x
//!   size   5    1  3    1  1
//! ```

use super::primitives::{PrimitiveSet, Ty};
use std::fmt;
use std::ops::Range;

/// What a node refers to in its primitive set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    /// Index into [`PrimitiveSet::primitives`].
    Primitive(usize),
    /// Index into [`PrimitiveSet::terminals`] (constant or argument).
    Terminal(usize),
    /// An ephemeral terminal with its value frozen at creation.
    Ephemeral {
        /// Index of the generating terminal.
        terminal: usize,
        /// The sampled value.
        value: f64,
    },
}

/// One position of a flat tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    kind: NodeKind,
    arity: usize,
    ret: Ty,
    size: usize,
}

impl Node {
    /// Node applying primitive `index` to `arity` children.
    #[must_use]
    pub const fn primitive(index: usize, arity: usize, ret: Ty) -> Self {
        Self {
            kind: NodeKind::Primitive(index),
            arity,
            ret,
            size: 1 + arity,
        }
    }

    /// Leaf referring to terminal `index`.
    #[must_use]
    pub const fn terminal(index: usize, ret: Ty) -> Self {
        Self {
            kind: NodeKind::Terminal(index),
            arity: 0,
            ret,
            size: 1,
        }
    }

    /// Leaf holding a sampled ephemeral `value`.
    #[must_use]
    pub const fn ephemeral(terminal: usize, value: f64, ret: Ty) -> Self {
        Self {
            kind: NodeKind::Ephemeral { terminal, value },
            arity: 0,
            ret,
            size: 1,
        }
    }

    /// What the node refers to.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Number of children.
    #[must_use]
    pub const fn arity(&self) -> usize {
        self.arity
    }

    /// Type of the value the node produces.
    #[must_use]
    pub const fn ret(&self) -> Ty {
        self.ret
    }

    /// Number of nodes in the subtree rooted here, itself included.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// True for leaves.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.arity == 0
    }
}

/// Error building a tree from a node sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// No nodes at all.
    Empty,
    /// The node at this index has fewer following subtrees than its arity.
    MissingChildren {
        /// Index of the starved node.
        index: usize,
    },
    /// Nodes left over after the first complete tree.
    TrailingNodes {
        /// Number of complete subtrees found instead of one.
        roots: usize,
    },
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "tree has no nodes"),
            Self::MissingChildren { index } => {
                write!(f, "node {index} is missing children")
            }
            Self::TrailingNodes { roots } => {
                write!(f, "sequence encodes {roots} trees instead of one")
            }
        }
    }
}

impl std::error::Error for TreeError {}

/// A complete expression tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Build a tree from prefix-ordered nodes, recomputing every subtree size.
    ///
    /// # Errors
    ///
    /// Fails unless the arities describe exactly one complete tree.
    pub fn from_nodes(mut nodes: Vec<Node>) -> Result<Self, TreeError> {
        if nodes.is_empty() {
            return Err(TreeError::Empty);
        }
        let len = nodes.len();
        // Sizes of the complete subtrees to the right of the cursor; the top
        // of the stack is the leftmost.
        let mut pending: Vec<usize> = Vec::with_capacity(len);
        for (offset, node) in nodes.iter_mut().rev().enumerate() {
            let Some(first_child) = pending.len().checked_sub(node.arity) else {
                return Err(TreeError::MissingChildren {
                    index: len - 1 - offset,
                });
            };
            node.size = 1 + pending.drain(first_child..).sum::<usize>();
            pending.push(node.size);
        }
        if pending.len() == 1 {
            Ok(Self { nodes })
        } else {
            Err(TreeError::TrailingNodes {
                roots: pending.len(),
            })
        }
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; a tree has at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in prefix order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// Index range of the subtree rooted at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use]
    pub fn subtree(&self, index: usize) -> Range<usize> {
        index..index + self.nodes[index].size
    }

    /// Nodes of the subtree rooted at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use]
    pub fn subtree_nodes(&self, index: usize) -> &[Node] {
        &self.nodes[self.subtree(index)]
    }

    /// Depth of every node, the root being at depth 0.
    #[must_use]
    pub fn node_depths(&self) -> Vec<usize> {
        let mut depths = Vec::with_capacity(self.nodes.len());
        let mut open = vec![0_usize];
        for node in &self.nodes {
            let depth = open.pop().unwrap_or(0);
            depths.push(depth);
            open.extend(std::iter::repeat_n(depth + 1, node.arity));
        }
        depths
    }

    /// Height of the tree: the longest root-to-leaf edge count.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.node_depths().into_iter().max().unwrap_or(0)
    }

    /// New tree with the subtree at `index` replaced by `replacement`.
    ///
    /// The sizes carried by `replacement` are recomputed. Sizes of the
    /// ancestors of `index` are adjusted; everything else is copied.
    ///
    /// # Errors
    ///
    /// Fails unless `replacement` describes exactly one complete tree.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn splice(&self, index: usize, replacement: &[Node]) -> Result<Self, TreeError> {
        let replacement = Self::from_nodes(replacement.to_vec())?;
        Ok(self.replace_subtree(index, &replacement.nodes))
    }

    /// [`Tree::splice`] without checking `replacement`, which must be a
    /// complete subtree with current sizes, as [`Tree::subtree_nodes`] and
    /// [`Tree::nodes`] return.
    pub(crate) fn replace_subtree(&self, index: usize, replacement: &[Node]) -> Self {
        debug_assert_eq!(
            replacement.first().map(Node::size),
            Some(replacement.len())
        );
        let old = self.subtree(index);
        let removed = old.len();
        let mut nodes = Vec::with_capacity(self.nodes.len() - removed + replacement.len());
        nodes.extend_from_slice(&self.nodes[..old.start]);
        for (position, node) in nodes.iter_mut().enumerate() {
            // Ancestors are exactly the earlier nodes whose range covers `index`.
            if position + node.size > index {
                node.size = node.size - removed + replacement.len();
            }
        }
        nodes.extend_from_slice(replacement);
        nodes.extend_from_slice(&self.nodes[old.end..]);
        Self { nodes }
    }

    /// Check that every recorded size matches the node's children.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let len = self.nodes.len();
        if len == 0 || self.nodes[0].size != len {
            return false;
        }
        self.nodes.iter().enumerate().all(|(index, node)| {
            let mut child = index + 1;
            for _ in 0..node.arity {
                match self.nodes.get(child) {
                    Some(next) => child += next.size,
                    None => return false,
                }
            }
            child == index + node.size && child <= len
        })
    }

    /// Render as `name(child, child)` using the names in `pset`.
    #[must_use]
    pub fn display<'a>(&'a self, pset: &'a PrimitiveSet) -> TreeDisplay<'a> {
        TreeDisplay { tree: self, pset }
    }
}

/// Helper returned by [`Tree::display`].
#[derive(Debug, Clone, Copy)]
pub struct TreeDisplay<'a> {
    tree: &'a Tree,
    pset: &'a PrimitiveSet,
}

impl TreeDisplay<'_> {
    /// Write the subtree at `index` and return the index just past it.
    fn write_node(&self, f: &mut fmt::Formatter<'_>, index: usize) -> Result<usize, fmt::Error> {
        let node = self.tree.nodes[index];
        match node.kind {
            NodeKind::Primitive(p) => {
                let name = self.pset.primitive(p).map_or("?", |prim| prim.name());
                write!(f, "{name}(")?;
                let mut child = index + 1;
                for position in 0..node.arity {
                    if position > 0 {
                        f.write_str(", ")?;
                    }
                    child = self.write_node(f, child)?;
                }
                f.write_str(")")?;
                Ok(child)
            }
            NodeKind::Terminal(t) => {
                let name = self.pset.terminal(t).map_or("?", |term| term.name());
                f.write_str(name)?;
                Ok(index + 1)
            }
            NodeKind::Ephemeral { value, .. } => {
                write!(f, "{value}")?;
                Ok(index + 1)
            }
        }
    }
}

impl fmt::Display for TreeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_node(f, 0).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::primitives::Operation;

    fn pset() -> PrimitiveSet {
        let mut pset = PrimitiveSet::new("MAIN", 1);
        pset.add_primitive("add", 2, Operation::binary(|a, b| a + b))
            .unwrap();
        pset.add_primitive("mul", 2, Operation::binary(|a, b| a * b))
            .unwrap();
        pset.add_primitive("neg", 1, Operation::unary(|a| -a)).unwrap();
        pset.rename_arguments(&[("ARG0", "x")]).unwrap();
        pset
    }

    const ADD: Node = Node::primitive(0, 2, Ty::ANY);
    const MUL: Node = Node::primitive(1, 2, Ty::ANY);
    const NEG: Node = Node::primitive(2, 1, Ty::ANY);
    const X: Node = Node::terminal(0, Ty::ANY);

    /// add(x, mul(x, x))
    fn sample() -> Tree {
        Tree::from_nodes(vec![ADD, X, MUL, X, X]).unwrap()
    }

    #[test]
    fn test_sizes_computed() {
        let tree = sample();
        let sizes: Vec<usize> = tree.nodes().iter().map(Node::size).collect();
        assert_eq!(sizes, vec![5, 1, 3, 1, 1]);
        assert!(tree.is_well_formed());
        assert_eq!(tree.subtree(2), 2..5);
        assert_eq!(tree.subtree(1), 1..2);
    }

    #[test]
    fn test_malformed_sequences() {
        assert_eq!(Tree::from_nodes(Vec::new()), Err(TreeError::Empty));
        assert_eq!(
            Tree::from_nodes(vec![ADD, X]),
            Err(TreeError::MissingChildren { index: 0 })
        );
        assert_eq!(
            Tree::from_nodes(vec![X, X]),
            Err(TreeError::TrailingNodes { roots: 2 })
        );
    }

    #[test]
    fn test_depth() {
        assert_eq!(Tree::from_nodes(vec![X]).unwrap().depth(), 0);
        assert_eq!(sample().depth(), 2);
        assert_eq!(sample().node_depths(), vec![0, 1, 1, 2, 2]);
    }

    #[test]
    fn test_display() {
        let pset = pset();
        assert_eq!(sample().display(&pset).to_string(), "add(x, mul(x, x))");

        let ephemeral = Tree::from_nodes(vec![NEG, Node::ephemeral(0, -1.0, Ty::ANY)]).unwrap();
        assert_eq!(ephemeral.display(&pset).to_string(), "neg(-1)");
    }

    #[test]
    fn test_splice_grows_and_fixes_ancestors() {
        let tree = sample();
        let donor = Tree::from_nodes(vec![NEG, X]).unwrap();
        // Replace the last leaf: add(x, mul(x, neg(x)))
        let spliced = tree.splice(4, donor.nodes()).unwrap();
        assert!(spliced.is_well_formed());
        assert_eq!(spliced.len(), 6);
        let sizes: Vec<usize> = spliced.nodes().iter().map(Node::size).collect();
        assert_eq!(sizes, vec![6, 1, 4, 1, 2, 1]);
        assert_eq!(spliced.display(&pset()).to_string(), "add(x, mul(x, neg(x)))");
    }

    #[test]
    fn test_splice_shrinks() {
        let tree = sample();
        let spliced = tree.splice(2, &[X]).unwrap();
        assert!(spliced.is_well_formed());
        assert_eq!(spliced.display(&pset()).to_string(), "add(x, x)");
    }

    #[test]
    fn test_splice_root() {
        let tree = sample();
        let spliced = tree.splice(0, &[X]).unwrap();
        assert_eq!(spliced.len(), 1);
        assert!(spliced.is_well_formed());
    }

    #[test]
    fn test_splice_rejects_incomplete_replacement() {
        let tree = sample();
        assert_eq!(tree.splice(0, &[]), Err(TreeError::Empty));
        assert_eq!(
            tree.splice(1, &[MUL, X]),
            Err(TreeError::MissingChildren { index: 0 })
        );
        assert_eq!(
            tree.splice(1, &[X, X]),
            Err(TreeError::TrailingNodes { roots: 2 })
        );
    }

    #[test]
    fn test_splice_recomputes_replacement_sizes() {
        let tree = sample();
        // Root node claims the whole five-node tree; only its arity counts.
        let stale = [tree.nodes()[0], X, X];
        let spliced = tree.splice(1, &stale).unwrap();
        assert!(spliced.is_well_formed());
        assert_eq!(spliced.display(&pset()).to_string(), "add(add(x, x), mul(x, x))");
    }

    #[test]
    fn test_from_nodes_ignores_stale_sizes() {
        let tree = sample();
        // Nodes taken out of context still carry their old sizes.
        let rebuilt = Tree::from_nodes(tree.subtree_nodes(2).to_vec()).unwrap();
        assert_eq!(rebuilt.len(), 3);
        assert!(rebuilt.is_well_formed());
    }
}
