//! An expression tree paired with its fitness.

use super::compiler::{CompileError, Program, compile};
use super::fitness::Fitness;
use super::primitives::PrimitiveSet;
use super::tree::Tree;
use std::fmt;
use std::sync::Arc;

/// One member of a population.
///
/// The primitive set is shared by the whole run; cloning an individual
/// clones the tree and the fitness record only.
#[derive(Debug, Clone)]
pub struct Individual {
    tree: Tree,
    fitness: Fitness,
    pset: Arc<PrimitiveSet>,
}

impl Individual {
    /// New unevaluated individual. Any values in `fitness` are discarded;
    /// only its weights are kept.
    #[must_use]
    pub fn new(tree: Tree, pset: Arc<PrimitiveSet>, mut fitness: Fitness) -> Self {
        fitness.invalidate();
        Self {
            tree,
            fitness,
            pset,
        }
    }

    /// The expression tree.
    #[must_use]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// The fitness record.
    #[must_use]
    pub fn fitness(&self) -> &Fitness {
        &self.fitness
    }

    /// Mutable access to the fitness record.
    pub fn fitness_mut(&mut self) -> &mut Fitness {
        &mut self.fitness
    }

    /// The primitive set the tree was built from.
    #[must_use]
    pub fn pset(&self) -> &Arc<PrimitiveSet> {
        &self.pset
    }

    /// A child carrying `tree`, with this individual's primitive set and
    /// weights and an unevaluated fitness.
    #[must_use]
    pub fn offspring(&self, tree: Tree) -> Self {
        Self::new(tree, Arc::clone(&self.pset), self.fitness.clone())
    }

    /// Compile the tree into a callable program.
    ///
    /// # Errors
    ///
    /// Fails if the tree refers to entries missing from its primitive set.
    pub fn compile(&self) -> Result<Program<'_>, CompileError> {
        compile(&self.tree, &self.pset)
    }
}

impl fmt::Display for Individual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tree.display(&self.pset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::primitives::{Operation, Ty};
    use crate::gp::tree::Node;

    fn individual() -> Individual {
        let mut pset = PrimitiveSet::new("MAIN", 1);
        pset.add_primitive("mul", 2, Operation::binary(|a, b| a * b))
            .unwrap();
        pset.rename_arguments(&[("ARG0", "x")]).unwrap();
        let x = Node::terminal(0, Ty::ANY);
        let tree = Tree::from_nodes(vec![Node::primitive(0, 2, Ty::ANY), x, x]).unwrap();
        Individual::new(tree, Arc::new(pset), Fitness::minimizing())
    }

    #[test]
    fn test_display_and_compile() {
        let ind = individual();
        assert_eq!(ind.to_string(), "mul(x, x)");
        assert_eq!(ind.compile().unwrap().call(&[3.0]), Ok(9.0));
    }

    #[test]
    fn test_offspring_is_unevaluated() {
        let mut parent = individual();
        parent.fitness_mut().set_values(vec![1.0]).unwrap();
        let child = parent.offspring(parent.tree().clone());
        assert!(!child.fitness().is_valid());
        assert_eq!(child.fitness().weights(), parent.fitness().weights());
        assert!(Arc::ptr_eq(child.pset(), parent.pset()));
    }
}
