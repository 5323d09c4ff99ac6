//! Belief node kinds.

use std::sync::Arc;

use crate::potential::Potential;
use crate::variable::Variable;

/// A discrete node with its conditional probability table.
///
/// The CPT scope is `[variable, parents...]`, parents in edge insertion order,
/// normalized over `variable`.
#[derive(Debug, Clone)]
pub struct DiscreteNode {
    pub(crate) variable: Variable,
    pub(crate) cpt: Arc<Potential>,
}

impl DiscreteNode {
    pub fn variable(&self) -> &Variable {
        &self.variable
    }

    pub fn cpt(&self) -> &Arc<Potential> {
        &self.cpt
    }

    /// Parents in CPT order.
    pub fn parents(&self) -> &[Variable] {
        &self.cpt.scope()[1..]
    }
}

/// A continuous node. Carried by the model, rejected by every inference path.
#[derive(Debug, Clone)]
pub struct ContinuousNode {
    pub(crate) name: String,
}

impl ContinuousNode {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Node kinds of a Bayesian network.
#[derive(Debug, Clone)]
pub enum BeliefNode {
    Discrete(DiscreteNode),
    Continuous(ContinuousNode),
}

impl BeliefNode {
    pub fn name(&self) -> &str {
        match self {
            BeliefNode::Discrete(node) => node.variable.name(),
            BeliefNode::Continuous(node) => &node.name,
        }
    }

    pub fn as_discrete(&self) -> Option<&DiscreteNode> {
        match self {
            BeliefNode::Discrete(node) => Some(node),
            BeliefNode::Continuous(_) => None,
        }
    }

    pub fn is_continuous(&self) -> bool {
        matches!(self, BeliefNode::Continuous(_))
    }
}
