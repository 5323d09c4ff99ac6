//! Discrete Bayesian network on a `petgraph::StableGraph`.

mod node;

pub use node::{BeliefNode, ContinuousNode, DiscreteNode};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::Dfs;
use petgraph::{Directed, Direction};
use rand::Rng;

use crate::errors::{CtpError, CtpResult, ModelError};
use crate::potential::Potential;
use crate::variable::Variable;

/// The underlying directed graph type.
pub type ModelGraph = StableGraph<BeliefNode, (), Directed>;

/// Source of structure stamps. Every structural edit takes a fresh value, so
/// two models share a stamp only if one is an unedited clone of the other.
static NEXT_STAMP: AtomicU64 = AtomicU64::new(1);

fn next_stamp() -> u64 {
    NEXT_STAMP.fetch_add(1, Ordering::Relaxed)
}

/// A Bayesian network over named nodes.
///
/// Nodes keep insertion order for iteration; that order drives tie-breaking in
/// the elimination ordering and therefore the shape of clique trees.
#[derive(Debug, Clone)]
pub struct BayesNet {
    name: String,
    graph: ModelGraph,
    node_index: HashMap<String, NodeIndex>,
    order: Vec<NodeIndex>,
    stamp: u64,
}

impl BayesNet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            graph: StableGraph::new(),
            node_index: HashMap::new(),
            order: Vec::new(),
            stamp: next_stamp(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Changes on every structural edit; CPT updates keep it.
    pub fn structure_stamp(&self) -> u64 {
        self.stamp
    }

    pub fn graph(&self) -> &ModelGraph {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Add a discrete node with a uniform CPT.
    pub fn add_node(&mut self, variable: Variable) -> CtpResult<()> {
        self.check_new_name(variable.name())?;
        let cpt = Arc::new(Potential::uniform(vec![variable.clone()])?);
        let name = variable.name().to_string();
        let idx = self
            .graph
            .add_node(BeliefNode::Discrete(DiscreteNode { variable, cpt }));
        self.register(name, idx);
        Ok(())
    }

    /// Add a continuous node. Models holding one cannot be compiled into a clique tree.
    pub fn add_continuous_node(&mut self, name: &str) -> CtpResult<()> {
        self.check_new_name(name)?;
        let idx = self.graph.add_node(BeliefNode::Continuous(ContinuousNode {
            name: name.to_string(),
        }));
        self.register(name.to_string(), idx);
        Ok(())
    }

    /// Add `parent -> child`, rejecting self-loops, duplicates, and cycles.
    /// The child's CPT is reset to uniform over its new family.
    pub fn add_edge(&mut self, parent: impl AsRef<str>, child: impl AsRef<str>) -> CtpResult<()> {
        let (parent, child) = (parent.as_ref(), child.as_ref());
        let p = self.index_of(parent)?;
        let c = self.index_of(child)?;
        if p == c || self.has_path(c, p) {
            return Err(ModelError::CycleDetected {
                parent: parent.to_string(),
                child: child.to_string(),
            }
            .into());
        }
        if self.graph.find_edge(p, c).is_some() {
            return Err(ModelError::DuplicateEdge {
                parent: parent.to_string(),
                child: child.to_string(),
            }
            .into());
        }
        let parent_var = match &self.graph[p] {
            BeliefNode::Discrete(node) => Some(node.variable.clone()),
            BeliefNode::Continuous(_) => None,
        };
        if let BeliefNode::Discrete(node) = &mut self.graph[c] {
            let Some(parent_var) = parent_var else {
                return Err(CtpError::Unsupported {
                    what: format!("continuous parent {parent} of discrete node {child}"),
                });
            };
            let mut family = node.cpt.scope().to_vec();
            family.push(parent_var);
            node.cpt = Arc::new(uniform_cpt(family)?);
        }
        self.graph.add_edge(p, c, ());
        self.stamp = next_stamp();
        Ok(())
    }

    /// Remove `parent -> child`. Returns whether the edge existed.
    pub fn remove_edge(&mut self, parent: impl AsRef<str>, child: impl AsRef<str>) -> CtpResult<bool> {
        let p = self.index_of(parent.as_ref())?;
        let c = self.index_of(child.as_ref())?;
        let Some(edge) = self.graph.find_edge(p, c) else {
            return Ok(false);
        };
        self.graph.remove_edge(edge);
        let parent_name = self.graph[p].name().to_string();
        self.drop_parent(c, &parent_name)?;
        self.stamp = next_stamp();
        Ok(true)
    }

    /// Remove a node and its edges. Children lose it as a parent.
    pub fn remove_node(&mut self, name: impl AsRef<str>) -> CtpResult<bool> {
        let name = name.as_ref();
        let Some(idx) = self.node_index.remove(name) else {
            return Ok(false);
        };
        let children: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        self.graph.remove_node(idx);
        self.order.retain(|&i| i != idx);
        for child in children {
            self.drop_parent(child, name)?;
        }
        self.stamp = next_stamp();
        Ok(true)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &BeliefNode> + '_ {
        self.order.iter().map(move |&idx| &self.graph[idx])
    }

    /// Discrete variables in insertion order.
    pub fn variables(&self) -> Vec<Variable> {
        self.discrete_nodes().map(|n| n.variable.clone()).collect()
    }

    /// Discrete nodes in insertion order.
    pub fn discrete_nodes(&self) -> impl Iterator<Item = &DiscreteNode> + '_ {
        self.nodes().filter_map(BeliefNode::as_discrete)
    }

    pub fn has_continuous_nodes(&self) -> bool {
        self.nodes().any(BeliefNode::is_continuous)
    }

    pub fn node(&self, name: impl AsRef<str>) -> Option<&BeliefNode> {
        self.node_index
            .get(name.as_ref())
            .map(|&idx| &self.graph[idx])
    }

    pub fn contains(&self, name: impl AsRef<str>) -> bool {
        self.node_index.contains_key(name.as_ref())
    }

    /// Look a discrete variable up by name.
    pub fn variable(&self, name: impl AsRef<str>) -> Option<&Variable> {
        self.node(name)
            .and_then(BeliefNode::as_discrete)
            .map(DiscreteNode::variable)
    }

    /// Whether `variable` is a discrete variable of this model with the same states.
    pub fn contains_variable(&self, variable: &Variable) -> bool {
        self.variable(variable)
            .is_some_and(|v| v.cardinality() == variable.cardinality())
    }

    fn discrete(&self, name: &str) -> CtpResult<&DiscreteNode> {
        self.node(name)
            .and_then(BeliefNode::as_discrete)
            .ok_or_else(|| {
                ModelError::UnknownVariable {
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// Parents of a discrete variable in CPT order.
    pub fn parents(&self, variable: impl AsRef<str>) -> CtpResult<Vec<Variable>> {
        Ok(self.discrete(variable.as_ref())?.parents().to_vec())
    }

    /// Discrete children in insertion order.
    pub fn children(&self, variable: impl AsRef<str>) -> CtpResult<Vec<Variable>> {
        let idx = self.index_of(variable.as_ref())?;
        let mut children: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        children.sort_by_key(|c| self.order.iter().position(|o| o == c));
        Ok(children
            .into_iter()
            .filter_map(|c| self.graph[c].as_discrete().map(|n| n.variable.clone()))
            .collect())
    }

    /// `[variable, parents...]`, the CPT scope.
    pub fn family(&self, variable: impl AsRef<str>) -> CtpResult<Vec<Variable>> {
        Ok(self.discrete(variable.as_ref())?.cpt.scope().to_vec())
    }

    pub fn cpt(&self, variable: impl AsRef<str>) -> CtpResult<&Arc<Potential>> {
        Ok(&self.discrete(variable.as_ref())?.cpt)
    }

    /// Replace a CPT. The potential must cover exactly the family; it is
    /// reordered to the family order.
    pub fn set_cpt(&mut self, variable: impl AsRef<str>, cpt: Potential) -> CtpResult<()> {
        let name = variable.as_ref();
        let family = self.family(name)?;
        if cpt.scope().len() != family.len() {
            return Err(ModelError::InvalidPotential {
                reason: format!("CPT of {name} must cover {family:?}, got {:?}", cpt.scope()),
            }
            .into());
        }
        let aligned = if cpt.scope() == family.as_slice() {
            cpt
        } else {
            cpt.marginalize(&family)?
        };
        let idx = self.index_of(name)?;
        if let BeliefNode::Discrete(node) = &mut self.graph[idx] {
            node.cpt = Arc::new(aligned);
        }
        Ok(())
    }

    /// Draw every CPT at random, each normalized over its own variable.
    pub fn randomize_parameters<R: Rng>(&mut self, rng: &mut R) -> CtpResult<()> {
        for &idx in &self.order {
            if let BeliefNode::Discrete(node) = &mut self.graph[idx] {
                let mut cpt = Potential::zeros(node.cpt.scope().to_vec())?;
                cpt.randomize_conditional(&node.variable, rng)?;
                node.cpt = Arc::new(cpt);
            }
        }
        Ok(())
    }

    fn check_new_name(&self, name: &str) -> CtpResult<()> {
        if self.node_index.contains_key(name) {
            return Err(ModelError::DuplicateVariable {
                name: name.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn register(&mut self, name: String, idx: NodeIndex) {
        self.node_index.insert(name, idx);
        self.order.push(idx);
        self.stamp = next_stamp();
    }

    fn index_of(&self, name: &str) -> CtpResult<NodeIndex> {
        self.node_index.get(name).copied().ok_or_else(|| {
            ModelError::UnknownVariable {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// DFS reachability: can we reach `to` from `from`?
    fn has_path(&self, from: NodeIndex, to: NodeIndex) -> bool {
        let mut dfs = Dfs::new(&self.graph, from);
        while let Some(node) = dfs.next(&self.graph) {
            if node == to {
                return true;
            }
        }
        false
    }

    fn drop_parent(&mut self, child: NodeIndex, parent: &str) -> CtpResult<()> {
        if let BeliefNode::Discrete(node) = &mut self.graph[child] {
            let family: Vec<Variable> = node
                .cpt
                .scope()
                .iter()
                .filter(|v| v.name() != parent)
                .cloned()
                .collect();
            node.cpt = Arc::new(uniform_cpt(family)?);
        }
        Ok(())
    }
}

/// Uniform CPT over `family`, normalized over its first variable.
fn uniform_cpt(family: Vec<Variable>) -> CtpResult<Potential> {
    let mut cpt = Potential::zeros(family)?;
    cpt.add_constant(1.0);
    let head = cpt.scope()[0].clone();
    cpt.normalize_conditional(&head)?;
    Ok(cpt)
}
