//! petgraph::StableUnGraph wrapper keyed by variable.

use std::collections::HashMap;

use ctp_core::Variable;
use petgraph::stable_graph::{NodeIndex, StableUnGraph};

/// The underlying undirected graph type.
pub type VariableGraph = StableUnGraph<Variable, ()>;

/// Wrapper providing indexed access to an undirected graph over variables.
///
/// Node indices only grow (nodes are removed, never re-added), so index order
/// is insertion order and every listing below is deterministic.
#[derive(Debug, Clone, Default)]
pub struct MoralGraph {
    /// The petgraph stable graph.
    pub graph: VariableGraph,
    /// Map from variable → NodeIndex for O(1) lookup.
    pub node_index: HashMap<Variable, NodeIndex>,
}

impl MoralGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the node for `variable`.
    pub fn ensure_node(&mut self, variable: &Variable) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(variable) {
            return idx;
        }
        let idx = self.graph.add_node(variable.clone());
        self.node_index.insert(variable.clone(), idx);
        idx
    }

    /// Link two variables. Self-loops and duplicates are ignored.
    pub fn connect(&mut self, a: &Variable, b: &Variable) {
        if a == b {
            return;
        }
        let ia = self.ensure_node(a);
        let ib = self.ensure_node(b);
        if self.graph.find_edge(ia, ib).is_none() {
            self.graph.add_edge(ia, ib, ());
        }
    }

    pub fn contains(&self, variable: &Variable) -> bool {
        self.node_index.contains_key(variable)
    }

    pub fn adjacent(&self, a: &Variable, b: &Variable) -> bool {
        match (self.node_index.get(a), self.node_index.get(b)) {
            (Some(&ia), Some(&ib)) => self.graph.find_edge(ia, ib).is_some(),
            _ => false,
        }
    }

    /// Variables in insertion order.
    pub fn variables(&self) -> Vec<Variable> {
        self.graph
            .node_indices()
            .map(|idx| self.graph[idx].clone())
            .collect()
    }

    /// Neighbors in insertion order. Empty for unknown variables.
    pub fn neighbors(&self, variable: &Variable) -> Vec<Variable> {
        self.neighbor_indices(variable)
            .into_iter()
            .map(|idx| self.graph[idx].clone())
            .collect()
    }

    fn neighbor_indices(&self, variable: &Variable) -> Vec<NodeIndex> {
        let Some(&idx) = self.node_index.get(variable) else {
            return Vec::new();
        };
        let mut neighbors: Vec<NodeIndex> = self.graph.neighbors(idx).collect();
        neighbors.sort();
        neighbors
    }

    /// Number of edges eliminating `variable` would add between its neighbors.
    pub fn deficiency(&self, variable: &Variable) -> usize {
        let neighbors = self.neighbor_indices(variable);
        let mut missing = 0;
        for (i, &a) in neighbors.iter().enumerate() {
            for &b in &neighbors[i + 1..] {
                if self.graph.find_edge(a, b).is_none() {
                    missing += 1;
                }
            }
        }
        missing
    }

    /// Remove `variable`, first marrying all of its neighbors.
    /// Returns the former neighbors in insertion order.
    pub fn eliminate(&mut self, variable: &Variable) -> Vec<Variable> {
        let neighbors = self.neighbors(variable);
        for (i, a) in neighbors.iter().enumerate() {
            for b in &neighbors[i + 1..] {
                self.connect(a, b);
            }
        }
        if let Some(idx) = self.node_index.remove(variable) {
            self.graph.remove_node(idx);
        }
        neighbors
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
