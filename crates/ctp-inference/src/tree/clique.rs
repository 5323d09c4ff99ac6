//! Cliques and their identifiers.

use std::fmt;

use ctp_core::Variable;

/// Opaque clique identifier, an index into its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CliqueId(pub(crate) usize);

impl CliqueId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for CliqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// A cluster of variables in a clique tree.
///
/// Variable order is the elimination order the clique was formed in and fixes
/// the row-major layout of products built over it.
#[derive(Debug, Clone)]
pub struct Clique {
    pub(crate) id: CliqueId,
    pub(crate) variables: Vec<Variable>,
    pub(crate) cardinality: usize,
    pub(crate) neighbors: Vec<CliqueId>,
    /// Aligned with `neighbors`: variables of this clique absent from that neighbor.
    pub(crate) differences: Vec<Vec<Variable>>,
}

impl Clique {
    pub(crate) fn new(id: CliqueId, variables: Vec<Variable>) -> Self {
        let cardinality = variables
            .iter()
            .fold(1usize, |c, v| c.saturating_mul(v.cardinality()));
        Self {
            id,
            variables,
            cardinality,
            neighbors: Vec::new(),
            differences: Vec::new(),
        }
    }

    pub fn id(&self) -> CliqueId {
        self.id
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Product of the member cardinalities.
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    pub fn neighbors(&self) -> &[CliqueId] {
        &self.neighbors
    }

    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }

    pub fn contains(&self, variable: &Variable) -> bool {
        self.variables.contains(variable)
    }

    pub fn contains_all<'a>(&self, variables: impl IntoIterator<Item = &'a Variable>) -> bool {
        variables.into_iter().all(|v| self.contains(v))
    }

    /// Variables of this clique absent from `neighbor`. `None` if not adjacent.
    pub fn difference_to(&self, neighbor: CliqueId) -> Option<&[Variable]> {
        self.neighbors
            .iter()
            .position(|&n| n == neighbor)
            .map(|i| self.differences[i].as_slice())
    }
}
