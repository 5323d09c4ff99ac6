//! Clique trees: cliques keyed by id, adjacency as id lists, derived indices.

pub mod builder;
pub mod clique;

pub use builder::ClusterTreeBuilder;
pub use clique::{Clique, CliqueId};

use std::collections::{BTreeSet, HashMap, VecDeque};

use ctp_core::{BayesNet, CtpResult, Variable};

/// A clique tree compiled from one model structure.
///
/// Immutable once built and shared between engines through `Arc`; all
/// per-session state (attached potentials, messages) lives in the engines.
#[derive(Debug, Clone)]
pub struct ClusterTree {
    pub(crate) cliques: Vec<Clique>,
    pub(crate) family_cliques: HashMap<Variable, CliqueId>,
    pub(crate) pivot: CliqueId,
    pub(crate) structure_stamp: u64,
}

impl ClusterTree {
    /// Compile `model` into a clique tree.
    pub fn build(model: &BayesNet) -> CtpResult<Self> {
        ClusterTreeBuilder::new(model).build()
    }

    pub fn cliques(&self) -> &[Clique] {
        &self.cliques
    }

    pub fn clique_count(&self) -> usize {
        self.cliques.len()
    }

    pub fn clique(&self, id: CliqueId) -> &Clique {
        &self.cliques[id.0]
    }

    /// Resolve a raw index, for tooling that stores ids as integers.
    pub fn clique_id(&self, index: usize) -> Option<CliqueId> {
        (index < self.cliques.len()).then_some(CliqueId(index))
    }

    pub fn neighbors(&self, id: CliqueId) -> &[CliqueId] {
        &self.cliques[id.0].neighbors
    }

    pub fn edge_count(&self) -> usize {
        self.cliques.iter().map(Clique::degree).sum::<usize>() / 2
    }

    /// Variables shared by two adjacent cliques, in `a`'s order.
    pub fn separator(&self, a: CliqueId, b: CliqueId) -> Option<Vec<Variable>> {
        let from = self.clique(a);
        from.difference_to(b)?;
        let to = self.clique(b);
        Some(
            from.variables
                .iter()
                .filter(|v| to.contains(v))
                .cloned()
                .collect(),
        )
    }

    /// Variables in `from` absent from its neighbor `to`.
    pub fn difference(&self, from: CliqueId, to: CliqueId) -> Option<&[Variable]> {
        self.clique(from).difference_to(to)
    }

    /// Smallest clique holding the variable and all of its parents.
    pub fn family_clique(&self, variable: &Variable) -> Option<CliqueId> {
        self.family_cliques.get(variable).copied()
    }

    /// Smallest clique overall; where the likelihood is evaluated.
    pub fn pivot(&self) -> CliqueId {
        self.pivot
    }

    /// Structure stamp of the model this tree was built from.
    pub fn structure_stamp(&self) -> u64 {
        self.structure_stamp
    }

    /// Whether `model`'s structure changed since this tree was built.
    pub fn is_stale_for(&self, model: &BayesNet) -> bool {
        self.structure_stamp != model.structure_stamp()
    }

    /// Sum of clique cardinalities, the usual cost measure of a tree.
    pub fn total_cardinality(&self) -> usize {
        self.cliques.iter().map(Clique::cardinality).sum()
    }

    /// Every clique containing `variable`.
    pub fn cliques_containing<'a>(
        &'a self,
        variable: &'a Variable,
    ) -> impl Iterator<Item = CliqueId> + 'a {
        self.cliques
            .iter()
            .filter(move |c| c.contains(variable))
            .map(Clique::id)
    }

    /// Tree path between two cliques, both ends included.
    pub fn path(&self, from: CliqueId, to: CliqueId) -> Vec<CliqueId> {
        let mut parent: Vec<Option<CliqueId>> = vec![None; self.cliques.len()];
        let mut seen = vec![false; self.cliques.len()];
        let mut queue = VecDeque::from([from]);
        seen[from.0] = true;
        while let Some(current) = queue.pop_front() {
            if current == to {
                break;
            }
            for &n in self.neighbors(current) {
                if !seen[n.0] {
                    seen[n.0] = true;
                    parent[n.0] = Some(current);
                    queue.push_back(n);
                }
            }
        }
        let mut path = vec![to];
        let mut cursor = to;
        while let Some(p) = parent[cursor.0] {
            path.push(p);
            cursor = p;
        }
        path.reverse();
        path
    }

    /// For every variable, the cliques containing it form a connected subtree.
    pub fn satisfies_running_intersection(&self) -> bool {
        let mut variables: BTreeSet<&Variable> = BTreeSet::new();
        for clique in &self.cliques {
            variables.extend(clique.variables.iter());
        }
        variables.into_iter().all(|v| {
            let holders: Vec<CliqueId> = self.cliques_containing(v).collect();
            holders.windows(2).all(|pair| {
                self.path(pair[0], pair[1])
                    .into_iter()
                    .all(|id| self.clique(id).contains(v))
            })
        })
    }

    /// Minimal connected set of cliques covering `variables`: repeatedly prune
    /// leaves whose difference to their one remaining neighbor holds none of
    /// the variables, until no leaf qualifies.
    pub fn minimal_subtree(&self, variables: &[Variable]) -> BTreeSet<CliqueId> {
        let n = self.cliques.len();
        let mut alive = vec![true; n];
        let mut degree: Vec<usize> = self.cliques.iter().map(Clique::degree).collect();
        let mut remaining = n;

        let mut pruned = true;
        while pruned && remaining > 1 {
            pruned = false;
            for clique in &self.cliques {
                let id = clique.id.0;
                if !alive[id] || degree[id] != 1 || remaining == 1 {
                    continue;
                }
                let Some(position) = clique.neighbors.iter().position(|nb| alive[nb.0]) else {
                    continue;
                };
                let neighbor = clique.neighbors[position];
                let unique = &clique.differences[position];
                if unique.iter().all(|v| !variables.contains(v)) {
                    alive[id] = false;
                    degree[neighbor.0] -= 1;
                    remaining -= 1;
                    pruned = true;
                }
            }
        }

        (0..n).filter(|&i| alive[i]).map(CliqueId).collect()
    }

    /// Whether `subtree` names existing cliques that form a connected set.
    pub fn is_connected_subset(&self, subtree: &BTreeSet<CliqueId>) -> bool {
        let Some(&start) = subtree.iter().next() else {
            return false;
        };
        if subtree.iter().any(|id| id.0 >= self.cliques.len()) {
            return false;
        }
        let mut seen = BTreeSet::from([start]);
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            for &n in self.neighbors(current) {
                if subtree.contains(&n) && seen.insert(n) {
                    stack.push(n);
                }
            }
        }
        seen.len() == subtree.len()
    }
}
