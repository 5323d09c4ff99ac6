//! Clique tree construction by variable elimination over the moral graph.

use std::collections::{HashMap, VecDeque};

use ctp_core::errors::StructuralError;
use ctp_core::{tree_build_span, BayesNet, CtpResult, Variable};
use ctp_graph::{minimum_deficiency_ordering, moralize};
use tracing::debug;

use super::clique::{Clique, CliqueId};
use super::ClusterTree;

/// A candidate clique recorded during elimination.
struct Candidate {
    variables: Vec<Variable>,
    separator: Vec<Variable>,
    neighbors: Vec<usize>,
    alive: bool,
}

impl Candidate {
    fn contains_all(&self, variables: &[Variable]) -> bool {
        variables.iter().all(|v| self.variables.contains(v))
    }
}

/// Builds a [`ClusterTree`] from a discrete Bayesian network.
pub struct ClusterTreeBuilder<'a> {
    model: &'a BayesNet,
}

impl<'a> ClusterTreeBuilder<'a> {
    pub fn new(model: &'a BayesNet) -> Self {
        Self { model }
    }

    pub fn build(self) -> CtpResult<ClusterTree> {
        let _span = tree_build_span!(self.model.node_count()).entered();

        if self.model.node_count() == 0 {
            return Err(StructuralError::EmptyModel.into());
        }

        let mut candidates = self.eliminate()?;
        wire(&mut candidates);
        let mut cliques = compact(candidates);
        fill_differences(&mut cliques);
        check_tree_shape(&cliques)?;

        let family_cliques = self.family_cliques(&cliques)?;
        let pivot = smallest(&cliques).unwrap_or(CliqueId(0));

        let tree = ClusterTree {
            cliques,
            family_cliques,
            pivot,
            structure_stamp: self.model.structure_stamp(),
        };
        debug!(
            model = self.model.name(),
            cliques = tree.clique_count(),
            max_cardinality = tree.cliques().iter().map(Clique::cardinality).max().unwrap_or(0),
            total_cardinality = tree.total_cardinality(),
            "clique tree built"
        );
        Ok(tree)
    }

    /// Record one candidate per eliminated variable, stopping once a
    /// candidate covers every variable still in the graph.
    fn eliminate(&self) -> CtpResult<Vec<Candidate>> {
        let mut graph = moralize(self.model)?;
        let ordering = minimum_deficiency_ordering(&graph);
        let mut candidates = Vec::with_capacity(ordering.len());

        for variable in ordering {
            let separator = graph.neighbors(&variable);
            let mut variables = Vec::with_capacity(separator.len() + 1);
            variables.push(variable.clone());
            variables.extend(separator.iter().cloned());
            let covers_rest = variables.len() == graph.node_count();
            candidates.push(Candidate {
                variables,
                separator,
                neighbors: Vec::new(),
                alive: true,
            });
            if covers_rest {
                break;
            }
            graph.eliminate(&variable);
        }
        Ok(candidates)
    }

    fn family_cliques(&self, cliques: &[Clique]) -> CtpResult<HashMap<Variable, CliqueId>> {
        let mut covering = HashMap::with_capacity(self.model.node_count());
        for node in self.model.discrete_nodes() {
            let family = node.cpt().scope();
            let best = cliques
                .iter()
                .filter(|c| c.contains_all(family))
                .min_by_key(|c| c.cardinality())
                .map(Clique::id);
            match best {
                Some(id) => {
                    covering.insert(node.variable().clone(), id);
                }
                None => {
                    return Err(StructuralError::MissingFamilyClique {
                        variable: node.variable().name().to_string(),
                    }
                    .into())
                }
            }
        }
        Ok(covering)
    }
}

/// Link every candidate to the nearest later live candidate holding its
/// separator, walking in reverse elimination order. A found candidate the
/// current one contains is absorbed: its links move over and it is dropped.
fn wire(candidates: &mut [Candidate]) {
    let n = candidates.len();
    if n < 2 {
        return;
    }
    for i in (0..n - 1).rev() {
        let Some(j) = (i + 1..n).find(|&j| {
            candidates[j].alive && candidates[j].contains_all(&candidates[i].separator)
        }) else {
            continue;
        };

        if candidates[i].contains_all(&candidates[j].variables) {
            let moved = std::mem::take(&mut candidates[j].neighbors);
            candidates[j].alive = false;
            for k in moved {
                for link in candidates[k].neighbors.iter_mut() {
                    if *link == j {
                        *link = i;
                    }
                }
                if !candidates[i].neighbors.contains(&k) {
                    candidates[i].neighbors.push(k);
                }
            }
        } else {
            candidates[i].neighbors.push(j);
            candidates[j].neighbors.push(i);
        }
    }
}

/// Drop absorbed candidates and renumber the survivors densely.
fn compact(candidates: Vec<Candidate>) -> Vec<Clique> {
    let mut renumber = vec![usize::MAX; candidates.len()];
    let mut next = 0;
    for (old, candidate) in candidates.iter().enumerate() {
        if candidate.alive {
            renumber[old] = next;
            next += 1;
        }
    }

    candidates
        .into_iter()
        .filter(|c| c.alive)
        .enumerate()
        .map(|(id, candidate)| {
            let mut clique = Clique::new(CliqueId(id), candidate.variables);
            clique.neighbors = candidate
                .neighbors
                .into_iter()
                .map(|k| renumber[k])
                .filter(|&k| k != usize::MAX && k != id)
                .map(CliqueId)
                .collect();
            clique
        })
        .collect()
}

fn fill_differences(cliques: &mut [Clique]) {
    let mut differences = Vec::with_capacity(cliques.len());
    for clique in cliques.iter() {
        let per_neighbor: Vec<Vec<Variable>> = clique
            .neighbors
            .iter()
            .map(|nb| {
                let other = &cliques[nb.0];
                clique
                    .variables
                    .iter()
                    .filter(|v| !other.contains(v))
                    .cloned()
                    .collect()
            })
            .collect();
        differences.push(per_neighbor);
    }
    for (clique, diff) in cliques.iter_mut().zip(differences) {
        clique.differences = diff;
    }
}

fn check_tree_shape(cliques: &[Clique]) -> CtpResult<()> {
    let edges = cliques.iter().map(Clique::degree).sum::<usize>() / 2;
    let connected = is_connected(cliques);
    if cliques.is_empty() || edges + 1 != cliques.len() || !connected {
        return Err(StructuralError::NotATree {
            cliques: cliques.len(),
            edges,
            connected,
        }
        .into());
    }
    Ok(())
}

fn is_connected(cliques: &[Clique]) -> bool {
    if cliques.is_empty() {
        return false;
    }
    let mut seen = vec![false; cliques.len()];
    let mut queue = VecDeque::from([0usize]);
    seen[0] = true;
    let mut reached = 1;
    while let Some(current) = queue.pop_front() {
        for nb in &cliques[current].neighbors {
            if !seen[nb.0] {
                seen[nb.0] = true;
                reached += 1;
                queue.push_back(nb.0);
            }
        }
    }
    reached == cliques.len()
}

/// First clique of minimal cardinality.
fn smallest(cliques: &[Clique]) -> Option<CliqueId> {
    cliques
        .iter()
        .min_by_key(|c| c.cardinality())
        .map(Clique::id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Variable {
        Variable::with_cardinality(name, 2).unwrap()
    }

    fn candidate(vars: &[&Variable], sep: &[&Variable]) -> Candidate {
        Candidate {
            variables: vars.iter().map(|v| (*v).clone()).collect(),
            separator: sep.iter().map(|v| (*v).clone()).collect(),
            neighbors: Vec::new(),
            alive: true,
        }
    }

    #[test]
    fn contained_candidate_is_absorbed() {
        // {a,b} <- sep {b}; {b} is contained in {a,b} and gets absorbed;
        // {b,c} was linked to {b} and moves over.
        let (a, b, c) = (var("a"), var("b"), var("c"));
        let mut candidates = vec![
            candidate(&[&a, &b], &[&b]),
            candidate(&[&b], &[]),
            candidate(&[&c, &b], &[]),
        ];
        wire(&mut candidates);
        assert!(!candidates[1].alive);
        assert_eq!(candidates[0].neighbors, vec![2]);
        assert_eq!(candidates[2].neighbors, vec![0]);

        let cliques = compact(candidates);
        assert_eq!(cliques.len(), 2);
        assert_eq!(cliques[0].neighbors, vec![CliqueId(1)]);
        assert_eq!(cliques[1].neighbors, vec![CliqueId(0)]);
    }

    #[test]
    fn min_by_key_keeps_the_first_tie() {
        let (a, b) = (var("a"), var("b"));
        let cliques = vec![
            Clique::new(CliqueId(0), vec![a.clone(), b.clone()]),
            Clique::new(CliqueId(1), vec![a]),
            Clique::new(CliqueId(2), vec![b]),
        ];
        assert_eq!(smallest(&cliques), Some(CliqueId(1)));
    }
}
