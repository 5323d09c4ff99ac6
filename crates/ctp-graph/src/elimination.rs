//! Greedy minimum-deficiency elimination ordering.

use ctp_core::Variable;
use tracing::trace;

use crate::moral_graph::MoralGraph;

/// Repeatedly pick the variable whose elimination adds the fewest fill-in
/// edges; ties go to the smaller clique weight (product of the candidate
/// clique's cardinalities), then to the earliest inserted variable.
///
/// The input graph is left untouched.
pub fn minimum_deficiency_ordering(graph: &MoralGraph) -> Vec<Variable> {
    let mut working = graph.clone();
    let mut ordering = Vec::with_capacity(working.node_count());

    while working.node_count() > 0 {
        let mut best: Option<(usize, usize, Variable)> = None;
        for candidate in working.variables() {
            let deficiency = working.deficiency(&candidate);
            let weight = working
                .neighbors(&candidate)
                .iter()
                .fold(candidate.cardinality(), |w, v| w.saturating_mul(v.cardinality()));
            let better = match &best {
                None => true,
                Some((d, w, _)) => (deficiency, weight) < (*d, *w),
            };
            if better {
                best = Some((deficiency, weight, candidate));
            }
        }
        let Some((deficiency, _, chosen)) = best else {
            break;
        };
        trace!(variable = %chosen, deficiency, "eliminate");
        working.eliminate(&chosen);
        ordering.push(chosen);
    }

    ordering
}
