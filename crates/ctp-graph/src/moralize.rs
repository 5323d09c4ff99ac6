//! Moralization: connect co-parents, drop directions.

use ctp_core::{BayesNet, CtpError, CtpResult};

use crate::moral_graph::MoralGraph;

/// Build the moral graph of a discrete Bayesian network.
///
/// Every variable becomes a node (isolated ones included), every family
/// `[child, parents...]` becomes a complete subgraph.
pub fn moralize(model: &BayesNet) -> CtpResult<MoralGraph> {
    if model.has_continuous_nodes() {
        return Err(CtpError::Unsupported {
            what: format!("moralizing {} with continuous nodes", model.name()),
        });
    }
    let mut moral = MoralGraph::new();
    for variable in model.variables() {
        moral.ensure_node(&variable);
    }
    for node in model.discrete_nodes() {
        let family = node.cpt().scope();
        for (i, a) in family.iter().enumerate() {
            for b in &family[i + 1..] {
                moral.connect(a, b);
            }
        }
    }
    Ok(moral)
}
