//! Property tests for ctp-inference: PROP-01 through PROP-04.

use std::sync::Arc;

use proptest::prelude::*;

use ctp_core::Variable;
use ctp_inference::{ClusterTree, PropagationEngine};
use test_fixtures::{brute_force_marginal, max_cell_diff, random_dag};

// Strategy for a random binary DAG description: size, edge bits, CPT weights.
fn dag_strategy() -> impl Strategy<Value = (usize, Vec<bool>, Vec<f64>)> {
    (
        2usize..8,
        prop::collection::vec(any::<bool>(), 28),
        prop::collection::vec(0.05f64..1.0, 1..24),
    )
}

// =============================================================================
// PROP-01: every built tree is a tree with the running intersection property
// =============================================================================
proptest! {
    #[test]
    fn prop_01_tree_shape_and_running_intersection((n, bits, weights) in dag_strategy()) {
        let model = random_dag(n, &bits, 3, &weights);
        let tree = ClusterTree::build(&model).unwrap();
        prop_assert_eq!(tree.edge_count() + 1, tree.clique_count());
        prop_assert!(tree.satisfies_running_intersection());
    }
}

// =============================================================================
// PROP-02: every family has a covering clique
// =============================================================================
proptest! {
    #[test]
    fn prop_02_family_coverage((n, bits, weights) in dag_strategy()) {
        let model = random_dag(n, &bits, 3, &weights);
        let tree = ClusterTree::build(&model).unwrap();
        for v in model.variables() {
            let family = model.family(&v).unwrap();
            let id = tree.family_clique(&v);
            prop_assert!(id.is_some());
            let clique = tree.clique(id.unwrap());
            prop_assert!(clique.contains_all(&family));
            // No strictly smaller clique covers the family.
            for other in tree.cliques() {
                if other.contains_all(&family) {
                    prop_assert!(other.cardinality() >= clique.cardinality());
                }
            }
        }
    }
}

// =============================================================================
// PROP-03: beliefs sum to one and match enumeration
// =============================================================================
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    #[test]
    fn prop_03_beliefs_match_enumeration(
        (n, bits, weights) in dag_strategy(),
        observed in 0usize..8,
        state in 0usize..2,
    ) {
        let model = Arc::new(random_dag(n, &bits, 3, &weights));
        let variables = model.variables();
        let evidence: Vec<(Variable, usize)> = vec![(variables[observed % n].clone(), state)];

        let mut engine = PropagationEngine::new(Arc::clone(&model)).unwrap();
        engine.add_evidence(&evidence[0].0, state).unwrap();
        engine.propagate().unwrap();

        for v in &variables {
            let belief = engine.compute_belief(v).unwrap();
            prop_assert!((belief.sum() - 1.0).abs() < 1e-6);
            let expected = brute_force_marginal(&model, &[v.clone()], &evidence);
            prop_assert!(max_cell_diff(&belief, &expected) < 1e-9);
        }
    }
}

// =============================================================================
// PROP-04: plain and log likelihood agree
// =============================================================================
proptest! {
    #[test]
    fn prop_04_likelihood_forms_agree(
        (n, bits, weights) in dag_strategy(),
        states in prop::collection::vec(0usize..2, 8),
    ) {
        let model = Arc::new(random_dag(n, &bits, 3, &weights));
        let variables = model.variables();
        let mut engine = PropagationEngine::new(Arc::clone(&model)).unwrap();
        // Observe every other variable.
        let observed: Vec<Variable> = variables.iter().step_by(2).cloned().collect();
        let chosen: Vec<usize> = states.iter().take(observed.len()).copied().collect();
        engine.set_evidence(&observed, &chosen).unwrap();

        let likelihood = engine.propagate().unwrap();
        prop_assert!(likelihood > 0.0);
        prop_assert!((likelihood.ln() - engine.last_log_likelihood()).abs() < 1e-6);
    }
}
