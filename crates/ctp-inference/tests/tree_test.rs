//! Tests for clique tree construction: TREE-01 through TREE-09.

use std::sync::Arc;

use ctp_core::errors::StructuralError;
use ctp_core::{BayesNet, CtpError, Variable};
use ctp_inference::{ClusterTree, PropagationEngine};
use test_fixtures::{binary, binary_chain, latent_tree, sprinkler, xyz_chain};

fn var(model: &BayesNet, name: &str) -> Variable {
    model.variable(name).cloned().unwrap()
}

// =============================================================================
// TREE-01: x -> y -> z compiles to {x,y} - {y,z} with separator {y}
// =============================================================================
#[test]
fn tree_01_chain_has_two_cliques() {
    let model = xyz_chain();
    let tree = ClusterTree::build(&model).unwrap();
    let (x, y, z) = (var(&model, "x"), var(&model, "y"), var(&model, "z"));

    assert_eq!(tree.clique_count(), 2);
    assert_eq!(tree.edge_count(), 1);
    let first = tree.clique_id(0).unwrap();
    let second = tree.clique_id(1).unwrap();
    assert_eq!(tree.clique(first).variables(), &[x.clone(), y.clone()]);
    assert_eq!(tree.clique(second).variables(), &[y.clone(), z.clone()]);
    assert_eq!(tree.separator(first, second), Some(vec![y.clone()]));
    assert_eq!(tree.difference(first, second), Some(&[x.clone()][..]));
    assert_eq!(tree.difference(second, first), Some(&[z.clone()][..]));

    assert_eq!(tree.family_clique(&x), Some(first));
    assert_eq!(tree.family_clique(&y), Some(first));
    assert_eq!(tree.family_clique(&z), Some(second));
    // Both cliques weigh 6; the first wins.
    assert_eq!(tree.pivot(), first);
    assert_eq!(tree.total_cardinality(), 12);
}

// =============================================================================
// TREE-02: a moral four-cycle is triangulated into a valid tree
// =============================================================================
#[test]
fn tree_02_sprinkler_is_a_tree() {
    let model = sprinkler();
    let tree = ClusterTree::build(&model).unwrap();
    assert_eq!(tree.edge_count() + 1, tree.clique_count());
    assert!(tree.satisfies_running_intersection());
    for v in model.variables() {
        let id = tree.family_clique(&v).unwrap();
        let family = model.family(&v).unwrap();
        assert!(tree.clique(id).contains_all(&family), "{v} not covered");
    }
    // wet has two parents, so some clique holds three variables.
    assert!(tree.cliques().iter().any(|c| c.variables().len() == 3));
}

// =============================================================================
// TREE-03: a single variable is a single clique
// =============================================================================
#[test]
fn tree_03_single_variable() {
    let mut model = BayesNet::new("one");
    model.add_node(binary("solo")).unwrap();
    let tree = ClusterTree::build(&model).unwrap();
    assert_eq!(tree.clique_count(), 1);
    assert_eq!(tree.edge_count(), 0);
    assert!(tree.neighbors(tree.pivot()).is_empty());
}

// =============================================================================
// TREE-04: disconnected components are joined into one tree
// =============================================================================
#[test]
fn tree_04_disconnected_components() {
    let mut model = BayesNet::new("split");
    for name in ["a", "b", "c", "d"] {
        model.add_node(binary(name)).unwrap();
    }
    model.add_edge("a", "b").unwrap();
    model.add_edge("c", "d").unwrap();
    let tree = ClusterTree::build(&model).unwrap();
    assert_eq!(tree.edge_count() + 1, tree.clique_count());
    assert!(tree.satisfies_running_intersection());

    let engine_model = Arc::new(model);
    let mut engine = PropagationEngine::new(engine_model).unwrap();
    let likelihood = engine.propagate().unwrap();
    assert!((likelihood - 1.0).abs() < 1e-12);
}

// =============================================================================
// TREE-05: empty models and continuous nodes are rejected
// =============================================================================
#[test]
fn tree_05_rejects_empty_and_continuous() {
    let empty = BayesNet::new("empty");
    assert!(matches!(
        ClusterTree::build(&empty),
        Err(CtpError::Structural(StructuralError::EmptyModel))
    ));

    let mut mixed = xyz_chain();
    mixed.add_continuous_node("temperature").unwrap();
    assert!(matches!(
        ClusterTree::build(&mixed),
        Err(CtpError::Unsupported { .. })
    ));
}

// =============================================================================
// TREE-06: structural edits make a tree stale
// =============================================================================
#[test]
fn tree_06_staleness_tracks_structure() {
    let mut model = xyz_chain();
    let tree = Arc::new(ClusterTree::build(&model).unwrap());
    assert!(!tree.is_stale_for(&model));

    // A CPT change keeps the structure.
    let cpt = model.cpt("x").unwrap().as_ref().clone();
    model.set_cpt("x", cpt).unwrap();
    assert!(!tree.is_stale_for(&model));

    model.add_edge("x", "z").unwrap();
    assert!(tree.is_stale_for(&model));
    let err = PropagationEngine::with_tree(Arc::clone(&tree), Arc::new(model)).unwrap_err();
    assert!(matches!(
        err,
        CtpError::Structural(StructuralError::StaleTree { .. })
    ));
}

// =============================================================================
// TREE-07: minimal subtree keeps only what the query needs
// =============================================================================
#[test]
fn tree_07_minimal_subtree() {
    let model = latent_tree();
    let tree = ClusterTree::build(&model).unwrap();
    let a = var(&model, "a");
    let d = var(&model, "d");

    let single = tree.minimal_subtree(&[a.clone()]);
    assert_eq!(single.len(), 1);
    let id = *single.iter().next().unwrap();
    assert!(tree.clique(id).contains(&a));

    let spanning = tree.minimal_subtree(&[a.clone(), d.clone()]);
    assert!(tree.is_connected_subset(&spanning));
    assert!(spanning.iter().any(|&c| tree.clique(c).contains(&a)));
    assert!(spanning.iter().any(|&c| tree.clique(c).contains(&d)));
    assert!(spanning.len() > 1);
    assert!(spanning.len() <= tree.clique_count());
}

// =============================================================================
// TREE-08: deep chains build without recursion in the builder
// =============================================================================
#[test]
fn tree_08_deep_chain() {
    let model = binary_chain(400, 0.9);
    let tree = ClusterTree::build(&model).unwrap();
    assert_eq!(tree.clique_count(), 399);
    assert_eq!(tree.edge_count(), 398);
    assert!(tree.cliques().iter().all(|c| c.variables().len() == 2));
}

// =============================================================================
// TREE-09: path and neighbor accessors agree
// =============================================================================
#[test]
fn tree_09_paths_follow_edges() {
    let model = binary_chain(6, 0.8);
    let tree = ClusterTree::build(&model).unwrap();
    let first = tree.clique_id(0).unwrap();
    let last = tree.clique_id(tree.clique_count() - 1).unwrap();
    let path = tree.path(first, last);
    assert_eq!(path.len(), tree.clique_count());
    for pair in path.windows(2) {
        assert!(tree.neighbors(pair[0]).contains(&pair[1]));
    }
    assert!(tree.clique_id(tree.clique_count()).is_none());
}
