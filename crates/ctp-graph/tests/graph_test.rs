//! Tests for ctp-graph: moralization, elimination, ordering.

use ctp_core::{BayesNet, Variable};
use ctp_graph::{minimum_deficiency_ordering, moralize, MoralGraph};
use proptest::prelude::*;

fn var(name: &str) -> Variable {
    Variable::with_cardinality(name, 2).unwrap()
}

fn v_structure() -> (BayesNet, Variable, Variable, Variable) {
    let (a, b, c) = (var("a"), var("b"), var("c"));
    let mut net = BayesNet::new("v");
    for v in [&a, &b, &c] {
        net.add_node(v.clone()).unwrap();
    }
    net.add_edge(&a, &c).unwrap();
    net.add_edge(&b, &c).unwrap();
    (net, a, b, c)
}

#[test]
fn moralize_marries_co_parents() {
    let (net, a, b, c) = v_structure();
    let moral = moralize(&net).unwrap();
    assert_eq!(moral.node_count(), 3);
    assert_eq!(moral.edge_count(), 3);
    assert!(moral.adjacent(&a, &b));
    assert!(moral.adjacent(&a, &c));
    assert!(moral.adjacent(&b, &c));
}

#[test]
fn moralize_keeps_isolated_variables() {
    let mut net = BayesNet::new("iso");
    net.add_node(var("lonely")).unwrap();
    let moral = moralize(&net).unwrap();
    assert_eq!(moral.node_count(), 1);
    assert_eq!(moral.edge_count(), 0);
}

#[test]
fn moralize_rejects_continuous_nodes() {
    let mut net = BayesNet::new("mixed");
    net.add_continuous_node("x").unwrap();
    assert!(moralize(&net).is_err());
}

#[test]
fn eliminate_marries_neighbors() {
    // a - b - c, eliminating b connects a and c.
    let (a, b, c) = (var("a"), var("b"), var("c"));
    let mut g = MoralGraph::new();
    g.connect(&a, &b);
    g.connect(&b, &c);
    assert_eq!(g.deficiency(&b), 1);
    assert_eq!(g.deficiency(&a), 0);
    let former = g.eliminate(&b);
    assert_eq!(former, vec![a.clone(), c.clone()]);
    assert!(g.adjacent(&a, &c));
    assert!(!g.contains(&b));
}

#[test]
fn chain_ordering_starts_at_an_end() {
    let (x, y, z) = (var("x"), var("y"), var("z"));
    let mut g = MoralGraph::new();
    g.connect(&x, &y);
    g.connect(&y, &z);
    let order = minimum_deficiency_ordering(&g);
    assert_eq!(order.len(), 3);
    assert_eq!(order[0], x);
    // The input graph is untouched.
    assert_eq!(g.node_count(), 3);
}

#[test]
fn ordering_prefers_light_cliques_on_ties() {
    // heavy - mid - light: both ends have deficiency 0, the light end wins
    // although the heavy end was inserted first.
    let heavy = Variable::with_cardinality("heavy", 10).unwrap();
    let mid = var("mid");
    let light = var("light");
    let mut g = MoralGraph::new();
    g.connect(&heavy, &mid);
    g.connect(&mid, &light);
    let order = minimum_deficiency_ordering(&g);
    assert_eq!(order[0], light);
}

proptest! {
    #[test]
    fn ordering_is_a_permutation(edges in prop::collection::vec((0usize..12, 0usize..12), 0..30)) {
        let vars: Vec<Variable> = (0..12).map(|i| var(&format!("v{i}"))).collect();
        let mut g = MoralGraph::new();
        for v in &vars {
            g.ensure_node(v);
        }
        for (a, b) in edges {
            g.connect(&vars[a], &vars[b]);
        }
        let mut order = minimum_deficiency_ordering(&g);
        prop_assert_eq!(order.len(), vars.len());
        order.sort();
        order.dedup();
        prop_assert_eq!(order.len(), vars.len());
    }
}
