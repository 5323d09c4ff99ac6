use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use ctp_inference::{ClusterTree, PropagationEngine, PropagationPool};
use test_fixtures::{binary_chain, latent_tree, random_dag};

/// A 40-variable DAG with up to three parents per child.
fn dense_model() -> ctp_core::BayesNet {
    let bits: Vec<bool> = (0..40 * 39 / 2).map(|k| k % 7 == 0 || k % 11 == 3).collect();
    let weights: Vec<f64> = (1..=17).map(|w| w as f64 / 17.0).collect();
    random_dag(40, &bits, 3, &weights)
}

fn bench_tree_build(c: &mut Criterion) {
    let model = dense_model();
    c.bench_function("tree_build_dense_40", |b| {
        b.iter(|| ClusterTree::build(&model).unwrap());
    });
}

fn bench_propagate_chain(c: &mut Criterion) {
    let model = Arc::new(binary_chain(200, 0.9));
    let first = model.variable("v0").cloned().unwrap();
    let mut engine = PropagationEngine::new(model).unwrap();
    engine.add_evidence(&first, 1).unwrap();

    c.bench_function("propagate_chain_200", |b| {
        b.iter(|| engine.propagate().unwrap());
    });
}

fn bench_propagate_dense(c: &mut Criterion) {
    let model = Arc::new(dense_model());
    let mut engine = PropagationEngine::new(model).unwrap();

    c.bench_function("propagate_dense_40", |b| {
        b.iter(|| engine.propagate().unwrap());
    });
}

fn bench_pooled_beliefs(c: &mut Criterion) {
    let model = Arc::new(latent_tree());
    let root = model.variable("root").cloned().unwrap();
    let a = model.variable("a").cloned().unwrap();
    let pool = PropagationPool::build(model, 4).unwrap();

    c.bench_function("pooled_belief_latent_tree", |b| {
        b.iter(|| {
            let mut engine = pool.checkout().unwrap();
            engine.add_evidence(&a, 1).unwrap();
            engine.propagate().unwrap();
            engine.compute_belief(&root).unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_tree_build,
    bench_propagate_chain,
    bench_propagate_dense,
    bench_pooled_beliefs
);
criterion_main!(benches);
