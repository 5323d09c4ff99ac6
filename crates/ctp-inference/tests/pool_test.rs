//! Tests for the propagation pool: POOL-01 through POOL-09.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ctp_core::errors::PoolError;
use ctp_core::{BayesNet, CtpError, Potential, Variable};
use ctp_inference::{PropagationEngine, PropagationPool};
use test_fixtures::{latent_tree, xyz_chain};

fn var(model: &BayesNet, name: &str) -> Variable {
    model.variable(name).cloned().unwrap()
}

// =============================================================================
// POOL-01: take/put bookkeeping and the checkout guard
// =============================================================================
#[test]
fn pool_01_take_put_and_guard() {
    let pool = PropagationPool::build(Arc::new(xyz_chain()), 3).unwrap();
    assert_eq!(pool.capacity(), 3);
    assert_eq!(pool.available().unwrap(), 3);

    let engine = pool.take().unwrap();
    assert_eq!(pool.available().unwrap(), 2);
    assert_eq!(pool.checked_out().unwrap(), 1);
    {
        let mut guard = pool.checkout().unwrap();
        assert_eq!(pool.available().unwrap(), 1);
        guard.propagate().unwrap();
    }
    assert_eq!(pool.available().unwrap(), 2);
    pool.put(engine).unwrap();
    assert_eq!(pool.available().unwrap(), 3);
    assert_eq!(pool.checked_out().unwrap(), 0);
}

// =============================================================================
// POOL-02: misuse is reported
// =============================================================================
#[test]
fn pool_02_overflow_foreign_and_capacity() {
    let model = Arc::new(xyz_chain());
    let pool = PropagationPool::build(Arc::clone(&model), 2).unwrap();

    // Same model, different tree.
    let outsider = PropagationEngine::new(Arc::clone(&model)).unwrap();
    assert!(matches!(
        pool.put(outsider),
        Err(CtpError::Pool(PoolError::ForeignEngine))
    ));

    // Nothing is checked out, so nothing can come back.
    let engine = pool.take().unwrap();
    let extra = engine.fork();
    pool.put(engine).unwrap();
    assert!(matches!(
        pool.put(extra),
        Err(CtpError::Pool(PoolError::Overflow { capacity: 2 }))
    ));

    assert!(matches!(
        PropagationPool::build(Arc::clone(&model), 0),
        Err(CtpError::Pool(PoolError::InvalidCapacity { capacity: 0, .. }))
    ));
}

// =============================================================================
// POOL-03: the N+1-th take blocks until an engine comes back
// =============================================================================
#[test]
fn pool_03_take_blocks_at_capacity() {
    let pool = PropagationPool::build(Arc::new(xyz_chain()), 2).unwrap();
    let first = pool.take().unwrap();
    let _second = pool.take().unwrap();
    assert!(pool.try_take().unwrap().is_none());

    let acquired = AtomicBool::new(false);
    thread::scope(|s| {
        let waiter = s.spawn(|| {
            let engine = pool.take().unwrap();
            acquired.store(true, Ordering::SeqCst);
            engine
        });
        thread::sleep(Duration::from_millis(100));
        assert!(!acquired.load(Ordering::SeqCst), "third take must block");

        pool.put(first).unwrap();
        let third = waiter.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
        pool.put(third).unwrap();
    });
    assert_eq!(pool.checked_out().unwrap(), 1);
}

// =============================================================================
// POOL-04: concurrent sessions never share an engine and agree on results
// =============================================================================
#[test]
fn pool_04_concurrent_sessions() {
    let model = Arc::new(latent_tree());
    let a = var(&model, "a");
    let root = var(&model, "root");
    let pool = PropagationPool::build(Arc::clone(&model), 3).unwrap();

    let mut reference = PropagationEngine::new(Arc::clone(&model)).unwrap();
    let expected: Vec<Potential> = (0..2)
        .map(|state| {
            reference.set_evidence(&[a.clone()], &[state]).unwrap();
            reference.propagate().unwrap();
            reference.compute_belief(&root).unwrap()
        })
        .collect();

    let in_use = std::sync::atomic::AtomicUsize::new(0);
    thread::scope(|s| {
        for t in 0..8 {
            let (pool, a, root, expected, in_use) = (&pool, &a, &root, &expected, &in_use);
            s.spawn(move || {
                for i in 0..20 {
                    let state = (t + i) % 2;
                    let mut engine = pool.checkout().unwrap();
                    let now = in_use.fetch_add(1, Ordering::SeqCst) + 1;
                    assert!(now <= 3, "{now} engines in use");
                    engine.add_evidence(a, state).unwrap();
                    engine.propagate().unwrap();
                    let belief = engine.compute_belief(root).unwrap();
                    in_use.fetch_sub(1, Ordering::SeqCst);
                    let diff = belief
                        .cells()
                        .iter()
                        .zip(expected[state].cells())
                        .map(|(x, y)| (x - y).abs())
                        .fold(0.0, f64::max);
                    assert!(diff < 1e-12);
                }
            });
        }
    });
    assert_eq!(pool.available().unwrap(), 3);
}

// =============================================================================
// POOL-05: returned engines come back without evidence
// =============================================================================
#[test]
fn pool_05_put_clears_evidence() {
    let model = Arc::new(xyz_chain());
    let x = var(&model, "x");
    let pool = PropagationPool::build(model, 1).unwrap();
    let mut engine = pool.take().unwrap();
    engine.add_evidence(&x, 1).unwrap();
    pool.put(engine).unwrap();
    let engine = pool.take().unwrap();
    assert!(engine.evidence().is_empty());
    pool.put(engine).unwrap();
}

// =============================================================================
// POOL-06: rebinding waits for every engine to be home
// =============================================================================
#[test]
fn pool_06_rebind_all() {
    let model = Arc::new(xyz_chain());
    let x = var(&model, "x");
    let pool = PropagationPool::build(Arc::clone(&model), 2).unwrap();

    let mut updated = model.as_ref().clone();
    updated
        .set_cpt("x", Potential::from_cells(vec![x.clone()], vec![0.25, 0.75]).unwrap())
        .unwrap();
    let updated = Arc::new(updated);

    let engine = pool.take().unwrap();
    assert!(matches!(
        pool.rebind_all(Arc::clone(&updated)),
        Err(CtpError::Pool(PoolError::EnginesCheckedOut { checked_out: 1 }))
    ));
    pool.put(engine).unwrap();
    pool.rebind_all(Arc::clone(&updated)).unwrap();

    let mut engine = pool.checkout().unwrap();
    engine.propagate().unwrap();
    let belief = engine.compute_belief(&x).unwrap();
    assert!((belief.cells()[0] - 0.25).abs() < 1e-12);
    assert!(Arc::ptr_eq(engine.model(), &updated));
}

// =============================================================================
// POOL-07: a template's engines share its tree and interrupt flag
// =============================================================================
#[test]
fn pool_07_from_template() {
    let model = Arc::new(xyz_chain());
    let template = PropagationEngine::new(Arc::clone(&model)).unwrap();
    let pool = PropagationPool::from_template(&template, Arc::clone(&model), 2).unwrap();
    assert!(Arc::ptr_eq(pool.tree(), template.tree()));

    template.interrupt_flag().raise();
    let mut engine = pool.checkout().unwrap();
    assert!(matches!(
        engine.propagate(),
        Err(CtpError::Interrupted { .. })
    ));
    pool.interrupt_flag().clear();
    assert!(engine.propagate().is_ok());
}

// =============================================================================
// POOL-08: only engines the pool issued are taken back
// =============================================================================
#[test]
fn pool_08_forks_are_not_pool_engines() {
    let model = Arc::new(xyz_chain());
    let template = PropagationEngine::new(Arc::clone(&model)).unwrap();
    let pool = PropagationPool::from_template(&template, Arc::clone(&model), 2).unwrap();
    // Same tree, different pool.
    let sibling = PropagationPool::from_template(&template, Arc::clone(&model), 2).unwrap();

    let engine = pool.take().unwrap();
    let fork = engine.fork();
    assert!(matches!(
        pool.put(fork),
        Err(CtpError::Pool(PoolError::ForeignEngine))
    ));
    assert_eq!(pool.checked_out().unwrap(), 1);

    let stray = sibling.take().unwrap();
    assert!(matches!(
        pool.put(stray),
        Err(CtpError::Pool(PoolError::ForeignEngine))
    ));

    pool.put(engine).unwrap();
    assert_eq!(pool.available().unwrap(), 2);
    assert_eq!(pool.checked_out().unwrap(), 0);
}

// =============================================================================
// POOL-09: a detached engine stays checked out until put back
// =============================================================================
#[test]
fn pool_09_detach() {
    let model = Arc::new(xyz_chain());
    let x = var(&model, "x");
    let pool = PropagationPool::build(model, 2).unwrap();

    let guard = pool.checkout().unwrap();
    let mut engine = guard.detach().unwrap();
    assert_eq!(pool.checked_out().unwrap(), 1);
    assert_eq!(pool.available().unwrap(), 1);

    engine.add_evidence(&x, 0).unwrap();
    engine.propagate().unwrap();
    pool.put(engine).unwrap();
    assert_eq!(pool.checked_out().unwrap(), 0);
    assert_eq!(pool.available().unwrap(), 2);
}
