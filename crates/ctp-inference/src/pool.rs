//! Bounded pool of propagation engines sharing one clique tree.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use ctp_core::constants::MAX_POOL_CAPACITY;
use ctp_core::errors::PoolError;
use ctp_core::{BayesNet, CtpError, CtpResult};
use tracing::{debug, warn};

use crate::engine::PropagationEngine;
use crate::interrupt::InterruptFlag;
use crate::tree::ClusterTree;

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Which pool and slot an engine was issued from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Lease {
    pool: u64,
    slot: usize,
}

#[derive(Debug)]
struct PoolState {
    model: Arc<BayesNet>,
    idle: Vec<PropagationEngine>,
    /// Per slot, whether its engine is checked out.
    out: Vec<bool>,
    checked_out: usize,
}

/// A fixed number of engines bound to the same model and tree.
///
/// `take` blocks on a condition variable until an engine is idle; `put` hands
/// it back and wakes one waiter. No engine is ever handed out twice, and only
/// the engines the pool issued are taken back.
#[derive(Debug)]
pub struct PropagationPool {
    id: u64,
    tree: Arc<ClusterTree>,
    state: Mutex<PoolState>,
    available: Condvar,
    capacity: usize,
    interrupt: InterruptFlag,
}

impl PropagationPool {
    /// Build a tree for `model` and `capacity` engines over it.
    pub fn build(model: Arc<BayesNet>, capacity: usize) -> CtpResult<Self> {
        check_capacity(capacity)?;
        let template = PropagationEngine::new(model)?;
        Self::from_template(&template, Arc::clone(template.model()), capacity)
    }

    /// Fork `template` `capacity` times, binding every copy to `model`.
    pub fn from_template(
        template: &PropagationEngine,
        model: Arc<BayesNet>,
        capacity: usize,
    ) -> CtpResult<Self> {
        check_capacity(capacity)?;
        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        let mut idle = Vec::with_capacity(capacity);
        for slot in 0..capacity {
            let mut engine = template.fork();
            engine.set_model(Arc::clone(&model))?;
            engine.lease = Some(Lease { pool: id, slot });
            idle.push(engine);
        }
        debug!(capacity, cliques = template.tree().clique_count(), "propagation pool ready");
        Ok(Self {
            id,
            tree: Arc::clone(template.tree()),
            state: Mutex::new(PoolState {
                model,
                idle,
                out: vec![false; capacity],
                checked_out: 0,
            }),
            available: Condvar::new(),
            capacity,
            interrupt: template.interrupt_flag().clone(),
        })
    }

    /// Block until an engine is idle and check it out.
    pub fn take(&self) -> CtpResult<PropagationEngine> {
        let mut state = self.lock()?;
        loop {
            if let Some(engine) = state.idle.pop() {
                state.mark_out(&engine);
                return Ok(engine);
            }
            state = self
                .available
                .wait(state)
                .map_err(|e| CtpError::ConcurrencyError(format!("pool wait poisoned: {e}")))?;
        }
    }

    /// Check out an engine if one is idle, without blocking.
    pub fn try_take(&self) -> CtpResult<Option<PropagationEngine>> {
        let mut state = self.lock()?;
        let engine = state.idle.pop();
        if let Some(engine) = &engine {
            state.mark_out(engine);
        }
        Ok(engine)
    }

    /// Return an engine this pool issued. Its evidence is cleared; one waiter
    /// is woken. Forks of pooled engines and engines of other pools are
    /// refused, even on the same tree.
    pub fn put(&self, mut engine: PropagationEngine) -> CtpResult<()> {
        if !Arc::ptr_eq(engine.tree(), &self.tree) {
            return Err(PoolError::ForeignEngine.into());
        }
        let mut state = self.lock()?;
        if state.checked_out == 0 {
            return Err(PoolError::Overflow {
                capacity: self.capacity,
            }
            .into());
        }
        let slot = match engine.lease {
            Some(lease) if lease.pool == self.id && state.out[lease.slot] => lease.slot,
            _ => return Err(PoolError::ForeignEngine.into()),
        };
        engine.clear_evidence();
        state.idle.push(engine);
        state.out[slot] = false;
        state.checked_out -= 1;
        drop(state);
        self.available.notify_one();
        Ok(())
    }

    /// Check out an engine behind a guard that returns it on drop.
    pub fn checkout(&self) -> CtpResult<PooledEngine<'_>> {
        let engine = self.take()?;
        Ok(PooledEngine {
            pool: self,
            engine: Some(engine),
        })
    }

    /// Rebind every engine to a model with the same structure. Fails while
    /// any engine is checked out.
    pub fn rebind_all(&self, model: Arc<BayesNet>) -> CtpResult<()> {
        let mut state = self.lock()?;
        if state.checked_out > 0 {
            return Err(PoolError::EnginesCheckedOut {
                checked_out: state.checked_out,
            }
            .into());
        }
        for engine in &mut state.idle {
            engine.set_model(Arc::clone(&model))?;
        }
        state.model = model;
        Ok(())
    }

    /// The model every engine is currently bound to.
    pub fn model(&self) -> CtpResult<Arc<BayesNet>> {
        Ok(Arc::clone(&self.lock()?.model))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Idle engines right now.
    pub fn available(&self) -> CtpResult<usize> {
        Ok(self.lock()?.idle.len())
    }

    pub fn checked_out(&self) -> CtpResult<usize> {
        Ok(self.lock()?.checked_out)
    }

    pub fn tree(&self) -> &Arc<ClusterTree> {
        &self.tree
    }

    /// The flag shared by every engine of the pool.
    pub fn interrupt_flag(&self) -> &InterruptFlag {
        &self.interrupt
    }

    fn lock(&self) -> CtpResult<MutexGuard<'_, PoolState>> {
        self.state
            .lock()
            .map_err(|e| CtpError::ConcurrencyError(format!("pool lock poisoned: {e}")))
    }
}

impl PoolState {
    fn mark_out(&mut self, engine: &PropagationEngine) {
        if let Some(lease) = engine.lease {
            self.out[lease.slot] = true;
        }
        self.checked_out += 1;
    }
}

fn check_capacity(capacity: usize) -> CtpResult<()> {
    if capacity == 0 || capacity > MAX_POOL_CAPACITY {
        return Err(PoolError::InvalidCapacity {
            capacity,
            max: MAX_POOL_CAPACITY,
        }
        .into());
    }
    Ok(())
}

/// A checked-out engine, returned to its pool on drop.
pub struct PooledEngine<'p> {
    pool: &'p PropagationPool,
    engine: Option<PropagationEngine>,
}

impl PooledEngine<'_> {
    /// Take the engine out of the guard; the caller must `put` it back.
    pub fn detach(mut self) -> Option<PropagationEngine> {
        self.engine.take()
    }
}

impl Deref for PooledEngine<'_> {
    type Target = PropagationEngine;

    fn deref(&self) -> &PropagationEngine {
        self.engine
            .as_ref()
            .unwrap_or_else(|| unreachable!("engine is present until drop"))
    }
}

impl DerefMut for PooledEngine<'_> {
    fn deref_mut(&mut self) -> &mut PropagationEngine {
        self.engine
            .as_mut()
            .unwrap_or_else(|| unreachable!("engine is present until drop"))
    }
}

impl Drop for PooledEngine<'_> {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            if let Err(e) = self.pool.put(engine) {
                warn!(error = %e, "failed to return engine to pool");
            }
        }
    }
}
