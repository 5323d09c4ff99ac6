//! PropagationEngine: one propagation session over a shared clique tree.
//!
//! The engine owns everything that changes per session (evidence, attached
//! potentials, message caches, cached likelihood) and borrows the tree and the
//! model through `Arc`. Engines sharing a tree never share mutable state.
//!
//! Split across files:
//! - `absorb` attaches (projected) CPTs to family cliques
//! - `messages` runs collect/distribute and `propagate`
//! - `queries` answers likelihood and belief queries

mod absorb;
mod messages;
mod queries;

use std::collections::{BTreeMap, HashMap};
use std::ops::Deref;
use std::sync::Arc;

use ctp_core::config::InferenceConfig;
use ctp_core::constants::LOG_DRIFT_TOLERANCE;
use ctp_core::errors::{EvidenceError, StructuralError};
use ctp_core::{BayesNet, CtpResult, Potential, Variable};

use crate::interrupt::InterruptFlag;
use crate::pool::Lease;
use crate::tree::{CliqueId, ClusterTree};

/// A potential attached to a clique: the model's CPT as is, or a copy
/// projected on evidence.
#[derive(Debug, Clone)]
pub enum AttachedPotential {
    Shared(Arc<Potential>),
    Owned(Potential),
}

impl AttachedPotential {
    pub fn is_shared(&self) -> bool {
        matches!(self, AttachedPotential::Shared(_))
    }
}

impl Deref for AttachedPotential {
    type Target = Potential;

    fn deref(&self) -> &Potential {
        match self {
            AttachedPotential::Shared(p) => p,
            AttachedPotential::Owned(p) => p,
        }
    }
}

/// A normalized message with the constants divided out along the way.
#[derive(Debug, Clone)]
pub struct Message {
    pub(crate) potential: Potential,
    pub(crate) normalization: f64,
    pub(crate) log_normalization: f64,
}

impl Message {
    pub fn potential(&self) -> &Potential {
        &self.potential
    }

    /// Product of every divisor this message and its inputs were normalized by.
    /// May underflow to zero on deep trees; the log form does not.
    pub fn normalization(&self) -> f64 {
        self.normalization
    }

    pub fn log_normalization(&self) -> f64 {
        self.log_normalization
    }
}

/// Where the engine is in the absorb → collect → distribute cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    EvidenceAbsorbed,
    Collected,
    Distributed,
}

/// Sum-product propagation over one clique tree.
#[derive(Debug)]
pub struct PropagationEngine {
    tree: Arc<ClusterTree>,
    model: Arc<BayesNet>,
    evidence: BTreeMap<Variable, usize>,
    attached: Vec<Vec<AttachedPotential>>,
    messages: HashMap<(CliqueId, CliqueId), Message>,
    last_likelihood: f64,
    last_log_likelihood: f64,
    phase: Phase,
    interrupt: InterruptFlag,
    log_drift_tolerance: f64,
    /// Set while the engine belongs to a pool slot.
    pub(crate) lease: Option<Lease>,
}

impl PropagationEngine {
    /// Build a fresh tree for `model` and an engine over it.
    pub fn new(model: Arc<BayesNet>) -> CtpResult<Self> {
        let tree = Arc::new(ClusterTree::build(&model)?);
        Self::with_tree(tree, model)
    }

    /// Engine over an existing tree. The tree must match the model's structure.
    pub fn with_tree(tree: Arc<ClusterTree>, model: Arc<BayesNet>) -> CtpResult<Self> {
        check_structure(&tree, &model)?;
        let cliques = tree.clique_count();
        Ok(Self {
            tree,
            model,
            evidence: BTreeMap::new(),
            attached: vec![Vec::new(); cliques],
            messages: HashMap::new(),
            last_likelihood: f64::NAN,
            last_log_likelihood: f64::NAN,
            phase: Phase::Idle,
            interrupt: InterruptFlag::new(),
            log_drift_tolerance: LOG_DRIFT_TOLERANCE,
            lease: None,
        })
    }

    /// Apply the inference section of the config.
    pub fn with_config(mut self, config: &InferenceConfig) -> Self {
        self.log_drift_tolerance = config.log_drift_tolerance;
        self
    }

    /// New engine on the same tree and model: no evidence, empty caches,
    /// same interrupt flag. A fork of a pooled engine belongs to no pool.
    pub fn fork(&self) -> Self {
        Self {
            tree: Arc::clone(&self.tree),
            model: Arc::clone(&self.model),
            evidence: BTreeMap::new(),
            attached: vec![Vec::new(); self.tree.clique_count()],
            messages: HashMap::new(),
            last_likelihood: f64::NAN,
            last_log_likelihood: f64::NAN,
            phase: Phase::Idle,
            interrupt: self.interrupt.clone(),
            log_drift_tolerance: self.log_drift_tolerance,
            lease: None,
        }
    }

    /// Rebind to a model with the same structure (parameters may differ).
    /// Caches are dropped; evidence is kept.
    pub fn set_model(&mut self, model: Arc<BayesNet>) -> CtpResult<()> {
        check_structure(&self.tree, &model)?;
        self.model = model;
        self.reset_caches();
        Ok(())
    }

    /// Replace the evidence wholesale. Nothing changes if any pair is invalid.
    pub fn set_evidence(&mut self, variables: &[Variable], states: &[usize]) -> CtpResult<()> {
        if variables.len() != states.len() {
            return Err(EvidenceError::SizeMismatch {
                variables: variables.len(),
                states: states.len(),
            }
            .into());
        }
        let mut evidence = BTreeMap::new();
        for (variable, &state) in variables.iter().zip(states) {
            let canonical = self.check_evidence(variable, state)?;
            evidence.insert(canonical, state);
        }
        self.evidence = evidence;
        Ok(())
    }

    /// Observe one more variable, replacing any earlier observation of it.
    pub fn add_evidence(&mut self, variable: &Variable, state: usize) -> CtpResult<()> {
        let canonical = self.check_evidence(variable, state)?;
        self.evidence.insert(canonical, state);
        Ok(())
    }

    /// Forget one observation. Returns whether it was observed.
    pub fn remove_evidence(&mut self, variable: &Variable) -> bool {
        self.evidence.remove(variable).is_some()
    }

    pub fn clear_evidence(&mut self) {
        self.evidence.clear();
    }

    pub fn evidence(&self) -> &BTreeMap<Variable, usize> {
        &self.evidence
    }

    pub fn observed_state(&self, variable: &Variable) -> Option<usize> {
        self.evidence.get(variable).copied()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Likelihood from the last `compute_likelihood`. NaN before the first.
    pub fn last_likelihood(&self) -> f64 {
        self.last_likelihood
    }

    /// Log-likelihood from the last `compute_likelihood`. NaN before the first.
    pub fn last_log_likelihood(&self) -> f64 {
        self.last_log_likelihood
    }

    pub fn tree(&self) -> &Arc<ClusterTree> {
        &self.tree
    }

    pub fn model(&self) -> &Arc<BayesNet> {
        &self.model
    }

    pub fn interrupt_flag(&self) -> &InterruptFlag {
        &self.interrupt
    }

    /// Potentials attached to a clique by the last absorption.
    pub fn attached_potentials(&self, clique: CliqueId) -> &[AttachedPotential] {
        self.attached
            .get(clique.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Cached message on a directed edge, if computed.
    pub fn message(&self, from: CliqueId, to: CliqueId) -> Option<&Message> {
        self.messages.get(&(from, to))
    }

    fn check_evidence(&self, variable: &Variable, state: usize) -> CtpResult<Variable> {
        let canonical = self
            .model
            .variable(variable)
            .filter(|v| v.cardinality() == variable.cardinality())
            .ok_or_else(|| EvidenceError::UnknownVariable {
                variable: variable.name().to_string(),
            })?;
        if !canonical.is_valid_state(state) {
            return Err(EvidenceError::InvalidState {
                variable: canonical.name().to_string(),
                state,
                cardinality: canonical.cardinality(),
            }
            .into());
        }
        Ok(canonical.clone())
    }

    fn reset_caches(&mut self) {
        for attached in &mut self.attached {
            attached.clear();
        }
        self.messages.clear();
        self.last_likelihood = f64::NAN;
        self.last_log_likelihood = f64::NAN;
        self.phase = Phase::Idle;
    }
}

fn check_structure(tree: &ClusterTree, model: &BayesNet) -> CtpResult<()> {
    if tree.is_stale_for(model) {
        return Err(StructuralError::StaleTree {
            tree_stamp: tree.structure_stamp(),
            model_stamp: model.structure_stamp(),
        }
        .into());
    }
    Ok(())
}
