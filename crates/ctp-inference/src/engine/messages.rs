use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use ctp_core::errors::{CtpError, NumericError};
use ctp_core::{propagation_span, CtpResult, Potential, Variable};
use tracing::{trace, warn};

use super::{Message, Phase, PropagationEngine};
use crate::tree::CliqueId;

pub(crate) type MessageStore = HashMap<(CliqueId, CliqueId), Message>;

impl PropagationEngine {
    /// Absorb evidence, collect into the pivot, distribute back out, and
    /// return the likelihood of the evidence.
    pub fn propagate(&mut self) -> CtpResult<f64> {
        let _span = propagation_span!(self.tree.clique_count(), self.evidence.len()).entered();
        if self.interrupt.is_raised() {
            return Err(CtpError::Interrupted {
                operation: "propagate".to_string(),
            });
        }

        self.absorb_evidence()?;

        let pivot = self.tree.pivot();
        let tree = Arc::clone(&self.tree);
        for &neighbor in tree.neighbors(pivot) {
            self.collect_message(neighbor, pivot)?;
        }
        self.phase = Phase::Collected;
        for &neighbor in tree.neighbors(pivot) {
            self.distribute_message(pivot, neighbor)?;
        }
        self.phase = Phase::Distributed;

        let likelihood = self.compute_likelihood()?;
        trace!(
            likelihood,
            log_likelihood = self.last_log_likelihood,
            "propagated"
        );
        Ok(likelihood)
    }

    /// Compute and cache the `source → destination` message after first
    /// collecting every message flowing into `source` from the other side.
    pub fn collect_message(&mut self, source: CliqueId, destination: CliqueId) -> CtpResult<()> {
        let tree = Arc::clone(&self.tree);
        for &neighbor in tree.neighbors(source) {
            if neighbor != destination {
                self.collect_message(neighbor, source)?;
            }
        }
        let message = {
            let incoming = incoming(&self.messages, tree.neighbors(source), source, destination)?;
            self.build_message(source, destination, &incoming, &[])?
        };
        self.messages.insert((source, destination), message);
        Ok(())
    }

    /// Compute the `source → destination` message from the messages already
    /// cached at `source`, then continue outward from `destination`.
    pub fn distribute_message(&mut self, source: CliqueId, destination: CliqueId) -> CtpResult<()> {
        let tree = Arc::clone(&self.tree);
        let message = {
            let incoming = incoming(&self.messages, tree.neighbors(source), source, destination)?;
            self.build_message(source, destination, &incoming, &[])?
        };
        self.messages.insert((source, destination), message);
        for &neighbor in tree.neighbors(destination) {
            if neighbor != source {
                self.distribute_message(destination, neighbor)?;
            }
        }
        Ok(())
    }

    /// Collect toward `destination` inside `subtree` into a scratch store,
    /// keeping `retained` variables. Messages entering from outside the
    /// subtree are read from the propagation cache.
    pub(crate) fn collect_scratch(
        &self,
        source: CliqueId,
        destination: CliqueId,
        subtree: &BTreeSet<CliqueId>,
        retained: &[Variable],
        scratch: &mut MessageStore,
    ) -> CtpResult<()> {
        let neighbors = self.tree.neighbors(source);
        for &neighbor in neighbors {
            if neighbor != destination && subtree.contains(&neighbor) {
                self.collect_scratch(neighbor, source, subtree, retained, scratch)?;
            }
        }
        let message = {
            let mut inputs = Vec::with_capacity(neighbors.len());
            for &neighbor in neighbors {
                if neighbor == destination {
                    continue;
                }
                let store = if subtree.contains(&neighbor) {
                    &*scratch
                } else {
                    &self.messages
                };
                inputs.push(lookup(store, neighbor, source)?);
            }
            self.build_message(source, destination, &inputs, retained)?
        };
        scratch.insert((source, destination), message);
        Ok(())
    }

    /// Product of the potentials attached to `clique` and `incoming`,
    /// with the summed constants of the incoming messages.
    pub(crate) fn clique_product(&self, clique: CliqueId, incoming: &[&Message]) -> (Potential, f64, f64) {
        let mut product = Potential::identity();
        for attached in self.attached_potentials(clique) {
            product = product.times(attached);
        }
        let mut normalization = 1.0;
        let mut log_normalization = 0.0;
        for message in incoming {
            product = product.times(&message.potential);
            normalization *= message.normalization;
            log_normalization += message.log_normalization;
        }
        (product, normalization, log_normalization)
    }

    fn build_message(
        &self,
        source: CliqueId,
        destination: CliqueId,
        incoming: &[&Message],
        retained: &[Variable],
    ) -> CtpResult<Message> {
        let (product, normalization, log_normalization) = self.clique_product(source, incoming);

        let eliminated: Vec<Variable> = self
            .tree
            .difference(source, destination)
            .unwrap_or(&[])
            .iter()
            .filter(|v| !self.evidence.contains_key(*v) && !retained.contains(*v))
            .cloned()
            .collect();
        let mut potential = product.sum_out(&eliminated);

        let divisor = potential.normalize();
        let context = || format!("message {source} -> {destination}");
        if !(divisor >= f64::MIN_POSITIVE) {
            return Err(NumericError::Underflow {
                context: context(),
                value: divisor,
            }
            .into());
        }

        let normalization = normalization * divisor;
        let log_normalization = log_normalization + divisor.ln();
        if log_normalization.is_nan() {
            return Err(NumericError::Underflow {
                context: context(),
                value: log_normalization,
            }
            .into());
        }
        if normalization >= f64::MIN_POSITIVE && normalization.is_finite() {
            let drift = (normalization.ln() - log_normalization).abs();
            if drift > self.log_drift_tolerance {
                warn!(
                    source = %source,
                    destination = %destination,
                    drift,
                    "plain and log normalization constants disagree"
                );
            }
        }

        Ok(Message {
            potential,
            normalization,
            log_normalization,
        })
    }
}

/// Messages cached at `source` from every neighbor but `destination`.
/// Pass `destination == source` to take all of them.
pub(crate) fn incoming<'m>(
    store: &'m MessageStore,
    neighbors: &[CliqueId],
    source: CliqueId,
    destination: CliqueId,
) -> CtpResult<Vec<&'m Message>> {
    neighbors
        .iter()
        .filter(|&&n| n != destination)
        .map(|&n| lookup(store, n, source))
        .collect()
}

fn lookup(store: &MessageStore, from: CliqueId, to: CliqueId) -> CtpResult<&Message> {
    store.get(&(from, to)).ok_or_else(|| CtpError::InternalState {
        details: format!("message {from} -> {to} has not been computed"),
    })
}
