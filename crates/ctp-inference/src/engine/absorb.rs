use std::sync::Arc;

use ctp_core::errors::StructuralError;
use ctp_core::{CtpResult, Potential};

use super::{AttachedPotential, Phase, PropagationEngine};

impl PropagationEngine {
    /// Drop attached potentials and messages, then attach every CPT to its
    /// family clique, projected on each observed member of its family.
    pub fn absorb_evidence(&mut self) -> CtpResult<()> {
        self.reset_caches();

        for node in self.model.discrete_nodes() {
            let clique = self.tree.family_clique(node.variable()).ok_or_else(|| {
                StructuralError::MissingFamilyClique {
                    variable: node.variable().name().to_string(),
                }
            })?;

            let cpt = node.cpt();
            let mut projected: Option<Potential> = None;
            for member in cpt.scope() {
                if let Some(&state) = self.evidence.get(member) {
                    let source = projected.as_ref().unwrap_or(cpt.as_ref());
                    projected = Some(source.project(member, state)?);
                }
            }

            let attached = match projected {
                Some(owned) => AttachedPotential::Owned(owned),
                None => AttachedPotential::Shared(Arc::clone(cpt)),
            };
            self.attached[clique.index()].push(attached);
        }

        self.phase = Phase::EvidenceAbsorbed;
        Ok(())
    }
}
