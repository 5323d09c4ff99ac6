//! Expected sufficient statistics for discrete CPTs.

use std::collections::BTreeMap;

use ctp_core::errors::ModelError;
use ctp_core::{BayesNet, CtpResult, Potential, Variable};

/// Weighted family counts per variable plus the data log-likelihood they
/// were collected under.
#[derive(Debug, Clone)]
pub struct SufficientStatistics {
    families: BTreeMap<Variable, Potential>,
    weight: f64,
    log_likelihood: f64,
    direct_log_likelihood: f64,
}

impl SufficientStatistics {
    /// All-zero counts shaped like `model`'s CPTs.
    pub fn zeros(model: &BayesNet) -> CtpResult<Self> {
        let mut families = BTreeMap::new();
        for node in model.discrete_nodes() {
            families.insert(
                node.variable().clone(),
                Potential::zeros(node.cpt().scope().to_vec())?,
            );
        }
        Ok(Self {
            families,
            weight: 0.0,
            log_likelihood: 0.0,
            direct_log_likelihood: 0.0,
        })
    }

    /// Add `weight` times a family belief to `variable`'s counts.
    pub fn add_family(&mut self, variable: &Variable, belief: &Potential, weight: f64) -> CtpResult<()> {
        let counts = self.families.get_mut(variable).ok_or_else(|| ModelError::UnknownVariable {
            name: variable.name().to_string(),
        })?;
        counts.add_scaled(belief, weight)
    }

    /// Record one case's weight and likelihood in both forms.
    pub fn add_case(&mut self, weight: f64, likelihood: f64, log_likelihood: f64) {
        self.weight += weight;
        self.log_likelihood += weight * log_likelihood;
        self.direct_log_likelihood += weight * likelihood.ln();
    }

    /// Elementwise sum of two statistics over the same model.
    pub fn merge(mut self, other: SufficientStatistics) -> CtpResult<Self> {
        for (variable, counts) in other.families {
            match self.families.get_mut(&variable) {
                Some(mine) => mine.add_assign(&counts)?,
                None => {
                    self.families.insert(variable, counts);
                }
            }
        }
        self.weight += other.weight;
        self.log_likelihood += other.log_likelihood;
        self.direct_log_likelihood += other.direct_log_likelihood;
        Ok(self)
    }

    pub fn families(&self) -> &BTreeMap<Variable, Potential> {
        &self.families
    }

    pub fn family(&self, variable: &Variable) -> Option<&Potential> {
        self.families.get(variable)
    }

    /// Total case weight.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Weighted sum of per-case log-likelihoods from the log constants.
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Weighted sum of `ln` of the plain per-case likelihoods. `-inf` once
    /// any case underflowed.
    pub fn direct_log_likelihood(&self) -> f64 {
        self.direct_log_likelihood
    }

    /// Maximum-likelihood CPTs from these counts, with `pseudo_count` added to
    /// every cell first. Rows without mass become uniform.
    pub fn estimate(&self, template: &BayesNet, pseudo_count: f64) -> CtpResult<BayesNet> {
        let mut model = template.clone();
        for (variable, counts) in &self.families {
            let mut cpt = counts.clone();
            if pseudo_count != 0.0 {
                cpt.add_constant(pseudo_count);
            }
            cpt.normalize_conditional(variable)?;
            model.set_cpt(variable, cpt)?;
        }
        Ok(model)
    }
}
