use std::collections::BTreeSet;

use ctp_core::errors::{NumericError, QueryError};
use ctp_core::{CtpResult, Potential, Variable};

use super::messages::{incoming, MessageStore};
use super::PropagationEngine;
use crate::tree::CliqueId;

impl PropagationEngine {
    /// Likelihood of the evidence, evaluated at the pivot from the cached
    /// messages. Caches both the plain and the log form.
    pub fn compute_likelihood(&mut self) -> CtpResult<f64> {
        let pivot = self.tree.pivot();
        let (sum, normalization, log_normalization) = {
            let messages = incoming(&self.messages, self.tree.neighbors(pivot), pivot, pivot)?;
            let (product, normalization, log_normalization) = self.clique_product(pivot, &messages);
            (product.sum(), normalization, log_normalization)
        };
        if !(sum >= f64::MIN_POSITIVE) {
            return Err(NumericError::Underflow {
                context: "likelihood".to_string(),
                value: sum,
            }
            .into());
        }
        self.last_likelihood = sum * normalization;
        self.last_log_likelihood = sum.ln() + log_normalization;
        Ok(self.last_likelihood)
    }

    /// Posterior of one variable. Observed variables get a point mass.
    pub fn compute_belief(&self, variable: &Variable) -> CtpResult<Potential> {
        let variable = self.query_variable(variable)?;
        if let Some(state) = self.observed_state(&variable) {
            self.check_likelihood()?;
            return Potential::indicator(&[variable], &[state]);
        }
        let clique = self.covering_clique(&variable)?;
        let mut belief = self.clique_belief(clique)?.marginalize(&[variable])?;
        belief.normalize();
        Ok(belief)
    }

    /// Joint posterior of `[variable, parents...]`, in the CPT's scope order.
    pub fn compute_family_belief(&self, variable: &Variable) -> CtpResult<Potential> {
        let variable = self.query_variable(variable)?;
        let family = self.model.family(&variable)?;
        let (observed, hidden) = self.split_observed(&family);
        let clique = self.covering_clique(&variable)?;

        let mut belief = self.clique_belief(clique)?.marginalize(&hidden)?;
        belief.normalize();
        self.finish_joint(belief, &observed, &family)
    }

    /// Joint posterior of an arbitrary variable set, computed on the minimal
    /// subtree covering its hidden members.
    pub fn compute_belief_of(&self, variables: &[Variable]) -> CtpResult<Potential> {
        let query = self.query_variables(variables)?;
        let (_, hidden) = self.split_observed(&query);
        let subtree = if hidden.is_empty() {
            BTreeSet::new()
        } else {
            self.tree.minimal_subtree(&hidden)
        };
        self.belief_on(&query, &subtree)
    }

    /// Like [`compute_belief_of`](Self::compute_belief_of) on a caller-chosen
    /// subtree. The subtree must be connected and cover every hidden variable.
    pub fn compute_belief_in_subtree(
        &self,
        variables: &[Variable],
        subtree: &BTreeSet<CliqueId>,
    ) -> CtpResult<Potential> {
        let query = self.query_variables(variables)?;
        self.belief_on(&query, subtree)
    }

    fn belief_on(&self, query: &[Variable], subtree: &BTreeSet<CliqueId>) -> CtpResult<Potential> {
        let (observed, hidden) = self.split_observed(query);
        if hidden.is_empty() {
            return self.finish_joint(Potential::identity(), &observed, query);
        }

        if !self.tree.is_connected_subset(subtree) {
            return Err(QueryError::MalformedSubtree {
                cliques: subtree.len(),
            }
            .into());
        }
        for variable in &hidden {
            if !subtree.iter().any(|&id| self.tree.clique(id).contains(variable)) {
                return Err(QueryError::InvalidSubtree {
                    variable: variable.name().to_string(),
                }
                .into());
            }
        }

        let Some(&local_pivot) = subtree.iter().next() else {
            return Err(QueryError::MalformedSubtree { cliques: 0 }.into());
        };
        let mut scratch = MessageStore::new();
        let neighbors = self.tree.neighbors(local_pivot);
        for &neighbor in neighbors {
            if subtree.contains(&neighbor) {
                self.collect_scratch(neighbor, local_pivot, subtree, &hidden, &mut scratch)?;
            }
        }

        let mut inputs = Vec::with_capacity(neighbors.len());
        for &neighbor in neighbors {
            let store = if subtree.contains(&neighbor) {
                &scratch
            } else {
                &self.messages
            };
            inputs.extend(incoming(store, &[neighbor], local_pivot, local_pivot)?);
        }
        let (product, _, _) = self.clique_product(local_pivot, &inputs);
        let mut belief = product.marginalize(&hidden)?;
        belief.normalize();
        self.finish_joint(belief, &observed, query)
    }

    /// Product of a clique's attached potentials and all its cached incoming
    /// messages: the unnormalized joint over its unobserved variables.
    fn clique_belief(&self, clique: CliqueId) -> CtpResult<Potential> {
        let messages = incoming(&self.messages, self.tree.neighbors(clique), clique, clique)?;
        Ok(self.clique_product(clique, &messages).0)
    }

    /// Multiply a normalized hidden-part belief with the observed indicator and
    /// lay the result out in `order`.
    fn finish_joint(
        &self,
        hidden_belief: Potential,
        observed: &[(Variable, usize)],
        order: &[Variable],
    ) -> CtpResult<Potential> {
        if observed.is_empty() {
            return hidden_belief.marginalize(order);
        }
        self.check_likelihood()?;
        let (variables, states): (Vec<Variable>, Vec<usize>) = observed.iter().cloned().unzip();
        let indicator = Potential::indicator(&variables, &states)?;
        hidden_belief.times(&indicator).marginalize(order)
    }

    fn split_observed(&self, variables: &[Variable]) -> (Vec<(Variable, usize)>, Vec<Variable>) {
        let mut observed = Vec::new();
        let mut hidden = Vec::new();
        for variable in variables {
            match self.observed_state(variable) {
                Some(state) => observed.push((variable.clone(), state)),
                None => hidden.push(variable.clone()),
            }
        }
        (observed, hidden)
    }

    fn check_likelihood(&self) -> CtpResult<()> {
        if !self.last_log_likelihood.is_finite() {
            return Err(NumericError::NonPositiveLikelihood {
                log_likelihood: self.last_log_likelihood,
            }
            .into());
        }
        Ok(())
    }

    fn covering_clique(&self, variable: &Variable) -> CtpResult<CliqueId> {
        self.tree.family_clique(variable).ok_or_else(|| {
            QueryError::UnknownVariable {
                variable: variable.name().to_string(),
            }
            .into()
        })
    }

    fn query_variable(&self, variable: &Variable) -> CtpResult<Variable> {
        self.model
            .variable(variable)
            .filter(|v| v.cardinality() == variable.cardinality())
            .cloned()
            .ok_or_else(|| {
                QueryError::UnknownVariable {
                    variable: variable.name().to_string(),
                }
                .into()
            })
    }

    /// Canonical, deduplicated query variables in first-seen order.
    fn query_variables(&self, variables: &[Variable]) -> CtpResult<Vec<Variable>> {
        if variables.is_empty() {
            return Err(QueryError::EmptyQuery.into());
        }
        let mut query: Vec<Variable> = Vec::with_capacity(variables.len());
        for variable in variables {
            let canonical = self.query_variable(variable)?;
            if !query.contains(&canonical) {
                query.push(canonical);
            }
        }
        Ok(query)
    }
}
