//! Weighted datasets over a subset of model variables.

use crate::errors::{CtpError, CtpResult};
use crate::variable::Variable;

/// One weighted record. `None` marks a missing value.
#[derive(Debug, Clone, PartialEq)]
pub struct DataCase {
    pub states: Vec<Option<usize>>,
    pub weight: f64,
}

/// Columns and cases. Latent variables are simply absent from the columns.
#[derive(Debug, Clone)]
pub struct DataSet {
    variables: Vec<Variable>,
    cases: Vec<DataCase>,
}

impl DataSet {
    pub fn new(variables: Vec<Variable>) -> Self {
        Self {
            variables,
            cases: Vec::new(),
        }
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn cases(&self) -> &[DataCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.cases.iter().map(|c| c.weight).sum()
    }

    /// Append a case, validating arity, state ranges, and weight.
    pub fn add_case(&mut self, states: Vec<Option<usize>>, weight: f64) -> CtpResult<()> {
        if states.len() != self.variables.len() {
            return Err(CtpError::InvalidData {
                reason: format!(
                    "case has {} values for {} columns",
                    states.len(),
                    self.variables.len()
                ),
            });
        }
        if !(weight > 0.0) || !weight.is_finite() {
            return Err(CtpError::InvalidData {
                reason: format!("case weight must be positive, got {weight}"),
            });
        }
        for (var, state) in self.variables.iter().zip(&states) {
            if let Some(s) = *state {
                if !var.is_valid_state(s) {
                    return Err(CtpError::InvalidData {
                        reason: format!("state {s} out of range for {var}"),
                    });
                }
            }
        }
        self.cases.push(DataCase { states, weight });
        Ok(())
    }

    /// Append a fully observed case with unit weight.
    pub fn add_complete(&mut self, states: &[usize]) -> CtpResult<()> {
        self.add_case(states.iter().copied().map(Some).collect(), 1.0)
    }

    /// Observed `(variables, states)` of a case, ready for `set_evidence`.
    pub fn evidence_of(&self, case: &DataCase) -> (Vec<Variable>, Vec<usize>) {
        self.variables
            .iter()
            .zip(&case.states)
            .filter_map(|(v, s)| s.map(|s| (v.clone(), s)))
            .unzip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_cases_and_skips_missing_values() {
        let a = Variable::with_cardinality("a", 2).unwrap();
        let b = Variable::with_cardinality("b", 3).unwrap();
        let mut data = DataSet::new(vec![a.clone(), b.clone()]);
        assert!(data.add_case(vec![Some(0)], 1.0).is_err());
        assert!(data.add_case(vec![Some(0), Some(3)], 1.0).is_err());
        assert!(data.add_case(vec![Some(0), Some(1)], 0.0).is_err());
        data.add_case(vec![None, Some(2)], 2.5).unwrap();
        let (vars, states) = data.evidence_of(&data.cases()[0]);
        assert_eq!(vars, vec![b]);
        assert_eq!(states, vec![2]);
        assert!((data.total_weight() - 2.5).abs() < 1e-12);
    }
}
