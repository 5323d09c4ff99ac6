//! Discrete variables. Cheap to clone; identity is the name.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::errors::{CtpResult, ModelError};

#[derive(Debug)]
struct VariableInner {
    name: String,
    states: Vec<String>,
}

/// A named discrete variable with an ordered list of states.
#[derive(Clone)]
pub struct Variable {
    inner: Arc<VariableInner>,
}

impl Variable {
    /// Create a variable with explicit state names.
    pub fn new<S: Into<String>>(name: &str, states: Vec<S>) -> CtpResult<Self> {
        if name.is_empty() {
            return Err(ModelError::InvalidVariable {
                reason: "empty name".to_string(),
            }
            .into());
        }
        let states: Vec<String> = states.into_iter().map(Into::into).collect();
        if states.is_empty() {
            return Err(ModelError::InvalidVariable {
                reason: format!("{name} has no states"),
            }
            .into());
        }
        for (i, s) in states.iter().enumerate() {
            if states[..i].contains(s) {
                return Err(ModelError::InvalidVariable {
                    reason: format!("{name} repeats state {s}"),
                }
                .into());
            }
        }
        Ok(Self {
            inner: Arc::new(VariableInner {
                name: name.to_string(),
                states,
            }),
        })
    }

    /// Create a variable with states `s0 .. s{cardinality-1}`.
    pub fn with_cardinality(name: &str, cardinality: usize) -> CtpResult<Self> {
        Self::new(name, (0..cardinality).map(|i| format!("s{i}")).collect())
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn states(&self) -> &[String] {
        &self.inner.states
    }

    pub fn cardinality(&self) -> usize {
        self.inner.states.len()
    }

    /// Whether `state` is a permitted state index.
    pub fn is_valid_state(&self, state: usize) -> bool {
        state < self.cardinality()
    }

    /// Index of a state by name.
    pub fn state_index(&self, state: &str) -> Option<usize> {
        self.inner.states.iter().position(|s| s == state)
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.name == other.inner.name
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.name.hash(state);
    }
}

impl PartialOrd for Variable {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Variable {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.name.cmp(&other.inner.name)
    }
}

impl AsRef<str> for Variable {
    fn as_ref(&self) -> &str {
        &self.inner.name
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.inner.name, self.cardinality())
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_duplicate_states() {
        assert!(Variable::new::<String>("a", vec![]).is_err());
        assert!(Variable::new("a", vec!["x", "x"]).is_err());
        assert!(Variable::new("", vec!["x"]).is_err());
    }

    #[test]
    fn identity_is_the_name() {
        let a = Variable::with_cardinality("a", 2).unwrap();
        let also_a = Variable::with_cardinality("a", 3).unwrap();
        assert_eq!(a, also_a);
        assert_eq!(a.state_index("s1"), Some(1));
        assert!(!a.is_valid_state(2));
    }
}
