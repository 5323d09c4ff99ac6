//! # ctp-core
//!
//! Foundation crate for clique tree propagation.
//! Defines errors, config, constants, discrete variables, tabular potentials,
//! the Bayesian network model, and datasets. Every other crate depends on this.

pub mod config;
pub mod constants;
pub mod data;
pub mod errors;
pub mod model;
pub mod potential;
pub mod tracing_setup;
pub mod variable;

// Re-export the most commonly used types at the crate root.
pub use config::CtpConfig;
pub use data::{DataCase, DataSet};
pub use errors::{CtpError, CtpResult};
pub use model::{BayesNet, BeliefNode};
pub use potential::Potential;
pub use variable::Variable;
