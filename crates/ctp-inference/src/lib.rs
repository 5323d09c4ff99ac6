//! # ctp-inference
//!
//! Exact inference by clique tree propagation.
//!
//! - [`tree`] compiles a model into a [`ClusterTree`] once per structure
//! - [`engine`] runs sum-product sessions over a shared tree
//! - [`pool`] bounds how many sessions exist and hands them out one at a time

pub mod engine;
pub mod interrupt;
pub mod pool;
pub mod tree;

pub use engine::{AttachedPotential, Message, Phase, PropagationEngine};
pub use interrupt::InterruptFlag;
pub use pool::{PooledEngine, PropagationPool};
pub use tree::{Clique, CliqueId, ClusterTree, ClusterTreeBuilder};
