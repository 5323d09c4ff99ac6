//! # ctp-graph
//!
//! Undirected graph utilities the clique tree builder consumes: moralization
//! of a Bayesian network, minimum-deficiency elimination ordering, and the
//! mutating elimination primitive.

pub mod elimination;
pub mod moral_graph;
pub mod moralize;

pub use elimination::minimum_deficiency_ordering;
pub use moral_graph::MoralGraph;
pub use moralize::moralize;
