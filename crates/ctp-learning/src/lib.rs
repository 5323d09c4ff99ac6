//! # ctp-learning
//!
//! Parameter learning on top of clique tree propagation: expected sufficient
//! statistics (sequential or fork/join over a pool), two EM learners, and the
//! multi-restart schedule they share.

pub mod batch;
pub mod em;
pub mod restarts;
pub mod statistics;

pub use batch::{compute_statistics, BatchOptions};
pub use em::{
    EmLearner, EmRun, ExpectationStep, LearningOutcome, ParallelEmLearner, ParameterLearner,
    PooledStep, SequentialStep,
};
pub use restarts::{RestartReport, RestartSchedule, RestartScore, RoundReport};
pub use statistics::SufficientStatistics;
