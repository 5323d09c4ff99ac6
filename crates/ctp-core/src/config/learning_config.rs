use serde::{Deserialize, Serialize};

use super::defaults;

/// EM learner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Upper bound on EM steps for the surviving restart.
    pub max_steps: usize,
    /// Stop once the log-likelihood gain of one step is at most this.
    pub convergence_threshold: f64,
    /// Number of random initializations competing in the first round.
    pub restarts: usize,
    /// EM steps per restart in the first round (doubled every round).
    pub restart_steps: usize,
    /// Seed for random parameter initialization.
    pub seed: u64,
    /// Pseudo-count added to every statistic by the parallel learner.
    pub pseudo_count: f64,
    /// Compare direct and log-accumulated likelihoods for every case.
    pub check_likelihood_consistency: bool,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            max_steps: defaults::DEFAULT_MAX_STEPS,
            convergence_threshold: defaults::DEFAULT_CONVERGENCE_THRESHOLD,
            restarts: defaults::DEFAULT_RESTARTS,
            restart_steps: defaults::DEFAULT_RESTART_STEPS,
            seed: defaults::DEFAULT_SEED,
            pseudo_count: defaults::DEFAULT_PSEUDO_COUNT,
            check_likelihood_consistency: defaults::DEFAULT_CHECK_LIKELIHOOD_CONSISTENCY,
        }
    }
}
