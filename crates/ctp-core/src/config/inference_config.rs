use serde::{Deserialize, Serialize};

use super::defaults;

/// Propagation engine and pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Number of engines held by a propagation pool.
    pub pool_capacity: usize,
    /// Allowed gap between `ln(plain constant)` and the log constant of a message.
    pub log_drift_tolerance: f64,
    /// Allowed gap between the direct and log-accumulated likelihood estimates.
    pub consistency_tolerance: f64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            pool_capacity: defaults::DEFAULT_POOL_CAPACITY,
            log_drift_tolerance: defaults::DEFAULT_LOG_DRIFT_TOLERANCE,
            consistency_tolerance: defaults::DEFAULT_CONSISTENCY_TOLERANCE,
        }
    }
}
