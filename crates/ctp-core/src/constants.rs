/// Workspace version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Allowed gap between `ln(plain constant)` and the log constant of one message.
pub const LOG_DRIFT_TOLERANCE: f64 = 1e-6;

/// Allowed gap between direct and log-accumulated likelihood estimates in batch EM.
pub const LIKELIHOOD_CONSISTENCY_TOLERANCE: f64 = 1e-6;

/// Pseudo-count the parallel EM learner adds to every sufficient statistic.
pub const PARALLEL_PSEUDO_COUNT: f64 = 1.0;

/// Largest propagation pool that can be constructed.
pub const MAX_POOL_CAPACITY: usize = 256;
