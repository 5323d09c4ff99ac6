// Single source of truth for all default values.

// --- Inference ---
pub const DEFAULT_POOL_CAPACITY: usize = 4;
pub const DEFAULT_LOG_DRIFT_TOLERANCE: f64 = crate::constants::LOG_DRIFT_TOLERANCE;
pub const DEFAULT_CONSISTENCY_TOLERANCE: f64 = crate::constants::LIKELIHOOD_CONSISTENCY_TOLERANCE;

// --- Learning ---
pub const DEFAULT_MAX_STEPS: usize = 100;
pub const DEFAULT_CONVERGENCE_THRESHOLD: f64 = 1e-4;
pub const DEFAULT_RESTARTS: usize = 4;
pub const DEFAULT_RESTART_STEPS: usize = 2;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_PSEUDO_COUNT: f64 = crate::constants::PARALLEL_PSEUDO_COUNT;
pub const DEFAULT_CHECK_LIKELIHOOD_CONSISTENCY: bool = true;

// --- Observability ---
pub const DEFAULT_LOG_LEVEL: &str = "info";
