//! Tracing setup: structured logging and span definitions per operation.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

use crate::config::{defaults, ObservabilityConfig};

static INIT: Once = Once::new();

/// Initialize the tracing subscriber with structured JSON output.
///
/// Respects the `CTP_LOG` environment variable for filtering.
/// Defaults to `info` level if not set. Safe to call more than once; only the
/// first call installs anything.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("CTP_LOG")
            .unwrap_or_else(|_| EnvFilter::new(defaults::DEFAULT_LOG_LEVEL));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            .try_init();
    });
}

/// Initialize tracing with a custom filter string (for testing or embedding).
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing_with_filter(filter: &str) {
    let filter = EnvFilter::new(filter);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .json()
        .try_init();
}

/// Initialize tracing at the configured level.
pub fn init_tracing_from_config(config: &ObservabilityConfig) {
    init_tracing_with_filter(&config.log_level);
}

/// Create a clique tree construction span.
#[macro_export]
macro_rules! tree_build_span {
    ($variables:expr) => {
        tracing::debug_span!("ctp.tree_build", variables = $variables)
    };
}

/// Create a propagation span.
#[macro_export]
macro_rules! propagation_span {
    ($cliques:expr, $evidence:expr) => {
        tracing::trace_span!("ctp.propagation", cliques = $cliques, evidence = $evidence)
    };
}

/// Create a batch statistics span.
#[macro_export]
macro_rules! batch_span {
    ($cases:expr, $capacity:expr) => {
        tracing::debug_span!("ctp.batch", cases = $cases, capacity = $capacity)
    };
}

/// Create an EM span.
#[macro_export]
macro_rules! em_span {
    ($learner:expr, $restarts:expr) => {
        tracing::info_span!("ctp.em", learner = %$learner, restarts = $restarts)
    };
}

/// Span names as constants for programmatic use.
pub mod names {
    pub const TREE_BUILD: &str = "ctp.tree_build";
    pub const PROPAGATION: &str = "ctp.propagation";
    pub const BATCH: &str = "ctp.batch";
    pub const EM: &str = "ctp.em";
}
