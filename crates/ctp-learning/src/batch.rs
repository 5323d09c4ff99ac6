//! Fork/join computation of sufficient statistics over a propagation pool.

use ctp_core::{batch_span, BayesNet, CtpConfig, CtpResult, DataCase, DataSet};
use ctp_inference::{PropagationEngine, PropagationPool};
use tracing::{debug, warn};

use crate::statistics::SufficientStatistics;

/// Knobs for the batch pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchOptions {
    /// Compare the plain and log likelihood sums after the pass.
    pub check_likelihood_consistency: bool,
    pub consistency_tolerance: f64,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from_config(&CtpConfig::default())
    }
}

impl BatchOptions {
    pub fn from_config(config: &CtpConfig) -> Self {
        Self {
            check_likelihood_consistency: config.learning.check_likelihood_consistency,
            consistency_tolerance: config.inference.consistency_tolerance,
        }
    }
}

/// Expected statistics of `data` under the pool's model.
///
/// The cases are halved with `rayon::join` until a chunk holds at most
/// `max(1, cases / capacity)` of them; each chunk checks out one engine and
/// runs its cases in order. Partial results merge pairwise. An empty dataset
/// takes no engine.
pub fn compute_statistics(
    pool: &PropagationPool,
    data: &DataSet,
    options: &BatchOptions,
) -> CtpResult<SufficientStatistics> {
    let _span = batch_span!(data.len(), pool.capacity()).entered();
    let model = pool.model()?;
    if data.is_empty() {
        return SufficientStatistics::zeros(&model);
    }
    let chunk = (data.len() / pool.capacity()).max(1);
    let stats = split(pool, &model, data, data.cases(), chunk)?;

    if options.check_likelihood_consistency {
        check_consistency(&stats, options.consistency_tolerance);
    }
    debug!(
        cases = data.len(),
        chunk,
        log_likelihood = stats.log_likelihood(),
        "batch statistics"
    );
    Ok(stats)
}

fn split(
    pool: &PropagationPool,
    model: &BayesNet,
    data: &DataSet,
    cases: &[DataCase],
    chunk: usize,
) -> CtpResult<SufficientStatistics> {
    if cases.len() <= chunk {
        let mut engine = pool.checkout()?;
        let mut stats = SufficientStatistics::zeros(model)?;
        accumulate(&mut engine, data, cases, &mut stats)?;
        return Ok(stats);
    }
    let (left, right) = cases.split_at(cases.len() / 2);
    let (left, right) = rayon::join(
        || split(pool, model, data, left, chunk),
        || split(pool, model, data, right, chunk),
    );
    left?.merge(right?)
}

/// Run `cases` through one engine: set evidence, propagate, and add every
/// family belief times the case weight.
pub fn accumulate(
    engine: &mut PropagationEngine,
    data: &DataSet,
    cases: &[DataCase],
    stats: &mut SufficientStatistics,
) -> CtpResult<()> {
    let variables: Vec<_> = engine
        .model()
        .discrete_nodes()
        .map(|node| node.variable().clone())
        .collect();
    for case in cases {
        let (observed, states) = data.evidence_of(case);
        engine.set_evidence(&observed, &states)?;
        let likelihood = engine.propagate()?;
        for variable in &variables {
            let family = engine.compute_family_belief(variable)?;
            stats.add_family(variable, &family, case.weight)?;
        }
        stats.add_case(case.weight, likelihood, engine.last_log_likelihood());
    }
    Ok(())
}

/// Warn when the plain and log likelihood sums disagree. The log form is the
/// one reported either way.
pub fn check_consistency(stats: &SufficientStatistics, tolerance: f64) {
    let direct = stats.direct_log_likelihood();
    let log = stats.log_likelihood();
    if !direct.is_finite() {
        warn!(log_likelihood = log, "plain likelihood underflowed, using log form");
        return;
    }
    let gap = (direct - log).abs();
    if gap > tolerance * log.abs().max(1.0) {
        warn!(
            direct_log_likelihood = direct,
            log_likelihood = log,
            gap,
            "plain and log likelihood disagree, using log form"
        );
    }
}
