//! Expectation-maximization over a fixed structure.
//!
//! Two learners share the loop below and differ only in how the E-step runs
//! and in smoothing:
//! - [`EmLearner`] propagates every case through one engine and re-estimates
//!   with raw counts.
//! - [`ParallelEmLearner`] runs the batch pass over a pool and adds a
//!   pseudo-count to every cell before normalizing.
//!
//! The two do not produce the same parameters on the same data.

use std::sync::Arc;

use ctp_core::config::{InferenceConfig, LearningConfig};
use ctp_core::{em_span, BayesNet, CtpResult, DataSet};
use ctp_inference::{ClusterTree, PropagationEngine, PropagationPool};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::batch::{accumulate, compute_statistics, BatchOptions};
use crate::restarts::{RestartReport, RestartSchedule};
use crate::statistics::SufficientStatistics;

/// Produces expected statistics of a dataset under given parameters.
pub trait ExpectationStep {
    fn expected_statistics(
        &mut self,
        model: &Arc<BayesNet>,
        data: &DataSet,
    ) -> CtpResult<SufficientStatistics>;

    /// Added to every statistic cell before the M-step.
    fn pseudo_count(&self) -> f64;
}

/// A parameter learner over a fixed structure.
pub trait ParameterLearner {
    fn name(&self) -> &'static str;

    fn learn(&self, model: &BayesNet, data: &DataSet) -> CtpResult<LearningOutcome>;
}

/// Result of a full learning run.
#[derive(Debug, Clone)]
pub struct LearningOutcome {
    pub model: BayesNet,
    /// Log-likelihood of the data under the parameters of the last E-step.
    pub log_likelihood: f64,
    /// EM steps taken by the winning restart.
    pub steps: usize,
    pub converged: bool,
    pub report: RestartReport,
}

/// State of one EM trajectory, advanced in budgets by the restart schedule.
#[derive(Debug, Clone)]
pub struct EmRun {
    pub model: Arc<BayesNet>,
    /// NaN until the first step.
    pub log_likelihood: f64,
    pub steps: usize,
    pub converged: bool,
}

impl EmRun {
    pub fn start(model: BayesNet) -> Self {
        Self {
            model: Arc::new(model),
            log_likelihood: f64::NAN,
            steps: 0,
            converged: false,
        }
    }

    /// Run up to `budget` more steps, stopping early once the gain of a step
    /// is at most `threshold`.
    pub fn advance<E: ExpectationStep + ?Sized>(
        &mut self,
        estep: &mut E,
        data: &DataSet,
        budget: usize,
        threshold: f64,
    ) -> CtpResult<()> {
        for _ in 0..budget {
            if self.converged {
                break;
            }
            let stats = estep.expected_statistics(&self.model, data)?;
            let log_likelihood = stats.log_likelihood();
            let gain = log_likelihood - self.log_likelihood;
            let updated = stats.estimate(&self.model, estep.pseudo_count())?;

            self.model = Arc::new(updated);
            self.steps += 1;
            // The first step has nothing to compare against.
            self.converged = !self.log_likelihood.is_nan() && gain <= threshold;
            self.log_likelihood = log_likelihood;
        }
        Ok(())
    }
}

/// E-step through a single engine, rebound to each new parameter set.
pub struct SequentialStep {
    engine: Option<PropagationEngine>,
}

impl SequentialStep {
    pub fn new() -> Self {
        Self { engine: None }
    }
}

impl Default for SequentialStep {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpectationStep for SequentialStep {
    fn expected_statistics(
        &mut self,
        model: &Arc<BayesNet>,
        data: &DataSet,
    ) -> CtpResult<SufficientStatistics> {
        let engine = match self.engine.take() {
            Some(mut engine) => {
                engine.set_model(Arc::clone(model))?;
                engine
            }
            None => PropagationEngine::new(Arc::clone(model))?,
        };
        let engine = self.engine.insert(engine);
        let mut stats = SufficientStatistics::zeros(model)?;
        accumulate(engine, data, data.cases(), &mut stats)?;
        Ok(stats)
    }

    fn pseudo_count(&self) -> f64 {
        0.0
    }
}

/// E-step through the batch pass over a pool.
pub struct PooledStep {
    pool: PropagationPool,
    options: BatchOptions,
    pseudo_count: f64,
}

impl PooledStep {
    pub fn new(pool: PropagationPool, options: BatchOptions, pseudo_count: f64) -> Self {
        Self {
            pool,
            options,
            pseudo_count,
        }
    }

    pub fn pool(&self) -> &PropagationPool {
        &self.pool
    }
}

impl ExpectationStep for PooledStep {
    fn expected_statistics(
        &mut self,
        model: &Arc<BayesNet>,
        data: &DataSet,
    ) -> CtpResult<SufficientStatistics> {
        self.pool.rebind_all(Arc::clone(model))?;
        compute_statistics(&self.pool, data, &self.options)
    }

    fn pseudo_count(&self) -> f64 {
        self.pseudo_count
    }
}

/// Sequential EM without smoothing.
#[derive(Debug, Clone, Default)]
pub struct EmLearner {
    config: LearningConfig,
}

impl EmLearner {
    pub fn new(config: LearningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }
}

impl ParameterLearner for EmLearner {
    fn name(&self) -> &'static str {
        "em"
    }

    fn learn(&self, model: &BayesNet, data: &DataSet) -> CtpResult<LearningOutcome> {
        let _span = em_span!(self.name(), self.config.restarts).entered();
        let mut estep = SequentialStep::new();
        run(self.name(), &self.config, &mut estep, model, data)
    }
}

/// EM over a propagation pool, smoothing every statistic with a pseudo-count.
#[derive(Debug, Clone)]
pub struct ParallelEmLearner {
    config: LearningConfig,
    inference: InferenceConfig,
    options: BatchOptions,
    pseudo_count: f64,
}

impl Default for ParallelEmLearner {
    fn default() -> Self {
        Self::new(LearningConfig::default(), InferenceConfig::default())
    }
}

impl ParallelEmLearner {
    pub fn new(config: LearningConfig, inference: InferenceConfig) -> Self {
        let options = BatchOptions {
            check_likelihood_consistency: config.check_likelihood_consistency,
            consistency_tolerance: inference.consistency_tolerance,
        };
        let pseudo_count = config.pseudo_count;
        Self {
            config,
            inference,
            options,
            pseudo_count,
        }
    }

    /// Override the configured pseudo-count.
    pub fn with_pseudo_count(mut self, pseudo_count: f64) -> Self {
        self.pseudo_count = pseudo_count;
        self
    }

    pub fn pseudo_count(&self) -> f64 {
        self.pseudo_count
    }
}

impl ParameterLearner for ParallelEmLearner {
    fn name(&self) -> &'static str {
        "parallel-em"
    }

    fn learn(&self, model: &BayesNet, data: &DataSet) -> CtpResult<LearningOutcome> {
        let _span = em_span!(self.name(), self.config.restarts).entered();
        let shared = Arc::new(model.clone());
        let tree = Arc::new(ClusterTree::build(&shared)?);
        let template =
            PropagationEngine::with_tree(tree, Arc::clone(&shared))?.with_config(&self.inference);
        let pool = PropagationPool::from_template(&template, shared, self.inference.pool_capacity)?;
        let mut estep = PooledStep::new(pool, self.options, self.pseudo_count);
        run(self.name(), &self.config, &mut estep, model, data)
    }
}

fn run<E: ExpectationStep>(
    learner: &str,
    config: &LearningConfig,
    estep: &mut E,
    model: &BayesNet,
    data: &DataSet,
) -> CtpResult<LearningOutcome> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let schedule = RestartSchedule::from_config(config);
    let (run, report) = schedule.run(estep, model, data, &mut rng)?;
    info!(
        learner,
        steps = run.steps,
        converged = run.converged,
        log_likelihood = run.log_likelihood,
        "learning finished"
    );
    Ok(LearningOutcome {
        model: Arc::unwrap_or_clone(run.model),
        log_likelihood: run.log_likelihood,
        steps: run.steps,
        converged: run.converged,
        report,
    })
}
