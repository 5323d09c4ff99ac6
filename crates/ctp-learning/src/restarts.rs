//! Multi-restart schedule: random starts compete in rounds of growing
//! budgets, the better half survives each round.

use std::cmp::Ordering;

use ctp_core::config::LearningConfig;
use ctp_core::{BayesNet, CtpError, CtpResult, DataSet};
use rand::Rng;
use tracing::info;

use crate::em::{EmRun, ExpectationStep};

/// Score of one restart at the end of a round.
#[derive(Debug, Clone, PartialEq)]
pub struct RestartScore {
    pub restart: usize,
    pub steps: usize,
    pub log_likelihood: f64,
    pub converged: bool,
}

/// One elimination round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundReport {
    pub round: usize,
    /// Step budget every surviving restart got this round.
    pub budget: usize,
    /// Best first.
    pub scores: Vec<RestartScore>,
    pub survivors: Vec<usize>,
}

/// What the schedule did, round by round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestartReport {
    pub rounds: Vec<RoundReport>,
    /// Index of the restart that was run to convergence.
    pub winner: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestartSchedule {
    pub restarts: usize,
    pub restart_steps: usize,
    pub max_steps: usize,
    pub convergence_threshold: f64,
}

impl RestartSchedule {
    pub fn from_config(config: &LearningConfig) -> Self {
        Self {
            restarts: config.restarts.max(1),
            restart_steps: config.restart_steps,
            max_steps: config.max_steps,
            convergence_threshold: config.convergence_threshold,
        }
    }

    /// Step budget of `round`: `restart_steps * 2^round`.
    pub fn budget(&self, round: usize) -> usize {
        let factor = 1usize.checked_shl(round as u32).unwrap_or(usize::MAX);
        self.restart_steps.saturating_mul(factor)
    }

    /// Draw `restarts` random parameterizations of `model`, eliminate down to
    /// one, and run that one until it converges or reaches `max_steps`.
    ///
    /// A restart that converges inside a round stops there, so scores within a
    /// round may come from different step counts.
    pub fn run<E: ExpectationStep + ?Sized, R: Rng>(
        &self,
        estep: &mut E,
        model: &BayesNet,
        data: &DataSet,
        rng: &mut R,
    ) -> CtpResult<(EmRun, RestartReport)> {
        let mut runs: Vec<(usize, EmRun)> = Vec::with_capacity(self.restarts);
        for restart in 0..self.restarts {
            let mut start = model.clone();
            start.randomize_parameters(rng)?;
            runs.push((restart, EmRun::start(start)));
        }

        let mut report = RestartReport::default();
        let mut round = 0;
        while runs.len() > 1 {
            let budget = self.budget(round);
            for (_, run) in runs.iter_mut() {
                run.advance(estep, data, budget, self.convergence_threshold)?;
            }
            runs.sort_by(|(_, a), (_, b)| {
                b.log_likelihood
                    .partial_cmp(&a.log_likelihood)
                    .unwrap_or(Ordering::Equal)
            });
            let scores = runs
                .iter()
                .map(|(restart, run)| RestartScore {
                    restart: *restart,
                    steps: run.steps,
                    log_likelihood: run.log_likelihood,
                    converged: run.converged,
                })
                .collect();
            runs.truncate((runs.len() / 2).max(1));
            let survivors: Vec<usize> = runs.iter().map(|(restart, _)| *restart).collect();
            info!(round, budget, survivors = ?survivors, "restart round");
            report.rounds.push(RoundReport {
                round,
                budget,
                scores,
                survivors,
            });
            round += 1;
        }

        let Some((winner, mut best)) = runs.pop() else {
            return Err(CtpError::InvalidData {
                reason: "restart schedule needs at least one restart".to_string(),
            });
        };
        let remaining = self.max_steps.saturating_sub(best.steps);
        best.advance(estep, data, remaining, self.convergence_threshold)?;
        report.winner = winner;
        Ok((best, report))
    }
}
