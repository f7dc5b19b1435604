//! Budgeted, cancellable evaluation of an objective.
//!
//! Every call of the objective made by a run goes through its `Evaluator`,
//! which counts evaluations, enforces the evaluation budget, checks the stop
//! token before each call and records the history of evaluated points.
//!
//! Objective errors and non-finite scores are not fatal: the point gets the
//! worst possible score, `+inf`.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::core::CancellationToken;
use crate::objective::ObjectiveFunction;
use crate::population::Population;

/// Scores one vector, mapping failures to `+inf`.
pub fn score_or_worst(objective: &dyn ObjectiveFunction, values: &[f64]) -> f64 {
    match objective.evaluate(values) {
        Ok(score) if score.is_nan() => {
            debug!(?values, "Objective returned NaN");
            f64::INFINITY
        }
        Ok(score) if score == f64::NEG_INFINITY => {
            warn!(?values, "Objective returned -inf");
            f64::INFINITY
        }
        Ok(score) => score,
        Err(err) if err.is_recoverable() => {
            debug!(?values, error = %err, "Objective evaluation failed");
            f64::INFINITY
        }
        Err(err) => {
            warn!(?values, error = %err, "Objective evaluation failed");
            f64::INFINITY
        }
    }
}

pub struct Evaluator<'a> {
    objective: &'a dyn ObjectiveFunction,
    max_evaluations: Option<usize>,
    cancel: Option<&'a CancellationToken>,
    keep_history: bool,
    n_eval: usize,
    history_x: Vec<Vec<f64>>,
    history_y: Vec<f64>,
}

impl<'a> Evaluator<'a> {
    pub fn new(objective: &'a dyn ObjectiveFunction, max_evaluations: Option<usize>) -> Self {
        Self {
            objective,
            max_evaluations,
            cancel: None,
            keep_history: true,
            n_eval: 0,
            history_x: Vec::new(),
            history_y: Vec::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: &'a CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_history(mut self, keep_history: bool) -> Self {
        self.keep_history = keep_history;
        self
    }

    pub fn n_eval(&self) -> usize {
        self.n_eval
    }

    /// Evaluations left, `None` when unlimited.
    pub fn remaining(&self) -> Option<usize> {
        self.max_evaluations
            .map(|max| max.saturating_sub(self.n_eval))
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == Some(0)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.map_or(false, CancellationToken::is_cancelled)
    }

    /// `true` when no further evaluation may happen.
    pub fn should_stop(&self) -> bool {
        self.is_exhausted() || self.is_cancelled()
    }

    /// Scores `values`, or returns `None` without calling the objective when
    /// the budget is spent or the run is cancelled.
    pub fn evaluate(&mut self, values: &[f64]) -> Option<f64> {
        if self.should_stop() {
            return None;
        }
        let score = score_or_worst(self.objective, values);
        self.record(values, score);
        Some(score)
    }

    /// Scores every unevaluated individual of `population`, possibly in
    /// parallel. Returns `false` when it had to stop early, leaving some
    /// individuals unevaluated.
    pub fn evaluate_population(&mut self, population: &mut Population, parallel: bool) -> bool {
        let pending: Vec<usize> = population
            .individuals()
            .iter()
            .enumerate()
            .filter(|(_, ind)| !ind.is_evaluated())
            .map(|(i, _)| i)
            .collect();
        if pending.is_empty() {
            return true;
        }

        if !parallel || pending.len() == 1 {
            for idx in pending {
                let values = population.individuals()[idx].values().to_vec();
                match self.evaluate(&values) {
                    Some(score) => population.individuals_mut()[idx].set_score(score),
                    None => return false,
                }
            }
            return true;
        }

        if self.is_cancelled() {
            return false;
        }
        let allowed = self.remaining().map_or(pending.len(), |r| r.min(pending.len()));
        let batch = &pending[..allowed];
        let objective = self.objective;
        let cancel = self.cancel;
        let scores: Vec<Option<f64>> = {
            let individuals = population.individuals();
            batch
                .par_iter()
                .map(|&idx| {
                    if cancel.map_or(false, CancellationToken::is_cancelled) {
                        None
                    } else {
                        Some(score_or_worst(objective, individuals[idx].values()))
                    }
                })
                .collect()
        };

        let mut complete = allowed == pending.len();
        for (&idx, score) in batch.iter().zip(scores) {
            match score {
                Some(score) => {
                    let values = population.individuals()[idx].values().to_vec();
                    self.record(&values, score);
                    population.individuals_mut()[idx].set_score(score);
                }
                None => complete = false,
            }
        }
        complete
    }

    fn record(&mut self, values: &[f64], score: f64) {
        self.n_eval += 1;
        if self.keep_history {
            self.history_x.push(values.to_vec());
            self.history_y.push(score);
        }
    }

    /// Hands over the recorded history, leaving it empty.
    pub fn take_history(&mut self) -> (Vec<Vec<f64>>, Vec<f64>) {
        (
            std::mem::take(&mut self.history_x),
            std::mem::take(&mut self.history_y),
        )
    }
}
