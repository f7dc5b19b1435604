//! # Optimizer results
//!
//! `OptimizerResult` records the outcome of one optimization: the best point
//! and its score, every evaluated point, the evaluation and iteration counts,
//! and the points the optimizer hands over for a restart (`x_out`).
//!
//! A result is never mutated once built. Combining two stages of a run
//! (`accumulate`) produces a new value.

use std::fmt;

use crate::error::{OptimizationError, Result};
use crate::selection::compare_fitness;

/// Why an optimizer stopped.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The best score stopped improving.
    Converged,
    /// The generation or iteration budget ran out.
    GenerationsExhausted,
    /// The evaluation budget ran out.
    EvaluationsExhausted,
    /// The run was cancelled from outside.
    Interrupted,
    /// The run has not stopped yet. Used in progress snapshots.
    Running,
}

impl Status {
    pub fn code(self) -> i32 {
        match self {
            Status::Converged => 0,
            Status::GenerationsExhausted => 1,
            Status::EvaluationsExhausted => 2,
            Status::Interrupted => 3,
            Status::Running => -1,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Status::Converged => "Best value did not improve for the allowed number of generations",
            Status::GenerationsExhausted => "Maximum number of generations reached",
            Status::EvaluationsExhausted => "Maximum number of evaluations reached",
            Status::Interrupted => "Optimization was interrupted",
            Status::Running => "Optimization is in progress",
        }
    }

    /// Short label used in summaries.
    pub fn label(self) -> &'static str {
        match self {
            Status::Converged => "converged",
            Status::GenerationsExhausted => "max-generations",
            Status::EvaluationsExhausted => "max-evaluations",
            Status::Interrupted => "interrupted",
            Status::Running => "running",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one optimization.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerResult {
    x: Vec<f64>,
    y: f64,
    success: bool,
    status: Status,
    message: String,
    all_x: Vec<Vec<f64>>,
    all_y: Vec<f64>,
    n_eval: usize,
    n_iter: usize,
    x_out: Vec<Vec<f64>>,
    y_out: Vec<f64>,
}

/// Everything needed to build an `OptimizerResult`.
#[derive(Debug, Clone, Default)]
pub struct ResultParts {
    pub x: Vec<f64>,
    pub y: f64,
    pub all_x: Vec<Vec<f64>>,
    pub all_y: Vec<f64>,
    pub n_eval: usize,
    pub n_iter: usize,
    pub x_out: Vec<Vec<f64>>,
    pub y_out: Vec<f64>,
}

impl OptimizerResult {
    /// Builds a result. Every status counts as a successful exit.
    pub fn new(parts: ResultParts, status: Status) -> Result<Self> {
        if parts.all_x.len() != parts.all_y.len() {
            return Err(OptimizationError::Other(format!(
                "History has {} points but {} scores",
                parts.all_x.len(),
                parts.all_y.len()
            )));
        }
        if parts.x_out.len() != parts.y_out.len() {
            return Err(OptimizationError::Other(format!(
                "Output has {} points but {} scores",
                parts.x_out.len(),
                parts.y_out.len()
            )));
        }
        Ok(Self {
            x: parts.x,
            y: parts.y,
            success: true,
            status,
            message: status.message().to_string(),
            all_x: parts.all_x,
            all_y: parts.all_y,
            n_eval: parts.n_eval,
            n_iter: parts.n_iter,
            x_out: parts.x_out,
            y_out: parts.y_out,
        })
    }

    /// Result of a single-point optimizer: no history, the point itself is
    /// the only output.
    pub fn from_point(x: Vec<f64>, y: f64, n_eval: usize, n_iter: usize, status: Status) -> Self {
        Self {
            x_out: vec![x.clone()],
            y_out: vec![y],
            x,
            y,
            success: true,
            status,
            message: status.message().to_string(),
            all_x: Vec::new(),
            all_y: Vec::new(),
            n_eval,
            n_iter,
        }
    }

    /// Combines an earlier stage with a later one. Counters add up,
    /// histories concatenate, and the best point and outputs come from the
    /// later stage.
    pub fn accumulate(&self, later: &OptimizerResult) -> Self {
        let mut all_x = self.all_x.clone();
        all_x.extend(later.all_x.iter().cloned());
        let mut all_y = self.all_y.clone();
        all_y.extend(later.all_y.iter().copied());
        Self {
            x: later.x.clone(),
            y: later.y,
            success: self.success && later.success,
            status: later.status,
            message: later.message.clone(),
            all_x,
            all_y,
            n_eval: self.n_eval + later.n_eval,
            n_iter: self.n_iter + later.n_iter,
            x_out: later.x_out.clone(),
            y_out: later.y_out.clone(),
        }
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Every evaluated point, in evaluation order.
    pub fn all_x(&self) -> &[Vec<f64>] {
        &self.all_x
    }

    pub fn all_y(&self) -> &[f64] {
        &self.all_y
    }

    pub fn n_eval(&self) -> usize {
        self.n_eval
    }

    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Points to restart from, usually the last population.
    pub fn x_out(&self) -> &[Vec<f64>] {
        &self.x_out
    }

    pub fn y_out(&self) -> &[f64] {
        &self.y_out
    }
}

impl fmt::Display for OptimizerResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  status: {}", self.status.code())?;
        writeln!(f, " success: {}", self.success)?;
        writeln!(f, " message: {}", self.message)?;
        writeln!(f, "       x: {:?}", self.x)?;
        writeln!(f, "       y: {}", self.y)?;
        writeln!(f, "  n_eval: {}", self.n_eval)?;
        writeln!(f, "  n_iter: {}", self.n_iter)
    }
}

/// Picks the result with the lowest `y`. Exact ties go to the lowest index.
/// NaN scores never win against a number.
pub fn select_best<'a, I>(results: I) -> Option<(usize, &'a OptimizerResult)>
where
    I: IntoIterator<Item = (usize, &'a OptimizerResult)>,
{
    results.into_iter().fold(None, |best, (index, result)| match best {
        None => Some((index, result)),
        Some((best_index, best_result)) => {
            let better = compare_fitness(result.y, best_result.y)
                .then(index.cmp(&best_index))
                .is_lt();
            if better {
                Some((index, result))
            } else {
                Some((best_index, best_result))
            }
        }
    })
}
