//! # Local Search Algorithms
//!
//! Gradient-free local optimizers used to refine the best individual of a
//! GA run. They draw every evaluation from the run's `Evaluator`, so they
//! share its budget, its history and its stop token.
//!
//! A local search never returns something worse than its starting point.

use std::fmt::Debug;

pub mod hill_climbing;
pub mod nelder_mead;

pub use hill_climbing::HillClimbing;
pub use nelder_mead::NelderMead;

use crate::ga::Evaluator;
use crate::rng::RandomNumberGenerator;
use crate::variable::ParameterSpace;

/// A local optimizer over a bounded parameter space.
pub trait LocalSearch: Debug + Send + Sync {
    /// Searches around `start` and returns the best point found with its
    /// score. Stops early when the evaluator refuses further evaluations.
    fn search(
        &self,
        start: &[f64],
        start_score: f64,
        space: &ParameterSpace,
        evaluator: &mut Evaluator<'_>,
        rng: &mut RandomNumberGenerator,
    ) -> (Vec<f64>, f64);
}

/// Local search methods selectable from options.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalSearchKind {
    HillClimbing,
    NelderMead,
}

impl LocalSearchKind {
    /// Builds the search with an evaluation budget per call.
    pub fn searcher(self, max_evaluations: usize) -> Box<dyn LocalSearch> {
        match self {
            LocalSearchKind::HillClimbing => Box::new(HillClimbing::with_budget(max_evaluations)),
            LocalSearchKind::NelderMead => Box::new(NelderMead::with_budget(max_evaluations)),
        }
    }
}
