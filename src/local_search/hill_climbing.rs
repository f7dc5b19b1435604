use crate::error::{OptimizationError, Result};
use crate::ga::Evaluator;
use crate::rng::RandomNumberGenerator;
use crate::variable::ParameterSpace;

use super::LocalSearch;

/// Stochastic hill climbing with a shrinking step.
///
/// Each iteration samples up to `max_neighbors` Gaussian neighbors of the
/// current point, with a step of `step` times each domain width, and moves
/// to the first one that is strictly better. When no neighbor improves, the
/// step is halved. The search ends when the step falls below `min_step`, the
/// iterations or the evaluation budget run out.
#[derive(Debug, Clone)]
pub struct HillClimbing {
    max_iterations: usize,
    max_neighbors: usize,
    max_evaluations: usize,
    initial_step: f64,
    min_step: f64,
}

impl HillClimbing {
    pub fn new(max_iterations: usize, max_neighbors: usize) -> Result<Self> {
        if max_iterations == 0 {
            return Err(OptimizationError::Configuration(
                "Maximum iterations must be greater than 0".to_string(),
            ));
        }
        if max_neighbors == 0 {
            return Err(OptimizationError::Configuration(
                "Maximum neighbors must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            max_iterations,
            max_neighbors,
            max_evaluations: usize::MAX,
            initial_step: 0.1,
            min_step: 1e-6,
        })
    }

    /// A climber limited only by its evaluation budget.
    pub fn with_budget(max_evaluations: usize) -> Self {
        Self {
            max_iterations: usize::MAX,
            max_neighbors: 10,
            max_evaluations,
            initial_step: 0.1,
            min_step: 1e-6,
        }
    }

    pub fn with_step(mut self, initial_step: f64, min_step: f64) -> Self {
        self.initial_step = initial_step;
        self.min_step = min_step;
        self
    }
}

impl LocalSearch for HillClimbing {
    fn search(
        &self,
        start: &[f64],
        start_score: f64,
        space: &ParameterSpace,
        evaluator: &mut Evaluator<'_>,
        rng: &mut RandomNumberGenerator,
    ) -> (Vec<f64>, f64) {
        let mut current = space.clamped(start);
        let mut current_score = start_score;
        let mut step = self.initial_step;
        let mut used = 0usize;

        'outer: for _ in 0..self.max_iterations {
            if step < self.min_step {
                break;
            }
            let mut moved = false;
            for _ in 0..self.max_neighbors {
                if used >= self.max_evaluations {
                    break 'outer;
                }
                let neighbor: Vec<f64> = space
                    .variables()
                    .iter()
                    .zip(&current)
                    .map(|(var, &value)| var.mutate(value, step, rng))
                    .collect();
                let Some(score) = evaluator.evaluate(&neighbor) else {
                    break 'outer;
                };
                used += 1;
                if score < current_score {
                    current = neighbor;
                    current_score = score;
                    moved = true;
                    break;
                }
            }
            if !moved {
                step *= 0.5;
            }
        }

        (current, current_score)
    }
}
