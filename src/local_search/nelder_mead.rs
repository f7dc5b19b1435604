use tracing::trace;

use crate::ga::Evaluator;
use crate::rng::RandomNumberGenerator;
use crate::variable::ParameterSpace;

use super::LocalSearch;

/// Nelder-Mead simplex search with every vertex clamped into the bounds.
///
/// The initial simplex offsets each coordinate of the start by `initial_step`
/// times its domain width, away from the nearest bound. The search ends when
/// the spread of the simplex scores drops below `tolerance` or the evaluation
/// budget is spent.
#[derive(Debug, Clone)]
pub struct NelderMead {
    max_evaluations: usize,
    tolerance: f64,
    initial_step: f64,
}

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

impl NelderMead {
    pub fn new(max_evaluations: usize, tolerance: f64) -> Self {
        Self {
            max_evaluations,
            tolerance,
            initial_step: 0.05,
        }
    }

    pub fn with_budget(max_evaluations: usize) -> Self {
        Self::new(max_evaluations, 1e-8)
    }

    pub fn with_initial_step(mut self, initial_step: f64) -> Self {
        self.initial_step = initial_step;
        self
    }
}

/// Evaluation wrapper tracking the per-call budget.
struct Budget<'e, 'a> {
    evaluator: &'e mut Evaluator<'a>,
    left: usize,
}

impl Budget<'_, '_> {
    fn evaluate(&mut self, point: &[f64]) -> Option<f64> {
        if self.left == 0 {
            return None;
        }
        let score = self.evaluator.evaluate(point)?;
        self.left -= 1;
        Some(score)
    }
}

fn combine(a: &[f64], b: &[f64], t: f64, space: &ParameterSpace) -> Vec<f64> {
    let mut point: Vec<f64> = a.iter().zip(b).map(|(x, y)| x + t * (y - x)).collect();
    space.clamp(&mut point);
    point
}

impl LocalSearch for NelderMead {
    fn search(
        &self,
        start: &[f64],
        start_score: f64,
        space: &ParameterSpace,
        evaluator: &mut Evaluator<'_>,
        _rng: &mut RandomNumberGenerator,
    ) -> (Vec<f64>, f64) {
        let n = start.len();
        let origin = space.clamped(start);
        if n == 0 {
            return (origin, start_score);
        }
        let mut budget = Budget {
            evaluator,
            left: self.max_evaluations,
        };

        let mut simplex: Vec<(Vec<f64>, f64)> = vec![(origin.clone(), start_score)];
        for (i, var) in space.variables().iter().enumerate() {
            let domain = var.domain();
            let step = self.initial_step * domain.width();
            let mut vertex = origin.clone();
            vertex[i] = if vertex[i] + step <= domain.upper() {
                vertex[i] + step
            } else {
                vertex[i] - step
            };
            space.clamp(&mut vertex);
            let Some(score) = budget.evaluate(&vertex) else {
                return best_of(simplex);
            };
            simplex.push((vertex, score));
        }

        let mut iterations = 0usize;
        loop {
            simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
            let spread = simplex[n].1 - simplex[0].1;
            if spread.abs() <= self.tolerance || budget.left == 0 {
                break;
            }
            iterations += 1;

            let mut centroid = vec![0.0; n];
            for (point, _) in &simplex[..n] {
                for (c, v) in centroid.iter_mut().zip(point) {
                    *c += v / n as f64;
                }
            }
            let worst = simplex[n].clone();

            let reflected = combine(&centroid, &worst.0, -REFLECTION, space);
            let Some(reflected_score) = budget.evaluate(&reflected) else {
                break;
            };

            if reflected_score < simplex[0].1 {
                let expanded = combine(&centroid, &worst.0, -EXPANSION, space);
                let Some(expanded_score) = budget.evaluate(&expanded) else {
                    simplex[n] = (reflected, reflected_score);
                    break;
                };
                simplex[n] = if expanded_score < reflected_score {
                    (expanded, expanded_score)
                } else {
                    (reflected, reflected_score)
                };
                continue;
            }
            if reflected_score < simplex[n - 1].1 {
                simplex[n] = (reflected, reflected_score);
                continue;
            }

            let contracted = if reflected_score < worst.1 {
                combine(&centroid, &reflected, CONTRACTION, space)
            } else {
                combine(&centroid, &worst.0, CONTRACTION, space)
            };
            let Some(contracted_score) = budget.evaluate(&contracted) else {
                break;
            };
            if contracted_score < worst.1.min(reflected_score) {
                simplex[n] = (contracted, contracted_score);
                continue;
            }

            let best = simplex[0].0.clone();
            for vertex in simplex.iter_mut().skip(1) {
                let shrunk = combine(&best, &vertex.0, SHRINK, space);
                match budget.evaluate(&shrunk) {
                    Some(score) => *vertex = (shrunk, score),
                    None => return best_of(simplex),
                }
            }
        }

        trace!(iterations, "Nelder-Mead finished");
        best_of(simplex)
    }
}

fn best_of(simplex: Vec<(Vec<f64>, f64)>) -> (Vec<f64>, f64) {
    simplex
        .into_iter()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;

    fn rosenbrock(x: &[f64]) -> Result<f64> {
        Ok((1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2))
    }

    #[test]
    fn test_nelder_mead_finds_minimum() {
        let space = ParameterSpace::from_bounds(&[-2.0, -2.0], &[2.0, 2.0]).unwrap();
        let mut evaluator = Evaluator::new(&rosenbrock, None);
        let mut rng = RandomNumberGenerator::from_seed(1);
        let start = vec![-1.2, 1.0];
        let start_score = rosenbrock(&start).unwrap();
        let (best, score) = NelderMead::new(2000, 1e-12).search(
            &start,
            start_score,
            &space,
            &mut evaluator,
            &mut rng,
        );
        assert!(score < 1e-4, "score {}", score);
        assert!((best[0] - 1.0).abs() < 0.05);
        assert!(evaluator.n_eval() <= 2000);
    }

    #[test]
    fn test_nelder_mead_stays_in_bounds() {
        let space = ParameterSpace::from_bounds(&[0.5, 0.5], &[2.0, 2.0]).unwrap();
        let mut evaluator = Evaluator::new(&rosenbrock, None);
        let mut rng = RandomNumberGenerator::from_seed(1);
        let quadratic_start = vec![2.0, 2.0];
        let start_score = rosenbrock(&quadratic_start).unwrap();
        let (best, score) = NelderMead::with_budget(300).search(
            &quadratic_start,
            start_score,
            &space,
            &mut evaluator,
            &mut rng,
        );
        assert!(space.contains(&best));
        assert!(score <= start_score);
    }

    #[test]
    fn test_budget_of_zero_returns_start() {
        let space = ParameterSpace::from_bounds(&[0.0], &[1.0]).unwrap();
        let mut evaluator = Evaluator::new(&rosenbrock_1d, None);
        let mut rng = RandomNumberGenerator::from_seed(1);
        let (best, score) =
            NelderMead::with_budget(0).search(&[0.5], 0.25, &space, &mut evaluator, &mut rng);
        assert_eq!(best, vec![0.5]);
        assert_eq!(score, 0.25);
        assert_eq!(evaluator.n_eval(), 0);
    }

    fn rosenbrock_1d(x: &[f64]) -> Result<f64> {
        Ok(x[0] * x[0])
    }
}
