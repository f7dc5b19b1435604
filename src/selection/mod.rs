//! # Selection
//!
//! Selection strategies pick individuals of a population by fitness. Scores
//! are minimized: lower is better, and NaN ranks below every number.
//!
//! Strategies work on a fitness slice and return indices into it, so the
//! caller decides whether to copy, move or just read the chosen individuals.

use std::cmp::Ordering;

pub mod elitist;
pub mod rank;
pub mod selection_strategy;
pub mod tournament;

pub use elitist::ElitistSelection;
pub use rank::RankBasedSelection;
pub use selection_strategy::SelectionStrategy;
pub use tournament::TournamentSelection;

use crate::error::{OptimizationError, Result};

/// Orders two scores, best first. NaN compares as worse than anything and
/// `-0.0` equals `0.0`.
pub fn compare_fitness(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Indices of `fitness` sorted best first. Equal scores keep their order.
pub fn ranked_indices(fitness: &[f64]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..fitness.len()).collect();
    indices.sort_by(|&a, &b| compare_fitness(fitness[a], fitness[b]));
    indices
}

pub(crate) fn check_fitness(fitness: &[f64]) -> Result<()> {
    if fitness.is_empty() {
        return Err(OptimizationError::EmptyPopulation);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranked_indices_put_nan_last() {
        let fitness = vec![0.5, f64::NAN, 0.3, f64::INFINITY, 0.3];
        assert_eq!(ranked_indices(&fitness), vec![2, 4, 0, 3, 1]);
    }

    #[test]
    fn test_signed_zeros_are_equal() {
        assert_eq!(compare_fitness(0.0, -0.0), Ordering::Equal);
        assert_eq!(ranked_indices(&[0.0, -0.0]), vec![0, 1]);
        assert_eq!(compare_fitness(-1.0, -0.0), Ordering::Less);
    }
}
