use std::collections::HashSet;

use crate::error::{OptimizationError, Result};
use crate::rng::RandomNumberGenerator;
use crate::selection::selection_strategy::SelectionStrategy;
use crate::selection::{check_fitness, ranked_indices};

/// Linear rank-based selection.
///
/// The best of `n` individuals is drawn with probability proportional to
/// `pressure`, the worst with probability proportional to `2 - pressure`.
/// Only the order of the scores matters, so infinite scores are harmless.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct RankBasedSelection {
    selection_pressure: f64,
    allow_duplicates: bool,
}

impl RankBasedSelection {
    /// # Errors
    ///
    /// Returns an error if `selection_pressure` is outside `[1, 2]`.
    pub fn new(selection_pressure: f64, allow_duplicates: bool) -> Result<Self> {
        if !(1.0..=2.0).contains(&selection_pressure) {
            return Err(OptimizationError::Configuration(
                "Selection pressure must be in the range [1.0, 2.0]".to_string(),
            ));
        }
        Ok(Self {
            selection_pressure,
            allow_duplicates,
        })
    }

    pub fn with_pressure(self, selection_pressure: f64) -> Result<Self> {
        Self::new(selection_pressure, self.allow_duplicates)
    }

    pub fn with_duplicates(mut self) -> Self {
        self.allow_duplicates = true;
        self
    }

    /// Cumulative selection probabilities indexed like `fitness`.
    fn cumulative_probabilities(&self, fitness: &[f64]) -> Vec<f64> {
        let n = fitness.len();
        if n == 1 {
            return vec![1.0];
        }
        let mut rank_of = vec![0; n];
        for (rank, idx) in ranked_indices(fitness).into_iter().enumerate() {
            rank_of[idx] = rank;
        }

        let nf = n as f64;
        let mut cumulative = 0.0;
        let mut probs: Vec<f64> = rank_of
            .iter()
            .map(|&rank| {
                let from_worst = (n - 1 - rank) as f64;
                cumulative += (2.0 - self.selection_pressure) / nf
                    + 2.0 * from_worst * (self.selection_pressure - 1.0) / (nf * (nf - 1.0));
                cumulative
            })
            .collect();
        if let Some(last) = probs.last_mut() {
            *last = 1.0;
        }
        probs
    }

    fn draw(&self, cumulative: &[f64], rng: &mut RandomNumberGenerator) -> usize {
        let r = rng.uniform(0.0, 1.0);
        cumulative
            .iter()
            .position(|&p| r < p)
            .unwrap_or(cumulative.len() - 1)
    }
}

impl Default for RankBasedSelection {
    fn default() -> Self {
        Self {
            selection_pressure: 1.5,
            allow_duplicates: true,
        }
    }
}

impl SelectionStrategy for RankBasedSelection {
    fn select(
        &self,
        fitness: &[f64],
        num_to_select: usize,
        rng: &mut RandomNumberGenerator,
    ) -> Result<Vec<usize>> {
        check_fitness(fitness)?;
        let cumulative = self.cumulative_probabilities(fitness);

        let target = if self.allow_duplicates {
            num_to_select
        } else {
            num_to_select.min(fitness.len())
        };
        let mut selected = Vec::with_capacity(target);
        let mut seen = HashSet::new();
        while selected.len() < target {
            let idx = self.draw(&cumulative, rng);
            if self.allow_duplicates || seen.insert(idx) {
                selected.push(idx);
            }
        }
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probabilities_favor_lower_scores() {
        let selection = RankBasedSelection::new(2.0, true).unwrap();
        let probs = selection.cumulative_probabilities(&[0.9, 0.1, 0.5]);
        let p0 = probs[0];
        let p1 = probs[1] - probs[0];
        let p2 = probs[2] - probs[1];
        assert!(p1 > p2 && p2 > p0);
        assert_eq!(p0, 0.0);
        assert_eq!(*probs.last().unwrap(), 1.0);
    }

    #[test]
    fn test_rank_selection_without_duplicates() {
        let fitness = vec![0.5, 0.8, 0.3, f64::INFINITY];
        let mut rng = RandomNumberGenerator::from_seed(5);
        let selection = RankBasedSelection::default();
        let selected = selection
            .clone()
            .with_pressure(1.2)
            .unwrap()
            .select(&fitness, 3, &mut rng)
            .unwrap();
        assert_eq!(selected.len(), 3);

        let unique = RankBasedSelection::new(1.5, false)
            .unwrap()
            .select(&fitness, 10, &mut rng)
            .unwrap();
        let set: HashSet<_> = unique.iter().collect();
        assert_eq!(unique.len(), 4);
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_single_individual() {
        let mut rng = RandomNumberGenerator::from_seed(5);
        let selected = RankBasedSelection::default()
            .select(&[1.0], 3, &mut rng)
            .unwrap();
        assert_eq!(selected, vec![0, 0, 0]);
    }

    #[test]
    fn test_invalid_pressure() {
        assert!(RankBasedSelection::new(0.5, false).is_err());
        assert!(RankBasedSelection::default().with_pressure(2.5).is_err());
    }
}
