use std::collections::HashSet;

use crate::error::{OptimizationError, Result};
use crate::rng::RandomNumberGenerator;
use crate::selection::selection_strategy::SelectionStrategy;
use crate::selection::{check_fitness, compare_fitness};

/// Selects individuals through repeated tournaments.
///
/// Each tournament draws `tournament_size` eligible individuals uniformly
/// with replacement and keeps the one with the lowest score. Smaller
/// tournaments explore more, larger ones exploit more.
///
/// # Examples
///
/// ```
/// use demoga::selection::{SelectionStrategy, TournamentSelection};
/// use demoga::rng::RandomNumberGenerator;
///
/// let fitness = vec![0.5, 0.8, 0.3, 0.9, 0.1];
/// let mut rng = RandomNumberGenerator::from_seed(11);
///
/// let selection = TournamentSelection::default();
/// let selected = selection.select(&fitness, 3, &mut rng).unwrap();
/// assert_eq!(selected.len(), 3);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct TournamentSelection {
    tournament_size: usize,
    allow_duplicates: bool,
}

impl TournamentSelection {
    /// Creates a tournament selection.
    ///
    /// # Errors
    ///
    /// Returns an error if `tournament_size` is 0.
    pub fn new(tournament_size: usize, allow_duplicates: bool) -> Result<Self> {
        if tournament_size < 1 {
            return Err(OptimizationError::Configuration(
                "Tournament size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            tournament_size,
            allow_duplicates,
        })
    }

    pub fn with_tournament_size(self, tournament_size: usize) -> Result<Self> {
        Self::new(tournament_size, self.allow_duplicates)
    }

    pub fn with_duplicates(mut self) -> Self {
        self.allow_duplicates = true;
        self
    }

    pub fn tournament_size(&self) -> usize {
        self.tournament_size
    }

    /// Runs a single tournament among the individuals not in `excluded` and
    /// returns the index of the winner.
    fn run_tournament(
        &self,
        fitness: &[f64],
        rng: &mut RandomNumberGenerator,
        excluded: &HashSet<usize>,
    ) -> Result<usize> {
        let eligible: Vec<usize> = (0..fitness.len())
            .filter(|i| !excluded.contains(i))
            .collect();
        if eligible.is_empty() {
            return Err(OptimizationError::Configuration(
                "No eligible individuals for tournament selection".to_string(),
            ));
        }

        let mut winner = eligible[rng.index(eligible.len())];
        for _ in 1..self.tournament_size {
            let challenger = eligible[rng.index(eligible.len())];
            if compare_fitness(fitness[challenger], fitness[winner]).is_lt() {
                winner = challenger;
            }
        }
        Ok(winner)
    }
}

impl Default for TournamentSelection {
    /// Binary tournaments with duplicates allowed.
    fn default() -> Self {
        Self {
            tournament_size: 2,
            allow_duplicates: true,
        }
    }
}

impl SelectionStrategy for TournamentSelection {
    fn select(
        &self,
        fitness: &[f64],
        num_to_select: usize,
        rng: &mut RandomNumberGenerator,
    ) -> Result<Vec<usize>> {
        check_fitness(fitness)?;

        let target = if self.allow_duplicates {
            num_to_select
        } else {
            num_to_select.min(fitness.len())
        };
        let mut selected = Vec::with_capacity(target);
        let mut excluded = HashSet::new();
        while selected.len() < target {
            let winner = self.run_tournament(fitness, rng, &excluded)?;
            if !self.allow_duplicates {
                excluded.insert(winner);
            }
            selected.push(winner);
        }
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tournament_sizes() {
        let fitness = vec![0.5, 0.8, 0.3, 0.9, 0.1];
        let mut rng = RandomNumberGenerator::from_seed(42);
        for size in [1, 5, 10] {
            let selection = TournamentSelection::new(size, false).unwrap();
            let selected = selection.select(&fitness, 3, &mut rng).unwrap();
            assert_eq!(selected.len(), 3);
            let unique: HashSet<_> = selected.iter().collect();
            assert_eq!(unique.len(), 3);
        }
    }

    #[test]
    fn test_without_duplicates_selects_at_most_all() {
        let fitness = vec![0.5, 0.8, 0.3, 0.9, 0.1];
        let mut rng = RandomNumberGenerator::from_seed(42);
        let selection = TournamentSelection::new(3, false).unwrap();
        let selected = selection.select(&fitness, 10, &mut rng).unwrap();
        assert_eq!(selected.len(), 5);
    }

    #[test]
    fn test_with_duplicates() {
        let fitness = vec![0.5, 0.8, 0.3];
        let mut rng = RandomNumberGenerator::from_seed(42);
        let selected = TournamentSelection::default()
            .select(&fitness, 10, &mut rng)
            .unwrap();
        assert_eq!(selected.len(), 10);
        assert!(selected.iter().all(|&i| i < 3));
    }

    #[test]
    fn test_large_tournament_favors_best() {
        let fitness = vec![0.5, 0.8, 0.3, 0.9, 0.1];
        let mut rng = RandomNumberGenerator::from_seed(7);
        let selection = TournamentSelection::new(200, true).unwrap();
        let selected = selection.select(&fitness, 20, &mut rng).unwrap();
        assert!(selected.iter().all(|&i| i == 4));
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(TournamentSelection::default().with_tournament_size(0).is_err());
        let mut rng = RandomNumberGenerator::from_seed(1);
        assert!(TournamentSelection::default().select(&[], 1, &mut rng).is_err());
    }

    #[test]
    fn test_run_tournament_with_excluded() {
        let fitness = vec![0.5, 0.8, 0.3, 0.9, 0.1];
        let mut rng = RandomNumberGenerator::from_seed(42);
        let selection = TournamentSelection::default();

        let excluded: HashSet<usize> = [0, 1, 2, 4].into_iter().collect();
        assert_eq!(selection.run_tournament(&fitness, &mut rng, &excluded).unwrap(), 3);

        let excluded: HashSet<usize> = (0..fitness.len()).collect();
        assert!(selection.run_tournament(&fitness, &mut rng, &excluded).is_err());
    }
}
