use std::collections::HashSet;

use crate::error::Result;
use crate::rng::RandomNumberGenerator;
use crate::selection::selection_strategy::SelectionStrategy;
use crate::selection::{check_fitness, ranked_indices};

/// Selects the best individuals, best first.
///
/// Without duplicates at most `fitness.len()` indices are returned. With
/// duplicates the ranking is cycled until enough are selected.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct ElitistSelection {
    allow_duplicates: bool,
}

impl ElitistSelection {
    pub fn new(allow_duplicates: bool) -> Self {
        Self { allow_duplicates }
    }

    pub fn with_duplicates(mut self) -> Self {
        self.allow_duplicates = true;
        self
    }
}

impl SelectionStrategy for ElitistSelection {
    fn select(
        &self,
        fitness: &[f64],
        num_to_select: usize,
        _rng: &mut RandomNumberGenerator,
    ) -> Result<Vec<usize>> {
        check_fitness(fitness)?;
        let ranked = ranked_indices(fitness);

        let mut selected = Vec::with_capacity(num_to_select);
        let mut seen = HashSet::new();
        for &idx in &ranked {
            if selected.len() >= num_to_select {
                break;
            }
            if seen.insert(idx) {
                selected.push(idx);
            }
        }

        if self.allow_duplicates {
            let mut cursor = 0;
            while selected.len() < num_to_select {
                selected.push(ranked[cursor % ranked.len()]);
                cursor += 1;
            }
        }

        Ok(selected)
    }
}
