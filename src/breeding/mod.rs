//! # Breeding
//!
//! A `BreedStrategy` turns one evaluated generation into the next one.
//!
//! `GeneticBreedStrategy` keeps the elites with their scores, then fills the
//! rest of the generation with mutants and crossovers of selected parents and
//! with uniformly drawn newcomers. New individuals are unevaluated.

pub mod crossover;
pub mod mutation;

use std::fmt::Debug;

use tracing::trace;

pub use crossover::Crossover;
pub use mutation::{mutate, MutationSchedule};

use crate::error::{OptimizationError, Result};
use crate::ga::GaOptions;
use crate::population::{Individual, Population};
use crate::rng::RandomNumberGenerator;
use crate::selection::{ElitistSelection, SelectionStrategy};
use crate::variable::ParameterSpace;

/// Produces the next generation from the current one.
pub trait BreedStrategy: Debug + Send + Sync {
    /// Breeds a full generation of `options.get_generation_size()`
    /// individuals.
    ///
    /// # Errors
    ///
    /// Returns `EmptyPopulation` when `parents` is empty.
    fn breed(
        &self,
        parents: &Population,
        space: &ParameterSpace,
        options: &GaOptions,
        strength: f64,
        rng: &mut RandomNumberGenerator,
    ) -> Result<Vec<Individual>>;
}

#[derive(Debug)]
pub struct GeneticBreedStrategy {
    elitism: ElitistSelection,
    selection: Box<dyn SelectionStrategy>,
    crossover: Crossover,
}

impl GeneticBreedStrategy {
    pub fn new(selection: Box<dyn SelectionStrategy>, crossover: Crossover) -> Self {
        Self {
            elitism: ElitistSelection::default(),
            selection,
            crossover,
        }
    }

    pub fn from_options(options: &GaOptions) -> Result<Self> {
        Ok(Self::new(
            options.get_selection().strategy()?,
            options.get_crossover(),
        ))
    }
}

impl BreedStrategy for GeneticBreedStrategy {
    fn breed(
        &self,
        parents: &Population,
        space: &ParameterSpace,
        options: &GaOptions,
        strength: f64,
        rng: &mut RandomNumberGenerator,
    ) -> Result<Vec<Individual>> {
        if parents.is_empty() {
            return Err(OptimizationError::EmptyPopulation);
        }
        let plan = options.offspring_plan();
        let fitness = parents.fitness();
        let individuals = parents.individuals();

        let mut children = Vec::with_capacity(plan.total());
        for idx in self.elitism.select(&fitness, plan.elite, rng)? {
            children.push(individuals[idx].clone());
        }

        let wanted = plan.mutation + 2 * plan.crossover;
        let chosen = if wanted > 0 {
            self.selection.select(&fitness, wanted, rng)?
        } else {
            Vec::new()
        };
        let mut pick = {
            let mut cursor = 0usize;
            move |rng: &mut RandomNumberGenerator| {
                let idx = if chosen.is_empty() {
                    rng.index(individuals.len())
                } else {
                    chosen[cursor % chosen.len()]
                };
                cursor += 1;
                individuals[idx].values()
            }
        };

        for _ in 0..plan.mutation {
            let parent = pick(rng);
            children.push(Individual::new(mutate(
                parent,
                space,
                options.get_mutation_rate(),
                strength,
                rng,
            )));
        }
        for _ in 0..plan.crossover {
            let first = pick(rng);
            let second = pick(rng);
            children.push(Individual::new(
                self.crossover.apply(first, second, space, rng),
            ));
        }
        for _ in 0..plan.random {
            children.push(Individual::new(space.sample(rng)));
        }

        trace!(
            elite = plan.elite,
            mutation = plan.mutation,
            crossover = plan.crossover,
            random = plan.random,
            "Bred a new generation"
        );
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parents() -> Population {
        Population::new(
            (0..10)
                .map(|i| Individual::evaluated(vec![i as f64 / 10.0, 0.5], i as f64))
                .collect(),
            None,
        )
    }

    #[test]
    fn test_breed_fills_generation_and_keeps_elites() {
        let options = GaOptions::builder().p_random(0.3).build().unwrap();
        let space = ParameterSpace::from_bounds(&[0.0, 0.0], &[1.0, 1.0]).unwrap();
        let strategy = GeneticBreedStrategy::from_options(&options).unwrap();
        let mut rng = RandomNumberGenerator::from_seed(2);

        let children = strategy
            .breed(&parents(), &space, &options, 0.2, &mut rng)
            .unwrap();
        assert_eq!(children.len(), options.get_generation_size());

        let plan = options.offspring_plan();
        assert_eq!(children[0].score(), Some(0.0));
        assert_eq!(children[1].score(), Some(1.0));
        assert!(children[plan.elite..].iter().all(|c| !c.is_evaluated()));
        assert!(children.iter().all(|c| space.contains(c.values())));
    }

    #[test]
    fn test_breed_single_slot_generation() {
        let options = GaOptions::builder().generation_size(1).build().unwrap();
        let space = ParameterSpace::from_bounds(&[0.0, 0.0], &[1.0, 1.0]).unwrap();
        let strategy = GeneticBreedStrategy::from_options(&options).unwrap();
        let mut rng = RandomNumberGenerator::from_seed(2);
        let children = strategy
            .breed(&parents(), &space, &options, 0.2, &mut rng)
            .unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].score(), Some(0.0));
    }

    #[test]
    fn test_breed_empty_population() {
        let options = GaOptions::default();
        let space = ParameterSpace::from_bounds(&[0.0], &[1.0]).unwrap();
        let strategy = GeneticBreedStrategy::from_options(&options).unwrap();
        let mut rng = RandomNumberGenerator::from_seed(2);
        assert!(strategy
            .breed(&Population::default(), &space, &options, 0.2, &mut rng)
            .is_err());
    }
}
