//! # Individuals and populations
//!
//! An `Individual` is a parameter vector plus its score once it has been
//! evaluated. A `Population` is the ordered set of individuals of one
//! generation. Every individual of a population belongs to the same model
//! structure, which the population carries.

use crate::error::Result;
use crate::model::{Model, Structure};
use crate::selection::{compare_fitness, ranked_indices};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    values: Vec<f64>,
    score: Option<f64>,
}

impl Individual {
    /// Creates an individual that has not been evaluated yet.
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            score: None,
        }
    }

    pub fn evaluated(values: Vec<f64>, score: f64) -> Self {
        Self {
            values,
            score: Some(score),
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn score(&self) -> Option<f64> {
        self.score
    }

    pub fn is_evaluated(&self) -> bool {
        self.score.is_some()
    }

    pub fn set_score(&mut self, score: f64) {
        self.score = Some(score);
    }

    /// Score used for ranking: unevaluated individuals rank last.
    pub fn fitness(&self) -> f64 {
        self.score.unwrap_or(f64::INFINITY)
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Population {
    individuals: Vec<Individual>,
    structure: Option<Structure>,
}

impl Population {
    pub fn new(individuals: Vec<Individual>, structure: Option<Structure>) -> Self {
        Self {
            individuals,
            structure,
        }
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn individuals_mut(&mut self) -> &mut [Individual] {
        &mut self.individuals
    }

    pub fn structure(&self) -> Option<&Structure> {
        self.structure.as_ref()
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn push(&mut self, individual: Individual) {
        self.individuals.push(individual);
    }

    /// Ranking scores of all individuals, in population order.
    pub fn fitness(&self) -> Vec<f64> {
        self.individuals.iter().map(Individual::fitness).collect()
    }

    /// Sorts best first. Ties keep their order.
    pub fn sort(&mut self) {
        let order = ranked_indices(&self.fitness());
        let mut slots: Vec<Option<Individual>> =
            self.individuals.drain(..).map(Some).collect();
        self.individuals = order.into_iter().filter_map(|i| slots[i].take()).collect();
    }

    /// The evaluated individual with the lowest score.
    pub fn best(&self) -> Option<&Individual> {
        self.individuals
            .iter()
            .filter(|ind| ind.is_evaluated())
            .min_by(|a, b| compare_fitness(a.fitness(), b.fitness()))
    }

    /// Drops individuals that were never evaluated.
    pub fn retain_evaluated(&mut self) {
        self.individuals.retain(Individual::is_evaluated);
    }

    /// Vectors and scores of the evaluated individuals.
    pub fn evaluated_parts(&self) -> (Vec<Vec<f64>>, Vec<f64>) {
        self.individuals
            .iter()
            .filter_map(|ind| ind.score().map(|s| (ind.values.clone(), s)))
            .unzip()
    }

    /// Projects every individual from `from` into the layout of `to`. Scores
    /// are dropped since they belong to the old model.
    pub fn embed(&self, from: &Model, to: &Model) -> Result<Population> {
        let individuals = self
            .individuals
            .iter()
            .map(|ind| from.embed(ind.values(), to).map(Individual::new))
            .collect::<Result<Vec<_>>>()?;
        Ok(Population::new(individuals, to.structure().cloned()))
    }
}
