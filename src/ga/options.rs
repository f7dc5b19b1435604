//! # GaOptions
//!
//! Configuration of one genetic-algorithm run: generation layout, variation
//! operators, the adaptive mutation schedule, stopping rules, local
//! refinement and reporting.
//!
//! ## Example
//!
//! ```rust
//! use demoga::ga::{GaOptions, LogLevel};
//!
//! let options = GaOptions::builder()
//!     .generation_size(20)
//!     .eps(1e-3)
//!     .stuck_generations(50)
//!     .log_level(LogLevel::Minimal)
//!     .build()
//!     .unwrap();
//! assert_eq!(options.get_generation_size(), 20);
//!
//! let default_options = GaOptions::default();
//! assert_eq!(default_options.get_generation_size(), 10);
//! ```

use crate::breeding::Crossover;
use crate::error::{OptimizationError, Result};
use crate::local_search::LocalSearchKind;
use crate::selection::{RankBasedSelection, SelectionStrategy, TournamentSelection};

/// How much a run reports through `tracing` while it evolves.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Every generation with its best score at `info`.
    Verbose,
    /// Stage changes and the final result at `info`.
    Minimal,
    /// Everything at `debug`.
    #[default]
    None,
}

/// Parent selection used to fill the non-elite slots.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionKind {
    Tournament { size: usize },
    Rank { pressure: f64 },
}

impl SelectionKind {
    pub fn strategy(&self) -> Result<Box<dyn SelectionStrategy>> {
        Ok(match *self {
            SelectionKind::Tournament { size } => {
                Box::new(TournamentSelection::new(size, true)?)
            }
            SelectionKind::Rank { pressure } => Box::new(RankBasedSelection::new(pressure, true)?),
        })
    }
}

impl Default for SelectionKind {
    fn default() -> Self {
        SelectionKind::Tournament { size: 2 }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct GaOptions {
    generation_size: usize,
    elite_fraction: f64,
    p_mutation: f64,
    p_crossover: f64,
    p_random: f64,
    mutation_rate: f64,
    mutation_strength: f64,
    strength_factor: f64,
    min_strength: f64,
    max_strength: f64,
    crossover: Crossover,
    selection: SelectionKind,
    fold: f64,
    eps: f64,
    stuck_generations: usize,
    max_generations: Option<usize>,
    max_evaluations: Option<usize>,
    local_search: Option<LocalSearchKind>,
    local_search_interval: Option<usize>,
    local_search_evaluations: usize,
    refine_on_finish: bool,
    report_interval: usize,
    parallel_evaluation: bool,
    keep_history: bool,
    log_level: LogLevel,
}

impl Default for GaOptions {
    fn default() -> Self {
        Self {
            generation_size: 10,
            elite_fraction: 0.2,
            p_mutation: 0.6,
            p_crossover: 0.3,
            p_random: 0.1,
            mutation_rate: 0.2,
            mutation_strength: 0.2,
            strength_factor: 1.3,
            min_strength: 1e-3,
            max_strength: 1.0,
            crossover: Crossover::default(),
            selection: SelectionKind::default(),
            fold: 1.0,
            eps: 1e-2,
            stuck_generations: 100,
            max_generations: None,
            max_evaluations: None,
            local_search: None,
            local_search_interval: None,
            local_search_evaluations: 100,
            refine_on_finish: false,
            report_interval: 1,
            parallel_evaluation: false,
            keep_history: true,
            log_level: LogLevel::None,
        }
    }
}

/// Number of individuals each operator contributes to a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffspringPlan {
    pub elite: usize,
    pub mutation: usize,
    pub crossover: usize,
    pub random: usize,
}

impl OffspringPlan {
    pub fn total(&self) -> usize {
        self.elite + self.mutation + self.crossover + self.random
    }
}

impl GaOptions {
    pub fn builder() -> GaOptionsBuilder {
        GaOptionsBuilder::default()
    }

    /// Checks that every option is usable.
    pub fn validate(&self) -> Result<()> {
        let config = |msg: &str| Err(OptimizationError::Configuration(msg.to_string()));
        if self.generation_size == 0 {
            return config("Generation size must be positive");
        }
        if !(0.0..=1.0).contains(&self.elite_fraction) {
            return config("Elite fraction must be in [0, 1]");
        }
        let fractions = [self.p_mutation, self.p_crossover, self.p_random];
        if fractions.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return config("Operator fractions must be non-negative");
        }
        if fractions.iter().sum::<f64>() <= 0.0 {
            return config("At least one operator fraction must be positive");
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return config("Mutation rate must be in [0, 1]");
        }
        if !(self.min_strength > 0.0 && self.min_strength <= self.max_strength) {
            return config("Mutation strength bounds must satisfy 0 < min <= max");
        }
        if !(self.strength_factor >= 1.0) {
            return config("Strength factor must be at least 1");
        }
        if !(self.eps >= 0.0) {
            return config("Eps must be non-negative");
        }
        if !(self.fold >= 0.0) {
            return config("Perturbation fold must be non-negative");
        }
        if self.max_evaluations == Some(0) || self.max_generations == Some(0) {
            return config("Budgets must be positive when set");
        }
        if self.local_search_interval == Some(0) {
            return config("Local search interval must be positive when set");
        }
        if self.report_interval == 0 {
            return config("Report interval must be positive");
        }
        self.selection.strategy()?;
        Ok(())
    }

    /// Splits the generation into elites, mutants, crossovers and newcomers.
    ///
    /// At least one elite is kept and, when the generation has more than one
    /// slot, at least one slot is left for variation. The remaining slots are
    /// shared in proportion to the operator fractions, rounding leftovers
    /// going to mutation.
    pub fn offspring_plan(&self) -> OffspringPlan {
        let n = self.generation_size;
        let elite = ((self.elite_fraction * n as f64).round() as usize).clamp(1, (n - 1).max(1));
        let rest = n.saturating_sub(elite);
        let total = self.p_mutation + self.p_crossover + self.p_random;
        let crossover = ((self.p_crossover / total) * rest as f64).floor() as usize;
        let random = ((self.p_random / total) * rest as f64).floor() as usize;
        let mutation = rest - crossover - random;
        OffspringPlan {
            elite,
            mutation,
            crossover,
            random,
        }
    }

    pub fn get_generation_size(&self) -> usize {
        self.generation_size
    }

    pub fn get_elite_fraction(&self) -> f64 {
        self.elite_fraction
    }

    pub fn get_mutation_rate(&self) -> f64 {
        self.mutation_rate
    }

    pub fn get_mutation_strength(&self) -> f64 {
        self.mutation_strength
    }

    pub fn get_strength_factor(&self) -> f64 {
        self.strength_factor
    }

    pub fn get_min_strength(&self) -> f64 {
        self.min_strength
    }

    pub fn get_max_strength(&self) -> f64 {
        self.max_strength
    }

    pub fn get_crossover(&self) -> Crossover {
        self.crossover
    }

    pub fn get_selection(&self) -> SelectionKind {
        self.selection
    }

    /// Perturbation fold applied to an initial guess.
    pub fn get_fold(&self) -> f64 {
        self.fold
    }

    pub fn get_eps(&self) -> f64 {
        self.eps
    }

    pub fn get_stuck_generations(&self) -> usize {
        self.stuck_generations
    }

    pub fn get_max_generations(&self) -> Option<usize> {
        self.max_generations
    }

    pub fn get_max_evaluations(&self) -> Option<usize> {
        self.max_evaluations
    }

    pub fn get_local_search(&self) -> Option<LocalSearchKind> {
        self.local_search
    }

    pub fn get_local_search_interval(&self) -> Option<usize> {
        self.local_search_interval
    }

    pub fn get_local_search_evaluations(&self) -> usize {
        self.local_search_evaluations
    }

    pub fn get_refine_on_finish(&self) -> bool {
        self.refine_on_finish
    }

    pub fn get_report_interval(&self) -> usize {
        self.report_interval
    }

    pub fn get_parallel_evaluation(&self) -> bool {
        self.parallel_evaluation
    }

    pub fn get_keep_history(&self) -> bool {
        self.keep_history
    }

    pub fn get_log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn set_generation_size(&mut self, generation_size: usize) {
        self.generation_size = generation_size;
    }

    pub fn set_eps(&mut self, eps: f64) {
        self.eps = eps;
    }

    pub fn set_stuck_generations(&mut self, stuck_generations: usize) {
        self.stuck_generations = stuck_generations;
    }

    pub fn set_max_generations(&mut self, max_generations: Option<usize>) {
        self.max_generations = max_generations;
    }

    pub fn set_max_evaluations(&mut self, max_evaluations: Option<usize>) {
        self.max_evaluations = max_evaluations;
    }

    pub fn set_log_level(&mut self, log_level: LogLevel) {
        self.log_level = log_level;
    }
}

/// Builder for `GaOptions`.
///
/// Unset fields keep their defaults. `build` validates the result.
#[derive(Debug, Clone, Default)]
pub struct GaOptionsBuilder {
    options: GaOptions,
}

macro_rules! builder_setters {
    ($($(#[$doc:meta])* $name:ident: $ty:ty),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name(mut self, value: $ty) -> Self {
                self.options.$name = value;
                self
            }
        )*
    };
}

impl GaOptionsBuilder {
    builder_setters! {
        generation_size: usize,
        elite_fraction: f64,
        p_mutation: f64,
        p_crossover: f64,
        p_random: f64,
        /// Per-component probability of a mutation.
        mutation_rate: f64,
        /// Initial mutation strength, as a fraction of the domain width.
        mutation_strength: f64,
        strength_factor: f64,
        min_strength: f64,
        max_strength: f64,
        crossover: Crossover,
        selection: SelectionKind,
        fold: f64,
        eps: f64,
        stuck_generations: usize,
        local_search_evaluations: usize,
        refine_on_finish: bool,
        report_interval: usize,
        parallel_evaluation: bool,
        keep_history: bool,
        log_level: LogLevel,
    }

    pub fn max_generations(mut self, value: usize) -> Self {
        self.options.max_generations = Some(value);
        self
    }

    pub fn max_evaluations(mut self, value: usize) -> Self {
        self.options.max_evaluations = Some(value);
        self
    }

    pub fn local_search(mut self, value: LocalSearchKind) -> Self {
        self.options.local_search = Some(value);
        self
    }

    /// Refines the best individual every `value` generations.
    pub fn local_search_interval(mut self, value: usize) -> Self {
        self.options.local_search_interval = Some(value);
        self
    }

    pub fn build(self) -> Result<GaOptions> {
        self.options.validate()?;
        Ok(self.options)
    }
}
