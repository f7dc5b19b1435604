use tracing::{debug, info};

use super::evaluator::Evaluator;
use super::options::{GaOptions, LogLevel};
use super::termination::StopTracker;
use crate::breeding::{BreedStrategy, GeneticBreedStrategy, MutationSchedule};
use crate::core::CancellationToken;
use crate::error::{OptimizationError, Result};
use crate::local_search::LocalSearch;
use crate::objective::ObjectiveFunction;
use crate::optimizer_result::{OptimizerResult, ResultParts, Status};
use crate::population::{Individual, Population};
use crate::rng::RandomNumberGenerator;
use crate::variable::ParameterSpace;

/// How the first generation is built.
#[derive(Debug, Clone, PartialEq)]
pub enum Initialization {
    /// Uniform samples within the bounds.
    Random,
    /// Perturbations of one guess, each value multiplied by `2^(fold * u)`.
    Guess(Vec<f64>),
    /// Points carried over from an earlier search. Missing slots are filled
    /// with perturbations of these points.
    Population(Vec<Vec<f64>>),
}

/// Running state handed to progress callbacks.
pub type ProgressCallback<'c> = dyn FnMut(&OptimizerResult) + 'c;

/// A genetic algorithm minimizing an objective over a bounded space.
///
/// Each generation is evaluated, ranked, optionally refined by a local
/// search, checked against the stopping rules and then bred into the next
/// one. The run stops when the best score stagnates, a budget runs out or
/// the cancellation token is raised.
#[derive(Debug)]
pub struct GeneticAlgorithm {
    options: GaOptions,
    breeder: Box<dyn BreedStrategy>,
}

impl GeneticAlgorithm {
    pub fn new(options: GaOptions) -> Result<Self> {
        let breeder = Box::new(GeneticBreedStrategy::from_options(&options)?);
        Self::with_breeder(options, breeder)
    }

    /// Uses `breeder` instead of the strategy described by `options`.
    pub fn with_breeder(options: GaOptions, breeder: Box<dyn BreedStrategy>) -> Result<Self> {
        options.validate()?;
        Ok(Self { options, breeder })
    }

    pub fn options(&self) -> &GaOptions {
        &self.options
    }

    /// Runs the GA to completion.
    pub fn optimize(
        &self,
        objective: &dyn ObjectiveFunction,
        space: &ParameterSpace,
        init: Initialization,
        rng: &mut RandomNumberGenerator,
    ) -> Result<OptimizerResult> {
        self.optimize_with(objective, space, init, rng, None, &mut |_: &OptimizerResult| {})
    }

    /// Runs the GA, checking `cancel` before every evaluation and calling
    /// `on_progress` every `report_interval` generations with the running
    /// best (status `Running`, no history).
    ///
    /// # Errors
    ///
    /// Fails on an unusable initialization or when the run is cancelled
    /// before a single point was evaluated.
    pub fn optimize_with(
        &self,
        objective: &dyn ObjectiveFunction,
        space: &ParameterSpace,
        init: Initialization,
        rng: &mut RandomNumberGenerator,
        cancel: Option<&CancellationToken>,
        on_progress: &mut ProgressCallback<'_>,
    ) -> Result<OptimizerResult> {
        let options = &self.options;
        let mut evaluator = Evaluator::new(objective, options.get_max_evaluations())
            .with_history(options.get_keep_history());
        if let Some(token) = cancel {
            evaluator = evaluator.with_cancel(token);
        }
        let mut schedule = MutationSchedule::from_options(options);
        let mut tracker = StopTracker::from_options(options);
        let local = options
            .get_local_search()
            .map(|kind| kind.searcher(options.get_local_search_evaluations()));

        let mut population = self.initial_population(space, init, rng)?;
        let status = loop {
            let complete =
                evaluator.evaluate_population(&mut population, options.get_parallel_evaluation());
            if !complete {
                population.retain_evaluated();
            }
            if population.is_empty() {
                return Err(if evaluator.is_cancelled() {
                    OptimizationError::Interrupted
                } else {
                    OptimizationError::EmptyPopulation
                });
            }
            population.sort();

            let generation = tracker.generations() + 1;
            if let (Some(search), Some(interval)) = (&local, options.get_local_search_interval()) {
                if complete && generation % interval == 0 {
                    refine(search.as_ref(), &mut population, space, &mut evaluator, rng);
                }
            }

            let best = population.individuals()[0].fitness();
            let improved = tracker.record(best);
            schedule.update(improved);
            match options.get_log_level() {
                LogLevel::Verbose => info!(
                    generation,
                    best,
                    n_eval = evaluator.n_eval(),
                    strength = schedule.strength(),
                    "Generation finished"
                ),
                _ => debug!(
                    generation,
                    best,
                    n_eval = evaluator.n_eval(),
                    strength = schedule.strength(),
                    "Generation finished"
                ),
            }

            if generation % options.get_report_interval() == 0 && !evaluator.is_cancelled() {
                on_progress(&progress(&population, evaluator.n_eval(), generation)?);
            }

            if evaluator.is_cancelled() {
                break Status::Interrupted;
            }
            if !complete || evaluator.is_exhausted() {
                break Status::EvaluationsExhausted;
            }
            if tracker.is_converged() {
                break Status::Converged;
            }
            if tracker.generations_exhausted() {
                break Status::GenerationsExhausted;
            }

            let children =
                self.breeder
                    .breed(&population, space, options, schedule.strength(), rng)?;
            population = Population::new(children, population.structure().cloned());
        };

        if let Some(search) = &local {
            if options.get_refine_on_finish() && status != Status::Interrupted {
                refine(search.as_ref(), &mut population, space, &mut evaluator, rng);
            }
        }

        let best = &population.individuals()[0];
        let (x_out, y_out) = population.evaluated_parts();
        let (all_x, all_y) = evaluator.take_history();
        let result = OptimizerResult::new(
            ResultParts {
                x: best.values().to_vec(),
                y: best.fitness(),
                all_x,
                all_y,
                n_eval: evaluator.n_eval(),
                n_iter: tracker.generations(),
                x_out,
                y_out,
            },
            status,
        )?;

        match options.get_log_level() {
            LogLevel::None => debug!(y = result.y(), n_eval = result.n_eval(), %status, "GA finished"),
            _ => info!(y = result.y(), n_eval = result.n_eval(), %status, "GA finished"),
        }
        Ok(result)
    }

    fn initial_population(
        &self,
        space: &ParameterSpace,
        init: Initialization,
        rng: &mut RandomNumberGenerator,
    ) -> Result<Population> {
        let size = self.options.get_generation_size();
        let fold = self.options.get_fold();
        let points: Vec<Vec<f64>> = match init {
            Initialization::Random => (0..size).map(|_| space.sample(rng)).collect(),
            Initialization::Guess(guess) => {
                space.check_len(&guess)?;
                (0..size).map(|_| space.perturb(&guess, fold, rng)).collect()
            }
            Initialization::Population(points) => {
                if points.is_empty() {
                    return Err(OptimizationError::Configuration(
                        "Initial population is empty".to_string(),
                    ));
                }
                for point in &points {
                    space.check_len(point)?;
                }
                let mut chosen: Vec<Vec<f64>> =
                    points.iter().take(size).map(|p| space.clamped(p)).collect();
                let mut cursor = 0;
                while chosen.len() < size {
                    chosen.push(space.perturb(&points[cursor % points.len()], fold, rng));
                    cursor += 1;
                }
                chosen
            }
        };
        Ok(Population::new(
            points.into_iter().map(Individual::new).collect(),
            space.structure().cloned(),
        ))
    }
}

/// Runs `search` from the best individual of a sorted population and keeps
/// the outcome only if it is strictly better.
fn refine(
    search: &dyn LocalSearch,
    population: &mut Population,
    space: &ParameterSpace,
    evaluator: &mut Evaluator<'_>,
    rng: &mut RandomNumberGenerator,
) {
    let Some(best) = population.individuals().first() else {
        return;
    };
    let start_score = best.fitness();
    let start = best.values().to_vec();
    let (x, y) = search.search(&start, start_score, space, evaluator, rng);
    if y < start_score {
        debug!(from = start_score, to = y, "Local search improved the best individual");
        population.individuals_mut()[0] = Individual::evaluated(x, y);
    }
}

fn progress(population: &Population, n_eval: usize, generation: usize) -> Result<OptimizerResult> {
    let best = &population.individuals()[0];
    let (x_out, y_out) = population.evaluated_parts();
    OptimizerResult::new(
        ResultParts {
            x: best.values().to_vec(),
            y: best.fitness(),
            n_eval,
            n_iter: generation,
            x_out,
            y_out,
            ..Default::default()
        },
        Status::Running,
    )
}
