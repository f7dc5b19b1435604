//! One independent optimization run.
//!
//! A `CoreRun` drives the GA for one run index. Without structure increase
//! it is a single GA search. With it, the search starts at the initial
//! structure, and each time it stops it grows the structure by one epoch
//! towards the final one, carries the last population over into the larger
//! model and continues, until the final structure has been searched.
//!
//! Evaluation and generation budgets are shared by all stages of a run.
//! Progress goes into the run's slot, never after the stop token is raised.

use std::time::Instant;

use tracing::{debug, info};

use super::interruption::CancellationToken;
use super::problem::Problem;
use super::settings::Settings;
use super::shared::{RunSlot, RunSnapshot};
use crate::error::Result;
use crate::ga::{GeneticAlgorithm, Initialization};
use crate::model::{Model, Structure};
use crate::optimizer_result::{OptimizerResult, Status};
use crate::rng::RandomNumberGenerator;

pub struct CoreRun<'a> {
    index: usize,
    problem: &'a dyn Problem,
    settings: &'a Settings,
    slot: RunSlot,
    stop: CancellationToken,
    started: Instant,
}

impl<'a> CoreRun<'a> {
    pub fn new(
        problem: &'a dyn Problem,
        settings: &'a Settings,
        slot: RunSlot,
        stop: CancellationToken,
    ) -> Self {
        Self {
            index: slot.index(),
            problem,
            settings,
            slot,
            stop,
            started: Instant::now(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Runs to completion and publishes the final snapshot.
    pub fn run(self) -> Result<OptimizerResult> {
        let mut rng = RandomNumberGenerator::for_run(self.settings.get_seed(), self.index);
        let (result, structure) = if self.settings.increases_structure() {
            self.run_with_increase(&mut rng)?
        } else {
            let structure = self.settings.get_initial_structure().cloned();
            (self.run_without_increase(&mut rng)?, structure)
        };
        self.publish(&result, structure, true);
        info!(
            run = self.index,
            y = result.y(),
            n_eval = result.n_eval(),
            status = %result.status(),
            "Run finished"
        );
        Ok(result)
    }

    /// A single GA search at the initial structure, if any.
    pub fn run_without_increase(&self, rng: &mut RandomNumberGenerator) -> Result<OptimizerResult> {
        let structure = self.settings.get_initial_structure();
        let model = self.problem.model_for(structure)?;
        let init = match self.settings.get_initial_guess() {
            Some(guess) => Initialization::Guess(guess.to_vec()),
            None => Initialization::Random,
        };
        self.stage(&model, init, None, rng)
    }

    /// GA searches over growing structures, from the initial structure to
    /// the final one.
    pub fn run_with_increase(
        &self,
        rng: &mut RandomNumberGenerator,
    ) -> Result<(OptimizerResult, Option<Structure>)> {
        let Some(last) = self.settings.get_final_structure() else {
            return Ok((self.run_without_increase(rng)?, None));
        };
        let mut structure = self.settings.get_initial_structure().cloned();
        let mut model = self.problem.model_for(structure.as_ref())?;
        let mut init = match self.settings.get_initial_guess() {
            Some(guess) => Initialization::Guess(guess.to_vec()),
            None => Initialization::Random,
        };
        let mut total: Option<OptimizerResult> = None;

        loop {
            let result = self.stage(&model, init, total.as_ref(), rng)?;
            let combined = match &total {
                Some(previous) => previous.accumulate(&result),
                None => result,
            };
            let stop_here = combined.status() == Status::Interrupted
                || self.stop.is_cancelled()
                || self.budget_spent(&combined);
            let next = structure
                .as_ref()
                .and_then(|current| current.increment(last, rng));
            let Some(next) = next.filter(|_| !stop_here) else {
                return Ok((combined, structure));
            };

            info!(
                run = self.index,
                from = %structure.as_ref().map(|s| s.to_string()).unwrap_or_default(),
                to = %next,
                y = combined.y(),
                "Increasing structure"
            );
            let larger = self.problem.model_for(Some(&next))?;
            let carried = combined
                .x_out()
                .iter()
                .map(|values| model.embed(values, &larger))
                .collect::<Result<Vec<_>>>()?;
            init = Initialization::Population(carried);
            model = larger;
            structure = Some(next);
            total = Some(combined);
        }
    }

    /// One GA search over `model`, its budgets reduced by what `before`
    /// already spent.
    fn stage(
        &self,
        model: &Model,
        init: Initialization,
        before: Option<&OptimizerResult>,
        rng: &mut RandomNumberGenerator,
    ) -> Result<OptimizerResult> {
        let mut options = self.settings.get_ga().clone();
        if let Some(before) = before {
            if let Some(max) = options.get_max_evaluations() {
                options.set_max_evaluations(Some(max.saturating_sub(before.n_eval()).max(1)));
            }
            if let Some(max) = options.get_max_generations() {
                options.set_max_generations(Some(max.saturating_sub(before.n_iter()).max(1)));
            }
        }
        let ga = GeneticAlgorithm::new(options)?;
        let space = model.parameter_space();
        let objective = self.problem.objective_for(model)?;
        let structure = model.structure().cloned();
        debug!(
            run = self.index,
            dimension = space.len(),
            structure = %structure.as_ref().map(|s| s.to_string()).unwrap_or_default(),
            "Starting GA stage"
        );

        let offset = before.map(|b| {
            OptimizerResult::from_point(b.x().to_vec(), b.y(), b.n_eval(), b.n_iter(), b.status())
        });
        let mut on_progress = |progress: &OptimizerResult| {
            let snapshot = match &offset {
                Some(offset) => offset.accumulate(progress),
                None => progress.clone(),
            };
            self.publish(&snapshot, structure.clone(), false);
        };
        ga.optimize_with(
            objective.as_ref(),
            &space,
            init,
            rng,
            Some(&self.stop),
            &mut on_progress,
        )
    }

    fn budget_spent(&self, result: &OptimizerResult) -> bool {
        let options = self.settings.get_ga();
        options
            .get_max_evaluations()
            .map_or(false, |max| result.n_eval() >= max)
            || options
                .get_max_generations()
                .map_or(false, |max| result.n_iter() >= max)
    }

    fn publish(&self, result: &OptimizerResult, structure: Option<Structure>, finished: bool) {
        if self.stop.is_cancelled() {
            return;
        }
        self.slot.publish(RunSnapshot {
            index: self.index,
            result: result.clone(),
            structure,
            elapsed: self.started.elapsed(),
            finished,
        });
    }
}
