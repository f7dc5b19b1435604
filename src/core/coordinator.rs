//! # Coordinator
//!
//! Launches every run of an optimization on a fixed-size thread pool and
//! watches them from the calling thread.
//!
//! The calling thread waits for run completions with a short timeout. In
//! between it checks the interrupt token and the deadline, and logs a ranked
//! summary of the shared state every `summary_interval`. The first failed
//! run, an interrupt or the deadline raise the workers' stop token; the
//! coordinator then waits for every worker to leave before returning the
//! error. Once all runs are done the best one (lowest score, lowest index on
//! ties) is returned.

use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use rayon::ThreadPoolBuilder;
use tracing::{error, info, warn};

use super::core_run::CoreRun;
use super::interruption::CancellationToken;
use super::problem::Problem;
use super::settings::Settings;
use super::shared::SharedRunState;
use super::summary::RunsSummary;
use crate::error::{OptimizationError, Result};
use crate::optimizer_result::{select_best, OptimizerResult};

type Completion = (usize, Result<OptimizerResult>);

/// Everything a successful launch produces.
#[derive(Debug, Clone)]
pub struct CoordinatorOutcome {
    pub best_index: usize,
    pub best: OptimizerResult,
    /// Results of all runs, by run index.
    pub results: Vec<(usize, OptimizerResult)>,
    pub summary: RunsSummary,
}

pub struct Coordinator<P: Problem> {
    settings: Settings,
    problem: P,
    state: Arc<SharedRunState>,
    interrupt: CancellationToken,
}

impl<P: Problem> Coordinator<P> {
    pub fn new(settings: Settings, problem: P) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            state: SharedRunState::new(settings.get_number_of_repeats()),
            settings,
            problem,
            interrupt: CancellationToken::new(),
        })
    }

    /// Uses `interrupt` instead of a private token, for example one raised
    /// by Ctrl+C.
    pub fn with_interrupt(mut self, interrupt: CancellationToken) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Token that interrupts the whole launch when raised.
    pub fn interrupt_token(&self) -> CancellationToken {
        self.interrupt.clone()
    }

    pub fn shared_state(&self) -> Arc<SharedRunState> {
        Arc::clone(&self.state)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Runs every repeat and returns the overall best.
    ///
    /// # Errors
    ///
    /// - `RunFailed` for the first run that returned an error or panicked.
    /// - `Interrupted` when the interrupt token was raised.
    /// - `DeadlineExceeded` when `max_wait` elapsed.
    ///
    /// In every case all workers have stopped when this returns.
    pub fn run(self) -> Result<CoordinatorOutcome> {
        let settings = &self.settings;
        let pool = ThreadPoolBuilder::new()
            .num_threads(settings.get_number_of_processes())
            .thread_name(|i| format!("demoga-worker-{}", i))
            .build()
            .map_err(|err| {
                OptimizationError::Configuration(format!("Cannot build worker pool: {}", err))
            })?;
        let slots = (1..=settings.get_number_of_repeats())
            .map(|index| self.state.writer(index))
            .collect::<Result<Vec<_>>>()?;
        let stop = CancellationToken::new();
        let (sender, receiver) = crossbeam_channel::unbounded::<Completion>();
        let started = Instant::now();
        info!(
            runs = slots.len(),
            processes = settings.get_number_of_processes(),
            "Launching runs"
        );

        let problem: &dyn Problem = &self.problem;
        let results = pool.in_place_scope(|scope| {
            for slot in slots {
                let sender = sender.clone();
                let stop = stop.clone();
                scope.spawn(move |_| {
                    let index = slot.index();
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                        CoreRun::new(problem, settings, slot, stop).run()
                    }))
                    .unwrap_or_else(|payload| {
                        Err(OptimizationError::RunFailed {
                            index,
                            message: panic_message(payload),
                        })
                    });
                    // The coordinator may already have given up on the runs.
                    let _ = sender.send((index, outcome));
                });
            }
            drop(sender);
            self.poll(&receiver, &stop, started)
        })?;

        let (best_index, best) = select_best(results.iter().map(|(i, r)| (*i, r)))
            .map(|(i, r)| (i, r.clone()))
            .ok_or(OptimizationError::EmptyPopulation)?;
        let summary = self.summary();
        info!(best = best_index, y = best.y(), "All runs finished\n{}", summary);
        if let Some(directory) = settings.get_output_directory() {
            fs::create_dir_all(directory)?;
            fs::write(directory.join("summary.txt"), summary.to_string())?;
        }
        Ok(CoordinatorOutcome {
            best_index,
            best,
            results,
            summary,
        })
    }

    /// Ranked summary of whatever the runs have published so far.
    pub fn summary(&self) -> RunsSummary {
        RunsSummary::from_snapshots(
            &self.state.snapshots(),
            self.state.len(),
            self.settings.get_ga().get_eps(),
        )
    }

    fn poll(
        &self,
        receiver: &Receiver<Completion>,
        stop: &CancellationToken,
        started: Instant,
    ) -> Result<Vec<(usize, OptimizerResult)>> {
        let settings = &self.settings;
        let total = settings.get_number_of_repeats();
        let mut results = Vec::with_capacity(total);
        let mut last_summary = Instant::now();

        while results.len() < total {
            if self.interrupt.is_cancelled() {
                warn!("Interrupted, stopping all runs");
                stop.cancel();
                return Err(OptimizationError::Interrupted);
            }
            if let Some(max_wait) = settings.get_max_wait() {
                if started.elapsed() >= max_wait {
                    warn!(?max_wait, "Deadline exceeded, stopping all runs");
                    stop.cancel();
                    return Err(OptimizationError::DeadlineExceeded(max_wait));
                }
            }

            match receiver.recv_timeout(settings.get_poll_interval()) {
                Ok((index, Ok(result))) => {
                    info!(run = index, y = result.y(), "Run completed");
                    results.push((index, result));
                }
                Ok((index, Err(err))) => {
                    error!(run = index, error = %err, "Run failed, stopping all runs");
                    stop.cancel();
                    return Err(match err {
                        OptimizationError::RunFailed { .. } => err,
                        other => OptimizationError::RunFailed {
                            index,
                            message: other.to_string(),
                        },
                    });
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    stop.cancel();
                    return Err(OptimizationError::Other(format!(
                        "Workers stopped after reporting {} of {} runs",
                        results.len(),
                        total
                    )));
                }
            }

            if last_summary.elapsed() >= settings.get_summary_interval() {
                info!("Current state of runs\n{}", self.summary());
                last_summary = Instant::now();
            }
        }

        results.sort_by_key(|(index, _)| *index);
        Ok(results)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "run panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::problem::FunctionProblem;
    use crate::error::Result;
    use crate::ga::GaOptions;

    fn sphere(x: &[f64]) -> Result<f64> {
        Ok(x.iter().map(|v| v * v).sum())
    }

    fn settings(repeats: usize) -> Settings {
        Settings::builder()
            .number_of_repeats(repeats)
            .number_of_processes(2)
            .ga(GaOptions::builder().max_generations(10).build().unwrap())
            .poll_interval(std::time::Duration::from_millis(10))
            .seed(5)
            .build()
            .unwrap()
    }

    #[test]
    fn test_best_of_all_runs() {
        let problem = FunctionProblem::new(sphere, &[-1.0, -1.0], &[1.0, 1.0]).unwrap();
        let coordinator = Coordinator::new(settings(4), problem).unwrap();
        let state = coordinator.shared_state();
        let outcome = coordinator.run().unwrap();
        assert_eq!(outcome.results.len(), 4);
        let indices: Vec<usize> = outcome.results.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
        assert!(outcome.results.iter().all(|(_, r)| outcome.best.y() <= r.y()));
        assert_eq!(state.finished_count(), 4);
        assert_eq!(outcome.summary.best().unwrap().index, outcome.best_index);
    }

    #[test]
    fn test_panicking_run_fails_launch() {
        let problem = FunctionProblem::new(
            |_: &[f64]| -> Result<f64> { panic!("simulation crashed") },
            &[0.0],
            &[1.0],
        )
        .unwrap();
        let err = Coordinator::new(settings(3), problem).unwrap().run().unwrap_err();
        match err {
            OptimizationError::RunFailed { message, .. } => {
                assert!(message.contains("simulation crashed"))
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("bang".to_string())), "bang");
        assert_eq!(panic_message(Box::new(3)), "run panicked");
    }
}
