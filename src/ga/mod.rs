//! # Genetic algorithm
//!
//! One GA search over a bounded parameter space: options, budgeted
//! evaluation, stopping rules and the generation loop.

pub mod driver;
pub mod evaluator;
pub mod options;
pub mod termination;

pub use driver::{GeneticAlgorithm, Initialization, ProgressCallback};
pub use evaluator::{score_or_worst, Evaluator};
pub use options::{GaOptions, GaOptionsBuilder, LogLevel, OffspringPlan, SelectionKind};
pub use termination::StopTracker;
