//! # Core
//!
//! Parallel execution of independent optimization runs: launch settings,
//! the per-run driver, the state runs share with the coordinator, ranked
//! summaries and cooperative interruption.

pub mod coordinator;
pub mod core_run;
pub mod interruption;
pub mod problem;
pub mod settings;
pub mod shared;
pub mod summary;

pub use coordinator::{Coordinator, CoordinatorOutcome};
pub use core_run::CoreRun;
pub use interruption::{install_ctrlc_handler, CancellationToken};
pub use problem::{FunctionProblem, InferenceProblem, Problem};
pub use settings::{Settings, SettingsBuilder};
pub use shared::{RunSlot, RunSnapshot, SharedRunState};
pub use summary::{precision_for, RunsSummary, SummaryRow};
