//! Distributed genetic-algorithm optimizer for demographic models.
//!
//! Independent GA runs search the parameters of a demographic model fitted
//! to an allele frequency spectrum. Each run is a GA with optional local
//! refinement over a model whose structure may grow during the search. The
//! [`core::Coordinator`] runs them on a thread pool, reports ranked
//! summaries while they work and returns the best result.
//!
//! ```rust
//! use demoga::core::{Coordinator, FunctionProblem, Settings};
//! use demoga::ga::GaOptions;
//!
//! let problem = FunctionProblem::new(
//!     |x: &[f64]| -> demoga::Result<f64> { Ok(x[0] * x[0] + x[1] * x[1]) },
//!     &[0.0, 0.0],
//!     &[1.0, 1.0],
//! )
//! .unwrap();
//! let settings = Settings::builder()
//!     .number_of_repeats(2)
//!     .number_of_processes(2)
//!     .ga(GaOptions::builder().max_generations(20).build().unwrap())
//!     .seed(1)
//!     .build()
//!     .unwrap();
//! let outcome = Coordinator::new(settings, problem).unwrap().run().unwrap();
//! assert!(outcome.best.y() < 0.5);
//! ```

pub mod breeding;
pub mod caching;
pub mod core;
pub mod engine;
pub mod error;
pub mod ga;
pub mod local_search;
pub mod model;
pub mod objective;
pub mod optimizer_result;
pub mod population;
pub mod rng;
pub mod selection;
pub mod spectrum;
pub mod variable;

// Re-export commonly used types for convenience
pub use error::{OptimizationError, OptionExt, Result, ResultExt};
pub use optimizer_result::{OptimizerResult, Status};
