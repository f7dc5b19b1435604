//! # Error Types
//!
//! This module defines the error type shared by every layer of the optimizer:
//! model and data handling, the genetic algorithm driver and the parallel run
//! coordinator.
//!
//! Errors split into two families. Errors raised while scoring a single
//! parameter vector are never fatal: the GA driver turns them into the worst
//! possible fitness and keeps going. Every other variant escapes the driver and
//! is reported by the coordinator as the failure of the whole optimization.
//!
//! ## Examples
//!
//! Using the `Result` type:
//!
//! ```rust
//! use demoga::error::{OptimizationError, Result};
//!
//! fn check_repeats(repeats: usize) -> Result<()> {
//!     if repeats == 0 {
//!         return Err(OptimizationError::Configuration(
//!             "Number of repeats must be positive".to_string(),
//!         ));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_repeats(0).is_err());
//! ```
//!
//! Using the `ResultExt` trait to add context to errors:
//!
//! ```rust
//! use demoga::error::{Result, ResultExt};
//! use std::fs::File;
//!
//! fn open_spectrum(path: &str) -> Result<()> {
//!     File::open(path).context("Failed to open spectrum file")?;
//!     Ok(())
//! }
//! ```
//!
//! Using the `OptionExt` trait to convert `Option` to `Result`:
//!
//! ```rust
//! use demoga::error::{OptimizationError, OptionExt};
//!
//! fn lowest(scores: &[f64]) -> demoga::error::Result<f64> {
//!     scores
//!         .iter()
//!         .copied()
//!         .min_by(|a, b| a.total_cmp(b))
//!         .ok_or_else_optim(|| OptimizationError::EmptyPopulation)
//! }
//! ```

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Represents errors that can occur while optimizing a demographic model.
#[derive(Error, Debug)]
pub enum OptimizationError {
    /// An invalid configuration was provided.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An operation required at least one individual.
    #[error("Empty population error: Cannot operate on an empty population")]
    EmptyPopulation,

    /// The objective function failed for one parameter vector.
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// NaN or infinity values were encountered where finite values are required.
    #[error("Invalid numeric value: {0}")]
    InvalidNumericValue(String),

    /// A model definition or a parameter vector does not fit the model.
    #[error("Model error: {0}")]
    Model(String),

    /// Observed or simulated spectrum data is malformed.
    #[error("Data error: {0}")]
    Data(String),

    /// A simulation engine could not be resolved or failed to simulate.
    #[error("Engine error: {0}")]
    Engine(String),

    /// One of the independent runs failed; the whole optimization is aborted.
    #[error("Run {index} failed: {message}")]
    RunFailed { index: usize, message: String },

    /// The optimization was interrupted by the user.
    #[error("Optimization was interrupted")]
    Interrupted,

    /// The coordinator gave up waiting for the runs.
    #[error("Deadline exceeded after {0:?}")]
    DeadlineExceeded(std::time::Duration),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A generic error with a custom message.
    #[error("{0}")]
    Other(String),
}

impl OptimizationError {
    /// Returns `true` for errors that only invalidate a single evaluation.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            OptimizationError::Evaluation(_) | OptimizationError::InvalidNumericValue(_)
        )
    }
}

/// A specialized Result type for optimizer operations.
pub type Result<T> = std::result::Result<T, OptimizationError>;

/// Extension trait for Result to add context to errors.
///
/// ## Examples
///
/// ```rust
/// use demoga::error::ResultExt;
/// use std::fs::File;
///
/// fn read_file(path: &str) -> demoga::error::Result<()> {
///     File::open(path).context("Failed to open file")?;
///     Ok(())
/// }
/// ```
pub trait ResultExt<T, E> {
    /// Converts the error to an `OptimizationError` with the provided context.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static;
}

impl<T, E> ResultExt<T, E> for std::result::Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| OptimizationError::Other(format!("{}: {}", context, e)))
    }
}

/// Extension trait for Option to convert to Result with a custom error.
pub trait OptionExt<T> {
    /// Converts an `Option<T>` to a `Result<T>` using a closure to generate the error.
    fn ok_or_else_optim<F>(self, err_fn: F) -> Result<T>
    where
        F: FnOnce() -> OptimizationError;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_else_optim<F>(self, err_fn: F) -> Result<T>
    where
        F: FnOnce() -> OptimizationError,
    {
        self.ok_or_else(err_fn)
    }
}
