//! # Settings
//!
//! Launch configuration of the coordinator: how many independent runs, on
//! how many threads, the GA options every run shares, the model structures
//! to search and where to write the final summary.
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use demoga::core::Settings;
//!
//! let settings = Settings::builder()
//!     .number_of_repeats(4)
//!     .number_of_processes(2)
//!     .seed(7)
//!     .max_wait(Duration::from_secs(600))
//!     .build()
//!     .unwrap();
//! assert_eq!(settings.get_number_of_repeats(), 4);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{OptimizationError, Result};
use crate::ga::GaOptions;
use crate::model::Structure;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    number_of_repeats: usize,
    number_of_processes: usize,
    ga: GaOptions,
    initial_structure: Option<Structure>,
    final_structure: Option<Structure>,
    initial_guess: Option<Vec<f64>>,
    output_directory: Option<PathBuf>,
    summary_interval: Duration,
    poll_interval: Duration,
    max_wait: Option<Duration>,
    seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            number_of_repeats: 6,
            number_of_processes: 6,
            ga: GaOptions::default(),
            initial_structure: None,
            final_structure: None,
            initial_guess: None,
            output_directory: None,
            summary_interval: Duration::from_secs(60),
            poll_interval: Duration::from_millis(200),
            max_wait: None,
            seed: None,
        }
    }
}

impl Settings {
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.number_of_repeats == 0 {
            return Err(OptimizationError::Configuration(
                "Number of repeats must be positive".to_string(),
            ));
        }
        if self.number_of_processes == 0 {
            return Err(OptimizationError::Configuration(
                "Number of processes must be positive".to_string(),
            ));
        }
        if self.summary_interval.is_zero() || self.poll_interval.is_zero() {
            return Err(OptimizationError::Configuration(
                "Summary and poll intervals must be positive".to_string(),
            ));
        }
        match (&self.initial_structure, &self.final_structure) {
            (Some(initial), Some(last)) => initial.check_reachable(last)?,
            (None, Some(_)) => {
                return Err(OptimizationError::Configuration(
                    "Final structure is set without an initial structure".to_string(),
                ))
            }
            _ => {}
        }
        self.ga.validate()
    }

    /// `true` when runs grow the model from the initial to the final
    /// structure.
    pub fn increases_structure(&self) -> bool {
        match (&self.initial_structure, &self.final_structure) {
            (Some(initial), Some(last)) => initial.can_grow_towards(last),
            _ => false,
        }
    }

    pub fn get_number_of_repeats(&self) -> usize {
        self.number_of_repeats
    }

    pub fn get_number_of_processes(&self) -> usize {
        self.number_of_processes
    }

    pub fn get_ga(&self) -> &GaOptions {
        &self.ga
    }

    pub fn get_initial_structure(&self) -> Option<&Structure> {
        self.initial_structure.as_ref()
    }

    /// The final structure, defaulting to the initial one.
    pub fn get_final_structure(&self) -> Option<&Structure> {
        self.final_structure
            .as_ref()
            .or(self.initial_structure.as_ref())
    }

    /// A guess to start every run from. Runs search randomly without one.
    pub fn get_initial_guess(&self) -> Option<&[f64]> {
        self.initial_guess.as_deref()
    }

    pub fn get_output_directory(&self) -> Option<&Path> {
        self.output_directory.as_deref()
    }

    pub fn get_summary_interval(&self) -> Duration {
        self.summary_interval
    }

    pub fn get_poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn get_max_wait(&self) -> Option<Duration> {
        self.max_wait
    }

    pub fn get_seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn set_ga(&mut self, ga: GaOptions) {
        self.ga = ga;
    }

    pub fn set_number_of_repeats(&mut self, number_of_repeats: usize) {
        self.number_of_repeats = number_of_repeats;
    }

    pub fn set_number_of_processes(&mut self, number_of_processes: usize) {
        self.number_of_processes = number_of_processes;
    }

    pub fn set_seed(&mut self, seed: Option<u64>) {
        self.seed = seed;
    }
}

#[derive(Debug, Clone, Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    pub fn number_of_repeats(mut self, value: usize) -> Self {
        self.settings.number_of_repeats = value;
        self
    }

    pub fn number_of_processes(mut self, value: usize) -> Self {
        self.settings.number_of_processes = value;
        self
    }

    pub fn ga(mut self, value: GaOptions) -> Self {
        self.settings.ga = value;
        self
    }

    pub fn initial_structure(mut self, value: Structure) -> Self {
        self.settings.initial_structure = Some(value);
        self
    }

    pub fn final_structure(mut self, value: Structure) -> Self {
        self.settings.final_structure = Some(value);
        self
    }

    pub fn initial_guess(mut self, value: Vec<f64>) -> Self {
        self.settings.initial_guess = Some(value);
        self
    }

    pub fn output_directory(mut self, value: impl Into<PathBuf>) -> Self {
        self.settings.output_directory = Some(value.into());
        self
    }

    /// Time between two running summaries.
    pub fn summary_interval(mut self, value: Duration) -> Self {
        self.settings.summary_interval = value;
        self
    }

    /// Longest wait for a run completion before the coordinator checks its
    /// tokens and deadline again.
    pub fn poll_interval(mut self, value: Duration) -> Self {
        self.settings.poll_interval = value;
        self
    }

    pub fn max_wait(mut self, value: Duration) -> Self {
        self.settings.max_wait = Some(value);
        self
    }

    pub fn seed(mut self, value: u64) -> Self {
        self.settings.seed = Some(value);
        self
    }

    pub fn build(self) -> Result<Settings> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}
