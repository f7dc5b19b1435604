//! # Simulation engines
//!
//! An `Engine` ties observed data to a `Simulator` that computes the expected
//! spectrum of a model. The numerical method itself is opaque: any
//! `Simulator` implementation (or plain closure) can be plugged in.
//!
//! Engines are identified by a fixed `EngineId`. The id decides which
//! numerical resolution the simulator expects: a list of grid sizes for
//! `dadi`, an integration time step for `moments`.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use tracing::trace;

use crate::error::{OptimizationError, Result};
use crate::model::Model;
use crate::spectrum::{ll_multinom, optimal_sfs_scaling, Spectrum};

/// Known simulation backends.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineId {
    Dadi,
    Moments,
}

impl EngineId {
    pub fn all() -> [EngineId; 2] {
        [EngineId::Dadi, EngineId::Moments]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EngineId::Dadi => "dadi",
            EngineId::Moments => "moments",
        }
    }

    /// Resolution used when none is configured.
    ///
    /// For `dadi` the grid sizes are `n + 10`, `n + 20` and `n + 30`, `n`
    /// being the largest sample size.
    pub fn default_resolution(self, sample_sizes: &[usize]) -> Resolution {
        match self {
            EngineId::Dadi => {
                let n = sample_sizes.iter().copied().max().unwrap_or(0);
                Resolution::Grid(vec![n + 10, n + 20, n + 30])
            }
            EngineId::Moments => Resolution::TimeStep(0.01),
        }
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineId {
    type Err = OptimizationError;

    fn from_str(s: &str) -> Result<Self> {
        EngineId::all()
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                OptimizationError::Engine(format!(
                    "Engine of the demographic inference '{}' is not registered",
                    s
                ))
            })
    }
}

/// Numerical resolution passed to a simulator.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Grid sizes for extrapolation.
    Grid(Vec<usize>),
    /// Integration time step factor.
    TimeStep(f64),
}

/// Computes the expected spectrum for named parameter values.
pub trait Simulator: Send + Sync {
    fn simulate(
        &self,
        values: &[(String, f64)],
        sample_sizes: &[usize],
        resolution: &Resolution,
    ) -> Result<Spectrum>;
}

impl<F> Simulator for F
where
    F: Fn(&[(String, f64)], &[usize], &Resolution) -> Result<Spectrum> + Send + Sync,
{
    fn simulate(
        &self,
        values: &[(String, f64)],
        sample_sizes: &[usize],
        resolution: &Resolution,
    ) -> Result<Spectrum> {
        self(values, sample_sizes, resolution)
    }
}

/// Observed data plus the simulator used to explain it.
#[derive(Clone)]
pub struct Engine {
    id: EngineId,
    data: Option<Spectrum>,
    simulator: Arc<dyn Simulator>,
    resolution: Option<Resolution>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("id", &self.id)
            .field("data", &self.data.as_ref().map(|d| d.shape().to_vec()))
            .field("resolution", &self.resolution)
            .finish()
    }
}

impl Engine {
    pub fn new(id: EngineId, simulator: impl Simulator + 'static) -> Self {
        Self {
            id,
            data: None,
            simulator: Arc::new(simulator),
            resolution: None,
        }
    }

    pub fn with_data(mut self, data: Spectrum) -> Self {
        self.data = Some(data);
        self
    }

    /// Sets the resolution. Grids are only valid for `dadi`, time steps
    /// only for `moments`.
    pub fn with_resolution(mut self, resolution: Resolution) -> Result<Self> {
        match (self.id, &resolution) {
            (EngineId::Dadi, Resolution::Grid(points)) if !points.is_empty() => {}
            (EngineId::Moments, Resolution::TimeStep(dt)) if *dt > 0.0 && dt.is_finite() => {}
            _ => {
                return Err(OptimizationError::Engine(format!(
                    "Resolution {:?} is not valid for engine '{}'",
                    resolution, self.id
                )))
            }
        }
        self.resolution = Some(resolution);
        Ok(self)
    }

    pub fn id(&self) -> EngineId {
        self.id
    }

    /// Reads observed data in the format this engine consumes.
    pub fn read_data(path: impl AsRef<Path>) -> Result<Spectrum> {
        Spectrum::read_fs(path)
    }

    pub fn data(&self) -> Result<&Spectrum> {
        self.data
            .as_ref()
            .ok_or_else(|| OptimizationError::Engine("Please set data for engine".to_string()))
    }

    /// The configured resolution, or the engine default for the data.
    pub fn resolution(&self) -> Result<Resolution> {
        match &self.resolution {
            Some(resolution) => Ok(resolution.clone()),
            None => Ok(self.id.default_resolution(&self.data()?.sample_sizes())),
        }
    }

    /// Simulates the expected spectrum of `model` at `values`.
    pub fn simulate(&self, model: &Model, values: &[f64]) -> Result<Spectrum> {
        let data = self.data()?;
        let named = model.var2value(values)?;
        let resolution = self.resolution()?;
        let spectrum = self
            .simulator
            .simulate(&named, &data.sample_sizes(), &resolution)?;
        if spectrum.shape() != data.shape() {
            return Err(OptimizationError::Engine(format!(
                "Simulated spectrum has shape {:?}, data has {:?}",
                spectrum.shape(),
                data.shape()
            )));
        }
        Ok(spectrum)
    }

    /// Multinomial log-likelihood of the data under `model` at `values`.
    pub fn evaluate(&self, model: &Model, values: &[f64]) -> Result<f64> {
        let simulated = self.simulate(model, values)?;
        let value = ll_multinom(&simulated, self.data()?)?;
        trace!(engine = %self.id, value, "Evaluated log-likelihood");
        Ok(value)
    }

    /// Optimal mutation-rate scaling of the simulated spectrum.
    pub fn theta(&self, model: &Model, values: &[f64]) -> Result<f64> {
        let simulated = self.simulate(model, values)?;
        optimal_sfs_scaling(&simulated, self.data()?)
    }
}
