//! # Variables and parameter spaces
//!
//! A `Variable` is a named scalar parameter of a demographic model together
//! with its domain. Values are never stored on the variable: they travel in
//! plain `Vec<f64>` parameter vectors whose order matches the variables of a
//! `ParameterSpace`.
//!
//! Every operator that produces a new parameter vector (initial perturbation,
//! mutation, crossover, local search) projects its output back into the domain
//! through `ParameterSpace::clamp`, so the objective never sees an
//! out-of-bounds vector.
//!
//! ## Example
//!
//! ```rust
//! use demoga::variable::ParameterSpace;
//!
//! let space = ParameterSpace::from_bounds(&[0.0, 0.0], &[1.0, 1.0]).unwrap();
//! let clamped = space.clamped(&[-0.5, 3.0]);
//! assert_eq!(clamped, vec![0.0, 1.0]);
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{OptimizationError, Result};
use crate::model::Structure;
use crate::rng::RandomNumberGenerator;

/// The set of values a variable may take.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Domain {
    /// A closed interval `[lower, upper]`.
    Continuous { lower: f64, upper: f64 },
    /// A finite set of admissible values, e.g. dynamics codes.
    Discrete { values: Vec<f64> },
}

impl Domain {
    /// Creates a continuous domain, validating that the bounds are finite and ordered.
    pub fn continuous(lower: f64, upper: f64) -> Result<Self> {
        if !lower.is_finite() || !upper.is_finite() {
            return Err(OptimizationError::InvalidNumericValue(format!(
                "Domain bounds must be finite, got [{}, {}]",
                lower, upper
            )));
        }
        if lower > upper {
            return Err(OptimizationError::Configuration(format!(
                "Lower bound {} is greater than upper bound {}",
                lower, upper
            )));
        }
        Ok(Domain::Continuous { lower, upper })
    }

    /// Creates a discrete domain from a non-empty list of finite values.
    pub fn discrete(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(OptimizationError::Configuration(
                "Discrete domain needs at least one value".to_string(),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(OptimizationError::InvalidNumericValue(
                "Discrete domain values must be finite".to_string(),
            ));
        }
        Ok(Domain::Discrete { values })
    }

    pub fn lower(&self) -> f64 {
        match self {
            Domain::Continuous { lower, .. } => *lower,
            Domain::Discrete { values } => values.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }

    pub fn upper(&self) -> f64 {
        match self {
            Domain::Continuous { upper, .. } => *upper,
            Domain::Discrete { values } => {
                values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
            }
        }
    }

    /// Distance between the lowest and the highest admissible value.
    pub fn width(&self) -> f64 {
        self.upper() - self.lower()
    }

    pub fn is_discrete(&self) -> bool {
        matches!(self, Domain::Discrete { .. })
    }

    pub fn contains(&self, value: f64) -> bool {
        match self {
            Domain::Continuous { lower, upper } => value >= *lower && value <= *upper,
            Domain::Discrete { values } => values.iter().any(|v| *v == value),
        }
    }

    /// Projects any value, including NaN and infinities, into the domain.
    ///
    /// Continuous domains clamp to the nearest bound. Discrete domains snap to
    /// the nearest admissible value, the first one winning ties. NaN maps to
    /// the lower bound or the first discrete value.
    pub fn clamp(&self, value: f64) -> f64 {
        match self {
            Domain::Continuous { lower, upper } => {
                if value.is_nan() {
                    *lower
                } else {
                    value.clamp(*lower, *upper)
                }
            }
            Domain::Discrete { values } => {
                if value.is_nan() {
                    return values[0];
                }
                let mut best = values[0];
                let mut best_distance = (best - value).abs();
                for &candidate in &values[1..] {
                    let distance = (candidate - value).abs();
                    if distance < best_distance {
                        best = candidate;
                        best_distance = distance;
                    }
                }
                best
            }
        }
    }

    /// Draws a value uniformly from the domain.
    pub fn sample(&self, rng: &mut RandomNumberGenerator) -> f64 {
        match self {
            Domain::Continuous { lower, upper } => rng.uniform(*lower, *upper),
            Domain::Discrete { values } => values[rng.index(values.len())],
        }
    }
}

/// Population size change over an epoch.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dynamics {
    /// Size jumps to the final value at the start of the epoch.
    Sudden,
    /// Size changes linearly from the initial to the final value.
    Linear,
    /// Size changes exponentially from the initial to the final value.
    Exponential,
}

impl Dynamics {
    pub const ALL: [Dynamics; 3] = [Dynamics::Sudden, Dynamics::Linear, Dynamics::Exponential];

    /// Numeric code used inside parameter vectors.
    pub fn code(self) -> f64 {
        match self {
            Dynamics::Sudden => 0.0,
            Dynamics::Linear => 1.0,
            Dynamics::Exponential => 2.0,
        }
    }

    pub fn from_code(code: f64) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.code() == code)
    }

    pub fn label(self) -> &'static str {
        match self {
            Dynamics::Sudden => "Sud",
            Dynamics::Linear => "Lin",
            Dynamics::Exponential => "Exp",
        }
    }

    /// The discrete domain of all dynamics codes.
    pub fn domain() -> Domain {
        Domain::Discrete {
            values: Self::ALL.iter().map(|d| d.code()).collect(),
        }
    }

    /// Population size at time `t` of an epoch of length `duration` that
    /// starts at size `initial` and ends at size `last`.
    pub fn size_at(self, initial: f64, last: f64, duration: f64, t: f64) -> f64 {
        if duration <= 0.0 {
            return last;
        }
        let fraction = (t / duration).clamp(0.0, 1.0);
        match self {
            Dynamics::Sudden => last,
            Dynamics::Linear => initial + (last - initial) * fraction,
            Dynamics::Exponential => initial * (last / initial).powf(fraction),
        }
    }
}

impl fmt::Display for Dynamics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Dynamics {
    type Err = OptimizationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| OptimizationError::Model(format!("Unknown dynamics '{}'", s)))
    }
}

/// The family a variable belongs to. It fixes the default domain and the
/// value a freshly inserted variable starts from.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    PopulationSize,
    Time,
    Migration,
    Selection,
    Dynamics,
    Generic,
}

impl VariableKind {
    pub fn default_domain(self) -> Domain {
        match self {
            VariableKind::PopulationSize => Domain::Continuous {
                lower: 1e-2,
                upper: 100.0,
            },
            VariableKind::Time => Domain::Continuous {
                lower: 0.0,
                upper: 5.0,
            },
            VariableKind::Migration | VariableKind::Selection => Domain::Continuous {
                lower: 0.0,
                upper: 10.0,
            },
            VariableKind::Dynamics => Dynamics::domain(),
            VariableKind::Generic => Domain::Continuous {
                lower: 0.0,
                upper: 1.0,
            },
        }
    }

    /// Value that leaves the model unchanged when the variable is added.
    pub fn neutral_value(self, domain: &Domain) -> f64 {
        let raw = match self {
            VariableKind::PopulationSize => 1.0,
            VariableKind::Time | VariableKind::Migration | VariableKind::Selection => 0.0,
            VariableKind::Dynamics => Dynamics::Sudden.code(),
            VariableKind::Generic => (domain.lower() + domain.upper()) / 2.0,
        };
        domain.clamp(raw)
    }
}

/// A named parameter with a domain and a default value.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    kind: VariableKind,
    domain: Domain,
    default: f64,
}

impl Variable {
    /// Creates a variable of the given kind with its default domain.
    pub fn new(name: impl Into<String>, kind: VariableKind) -> Self {
        let domain = kind.default_domain();
        let default = kind.neutral_value(&domain);
        Self {
            name: name.into(),
            kind,
            domain,
            default,
        }
    }

    pub fn population_size(name: impl Into<String>) -> Self {
        Self::new(name, VariableKind::PopulationSize)
    }

    pub fn time(name: impl Into<String>) -> Self {
        Self::new(name, VariableKind::Time)
    }

    pub fn migration(name: impl Into<String>) -> Self {
        Self::new(name, VariableKind::Migration)
    }

    pub fn selection(name: impl Into<String>) -> Self {
        Self::new(name, VariableKind::Selection)
    }

    pub fn dynamics(name: impl Into<String>) -> Self {
        Self::new(name, VariableKind::Dynamics)
    }

    /// Creates a generic continuous variable on `[lower, upper]`.
    pub fn continuous(name: impl Into<String>, lower: f64, upper: f64) -> Result<Self> {
        Self::new(name, VariableKind::Generic).with_domain(Domain::continuous(lower, upper)?)
    }

    /// Creates a generic discrete variable.
    pub fn discrete(name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        Self::new(name, VariableKind::Generic).with_domain(Domain::discrete(values)?)
    }

    /// Replaces the domain. The default value is re-projected into it.
    pub fn with_domain(mut self, domain: Domain) -> Result<Self> {
        if let Domain::Discrete { values } = &domain {
            if values.is_empty() {
                return Err(OptimizationError::Configuration(format!(
                    "Variable '{}' has an empty domain",
                    self.name
                )));
            }
        }
        self.default = self.kind.neutral_value(&domain);
        self.domain = domain;
        Ok(self)
    }

    /// Replaces the default value, projected into the domain.
    pub fn with_default(mut self, default: f64) -> Self {
        self.default = self.domain.clamp(default);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn default_value(&self) -> f64 {
        self.default
    }

    /// Multiplies `value` by `2^(fold * u)` with `u ~ U(-1, 1)` and clamps.
    /// Discrete values are resampled with probability one half.
    pub fn perturb(&self, value: f64, fold: f64, rng: &mut RandomNumberGenerator) -> f64 {
        if self.domain.is_discrete() {
            return if rng.chance(0.5) {
                self.domain.sample(rng)
            } else {
                self.domain.clamp(value)
            };
        }
        let factor = 2f64.powf(fold * rng.uniform(-1.0, 1.0));
        self.domain.clamp(value * factor)
    }

    /// Adds a Gaussian step of `strength * width` and clamps. Discrete values
    /// are resampled.
    pub fn mutate(&self, value: f64, strength: f64, rng: &mut RandomNumberGenerator) -> f64 {
        if self.domain.is_discrete() {
            return self.domain.sample(rng);
        }
        let step = strength * self.domain.width() * rng.normal();
        self.domain.clamp(value + step)
    }
}

/// Ordered variables defining the layout of parameter vectors.
///
/// A space optionally carries the model structure it was built for. Vectors
/// produced under one structure are only meaningful in spaces of the same
/// structure.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpace {
    variables: Vec<Variable>,
    structure: Option<Structure>,
}

impl ParameterSpace {
    pub fn new(variables: Vec<Variable>) -> Self {
        Self {
            variables,
            structure: None,
        }
    }

    /// Builds a space of generic continuous variables `x0, x1, ...`.
    pub fn from_bounds(lower: &[f64], upper: &[f64]) -> Result<Self> {
        if lower.len() != upper.len() {
            return Err(OptimizationError::Configuration(format!(
                "Lower bounds ({}) and upper bounds ({}) differ in length",
                lower.len(),
                upper.len()
            )));
        }
        let variables = lower
            .iter()
            .zip(upper)
            .enumerate()
            .map(|(i, (&lo, &hi))| Variable::continuous(format!("x{}", i), lo, hi))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(variables))
    }

    pub fn with_structure(mut self, structure: Structure) -> Self {
        self.structure = Some(structure);
        self
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn structure(&self) -> Option<&Structure> {
        self.structure.as_ref()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name()).collect()
    }

    pub fn lower_bounds(&self) -> Vec<f64> {
        self.variables.iter().map(|v| v.domain().lower()).collect()
    }

    pub fn upper_bounds(&self) -> Vec<f64> {
        self.variables.iter().map(|v| v.domain().upper()).collect()
    }

    pub fn defaults(&self) -> Vec<f64> {
        self.variables.iter().map(|v| v.default_value()).collect()
    }

    /// Fails when `values` does not have one entry per variable.
    pub fn check_len(&self, values: &[f64]) -> Result<()> {
        if values.len() != self.variables.len() {
            return Err(OptimizationError::Model(format!(
                "Expected {} values, got {}",
                self.variables.len(),
                values.len()
            )));
        }
        Ok(())
    }

    pub fn contains(&self, values: &[f64]) -> bool {
        values.len() == self.variables.len()
            && self
                .variables
                .iter()
                .zip(values)
                .all(|(var, &value)| var.domain().contains(value))
    }

    /// Projects every component into its variable's domain, in place.
    pub fn clamp(&self, values: &mut [f64]) {
        for (var, value) in self.variables.iter().zip(values.iter_mut()) {
            *value = var.domain().clamp(*value);
        }
    }

    pub fn clamped(&self, values: &[f64]) -> Vec<f64> {
        let mut values = values.to_vec();
        self.clamp(&mut values);
        values
    }

    /// Draws a vector uniformly within the bounds.
    pub fn sample(&self, rng: &mut RandomNumberGenerator) -> Vec<f64> {
        self.variables.iter().map(|v| v.domain().sample(rng)).collect()
    }

    /// Perturbs every component of `values` by up to `fold` (see `Variable::perturb`).
    pub fn perturb(&self, values: &[f64], fold: f64, rng: &mut RandomNumberGenerator) -> Vec<f64> {
        self.variables
            .iter()
            .zip(values)
            .map(|(var, &value)| var.perturb(value, fold, rng))
            .collect()
    }
}
