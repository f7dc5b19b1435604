//! # Models and structures
//!
//! A `Model` is an ordered list of variables, some of which may be fixed to a
//! constant. The unfixed variables define the `ParameterSpace` the optimizer
//! searches.
//!
//! A `Structure` counts epochs per time interval of a demographic history.
//! Structured models are built by a `ModelBuilder`; growing the structure
//! builds a new, larger model and vectors found under the old one are carried
//! over by variable name with `Model::embed`.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::error::{OptimizationError, Result};
use crate::rng::RandomNumberGenerator;
use crate::variable::{ParameterSpace, Variable};

/// Number of epochs in each time interval.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Structure(Vec<usize>);

impl Structure {
    /// Creates a structure. Every interval must have at least one epoch.
    pub fn new(epochs: Vec<usize>) -> Result<Self> {
        if epochs.is_empty() {
            return Err(OptimizationError::Configuration(
                "Structure needs at least one interval".to_string(),
            ));
        }
        if epochs.iter().any(|&e| e == 0) {
            return Err(OptimizationError::Configuration(format!(
                "Every interval of a structure needs an epoch, got {:?}",
                epochs
            )));
        }
        Ok(Self(epochs))
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn intervals(&self) -> usize {
        self.0.len()
    }

    pub fn total_epochs(&self) -> usize {
        self.0.iter().sum()
    }

    /// Checks that `last` has the same intervals and is nowhere smaller.
    pub fn check_reachable(&self, last: &Structure) -> Result<()> {
        if self.0.len() != last.0.len() {
            return Err(OptimizationError::Configuration(format!(
                "Structures {} and {} have different numbers of intervals",
                self, last
            )));
        }
        if self.0.iter().zip(&last.0).any(|(a, b)| a > b) {
            return Err(OptimizationError::Configuration(format!(
                "Initial structure {} exceeds final structure {}",
                self, last
            )));
        }
        Ok(())
    }

    /// `true` when some interval is still below `last`.
    pub fn can_grow_towards(&self, last: &Structure) -> bool {
        self.0.iter().zip(&last.0).any(|(a, b)| a < b)
    }

    /// Adds one epoch to a randomly chosen interval that is still below
    /// `last`. Returns `None` when the final structure is reached.
    pub fn increment(&self, last: &Structure, rng: &mut RandomNumberGenerator) -> Option<Self> {
        let candidates: Vec<usize> = self
            .0
            .iter()
            .zip(&last.0)
            .enumerate()
            .filter(|(_, (a, b))| a < b)
            .map(|(i, _)| i)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let chosen = candidates[rng.index(candidates.len())];
        let mut epochs = self.0.clone();
        epochs[chosen] += 1;
        Some(Self(epochs))
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "({})", parts.join(","))
    }
}

/// Variables of a demographic model plus the values of its fixed variables.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    variables: Vec<Variable>,
    fixed: HashMap<String, f64>,
    structure: Option<Structure>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_structure(mut self, structure: Structure) -> Self {
        self.structure = Some(structure);
        self
    }

    pub fn structure(&self) -> Option<&Structure> {
        self.structure.as_ref()
    }

    /// Adds a variable. Names must be unique within a model.
    pub fn add_variable(&mut self, variable: Variable) -> Result<()> {
        if self.get_variable(variable.name()).is_some() {
            return Err(OptimizationError::Model(format!(
                "Variable '{}' is already in the model",
                variable.name()
            )));
        }
        self.variables.push(variable);
        Ok(())
    }

    pub fn add_variables(&mut self, variables: impl IntoIterator<Item = Variable>) -> Result<()> {
        for variable in variables {
            self.add_variable(variable)?;
        }
        Ok(())
    }

    /// All variables, fixed ones included.
    pub fn all_variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Variables the optimizer searches over, in parameter-vector order.
    pub fn variables(&self) -> Vec<&Variable> {
        self.variables
            .iter()
            .filter(|v| !self.fixed.contains_key(v.name()))
            .collect()
    }

    pub fn get_variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name() == name)
    }

    pub fn is_fixed(&self, name: &str) -> bool {
        self.fixed.contains_key(name)
    }

    /// Fixes a variable to `value`, removing it from the parameter space.
    pub fn fix_variable(&mut self, name: &str, value: f64) -> Result<()> {
        let variable = self
            .get_variable(name)
            .ok_or_else(|| OptimizationError::Model(format!("Unknown variable '{}'", name)))?;
        if !variable.domain().contains(value) {
            return Err(OptimizationError::Model(format!(
                "Value {} is outside the domain of '{}'",
                value, name
            )));
        }
        self.fixed.insert(name.to_string(), value);
        Ok(())
    }

    pub fn unfix_variable(&mut self, name: &str) -> Result<()> {
        self.fixed
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| OptimizationError::Model(format!("Variable '{}' is not fixed", name)))
    }

    /// Unfixes `name` if it is fixed; does nothing otherwise.
    pub fn unfix_if_fixed(&mut self, name: &str) {
        self.fixed.remove(name);
    }

    pub fn parameter_space(&self) -> ParameterSpace {
        let space = ParameterSpace::new(self.variables().into_iter().cloned().collect());
        match &self.structure {
            Some(structure) => space.with_structure(structure.clone()),
            None => space,
        }
    }

    /// Pairs every variable name with its value. Fixed variables take their
    /// fixed value, the others consume `values` in order.
    pub fn var2value(&self, values: &[f64]) -> Result<Vec<(String, f64)>> {
        let expected = self.variables.len() - self.fixed.len();
        if values.len() != expected {
            return Err(OptimizationError::Model(format!(
                "Expected {} values, got {}",
                expected,
                values.len()
            )));
        }
        let mut free = values.iter();
        let mut named = Vec::with_capacity(self.variables.len());
        for variable in &self.variables {
            let value = match self.fixed.get(variable.name()) {
                Some(&fixed) => fixed,
                None => match free.next() {
                    Some(&value) => value,
                    None => break,
                },
            };
            named.push((variable.name().to_string(), value));
        }
        Ok(named)
    }

    /// Formats `values` as `name=value, ...`.
    pub fn string_repr(&self, values: &[f64]) -> Result<String> {
        let named = self.var2value(values)?;
        Ok(named
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(", "))
    }

    /// Projects `values` (a vector of this model) into the layout of
    /// `target`. Matching names carry their value over, new variables take
    /// their defaults, and the result is clamped into `target`'s domains.
    pub fn embed(&self, values: &[f64], target: &Model) -> Result<Vec<f64>> {
        let named: HashMap<String, f64> = self.var2value(values)?.into_iter().collect();
        let mut carried = 0usize;
        let embedded: Vec<f64> = target
            .variables()
            .into_iter()
            .map(|variable| match named.get(variable.name()) {
                Some(&value) => {
                    carried += 1;
                    variable.domain().clamp(value)
                }
                None => variable.default_value(),
            })
            .collect();
        debug!(
            carried,
            total = embedded.len(),
            "Embedded parameter vector into a new model"
        );
        Ok(embedded)
    }
}

/// Builds the model for a given structure.
pub trait ModelBuilder: Send + Sync {
    fn build(&self, structure: &Structure) -> Result<Model>;
}

impl<F> ModelBuilder for F
where
    F: Fn(&Structure) -> Result<Model> + Send + Sync,
{
    fn build(&self, structure: &Structure) -> Result<Model> {
        self(structure)
    }
}

/// Lays out a piecewise-constant epoch model.
///
/// Interval `i` of the structure describes `i + 1` populations, a new one
/// splitting off at each interval boundary. Every epoch `j` of interval `i`
/// gets a duration `t{i}_{j}` and one size `nu{i}_{j}_{p}` per population.
/// Dynamics `dyn{i}_{j}_{p}` and migration rates `m{i}_{j}_{p}{q}` are added
/// when enabled. Each boundary between intervals gets a split fraction `s{i}`.
#[derive(Debug, Clone, Default)]
pub struct EpochModelBuilder {
    dynamics: bool,
    migrations: bool,
}

impl EpochModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dynamics(mut self, enabled: bool) -> Self {
        self.dynamics = enabled;
        self
    }

    pub fn with_migrations(mut self, enabled: bool) -> Self {
        self.migrations = enabled;
        self
    }
}

impl ModelBuilder for EpochModelBuilder {
    fn build(&self, structure: &Structure) -> Result<Model> {
        let mut model = Model::new().with_structure(structure.clone());
        for (interval, &epochs) in structure.as_slice().iter().enumerate() {
            let populations = interval + 1;
            if interval > 0 {
                let split = Variable::continuous(format!("s{}", interval), 0.01, 0.99)?
                    .with_default(0.5);
                model.add_variable(split)?;
            }
            for epoch in 0..epochs {
                model.add_variable(Variable::time(format!("t{}_{}", interval, epoch)))?;
                for p in 0..populations {
                    model.add_variable(Variable::population_size(format!(
                        "nu{}_{}_{}",
                        interval, epoch, p
                    )))?;
                    if self.dynamics {
                        model.add_variable(Variable::dynamics(format!(
                            "dyn{}_{}_{}",
                            interval, epoch, p
                        )))?;
                    }
                }
                if self.migrations && populations > 1 {
                    for p in 0..populations {
                        for q in (0..populations).filter(|&q| q != p) {
                            model.add_variable(Variable::migration(format!(
                                "m{}_{}_{}{}",
                                interval, epoch, p, q
                            )))?;
                        }
                    }
                }
            }
        }
        Ok(model)
    }
}

/// Builds a model around a single continuous variable per bound pair.
pub fn bounded_model(lower: &[f64], upper: &[f64]) -> Result<Model> {
    let space = ParameterSpace::from_bounds(lower, upper)?;
    let mut model = Model::new();
    model.add_variables(space.variables().iter().cloned())?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_epoch_model() -> Model {
        EpochModelBuilder::new()
            .build(&Structure::new(vec![2]).unwrap())
            .unwrap()
    }

    #[test]
    fn test_structure_validation() {
        assert!(Structure::new(vec![]).is_err());
        assert!(Structure::new(vec![1, 0]).is_err());
        let s = Structure::new(vec![1, 2]).unwrap();
        assert_eq!(s.total_epochs(), 3);
        assert_eq!(s.to_string(), "(1,2)");
    }

    #[test]
    fn test_structure_increment_reaches_final() {
        let mut rng = RandomNumberGenerator::from_seed(1);
        let last = Structure::new(vec![2, 3]).unwrap();
        let mut current = Structure::new(vec![1, 1]).unwrap();
        current.check_reachable(&last).unwrap();
        let mut steps = 0;
        while let Some(next) = current.increment(&last, &mut rng) {
            assert_eq!(next.total_epochs(), current.total_epochs() + 1);
            current = next;
            steps += 1;
        }
        assert_eq!(current, last);
        assert_eq!(steps, 3);
        assert!(!current.can_grow_towards(&last));
    }

    #[test]
    fn test_unreachable_structure() {
        let start = Structure::new(vec![3]).unwrap();
        assert!(start.check_reachable(&Structure::new(vec![2]).unwrap()).is_err());
        assert!(start
            .check_reachable(&Structure::new(vec![3, 1]).unwrap())
            .is_err());
    }

    #[test]
    fn test_fix_and_unfix() {
        let mut model = two_epoch_model();
        assert_eq!(model.variables().len(), 4);
        model.fix_variable("t0_0", 0.5).unwrap();
        assert_eq!(model.variables().len(), 3);
        assert!(model.fix_variable("t0_0", 50.0).is_err());
        assert!(model.fix_variable("missing", 1.0).is_err());

        let named = model.var2value(&[2.0, 0.1, 3.0]).unwrap();
        assert_eq!(named[0], ("t0_0".to_string(), 0.5));
        assert_eq!(named[1], ("nu0_0_0".to_string(), 2.0));
        assert_eq!(
            model.string_repr(&[2.0, 0.1, 3.0]).unwrap(),
            "t0_0=0.5, nu0_0_0=2, t0_1=0.1, nu0_1_0=3"
        );

        model.unfix_variable("t0_0").unwrap();
        assert!(model.unfix_variable("t0_0").is_err());
        model.unfix_if_fixed("t0_0");
        assert_eq!(model.variables().len(), 4);
    }

    #[test]
    fn test_duplicate_variable_rejected() {
        let mut model = Model::new();
        model.add_variable(Variable::time("t")).unwrap();
        assert!(model.add_variable(Variable::time("t")).is_err());
    }

    #[test]
    fn test_embed_by_name() {
        let builder = EpochModelBuilder::new().with_dynamics(true);
        let small = builder.build(&Structure::new(vec![1]).unwrap()).unwrap();
        let large = builder.build(&Structure::new(vec![2]).unwrap()).unwrap();
        let values = vec![1.5, 3.0, 2.0];
        let embedded = small.embed(&values, &large).unwrap();
        assert_eq!(embedded.len(), large.variables().len());
        assert_eq!(&embedded[..3], &values[..]);
        let defaults: Vec<f64> = large.variables()[3..]
            .iter()
            .map(|v| v.default_value())
            .collect();
        assert_eq!(&embedded[3..], &defaults[..]);
    }

    #[test]
    fn test_builder_with_split_and_migrations() {
        let model = EpochModelBuilder::new()
            .with_migrations(true)
            .build(&Structure::new(vec![1, 1]).unwrap())
            .unwrap();
        let names: Vec<&str> = model.variables().iter().map(|v| v.name()).collect();
        assert_eq!(
            names,
            vec!["t0_0", "nu0_0_0", "s1", "t1_0", "nu1_0_0", "nu1_0_1", "m1_0_01", "m1_0_10"]
        );
        assert_eq!(model.parameter_space().structure().unwrap().intervals(), 2);
    }
}
