//! # Objective functions
//!
//! The optimizer minimizes an `ObjectiveFunction`: a pure map from a
//! parameter vector to a score, lower being better. Any
//! `Fn(&[f64]) -> Result<f64>` closure is an objective.
//!
//! `EngineObjective` adapts a model and an engine into the negative
//! multinomial log-likelihood of the engine's data.
//!
//! ## Example
//!
//! ```rust
//! use demoga::objective::{FnObjective, ObjectiveFunction};
//!
//! let sphere = FnObjective::new(|x: &[f64]| x.iter().map(|v| v * v).sum());
//! assert_eq!(sphere.evaluate(&[1.0, 2.0]).unwrap(), 5.0);
//! ```

use crate::engine::Engine;
use crate::error::Result;
use crate::model::Model;
use crate::variable::ParameterSpace;

/// A function to minimize.
///
/// Implementations must be deterministic for a fixed configuration and safe
/// to call from several threads at once.
pub trait ObjectiveFunction: Send + Sync {
    fn evaluate(&self, values: &[f64]) -> Result<f64>;
}

impl<F> ObjectiveFunction for F
where
    F: Fn(&[f64]) -> Result<f64> + Send + Sync,
{
    fn evaluate(&self, values: &[f64]) -> Result<f64> {
        self(values)
    }
}

/// Wraps an infallible function.
#[derive(Debug, Clone)]
pub struct FnObjective<F> {
    function: F,
}

impl<F> FnObjective<F>
where
    F: Fn(&[f64]) -> f64 + Send + Sync,
{
    pub fn new(function: F) -> Self {
        Self { function }
    }
}

impl<F> ObjectiveFunction for FnObjective<F>
where
    F: Fn(&[f64]) -> f64 + Send + Sync,
{
    fn evaluate(&self, values: &[f64]) -> Result<f64> {
        Ok((self.function)(values))
    }
}

/// Projects values into a parameter space before evaluating them.
#[derive(Debug, Clone)]
pub struct BoundedObjective<O> {
    inner: O,
    space: ParameterSpace,
}

impl<O: ObjectiveFunction> BoundedObjective<O> {
    pub fn new(inner: O, space: ParameterSpace) -> Self {
        Self { inner, space }
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }
}

impl<O: ObjectiveFunction> ObjectiveFunction for BoundedObjective<O> {
    fn evaluate(&self, values: &[f64]) -> Result<f64> {
        self.space.check_len(values)?;
        self.inner.evaluate(&self.space.clamped(values))
    }
}

/// Negative log-likelihood of the engine's data under a model.
#[derive(Debug, Clone)]
pub struct EngineObjective<'a> {
    engine: &'a Engine,
    model: Model,
}

impl<'a> EngineObjective<'a> {
    pub fn new(engine: &'a Engine, model: Model) -> Self {
        Self { engine, model }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }
}

impl ObjectiveFunction for EngineObjective<'_> {
    fn evaluate(&self, values: &[f64]) -> Result<f64> {
        Ok(-self.engine.evaluate(&self.model, values)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineId, Resolution};
    use crate::error::OptimizationError;
    use crate::spectrum::Spectrum;
    use crate::variable::Variable;

    #[test]
    fn test_closure_objective() {
        let failing = |x: &[f64]| -> Result<f64> {
            if x[0] < 0.0 {
                Err(OptimizationError::Evaluation("negative".to_string()))
            } else {
                Ok(x[0])
            }
        };
        assert_eq!(failing.evaluate(&[2.0]).unwrap(), 2.0);
        assert!(failing.evaluate(&[-1.0]).is_err());
    }

    #[test]
    fn test_bounded_objective_clamps() {
        let space = ParameterSpace::from_bounds(&[0.0], &[1.0]).unwrap();
        let bounded = BoundedObjective::new(FnObjective::new(|x: &[f64]| x[0]), space);
        assert_eq!(bounded.evaluate(&[5.0]).unwrap(), 1.0);
        assert!(bounded.evaluate(&[0.5, 0.5]).is_err());
    }

    #[test]
    fn test_engine_objective_is_negative_likelihood() {
        let simulator = |values: &[(String, f64)], ns: &[usize], _: &Resolution| {
            let nu = values[0].1;
            Spectrum::new(vec![ns[0] + 1], vec![0.0, nu, 1.0, 0.0])
        };
        let data = Spectrum::new(vec![4], vec![0.0, 4.0, 2.0, 0.0])
            .unwrap()
            .mask_corners();
        let engine = Engine::new(EngineId::Dadi, simulator).with_data(data);
        let mut model = Model::new();
        model
            .add_variable(Variable::continuous("nu", 0.1, 10.0).unwrap())
            .unwrap();
        let objective = EngineObjective::new(&engine, model.clone());
        let value = objective.evaluate(&[2.0]).unwrap();
        assert_eq!(value, -engine.evaluate(&model, &[2.0]).unwrap());
        assert!(objective.evaluate(&[2.0]).unwrap() < objective.evaluate(&[5.0]).unwrap());
    }
}
