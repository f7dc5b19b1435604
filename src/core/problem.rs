//! What the runs optimize.
//!
//! A `Problem` builds the model for a structure and the objective over that
//! model's free variables. `InferenceProblem` fits a structured demographic
//! model to an engine's data, `FunctionProblem` minimizes a plain function
//! over a box.

use crate::caching::CachedObjective;
use crate::engine::Engine;
use crate::error::{OptimizationError, Result};
use crate::model::{bounded_model, Model, ModelBuilder, Structure};
use crate::objective::{BoundedObjective, EngineObjective, ObjectiveFunction};

pub trait Problem: Send + Sync {
    /// The model searched at `structure`, `None` for unstructured problems.
    fn model_for(&self, structure: Option<&Structure>) -> Result<Model>;

    /// The objective over the free variables of `model`.
    fn objective_for<'a>(&'a self, model: &Model) -> Result<Box<dyn ObjectiveFunction + 'a>>;
}

/// Demographic inference: a model builder, an engine holding the observed
/// spectrum, and variables fixed across every structure.
pub struct InferenceProblem {
    engine: Engine,
    builder: Box<dyn ModelBuilder>,
    fixed: Vec<(String, f64)>,
    cached: bool,
}

impl InferenceProblem {
    /// # Errors
    ///
    /// Fails when the engine has no data to fit.
    pub fn new(engine: Engine, builder: impl ModelBuilder + 'static) -> Result<Self> {
        engine.data()?;
        Ok(Self {
            engine,
            builder: Box::new(builder),
            fixed: Vec::new(),
            cached: false,
        })
    }

    /// Fixes `name` to `value` in every model built.
    pub fn with_fixed(mut self, name: impl Into<String>, value: f64) -> Self {
        self.fixed.push((name.into(), value));
        self
    }

    /// Memoizes objective scores within each stage of a run.
    pub fn with_cache(mut self, cached: bool) -> Self {
        self.cached = cached;
        self
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

impl Problem for InferenceProblem {
    fn model_for(&self, structure: Option<&Structure>) -> Result<Model> {
        let structure = structure.ok_or_else(|| {
            OptimizationError::Configuration("Inference needs a model structure".to_string())
        })?;
        let mut model = self.builder.build(structure)?;
        for (name, value) in &self.fixed {
            if model.get_variable(name).is_some() {
                model.fix_variable(name, *value)?;
            }
        }
        Ok(model)
    }

    fn objective_for<'a>(&'a self, model: &Model) -> Result<Box<dyn ObjectiveFunction + 'a>> {
        let objective = EngineObjective::new(&self.engine, model.clone());
        Ok(if self.cached {
            Box::new(CachedObjective::new(objective))
        } else {
            Box::new(objective)
        })
    }
}

/// Minimization of a function over a box.
pub struct FunctionProblem {
    model: Model,
    objective: Box<dyn ObjectiveFunction>,
}

impl FunctionProblem {
    pub fn new(
        objective: impl ObjectiveFunction + 'static,
        lower: &[f64],
        upper: &[f64],
    ) -> Result<Self> {
        Ok(Self {
            model: bounded_model(lower, upper)?,
            objective: Box::new(objective),
        })
    }

    pub fn model(&self) -> &Model {
        &self.model
    }
}

impl Problem for FunctionProblem {
    fn model_for(&self, _structure: Option<&Structure>) -> Result<Model> {
        Ok(self.model.clone())
    }

    fn objective_for<'a>(&'a self, model: &Model) -> Result<Box<dyn ObjectiveFunction + 'a>> {
        let inner: &'a dyn ObjectiveFunction = self.objective.as_ref();
        Ok(Box::new(BoundedObjective::new(
            move |values: &[f64]| inner.evaluate(values),
            model.parameter_space(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineId, Resolution};
    use crate::model::EpochModelBuilder;
    use crate::spectrum::Spectrum;

    fn flat_engine() -> Engine {
        let data = Spectrum::new(vec![6], vec![0.0, 10.0, 5.0, 3.0, 2.0, 0.0]).unwrap();
        Engine::new(
            EngineId::Moments,
            |_: &[(String, f64)], sizes: &[usize], _: &Resolution| {
                let len = sizes[0] + 1;
                Spectrum::new(vec![len], (0..len).map(|i| 1.0 / (i as f64 + 1.0)).collect())
            },
        )
        .with_data(data)
    }

    #[test]
    fn test_function_problem() {
        let problem = FunctionProblem::new(
            |x: &[f64]| -> Result<f64> { Ok(x[0] + x[1]) },
            &[0.0, 0.0],
            &[1.0, 1.0],
        )
        .unwrap();
        let model = problem.model_for(None).unwrap();
        let objective = problem.objective_for(&model).unwrap();
        assert_eq!(objective.evaluate(&[0.5, 2.0]).unwrap(), 1.5);
        assert!(objective.evaluate(&[0.5]).is_err());
    }

    #[test]
    fn test_inference_problem_fixes_variables() {
        let problem = InferenceProblem::new(flat_engine(), EpochModelBuilder::new())
            .unwrap()
            .with_fixed("t0_0", 0.5)
            .with_cache(true);
        assert!(problem.model_for(None).is_err());
        let model = problem
            .model_for(Some(&Structure::new(vec![2]).unwrap()))
            .unwrap();
        assert!(model.is_fixed("t0_0"));
        let space = model.parameter_space();
        let objective = problem.objective_for(&model).unwrap();
        let score = objective.evaluate(&space.defaults()).unwrap();
        assert!(score.is_finite());
        assert!(score >= 0.0);
    }

    #[test]
    fn test_inference_needs_data() {
        let engine = Engine::new(
            EngineId::Dadi,
            |_: &[(String, f64)], _: &[usize], _: &Resolution| -> Result<Spectrum> {
                Err(OptimizationError::Engine("unused".to_string()))
            },
        );
        assert!(InferenceProblem::new(engine, EpochModelBuilder::new()).is_err());
    }
}
