use demoga::{
    core::{Coordinator, InferenceProblem, Settings},
    engine::{Engine, EngineId, Resolution},
    error::{OptimizationError, Result},
    ga::GaOptions,
    model::{EpochModelBuilder, Model, ModelBuilder, Structure},
    objective::{EngineObjective, ObjectiveFunction},
    spectrum::Spectrum,
    variable::Variable,
};

/// Expected spectrum of a population of relative size `nu`: `nu / i`.
fn neutral(values: &[(String, f64)], sample_sizes: &[usize], _: &Resolution) -> Result<Spectrum> {
    let nu = values
        .iter()
        .find(|(name, _)| name.starts_with("nu"))
        .map(|(_, v)| *v)
        .ok_or_else(|| OptimizationError::Model("no size variable".to_string()))?;
    let n = sample_sizes[0];
    let shape = vec![n + 1];
    let data = (0..=n)
        .map(|i| if i == 0 || i == n { 0.0 } else { nu / i as f64 })
        .collect();
    Spectrum::new(shape, data)
}

fn fs_file(name: &str, contents: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("{}-{}.fs", name, std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_read_data_and_default_resolution() {
    let path = fs_file(
        "demoga-engine",
        "# observed\n6 unfolded \"YRI\"\n0 120 61 40 29 0\n1 0 0 0 0 1\n",
    );
    let data = Engine::read_data(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(data.shape(), &[6]);
    assert_eq!(data.sample_sizes(), vec![5]);
    assert_eq!(data.pop_ids(), Some(&["YRI".to_string()][..]));

    let dadi = Engine::new(EngineId::Dadi, neutral).with_data(data.clone());
    assert_eq!(dadi.resolution().unwrap(), Resolution::Grid(vec![15, 25, 35]));
    let moments = Engine::new("moments".parse().unwrap(), neutral).with_data(data);
    assert_eq!(moments.resolution().unwrap(), Resolution::TimeStep(0.01));
}

#[test]
fn test_engine_objective_is_negative_log_likelihood() {
    let data = neutral(&[("nu".to_string(), 50.0)], &[8], &Resolution::TimeStep(0.01))
        .unwrap()
        .mask_corners();
    let engine = Engine::new(EngineId::Moments, neutral).with_data(data);
    let mut model = Model::new();
    model
        .add_variable(Variable::population_size("nu"))
        .unwrap();
    let objective = EngineObjective::new(&engine, model.clone());
    let score = objective.evaluate(&[1.0]).unwrap();
    assert_eq!(score, -engine.evaluate(&model, &[1.0]).unwrap());
    assert!(objective.evaluate(&[1.0, 2.0]).is_err());
}

#[test]
fn test_fixed_variables_are_not_searched() {
    let builder = EpochModelBuilder::new();
    let mut model = builder.build(&Structure::new(vec![2]).unwrap()).unwrap();
    let free_before = model.parameter_space().len();
    model.fix_variable("t0_1", 0.3).unwrap();
    assert_eq!(model.parameter_space().len(), free_before - 1);
    assert!(model.fix_variable("t0_1", 99.0).is_err());
    let text = model
        .string_repr(&model.parameter_space().defaults())
        .unwrap();
    assert!(text.contains("t0_1=0.3"));
}

#[test]
fn test_fit_single_epoch_through_coordinator() {
    let observed = neutral(&[("nu".to_string(), 40.0)], &[10], &Resolution::TimeStep(0.01))
        .unwrap()
        .mask_corners();
    let data = Spectrum::new(
        vec![11],
        observed.data().iter().map(|v| v.round()).collect(),
    )
    .unwrap()
    .mask_corners();
    let engine = Engine::new(EngineId::Dadi, neutral).with_data(data);
    let problem = InferenceProblem::new(engine, EpochModelBuilder::new())
        .unwrap()
        .with_fixed("t0_0", 1.0);
    let settings = Settings::builder()
        .number_of_repeats(2)
        .number_of_processes(2)
        .initial_structure(Structure::new(vec![1]).unwrap())
        .ga(GaOptions::builder().max_generations(30).build().unwrap())
        .seed(4)
        .build()
        .unwrap();
    let outcome = Coordinator::new(settings, problem).unwrap().run().unwrap();
    assert_eq!(outcome.best.x().len(), 1);
    assert!(outcome.best.y().is_finite());
    assert!(outcome.results.iter().all(|(_, r)| r.y() >= outcome.best.y()));
}
