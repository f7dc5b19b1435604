use std::time::Duration;

use demoga::{
    core::{Coordinator, InferenceProblem, Problem, Settings},
    engine::{Engine, EngineId, Resolution},
    error::Result,
    ga::GaOptions,
    model::{EpochModelBuilder, ModelBuilder, Structure},
    population::{Individual, Population},
    rng::RandomNumberGenerator,
    spectrum::Spectrum,
};

/// A smooth toy simulator: sizes raise the low-frequency classes, times the
/// high-frequency ones.
fn toy_simulator(
    values: &[(String, f64)],
    sample_sizes: &[usize],
    _resolution: &Resolution,
) -> Result<Spectrum> {
    let n = sample_sizes[0];
    let sizes: f64 = values
        .iter()
        .filter(|(name, _)| name.starts_with("nu"))
        .map(|(_, v)| v)
        .sum();
    let times: f64 = values
        .iter()
        .filter(|(name, _)| name.starts_with('t'))
        .map(|(_, v)| v)
        .sum();
    let data = (0..=n)
        .map(|i| {
            if i == 0 || i == n {
                0.0
            } else {
                let x = i as f64 / n as f64;
                sizes / i as f64 + times * x * x + 1e-3
            }
        })
        .collect();
    Ok(Spectrum::new(vec![n + 1], data)?.mask_corners())
}

fn observed() -> Spectrum {
    let truth = vec![
        ("t0_0".to_string(), 0.5),
        ("nu0_0_0".to_string(), 2.0),
        ("t0_1".to_string(), 1.0),
        ("nu0_1_0".to_string(), 0.5),
    ];
    let expected = toy_simulator(&truth, &[10], &Resolution::TimeStep(0.01)).unwrap();
    let counts = expected.data().iter().map(|v| (v * 1000.0).round()).collect();
    Spectrum::new(vec![11], counts).unwrap().mask_corners()
}

#[test]
fn test_structure_increments_one_epoch_at_a_time() {
    let last = Structure::new(vec![2, 3]).unwrap();
    let mut current = Structure::new(vec![1, 1]).unwrap();
    let mut rng = RandomNumberGenerator::from_seed(6);
    let mut steps = 0;
    while let Some(next) = current.increment(&last, &mut rng) {
        assert_eq!(next.total_epochs(), current.total_epochs() + 1);
        current = next;
        steps += 1;
    }
    assert_eq!(steps, 3);
    assert_eq!(current, last);
}

#[test]
fn test_population_is_carried_into_larger_model() {
    let builder = EpochModelBuilder::new().with_dynamics(true);
    let small = builder.build(&Structure::new(vec![1, 1]).unwrap()).unwrap();
    let large = builder.build(&Structure::new(vec![1, 2]).unwrap()).unwrap();
    let space = small.parameter_space();
    let mut rng = RandomNumberGenerator::from_seed(2);
    let population = Population::new(
        (0..4)
            .map(|_| Individual::evaluated(space.sample(&mut rng), 1.0))
            .collect(),
        small.structure().cloned(),
    );

    let grown = population.embed(&small, &large).unwrap();
    let large_space = large.parameter_space();
    assert_eq!(grown.len(), 4);
    for (before, after) in population.individuals().iter().zip(grown.individuals()) {
        assert_eq!(after.values().len(), large_space.len());
        assert!(large_space.contains(after.values()));
        let old = small.var2value(before.values()).unwrap();
        let new = large.var2value(after.values()).unwrap();
        for (name, value) in old {
            let carried = new.iter().find(|(n, _)| *n == name).unwrap().1;
            assert_eq!(carried, value, "variable {}", name);
        }
    }
}

#[test]
fn test_inference_with_structure_increase() {
    let engine = Engine::new(EngineId::Moments, toy_simulator).with_data(observed());
    let problem = InferenceProblem::new(engine, EpochModelBuilder::new())
        .unwrap()
        .with_cache(true);
    let settings = Settings::builder()
        .number_of_repeats(2)
        .number_of_processes(2)
        .initial_structure(Structure::new(vec![1]).unwrap())
        .final_structure(Structure::new(vec![2]).unwrap())
        .ga(GaOptions::builder()
            .generation_size(12)
            .stuck_generations(15)
            .max_generations(2_000)
            .build()
            .unwrap())
        .poll_interval(Duration::from_millis(10))
        .seed(77)
        .build()
        .unwrap();

    let final_model = problem
        .model_for(Some(&Structure::new(vec![2]).unwrap()))
        .unwrap();
    let coordinator = Coordinator::new(settings, problem).unwrap();
    let state = coordinator.shared_state();
    let outcome = coordinator.run().unwrap();

    assert_eq!(outcome.best.x().len(), final_model.parameter_space().len());
    assert!(outcome.best.y().is_finite());
    for index in 1..=2 {
        let snapshot = state.snapshot(index).unwrap();
        assert!(snapshot.finished);
        assert_eq!(snapshot.structure, Some(Structure::new(vec![2]).unwrap()));
    }
    assert!(outcome.summary.to_string().contains("(2)"));
}
