use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use demoga::{
    core::{Coordinator, FunctionProblem, Problem, Settings},
    error::{OptimizationError, Result},
    ga::GaOptions,
    model::{bounded_model, Model, Structure},
    objective::ObjectiveFunction,
};

fn sphere(x: &[f64]) -> Result<f64> {
    Ok(x.iter().map(|v| v * v).sum())
}

fn slow_sphere(x: &[f64]) -> Result<f64> {
    thread::sleep(Duration::from_millis(2));
    sphere(x)
}

fn settings(repeats: usize, ga: GaOptions) -> Settings {
    Settings::builder()
        .number_of_repeats(repeats)
        .number_of_processes(3)
        .ga(ga)
        .poll_interval(Duration::from_millis(10))
        .summary_interval(Duration::from_millis(50))
        .seed(21)
        .build()
        .unwrap()
}

/// Fails the objective setup of exactly one run and counts the evaluations
/// of the others.
struct OneBadRun {
    calls: AtomicUsize,
    evaluations: Arc<AtomicUsize>,
    model: Model,
}

impl OneBadRun {
    fn new(evaluations: Arc<AtomicUsize>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            evaluations,
            model: bounded_model(&[0.0, 0.0], &[1.0, 1.0]).unwrap(),
        }
    }
}

impl Problem for OneBadRun {
    fn model_for(&self, _structure: Option<&Structure>) -> Result<Model> {
        Ok(self.model.clone())
    }

    fn objective_for<'a>(&'a self, _model: &Model) -> Result<Box<dyn ObjectiveFunction + 'a>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 1 {
            return Err(OptimizationError::Model("broken model".to_string()));
        }
        let evaluations = &self.evaluations;
        Ok(Box::new(move |x: &[f64]| {
            evaluations.fetch_add(1, Ordering::SeqCst);
            slow_sphere(x)
        }))
    }
}

#[test]
fn test_end_to_end_sphere() {
    let ga = GaOptions::builder()
        .generation_size(10)
        .eps(1e-8)
        .stuck_generations(40)
        .max_generations(300)
        .build()
        .unwrap();
    let problem = FunctionProblem::new(sphere, &[0.0, 0.0], &[1.0, 1.0]).unwrap();
    let outcome = Coordinator::new(settings(3, ga), problem)
        .unwrap()
        .run()
        .unwrap();
    assert!(outcome.best.y() < 1e-3);
    assert!(outcome.best.x().iter().all(|v| *v < 0.05));
    for (index, result) in &outcome.results {
        assert!(outcome.best.y() <= result.y());
        if result.y() == outcome.best.y() {
            assert!(outcome.best_index <= *index);
        }
    }
}

#[test]
fn test_one_failed_run_fails_the_launch() {
    let ga = GaOptions::builder().max_generations(200).build().unwrap();
    let evaluations = Arc::new(AtomicUsize::new(0));
    let coordinator =
        Coordinator::new(settings(3, ga), OneBadRun::new(Arc::clone(&evaluations))).unwrap();
    let state = coordinator.shared_state();
    match coordinator.run() {
        Err(OptimizationError::RunFailed { message, .. }) => {
            assert!(message.contains("broken model"))
        }
        other => panic!("expected a run failure, got {:?}", other.map(|o| o.best_index)),
    }

    // The other runs were stopped before they could finish.
    assert_eq!(state.finished_count(), 0);
    assert!(state.snapshots().iter().all(|s| !s.finished));
    let stopped_at = evaluations.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(evaluations.load(Ordering::SeqCst), stopped_at);
}

#[test]
fn test_interrupt_leaves_complete_snapshots() {
    let ga = GaOptions::builder()
        .stuck_generations(10_000)
        .build()
        .unwrap();
    let problem = FunctionProblem::new(slow_sphere, &[0.0, 0.0], &[1.0, 1.0]).unwrap();
    let coordinator = Coordinator::new(settings(3, ga), problem).unwrap();
    let state = coordinator.shared_state();
    let interrupt = coordinator.interrupt_token();

    let trigger = thread::spawn(move || {
        thread::sleep(Duration::from_millis(150));
        interrupt.cancel();
    });
    let err = coordinator.run().unwrap_err();
    trigger.join().unwrap();

    assert!(matches!(err, OptimizationError::Interrupted));
    for index in 1..=3 {
        if let Some(snapshot) = state.snapshot(index) {
            assert_eq!(snapshot.index, index);
            assert_eq!(snapshot.result.x().len(), 2);
            assert_eq!(snapshot.result.x_out().len(), snapshot.result.y_out().len());
            assert!(!snapshot.finished);
        }
    }
}

#[test]
fn test_deadline() {
    let ga = GaOptions::builder()
        .stuck_generations(10_000)
        .build()
        .unwrap();
    let settings = Settings::builder()
        .number_of_repeats(2)
        .number_of_processes(2)
        .ga(ga)
        .poll_interval(Duration::from_millis(10))
        .max_wait(Duration::from_millis(100))
        .build()
        .unwrap();
    let problem = FunctionProblem::new(slow_sphere, &[0.0], &[1.0]).unwrap();
    let err = Coordinator::new(settings, problem)
        .unwrap()
        .run()
        .unwrap_err();
    assert!(matches!(err, OptimizationError::DeadlineExceeded(_)));
}

#[test]
fn test_summary_file_is_written() {
    let directory = std::env::temp_dir().join(format!("demoga-summary-{}", std::process::id()));
    let ga = GaOptions::builder().max_generations(5).build().unwrap();
    let settings = Settings::builder()
        .number_of_repeats(2)
        .number_of_processes(1)
        .ga(ga)
        .output_directory(&directory)
        .build()
        .unwrap();
    let problem = FunctionProblem::new(sphere, &[0.0], &[1.0]).unwrap();
    let outcome = Coordinator::new(settings, problem).unwrap().run().unwrap();
    let text = std::fs::read_to_string(directory.join("summary.txt")).unwrap();
    assert_eq!(text, outcome.summary.to_string());
    assert!(text.contains("Runs finished: 2/2"));
    std::fs::remove_dir_all(&directory).unwrap();
}

#[cfg(feature = "serde")]
#[test]
fn test_settings_load_from_json() {
    let settings = Settings::builder()
        .number_of_repeats(4)
        .initial_structure(Structure::new(vec![1, 1]).unwrap())
        .final_structure(Structure::new(vec![2, 1]).unwrap())
        .max_wait(Duration::from_secs(30))
        .build()
        .unwrap();
    let json = serde_json::to_string(&settings).unwrap();
    let loaded: Settings = serde_json::from_str(&json).unwrap();
    assert_eq!(loaded, settings);
    assert!(loaded.validate().is_ok());
}
