use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use demoga::{
    breeding::{BreedStrategy, GeneticBreedStrategy},
    error::Result,
    ga::{GaOptions, GeneticAlgorithm, Initialization},
    population::{Individual, Population},
    rng::RandomNumberGenerator,
    variable::ParameterSpace,
};

fn rastrigin(x: &[f64]) -> Result<f64> {
    Ok(10.0 * x.len() as f64
        + x.iter()
            .map(|v| v * v - 10.0 * (2.0 * std::f64::consts::PI * v).cos())
            .sum::<f64>())
}

fn space(dimension: usize) -> ParameterSpace {
    ParameterSpace::from_bounds(&vec![-5.12; dimension], &vec![5.12; dimension]).unwrap()
}

fn bench_breeding(c: &mut Criterion) {
    let mut group = c.benchmark_group("breeding");
    for size in [10, 100, 1000].iter() {
        let options = GaOptions::builder().generation_size(*size).build().unwrap();
        let strategy = GeneticBreedStrategy::from_options(&options).unwrap();
        let space = space(8);
        let mut rng = RandomNumberGenerator::from_seed(1);
        let parents = Population::new(
            (0..*size)
                .map(|i| Individual::evaluated(space.sample(&mut rng), i as f64))
                .collect(),
            None,
        );
        group.bench_with_input(BenchmarkId::new("genetic", size), &parents, |b, parents| {
            b.iter(|| {
                strategy
                    .breed(black_box(parents), &space, &options, 0.2, &mut rng)
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_optimize(c: &mut Criterion) {
    let mut group = c.benchmark_group("optimize");
    group.sample_size(10);
    for dimension in [2, 8].iter() {
        let options = GaOptions::builder()
            .generation_size(20)
            .max_generations(100)
            .build()
            .unwrap();
        let ga = GeneticAlgorithm::new(options).unwrap();
        let space = space(*dimension);
        group.bench_with_input(
            BenchmarkId::new("rastrigin", dimension),
            &space,
            |b, space| {
                b.iter(|| {
                    let mut rng = RandomNumberGenerator::from_seed(7);
                    ga.optimize(&rastrigin, black_box(space), Initialization::Random, &mut rng)
                        .unwrap()
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_breeding, bench_optimize);
criterion_main!(benches);
