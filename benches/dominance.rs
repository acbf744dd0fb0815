use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::SeedableRng;
use rand::Rng;
use rand_pcg::Pcg64;
use std::sync::Arc;
use symbios_pareto::dominance::{
    non_dominance_sort, non_dominance_sort_constraint_handling, non_dominance_sort_with_goals,
    Candidate,
};
use symbios_pareto::{ClosureFunction, ElementProperties, Mapping, PSet, Problem, Sampler};

// =============================================================================
// Fixtures
// =============================================================================

fn random_points(n: usize, n_obj: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = Pcg64::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..n_obj).map(|_| rng.random::<f64>()).collect())
        .collect()
}

fn zdt1_problem(n_var: usize) -> Arc<Problem> {
    let inputs = (0..n_var)
        .map(|i| ElementProperties::new(format!("x{i}")))
        .collect();
    let f = ClosureFunction::new(
        "zdt1",
        inputs,
        vec![ElementProperties::new("f1"), ElementProperties::new("f2")],
        |x: &[f64], y: &mut [f64]| {
            let g = 1.0 + 9.0 * x[1..].iter().sum::<f64>() / (x.len() - 1) as f64;
            y[0] = x[0];
            y[1] = g * (1.0 - (x[0] / g).sqrt());
            Ok(())
        },
    );
    let mut problem = Problem::new().with_name("zdt1");
    problem
        .append_function(Arc::new(f), &[], &[], &[], &[])
        .expect("zdt1 binds no roles out of range");
    problem.process_problem_definition();
    Arc::new(problem)
}

// =============================================================================
// Ranking
// =============================================================================

fn bench_non_dominance_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("dominance/non_dominance_sort");

    for size in [50, 100, 200, 500].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let points = random_points(size, 2, 42);
            b.iter(|| black_box(non_dominance_sort(&points, true)));
        });
    }
    group.finish();
}

fn bench_objectives_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("dominance/num_objectives");

    for n_obj in [2, 3, 5, 8].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n_obj), n_obj, |b, &n_obj| {
            let points = random_points(200, n_obj, 42);
            b.iter(|| black_box(non_dominance_sort(&points, true)));
        });
    }
    group.finish();
}

fn bench_constraint_handling(c: &mut Criterion) {
    let mut group = c.benchmark_group("dominance/constraint_handling");

    for size in [100, 200].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let objectives = random_points(size, 2, 7);
            let constraints = random_points(size, 1, 8);
            let set: Vec<Candidate> = objectives
                .iter()
                .zip(&constraints)
                .map(|(o, c)| Candidate::new(o, c))
                .collect();
            b.iter(|| black_box(non_dominance_sort_constraint_handling(&set, &[0.5], true)));
        });
    }
    group.finish();
}

fn bench_goal_sort(c: &mut Criterion) {
    let points = random_points(200, 3, 3);
    let goals = [Some(0.3), None, Some(0.6)];
    c.bench_function("dominance/with_goals/200", |b| {
        b.iter(|| black_box(non_dominance_sort_with_goals(&points, &goals, true)))
    });
}

// =============================================================================
// Archive and evaluation
// =============================================================================

fn bench_archive_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("pset/archive_update");
    let problem = zdt1_problem(10);

    for size in [100, 500].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let sampler = Sampler::new(42);
            let mut rng = Pcg64::seed_from_u64(42);
            let candidates: Vec<_> = (0..size)
                .map(|_| {
                    let mut m = Mapping::new(Arc::clone(&problem)).expect("zdt1 is defined");
                    let x: Vec<f64> = (0..10).map(|_| rng.random::<f64>()).collect();
                    m.define_decision_values(&x).expect("ten decision variables");
                    m.evaluate(&sampler).expect("zdt1 evaluates");
                    m.into_shared()
                })
                .collect();
            b.iter_batched(
                || PSet::new(Arc::clone(&problem)),
                |mut pset| {
                    for m in &candidates {
                        pset.update_non_dominated_archive(m, true);
                    }
                    black_box(pset)
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let problem = zdt1_problem(30);
    let sampler = Sampler::new(1);
    c.bench_function("mapping/evaluate/zdt1_30", |b| {
        b.iter_batched(
            || Mapping::new(Arc::clone(&problem)).expect("zdt1 is defined"),
            |mut m| {
                m.evaluate(&sampler).expect("zdt1 evaluates");
                black_box(m)
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    ranking_benches,
    bench_non_dominance_sort,
    bench_objectives_scaling,
    bench_constraint_handling,
    bench_goal_sort,
);

criterion_group!(pset_benches, bench_archive_update, bench_evaluate);

criterion_main!(ranking_benches, pset_benches);
