//! Random search over the classic two-bar truss: minimize the structural
//! volume and the peak member stress, with the stress capped at 1e5.
//!
//! Run with `RUST_LOG=symbios_pareto=debug` to watch the problem being
//! validated and the archive being updated.

use rand::Rng;
use std::sync::Arc;
use symbios_pareto::{
    BoxConstraints, ClosureFunction, Element, ElementProperties, Error, PSet, Problem,
    ProblemStatus, RunConfig, Sampler,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const STRESS_LIMIT: f64 = 1e5;

fn truss_problem() -> symbios_pareto::Result<Problem> {
    let inputs = vec![
        ElementProperties::new("x1").with_unit("m2"),
        ElementProperties::new("x2").with_unit("m2"),
        ElementProperties::new("y").with_unit("m"),
    ];
    let outputs = vec![
        ElementProperties::new("volume").with_unit("m3"),
        ElementProperties::new("stress").with_unit("kPa"),
    ];
    let truss = ClosureFunction::new("two_bar_truss", inputs, outputs, |x: &[f64], y: &mut [f64]| {
        let (x1, x2, h) = (x[0], x[1], x[2]);
        let l1 = (16.0 + h * h).sqrt();
        let l2 = (1.0 + h * h).sqrt();
        y[0] = x1 * l1 + x2 * l2;
        y[1] = f64::max(20.0 * l1 / (h * x1), 80.0 * l2 / (h * x2));
        Ok(())
    })
    .with_bounds(BoxConstraints::from_values(&[1e-5, 1e-5, 1.0], &[0.01, 0.01, 3.0])?);

    let mut problem = Problem::new().with_name("two-bar truss");
    // The stress is both an objective and a constraint.
    problem.append_function(Arc::new(truss), &[], &[1], &[0, 1], &[])?;
    problem.process_problem_definition();
    problem.define_threshold_vec(vec![Element::new(STRESS_LIMIT)]);
    match problem.process_problem_definition() {
        ProblemStatus::FullyDefined => Ok(problem),
        status => Err(Error::ProblemNotDefined(status)),
    }
}

fn main() -> symbios_pareto::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = RunConfig {
        budget: 2000,
        seed: 7,
        ..Default::default()
    };
    let problem = Arc::new(truss_problem()?);
    let sampler = Sampler::from_config(&config);
    let mut pset = PSet::with_config(Arc::clone(&problem), &config);
    let population = pset.append_tagged_set("population");

    let Some(bounds) = problem.box_constraints().cloned() else {
        return Err(Error::ProblemNotDefined(problem.status()));
    };

    println!("Running two-bar truss random search ({} evaluations)...", config.budget);

    let mut infeasible = 0;
    while !pset.is_terminate() {
        let mapping = pset.create_optimization_mapping(population)?;
        let x: Vec<f64> = {
            let mut rng = sampler.lock();
            bounds
                .lower_bounds()
                .iter()
                .zip(bounds.upper_bounds())
                .map(|(lo, hi)| rng.random_range(lo.value()..=hi.value()))
                .collect()
        };
        let feasible = {
            let mut m = mapping.write();
            m.define_decision_values(&x)?;
            let ran = if config.parallel {
                m.parallel_evaluate(&sampler)?
            } else {
                m.evaluate(&sampler)?
            };
            pset.decrement_budget(ran);
            m.is_feasible()
        };
        if feasible {
            pset.update_ideal_nadir_vec(&mapping);
        } else {
            infeasible += 1;
        }
        pset.increment_iteration();
    }

    info!(
        evaluations = pset.used_budget(),
        infeasible, "search finished"
    );

    let Some(archive) = pset.archive() else {
        println!("No feasible design found.");
        return Ok(());
    };

    let mut front: Vec<(Vec<f64>, Vec<f64>)> = archive
        .all()
        .iter()
        .map(|m| {
            let m = m.read();
            (m.decision_values(), m.objective_values())
        })
        .collect();
    front.sort_by(|a, b| a.1[0].total_cmp(&b.1[0]));

    println!("\nPareto front ({} designs, {} infeasible samples):", front.len(), infeasible);
    println!(
        "{:<10} | {:<10} | {:<8} | {:<10} | {:<10}",
        "x1", "x2", "y", "Volume", "Stress"
    );
    println!("-----------------------------------------------------------");
    for (x, f) in front.iter().step_by((front.len() / 10).max(1)) {
        println!(
            "{:<10.5} | {:<10.5} | {:<8.3} | {:<10.5} | {:<10.0}",
            x[0], x[1], x[2], f[0], f[1]
        );
    }

    let ideal = symbios_pareto::element::values(pset.ideal_vec());
    let nadir = symbios_pareto::element::values(pset.nadir_vec());
    println!("\nIdeal: {ideal:?}");
    println!("Nadir: {nadir:?}");
    Ok(())
}
