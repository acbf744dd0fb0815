//! Ranks a population on Schaffer's problem, keeps an epsilon archive of the
//! best points and round-trips the problem through its JSON record.

use rand::Rng;
use std::sync::Arc;
use symbios_pareto::exchange::{
    problem_from_json, problem_to_json_string, FunctionRegistry, FunctionSpec,
};
use symbios_pareto::{
    ArchiveUpdate, BoxConstraints, ClosureFunction, ElementProperties, Error, Function, PSet,
    Problem, ProblemStatus, Sampler,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn schaffer(spec: &FunctionSpec) -> Option<Arc<dyn Function>> {
    let bounds = BoxConstraints::from_values(&[-5.0], &[5.0]).ok()?;
    let f = ClosureFunction::new(
        "schaffer",
        spec.inputs.clone(),
        spec.outputs.clone(),
        |x: &[f64], y: &mut [f64]| {
            y[0] = x[0] * x[0];
            y[1] = (x[0] - 2.0).powi(2);
            Ok(())
        },
    )
    .with_bounds(bounds);
    Some(Arc::new(f))
}

fn main() -> symbios_pareto::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut registry = FunctionRegistry::new();
    registry.register("schaffer", schaffer);

    let spec = FunctionSpec {
        type_name: "schaffer".into(),
        inputs: vec![ElementProperties::new("x")],
        outputs: vec![ElementProperties::new("f1"), ElementProperties::new("f2")],
        ..Default::default()
    };
    let mut problem = Problem::new().with_name("schaffer");
    problem.append_function(registry.create(&spec)?, &[], &[], &[], &[])?;
    let status = problem.process_problem_definition();
    if status != ProblemStatus::FullyDefined {
        return Err(Error::ProblemNotDefined(status));
    }

    // Re-import the exported record; the copy drives the run.
    let record = problem_to_json_string(&problem);
    let problem = problem_from_json(&record, &registry).map_err(Error::ProblemNotDefined)?;
    info!(bytes = record.len(), "problem record round-tripped");

    let sampler = Sampler::new(42);
    let mut pset = PSet::new(Arc::new(problem));
    let population = pset.append_tagged_set("population");
    for _ in 0..200 {
        let mapping = pset.create_optimization_mapping(population)?;
        let x = sampler.lock().random_range(-5.0..=5.0);
        let mut m = mapping.write();
        m.define_decision_values(&[x])?;
        m.evaluate(&sampler)?;
        if !m.is_successful_eval() {
            warn!(x, "evaluation failed");
        }
    }

    let Some(set) = pset.set(population) else {
        return Err(Error::UnknownSet(population));
    };
    let fronts = set.non_dominance_sort(true);
    println!("Ranked {} points into {} fronts", set.size(), fronts.len());
    for (rank, front) in fronts.iter().take(5).enumerate() {
        println!("  front {rank}: {} points", front.size());
    }

    let mut counts = [0usize; 3];
    let members: Vec<_> = set.all().to_vec();
    for m in &members {
        let slot = match pset.update_non_dominated_archive(m, false) {
            ArchiveUpdate::Unchanged => 0,
            ArchiveUpdate::Added => 1,
            ArchiveUpdate::Replaced => 2,
        };
        counts[slot] += 1;
    }
    println!(
        "\nArchive offers: {} unchanged, {} added, {} replaced",
        counts[0], counts[1], counts[2]
    );

    if let Some(archive) = pset.archive() {
        let mut best: Vec<(f64, Vec<f64>)> = archive
            .all()
            .iter()
            .map(|m| {
                let m = m.read();
                (m.decision_values()[0], m.objective_values())
            })
            .collect();
        best.sort_by(|a, b| a.0.total_cmp(&b.0));
        println!("Archive holds {} points, x in [0, 2] expected:", best.len());
        println!("{:<8} | {:<8} | {:<8}", "x", "f1", "f2");
        println!("------------------------------");
        for (x, f) in best.iter().step_by((best.len() / 8).max(1)) {
            println!("{:<8.3} | {:<8.3} | {:<8.3}", x, f[0], f[1]);
        }
    }

    println!("\nTags in use: {:?}", pset.all_tags());
    Ok(())
}
