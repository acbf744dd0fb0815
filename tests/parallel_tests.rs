//! Concurrent evaluation tests. `parallel_evaluate` must agree with the
//! serial path, respect producer/consumer order and keep functions that are
//! not parallel-safe under the sampler lock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use symbios_pareto::{
    ClosureFunction, ElementProperties, FunctionError, Mapping, Problem, ProblemStatus, Sampler,
};

fn props(ids: &[&str]) -> Vec<ElementProperties> {
    ids.iter().map(|id| ElementProperties::new(*id)).collect()
}

fn define(mut problem: Problem) -> Arc<Problem> {
    assert_eq!(problem.process_problem_definition(), ProblemStatus::FullyDefined);
    Arc::new(problem)
}

/// Four independent functions of a shared decision, the last one serial-only.
fn fan_out() -> Arc<Problem> {
    let mut problem = Problem::new();
    for k in 0..4 {
        let out = format!("f{k}");
        let scale = (k + 1) as f64;
        let f = ClosureFunction::new(
            format!("scale{k}"),
            props(&["x", "y"]),
            props(&[out.as_str()]),
            move |x: &[f64], y: &mut [f64]| {
                y[0] = scale * x[0] - x[1];
                Ok(())
            },
        );
        let f = if k == 3 { f.serial_only() } else { f };
        problem.append_function(Arc::new(f), &[], &[], &[], &[]).unwrap();
    }
    define(problem)
}

/// `x -> a -> b -> c`, each link an external parameter.
fn chain() -> Arc<Problem> {
    let step = |name: &str, input: &str, output: &str| {
        ClosureFunction::new(
            name,
            props(&[input, "k"]),
            props(&[output]),
            |x: &[f64], y: &mut [f64]| {
                y[0] = 2.0 * x[0] + x[1];
                Ok(())
            },
        )
    };
    let mut problem = Problem::new();
    problem
        .append_function(Arc::new(step("third", "b", "c")), &[0], &[], &[], &[])
        .unwrap();
    problem
        .append_function(Arc::new(step("second", "a", "b")), &[0], &[], &[], &[])
        .unwrap();
    problem
        .append_function(Arc::new(step("first", "x", "a")), &[], &[], &[], &[])
        .unwrap();
    problem.define_external_parameters(vec![true, true]);
    define(problem)
}

// ============================================================================
// Agreement with the serial path
// ============================================================================

#[test]
fn test_parallel_matches_serial() {
    let problem = fan_out();
    let sampler = Sampler::new(11);

    let mut serial = Mapping::new(Arc::clone(&problem)).unwrap();
    serial.define_decision_values(&[0.3, 0.1]).unwrap();
    let mut parallel = serial.clone();

    assert_eq!(serial.evaluate(&sampler).unwrap(), 4);
    assert_eq!(parallel.parallel_evaluate(&sampler).unwrap(), 4);
    assert_eq!(parallel.objective_values(), serial.objective_values());
    assert!(parallel.is_evaluated());
    assert_eq!(
        parallel.parallel_evaluate(&sampler).unwrap(),
        0,
        "nothing left to run"
    );
}

#[test]
fn test_parallel_runs_only_stale_functions() {
    let problem = chain();
    let sampler = Sampler::new(1);
    let mut m = Mapping::new(problem).unwrap();
    assert_eq!(m.parallel_evaluate(&sampler).unwrap(), 3);

    // "third" has no consumers.
    m.define_func_evaluated(0, false).unwrap();
    assert_eq!(m.parallel_evaluate(&sampler).unwrap(), 1);

    // "second" drags "third" along.
    m.define_func_evaluated(1, false).unwrap();
    assert!(!m.is_func_evaluated(0));
    assert_eq!(m.parallel_evaluate(&sampler).unwrap(), 2);
}

#[test]
fn test_consumers_wait_for_their_producers() {
    let problem = chain();
    let sampler = Sampler::new(1);

    let mut serial = Mapping::new(Arc::clone(&problem)).unwrap();
    let mut parallel = Mapping::new(problem).unwrap();
    serial.evaluate(&sampler).unwrap();
    parallel.parallel_evaluate(&sampler).unwrap();

    // x = k = 0.5: a = 1.5, b = 3.5, c = 7.5; objectives follow append order.
    assert_eq!(serial.objective_values(), vec![7.5, 3.5, 1.5]);
    assert_eq!(parallel.objective_values(), serial.objective_values());
}

#[test]
fn test_parallel_failure_is_recorded() {
    let f = ClosureFunction::new("ok", props(&["x"]), props(&["a"]), |x: &[f64], y: &mut [f64]| {
        y[0] = x[0];
        Ok(())
    });
    let g = ClosureFunction::new("bad", props(&["x"]), props(&["b"]), |_: &[f64], _: &mut [f64]| {
        Err(FunctionError::new("singular matrix"))
    });
    let mut problem = Problem::new();
    problem.append_function(Arc::new(f), &[], &[], &[], &[]).unwrap();
    problem.append_function(Arc::new(g), &[], &[], &[], &[]).unwrap();
    let mut m = Mapping::new(define(problem)).unwrap();

    assert_eq!(m.parallel_evaluate(&Sampler::new(1)).unwrap(), 2);
    assert!(m.is_evaluated());
    assert!(!m.is_successful_eval());
    assert_eq!(m.objective_values()[0], 0.5);
}

// ============================================================================
// Serial-only functions
// ============================================================================

#[test]
fn test_serial_only_functions_never_overlap() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let guard_in = Arc::clone(&in_flight);
    let guard_peak = Arc::clone(&peak);
    let legacy = ClosureFunction::new(
        "legacy",
        props(&["x"]),
        props(&["y"]),
        move |x: &[f64], y: &mut [f64]| {
            let now = guard_in.fetch_add(1, Ordering::SeqCst) + 1;
            guard_peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(2));
            y[0] = x[0];
            guard_in.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        },
    )
    .serial_only();
    let mut problem = Problem::new();
    problem.append_function(Arc::new(legacy), &[], &[], &[], &[]).unwrap();
    let problem = define(problem);
    let sampler = Arc::new(Sampler::new(3));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let problem = Arc::clone(&problem);
            let sampler = Arc::clone(&sampler);
            thread::spawn(move || {
                let mut m = Mapping::new(problem).unwrap();
                m.define_decision_values(&[i as f64 / 8.0]).unwrap();
                if i % 2 == 0 {
                    m.parallel_evaluate(&sampler).unwrap();
                } else {
                    m.evaluate(&sampler).unwrap();
                }
                m.objective_values()[0]
            })
        })
        .collect();
    let results: Vec<f64> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(peak.load(Ordering::SeqCst), 1, "serial-only calls overlapped");
    for (i, y) in results.iter().enumerate() {
        assert_eq!(*y, i as f64 / 8.0);
    }
}
