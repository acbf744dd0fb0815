//! Problem exchange tests: export, re-import through a function registry and
//! rejection of broken records.

use serde_json::{json, Value};
use std::sync::Arc;
use symbios_pareto::exchange::{
    problem_from_json, problem_from_value, problem_to_json, problem_to_json_string,
    FunctionRegistry, FunctionSpec,
};
use symbios_pareto::{
    BoxConstraints, ClosureFunction, DefinitionError, DistributionType, Element,
    ElementProperties, Function, Mapping, Problem, ProblemStatus, Sampler, Space,
    UncertaintyMapping,
};

fn beam(spec: &FunctionSpec) -> Option<Arc<dyn Function>> {
    let f = ClosureFunction::new(
        "beam",
        spec.inputs.clone(),
        spec.outputs.clone(),
        |x: &[f64], y: &mut [f64]| {
            y[0] = x[0] + x[1];
            y[1] = x[0] * x[1];
            Ok(())
        },
    )
    .with_path(spec.path.clone())
    .with_properties(spec.properties.clone());
    Some(Arc::new(f))
}

fn shift(spec: &FunctionSpec) -> Option<Arc<dyn Function>> {
    let f = ClosureFunction::new(
        "shift",
        spec.inputs.clone(),
        spec.outputs.clone(),
        |x: &[f64], y: &mut [f64]| {
            y[0] = x.iter().sum::<f64>() + 1.0;
            Ok(())
        },
    );
    Some(Arc::new(f))
}

fn registry() -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();
    registry.register("beam", beam);
    registry.register("shift", shift);
    registry
}

fn props(ids: &[&str]) -> Vec<ElementProperties> {
    ids.iter().map(|id| ElementProperties::new(*id)).collect()
}

/// A constrained beam with goals, priorities, bounds and output noise.
fn beam_problem() -> Problem {
    let mut blob = serde_json::Map::new();
    blob.insert("mesh".into(), json!(3));
    let f = beam(&FunctionSpec {
        type_name: "beam".into(),
        path: "solvers/beam".into(),
        properties: blob,
        inputs: props(&["width", "height"]),
        outputs: props(&["mass", "stress"]),
    })
    .unwrap();

    let mut problem = Problem::new().with_name("beam");
    problem.append_function(f, &[], &[1], &[], &[]).unwrap();
    assert_eq!(problem.process_problem_definition(), ProblemStatus::FullyDefined);

    problem.define_box_constraints(BoxConstraints::from_values(&[-1.0, 0.0], &[2.0, 3.0]).unwrap());
    problem.define_threshold_vec(vec![Element::new(0.5)]);
    problem.redefine_goal(0, Element::new(1.25));
    problem.redefine_set_goal(0, true);
    problem.define_priority_vec(vec![2]);
    let noise =
        UncertaintyMapping::with_terms(DistributionType::Normal, vec![0.0, 0.1], vec![1.0, 0.0])
            .unwrap();
    problem.redefine_func_out_uncertainty(0, 0, Some(noise));
    assert_eq!(problem.process_problem_definition(), ProblemStatus::FullyDefined);
    problem
}

/// `shift` feeds its output into a second `shift` through an external
/// parameter.
fn linked_problem() -> Problem {
    let spec = |inputs: &[&str], outputs: &[&str]| FunctionSpec {
        type_name: "shift".into(),
        inputs: props(inputs),
        outputs: props(outputs),
        ..Default::default()
    };
    let mut problem = Problem::new().with_name("chain");
    problem
        .append_function(shift(&spec(&["y", "w"], &["z"])).unwrap(), &[0], &[], &[], &[])
        .unwrap();
    problem
        .append_function(shift(&spec(&["x"], &["y"])).unwrap(), &[], &[], &[], &[])
        .unwrap();
    problem.define_external_parameters(vec![true]);
    assert_eq!(problem.process_problem_definition(), ProblemStatus::FullyDefined);
    problem
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn test_round_trip_reproduces_the_record() {
    let problem = beam_problem();
    let copy = problem_from_json(&problem_to_json_string(&problem), &registry()).unwrap();

    assert_eq!(problem_to_json(&copy), problem_to_json(&problem));
    assert_eq!(copy.name(), "beam");
    assert_eq!(copy.maps(), problem.maps());
    for space in Space::ALL {
        assert_eq!(copy.ids(space), problem.ids(space), "{space:?} ids differ");
    }
}

#[test]
fn test_round_trip_keeps_vectors() {
    let problem = beam_problem();
    let copy = problem_from_json(&problem_to_json_string(&problem), &registry()).unwrap();

    assert_eq!(copy.box_constraints(), problem.box_constraints());
    assert_eq!(copy.goal_vec(), problem.goal_vec());
    assert_eq!(copy.set_goal_vec(), &[true]);
    assert_eq!(copy.priority_vec(), &[2]);
    assert_eq!(copy.threshold_vec(), problem.threshold_vec());
    assert_eq!(copy.func_out_uncertainties(), problem.func_out_uncertainties());
    assert_eq!(copy.d_vec_uncertainties(), problem.d_vec_uncertainties());
}

#[test]
fn test_round_trip_keeps_function_metadata() {
    let copy = problem_from_json(&problem_to_json_string(&beam_problem()), &registry()).unwrap();
    let func = copy.function(0).unwrap();

    assert_eq!(func.type_name(), "beam");
    assert_eq!(func.path(), "solvers/beam");
    assert_eq!(func.properties().get("mesh"), Some(&json!(3)));
}

#[test]
fn test_imported_problem_evaluates_like_the_original() {
    let problem = Arc::new(beam_problem());
    let copy = Arc::new(problem_from_json(&problem_to_json_string(&problem), &registry()).unwrap());

    let mut a = Mapping::new(problem).unwrap();
    let mut b = Mapping::new(copy).unwrap();
    a.evaluate(&Sampler::new(5)).unwrap();
    b.evaluate(&Sampler::new(5)).unwrap();

    assert_eq!(a.decision_values(), vec![0.5, 1.5]);
    assert_eq!(a.objective_values(), b.objective_values());
    assert_eq!(a.constraint_values(), b.constraint_values());
    assert_eq!(a.is_feasible(), b.is_feasible());
}

#[test]
fn test_round_trip_keeps_external_links() {
    let problem = linked_problem();
    let copy = problem_from_json(&problem_to_json_string(&problem), &registry()).unwrap();

    assert_eq!(copy.is_external_parameters(), &[true]);
    assert_eq!(copy.evaluation_order(), problem.evaluation_order());
    assert_eq!(copy.external_links(), problem.external_links());

    let mut m = Mapping::new(Arc::new(copy)).unwrap();
    m.evaluate(&Sampler::new(1)).unwrap();
    // y = x + 1 = 1.5, z = y + w + 1 = 3.0
    assert_eq!(m.objective_values(), vec![3.0, 1.5]);
}

// ============================================================================
// Broken records
// ============================================================================

#[test]
fn test_unknown_function_type_is_undefined() {
    let text = problem_to_json_string(&beam_problem());
    let empty = FunctionRegistry::new();
    assert_eq!(problem_from_json(&text, &empty).err(), Some(ProblemStatus::Undefined));
}

#[test]
fn test_every_required_key_is_checked() {
    let record = problem_to_json(&beam_problem());
    for key in symbios_pareto::exchange::REQUIRED_KEYS {
        let mut broken = record.clone();
        broken.as_object_mut().unwrap().remove(key);
        assert_eq!(
            problem_from_value(&broken, &registry()).err(),
            Some(ProblemStatus::Undefined),
            "record without `{key}` should be rejected"
        );
    }
}

#[test]
fn test_one_sided_bounds_are_undefined() {
    let mut record = problem_to_json(&beam_problem());
    record["lbs"] = Value::Null;
    assert_eq!(
        problem_from_value(&record, &registry()).err(),
        Some(ProblemStatus::Undefined)
    );
}

#[test]
fn test_inconsistent_record_reports_validation_status() {
    let mut record = problem_to_json(&beam_problem());
    record["thresholds"] = json!([]);
    assert_eq!(
        problem_from_value(&record, &registry()).err(),
        Some(ProblemStatus::IllDefined(DefinitionError::ThresholdVec))
    );
}

#[test]
fn test_map_entry_outside_arity_is_undefined() {
    let mut record = problem_to_json(&beam_problem());
    record["f2cMap"] = json!([[7]]);
    assert_eq!(
        problem_from_value(&record, &registry()).err(),
        Some(ProblemStatus::Undefined)
    );
}
