//! Problem exchange records.
//!
//! A problem travels as one JSON object. Functions are stored by type name
//! and recreated through a [`FunctionRegistry`]; everything else is plain
//! data. Map entries use `-1` for "not connected".
//!
//! ```
//! use std::sync::Arc;
//! use symbios_pareto::exchange::{problem_from_json, problem_to_json_string, FunctionRegistry};
//! use symbios_pareto::{ClosureFunction, ElementProperties, Function, Problem};
//!
//! fn square(spec: &symbios_pareto::exchange::FunctionSpec) -> Option<Arc<dyn Function>> {
//!     let f = ClosureFunction::new("square", spec.inputs.clone(), spec.outputs.clone(), |x: &[f64], y: &mut [f64]| {
//!         y[0] = x[0] * x[0];
//!         Ok(())
//!     });
//!     Some(Arc::new(f))
//! }
//!
//! let mut registry = FunctionRegistry::new();
//! registry.register("square", square);
//!
//! let mut problem = Problem::new();
//! let f = square(&symbios_pareto::exchange::FunctionSpec {
//!     inputs: vec![ElementProperties::new("x")],
//!     outputs: vec![ElementProperties::new("y")],
//!     ..Default::default()
//! }).unwrap();
//! problem.append_function(f, &[], &[], &[], &[]).unwrap();
//! problem.process_problem_definition();
//!
//! let text = problem_to_json_string(&problem);
//! let copy = problem_from_json(&text, &registry).unwrap();
//! assert_eq!(copy.objective_vec_size(), 1);
//! ```
use crate::distribution::UncertaintyMapping;
use crate::element::{values, Element, ElementProperties};
use crate::error::{Error, Result};
use crate::function::{BoxConstraints, Function};
use crate::problem::{Maps, Problem, ProblemStatus, Space, SpaceMap};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Keys an import record must carry.
pub const REQUIRED_KEYS: [&str; 20] = [
    "funcTypes",
    "funcPathes",
    "funcPrpts",
    "iprts",
    "oprts",
    "lbs",
    "ubs",
    "pVector",
    "setGoals",
    "goals",
    "priorities",
    "thresholds",
    "f2dMap",
    "f2pMap",
    "f2oMap",
    "f2cMap",
    "f2uMap",
    "dVecUncertainties",
    "funcOutUncertainties",
    "isExternalParameters",
];

/// Everything needed to recreate one function.
#[derive(Debug, Clone, Default)]
pub struct FunctionSpec {
    pub type_name: String,
    pub path: String,
    pub properties: Map<String, Value>,
    pub inputs: Vec<ElementProperties>,
    pub outputs: Vec<ElementProperties>,
}

type Factory = Box<dyn Fn(&FunctionSpec) -> Option<Arc<dyn Function>> + Send + Sync>;

/// Factories for function types known to the importer.
#[derive(Default)]
pub struct FunctionRegistry {
    factories: HashMap<String, Factory>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn(&FunctionSpec) -> Option<Arc<dyn Function>> + Send + Sync + 'static,
    {
        self.factories.insert(type_name.into(), Box::new(factory));
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    pub fn create(&self, spec: &FunctionSpec) -> Result<Arc<dyn Function>> {
        self.factories
            .get(&spec.type_name)
            .and_then(|factory| factory(spec))
            .ok_or_else(|| Error::UnknownFunction(spec.type_name.clone()))
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProblemRecord {
    #[serde(default)]
    problem_name: String,
    func_types: Vec<String>,
    #[serde(rename = "funcPathes")]
    func_paths: Vec<String>,
    func_prpts: Vec<Value>,
    iprts: Vec<Vec<ElementProperties>>,
    oprts: Vec<Vec<ElementProperties>>,
    lbs: Option<Vec<f64>>,
    ubs: Option<Vec<f64>>,
    p_vector: Vec<Element>,
    set_goals: Vec<bool>,
    goals: Vec<f64>,
    priorities: Vec<u32>,
    thresholds: Vec<f64>,
    f2d_map: Vec<Vec<i64>>,
    f2p_map: Vec<Vec<i64>>,
    f2o_map: Vec<Vec<i64>>,
    f2c_map: Vec<Vec<i64>>,
    f2u_map: Vec<Vec<i64>>,
    d_vec_uncertainties: Vec<Option<UncertaintyMapping>>,
    func_out_uncertainties: Vec<Vec<Option<UncertaintyMapping>>>,
    is_external_parameters: Vec<bool>,
}

fn decode_map(rows: &[Vec<i64>]) -> SpaceMap {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|&e| usize::try_from(e).ok())
                .collect()
        })
        .collect()
}

fn encode_map(map: &[Vec<Option<usize>>]) -> Vec<Vec<i64>> {
    map.iter()
        .map(|row| {
            row.iter()
                .map(|e| e.map_or(-1, |j| j as i64))
                .collect()
        })
        .collect()
}

/// Function-local indices connected in row `func` of `map`.
fn connected(map: &SpaceMap, func: usize) -> Vec<usize> {
    map.get(func)
        .map(|row| row.iter().flatten().copied().collect())
        .unwrap_or_default()
}

fn undefined(reason: &str) -> ProblemStatus {
    warn!(reason, "problem import failed");
    ProblemStatus::Undefined
}

/// Rebuild a problem from its JSON record.
///
/// Structural problems with the record itself give `Err(Undefined)`; a
/// record that parses but fails validation gives the validation status.
pub fn problem_from_json(
    text: &str,
    registry: &FunctionRegistry,
) -> std::result::Result<Problem, ProblemStatus> {
    let value: Value = serde_json::from_str(text).map_err(|_| undefined("malformed JSON"))?;
    problem_from_value(&value, registry)
}

pub fn problem_from_value(
    value: &Value,
    registry: &FunctionRegistry,
) -> std::result::Result<Problem, ProblemStatus> {
    let obj = value
        .as_object()
        .ok_or_else(|| undefined("record is not an object"))?;
    if let Some(key) = REQUIRED_KEYS.iter().find(|k| !obj.contains_key(**k)) {
        warn!(key, "problem record is missing a required key");
        return Err(ProblemStatus::Undefined);
    }
    let record = ProblemRecord::deserialize(value).map_err(|err| {
        warn!(%err, "problem record has malformed fields");
        ProblemStatus::Undefined
    })?;

    let n_funcs = record.func_types.len();
    if record.func_paths.len() != n_funcs
        || record.func_prpts.len() != n_funcs
        || record.iprts.len() != n_funcs
        || record.oprts.len() != n_funcs
    {
        return Err(undefined("function lists disagree in length"));
    }
    let bounds = match (record.lbs, record.ubs) {
        (Some(lbs), Some(ubs)) => Some(
            BoxConstraints::from_values(&lbs, &ubs)
                .map_err(|_| undefined("lower and upper bounds disagree in length"))?,
        ),
        (None, None) => None,
        _ => return Err(undefined("only one side of the bounds is present")),
    };

    let maps = Maps {
        f2d: decode_map(&record.f2d_map),
        f2p: decode_map(&record.f2p_map),
        f2o: decode_map(&record.f2o_map),
        f2c: decode_map(&record.f2c_map),
        f2u: decode_map(&record.f2u_map),
    };

    let mut problem = Problem::new().with_name(record.problem_name);
    let specs = record
        .func_types
        .into_iter()
        .zip(record.func_paths)
        .zip(record.func_prpts)
        .zip(record.iprts.into_iter().zip(record.oprts));
    for (i, (((type_name, path), blob), (inputs, outputs))) in specs.enumerate() {
        let spec = FunctionSpec {
            type_name,
            path,
            properties: match blob {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            inputs,
            outputs,
        };
        let func = registry.create(&spec).map_err(|err| {
            warn!(%err, "problem import failed");
            ProblemStatus::Undefined
        })?;
        problem
            .append_function(
                func,
                &connected(&maps.f2p, i),
                &connected(&maps.f2c, i),
                &connected(&maps.f2o, i),
                &connected(&maps.f2u, i),
            )
            .map_err(|_| undefined("map entry outside a function's arity"))?;
    }
    problem.define_function_maps(maps);

    if let Some(bounds) = bounds {
        problem.define_box_constraints(bounds);
    }
    problem.define_parameter_vec(record.p_vector);
    problem.define_set_goal_vec(record.set_goals);
    problem.define_goal_vec(record.goals.into_iter().map(Element::new).collect());
    problem.define_priority_vec(record.priorities);
    problem.define_threshold_vec(record.thresholds.into_iter().map(Element::new).collect());
    problem.define_d_vec_uncertainties(record.d_vec_uncertainties);
    problem.define_func_out_uncertainties(record.func_out_uncertainties);
    problem.define_external_parameters(record.is_external_parameters);

    match problem.process_problem_definition() {
        ProblemStatus::FullyDefined => {
            debug!(problem = problem.name(), functions = n_funcs, "problem imported");
            Ok(problem)
        }
        status => Err(status),
    }
}

/// Export record of `problem`. Vectors that are not defined yet are written
/// empty.
pub fn problem_to_json(problem: &Problem) -> Value {
    let funcs = problem.functions();
    let (lbs, ubs) = match problem.box_constraints() {
        Some(b) => (json!(values(b.lower_bounds())), json!(values(b.upper_bounds()))),
        None => (Value::Null, Value::Null),
    };

    json!({
        "problemName": problem.name(),
        "funcTypes": funcs.iter().map(|f| f.type_name()).collect::<Vec<_>>(),
        "funcPathes": funcs.iter().map(|f| f.path()).collect::<Vec<_>>(),
        "funcPrpts": funcs.iter().map(|f| Value::Object(f.properties())).collect::<Vec<_>>(),
        "iprts": funcs.iter().map(|f| f.input_properties()).collect::<Vec<_>>(),
        "oprts": funcs.iter().map(|f| f.output_properties()).collect::<Vec<_>>(),
        "dIDs": problem.ids(Space::Decision),
        "pIDs": problem.ids(Space::Parameter),
        "oIDs": problem.ids(Space::Objective),
        "cIDs": problem.ids(Space::Constraint),
        "uIDs": problem.ids(Space::Unused),
        "lbs": lbs,
        "ubs": ubs,
        "pVector": problem.parameter_vec(),
        "setGoals": problem.set_goal_vec(),
        "goals": values(problem.goal_vec()),
        "priorities": problem.priority_vec(),
        "thresholds": values(problem.threshold_vec()),
        "isExternalParameters": problem.is_external_parameters(),
        "dPrpts": problem.properties(Space::Decision),
        "pPrpts": problem.properties(Space::Parameter),
        "oPrpts": problem.properties(Space::Objective),
        "cPrpts": problem.properties(Space::Constraint),
        "uPrpts": problem.properties(Space::Unused),
        "f2dMap": encode_map(problem.map(Space::Decision)),
        "f2pMap": encode_map(problem.map(Space::Parameter)),
        "f2oMap": encode_map(problem.map(Space::Objective)),
        "f2cMap": encode_map(problem.map(Space::Constraint)),
        "f2uMap": encode_map(problem.map(Space::Unused)),
        "dVecUncertainties": problem.d_vec_uncertainties(),
        "funcOutUncertainties": problem.func_out_uncertainties(),
    })
}

pub fn problem_to_json_string(problem: &Problem) -> String {
    problem_to_json(problem).to_string()
}
