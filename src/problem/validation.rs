//! Validation pipeline phases. Each phase takes ownership of a draft
//! definition and either hands back the next draft or rejects it.
use super::{Definition, ExternalLink, Maps, OutputBinding, OutputRole, Space, SpaceMap};
use crate::element::{Element, ElementProperties, OptimizationType};
use crate::error::DefinitionError;
use crate::function::BoxConstraints;

type Phase = fn(Definition) -> Result<Definition, DefinitionError>;

const PHASES: [Phase; 13] = [
    require_functions,
    build_maps,
    check_map_lengths,
    derive_spaces,
    check_inputs,
    check_outputs,
    populate_properties,
    box_constraints,
    extreme_vectors,
    goal_vectors,
    uncertainties,
    parameters,
    link_functions,
];

pub(super) fn validate(def: Definition) -> Result<Definition, DefinitionError> {
    PHASES.iter().try_fold(def, |draft, phase| phase(draft))
}

fn maps(def: &Definition) -> &Maps {
    &def.maps
}

fn space_len(def: &Definition, space: Space) -> usize {
    maps(def).get(space).first().map_or(0, Vec::len)
}

fn require_functions(def: Definition) -> Result<Definition, DefinitionError> {
    if def.functions.is_empty() {
        return Err(DefinitionError::FunctionVec);
    }
    Ok(def)
}

/// Rebuild stale maps by deduplicating property ids in append order.
fn build_maps(mut def: Definition) -> Result<Definition, DefinitionError> {
    if !def.maps_stale {
        return Ok(def);
    }

    let mut ids: [Vec<String>; 5] = Default::default();
    let mut push_unique = |space: Space, id: &str| {
        let list = &mut ids[space.index()];
        if !list.iter().any(|x| x == id) {
            list.push(id.to_string());
        }
    };
    for (i, func) in def.functions.iter().enumerate() {
        for (j, input) in func.input_properties().iter().enumerate() {
            let space = if def.input_is_param[i][j] {
                Space::Parameter
            } else {
                Space::Decision
            };
            push_unique(space, &input.id);
        }
        for (j, output) in func.output_properties().iter().enumerate() {
            let is_obj = def.output_is_objective[i][j];
            let is_con = def.output_is_constraint[i][j];
            if is_obj {
                push_unique(Space::Objective, &output.id);
            }
            if is_con {
                push_unique(Space::Constraint, &output.id);
            }
            if !is_obj && !is_con {
                push_unique(Space::Unused, &output.id);
            }
        }
    }

    let mut maps = Maps::default();
    for space in Space::ALL {
        let list = &ids[space.index()];
        let map: SpaceMap = def
            .functions
            .iter()
            .map(|func| {
                let props = if space.is_input() {
                    func.input_properties()
                } else {
                    func.output_properties()
                };
                list.iter()
                    .map(|id| props.iter().rposition(|p| &p.id == id))
                    .collect()
            })
            .collect();
        *maps.get_mut(space) = map;
    }

    def.maps = maps;
    def.maps_stale = false;
    def.reset_derived();
    Ok(def)
}

/// Every map has one row per function, rows agree in length, entries stay
/// within the function's arity and defined properties match the maps.
fn check_map_lengths(def: Definition) -> Result<Definition, DefinitionError> {
    let n_funcs = def.functions.len();
    let maps = maps(&def);
    for space in Space::ALL {
        let map = maps.get(space);
        if map.len() != n_funcs {
            return Err(space.map_error());
        }
        let len = map[0].len();
        for (row, func) in map.iter().zip(&def.functions) {
            if row.len() != len {
                return Err(space.map_error());
            }
            let arity = if space.is_input() {
                func.n_inputs()
            } else {
                func.n_outputs()
            };
            if row.iter().flatten().any(|&j| j >= arity) {
                return Err(space.map_error());
            }
        }
        if let Some(props) = &def.properties[space.index()] {
            if props.len() != len {
                return Err(space.map_error());
            }
        }
    }
    Ok(def)
}

/// Grow `map` so that function `i` maps unified element `k` to local `j`,
/// appending `prop` to `props` when its id is new.
fn derive_entry(
    map: &mut SpaceMap,
    props: &mut Vec<ElementProperties>,
    i: usize,
    j: usize,
    prop: &ElementProperties,
) {
    let k = match props.iter().position(|p| p.id == prop.id) {
        Some(k) => k,
        None => {
            props.push(prop.clone());
            props.len() - 1
        }
    };
    if map[i].len() <= k {
        map[i].resize(k + 1, None);
    }
    map[i][k] = Some(j);
}

/// Fill an empty decision or objective space straight from the functions.
///
/// Only legal when the sibling spaces are empty as well: decision variables
/// are derived when there are no parameters, objectives when there are
/// neither constraints nor unused outputs.
fn derive_spaces(mut def: Definition) -> Result<Definition, DefinitionError> {
    if space_len(&def, Space::Decision) == 0 {
        if space_len(&def, Space::Parameter) != 0 {
            return Err(DefinitionError::DVecMaps);
        }
        let mut map = maps(&def).f2d.clone();
        let mut props = def.properties[Space::Decision.index()]
            .clone()
            .unwrap_or_default();
        for (i, func) in def.functions.iter().enumerate() {
            for (j, input) in func.input_properties().iter().enumerate() {
                derive_entry(&mut map, &mut props, i, j, input);
            }
        }
        for row in &mut map {
            row.resize(props.len(), None);
        }
        def.maps.f2d = map;
        def.properties[Space::Decision.index()] = Some(props);
    }

    if space_len(&def, Space::Objective) == 0 {
        if space_len(&def, Space::Constraint) != 0 || space_len(&def, Space::Unused) != 0 {
            return Err(DefinitionError::OVecMaps);
        }
        let mut map = maps(&def).f2o.clone();
        let mut props = def.properties[Space::Objective.index()]
            .clone()
            .unwrap_or_default();
        for (i, func) in def.functions.iter().enumerate() {
            for (j, output) in func.output_properties().iter().enumerate() {
                derive_entry(&mut map, &mut props, i, j, output);
            }
        }
        for row in &mut map {
            row.resize(props.len(), None);
        }
        def.maps.f2o = map;
        def.properties[Space::Objective.index()] = Some(props);
    }
    Ok(def)
}

/// Each function input is exactly one decision variable or one parameter.
fn check_inputs(def: Definition) -> Result<Definition, DefinitionError> {
    let maps = maps(&def);
    for (i, func) in def.functions.iter().enumerate() {
        for j in 0..func.n_inputs() {
            let n_d = maps.f2d[i].iter().filter(|e| **e == Some(j)).count();
            let n_p = maps.f2p[i].iter().filter(|e| **e == Some(j)).count();
            match (n_d, n_p) {
                (1, 0) | (0, 1) => {}
                (_, 0) => return Err(DefinitionError::DVecMaps),
                _ => return Err(DefinitionError::PVecMaps),
            }
        }
    }
    Ok(def)
}

/// Each objective, constraint and unused output has at most one producer.
fn check_outputs(def: Definition) -> Result<Definition, DefinitionError> {
    let maps = maps(&def);
    for space in [Space::Objective, Space::Constraint, Space::Unused] {
        let map = maps.get(space);
        for k in 0..space_len(&def, space) {
            if map.iter().filter(|row| row[k].is_some()).count() > 1 {
                return Err(space.map_error());
            }
        }
    }
    Ok(def)
}

fn populate_properties(mut def: Definition) -> Result<Definition, DefinitionError> {
    for space in Space::ALL {
        let mut props = vec![ElementProperties::default(); space_len(&def, space)];
        for (func, row) in def.functions.iter().zip(maps(&def).get(space)) {
            let local = if space.is_input() {
                func.input_properties()
            } else {
                func.output_properties()
            };
            for (k, entry) in row.iter().enumerate() {
                if let Some(p) = entry.and_then(|j| local.get(j)) {
                    props[k] = p.clone();
                }
            }
        }
        if props.iter().any(|p| p.id.is_empty()) {
            return Err(space.map_error());
        }

        let slot = &mut def.properties[space.index()];
        let props = slot.get_or_insert(props);
        if matches!(space, Space::Objective | Space::Constraint) {
            for p in props.iter_mut() {
                if p.optimization_type == OptimizationType::NonOptimization {
                    p.optimization_type = OptimizationType::Minimization;
                }
            }
        }
    }
    Ok(def)
}

fn box_constraints(mut def: Definition) -> Result<Definition, DefinitionError> {
    let d_props = def.properties[Space::Decision.index()]
        .clone()
        .unwrap_or_default();
    match def.box_constraints.as_mut() {
        Some(bounds) => {
            if bounds.size() != d_props.len() {
                return Err(DefinitionError::BoxConstraints);
            }
            bounds.retype(&d_props);
        }
        None => {
            let mut bounds = BoxConstraints::from_properties(&d_props);
            for (func, row) in def.functions.iter().zip(&maps(&def).f2d) {
                let own = func.bounds();
                for (k, entry) in row.iter().enumerate() {
                    let Some(j) = *entry else { continue };
                    if let (Some(lb), Some(ub)) = (own.lower_bound(j), own.upper_bound(j)) {
                        let mut lb = lb.clone();
                        let mut ub = ub.clone();
                        lb.define_type(d_props[k].element_type);
                        ub.define_type(d_props[k].element_type);
                        bounds
                            .define_lower_bound(k, lb)
                            .and_then(|_| bounds.define_upper_bound(k, ub))
                            .map_err(|_| DefinitionError::BoxConstraints)?;
                    }
                }
            }
            def.box_constraints = Some(bounds);
        }
    }
    Ok(def)
}

/// Validate a defined vector against `props` and retype it, or build the
/// default with `make`.
fn typed_vector(
    slot: &mut Option<Vec<Element>>,
    props: &[ElementProperties],
    make: fn(crate::element::ElementType) -> Element,
    err: DefinitionError,
) -> Result<(), DefinitionError> {
    match slot {
        Some(v) => {
            if v.len() != props.len() {
                return Err(err);
            }
            for (e, p) in v.iter_mut().zip(props) {
                e.define_type(p.element_type);
            }
        }
        None => *slot = Some(props.iter().map(|p| make(p.element_type)).collect()),
    }
    Ok(())
}

/// The ideal starts at the highest value and the anti-ideal and nadir at the
/// lowest, so that running updates move them toward the observed extremes.
fn extreme_vectors(mut def: Definition) -> Result<Definition, DefinitionError> {
    let o_props = def.properties[Space::Objective.index()]
        .clone()
        .unwrap_or_default();
    typed_vector(&mut def.ideal, &o_props, Element::highest, DefinitionError::IdealVec)?;
    typed_vector(
        &mut def.anti_ideal,
        &o_props,
        Element::lowest,
        DefinitionError::AntiIdealVec,
    )?;
    typed_vector(&mut def.nadir, &o_props, Element::lowest, DefinitionError::NadirVec)?;
    Ok(def)
}

fn goal_vectors(mut def: Definition) -> Result<Definition, DefinitionError> {
    let o_props = def.properties[Space::Objective.index()]
        .clone()
        .unwrap_or_default();
    let c_props = def.properties[Space::Constraint.index()]
        .clone()
        .unwrap_or_default();
    let n_obj = o_props.len();

    match def.set_goals.as_ref().map(Vec::len) {
        Some(len) if len != n_obj => return Err(DefinitionError::SetGoalVec),
        Some(_) => {}
        None => def.set_goals = Some(vec![false; n_obj]),
    }
    typed_vector(&mut def.goals, &o_props, Element::lowest, DefinitionError::GoalVec)?;
    match def.priorities.as_ref().map(Vec::len) {
        Some(len) if len != n_obj => return Err(DefinitionError::PriorityVec),
        Some(_) => {}
        None => def.priorities = Some(vec![1; n_obj]),
    }
    typed_vector(
        &mut def.thresholds,
        &c_props,
        Element::highest,
        DefinitionError::ThresholdVec,
    )?;
    Ok(def)
}

fn uncertainties(mut def: Definition) -> Result<Definition, DefinitionError> {
    let n_d = space_len(&def, Space::Decision);
    match def.d_uncertainties.as_ref().map(Vec::len) {
        Some(len) if len != n_d => return Err(DefinitionError::UncertaintyVec),
        Some(_) => {}
        None => def.d_uncertainties = Some(vec![None; n_d]),
    }
    match &def.fout_uncertainties {
        Some(v) => {
            let consistent = v.len() == def.functions.len()
                && v.iter()
                    .zip(&def.functions)
                    .all(|(row, f)| row.len() == f.n_outputs());
            if !consistent {
                return Err(DefinitionError::FuncOutUncertaintyVec);
            }
        }
        None => {
            def.fout_uncertainties = Some(
                def.functions
                    .iter()
                    .map(|f| vec![None; f.n_outputs()])
                    .collect(),
            );
        }
    }
    Ok(def)
}

fn parameters(mut def: Definition) -> Result<Definition, DefinitionError> {
    let p_props = def.properties[Space::Parameter.index()]
        .clone()
        .unwrap_or_default();
    typed_vector(
        &mut def.parameters,
        &p_props,
        |t| Element::typed(t, 0.0),
        DefinitionError::ParameterVec,
    )?;
    if def.external.len() != p_props.len() {
        def.external = vec![false; p_props.len()];
    }
    Ok(def)
}

/// Resolve output bindings, external-parameter links and the evaluation
/// order that puts producers before consumers.
fn link_functions(mut def: Definition) -> Result<Definition, DefinitionError> {
    let n_funcs = def.functions.len();
    let maps = maps(&def).clone();
    let o_props = def.properties[Space::Objective.index()]
        .clone()
        .unwrap_or_default();
    let c_props = def.properties[Space::Constraint.index()]
        .clone()
        .unwrap_or_default();
    let p_props = def.properties[Space::Parameter.index()]
        .clone()
        .unwrap_or_default();

    let find = |map: &SpaceMap, i: usize, j: usize| map[i].iter().position(|e| *e == Some(j));
    def.bindings = def
        .functions
        .iter()
        .enumerate()
        .map(|(i, func)| {
            (0..func.n_outputs())
                .map(|j| {
                    let objective = find(&maps.f2o, i, j);
                    let constraint = find(&maps.f2c, i, j);
                    let negate = match (objective, constraint) {
                        (Some(k), _) => o_props[k].is_maximization(),
                        (None, Some(k)) => c_props[k].is_maximization(),
                        (None, None) => false,
                    };
                    OutputBinding {
                        objective,
                        constraint,
                        unused: find(&maps.f2u, i, j),
                        negate,
                    }
                })
                .collect()
        })
        .collect();

    def.links = vec![None; p_props.len()];
    def.dependents = vec![Vec::new(); n_funcs];
    if n_funcs > 1 && def.external.iter().any(|e| *e) {
        for (k, prop) in p_props.iter().enumerate() {
            if !def.external[k] {
                continue;
            }
            let consumers: Vec<usize> = (0..n_funcs).filter(|&i| maps.f2p[i][k].is_some()).collect();
            let producer = (0..n_funcs)
                .filter(|i| !consumers.contains(i))
                .find_map(|i| {
                    def.functions[i]
                        .output_properties()
                        .iter()
                        .position(|o| o.id == prop.id)
                        .map(|j| (i, j))
                });
            let Some((function, output)) = producer else {
                continue;
            };
            let binding = def.bindings[function][output];
            let role = if binding.objective.is_some() {
                OutputRole::Objective
            } else if binding.constraint.is_some() {
                OutputRole::Constraint
            } else {
                OutputRole::Unused
            };
            def.links[k] = Some(ExternalLink {
                function,
                output,
                role,
                negate: binding.negate,
            });
            for c in consumers {
                if !def.dependents[function].contains(&c) {
                    def.dependents[function].push(c);
                }
            }
        }
    }

    // Kahn's algorithm, lowest index first so unlinked problems keep append order.
    let mut in_degree = vec![0usize; n_funcs];
    for consumers in &def.dependents {
        for &c in consumers {
            in_degree[c] += 1;
        }
    }
    let mut order = Vec::with_capacity(n_funcs);
    let mut done = vec![false; n_funcs];
    while order.len() < n_funcs {
        let Some(next) = (0..n_funcs).find(|&i| !done[i] && in_degree[i] == 0) else {
            return Err(DefinitionError::ExternalParameters);
        };
        done[next] = true;
        order.push(next);
        for &c in &def.dependents[next] {
            in_degree[c] -= 1;
        }
    }
    def.evaluation_order = order;
    Ok(def)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementProperties;
    use crate::function::{ClosureFunction, Function};
    use std::sync::Arc;

    fn func(inputs: &[&str], outputs: &[&str]) -> Arc<dyn Function> {
        Arc::new(ClosureFunction::new(
            "mock",
            inputs.iter().map(|id| ElementProperties::new(*id)).collect(),
            outputs.iter().map(|id| ElementProperties::new(*id)).collect(),
            |_: &[f64], _: &mut [f64]| Ok(()),
        ))
    }

    fn draft(funcs: Vec<Arc<dyn Function>>) -> Definition {
        let mut def = Definition::default();
        for f in funcs {
            def.input_is_param.push(vec![false; f.n_inputs()]);
            def.output_is_objective.push(vec![true; f.n_outputs()]);
            def.output_is_constraint.push(vec![false; f.n_outputs()]);
            def.functions.push(f);
        }
        def.maps_stale = true;
        def
    }

    #[test]
    fn build_maps_deduplicates_ids_in_append_order() {
        let def = draft(vec![func(&["x", "y"], &["f"]), func(&["y", "z"], &["g"])]);
        let def = build_maps(def).unwrap();
        let maps = def.maps;
        assert_eq!(maps.f2d[0], vec![Some(0), Some(1), None]);
        assert_eq!(maps.f2d[1], vec![None, Some(0), Some(1)]);
        assert_eq!(maps.f2o[1], vec![None, Some(0)]);
    }

    #[test]
    fn shared_objective_is_rejected_by_output_check() {
        let def = draft(vec![func(&["x"], &["f"]), func(&["y"], &["f"])]);
        let def = build_maps(def).unwrap();
        let def = check_map_lengths(def).unwrap();
        assert_eq!(check_outputs(def).err(), Some(DefinitionError::OVecMaps));
    }

    #[test]
    fn map_entries_beyond_arity_are_rejected() {
        let mut def = draft(vec![func(&["x"], &["f"])]);
        def.maps = Maps {
            f2d: vec![vec![Some(3)]],
            f2p: vec![vec![]],
            f2o: vec![vec![Some(0)]],
            f2c: vec![vec![]],
            f2u: vec![vec![]],
        };
        assert_eq!(check_map_lengths(def).err(), Some(DefinitionError::DVecMaps));
    }

    #[test]
    fn empty_decision_space_is_derived_from_inputs() {
        let mut def = draft(vec![func(&["a", "b"], &["f"])]);
        def.maps = Maps {
            f2d: vec![vec![]],
            f2p: vec![vec![]],
            f2o: vec![vec![Some(0)]],
            f2c: vec![vec![]],
            f2u: vec![vec![]],
        };
        let def = derive_spaces(def).unwrap();
        assert_eq!(def.maps.f2d[0], vec![Some(0), Some(1)]);
        let ids: Vec<_> = def.properties[0]
            .as_ref()
            .unwrap()
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn empty_objectives_with_constraints_cannot_be_derived() {
        let mut def = draft(vec![func(&["a"], &["c"])]);
        def.maps = Maps {
            f2d: vec![vec![Some(0)]],
            f2p: vec![vec![]],
            f2o: vec![vec![]],
            f2c: vec![vec![Some(0)]],
            f2u: vec![vec![]],
        };
        assert_eq!(derive_spaces(def).err(), Some(DefinitionError::OVecMaps));
    }
}
