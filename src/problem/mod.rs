//! The structural model of an optimization problem.
//!
//! A [`Problem`] is an ordered list of [`Function`]s plus five index maps
//! that wire each function's inputs and outputs into unified spaces:
//!
//! - decision variables and parameters (function inputs),
//! - objectives, constraints and unused outputs (function outputs).
//!
//! Each map holds, per function, one entry per element of the unified space:
//! `Some(j)` when the function's local input/output `j` is that element,
//! `None` otherwise.
//!
//! # Lifecycle
//!
//! Problems are built incrementally with [`Problem::append_function`] and the
//! `define_*` setters, which leave the status at
//! [`ProblemStatus::UnprocessedChanges`]. [`Problem::process_problem_definition`]
//! then runs the validation pipeline on a draft copy of the definition. Each
//! phase is a pure function from one draft to the next; the first failing
//! phase rejects the draft with its own [`DefinitionError`], and only a draft
//! that passes every phase is committed as [`ProblemStatus::FullyDefined`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use symbios_pareto::{ClosureFunction, ElementProperties, Problem, ProblemStatus};
//!
//! let f = ClosureFunction::new(
//!     "schaffer",
//!     vec![ElementProperties::new("x")],
//!     vec![ElementProperties::new("f1"), ElementProperties::new("f2")],
//!     |x: &[f64], y: &mut [f64]| {
//!         y[0] = x[0] * x[0];
//!         y[1] = (x[0] - 2.0) * (x[0] - 2.0);
//!         Ok(())
//!     },
//! );
//!
//! let mut problem = Problem::new();
//! problem.append_function(Arc::new(f), &[], &[], &[], &[]).unwrap();
//! assert_eq!(problem.process_problem_definition(), ProblemStatus::FullyDefined);
//! assert_eq!(problem.objective_vec_size(), 2);
//! ```
use crate::distribution::UncertaintyMapping;
use crate::element::{Element, ElementProperties, ElementType, OptimizationType};
use crate::error::{check_index, DefinitionError, Result};
use crate::function::{BoxConstraints, Function};
use std::sync::Arc;
use tracing::{debug, warn};

mod validation;

/// Per-function index map into one unified space.
pub type SpaceMap = Vec<Vec<Option<usize>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemStatus {
    Undefined,
    UnprocessedChanges,
    FullyDefined,
    IllDefined(DefinitionError),
}

impl ProblemStatus {
    pub fn is_fully_defined(self) -> bool {
        self == ProblemStatus::FullyDefined
    }
}

/// The five unified spaces of a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Space {
    Decision,
    Parameter,
    Objective,
    Constraint,
    Unused,
}

impl Space {
    pub const ALL: [Space; 5] = [
        Space::Decision,
        Space::Parameter,
        Space::Objective,
        Space::Constraint,
        Space::Unused,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    fn map_error(self) -> DefinitionError {
        match self {
            Space::Decision => DefinitionError::DVecMaps,
            Space::Parameter => DefinitionError::PVecMaps,
            Space::Objective => DefinitionError::OVecMaps,
            Space::Constraint => DefinitionError::CVecMaps,
            Space::Unused => DefinitionError::UVecMaps,
        }
    }

    fn is_input(self) -> bool {
        matches!(self, Space::Decision | Space::Parameter)
    }
}

/// The five function-to-space maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Maps {
    pub f2d: SpaceMap,
    pub f2p: SpaceMap,
    pub f2o: SpaceMap,
    pub f2c: SpaceMap,
    pub f2u: SpaceMap,
}

impl Maps {
    pub fn get(&self, space: Space) -> &SpaceMap {
        match space {
            Space::Decision => &self.f2d,
            Space::Parameter => &self.f2p,
            Space::Objective => &self.f2o,
            Space::Constraint => &self.f2c,
            Space::Unused => &self.f2u,
        }
    }

    pub fn get_mut(&mut self, space: Space) -> &mut SpaceMap {
        match space {
            Space::Decision => &mut self.f2d,
            Space::Parameter => &mut self.f2p,
            Space::Objective => &mut self.f2o,
            Space::Constraint => &mut self.f2c,
            Space::Unused => &mut self.f2u,
        }
    }
}

/// Role a function output plays in the unified output spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputRole {
    Objective,
    Constraint,
    Unused,
}

/// An external parameter fed by another function's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExternalLink {
    pub function: usize,
    pub output: usize,
    pub role: OutputRole,
    /// The producing output is stored negated (maximized role).
    pub negate: bool,
}

/// Where one function output lands in the unified spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputBinding {
    pub objective: Option<usize>,
    pub constraint: Option<usize>,
    pub unused: Option<usize>,
    /// Stored values are negated so every stored output is minimized.
    pub negate: bool,
}

/// Everything a problem is made of. `None` marks a vector that the
/// validation pipeline still has to build; `maps_stale` does the same for
/// the maps.
#[derive(Clone, Default)]
pub(crate) struct Definition {
    pub functions: Vec<Arc<dyn Function>>,
    pub input_is_param: Vec<Vec<bool>>,
    pub output_is_objective: Vec<Vec<bool>>,
    pub output_is_constraint: Vec<Vec<bool>>,
    pub maps: Maps,
    pub maps_stale: bool,
    pub properties: [Option<Vec<ElementProperties>>; 5],
    pub box_constraints: Option<BoxConstraints>,
    pub ideal: Option<Vec<Element>>,
    pub anti_ideal: Option<Vec<Element>>,
    pub nadir: Option<Vec<Element>>,
    pub set_goals: Option<Vec<bool>>,
    pub goals: Option<Vec<Element>>,
    pub priorities: Option<Vec<u32>>,
    pub thresholds: Option<Vec<Element>>,
    pub d_uncertainties: Option<Vec<Option<UncertaintyMapping>>>,
    pub fout_uncertainties: Option<Vec<Vec<Option<UncertaintyMapping>>>>,
    pub parameters: Option<Vec<Element>>,
    pub external: Vec<bool>,
    // Derived by the last phase.
    pub links: Vec<Option<ExternalLink>>,
    pub bindings: Vec<Vec<OutputBinding>>,
    pub evaluation_order: Vec<usize>,
    pub dependents: Vec<Vec<usize>>,
}

impl Definition {
    /// Forget every vector derived from the maps.
    fn reset_derived(&mut self) {
        self.properties = Default::default();
        self.box_constraints = None;
        self.ideal = None;
        self.anti_ideal = None;
        self.nadir = None;
        self.set_goals = None;
        self.goals = None;
        self.priorities = None;
        self.thresholds = None;
        self.d_uncertainties = None;
        self.fout_uncertainties = None;
        self.parameters = None;
    }
}

#[derive(Clone)]
pub struct Problem {
    name: String,
    description: String,
    def: Definition,
    status: ProblemStatus,
}

impl Default for Problem {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Problem")
            .field("name", &self.name)
            .field("functions", &self.def.functions.len())
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

fn slice<T>(v: &Option<Vec<T>>) -> &[T] {
    v.as_deref().unwrap_or(&[])
}

impl Problem {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            def: Definition {
                maps_stale: true,
                ..Definition::default()
            },
            status: ProblemStatus::Undefined,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn define_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn define_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn status(&self) -> ProblemStatus {
        self.status
    }

    fn touch(&mut self) {
        self.status = ProblemStatus::UnprocessedChanges;
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Append a function and classify its inputs and outputs.
    ///
    /// Inputs listed in `param_inputs` are parameters, all others decision
    /// variables. Outputs listed in `unused_outputs` are unused; the others
    /// follow the constraint and objective lists (an output may be both).
    /// With no objective list, every output that is neither a constraint nor
    /// unused becomes an objective.
    ///
    /// An index outside the function's arity rejects the call and leaves the
    /// problem unchanged.
    pub fn append_function(
        &mut self,
        func: Arc<dyn Function>,
        param_inputs: &[usize],
        constraint_outputs: &[usize],
        objective_outputs: &[usize],
        unused_outputs: &[usize],
    ) -> Result<()> {
        let n_in = func.n_inputs();
        let n_out = func.n_outputs();
        let checks = [
            ("parameter input", param_inputs, n_in),
            ("constraint output", constraint_outputs, n_out),
            ("objective output", objective_outputs, n_out),
            ("unused output", unused_outputs, n_out),
        ];
        for (what, indices, len) in checks {
            for &idx in indices {
                if let Err(err) = check_index(what, idx, len) {
                    warn!(function = func.type_name(), %err, "append_function rejected");
                    return Err(err);
                }
            }
        }

        let is_param = (0..n_in).map(|j| param_inputs.contains(&j)).collect();
        let mut is_con: Vec<bool> = (0..n_out).map(|j| constraint_outputs.contains(&j)).collect();
        let mut is_obj: Vec<bool> = if objective_outputs.is_empty() {
            is_con.iter().map(|c| !c).collect()
        } else {
            (0..n_out).map(|j| objective_outputs.contains(&j)).collect()
        };
        for &j in unused_outputs {
            is_obj[j] = false;
            is_con[j] = false;
        }

        self.def.functions.push(func);
        self.def.input_is_param.push(is_param);
        self.def.output_is_objective.push(is_obj);
        self.def.output_is_constraint.push(is_con);
        self.def.maps_stale = true;
        self.touch();
        Ok(())
    }

    /// Install explicit maps instead of deriving them from property ids.
    pub fn define_function_maps(&mut self, maps: Maps) {
        self.def.maps = maps;
        self.def.maps_stale = false;
        self.touch();
    }

    /// Run the validation pipeline. Idempotent once fully defined.
    pub fn process_problem_definition(&mut self) -> ProblemStatus {
        if self.status == ProblemStatus::FullyDefined {
            return self.status;
        }
        match validation::validate(self.def.clone()) {
            Ok(def) => {
                self.def = def;
                self.status = ProblemStatus::FullyDefined;
                debug!(
                    problem = %self.name,
                    functions = self.def.functions.len(),
                    decision = self.decision_vec_size(),
                    objectives = self.objective_vec_size(),
                    constraints = self.constraint_vec_size(),
                    "problem fully defined"
                );
            }
            Err(reason) => {
                warn!(problem = %self.name, %reason, "problem definition rejected");
                self.status = ProblemStatus::IllDefined(reason);
            }
        }
        self.status
    }

    // ========================================================================
    // Setters
    // ========================================================================

    pub fn define_properties(&mut self, space: Space, props: Vec<ElementProperties>) {
        self.def.properties[space.index()] = Some(props);
        self.touch();
    }

    pub fn define_box_constraints(&mut self, bounds: BoxConstraints) {
        self.def.box_constraints = Some(bounds);
        self.touch();
    }

    pub fn define_ideal_vec(&mut self, ideal: Vec<Element>) {
        self.def.ideal = Some(ideal);
        self.touch();
    }

    pub fn define_anti_ideal_vec(&mut self, anti_ideal: Vec<Element>) {
        self.def.anti_ideal = Some(anti_ideal);
        self.touch();
    }

    pub fn define_nadir_vec(&mut self, nadir: Vec<Element>) {
        self.def.nadir = Some(nadir);
        self.touch();
    }

    pub fn define_set_goal_vec(&mut self, set_goals: Vec<bool>) {
        self.def.set_goals = Some(set_goals);
        self.touch();
    }

    pub fn define_goal_vec(&mut self, goals: Vec<Element>) {
        self.def.goals = Some(goals);
        self.touch();
    }

    pub fn define_priority_vec(&mut self, priorities: Vec<u32>) {
        self.def.priorities = Some(priorities);
        self.touch();
    }

    pub fn define_threshold_vec(&mut self, thresholds: Vec<Element>) {
        self.def.thresholds = Some(thresholds);
        self.touch();
    }

    pub fn define_d_vec_uncertainties(&mut self, umaps: Vec<Option<UncertaintyMapping>>) {
        self.def.d_uncertainties = Some(umaps);
        self.touch();
    }

    pub fn define_func_out_uncertainties(&mut self, umaps: Vec<Vec<Option<UncertaintyMapping>>>) {
        self.def.fout_uncertainties = Some(umaps);
        self.touch();
    }

    pub fn define_parameter_vec(&mut self, params: Vec<Element>) {
        self.def.parameters = Some(params);
        self.touch();
    }

    pub fn define_external_parameters(&mut self, external: Vec<bool>) {
        self.def.external = external;
        self.touch();
    }

    // Single-entry setters. Out-of-range indices are ignored.

    pub fn redefine_goal(&mut self, idx: usize, goal: Element) {
        if let Some(slot) = self.def.goals.as_mut().and_then(|v| v.get_mut(idx)) {
            *slot = goal;
            self.touch();
        }
    }

    pub fn redefine_set_goal(&mut self, idx: usize, enabled: bool) {
        if let Some(slot) = self.def.set_goals.as_mut().and_then(|v| v.get_mut(idx)) {
            *slot = enabled;
            self.touch();
        }
    }

    pub fn redefine_priority(&mut self, idx: usize, priority: u32) {
        if let Some(slot) = self.def.priorities.as_mut().and_then(|v| v.get_mut(idx)) {
            *slot = priority;
            self.touch();
        }
    }

    pub fn redefine_threshold(&mut self, idx: usize, threshold: Element) {
        if let Some(slot) = self.def.thresholds.as_mut().and_then(|v| v.get_mut(idx)) {
            *slot = threshold;
            self.touch();
        }
    }

    pub fn redefine_ideal(&mut self, idx: usize, value: Element) {
        if let Some(slot) = self.def.ideal.as_mut().and_then(|v| v.get_mut(idx)) {
            *slot = value;
            self.touch();
        }
    }

    pub fn redefine_anti_ideal(&mut self, idx: usize, value: Element) {
        if let Some(slot) = self.def.anti_ideal.as_mut().and_then(|v| v.get_mut(idx)) {
            *slot = value;
            self.touch();
        }
    }

    pub fn redefine_nadir(&mut self, idx: usize, value: Element) {
        if let Some(slot) = self.def.nadir.as_mut().and_then(|v| v.get_mut(idx)) {
            *slot = value;
            self.touch();
        }
    }

    pub fn redefine_parameter(&mut self, idx: usize, value: Element) {
        if let Some(slot) = self.def.parameters.as_mut().and_then(|v| v.get_mut(idx)) {
            *slot = value;
            self.touch();
        }
    }

    pub fn redefine_external_parameter(&mut self, idx: usize, external: bool) {
        if let Some(slot) = self.def.external.get_mut(idx) {
            *slot = external;
            self.touch();
        }
    }

    pub fn redefine_d_var_uncertainty(&mut self, idx: usize, umap: Option<UncertaintyMapping>) {
        if let Some(slot) = self.def.d_uncertainties.as_mut().and_then(|v| v.get_mut(idx)) {
            *slot = umap;
            self.touch();
        }
    }

    pub fn redefine_func_out_uncertainty(
        &mut self,
        func: usize,
        output: usize,
        umap: Option<UncertaintyMapping>,
    ) {
        let slot = self
            .def
            .fout_uncertainties
            .as_mut()
            .and_then(|v| v.get_mut(func))
            .and_then(|row| row.get_mut(output));
        if let Some(slot) = slot {
            *slot = umap;
            self.touch();
        }
    }

    pub fn redefine_bounds(&mut self, idx: usize, lower: Element, upper: Element) {
        if let Some(b) = self.def.box_constraints.as_mut() {
            if b.define_lower_bound(idx, lower).is_ok() && b.define_upper_bound(idx, upper).is_ok() {
                self.touch();
            }
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn functions(&self) -> &[Arc<dyn Function>] {
        &self.def.functions
    }

    pub fn function(&self, idx: usize) -> Option<&Arc<dyn Function>> {
        self.def.functions.get(idx)
    }

    pub fn n_functions(&self) -> usize {
        self.def.functions.len()
    }

    /// `None` until the maps are built or after a function is appended.
    pub fn maps(&self) -> Option<&Maps> {
        (!self.def.maps_stale).then_some(&self.def.maps)
    }

    /// The map of one space, empty before the maps are built.
    pub fn map(&self, space: Space) -> &[Vec<Option<usize>>] {
        self.maps().map_or(&[], |m| m.get(space).as_slice())
    }

    pub fn properties(&self, space: Space) -> &[ElementProperties] {
        slice(&self.def.properties[space.index()])
    }

    pub fn size(&self, space: Space) -> usize {
        self.properties(space).len()
    }

    pub fn ids(&self, space: Space) -> Vec<String> {
        self.properties(space).iter().map(|p| p.id.clone()).collect()
    }

    pub fn names(&self, space: Space) -> Vec<String> {
        self.properties(space).iter().map(|p| p.name.clone()).collect()
    }

    pub fn descriptions(&self, space: Space) -> Vec<String> {
        self.properties(space)
            .iter()
            .map(|p| p.description.clone())
            .collect()
    }

    pub fn units(&self, space: Space) -> Vec<String> {
        self.properties(space).iter().map(|p| p.unit.clone()).collect()
    }

    pub fn types(&self, space: Space) -> Vec<ElementType> {
        self.properties(space).iter().map(|p| p.element_type).collect()
    }

    pub fn optimization_types(&self, space: Space) -> Vec<OptimizationType> {
        self.properties(space)
            .iter()
            .map(|p| p.optimization_type)
            .collect()
    }

    pub fn decision_vec_size(&self) -> usize {
        self.size(Space::Decision)
    }

    pub fn parameter_vec_size(&self) -> usize {
        self.size(Space::Parameter)
    }

    pub fn objective_vec_size(&self) -> usize {
        self.size(Space::Objective)
    }

    pub fn constraint_vec_size(&self) -> usize {
        self.size(Space::Constraint)
    }

    pub fn unused_vec_size(&self) -> usize {
        self.size(Space::Unused)
    }

    pub fn box_constraints(&self) -> Option<&BoxConstraints> {
        self.def.box_constraints.as_ref()
    }

    pub fn ideal_vec(&self) -> &[Element] {
        slice(&self.def.ideal)
    }

    pub fn anti_ideal_vec(&self) -> &[Element] {
        slice(&self.def.anti_ideal)
    }

    pub fn nadir_vec(&self) -> &[Element] {
        slice(&self.def.nadir)
    }

    pub fn set_goal_vec(&self) -> &[bool] {
        slice(&self.def.set_goals)
    }

    pub fn goal_vec(&self) -> &[Element] {
        slice(&self.def.goals)
    }

    /// Goals of goal-enabled objectives, `None` elsewhere.
    pub fn goal_targets(&self) -> Vec<Option<f64>> {
        self.goal_vec()
            .iter()
            .zip(self.set_goal_vec())
            .map(|(g, &on)| on.then(|| g.value()))
            .collect()
    }

    pub fn priority_vec(&self) -> &[u32] {
        slice(&self.def.priorities)
    }

    pub fn threshold_vec(&self) -> &[Element] {
        slice(&self.def.thresholds)
    }

    pub fn d_vec_uncertainties(&self) -> &[Option<UncertaintyMapping>] {
        slice(&self.def.d_uncertainties)
    }

    pub fn func_out_uncertainties(&self) -> &[Vec<Option<UncertaintyMapping>>] {
        slice(&self.def.fout_uncertainties)
    }

    pub fn parameter_vec(&self) -> &[Element] {
        slice(&self.def.parameters)
    }

    pub fn is_external_parameters(&self) -> &[bool] {
        &self.def.external
    }

    pub fn number_external_parameters(&self) -> usize {
        self.def.external.iter().filter(|e| **e).count()
    }

    pub fn external_parameter_indices(&self) -> Vec<usize> {
        self.def
            .external
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.then_some(i))
            .collect()
    }

    pub fn external_links(&self) -> &[Option<ExternalLink>] {
        &self.def.links
    }

    /// Output bindings per function, valid once fully defined.
    pub fn output_bindings(&self) -> &[Vec<OutputBinding>] {
        &self.def.bindings
    }

    /// Functions in the order they must run: producers of external
    /// parameters before their consumers.
    pub fn evaluation_order(&self) -> &[usize] {
        &self.def.evaluation_order
    }

    /// Functions that read an output of `func` through an external link.
    pub fn dependents(&self, func: usize) -> &[usize] {
        self.def
            .dependents
            .get(func)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
