//! Candidate solutions and their evaluation.
//!
//! A [`Mapping`] holds one value per element of every unified space of its
//! [`Problem`]. Function outputs live in a single arena with one slot per
//! function output; the objective, constraint and unused vectors store slot
//! indices into that arena. An output that is both an objective and a
//! constraint therefore has exactly one stored value, and a write through
//! either role is seen by the other.
//!
//! Evaluation is lazy per function: defining a decision variable only
//! invalidates the functions that read it, plus the functions that consume
//! their outputs through external parameters.
use crate::dominance::{self, Dominance};
use crate::element::{Element, OptimizationType};
use crate::error::{check_index, check_size, Error, FunctionError, Result};
use crate::function::Function;
use crate::problem::{OutputBinding, Problem, ProblemStatus, Space};
use crate::sampler::Sampler;
use parking_lot::RwLock;
use rand::Rng;
use std::sync::Arc;
use tracing::{trace, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A mapping shared between solution sets.
pub type MappingRef = Arc<RwLock<Mapping>>;

#[derive(Clone)]
pub struct Mapping {
    problem: Arc<Problem>,
    decision: Vec<Element>,
    parameters: Vec<Element>,
    /// Arena of function outputs plus standalone slots for unproduced roles.
    outputs: Vec<Element>,
    /// First arena slot of each function.
    output_offsets: Vec<usize>,
    objective_slots: Vec<usize>,
    constraint_slots: Vec<usize>,
    unused_slots: Vec<usize>,
    weights: Vec<f64>,
    cost: f64,
    func_evaluated: Vec<bool>,
    objective_evaluated: Vec<bool>,
    constraint_evaluated: Vec<bool>,
    scalarised: bool,
    validated: bool,
    successful: bool,
    run_number: usize,
}

impl std::fmt::Debug for Mapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapping")
            .field("decision", &crate::element::values(&self.decision))
            .field("objectives", &self.objective_values())
            .field("constraints", &self.constraint_values())
            .field("evaluated", &self.is_evaluated())
            .finish_non_exhaustive()
    }
}

/// One pending function call of a parallel evaluation.
struct Job {
    func: usize,
    function: Arc<dyn Function>,
    inputs: Vec<f64>,
    outputs: Vec<f64>,
    outcome: std::result::Result<(), FunctionError>,
}

impl Job {
    fn run(&mut self) {
        self.outcome = self.function.evaluate(&self.inputs, &mut self.outputs);
    }
}

impl Mapping {
    /// A mapping over a fully defined problem, with every decision variable
    /// at the midpoint of its bounds.
    pub fn new(problem: Arc<Problem>) -> Result<Self> {
        if problem.status() != ProblemStatus::FullyDefined {
            return Err(Error::ProblemNotDefined(problem.status()));
        }

        let decision = problem
            .properties(Space::Decision)
            .iter()
            .enumerate()
            .map(|(k, p)| {
                let mid = problem
                    .box_constraints()
                    .and_then(|b| b.midpoint(k))
                    .unwrap_or(0.0);
                Element::typed(p.element_type, mid)
            })
            .collect();
        let parameters = problem.parameter_vec().to_vec();

        let mut outputs = Vec::new();
        let mut output_offsets = Vec::with_capacity(problem.n_functions());
        for (func, bindings) in problem.functions().iter().zip(problem.output_bindings()) {
            output_offsets.push(outputs.len());
            for (j, binding) in bindings.iter().enumerate() {
                let element_type = Self::binding_properties(&problem, binding)
                    .map(|p| p.element_type)
                    .or_else(|| func.output_properties().get(j).map(|p| p.element_type))
                    .unwrap_or_default();
                outputs.push(Element::typed(element_type, 0.0));
            }
        }

        let mut role_slots = |space: Space| -> Vec<usize> {
            let map = problem.map(space);
            problem
                .properties(space)
                .iter()
                .enumerate()
                .map(|(k, p)| {
                    let produced = map
                        .iter()
                        .enumerate()
                        .find_map(|(i, row)| row[k].map(|j| output_offsets[i] + j));
                    produced.unwrap_or_else(|| {
                        outputs.push(Element::typed(p.element_type, 0.0));
                        outputs.len() - 1
                    })
                })
                .collect()
        };
        let objective_slots = role_slots(Space::Objective);
        let constraint_slots = role_slots(Space::Constraint);
        let unused_slots = role_slots(Space::Unused);

        let n_obj = objective_slots.len();
        let weights = if n_obj > 0 {
            vec![1.0 / n_obj as f64; n_obj]
        } else {
            Vec::new()
        };

        Ok(Self {
            decision,
            parameters,
            outputs,
            func_evaluated: vec![false; problem.n_functions()],
            objective_evaluated: vec![false; n_obj],
            constraint_evaluated: vec![false; constraint_slots.len()],
            output_offsets,
            objective_slots,
            constraint_slots,
            unused_slots,
            weights,
            cost: 0.0,
            scalarised: false,
            validated: false,
            successful: true,
            run_number: 0,
            problem,
        })
    }

    pub fn into_shared(self) -> MappingRef {
        Arc::new(RwLock::new(self))
    }

    fn binding_properties<'a>(
        problem: &'a Problem,
        binding: &OutputBinding,
    ) -> Option<&'a crate::element::ElementProperties> {
        if let Some(k) = binding.objective {
            problem.properties(Space::Objective).get(k)
        } else if let Some(k) = binding.constraint {
            problem.properties(Space::Constraint).get(k)
        } else {
            binding
                .unused
                .and_then(|k| problem.properties(Space::Unused).get(k))
        }
    }

    pub fn problem(&self) -> &Arc<Problem> {
        &self.problem
    }

    // ========================================================================
    // Values
    // ========================================================================

    pub fn decision_vec(&self) -> &[Element] {
        &self.decision
    }

    pub fn decision_var(&self, idx: usize) -> Option<&Element> {
        self.decision.get(idx)
    }

    pub fn parameter_vec(&self) -> &[Element] {
        &self.parameters
    }

    pub fn parameter_var(&self, idx: usize) -> Option<&Element> {
        self.parameters.get(idx)
    }

    fn gather(&self, slots: &[usize]) -> Vec<Element> {
        slots.iter().map(|&s| self.outputs[s].clone()).collect()
    }

    pub fn objective_vec(&self) -> Vec<Element> {
        self.gather(&self.objective_slots)
    }

    pub fn objective_var(&self, idx: usize) -> Option<&Element> {
        self.objective_slots.get(idx).map(|&s| &self.outputs[s])
    }

    pub fn constraint_vec(&self) -> Vec<Element> {
        self.gather(&self.constraint_slots)
    }

    pub fn constraint_var(&self, idx: usize) -> Option<&Element> {
        self.constraint_slots.get(idx).map(|&s| &self.outputs[s])
    }

    pub fn unused_vec(&self) -> Vec<Element> {
        self.gather(&self.unused_slots)
    }

    pub fn unused_var(&self, idx: usize) -> Option<&Element> {
        self.unused_slots.get(idx).map(|&s| &self.outputs[s])
    }

    pub fn decision_values(&self) -> Vec<f64> {
        crate::element::values(&self.decision)
    }

    pub fn objective_values(&self) -> Vec<f64> {
        self.objective_slots
            .iter()
            .map(|&s| self.outputs[s].value())
            .collect()
    }

    pub fn constraint_values(&self) -> Vec<f64> {
        self.constraint_slots
            .iter()
            .map(|&s| self.outputs[s].value())
            .collect()
    }

    pub fn unused_values(&self) -> Vec<f64> {
        self.unused_slots
            .iter()
            .map(|&s| self.outputs[s].value())
            .collect()
    }

    /// Whether objective `o` and constraint `c` share one stored value.
    pub fn is_shared_output(&self, objective: usize, constraint: usize) -> bool {
        matches!(
            (self.objective_slots.get(objective), self.constraint_slots.get(constraint)),
            (Some(a), Some(b)) if a == b
        )
    }

    // ========================================================================
    // Definers
    // ========================================================================

    pub fn define_decision_var(&mut self, idx: usize, value: Element) -> Result<()> {
        check_index("decision variable", idx, self.decision.len())?;
        let mut value = value;
        value.define_type(self.decision[idx].element_type());
        self.decision[idx] = value;
        self.invalidate_readers(Space::Decision, idx);
        Ok(())
    }

    pub fn define_decision_vec(&mut self, values: Vec<Element>) -> Result<()> {
        check_size("decision vector", self.decision.len(), values.len())?;
        for (slot, mut value) in self.decision.iter_mut().zip(values) {
            value.define_type(slot.element_type());
            *slot = value;
        }
        self.invalidate_all();
        Ok(())
    }

    /// Shorthand for plain real-valued decision vectors.
    pub fn define_decision_values(&mut self, values: &[f64]) -> Result<()> {
        self.define_decision_vec(values.iter().copied().map(Element::new).collect())
    }

    pub fn define_parameter_var(&mut self, idx: usize, value: Element) -> Result<()> {
        check_index("parameter", idx, self.parameters.len())?;
        let mut value = value;
        value.define_type(self.parameters[idx].element_type());
        self.parameters[idx] = value;
        self.invalidate_readers(Space::Parameter, idx);
        Ok(())
    }

    pub fn define_parameter_vec(&mut self, values: Vec<Element>) -> Result<()> {
        check_size("parameter vector", self.parameters.len(), values.len())?;
        for (slot, mut value) in self.parameters.iter_mut().zip(values) {
            value.define_type(slot.element_type());
            *slot = value;
        }
        self.invalidate_all();
        Ok(())
    }

    fn store_role(&mut self, slot: usize, value: Element) -> Result<()> {
        let expected = self.outputs[slot].element_type();
        if value.element_type() != expected {
            return Err(Error::TypeMismatch {
                expected,
                actual: value.element_type(),
            });
        }
        self.outputs[slot] = value;
        self.scalarised = false;
        Ok(())
    }

    pub fn define_objective_var(&mut self, idx: usize, value: Element) -> Result<()> {
        check_index("objective", idx, self.objective_slots.len())?;
        self.store_role(self.objective_slots[idx], value)?;
        self.objective_evaluated[idx] = true;
        Ok(())
    }

    pub fn define_objective_vec(&mut self, values: Vec<Element>) -> Result<()> {
        check_size("objective vector", self.objective_slots.len(), values.len())?;
        for (idx, value) in values.into_iter().enumerate() {
            self.define_objective_var(idx, value)?;
        }
        Ok(())
    }

    pub fn define_constraint_var(&mut self, idx: usize, value: Element) -> Result<()> {
        check_index("constraint", idx, self.constraint_slots.len())?;
        self.store_role(self.constraint_slots[idx], value)?;
        self.constraint_evaluated[idx] = true;
        Ok(())
    }

    pub fn define_constraint_vec(&mut self, values: Vec<Element>) -> Result<()> {
        check_size("constraint vector", self.constraint_slots.len(), values.len())?;
        for (idx, value) in values.into_iter().enumerate() {
            self.define_constraint_var(idx, value)?;
        }
        Ok(())
    }

    pub fn define_unused_var(&mut self, idx: usize, value: Element) -> Result<()> {
        check_index("unused output", idx, self.unused_slots.len())?;
        self.store_role(self.unused_slots[idx], value)
    }

    pub fn define_unused_vec(&mut self, values: Vec<Element>) -> Result<()> {
        check_size("unused vector", self.unused_slots.len(), values.len())?;
        for (idx, value) in values.into_iter().enumerate() {
            self.define_unused_var(idx, value)?;
        }
        Ok(())
    }

    // ========================================================================
    // Evaluation flags
    // ========================================================================

    /// Mark `func` unevaluated together with everything downstream of it.
    fn invalidate_function(&mut self, func: usize) {
        let mut stack = vec![func];
        while let Some(i) = stack.pop() {
            if i >= self.func_evaluated.len() {
                continue;
            }
            self.func_evaluated[i] = false;
            self.set_output_flags(i, false);
            for &d in self.problem.dependents(i) {
                if self.func_evaluated[d] {
                    stack.push(d);
                }
            }
        }
        self.scalarised = false;
    }

    fn invalidate_readers(&mut self, space: Space, idx: usize) {
        let readers: Vec<usize> = self
            .problem
            .map(space)
            .iter()
            .enumerate()
            .filter_map(|(i, row)| row.get(idx).copied().flatten().map(|_| i))
            .collect();
        for i in readers {
            self.invalidate_function(i);
        }
    }

    fn invalidate_all(&mut self) {
        self.define_evaluated(false);
    }

    fn set_output_flags(&mut self, func: usize, status: bool) {
        let problem = Arc::clone(&self.problem);
        if let Some(bindings) = problem.output_bindings().get(func) {
            for b in bindings {
                if let Some(k) = b.objective {
                    self.objective_evaluated[k] = status;
                }
                if let Some(k) = b.constraint {
                    self.constraint_evaluated[k] = status;
                }
            }
        }
    }

    /// Set the evaluated flag of one function and of the roles it produces.
    pub fn define_func_evaluated(&mut self, func: usize, status: bool) -> Result<()> {
        check_index("function", func, self.func_evaluated.len())?;
        if status {
            self.func_evaluated[func] = true;
            self.set_output_flags(func, true);
        } else {
            self.invalidate_function(func);
        }
        Ok(())
    }

    /// Set every evaluated flag at once.
    pub fn define_evaluated(&mut self, status: bool) {
        self.func_evaluated.iter_mut().for_each(|f| *f = status);
        self.objective_evaluated.iter_mut().for_each(|f| *f = status);
        self.constraint_evaluated.iter_mut().for_each(|f| *f = status);
        self.scalarised = false;
    }

    pub fn is_func_evaluated(&self, func: usize) -> bool {
        self.func_evaluated.get(func).copied().unwrap_or(false)
    }

    pub fn is_evaluated(&self) -> bool {
        !self.func_evaluated.is_empty() && self.func_evaluated.iter().all(|f| *f)
    }

    pub fn is_objective_vec_evaluated(&self) -> bool {
        self.objective_evaluated.iter().all(|f| *f)
    }

    pub fn is_constraint_vec_evaluated(&self) -> bool {
        self.constraint_evaluated.iter().all(|f| *f)
    }

    // ========================================================================
    // Evaluation
    // ========================================================================

    /// Resolve the inputs of `func`. Uncertain decision variables and
    /// internal parameters are sampled under the sampler lock and truncated
    /// into their bounds.
    ///
    /// Returns `None` when any input is not connected.
    pub fn fetch_inputs(&self, func: usize, sampler: &Sampler) -> Option<Vec<f64>> {
        let problem = &self.problem;
        let function = problem.function(func)?;
        let mut inputs: Vec<Option<f64>> = vec![None; function.n_inputs()];

        let d_row = problem.map(Space::Decision).get(func)?;
        for (k, entry) in d_row.iter().enumerate() {
            let Some(j) = *entry else { continue };
            let element = self.decision.get(k)?;
            let value = match problem.d_vec_uncertainties().get(k).and_then(Option::as_ref) {
                Some(umap) => {
                    let dist = umap.distribution_for(element.value());
                    let sample = dist.sample(&mut *sampler.lock());
                    let sample = element.element_type().enforce(sample);
                    match problem.box_constraints() {
                        Some(bounds) => bounds.truncate(k, sample),
                        None => sample,
                    }
                }
                None => element.value(),
            };
            *inputs.get_mut(j)? = Some(value);
        }

        let p_row = problem.map(Space::Parameter).get(func)?;
        for (k, entry) in p_row.iter().enumerate() {
            let Some(j) = *entry else { continue };
            let element = self.parameters.get(k)?;
            let external = problem.is_external_parameters().get(k).copied().unwrap_or(false);
            let value = if external {
                match problem.external_links().get(k).copied().flatten() {
                    Some(link) => {
                        let slot = self.output_offsets.get(link.function)? + link.output;
                        let v = self.outputs.get(slot)?.value();
                        if link.negate {
                            -v
                        } else {
                            v
                        }
                    }
                    None => element.value(),
                }
            } else {
                let sample = match element.distribution() {
                    Some(_) => sampler.sample(element),
                    None => element.value(),
                };
                function.bounds().truncate(j, sample)
            };
            *inputs.get_mut(j)? = Some(value);
        }

        inputs.into_iter().collect()
    }

    /// Arena slots of the outputs of `func`, or `None` when it has none.
    pub fn fetch_outputs(&self, func: usize) -> Option<Vec<usize>> {
        let offset = *self.output_offsets.get(func)?;
        let n = self.problem.function(func)?.n_outputs();
        if offset + n > self.outputs.len() {
            return None;
        }
        Some((offset..offset + n).collect())
    }

    /// Optimization type of each output of `func`, `NonOptimization` for
    /// unused outputs.
    pub fn output_optimization_types(&self, func: usize) -> Vec<OptimizationType> {
        let problem = &self.problem;
        problem
            .output_bindings()
            .get(func)
            .map(|bindings| {
                bindings
                    .iter()
                    .map(|b| match (b.objective, b.constraint) {
                        (Some(_), _) | (None, Some(_)) => Self::binding_properties(problem, b)
                            .map(|p| p.optimization_type)
                            .unwrap_or_default(),
                        (None, None) => OptimizationType::NonOptimization,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Store raw outputs of `func`: sample output uncertainty, negate
    /// maximized outputs, raise the evaluated flags.
    fn commit<R: Rng + ?Sized>(
        &mut self,
        func: usize,
        raw: &[f64],
        outcome: std::result::Result<(), FunctionError>,
        rng: &mut R,
    ) {
        let problem = Arc::clone(&self.problem);
        match outcome {
            Ok(()) => {
                let bindings = problem.output_bindings().get(func);
                let umaps = problem.func_out_uncertainties().get(func);
                let offset = self.output_offsets[func];
                for (j, &value) in raw.iter().enumerate() {
                    let slot = &mut self.outputs[offset + j];
                    slot.define_value(value);
                    slot.define_distribution(None);
                    if let Some(umap) = umaps.and_then(|row| row.get(j)).and_then(Option::as_ref) {
                        umap.evaluate_uncertainty(slot);
                        let sample = slot.sample(rng);
                        slot.define_value(sample);
                    }
                    if bindings.and_then(|b| b.get(j)).is_some_and(|b| b.negate) {
                        slot.negate();
                    }
                }
                trace!(function = func, outputs = raw.len(), "function evaluated");
            }
            Err(err) => {
                warn!(function = func, %err, "function evaluation failed");
                self.successful = false;
            }
        }
        self.func_evaluated[func] = true;
        self.set_output_flags(func, true);
        self.scalarised = false;
    }

    fn prepare(&self, func: usize, sampler: &Sampler) -> Result<Job> {
        let missing = Error::InputOutputSizeMismatch { function: func };
        let function = self.problem.function(func).cloned();
        let inputs = self.fetch_inputs(func, sampler);
        let slots = self.fetch_outputs(func);
        match (function, inputs, slots) {
            (Some(function), Some(inputs), Some(slots)) => Ok(Job {
                func,
                function,
                inputs,
                outputs: vec![0.0; slots.len()],
                outcome: Ok(()),
            }),
            _ => Err(missing),
        }
    }

    /// Evaluate every unevaluated function in dependency order, one at a
    /// time. Functions that are not parallel-safe run under the sampler
    /// lock. Returns how many functions ran.
    pub fn evaluate(&mut self, sampler: &Sampler) -> Result<usize> {
        let problem = Arc::clone(&self.problem);
        let mut count = 0;
        for &func in problem.evaluation_order() {
            if self.func_evaluated[func] {
                continue;
            }
            let mut job = self.prepare(func, sampler)?;
            if job.function.parallel_safe() {
                job.run();
            } else {
                let _guard = sampler.lock();
                job.run();
            }
            let mut rng = sampler.lock();
            self.commit(func, &job.outputs, job.outcome, &mut *rng);
            count += 1;
        }
        Ok(count)
    }

    /// Evaluate unevaluated functions concurrently.
    ///
    /// Parallel-safe functions run on the worker pool while the others run
    /// inline under the sampler lock; all of them are joined before any
    /// result is stored. Functions fed by external parameters wait for a
    /// later wave, after their producers have been stored. Inputs of a wave
    /// are resolved before anything is dispatched, so an unresolvable binding
    /// aborts the wave without running it.
    pub fn parallel_evaluate(&mut self, sampler: &Sampler) -> Result<usize> {
        let problem = Arc::clone(&self.problem);
        let n_funcs = problem.n_functions();
        let mut count = 0;
        loop {
            let pending: Vec<usize> = (0..n_funcs).filter(|&i| !self.func_evaluated[i]).collect();
            let wave: Vec<usize> = pending
                .iter()
                .copied()
                .filter(|&i| {
                    !pending
                        .iter()
                        .any(|&p| p != i && problem.dependents(p).contains(&i))
                })
                .collect();
            if wave.is_empty() {
                break;
            }

            let jobs = wave
                .iter()
                .map(|&func| self.prepare(func, sampler))
                .collect::<Result<Vec<_>>>()?;
            let (mut parallel, mut serial): (Vec<Job>, Vec<Job>) =
                jobs.into_iter().partition(|job| job.function.parallel_safe());

            #[cfg(feature = "parallel")]
            rayon::join(
                || parallel.par_iter_mut().for_each(Job::run),
                || {
                    let _guard = sampler.lock();
                    serial.iter_mut().for_each(Job::run);
                },
            );
            #[cfg(not(feature = "parallel"))]
            {
                parallel.iter_mut().for_each(Job::run);
                let _guard = sampler.lock();
                serial.iter_mut().for_each(Job::run);
            }

            let mut rng = sampler.lock();
            for job in parallel.into_iter().chain(serial) {
                self.commit(job.func, &job.outputs, job.outcome, &mut *rng);
                count += 1;
            }
        }
        Ok(count)
    }

    // ========================================================================
    // Predicates
    // ========================================================================

    /// No constraint exceeds its threshold.
    pub fn is_feasible(&self) -> bool {
        self.constraint_values()
            .iter()
            .zip(self.problem.threshold_vec())
            .all(|(c, t)| *c <= t.value())
    }

    /// No goal-enabled objective exceeds its goal.
    pub fn is_pertinent(&self) -> bool {
        self.objective_values()
            .iter()
            .zip(self.problem.goal_targets())
            .all(|(o, g)| g.map_or(true, |g| *o <= g))
    }

    pub fn constraint_violation(&self) -> f64 {
        let thresholds: Vec<f64> = crate::element::values(self.problem.threshold_vec());
        dominance::constraint_violation(&self.constraint_values(), &thresholds)
    }

    pub fn is_successful_eval(&self) -> bool {
        self.successful
    }

    pub fn define_successful_eval(&mut self, successful: bool) {
        self.successful = successful;
    }

    // ========================================================================
    // Comparison
    // ========================================================================

    fn comparable(&self, other: &Mapping) -> bool {
        self.is_objective_vec_evaluated()
            && other.is_objective_vec_evaluated()
            && self.objective_slots.len() == other.objective_slots.len()
    }

    /// `a <= b`: no objective worse and at least one better.
    pub fn weak_dominance(&self, other: &Mapping) -> Dominance {
        if !self.comparable(other) {
            return Dominance::Incomparable;
        }
        dominance::weak_dominance(&self.objective_values(), &other.objective_values())
    }

    /// `a < b`: every objective strictly better.
    pub fn strict_dominance(&self, other: &Mapping) -> Dominance {
        if !self.comparable(other) {
            return Dominance::Incomparable;
        }
        dominance::strict_dominance(&self.objective_values(), &other.objective_values())
    }

    /// Same objectives and decisions. Unevaluated mappings compare by
    /// decisions only; `None` when exactly one side is evaluated.
    pub fn equivalent(&self, other: &Mapping) -> Option<bool> {
        let decisions_equal = self.decision_values() == other.decision_values();
        match (self.is_objective_vec_evaluated(), other.is_objective_vec_evaluated()) {
            (true, true) => Some(decisions_equal && self.objective_values() == other.objective_values()),
            (false, false) => Some(decisions_equal),
            _ => None,
        }
    }

    // ========================================================================
    // Bookkeeping
    // ========================================================================

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn define_cost(&mut self, cost: f64) {
        self.cost = cost;
        self.scalarised = true;
    }

    pub fn weighting_vec(&self) -> &[f64] {
        &self.weights
    }

    pub fn define_weighting_vec(&mut self, weights: Vec<f64>) -> Result<()> {
        check_size("weighting vector", self.weights.len(), weights.len())?;
        self.weights = weights;
        self.scalarised = false;
        Ok(())
    }

    pub fn is_scalarised(&self) -> bool {
        self.scalarised
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }

    pub fn define_validated(&mut self, validated: bool) {
        self.validated = validated;
    }

    pub fn run_number(&self) -> usize {
        self.run_number
    }

    pub fn define_run_number(&mut self, run: usize) {
        self.run_number = run;
    }
}
