//! Tagged collections of solution sets over one problem.
//!
//! A [`PSet`] is the working state of an optimization run: the solution
//! sets it holds, the non-dominated archive, running ideal, anti-ideal and
//! nadir estimates, the evaluation budget and an arbitrary data side channel.
use crate::config::RunConfig;
use crate::dominance::{self, Dominance};
use crate::element::Element;
use crate::error::{check_index, check_size, Error, Result};
use crate::mapping::{Mapping, MappingRef};
use crate::problem::{Problem, ProblemStatus};
use crate::set::SolutionSet;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::{trace, warn};

/// Tag of the set holding the non-dominated archive.
pub const NON_DOMINATED_ARCHIVE: &str = "NonDominatedArchive";

/// Margin used by the archive in epsilon mode.
pub const ARCHIVE_EPSILON: f64 = -0.01;

/// Stable handle of a set inside a [`PSet`]. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetId(u64);

impl fmt::Display for SetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveUpdate {
    Unchanged,
    Added,
    /// The candidate displaced archived members, or started the archive.
    Replaced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorState {
    #[default]
    NoError,
    Undefined,
}

#[derive(Debug, Clone)]
pub struct PSet {
    problem: Arc<Problem>,
    sets: Vec<(SetId, SolutionSet)>,
    next_id: u64,
    keep_archive: bool,
    ideal: Vec<Element>,
    anti_ideal: Vec<Element>,
    nadir: Vec<Element>,
    direction: Vec<f64>,
    budget: usize,
    used_budget: usize,
    max_iterations: usize,
    current_iteration: usize,
    error_state: ErrorState,
    multipack: BTreeMap<String, Vec<f64>>,
}

impl PSet {
    pub fn new(problem: Arc<Problem>) -> Self {
        let n_obj = problem.objective_vec_size();
        let direction = if n_obj > 0 {
            vec![1.0 / n_obj as f64; n_obj]
        } else {
            Vec::new()
        };
        Self {
            ideal: problem.ideal_vec().to_vec(),
            anti_ideal: problem.anti_ideal_vec().to_vec(),
            nadir: problem.nadir_vec().to_vec(),
            problem,
            sets: Vec::new(),
            next_id: 0,
            keep_archive: true,
            direction,
            budget: 0,
            used_budget: 0,
            max_iterations: 0,
            current_iteration: 0,
            error_state: ErrorState::NoError,
            multipack: BTreeMap::new(),
        }
    }

    pub fn with_config(problem: Arc<Problem>, config: &RunConfig) -> Self {
        let mut pset = Self::new(problem);
        pset.budget = config.budget;
        pset.max_iterations = config.max_iterations;
        pset.keep_archive = config.keep_archive;
        pset
    }

    pub fn problem(&self) -> &Arc<Problem> {
        &self.problem
    }

    /// Mutable access to the problem. Mappings created earlier keep the
    /// definition they were built from.
    pub fn problem_mut(&mut self) -> &mut Problem {
        Arc::make_mut(&mut self.problem)
    }

    /// Swap in another problem and reseed the trackers from it.
    pub fn define_problem(&mut self, problem: Arc<Problem>) {
        self.ideal = problem.ideal_vec().to_vec();
        self.anti_ideal = problem.anti_ideal_vec().to_vec();
        self.nadir = problem.nadir_vec().to_vec();
        self.problem = problem;
    }

    // ========================================================================
    // Sets and tags
    // ========================================================================

    pub fn all_tags(&self) -> Vec<String> {
        self.sets
            .iter()
            .flat_map(|(_, s)| s.tags().iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn tag_exists(&self, tag: &str) -> bool {
        self.sets.iter().any(|(_, s)| s.has_tag(tag))
    }

    /// Sets carrying every tag in `tags`.
    pub fn sets_with_tags(&self, tags: &[&str]) -> Vec<SetId> {
        self.sets
            .iter()
            .filter(|(_, s)| tags.iter().all(|t| s.has_tag(t)))
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn sets_with_tag(&self, tag: &str) -> Vec<SetId> {
        self.sets_with_tags(&[tag])
    }

    pub fn set_with_tags(&self, tags: &[&str], idx: usize) -> Option<SetId> {
        self.sets_with_tags(tags).get(idx).copied()
    }

    pub fn set_with_tag(&self, tag: &str, idx: usize) -> Option<SetId> {
        self.set_with_tags(&[tag], idx)
    }

    pub fn tag_set(&mut self, id: SetId, tag: &str) -> bool {
        match self.set_mut(id) {
            Some(set) => {
                set.add_tag(tag);
                true
            }
            None => false,
        }
    }

    pub fn remove_tag_from_set(&mut self, id: SetId, tag: &str) -> bool {
        self.set_mut(id).is_some_and(|s| s.remove_tag(tag))
    }

    pub fn set_ids(&self) -> Vec<SetId> {
        self.sets.iter().map(|(id, _)| *id).collect()
    }

    pub fn all_sets(&self) -> impl Iterator<Item = (SetId, &SolutionSet)> {
        self.sets.iter().map(|(id, s)| (*id, s))
    }

    pub fn number_of_sets(&self) -> usize {
        self.sets.len()
    }

    pub fn clear_sets(&mut self) {
        self.sets.clear();
    }

    pub fn set(&self, id: SetId) -> Option<&SolutionSet> {
        self.sets.iter().find(|(i, _)| *i == id).map(|(_, s)| s)
    }

    pub fn set_mut(&mut self, id: SetId) -> Option<&mut SolutionSet> {
        self.sets.iter_mut().find(|(i, _)| *i == id).map(|(_, s)| s)
    }

    pub fn index_of_set(&self, id: SetId) -> Option<usize> {
        self.sets.iter().position(|(i, _)| *i == id)
    }

    pub fn append_set(&mut self, set: SolutionSet) -> SetId {
        let id = SetId(self.next_id);
        self.next_id += 1;
        self.sets.push((id, set));
        id
    }

    pub fn append_set_with_tags(&mut self, mut set: SolutionSet, tags: &[&str]) -> SetId {
        for tag in tags {
            set.add_tag(*tag);
        }
        self.append_set(set)
    }

    /// A new empty set carrying `tag`.
    pub fn append_tagged_set(&mut self, tag: &str) -> SetId {
        self.append_set(SolutionSet::new().with_tag(tag))
    }

    pub fn remove_set(&mut self, id: SetId) -> Option<SolutionSet> {
        let idx = self.index_of_set(id)?;
        Some(self.sets.remove(idx).1)
    }

    pub fn append_to_set(&mut self, id: SetId, mapping: MappingRef) -> Result<()> {
        let set = self.set_mut(id).ok_or(Error::UnknownSet(id))?;
        set.append(mapping);
        Ok(())
    }

    // ========================================================================
    // Mappings
    // ========================================================================

    /// A fresh mapping over the current problem, appended to set `id`.
    pub fn create_optimization_mapping(&mut self, id: SetId) -> Result<MappingRef> {
        if self.set(id).is_none() {
            return Err(Error::UnknownSet(id));
        }
        let mapping = Mapping::new(Arc::clone(&self.problem))?.into_shared();
        self.append_to_set(id, Arc::clone(&mapping))?;
        Ok(mapping)
    }

    /// A deep copy of `mapping`, appended to set `id`.
    pub fn clone_mapping(&mut self, id: SetId, mapping: &MappingRef) -> Result<MappingRef> {
        if self.set(id).is_none() {
            return Err(Error::UnknownSet(id));
        }
        let copy = mapping.read().clone().into_shared();
        self.append_to_set(id, Arc::clone(&copy))?;
        Ok(copy)
    }

    // ========================================================================
    // Archive
    // ========================================================================

    pub fn is_keep_archive(&self) -> bool {
        self.keep_archive
    }

    pub fn define_keep_archive(&mut self, keep: bool) {
        self.keep_archive = keep;
    }

    pub fn archive(&self) -> Option<&SolutionSet> {
        self.set_with_tag(NON_DOMINATED_ARCHIVE, 0)
            .and_then(|id| self.set(id))
    }

    /// Offer `candidate` to the non-dominated archive.
    ///
    /// Members the candidate dominates are dropped. A member that dominates
    /// or equals the candidate stops the scan and leaves the candidate out.
    /// With `weak_or_epsilon == false` comparisons use epsilon dominance with
    /// [`ARCHIVE_EPSILON`].
    pub fn update_non_dominated_archive(
        &mut self,
        candidate: &MappingRef,
        weak_or_epsilon: bool,
    ) -> ArchiveUpdate {
        let archive_id = match self.set_with_tag(NON_DOMINATED_ARCHIVE, 0) {
            Some(id) => id,
            None => {
                let id = self.append_set(
                    SolutionSet::from_mappings(vec![Arc::clone(candidate)])
                        .with_tag(NON_DOMINATED_ARCHIVE),
                );
                trace!(set = %id, "archive created");
                return ArchiveUpdate::Replaced;
            }
        };
        let Some(archive) = self.set_mut(archive_id) else {
            return ArchiveUpdate::Unchanged;
        };

        let cand = candidate.read();
        let cand_obj = cand.objective_values();
        let mut status = ArchiveUpdate::Added;
        for i in (0..archive.size()).rev() {
            let Some(member) = archive.at(i) else { continue };
            if Arc::ptr_eq(member, candidate) {
                return ArchiveUpdate::Unchanged;
            }
            let member = Arc::clone(member);
            let member = member.read();
            let dom = if weak_or_epsilon {
                cand.weak_dominance(&member)
            } else {
                dominance::epsilon_dominance(&cand_obj, &member.objective_values(), ARCHIVE_EPSILON)
            };
            match dom {
                Dominance::Dominated => return ArchiveUpdate::Unchanged,
                Dominance::Dominates => {
                    archive.remove_at(i);
                    status = ArchiveUpdate::Replaced;
                }
                Dominance::Incomparable => {
                    if cand.equivalent(&member) == Some(true) {
                        return ArchiveUpdate::Unchanged;
                    }
                }
            }
        }
        archive.append(Arc::clone(candidate));
        trace!(?status, size = archive.size(), "archive updated");
        status
    }

    // ========================================================================
    // Ideal, anti-ideal and nadir
    // ========================================================================

    pub fn ideal_vec(&self) -> &[Element] {
        &self.ideal
    }

    pub fn anti_ideal_vec(&self) -> &[Element] {
        &self.anti_ideal
    }

    pub fn nadir_vec(&self) -> &[Element] {
        &self.nadir
    }

    pub fn define_ideal_vec(&mut self, ideal: Vec<Element>) -> Result<()> {
        check_size("ideal vector", self.problem.objective_vec_size(), ideal.len())?;
        self.ideal = ideal;
        Ok(())
    }

    pub fn define_anti_ideal_vec(&mut self, anti_ideal: Vec<Element>) -> Result<()> {
        check_size("anti-ideal vector", self.problem.objective_vec_size(), anti_ideal.len())?;
        self.anti_ideal = anti_ideal;
        Ok(())
    }

    pub fn define_nadir_vec(&mut self, nadir: Vec<Element>) -> Result<()> {
        check_size("nadir vector", self.problem.objective_vec_size(), nadir.len())?;
        self.nadir = nadir;
        Ok(())
    }

    fn evaluated_objectives(mapping: &MappingRef) -> Option<Vec<f64>> {
        let m = mapping.read();
        m.is_objective_vec_evaluated().then(|| m.objective_values())
    }

    fn tighten(tracker: &mut [Element], values: &[f64], replace: impl Fn(f64, f64) -> bool) -> bool {
        let mut updated = false;
        for (slot, &v) in tracker.iter_mut().zip(values) {
            if replace(v, slot.value()) {
                slot.define_value(v);
                updated = true;
            }
        }
        updated
    }

    pub fn update_ideal_vec(&mut self, mapping: &MappingRef) -> bool {
        match Self::evaluated_objectives(mapping) {
            Some(obj) => Self::tighten(&mut self.ideal, &obj, |new, cur| new < cur),
            None => false,
        }
    }

    pub fn update_anti_ideal_vec(&mut self, mapping: &MappingRef) -> bool {
        match Self::evaluated_objectives(mapping) {
            Some(obj) => Self::tighten(&mut self.anti_ideal, &obj, |new, cur| new > cur),
            None => false,
        }
    }

    /// Offer `mapping` to the archive and move the nadir with it. A pure
    /// addition only pushes the nadir out; a replacement recomputes it over
    /// the surviving archive.
    pub fn update_nadir_vec(&mut self, mapping: &MappingRef) -> bool {
        if !self.keep_archive {
            return false;
        }
        let Some(obj) = Self::evaluated_objectives(mapping) else {
            return false;
        };
        match self.update_non_dominated_archive(mapping, true) {
            ArchiveUpdate::Unchanged => false,
            ArchiveUpdate::Added => Self::tighten(&mut self.nadir, &obj, |new, cur| new > cur),
            ArchiveUpdate::Replaced => {
                let mut nadir: Vec<Element> = self
                    .nadir
                    .iter()
                    .map(|e| Element::lowest(e.element_type()))
                    .collect();
                if let Some(archive) = self.archive() {
                    for member in archive.all() {
                        let values = member.read().objective_values();
                        Self::tighten(&mut nadir, &values, |new, cur| new > cur);
                    }
                }
                let changed = crate::element::values(&nadir) != crate::element::values(&self.nadir);
                self.nadir = nadir;
                changed
            }
        }
    }

    /// Ideal, anti-ideal and nadir updates in one call.
    pub fn update_ideal_nadir_vec(&mut self, mapping: &MappingRef) -> bool {
        let ideal = self.update_ideal_vec(mapping);
        let anti = self.update_anti_ideal_vec(mapping);
        let nadir = self.update_nadir_vec(mapping);
        ideal || anti || nadir
    }

    // ========================================================================
    // Goals, thresholds and direction
    // ========================================================================

    pub fn goal_vec(&self) -> &[Element] {
        self.problem.goal_vec()
    }

    pub fn define_goal_vec(&mut self, goals: Vec<Element>) -> ProblemStatus {
        let problem = self.problem_mut();
        problem.define_goal_vec(goals);
        problem.process_problem_definition()
    }

    /// Replace one goal and revalidate the problem.
    pub fn define_goal(&mut self, idx: usize, goal: Element) -> Result<ProblemStatus> {
        check_index("goal", idx, self.problem.objective_vec_size())?;
        let problem = self.problem_mut();
        problem.redefine_goal(idx, goal);
        Ok(problem.process_problem_definition())
    }

    pub fn threshold_vec(&self) -> &[Element] {
        self.problem.threshold_vec()
    }

    pub fn define_threshold_vec(&mut self, thresholds: Vec<Element>) -> ProblemStatus {
        let problem = self.problem_mut();
        problem.define_threshold_vec(thresholds);
        problem.process_problem_definition()
    }

    pub fn define_threshold(&mut self, idx: usize, threshold: Element) -> Result<ProblemStatus> {
        check_index("threshold", idx, self.problem.constraint_vec_size())?;
        let problem = self.problem_mut();
        problem.redefine_threshold(idx, threshold);
        Ok(problem.process_problem_definition())
    }

    pub fn dir_vec(&self) -> &[f64] {
        &self.direction
    }

    /// Accepts a non-negative vector over the objectives, normalized to unit
    /// sum.
    pub fn define_dir_vec(&mut self, direction: &[f64]) -> bool {
        if direction.len() != self.problem.objective_vec_size() || direction.iter().any(|d| *d < 0.0) {
            return false;
        }
        let sum: f64 = direction.iter().sum();
        self.direction = if sum > 0.0 {
            direction.iter().map(|d| d / sum).collect()
        } else {
            direction.to_vec()
        };
        true
    }

    // ========================================================================
    // Budget and iterations
    // ========================================================================

    /// Without a budget or an iteration limit a run is over before it starts.
    pub fn is_terminate(&self) -> bool {
        (self.budget == 0 && self.max_iterations == 0)
            || (self.budget > 0 && self.used_budget >= self.budget)
            || (self.max_iterations > 0 && self.current_iteration >= self.max_iterations)
    }

    pub fn current_iteration(&self) -> usize {
        self.current_iteration
    }

    pub fn increment_iteration(&mut self) {
        self.current_iteration += 1;
    }

    pub fn define_current_iteration(&mut self, iteration: usize) {
        self.current_iteration = iteration;
    }

    pub fn remaining_iterations(&self) -> usize {
        self.max_iterations.saturating_sub(self.current_iteration)
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn define_max_iterations(&mut self, max_iterations: usize) {
        self.max_iterations = max_iterations;
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn define_budget(&mut self, budget: usize) {
        self.budget = budget;
    }

    pub fn used_budget(&self) -> usize {
        self.used_budget
    }

    pub fn remaining_budget(&self) -> usize {
        self.budget.saturating_sub(self.used_budget)
    }

    /// Charge `cost` evaluations against the budget.
    pub fn decrement_budget(&mut self, cost: usize) {
        self.used_budget += cost;
    }

    pub fn reset_budget_count(&mut self, used: usize) {
        self.used_budget = used;
    }

    // ========================================================================
    // Failed evaluations
    // ========================================================================

    pub fn error_state(&self) -> ErrorState {
        self.error_state
    }

    /// Entering [`ErrorState::NoError`] clears the failure flag of every
    /// held mapping.
    pub fn define_error_state(&mut self, state: ErrorState) {
        if state == ErrorState::NoError {
            self.for_each_mapping(|m| m.write().define_successful_eval(true));
        }
        self.error_state = state;
    }

    fn for_each_mapping(&self, mut f: impl FnMut(&MappingRef)) {
        for (_, set) in &self.sets {
            for m in set.all() {
                f(m);
            }
        }
    }

    /// Mark failed mappings for re-evaluation.
    pub fn ignore_unsuccessful_evals(&mut self) {
        self.for_each_mapping(|m| {
            let mut m = m.write();
            if !m.is_successful_eval() {
                m.define_evaluated(false);
                m.define_successful_eval(true);
            }
        });
    }

    pub fn remove_invalid_mappings(&mut self) {
        for (_, set) in &mut self.sets {
            for i in (0..set.size()).rev() {
                let failed = set.at(i).is_some_and(|m| !m.read().is_successful_eval());
                if failed {
                    set.remove_at(i);
                }
            }
        }
    }

    /// Overwrite the objectives of failed mappings with the anti-ideal.
    pub fn deteriorate_invalid_mappings(&mut self) {
        let anti_ideal = self.anti_ideal.clone();
        self.for_each_mapping(|m| {
            let mut m = m.write();
            if m.is_successful_eval() {
                return;
            }
            let worst = m
                .objective_vec()
                .iter()
                .zip(&anti_ideal)
                .map(|(o, a)| Element::typed(o.element_type(), a.value()))
                .collect();
            if let Err(err) = m.define_objective_vec(worst) {
                warn!(%err, "could not deteriorate a failed mapping");
            }
        });
    }

    // ========================================================================
    // Multipack
    // ========================================================================

    pub fn define_multipack(&mut self, packs: BTreeMap<String, Vec<f64>>) {
        self.multipack = packs;
    }

    /// Insert or overwrite.
    pub fn insert_multipack(&mut self, name: impl Into<String>, data: Vec<f64>) {
        self.multipack.insert(name.into(), data);
    }

    /// Insert only when `name` is new.
    pub fn append_multipack(&mut self, name: impl Into<String>, data: Vec<f64>) -> bool {
        let name = name.into();
        if self.multipack.contains_key(&name) {
            return false;
        }
        self.multipack.insert(name, data);
        true
    }

    pub fn multipack_exists(&self, name: &str) -> bool {
        self.multipack.contains_key(name)
    }

    pub fn multipack(&self, name: &str) -> Option<&[f64]> {
        self.multipack.get(name).map(Vec::as_slice)
    }

    pub fn multipacks(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.multipack
    }

    pub fn clear_multipack(&mut self) {
        self.multipack.clear();
    }
}
