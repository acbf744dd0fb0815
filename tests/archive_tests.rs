//! PSet tests: the non-dominated archive, running extremes, set bookkeeping,
//! budget accounting and failed-evaluation handling.

use std::sync::Arc;
use symbios_pareto::pset::{ErrorState, NON_DOMINATED_ARCHIVE};
use symbios_pareto::{
    ArchiveUpdate, ClosureFunction, Element, ElementProperties, Error, Mapping, MappingRef, PSet,
    Problem, ProblemStatus, RunConfig, SolutionSet,
};

fn bi_objective_problem() -> Arc<Problem> {
    let f = ClosureFunction::new(
        "pair",
        vec![ElementProperties::new("x")],
        vec![ElementProperties::new("f1"), ElementProperties::new("f2")],
        |x: &[f64], y: &mut [f64]| {
            y[0] = x[0];
            y[1] = 1.0 - x[0];
            Ok(())
        },
    );
    let mut problem = Problem::new();
    problem.append_function(Arc::new(f), &[], &[], &[], &[]).unwrap();
    assert_eq!(problem.process_problem_definition(), ProblemStatus::FullyDefined);
    Arc::new(problem)
}

/// A mapping whose objectives are set directly, with a distinct decision so
/// that equal objective vectors are still different solutions.
fn point(pset: &PSet, x: f64, f1: f64, f2: f64) -> MappingRef {
    let mut m = Mapping::new(Arc::clone(pset.problem())).unwrap();
    m.define_decision_values(&[x]).unwrap();
    m.define_objective_vec(vec![Element::new(f1), Element::new(f2)])
        .unwrap();
    m.into_shared()
}

fn values(elements: &[Element]) -> Vec<f64> {
    elements.iter().map(Element::value).collect()
}

// ============================================================================
// Non-dominated archive
// ============================================================================

#[test]
fn test_first_candidate_starts_the_archive() {
    let mut pset = PSet::new(bi_objective_problem());
    assert!(pset.archive().is_none());

    let a = point(&pset, 0.1, 1.0, 4.0);
    assert_eq!(pset.update_non_dominated_archive(&a, true), ArchiveUpdate::Replaced);

    let archive = pset.archive().expect("archive should exist");
    assert_eq!(archive.size(), 1);
    assert!(archive.has_tag(NON_DOMINATED_ARCHIVE));
    assert!(pset.tag_exists(NON_DOMINATED_ARCHIVE));
}

#[test]
fn test_dominated_candidate_leaves_archive_unchanged() {
    let mut pset = PSet::new(bi_objective_problem());
    let a = point(&pset, 0.1, 1.0, 4.0);
    pset.update_non_dominated_archive(&a, true);

    let worse = point(&pset, 0.2, 2.0, 5.0);
    assert_eq!(pset.update_non_dominated_archive(&worse, true), ArchiveUpdate::Unchanged);
    assert_eq!(pset.archive().unwrap().size(), 1);
    assert!(!pset.archive().unwrap().contains(&worse));
}

#[test]
fn test_dominating_candidate_replaces_members() {
    let mut pset = PSet::new(bi_objective_problem());
    let a = point(&pset, 0.1, 1.0, 4.0);
    let b = point(&pset, 0.2, 4.0, 1.0);
    pset.update_non_dominated_archive(&a, true);
    assert_eq!(pset.update_non_dominated_archive(&b, true), ArchiveUpdate::Added);
    assert_eq!(pset.archive().unwrap().size(), 2);

    let best = point(&pset, 0.3, 0.0, 0.0);
    assert_eq!(pset.update_non_dominated_archive(&best, true), ArchiveUpdate::Replaced);
    let archive = pset.archive().unwrap();
    assert_eq!(archive.size(), 1, "both old members are dominated");
    assert!(archive.contains(&best));
}

#[test]
fn test_archive_ignores_repeats_and_equivalents() {
    let mut pset = PSet::new(bi_objective_problem());
    let a = point(&pset, 0.1, 1.0, 4.0);
    pset.update_non_dominated_archive(&a, true);

    assert_eq!(pset.update_non_dominated_archive(&a, true), ArchiveUpdate::Unchanged);
    let twin = point(&pset, 0.1, 1.0, 4.0);
    assert_eq!(pset.update_non_dominated_archive(&twin, true), ArchiveUpdate::Unchanged);

    // Same objectives from a different decision is a new solution.
    let sibling = point(&pset, 0.9, 1.0, 4.0);
    assert_eq!(pset.update_non_dominated_archive(&sibling, true), ArchiveUpdate::Added);
    assert_eq!(pset.archive().unwrap().size(), 2);
}

#[test]
fn test_epsilon_archive_lets_near_ties_replace() {
    let mut pset = PSet::new(bi_objective_problem());
    let a = point(&pset, 0.1, 1.0, 1.0);
    pset.update_non_dominated_archive(&a, false);

    let near = point(&pset, 0.2, 1.005, 1.005);
    assert_eq!(pset.update_non_dominated_archive(&near, false), ArchiveUpdate::Replaced);
    assert_eq!(pset.archive().unwrap().size(), 1);

    let far = point(&pset, 0.3, 1.5, 1.5);
    assert_eq!(pset.update_non_dominated_archive(&far, false), ArchiveUpdate::Unchanged);
}

// ============================================================================
// Ideal, anti-ideal and nadir
// ============================================================================

#[test]
fn test_trackers_start_from_problem_defaults() {
    let pset = PSet::new(bi_objective_problem());
    assert!(pset.ideal_vec().iter().all(Element::is_highest));
    assert!(pset.anti_ideal_vec().iter().all(Element::is_lowest));
    assert!(pset.nadir_vec().iter().all(Element::is_lowest));
}

#[test]
fn test_ideal_and_anti_ideal_follow_extremes() {
    let mut pset = PSet::new(bi_objective_problem());
    let a = point(&pset, 0.1, 1.0, 4.0);
    let b = point(&pset, 0.2, 4.0, 1.0);

    assert!(pset.update_ideal_vec(&a));
    assert!(pset.update_ideal_vec(&b));
    assert_eq!(values(pset.ideal_vec()), vec![1.0, 1.0]);
    assert!(!pset.update_ideal_vec(&a), "no component improved");

    pset.update_anti_ideal_vec(&a);
    pset.update_anti_ideal_vec(&b);
    assert_eq!(values(pset.anti_ideal_vec()), vec![4.0, 4.0]);
}

#[test]
fn test_unevaluated_mapping_moves_nothing() {
    let mut pset = PSet::new(bi_objective_problem());
    let fresh = Mapping::new(Arc::clone(pset.problem())).unwrap().into_shared();
    assert!(!pset.update_ideal_nadir_vec(&fresh));
    assert!(pset.archive().is_none());
}

#[test]
fn test_nadir_tracks_the_archive() {
    let mut pset = PSet::new(bi_objective_problem());
    assert!(pset.update_nadir_vec(&point(&pset, 0.1, 1.0, 4.0)));
    assert_eq!(values(pset.nadir_vec()), vec![1.0, 4.0]);

    assert!(pset.update_nadir_vec(&point(&pset, 0.2, 4.0, 1.0)));
    assert_eq!(values(pset.nadir_vec()), vec![4.0, 4.0]);

    assert!(!pset.update_nadir_vec(&point(&pset, 0.3, 5.0, 5.0)));

    // Replacing the whole front pulls the nadir back in.
    assert!(pset.update_nadir_vec(&point(&pset, 0.4, 0.5, 0.5)));
    assert_eq!(values(pset.nadir_vec()), vec![0.5, 0.5]);
}

#[test]
fn test_nadir_needs_the_archive() {
    let mut pset = PSet::new(bi_objective_problem());
    pset.define_keep_archive(false);
    assert!(!pset.update_nadir_vec(&point(&pset, 0.1, 1.0, 4.0)));
    assert!(pset.archive().is_none());
}

#[test]
fn test_tracker_definers_check_size() {
    let mut pset = PSet::new(bi_objective_problem());
    assert!(matches!(
        pset.define_ideal_vec(vec![Element::new(0.0)]),
        Err(Error::SizeMismatch { expected: 2, actual: 1, .. })
    ));
    pset.define_nadir_vec(vec![Element::new(3.0), Element::new(3.0)])
        .unwrap();
    assert_eq!(values(pset.nadir_vec()), vec![3.0, 3.0]);
}

// ============================================================================
// Sets and tags
// ============================================================================

#[test]
fn test_tagged_sets() {
    let mut pset = PSet::new(bi_objective_problem());
    let pop = pset.append_tagged_set("population");
    let elite = pset.append_set_with_tags(SolutionSet::new(), &["population", "elite"]);

    assert_eq!(pset.number_of_sets(), 2);
    assert_eq!(pset.sets_with_tag("population"), vec![pop, elite]);
    assert_eq!(pset.sets_with_tags(&["population", "elite"]), vec![elite]);
    assert_eq!(pset.set_with_tag("population", 1), Some(elite));
    assert_eq!(pset.set_with_tag("population", 2), None);
    assert_eq!(pset.all_tags(), vec!["elite".to_string(), "population".to_string()]);

    assert!(pset.tag_set(pop, "parents"));
    assert_eq!(pset.sets_with_tag("parents"), vec![pop]);
    assert!(pset.remove_tag_from_set(pop, "parents"));
    assert!(!pset.tag_exists("parents"));
}

#[test]
fn test_set_ids_are_never_reused() {
    let mut pset = PSet::new(bi_objective_problem());
    let first = pset.append_tagged_set("a");
    assert!(pset.remove_set(first).is_some());
    let second = pset.append_tagged_set("a");
    assert_ne!(first, second);

    let m = point(&pset, 0.1, 1.0, 1.0);
    assert!(matches!(pset.append_to_set(first, m), Err(Error::UnknownSet(id)) if id == first));
    assert!(pset.create_optimization_mapping(first).is_err());
}

#[test]
fn test_created_mappings_join_their_set() {
    let mut pset = PSet::new(bi_objective_problem());
    let id = pset.append_tagged_set("population");
    let m = pset.create_optimization_mapping(id).unwrap();
    let copy = pset.clone_mapping(id, &m).unwrap();

    let set = pset.set(id).unwrap();
    assert_eq!(set.size(), 2);
    assert!(set.contains(&m));
    assert!(set.contains(&copy));
    assert!(!Arc::ptr_eq(&m, &copy), "clones are deep copies");
}

// ============================================================================
// Goals, thresholds and direction
// ============================================================================

#[test]
fn test_goal_changes_do_not_touch_existing_mappings() {
    let mut pset = PSet::new(bi_objective_problem());
    let before = Mapping::new(Arc::clone(pset.problem())).unwrap();

    let status = pset.define_goal_vec(vec![Element::new(0.5), Element::new(0.5)]);
    assert_eq!(status, ProblemStatus::FullyDefined);
    assert_eq!(values(pset.goal_vec()), vec![0.5, 0.5]);
    assert!(before.problem().goal_vec().iter().all(Element::is_lowest));

    assert!(pset.define_goal(2, Element::new(0.0)).is_err());
    assert_eq!(
        pset.define_goal_vec(vec![Element::new(0.5)]),
        ProblemStatus::IllDefined(symbios_pareto::DefinitionError::GoalVec)
    );
}

/// One objective and one constraint, both read from `x`.
fn constrained_problem() -> Arc<Problem> {
    let f = ClosureFunction::new(
        "beam",
        vec![ElementProperties::new("x")],
        vec![ElementProperties::new("mass"), ElementProperties::new("stress")],
        |x: &[f64], y: &mut [f64]| {
            y[0] = x[0];
            y[1] = 1.0 - x[0];
            Ok(())
        },
    );
    let mut problem = Problem::new();
    problem.append_function(Arc::new(f), &[], &[1], &[0], &[]).unwrap();
    assert_eq!(problem.process_problem_definition(), ProblemStatus::FullyDefined);
    Arc::new(problem)
}

#[test]
fn test_single_goal_and_threshold_keep_the_problem_usable() {
    let mut pset = PSet::new(constrained_problem());
    let id = pset.append_tagged_set("population");

    assert_eq!(
        pset.define_goal(0, Element::new(0.25)).unwrap(),
        ProblemStatus::FullyDefined
    );
    assert_eq!(
        pset.define_threshold(0, Element::new(0.4)).unwrap(),
        ProblemStatus::FullyDefined
    );
    assert_eq!(values(pset.goal_vec()), vec![0.25]);
    assert_eq!(values(pset.threshold_vec()), vec![0.4]);
    assert_eq!(pset.problem().status(), ProblemStatus::FullyDefined);

    let m = pset
        .create_optimization_mapping(id)
        .expect("new mappings must still be creatable");
    let mut m = m.write();
    m.evaluate(&symbios_pareto::Sampler::new(1)).unwrap();
    // stress = 1 - 0.5 exceeds the new threshold.
    assert!(!m.is_feasible());

    assert!(matches!(
        pset.define_threshold(1, Element::new(0.0)),
        Err(Error::IndexOutOfRange { .. })
    ));
}

#[test]
fn test_direction_is_normalized() {
    let mut pset = PSet::new(bi_objective_problem());
    assert_eq!(pset.dir_vec(), &[0.5, 0.5]);
    assert!(pset.define_dir_vec(&[1.0, 3.0]));
    assert_eq!(pset.dir_vec(), &[0.25, 0.75]);
    assert!(!pset.define_dir_vec(&[1.0]));
    assert!(!pset.define_dir_vec(&[-1.0, 2.0]));
}

// ============================================================================
// Budget and iterations
// ============================================================================

#[test]
fn test_unbounded_run_terminates_immediately() {
    let pset = PSet::new(bi_objective_problem());
    assert!(pset.is_terminate());
}

#[test]
fn test_budget_accounting() {
    let config = RunConfig {
        budget: 10,
        ..RunConfig::default()
    };
    let mut pset = PSet::with_config(bi_objective_problem(), &config);
    assert!(!pset.is_terminate());

    pset.decrement_budget(4);
    assert_eq!(pset.used_budget(), 4);
    assert_eq!(pset.remaining_budget(), 6);
    pset.decrement_budget(6);
    assert!(pset.is_terminate());

    pset.reset_budget_count(0);
    assert!(!pset.is_terminate());
    pset.decrement_budget(25);
    assert_eq!(pset.remaining_budget(), 0);
}

#[test]
fn test_iteration_limit() {
    let mut pset = PSet::new(bi_objective_problem());
    pset.define_max_iterations(2);
    assert_eq!(pset.remaining_iterations(), 2);
    pset.increment_iteration();
    assert!(!pset.is_terminate());
    pset.increment_iteration();
    assert!(pset.is_terminate());
    assert_eq!(pset.remaining_iterations(), 0);
}

// ============================================================================
// Failed evaluations
// ============================================================================

fn pset_with_failure() -> (PSet, MappingRef, MappingRef) {
    let mut pset = PSet::new(bi_objective_problem());
    let id = pset.append_tagged_set("population");
    let ok = point(&pset, 0.1, 1.0, 1.0);
    let failed = point(&pset, 0.2, 2.0, 2.0);
    failed.write().define_successful_eval(false);
    pset.append_to_set(id, Arc::clone(&ok)).unwrap();
    pset.append_to_set(id, Arc::clone(&failed)).unwrap();
    (pset, ok, failed)
}

#[test]
fn test_ignore_unsuccessful_evals_requeues_failures() {
    let (mut pset, ok, failed) = pset_with_failure();
    pset.ignore_unsuccessful_evals();

    let failed = failed.read();
    assert!(failed.is_successful_eval());
    assert!(!failed.is_objective_vec_evaluated());
    assert!(ok.read().is_objective_vec_evaluated());
}

#[test]
fn test_remove_invalid_mappings() {
    let (mut pset, ok, failed) = pset_with_failure();
    pset.remove_invalid_mappings();

    let id = pset.set_with_tag("population", 0).unwrap();
    let set = pset.set(id).unwrap();
    assert_eq!(set.size(), 1);
    assert!(set.contains(&ok));
    assert!(!set.contains(&failed));
}

#[test]
fn test_deteriorate_invalid_mappings() {
    let (mut pset, ok, failed) = pset_with_failure();
    pset.define_anti_ideal_vec(vec![Element::new(9.0), Element::new(8.0)])
        .unwrap();
    pset.deteriorate_invalid_mappings();

    assert_eq!(failed.read().objective_values(), vec![9.0, 8.0]);
    assert_eq!(ok.read().objective_values(), vec![1.0, 1.0]);
}

#[test]
fn test_no_error_state_clears_failures() {
    let (mut pset, _, failed) = pset_with_failure();
    pset.define_error_state(ErrorState::Undefined);
    assert!(!failed.read().is_successful_eval());

    pset.define_error_state(ErrorState::NoError);
    assert_eq!(pset.error_state(), ErrorState::NoError);
    assert!(failed.read().is_successful_eval());
}

// ============================================================================
// Multipack
// ============================================================================

#[test]
fn test_multipack_side_channel() {
    let mut pset = PSet::new(bi_objective_problem());
    assert!(pset.append_multipack("weights", vec![0.1, 0.9]));
    assert!(!pset.append_multipack("weights", vec![1.0]), "append never overwrites");
    assert_eq!(pset.multipack("weights"), Some(&[0.1, 0.9][..]));

    pset.insert_multipack("weights", vec![1.0]);
    assert_eq!(pset.multipack("weights"), Some(&[1.0][..]));
    assert!(pset.multipack_exists("weights"));

    pset.clear_multipack();
    assert!(pset.multipacks().is_empty());
    assert_eq!(pset.multipack("weights"), None);
}
