//! Dominance predicates and non-dominated ranking.
//!
//! All comparisons assume minimization: a [`Mapping`](crate::mapping::Mapping)
//! stores maximized outputs negated, so its objective vectors can be fed here
//! directly.
//!
//! Ranking follows the classic counting scheme: every pair is compared once,
//! each solution records how many others dominate it and which ones it
//! dominates, and fronts are peeled off by repeatedly taking the solutions
//! nobody unranked dominates any more.
//!
//! ```
//! use symbios_pareto::dominance::{non_dominance_sort, weak_dominance, Dominance};
//!
//! assert_eq!(weak_dominance(&[1.0, 4.0], &[2.0, 4.0]), Dominance::Dominates);
//! assert_eq!(weak_dominance(&[1.0, 5.0], &[2.0, 4.0]), Dominance::Incomparable);
//!
//! let points = vec![vec![2.0, 2.0], vec![1.0, 1.0], vec![0.0, 3.0]];
//! let fronts = non_dominance_sort(&points, true);
//! assert_eq!(fronts, vec![vec![1, 2], vec![0]]);
//! ```

/// Outcome of comparing `a` against `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dominance {
    /// `a` is preferred.
    Dominates,
    /// `b` is preferred.
    Dominated,
    Incomparable,
}

impl Dominance {
    /// The same relation seen from `b`.
    pub fn reverse(self) -> Self {
        match self {
            Dominance::Dominates => Dominance::Dominated,
            Dominance::Dominated => Dominance::Dominates,
            Dominance::Incomparable => Dominance::Incomparable,
        }
    }

    pub fn is_dominating(self) -> bool {
        self == Dominance::Dominates
    }

    pub fn is_dominated(self) -> bool {
        self == Dominance::Dominated
    }

    pub fn is_incomparable(self) -> bool {
        self == Dominance::Incomparable
    }

    fn from_flags(a_wins: bool, b_wins: bool) -> Self {
        match (a_wins, b_wins) {
            (true, false) => Dominance::Dominates,
            (false, true) => Dominance::Dominated,
            _ => Dominance::Incomparable,
        }
    }
}

// ============================================================================
// Predicates
// ============================================================================

/// `a` dominates `b` when no component is worse and at least one is better.
pub fn weak_dominance(a: &[f64], b: &[f64]) -> Dominance {
    if a.len() != b.len() {
        return Dominance::Incomparable;
    }
    let mut a_better = false;
    let mut b_better = false;
    for (x, y) in a.iter().zip(b) {
        if x < y {
            a_better = true;
        } else if y < x {
            b_better = true;
        }
        if a_better && b_better {
            return Dominance::Incomparable;
        }
    }
    Dominance::from_flags(a_better, b_better)
}

/// `a` dominates `b` only when every component is strictly better.
pub fn strict_dominance(a: &[f64], b: &[f64]) -> Dominance {
    if a.len() != b.len() || a.is_empty() {
        return Dominance::Incomparable;
    }
    let a_all = a.iter().zip(b).all(|(x, y)| x < y);
    let b_all = a.iter().zip(b).all(|(x, y)| y < x);
    Dominance::from_flags(a_all, b_all)
}

/// Weak dominance after relaxing the winning side by `eps`.
///
/// With `eps == 0` this is exactly [`weak_dominance`]. A positive `eps`
/// demands a margin before a component counts as better, a negative one
/// lets near-ties count for `a`.
pub fn epsilon_dominance(a: &[f64], b: &[f64], eps: f64) -> Dominance {
    if a.len() != b.len() {
        return Dominance::Incomparable;
    }
    let mut a_better = false;
    let mut b_better = false;
    for (x, y) in a.iter().zip(b) {
        if x + eps < *y {
            a_better = true;
        } else if y + eps < *x {
            b_better = true;
        }
    }
    Dominance::from_flags(a_better, b_better)
}

fn pareto(a: &[f64], b: &[f64], weak: bool) -> Dominance {
    if weak {
        weak_dominance(a, b)
    } else {
        strict_dominance(a, b)
    }
}

// ============================================================================
// Ranking core
// ============================================================================

/// Count, for every solution, how many others dominate it.
pub fn dominance_count_by<F>(n: usize, relation: F) -> Vec<usize>
where
    F: Fn(usize, usize) -> Dominance,
{
    let mut count = vec![0; n];
    for i in 0..n {
        for j in (i + 1)..n {
            match relation(i, j) {
                Dominance::Dominates => count[j] += 1,
                Dominance::Dominated => count[i] += 1,
                Dominance::Incomparable => {}
            }
        }
    }
    count
}

/// Rank `n` solutions into fronts of indices under an arbitrary relation.
///
/// `relation(i, j)` is only called for `i < j`.
pub fn sort_by_relation<F>(n: usize, relation: F) -> Vec<Vec<usize>>
where
    F: Fn(usize, usize) -> Dominance,
{
    let mut domination_count = vec![0usize; n];
    let mut dominated_indices = vec![vec![]; n];

    for i in 0..n {
        for j in (i + 1)..n {
            match relation(i, j) {
                Dominance::Dominates => {
                    dominated_indices[i].push(j);
                    domination_count[j] += 1;
                }
                Dominance::Dominated => {
                    dominated_indices[j].push(i);
                    domination_count[i] += 1;
                }
                Dominance::Incomparable => {}
            }
        }
    }

    peel_fronts(domination_count, &dominated_indices)
}

/// Each front is every unranked solution holding the lowest remaining count.
/// Pareto relations always leave a zero there; goal and priority comparisons
/// are not transitive and can leave gaps.
fn peel_fronts(mut domination_count: Vec<usize>, dominated_indices: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let n = domination_count.len();
    let mut ranked = vec![false; n];
    let mut remaining = n;
    let mut fronts = vec![];

    while remaining > 0 {
        let lowest = (0..n)
            .filter(|&i| !ranked[i])
            .map(|i| domination_count[i])
            .min()
            .unwrap_or(0);

        let front: Vec<usize> = (0..n)
            .filter(|&i| !ranked[i] && domination_count[i] == lowest)
            .collect();
        for &i in &front {
            ranked[i] = true;
        }
        for &i in &front {
            for &j in &dominated_indices[i] {
                domination_count[j] = domination_count[j].saturating_sub(1);
            }
        }
        remaining -= front.len();
        fronts.push(front);
    }
    fronts
}

// ============================================================================
// Pareto ranking
// ============================================================================

pub fn dominance_count<V: AsRef<[f64]>>(set: &[V], weak: bool) -> Vec<usize> {
    dominance_count_by(set.len(), |i, j| {
        pareto(set[i].as_ref(), set[j].as_ref(), weak)
    })
}

/// Fronts of indices under weak (`weak == true`) or strict dominance.
pub fn non_dominance_sort<V: AsRef<[f64]>>(set: &[V], weak: bool) -> Vec<Vec<usize>> {
    sort_by_relation(set.len(), |i, j| {
        pareto(set[i].as_ref(), set[j].as_ref(), weak)
    })
}

/// Like [`non_dominance_sort`] but solutions with different ids never
/// dominate each other. Empty when `ids` does not match `set`.
pub fn non_dominance_sort_parametric<V: AsRef<[f64]>>(
    set: &[V],
    ids: &[i64],
    weak: bool,
) -> Vec<Vec<usize>> {
    if ids.len() != set.len() {
        return vec![];
    }
    sort_by_relation(set.len(), |i, j| {
        if ids[i] != ids[j] {
            Dominance::Incomparable
        } else {
            pareto(set[i].as_ref(), set[j].as_ref(), weak)
        }
    })
}

/// Indices of the non-dominated members, in their original order.
pub fn non_dominated_set<V: AsRef<[f64]>>(set: &[V], weak: bool) -> Vec<usize> {
    let mut survivors: Vec<usize> = (0..set.len()).collect();
    let mut ia = 0;
    while ia < survivors.len() {
        let mut ib = ia + 1;
        let mut removed_a = false;
        while ib < survivors.len() {
            match pareto(set[survivors[ia]].as_ref(), set[survivors[ib]].as_ref(), weak) {
                Dominance::Dominates => {
                    survivors.remove(ib);
                }
                Dominance::Dominated => {
                    survivors.remove(ia);
                    removed_a = true;
                    break;
                }
                Dominance::Incomparable => ib += 1,
            }
        }
        if !removed_a {
            ia += 1;
        }
    }
    survivors
}

// ============================================================================
// Constraint handling
// ============================================================================

/// Sum of the amounts by which constraints exceed their thresholds.
pub fn constraint_violation(constraints: &[f64], thresholds: &[f64]) -> f64 {
    constraints
        .iter()
        .zip(thresholds)
        .map(|(c, t)| c - t)
        .filter(|d| *d > 0.0)
        .sum()
}

/// Objectives and constraints of one solution.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub objectives: &'a [f64],
    pub constraints: &'a [f64],
}

impl<'a> Candidate<'a> {
    pub fn new(objectives: &'a [f64], constraints: &'a [f64]) -> Self {
        Self {
            objectives,
            constraints,
        }
    }
}

/// Feasibility first: the less violating infeasible solution wins, any
/// feasible solution beats an infeasible one, and two feasible solutions fall
/// back to `objective_relation`.
fn constrained<F>(violation_a: f64, violation_b: f64, objective_relation: F) -> Dominance
where
    F: FnOnce() -> Dominance,
{
    match (violation_a > 0.0, violation_b > 0.0) {
        (true, true) => {
            if violation_a < violation_b {
                Dominance::Dominates
            } else if violation_a > violation_b {
                Dominance::Dominated
            } else {
                Dominance::Incomparable
            }
        }
        (true, false) => Dominance::Dominated,
        (false, true) => Dominance::Dominates,
        (false, false) => objective_relation(),
    }
}

fn violations(set: &[Candidate<'_>], thresholds: &[f64]) -> Vec<f64> {
    set.iter()
        .map(|c| constraint_violation(c.constraints, thresholds))
        .collect()
}

pub fn non_dominance_sort_constraint_handling(
    set: &[Candidate<'_>],
    thresholds: &[f64],
    weak: bool,
) -> Vec<Vec<usize>> {
    let cv = violations(set, thresholds);
    sort_by_relation(set.len(), |i, j| {
        constrained(cv[i], cv[j], || {
            pareto(set[i].objectives, set[j].objectives, weak)
        })
    })
}

pub fn non_dominance_sort_parametric_constraint_handling(
    set: &[Candidate<'_>],
    thresholds: &[f64],
    ids: &[i64],
    weak: bool,
) -> Vec<Vec<usize>> {
    if ids.len() != set.len() {
        return vec![];
    }
    let cv = violations(set, thresholds);
    sort_by_relation(set.len(), |i, j| {
        if ids[i] != ids[j] {
            return Dominance::Incomparable;
        }
        constrained(cv[i], cv[j], || {
            pareto(set[i].objectives, set[j].objectives, weak)
        })
    })
}

// ============================================================================
// Goals and priorities
// ============================================================================

fn misses_goal(x: f64, goal: Option<f64>) -> bool {
    goal.is_some_and(|g| x > g)
}

fn better(x: f64, y: f64, weak: bool) -> bool {
    if weak {
        x <= y
    } else {
        x < y
    }
}

/// Lexicographic comparison of the objectives in `subset`: a solution meeting
/// every goal beats one that misses any, then the components each side
/// misses decide. `None` means the decision falls through to the next level.
fn goal_stage(
    a: &[f64],
    b: &[f64],
    goals: &[Option<f64>],
    subset: &[usize],
    weak: bool,
) -> Option<Dominance> {
    let a_class = subset.iter().any(|&k| misses_goal(a[k], goals[k]));
    let b_class = subset.iter().any(|&k| misses_goal(b[k], goals[k]));
    if a_class != b_class {
        return Some(Dominance::from_flags(!a_class, !b_class));
    }

    let (mut a_better, mut a_equal, mut b_better, mut b_equal) = (true, true, true, true);
    for &k in subset {
        if misses_goal(a[k], goals[k]) {
            a_better &= better(a[k], b[k], weak);
            a_equal &= a[k] == b[k];
        }
        if misses_goal(b[k], goals[k]) {
            b_better &= better(b[k], a[k], weak);
            b_equal &= b[k] == a[k];
        }
    }

    if a_equal && b_equal {
        return None;
    }
    if (a_better && !a_equal) || (a_equal && !b_equal) {
        Some(Dominance::Dominates)
    } else if (b_better && !b_equal) || (b_equal && !a_equal) {
        Some(Dominance::Dominated)
    } else {
        Some(Dominance::Incomparable)
    }
}

/// Goal-based preference between two objective vectors. `goals[k] == None`
/// leaves objective `k` without a goal.
pub fn preferability(a: &[f64], b: &[f64], goals: &[Option<f64>], weak: bool) -> Dominance {
    let n = a.len();
    if b.len() != n || goals.len() != n {
        return Dominance::Incomparable;
    }
    let all: Vec<usize> = (0..n).collect();
    if let Some(d) = goal_stage(a, b, goals, &all, weak) {
        return d;
    }

    let a_better = a.iter().zip(b).all(|(x, y)| better(*x, *y, weak));
    let b_better = a.iter().zip(b).all(|(x, y)| better(*y, *x, weak));
    let equal = a == b;
    if a_better && !equal {
        Dominance::Dominates
    } else if b_better && !equal {
        Dominance::Dominated
    } else {
        Dominance::Incomparable
    }
}

/// [`preferability`] with priority levels: goals of the highest priority are
/// settled first, ties recurse into the lower levels.
pub fn preferability_with_priorities(
    a: &[f64],
    b: &[f64],
    goals: &[Option<f64>],
    priorities: &[u32],
    weak: bool,
) -> Dominance {
    let n = a.len();
    if n == 0 || b.len() != n || goals.len() != n || priorities.len() != n {
        return Dominance::Incomparable;
    }

    let mut max_p = priorities.iter().copied().min().unwrap_or(1);
    let mut min_p = priorities.iter().copied().max().unwrap_or(1);
    for (p, g) in priorities.iter().zip(goals) {
        if g.is_some() {
            max_p = max_p.max(*p);
            min_p = min_p.min(*p);
        }
    }

    if max_p == min_p && max_p == 1 {
        return preferability(a, b, goals, weak);
    }

    let top: Vec<usize> = (0..n)
        .filter(|&k| goals[k].is_some() && priorities[k] == max_p)
        .collect();
    if let Some(d) = goal_stage(a, b, goals, &top, weak) {
        return d;
    }
    if max_p == min_p {
        return Dominance::Incomparable;
    }

    let lower: Vec<usize> = (0..n).filter(|&k| priorities[k] < max_p).collect();
    let pick_f = |v: &[f64]| lower.iter().map(|&k| v[k]).collect::<Vec<_>>();
    let g2: Vec<Option<f64>> = lower.iter().map(|&k| goals[k]).collect();
    let p2: Vec<u32> = lower.iter().map(|&k| priorities[k]).collect();
    preferability_with_priorities(&pick_f(a), &pick_f(b), &g2, &p2, weak)
}

/// Ranking by [`preferability`].
pub fn non_dominance_sort_with_goals<V: AsRef<[f64]>>(
    set: &[V],
    goals: &[Option<f64>],
    weak: bool,
) -> Vec<Vec<usize>> {
    sort_by_relation(set.len(), |i, j| {
        preferability(set[i].as_ref(), set[j].as_ref(), goals, weak)
    })
}

pub fn non_dominance_sort_parametric_with_goals<V: AsRef<[f64]>>(
    set: &[V],
    goals: &[Option<f64>],
    ids: &[i64],
    weak: bool,
) -> Vec<Vec<usize>> {
    if ids.len() != set.len() {
        return vec![];
    }
    sort_by_relation(set.len(), |i, j| {
        if ids[i] != ids[j] {
            Dominance::Incomparable
        } else {
            preferability(set[i].as_ref(), set[j].as_ref(), goals, weak)
        }
    })
}

pub fn non_dominance_sort_constraint_handling_with_goals(
    set: &[Candidate<'_>],
    thresholds: &[f64],
    goals: &[Option<f64>],
    weak: bool,
) -> Vec<Vec<usize>> {
    let cv = violations(set, thresholds);
    sort_by_relation(set.len(), |i, j| {
        constrained(cv[i], cv[j], || {
            preferability(set[i].objectives, set[j].objectives, goals, weak)
        })
    })
}

pub fn non_dominance_sort_parametric_constraint_handling_with_goals(
    set: &[Candidate<'_>],
    thresholds: &[f64],
    goals: &[Option<f64>],
    ids: &[i64],
    weak: bool,
) -> Vec<Vec<usize>> {
    if ids.len() != set.len() {
        return vec![];
    }
    let cv = violations(set, thresholds);
    sort_by_relation(set.len(), |i, j| {
        if ids[i] != ids[j] {
            return Dominance::Incomparable;
        }
        constrained(cv[i], cv[j], || {
            preferability(set[i].objectives, set[j].objectives, goals, weak)
        })
    })
}

// ============================================================================
// Preferred region
// ============================================================================

/// Project a reference set onto the region preferred by `goal`.
///
/// Each reference vector is shrunk by `1 - sum(goal)` and shifted by `goal`.
/// A goal summing to one is returned on its own. When the goal sums to more
/// than one, vectors are renormalized to unit sum and those with negative
/// components are dropped.
pub fn preferred_set(reference: &[Vec<f64>], goal: &[f64]) -> Vec<Vec<f64>> {
    if reference.is_empty() || goal.is_empty() || reference[0].len() != goal.len() {
        return vec![];
    }

    let goal_sum: f64 = goal.iter().sum();
    if (goal_sum - 1.0).abs() <= f64::EPSILON {
        return vec![goal.to_vec()];
    }

    let scale = 1.0 - goal_sum;
    let shifted = reference.iter().map(|r| {
        r.iter()
            .zip(goal)
            .map(|(x, g)| x * scale + g)
            .collect::<Vec<f64>>()
    });

    if goal_sum <= 1.0 {
        return shifted.collect();
    }

    shifted
        .filter_map(|mut v| {
            let norm: f64 = v.iter().map(|x| x.abs()).sum();
            if norm > 0.0 {
                v.iter_mut().for_each(|x| *x /= norm);
            }
            v.iter().all(|x| *x >= 0.0).then_some(v)
        })
        .collect()
}
