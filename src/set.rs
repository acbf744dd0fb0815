use crate::dominance::{self, Dominance};
use crate::mapping::MappingRef;
use rand::seq::SliceRandom;
use rand::Rng;
use std::ops::Range;
use std::sync::Arc;

/// An ordered collection of shared mappings.
///
/// Membership is by identity: two handles to the same mapping are the same
/// member even when another mapping holds equal values.
#[derive(Debug, Clone, Default)]
pub struct SolutionSet {
    mappings: Vec<MappingRef>,
    tags: Vec<String>,
}

impl SolutionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_mappings(mappings: Vec<MappingRef>) -> Self {
        Self {
            mappings,
            tags: Vec::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.add_tag(tag);
        self
    }

    pub fn all(&self) -> &[MappingRef] {
        &self.mappings
    }

    /// Members `range`, clamped to the set.
    pub fn range(&self, range: Range<usize>) -> &[MappingRef] {
        let end = range.end.min(self.mappings.len());
        let start = range.start.min(end);
        &self.mappings[start..end]
    }

    pub fn size(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn at(&self, idx: usize) -> Option<&MappingRef> {
        self.mappings.get(idx)
    }

    /// Replace the member at `idx`. Out-of-range indices are ignored.
    pub fn define(&mut self, idx: usize, mapping: MappingRef) -> bool {
        match self.mappings.get_mut(idx) {
            Some(slot) => {
                *slot = mapping;
                true
            }
            None => false,
        }
    }

    pub fn append(&mut self, mapping: MappingRef) {
        self.mappings.push(mapping);
    }

    pub fn append_all(&mut self, mappings: impl IntoIterator<Item = MappingRef>) {
        self.mappings.extend(mappings);
    }

    pub fn contains(&self, mapping: &MappingRef) -> bool {
        self.index_of(mapping).is_some()
    }

    pub fn index_of(&self, mapping: &MappingRef) -> Option<usize> {
        self.mappings.iter().position(|m| Arc::ptr_eq(m, mapping))
    }

    pub fn remove_at(&mut self, idx: usize) -> Option<MappingRef> {
        (idx < self.mappings.len()).then(|| self.mappings.remove(idx))
    }

    /// Remove every occurrence of `mapping`, returning how many were removed.
    pub fn remove(&mut self, mapping: &MappingRef) -> usize {
        let before = self.mappings.len();
        self.mappings.retain(|m| !Arc::ptr_eq(m, mapping));
        before - self.mappings.len()
    }

    /// Swap the first occurrence of `old` for `new`.
    pub fn replace(&mut self, old: &MappingRef, new: MappingRef) -> bool {
        match self.index_of(old) {
            Some(idx) => {
                self.mappings[idx] = new;
                true
            }
            None => false,
        }
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.mappings.shuffle(rng);
    }

    pub fn clear(&mut self) {
        self.mappings.clear();
    }

    // ========================================================================
    // Tags
    // ========================================================================

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.has_tag(&tag) {
            self.tags.push(tag);
        }
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        before != self.tags.len()
    }

    pub fn clear_tags(&mut self) {
        self.tags.clear();
    }

    // ========================================================================
    // Ranking
    // ========================================================================

    /// Objective vectors of evaluated members, `None` for the rest.
    fn snapshot(&self) -> Vec<Option<Vec<f64>>> {
        self.mappings
            .iter()
            .map(|m| {
                let m = m.read();
                m.is_objective_vec_evaluated().then(|| m.objective_values())
            })
            .collect()
    }

    fn relation(snapshot: &[Option<Vec<f64>>], i: usize, j: usize, weak: bool) -> Dominance {
        match (&snapshot[i], &snapshot[j]) {
            (Some(a), Some(b)) if weak => dominance::weak_dominance(a, b),
            (Some(a), Some(b)) => dominance::strict_dominance(a, b),
            _ => Dominance::Incomparable,
        }
    }

    fn pick(&self, indices: &[usize]) -> SolutionSet {
        SolutionSet::from_mappings(indices.iter().map(|&i| Arc::clone(&self.mappings[i])).collect())
    }

    /// How many members dominate each member.
    pub fn dominance_count(&self, weak: bool) -> Vec<usize> {
        let snap = self.snapshot();
        dominance::dominance_count_by(snap.len(), |i, j| Self::relation(&snap, i, j, weak))
    }

    /// Members split into fronts of non-dominance, best first.
    pub fn non_dominance_sort(&self, weak: bool) -> Vec<SolutionSet> {
        let snap = self.snapshot();
        dominance::sort_by_relation(snap.len(), |i, j| Self::relation(&snap, i, j, weak))
            .iter()
            .map(|front| self.pick(front))
            .collect()
    }

    /// Members no other member dominates. Unevaluated members never
    /// dominate and are never dominated.
    pub fn non_dominated_set(&self, weak: bool) -> SolutionSet {
        let snap = self.snapshot();
        let fronts = dominance::sort_by_relation(snap.len(), |i, j| Self::relation(&snap, i, j, weak));
        match fronts.first() {
            Some(front) => self.pick(front),
            None => SolutionSet::new(),
        }
    }
}

impl FromIterator<MappingRef> for SolutionSet {
    fn from_iter<I: IntoIterator<Item = MappingRef>>(iter: I) -> Self {
        Self::from_mappings(iter.into_iter().collect())
    }
}
