//! The constraint-set lattice returned by tallying.
//!
//! An [`Atomic`] constraint bounds one flexible variable from one side. A
//! [`Bundle`] is a conjunction of atomics; a [`SolutionSet`] is a
//! disjunction of bundles -- "any of these bundles, fully satisfied, makes
//! the normalized type empty".
//!
//! Lattice structure: `join` is set union ("either solution works"),
//! `meet` is the pairwise union of bundles ("both must hold"). The unit of
//! `join` is the unsatisfiable empty set, the unit of `meet` the trivial
//! set containing only the empty bundle. Bundles are kept minimal: a bundle
//! that is a strict superset of another asks for strictly more and is
//! dropped. Operands of the `*_with` combinators are thunks, forced only
//! when the accumulated value is not already absorbing -- the walks in the
//! normalize engine rely on this to avoid exponential blowup.

use std::collections::BTreeSet;

use itertools::Itertools;

use crate::store::TyRef;
use crate::types::Var;

/// One atomic subtype constraint on a variable.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Atomic {
    /// `bound ≤ var`
    Lower { bound: TyRef, var: Var },
    /// `var ≤ bound`
    Upper { var: Var, bound: TyRef },
}

impl Atomic {
    pub fn var(&self) -> Var {
        match *self {
            Atomic::Lower { var, .. } | Atomic::Upper { var, .. } => var,
        }
    }

    pub fn bound(&self) -> TyRef {
        match *self {
            Atomic::Lower { bound, .. } | Atomic::Upper { bound, .. } => bound,
        }
    }
}

/// A conjunction of atomic constraints, ordered for deterministic output.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Bundle(BTreeSet<Atomic>);

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, atomic: Atomic) {
        self.0.insert(atomic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Atomic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn is_strict_superset_of(&self, other: &Bundle) -> bool {
        other.0.len() < self.0.len() && other.0.is_subset(&self.0)
    }

    /// The syntactic contradiction: a variable squeezed between `any` and
    /// `empty`. Semantic contradictions are caught later, by saturation.
    fn is_contradictory(&self) -> bool {
        self.0.iter().any(|atomic| match atomic {
            Atomic::Upper { var, bound } if *bound == TyRef::EMPTY => self.0.contains(&Atomic::Lower {
                bound: TyRef::ANY,
                var: *var,
            }),
            _ => false,
        })
    }
}

impl FromIterator<Atomic> for Bundle {
    fn from_iter<I: IntoIterator<Item = Atomic>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A set of bundles, canonically sorted and minimal.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SolutionSet {
    bundles: Vec<Bundle>,
}

impl SolutionSet {
    /// No solution: the unit of `join`, absorbing for `meet`.
    pub fn unsat() -> Self {
        Self {
            bundles: Vec::new(),
        }
    }

    /// Trivially satisfied: the unit of `meet`, absorbing for `join`.
    pub fn trivial() -> Self {
        Self {
            bundles: vec![Bundle::default()],
        }
    }

    pub fn from_bundle(bundle: Bundle) -> Self {
        let mut result = Self {
            bundles: vec![bundle],
        };
        result.canonicalize();
        result
    }

    /// `var ≤ bound`, dropping the trivial `var ≤ any`.
    pub(crate) fn upper(var: Var, bound: TyRef) -> Self {
        if bound == TyRef::ANY {
            return Self::trivial();
        }
        Self::from_bundle(std::iter::once(Atomic::Upper { var, bound }).collect())
    }

    /// `bound ≤ var`, dropping the trivial `empty ≤ var`.
    pub(crate) fn lower(bound: TyRef, var: Var) -> Self {
        if bound == TyRef::EMPTY {
            return Self::trivial();
        }
        Self::from_bundle(std::iter::once(Atomic::Lower { bound, var }).collect())
    }

    pub fn is_unsat(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn is_trivial(&self) -> bool {
        self.bundles.len() == 1 && self.bundles[0].is_empty()
    }

    pub fn bundles(&self) -> &[Bundle] {
        &self.bundles
    }

    pub fn join(mut self, other: Self) -> Self {
        if self.is_trivial() || other.is_unsat() {
            return self;
        }
        self.bundles.extend(other.bundles);
        self.canonicalize();
        self
    }

    pub fn meet(self, other: Self) -> Self {
        if self.is_unsat() || other.is_trivial() {
            return self;
        }
        if other.is_unsat() || self.is_trivial() {
            return other;
        }
        let bundles = self
            .bundles
            .iter()
            .cartesian_product(other.bundles.iter())
            .map(|(left, right)| left.iter().chain(right.iter()).copied().collect())
            .collect();
        let mut result = Self { bundles };
        result.canonicalize();
        result
    }

    /// Lazy join: the thunk is not forced once the accumulated set is
    /// already absorbing.
    pub fn join_with(self, other: impl FnOnce() -> Self) -> Self {
        if self.is_trivial() {
            self
        } else {
            self.join(other())
        }
    }

    /// Lazy meet, symmetric to [`SolutionSet::join_with`].
    pub fn meet_with(self, other: impl FnOnce() -> Self) -> Self {
        if self.is_unsat() {
            self
        } else {
            self.meet(other())
        }
    }

    fn canonicalize(&mut self) {
        self.bundles.retain(|bundle| !bundle.is_contradictory());
        self.bundles.sort();
        self.bundles.dedup();
        let snapshot = self.bundles.clone();
        self.bundles
            .retain(|bundle| !snapshot.iter().any(|other| bundle.is_strict_superset_of(other)));
    }
}

#[cfg(test)]
mod tests {
    use super::{Atomic, Bundle, SolutionSet};
    use crate::store::{TyRef, TypeStore};
    use crate::types::Var;

    fn upper(var: u32, bound: TyRef) -> Atomic {
        Atomic::Upper {
            var: Var(var),
            bound,
        }
    }

    fn lower(bound: TyRef, var: u32) -> Atomic {
        Atomic::Lower {
            bound,
            var: Var(var),
        }
    }

    #[test]
    fn units_and_absorbers() {
        let store = TypeStore::new();
        let bundle = SolutionSet::from_bundle([upper(0, store.integer())].into_iter().collect());

        assert_eq!(SolutionSet::unsat().join(bundle.clone()), bundle);
        assert_eq!(SolutionSet::trivial().meet(bundle.clone()), bundle);
        assert!(SolutionSet::unsat().meet(bundle.clone()).is_unsat());
        assert!(SolutionSet::trivial().join(bundle).is_trivial());
    }

    #[test]
    fn lazy_operands_are_not_forced() {
        assert!(SolutionSet::trivial()
            .join_with(|| unreachable!("join is saturated"))
            .is_trivial());
        assert!(SolutionSet::unsat()
            .meet_with(|| unreachable!("meet is saturated"))
            .is_unsat());
    }

    #[test]
    fn dominance_drops_strict_supersets() {
        let store = TypeStore::new();
        let small = SolutionSet::from_bundle([upper(0, store.integer())].into_iter().collect());
        let large = SolutionSet::from_bundle(
            [upper(0, store.integer()), upper(1, store.boolean())]
                .into_iter()
                .collect(),
        );
        let joined = small.clone().join(large);
        assert_eq!(joined, small);
    }

    #[test]
    fn meet_distributes_bundles() {
        let store = TypeStore::new();
        let a = SolutionSet::from_bundle([upper(0, store.integer())].into_iter().collect());
        let b = SolutionSet::from_bundle([upper(1, store.boolean())].into_iter().collect());
        let met = a.meet(b);
        assert_eq!(met.bundles().len(), 1);
        assert_eq!(met.bundles()[0].len(), 2);
    }

    #[test]
    fn squeezed_variable_is_contradictory() {
        let store = TypeStore::new();
        let squeezed: Bundle = [upper(0, store.empty()), lower(store.any(), 0)]
            .into_iter()
            .collect();
        assert!(SolutionSet::from_bundle(squeezed).is_unsat());
        // One side alone is fine.
        let upper_only = SolutionSet::from_bundle([upper(0, store.empty())].into_iter().collect());
        assert!(!upper_only.is_unsat());
    }

    #[test]
    fn trivial_bounds_are_dropped_at_construction() {
        let store = TypeStore::new();
        assert!(SolutionSet::upper(Var(0), store.any()).is_trivial());
        assert!(SolutionSet::lower(store.empty(), Var(0)).is_trivial());
        assert!(!SolutionSet::upper(Var(0), store.integer()).is_trivial());
    }
}
