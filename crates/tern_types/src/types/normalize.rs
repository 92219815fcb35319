//! The normalize engine: lifts emptiness into constraint generation.
//!
//! `normalize(t, fixed)` produces the solution set whose bundles, fully
//! satisfied by a substitution of the flexible variables, make `t` empty.
//! The structure mirrors the emptiness engine exactly -- meet where
//! emptiness conjoins (slots, coclauses), join where it disjoins
//! (alternatives, negatives) -- with two additions:
//!
//! * the **ntlv rule**: a coclause carrying flexible variables is emptied
//!   by bounding one of them against the rest of its coclause -- `α ≤ ¬rest`
//!   for a positive occurrence, `rest ≤ β` for a negative one -- joined over
//!   every flexible variable;
//! * **tallying**: `tally` meets the normalizations of `a ∧ ¬b` per input
//!   constraint, then saturates each surviving bundle by merging the
//!   per-variable bounds and normalizing the `lower ∖ upper` gaps until
//!   nothing new surfaces. A bundle whose gap admits no solution is
//!   contradictory and dropped -- an unsatisfiable result is a normal
//!   answer, not an error.
//!
//! Fixed variables are rigid skolems: they never appear in constraints, and
//! a coclause whose variables are all fixed is empty only if its
//! constructor part is.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;

use crate::bdd::Coclause;
use crate::constraints::{Atomic, Bundle, SolutionSet};
use crate::error::Interrupted;
use crate::store::TyRef;
use crate::types::emptiness::Memo;
use crate::types::{
    atom, bitstring, function, interval, map, record, tuple, ByArity, CtorAtom, CtorBdd,
    FunctionAtom, QueryCtx, SlotBdd, TupleAtom, TypeRecord, Var,
};

/// The coclause with one variable occurrence removed, rebuilt as a slot
/// diagram.
fn rest_without<A: CtorAtom>(
    clause: &Coclause<Var, CtorBdd<A>>,
    skip_positive: Option<usize>,
    skip_negative: Option<usize>,
) -> SlotBdd<A> {
    let mut rest = SlotBdd::Leaf(clause.leaf.clone());
    for (index, &var) in clause.positives.iter().enumerate() {
        if skip_positive != Some(index) {
            rest = rest.intersect(&SlotBdd::atom(var));
        }
    }
    for (index, &var) in clause.negatives.iter().enumerate() {
        if skip_negative != Some(index) {
            rest = rest.diff(&SlotBdd::atom(var));
        }
    }
    rest
}

impl QueryCtx<'_> {
    /// The set of constraint bundles under which `t ≤ ∅`.
    pub fn normalize(
        &mut self,
        t: TyRef,
        fixed: &FxHashSet<Var>,
    ) -> Result<SolutionSet, Interrupted> {
        match self.norm_memo.get(&t) {
            Some(Memo::Settled(solutions)) => return Ok(solutions.clone()),
            // Coinductive hypothesis: recursion is emptied for free.
            Some(Memo::Pending) => return Ok(SolutionSet::trivial()),
            None => {}
        }
        self.norm_memo.insert(t, Memo::Pending);
        let record = self.store.resolve(t);
        match self.record_normalize(&record, fixed) {
            Ok(solutions) => {
                self.norm_memo.insert(t, Memo::Settled(solutions.clone()));
                Ok(solutions)
            }
            Err(interrupt) => {
                self.norm_memo.remove(&t);
                Err(interrupt)
            }
        }
    }

    /// All slots must be emptied at once: meet across slots, short-cutting
    /// on the absorbing unsatisfiable set.
    fn record_normalize(
        &mut self,
        record: &TypeRecord,
        fixed: &FxHashSet<Var>,
    ) -> Result<SolutionSet, Interrupted> {
        let mut acc = SolutionSet::trivial();

        let function_arities: Vec<usize> = record.functions.entries.keys().copied().collect();
        for (arity, slot) in record.functions.iter_slots() {
            if acc.is_unsat() {
                return Ok(acc);
            }
            let solutions = match arity {
                // The default covers every arity not explicitly present, so
                // its embedding blanks the explicit ones out.
                None => {
                    let arities = function_arities.clone();
                    let embed = move |rest: SlotBdd<FunctionAtom>| TypeRecord {
                        functions: ByArity::new(
                            rest,
                            arities.iter().map(|&a| (a, SlotBdd::bottom())).collect(),
                        ),
                        ..TypeRecord::empty()
                    };
                    self.slot_normalize(slot, fixed, &embed, function::coclause_normalize)?
                }
                Some(arity) => {
                    let embed = move |rest: SlotBdd<FunctionAtom>| TypeRecord {
                        functions: ByArity::from_entry(arity, rest),
                        ..TypeRecord::empty()
                    };
                    self.slot_normalize(slot, fixed, &embed, function::coclause_normalize)?
                }
            };
            acc = acc.meet(solutions);
        }

        let tuple_arities: Vec<usize> = record.tuples.entries.keys().copied().collect();
        for (arity, slot) in record.tuples.iter_slots() {
            if acc.is_unsat() {
                return Ok(acc);
            }
            let solutions = match arity {
                None => {
                    let arities = tuple_arities.clone();
                    let embed = move |rest: SlotBdd<TupleAtom>| TypeRecord {
                        tuples: ByArity::new(
                            rest,
                            arities.iter().map(|&a| (a, SlotBdd::bottom())).collect(),
                        ),
                        ..TypeRecord::empty()
                    };
                    self.slot_normalize(slot, fixed, &embed, tuple::coclause_normalize)?
                }
                Some(arity) => {
                    let embed = move |rest: SlotBdd<TupleAtom>| TypeRecord {
                        tuples: ByArity::from_entry(arity, rest),
                        ..TypeRecord::empty()
                    };
                    self.slot_normalize(slot, fixed, &embed, tuple::coclause_normalize)?
                }
            };
            acc = acc.meet(solutions);
        }

        if acc.is_unsat() {
            return Ok(acc);
        }
        let solutions = self.slot_normalize(
            &record.records,
            fixed,
            &|rest| TypeRecord {
                records: rest,
                ..TypeRecord::empty()
            },
            record::coclause_normalize,
        )?;
        acc = acc.meet(solutions);

        if acc.is_unsat() {
            return Ok(acc);
        }
        let solutions = self.slot_normalize(
            &record.atoms,
            fixed,
            &|rest| TypeRecord {
                atoms: rest,
                ..TypeRecord::empty()
            },
            |_ctx, positives, negatives, _fixed| {
                Ok(decided(atom::coclause_is_empty(positives, negatives)))
            },
        )?;
        acc = acc.meet(solutions);

        if acc.is_unsat() {
            return Ok(acc);
        }
        let solutions = self.slot_normalize(
            &record.integers,
            fixed,
            &|rest| TypeRecord {
                integers: rest,
                ..TypeRecord::empty()
            },
            |_ctx, positives, negatives, _fixed| {
                Ok(decided(interval::coclause_is_empty(positives, negatives)))
            },
        )?;
        acc = acc.meet(solutions);

        if acc.is_unsat() {
            return Ok(acc);
        }
        let solutions = self.slot_normalize(
            &record.bitstrings,
            fixed,
            &|rest| TypeRecord {
                bitstrings: rest,
                ..TypeRecord::empty()
            },
            |ctx, positives, negatives, _fixed| {
                Ok(decided(bitstring::coclause_is_empty(ctx, positives, negatives)?))
            },
        )?;
        acc = acc.meet(solutions);

        if acc.is_unsat() {
            return Ok(acc);
        }
        let solutions = self.slot_normalize(
            &record.maps,
            fixed,
            &|rest| TypeRecord {
                maps: rest,
                ..TypeRecord::empty()
            },
            map::coclause_normalize,
        )?;
        Ok(acc.meet(solutions))
    }

    fn slot_normalize<A: CtorAtom>(
        &mut self,
        slot: &SlotBdd<A>,
        fixed: &FxHashSet<Var>,
        embed: &dyn Fn(SlotBdd<A>) -> TypeRecord,
        mut norm: impl FnMut(&mut Self, &[A], &[A], &FxHashSet<Var>) -> Result<SolutionSet, Interrupted>,
    ) -> Result<SolutionSet, Interrupted> {
        let mut acc = SolutionSet::trivial();
        for clause in slot.coclauses() {
            if acc.is_unsat() {
                return Ok(acc);
            }
            self.tick()?;
            let has_flexible = clause
                .positives
                .iter()
                .chain(clause.negatives.iter())
                .any(|var| !fixed.contains(var));
            let solutions = if has_flexible {
                self.ntlv(&clause, fixed, embed)?
            } else {
                let mut inner = SolutionSet::trivial();
                for ctor_clause in clause.leaf.coclauses() {
                    if inner.is_unsat() {
                        break;
                    }
                    self.tick()?;
                    inner = inner.meet(norm(
                        self,
                        &ctor_clause.positives,
                        &ctor_clause.negatives,
                        fixed,
                    )?);
                }
                inner
            };
            acc = acc.meet(solutions);
        }
        Ok(acc)
    }

    /// The ntlv rule: join, over every flexible variable of the coclause,
    /// the single constraint that empties the coclause through it.
    fn ntlv<A: CtorAtom>(
        &mut self,
        clause: &Coclause<Var, CtorBdd<A>>,
        fixed: &FxHashSet<Var>,
        embed: &dyn Fn(SlotBdd<A>) -> TypeRecord,
    ) -> Result<SolutionSet, Interrupted> {
        let mut acc = SolutionSet::unsat();
        for (index, &var) in clause.positives.iter().enumerate() {
            if fixed.contains(&var) {
                continue;
            }
            if acc.is_trivial() {
                return Ok(acc);
            }
            // α ∧ rest = ∅  ⟺  α ≤ ¬rest
            let rest = self.store.intern(embed(rest_without(clause, Some(index), None)));
            acc = acc.join(SolutionSet::upper(var, self.store.negate(rest)));
        }
        for (index, &var) in clause.negatives.iter().enumerate() {
            if fixed.contains(&var) {
                continue;
            }
            if acc.is_trivial() {
                return Ok(acc);
            }
            // rest ∧ ¬β = ∅  ⟺  rest ≤ β
            let rest = self.store.intern(embed(rest_without(clause, None, Some(index))));
            acc = acc.join(SolutionSet::lower(rest, var));
        }
        Ok(acc)
    }

    /// Solves `a ≤ b` for every pair: meet of the normalizations of
    /// `a ∧ ¬b`, then bound merging and gap saturation per bundle.
    pub fn tally(
        &mut self,
        constraints: &[(TyRef, TyRef)],
        fixed: &FxHashSet<Var>,
    ) -> Result<SolutionSet, Interrupted> {
        let _span = tracing::trace_span!("tally", constraints = constraints.len()).entered();
        let mut acc = SolutionSet::trivial();
        for &(lhs, rhs) in constraints {
            if acc.is_unsat() {
                return Ok(acc);
            }
            let gap = self.store.diff(lhs, rhs);
            acc = acc.meet(self.normalize(gap, fixed)?);
        }
        self.saturate(acc, fixed)
    }

    fn saturate(
        &mut self,
        solutions: SolutionSet,
        fixed: &FxHashSet<Var>,
    ) -> Result<SolutionSet, Interrupted> {
        let mut out = SolutionSet::unsat();
        for bundle in solutions.bundles().to_vec() {
            out = out.join(self.saturate_bundle(&bundle, fixed)?);
        }
        Ok(out)
    }

    /// Merges each variable's bounds and checks `lower ≤ upper`; a gap that
    /// is not yet empty is normalized into additional constraints and the
    /// refinement starts over. Gaps are remembered for the lifetime of the
    /// query so the refinement terminates.
    fn saturate_bundle(
        &mut self,
        bundle: &Bundle,
        fixed: &FxHashSet<Var>,
    ) -> Result<SolutionSet, Interrupted> {
        let merged = self.merge_bounds(bundle);
        let mut bounds: BTreeMap<Var, (TyRef, TyRef)> = BTreeMap::new();
        for atomic in merged.iter() {
            let entry = bounds
                .entry(atomic.var())
                .or_insert((TyRef::EMPTY, TyRef::ANY));
            match atomic {
                Atomic::Lower { bound, .. } => entry.0 = *bound,
                Atomic::Upper { bound, .. } => entry.1 = *bound,
            }
        }
        for (lower_bound, upper_bound) in bounds.values() {
            let gap = self.store.diff(*lower_bound, *upper_bound);
            if self.is_empty(gap)? {
                continue;
            }
            if !self.saturate_seen.insert(gap) {
                continue;
            }
            let extra = self.normalize(gap, fixed)?;
            if extra.is_unsat() {
                // The bundle squeezes some variable into an uninhabitable
                // range; no substitution satisfies it.
                return Ok(SolutionSet::unsat());
            }
            if extra.is_trivial() {
                continue;
            }
            let refined = SolutionSet::from_bundle(merged.clone()).meet(extra);
            return self.saturate(refined, fixed);
        }
        Ok(SolutionSet::from_bundle(merged))
    }

    fn merge_bounds(&self, bundle: &Bundle) -> Bundle {
        let mut lowers: BTreeMap<Var, TyRef> = BTreeMap::new();
        let mut uppers: BTreeMap<Var, TyRef> = BTreeMap::new();
        for atomic in bundle.iter() {
            match *atomic {
                Atomic::Lower { bound, var } => {
                    let entry = lowers.entry(var).or_insert(TyRef::EMPTY);
                    *entry = self.store.union(*entry, bound);
                }
                Atomic::Upper { var, bound } => {
                    let entry = uppers.entry(var).or_insert(TyRef::ANY);
                    *entry = self.store.intersect(*entry, bound);
                }
            }
        }
        let mut merged = Bundle::new();
        for (var, bound) in lowers {
            if bound != TyRef::EMPTY {
                merged.insert(Atomic::Lower { bound, var });
            }
        }
        for (var, bound) in uppers {
            if bound != TyRef::ANY {
                merged.insert(Atomic::Upper { var, bound });
            }
        }
        merged
    }
}

fn decided(empty: bool) -> SolutionSet {
    if empty {
        SolutionSet::trivial()
    } else {
        SolutionSet::unsat()
    }
}
