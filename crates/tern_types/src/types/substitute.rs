//! Capture-avoiding substitution of type variables, plus the free-variable
//! walk.
//!
//! Substituting into a slot rebuilds the variable layer through the
//! algebra: a mapped variable node `{α, lo, hi}` becomes
//! `π(σ(α)) ∧ lo' ∪ ¬π(σ(α)) ∧ hi'`, where `π` projects the substituted
//! type onto the slot being rebuilt (the function slot of `σ(α)` replaces
//! `α` in a function slot, and so on). Constructor atoms substitute their
//! embedded references recursively; the per-call memo maps every visited
//! reference to the handle of its rewritten image, so recursive types
//! rewrite to recursive types instead of looping.

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::bdd::Bdd;
use crate::store::{TyRef, TypeStore};
use crate::types::{ByArity, CtorAtom, CtorBdd, SlotBdd, TypeRecord, Var};
use crate::FxOrderSet;

impl TypeStore {
    /// Replaces every occurrence of the mapped variables with their images.
    pub fn substitute(&self, t: TyRef, map: &FxHashMap<Var, TyRef>) -> TyRef {
        if map.is_empty() {
            return t;
        }
        let _span = tracing::trace_span!("substitute", ty = ?t).entered();
        Subst {
            store: self,
            map,
            memo: FxHashMap::default(),
        }
        .subst_ref(t)
    }

    /// Every variable reachable from `t`, in first-encounter order.
    pub fn free_variables(&self, t: TyRef) -> FxOrderSet<Var> {
        let mut vars = FxOrderSet::default();
        let mut seen = FxHashSet::default();
        let mut work = vec![t];
        while let Some(current) = work.pop() {
            if !seen.insert(current) {
                continue;
            }
            let record = self.resolve(current);
            record.for_each_var(&mut |var| {
                vars.insert(var);
            });
            record.for_each_ref(&mut |child| work.push(child));
        }
        vars
    }
}

struct Subst<'s> {
    store: &'s TypeStore,
    map: &'s FxHashMap<Var, TyRef>,
    memo: FxHashMap<TyRef, TyRef>,
}

impl Subst<'_> {
    fn subst_ref(&mut self, t: TyRef) -> TyRef {
        if let Some(&rewritten) = self.memo.get(&t) {
            return rewritten;
        }
        let result = self.store.fresh_recursive(|placeholder| {
            self.memo.insert(t, placeholder);
            let record = self.store.resolve(t);
            self.subst_record(&record)
        });
        self.memo.insert(t, result);
        result
    }

    fn subst_record(&mut self, record: &TypeRecord) -> TypeRecord {
        TypeRecord {
            functions: self.subst_by_arity(&record.functions, &|rec| rec.functions.clone()),
            tuples: self.subst_by_arity(&record.tuples, &|rec| rec.tuples.clone()),
            records: self.subst_slot(&record.records, &|rec| rec.records.clone()),
            atoms: self.subst_slot(&record.atoms, &|rec| rec.atoms.clone()),
            integers: self.subst_slot(&record.integers, &|rec| rec.integers.clone()),
            bitstrings: self.subst_slot(&record.bitstrings, &|rec| rec.bitstrings.clone()),
            maps: self.subst_slot(&record.maps, &|rec| rec.maps.clone()),
        }
    }

    /// Substituted-in types may discriminate on arities this family keeps
    /// under its default, so those arities become explicit entries first.
    fn subst_by_arity<A: CtorAtom>(
        &mut self,
        family: &ByArity<A>,
        pick: &dyn Fn(&TypeRecord) -> ByArity<A>,
    ) -> ByArity<A> {
        let mut arities: BTreeSet<usize> = family.entries.keys().copied().collect();
        let mut mentioned = Vec::new();
        for (_, slot) in family.iter_slots() {
            slot.for_each_atom(&mut |&var| mentioned.push(var));
        }
        for var in mentioned {
            if let Some(&image) = self.map.get(&var) {
                arities.extend(pick(&self.store.resolve(image)).entries.keys().copied());
            }
        }
        let default = self.subst_slot(&family.default, &|rec| pick(rec).default);
        let entries = arities
            .into_iter()
            .map(|arity| {
                let slot = self.subst_slot(family.at(arity), &|rec| pick(rec).at(arity).clone());
                (arity, slot)
            })
            .collect();
        ByArity::new(default, entries)
    }

    fn subst_slot<A: CtorAtom>(
        &mut self,
        slot: &SlotBdd<A>,
        project: &dyn Fn(&TypeRecord) -> SlotBdd<A>,
    ) -> SlotBdd<A> {
        match slot {
            Bdd::Leaf(ctor) => Bdd::Leaf(self.subst_ctor(ctor)),
            Bdd::Node(node) => {
                let if_atom = self.subst_slot(&node.if_atom, project);
                let if_not = self.subst_slot(&node.if_not, project);
                let selector = match self.map.get(&node.atom) {
                    None => SlotBdd::atom(node.atom),
                    Some(&image) => project(&self.store.resolve(image)),
                };
                selector
                    .intersect(&if_atom)
                    .union(&selector.negate().intersect(&if_not))
            }
        }
    }

    /// Atoms carry references, not variables; rebuilding through the
    /// algebra restores canonical atom order after the rewrite.
    fn subst_ctor<A: CtorAtom>(&mut self, ctor: &CtorBdd<A>) -> CtorBdd<A> {
        match ctor {
            Bdd::Leaf(leaf) => Bdd::Leaf(*leaf),
            Bdd::Node(node) => {
                let if_atom = self.subst_ctor(&node.if_atom);
                let if_not = self.subst_ctor(&node.if_not);
                let selector = CtorBdd::atom(node.atom.map_refs(&mut |r| self.subst_ref(r)));
                selector
                    .intersect(&if_atom)
                    .union(&selector.negate().intersect(&if_not))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rustc_hash::FxHashMap;

    use crate::store::TypeStore;
    use crate::types::Var;

    fn single(var: Var, to: crate::store::TyRef) -> FxHashMap<Var, crate::store::TyRef> {
        [(var, to)].into_iter().collect()
    }

    #[test]
    fn bare_variable_is_replaced() {
        let store = TypeStore::new();
        let alpha = store.variable("alpha");
        let int = store.integer();
        let substituted = store.substitute(store.var_type(alpha), &single(alpha, int));
        assert!(store.equal(substituted, int));
    }

    #[test]
    fn substitution_distributes_over_the_algebra() {
        let store = TypeStore::new();
        let alpha = store.variable("alpha");
        let ok = store.atom("ok");
        let int = store.integer();
        let alpha_ty = store.var_type(alpha);
        // (α ∨ 'ok')[α := int] = int ∨ 'ok'
        let union = store.substitute(store.union(alpha_ty, ok), &single(alpha, int));
        assert!(store.equal(union, store.union(int, ok)));
        // (α ∧ ¬int)[α := int] = ∅
        let gap = store.substitute(store.diff(alpha_ty, int), &single(alpha, int));
        assert!(store.is_empty(gap).unwrap());
    }

    #[test]
    fn substitution_reaches_into_atoms() {
        let store = TypeStore::new();
        let alpha = store.variable("alpha");
        let int = store.integer();
        let arrow = store.function(&[store.var_type(alpha)], store.var_type(alpha));
        let substituted = store.substitute(arrow, &single(alpha, int));
        assert!(store.equal(substituted, store.function(&[int], int)));
    }

    #[test]
    fn unmapped_variables_survive() {
        let store = TypeStore::new();
        let alpha = store.variable("alpha");
        let beta = store.variable("beta");
        let pair = store.tuple(&[store.var_type(alpha), store.var_type(beta)]);
        let substituted = store.substitute(pair, &single(alpha, store.integer()));
        let free = store.free_variables(substituted);
        assert!(free.contains(&beta));
        assert!(!free.contains(&alpha));
    }

    #[test]
    fn recursive_types_substitute_without_looping() {
        let store = TypeStore::new();
        let alpha = store.variable("alpha");
        let alpha_list = store.list(store.var_type(alpha));
        let substituted = store.substitute(alpha_list, &single(alpha, store.integer()));
        // The rewritten list is still recursive and still inhabited.
        assert!(store.has_ref(substituted, substituted));
        assert!(!store.is_empty(substituted).unwrap());
        assert!(store.free_variables(substituted).is_empty());
        // And it behaves like a list of ints: (int, list) is a subtype.
        let unfolded = store.tuple(&[store.integer(), substituted]);
        assert!(store.is_subtype(unfolded, substituted).unwrap());
    }

    #[test]
    fn free_variables_of_recursive_types() {
        let store = TypeStore::new();
        let alpha = store.variable("alpha");
        let alpha_list = store.list(store.var_type(alpha));
        let free = store.free_variables(alpha_list);
        assert_eq!(free.len(), 1);
        assert!(free.contains(&alpha));
    }
}
