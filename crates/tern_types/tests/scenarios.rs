//! End-to-end scenarios driving the public surface of the engine: the
//! arrow decision procedure, recursive types, tallying, and the
//! caller-recoverable interruption modes.

use rustc_hash::FxHashSet;
use tern_types::{Atomic, CancellationSource, Interrupted, QueryCtx, TypeStore, Var};

fn no_fixed() -> FxHashSet<Var> {
    FxHashSet::default()
}

#[test]
fn arrow_codomain_narrowing_is_empty() {
    let store = TypeStore::new();
    let int = store.integer();
    // (int → int) ∧ ¬(int → any): anything the positive arrow does on int
    // lands in any, so the negative excludes nothing and the difference is
    // empty.
    let gap = store.diff(
        store.function(&[int], int),
        store.function(&[int], store.any()),
    );
    assert!(store.is_empty(gap).unwrap());
}

#[test]
fn arrow_domain_widening_is_not_empty() {
    let store = TypeStore::new();
    let int = store.integer();
    // (int → int) ∧ ¬(any → int): a function may behave arbitrarily outside
    // int, so it need not be in any → int.
    let gap = store.diff(
        store.function(&[int], int),
        store.function(&[store.any()], int),
    );
    assert!(!store.is_empty(gap).unwrap());
}

#[test]
fn union_of_arrows_is_strictly_smaller() {
    let store = TypeStore::new();
    let int = store.integer();
    let atom = store.any_atom();
    let mixed = store.function(&[int], store.union(int, atom));
    let split = store.union(store.function(&[int], int), store.function(&[int], atom));
    assert!(!store.is_subtype(mixed, split).unwrap());
    assert!(store.is_subtype(split, mixed).unwrap());
}

#[test]
fn contradictory_tally_has_no_solution() {
    let store = TypeStore::new();
    let alpha = store.variable("alpha");
    let alpha_ty = store.var_type(alpha);
    let solutions = store
        .tally(
            &[(alpha_ty, store.integer()), (store.any_atom(), alpha_ty)],
            &no_fixed(),
        )
        .unwrap();
    assert!(solutions.is_unsat());
}

#[test]
fn upper_bounded_variable_tallies_to_one_bundle() {
    let store = TypeStore::new();
    let alpha = store.variable("alpha");
    let int_or_atom = store.union(store.integer(), store.any_atom());
    let solutions = store
        .tally(&[(store.var_type(alpha), int_or_atom)], &no_fixed())
        .unwrap();
    assert_eq!(solutions.bundles().len(), 1);
    let atomics: Vec<Atomic> = solutions.bundles()[0].iter().copied().collect();
    assert_eq!(
        atomics,
        vec![Atomic::Upper {
            var: alpha,
            bound: int_or_atom
        }]
    );
}

#[test]
fn recursive_union_is_inhabited() {
    let store = TypeStore::new();
    // rec X. int ∨ (X, X)
    let t = store.fresh_recursive(|this| {
        store
            .resolve(store.integer())
            .union(&tern_types::TypeRecord::tuple(&[this, this]))
    });
    assert!(!store.is_empty(t).unwrap());
}

#[test]
fn recursive_pairs_compare_coinductively() {
    let store = TypeStore::new();
    let int_stream =
        store.fresh_recursive(|this| tern_types::TypeRecord::tuple(&[store.integer(), this]));
    let any_stream =
        store.fresh_recursive(|this| tern_types::TypeRecord::tuple(&[store.any(), this]));
    assert!(store.is_subtype(int_stream, any_stream).unwrap());
}

#[test]
fn lists_are_covariant() {
    let store = TypeStore::new();
    let int = store.integer();
    let wider = store.union(int, store.any_atom());
    assert!(store.is_subtype(store.list(int), store.list(wider)).unwrap());
    assert!(!store.is_subtype(store.list(wider), store.list(int)).unwrap());
    // A list of ints is not a list of atoms, but nil is in both.
    let atoms = store.list(store.any_atom());
    assert!(!store.is_subtype(store.list(int), atoms).unwrap());
    assert!(store.is_subtype(store.nil(), atoms).unwrap());
}

#[test]
fn bitstring_alignment_end_to_end() {
    let store = TypeStore::new();
    let bytes = store.bitstring(0, 8);
    let words = store.bitstring(0, 16);
    assert!(store.is_subtype(words, bytes).unwrap());
    assert!(!store.is_subtype(bytes, words).unwrap());
    // Odd-aligned bytes: 8, 24, 40, … are bytes but not words.
    let odd = store.bitstring(8, 16);
    assert!(store.is_empty(store.intersect(odd, words)).unwrap());
    assert!(store.is_subtype(odd, bytes).unwrap());
}

#[test]
fn integer_ranges_end_to_end() {
    let store = TypeStore::new();
    let digits = store.int_range(Some(0), Some(9)).unwrap();
    let naturals = store.int_range(Some(0), None).unwrap();
    assert!(store.is_subtype(digits, naturals).unwrap());
    assert!(!store.is_subtype(naturals, digits).unwrap());
    assert!(store
        .is_empty(store.diff(
            digits,
            store.union(
                store.int_range(Some(0), Some(4)).unwrap(),
                store.int_range(Some(5), Some(9)).unwrap(),
            ),
        ))
        .unwrap());
    assert!(store.int_range(Some(3), Some(1)).is_err());
}

#[test]
fn generic_identity_tallies_against_integers() {
    let store = TypeStore::new();
    let alpha = store.variable("alpha");
    let int = store.integer();
    // (α → α) ≤ (int → int) is solvable; the saturated bundle keeps α
    // between int and int.
    let identity = store.function(&[store.var_type(alpha)], store.var_type(alpha));
    let on_ints = store.function(&[int], int);
    let solutions = store.tally(&[(identity, on_ints)], &no_fixed()).unwrap();
    assert!(!solutions.is_unsat());
    // Applying a satisfying substitution makes the constraint hold.
    let map = [(alpha, int)].into_iter().collect();
    let instantiated = store.substitute(identity, &map);
    assert!(store.is_subtype(instantiated, on_ints).unwrap());
}

#[test]
fn fixed_variables_stay_rigid_in_tally() {
    let store = TypeStore::new();
    let alpha = store.variable("alpha");
    let fixed: FxHashSet<Var> = [alpha].into_iter().collect();
    let solutions = store
        .tally(&[(store.var_type(alpha), store.integer())], &fixed)
        .unwrap();
    assert!(solutions.is_unsat());
}

#[test]
fn exhausted_budget_is_reported_not_guessed() {
    let store = TypeStore::new();
    let list = store.list(store.integer());
    let mut ctx = QueryCtx::with_budget(&store, 2);
    assert_eq!(
        ctx.is_empty(store.diff(list, store.list(store.any()))),
        Err(Interrupted::BudgetExhausted)
    );
}

#[test]
fn cancellation_interrupts_queries() {
    let store = TypeStore::new();
    let source = CancellationSource::new();
    source.cancel();
    let mut ctx = QueryCtx::with_cancellation(&store, source.token());
    let list = store.list(store.integer());
    assert_eq!(
        ctx.is_empty(store.diff(list, store.list(store.any()))),
        Err(Interrupted::Cancelled)
    );
}

#[test]
fn free_variables_and_substitution_round_trip() {
    let store = TypeStore::new();
    let alpha = store.variable("alpha");
    let beta = store.variable("beta");
    let arrow = store.function(&[store.var_type(alpha)], store.var_type(beta));
    let free = store.free_variables(arrow);
    assert!(free.contains(&alpha) && free.contains(&beta));

    let map = [(alpha, store.integer()), (beta, store.boolean())]
        .into_iter()
        .collect();
    let ground = store.substitute(arrow, &map);
    assert!(store.free_variables(ground).is_empty());
    assert!(store
        .is_subtype(ground, store.function(&[store.integer()], store.boolean()))
        .unwrap());
}
