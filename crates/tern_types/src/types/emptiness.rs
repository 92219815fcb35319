//! The emptiness engine: decides `∅?(t)` for arbitrary type references.
//!
//! Emptiness of a record is the conjunction of per-slot emptiness; a slot
//! is empty when every coclause of its DNF view is. The variable layer
//! never decides plain emptiness on its own: canonical diagrams have
//! already removed `α ∧ ¬α` paths, and any remaining variable can be
//! instantiated to the slot's top or bottom, so a variable coclause is
//! empty exactly when its constructor leaf is.
//!
//! Recursion through the store is guarded by a memo table with a pending
//! marker: a reference re-encountered while its own emptiness is being
//! computed is coinductively assumed empty (the greatest fixpoint of the
//! non-emptiness witnesses). The table lives for one top-level query and is
//! threaded through every recursive entry point, including the normalize
//! engine that shares this context.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::cancellation::CancellationToken;
use crate::constraints::SolutionSet;
use crate::error::Interrupted;
use crate::store::{TyRef, TypeStore};
use crate::types::{
    atom, bitstring, function, interval, map, record, tuple, CtorAtom, SlotBdd, TypeRecord,
};

/// Default fuel for a query context. Each DNF-coclause boundary costs one
/// unit, so this bounds runaway recursion without cutting realistic
/// queries short.
const DEFAULT_FUEL: u64 = 1 << 22;

pub(crate) enum Memo<T> {
    Pending,
    Settled(T),
}

/// Per-query state: memo tables, fuel, and the optional cancellation token.
///
/// A context must not be shared across top-level queries that could observe
/// different store contents, and never across threads -- the pending markers
/// are meaningful only within the query that planted them.
pub struct QueryCtx<'s> {
    pub(crate) store: &'s TypeStore,
    empty_memo: FxHashMap<TyRef, Memo<bool>>,
    pub(crate) norm_memo: FxHashMap<TyRef, Memo<SolutionSet>>,
    pub(crate) saturate_seen: FxHashSet<TyRef>,
    fuel: u64,
    token: Option<CancellationToken>,
}

impl<'s> QueryCtx<'s> {
    pub fn new(store: &'s TypeStore) -> Self {
        Self::with_budget(store, DEFAULT_FUEL)
    }

    /// A context that gives up with [`Interrupted::BudgetExhausted`] after
    /// `fuel` coclause visits.
    pub fn with_budget(store: &'s TypeStore, fuel: u64) -> Self {
        Self {
            store,
            empty_memo: FxHashMap::default(),
            norm_memo: FxHashMap::default(),
            saturate_seen: FxHashSet::default(),
            fuel,
            token: None,
        }
    }

    pub fn with_cancellation(store: &'s TypeStore, token: CancellationToken) -> Self {
        let mut ctx = Self::new(store);
        ctx.token = Some(token);
        ctx
    }

    /// Charged at every DNF-coclause boundary.
    pub(crate) fn tick(&mut self) -> Result<(), Interrupted> {
        if self.fuel == 0 {
            return Err(Interrupted::BudgetExhausted);
        }
        self.fuel -= 1;
        if let Some(token) = &self.token {
            if token.is_cancelled() {
                return Err(Interrupted::Cancelled);
            }
        }
        Ok(())
    }

    pub fn is_subtype(&mut self, a: TyRef, b: TyRef) -> Result<bool, Interrupted> {
        let _span = tracing::trace_span!("is_subtype", lhs = ?a, rhs = ?b).entered();
        let gap = self.store.diff(a, b);
        self.is_empty(gap)
    }

    pub fn is_empty(&mut self, t: TyRef) -> Result<bool, Interrupted> {
        match self.empty_memo.get(&t) {
            Some(Memo::Settled(result)) => return Ok(*result),
            // Coinductive hypothesis: assume empty while computing.
            Some(Memo::Pending) => return Ok(true),
            None => {}
        }
        self.empty_memo.insert(t, Memo::Pending);
        let record = self.store.resolve(t);
        match self.record_is_empty(&record) {
            Ok(result) => {
                self.empty_memo.insert(t, Memo::Settled(result));
                Ok(result)
            }
            Err(interrupt) => {
                // An interrupted computation settles nothing.
                self.empty_memo.remove(&t);
                Err(interrupt)
            }
        }
    }

    fn record_is_empty(&mut self, record: &TypeRecord) -> Result<bool, Interrupted> {
        for (_, slot) in record.functions.iter_slots() {
            if !self.slot_is_empty(slot, function::coclause_is_empty)? {
                return Ok(false);
            }
        }
        for (_, slot) in record.tuples.iter_slots() {
            if !self.slot_is_empty(slot, tuple::coclause_is_empty)? {
                return Ok(false);
            }
        }
        if !self.slot_is_empty(&record.records, record::coclause_is_empty)? {
            return Ok(false);
        }
        if !self.slot_is_empty(&record.atoms, |_ctx, pos, neg| {
            Ok(atom::coclause_is_empty(pos, neg))
        })? {
            return Ok(false);
        }
        if !self.slot_is_empty(&record.integers, |_ctx, pos, neg| {
            Ok(interval::coclause_is_empty(pos, neg))
        })? {
            return Ok(false);
        }
        if !self.slot_is_empty(&record.bitstrings, bitstring::coclause_is_empty)? {
            return Ok(false);
        }
        if !self.slot_is_empty(&record.maps, map::coclause_is_empty)? {
            return Ok(false);
        }
        Ok(true)
    }

    fn slot_is_empty<A: CtorAtom>(
        &mut self,
        slot: &SlotBdd<A>,
        mut phi: impl FnMut(&mut Self, &[A], &[A]) -> Result<bool, Interrupted>,
    ) -> Result<bool, Interrupted> {
        for var_clause in slot.coclauses() {
            for ctor_clause in var_clause.leaf.coclauses() {
                self.tick()?;
                if !phi(self, &ctor_clause.positives, &ctor_clause.negatives)? {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}
