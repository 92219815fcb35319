//! The type reference store: a process-wide, hash-consed arena of
//! [`TypeRecord`]s addressed by opaque integer handles.
//!
//! Interning keeps records canonical -- two [`TyRef`]s are equal iff they
//! were interned from structurally equal records. Recursive types are built
//! with [`TypeStore::fresh_recursive`], which hands the record under
//! construction its own handle before it is stored.
//!
//! Mutation (interning) is serialized behind a `RwLock`; resolution takes
//! the read lock and clones the record, which is cheap because records
//! share interior diagram structure through `Arc`. The store is the only
//! synchronization point of the engine: query state lives in per-query
//! [`crate::QueryCtx`] values and is never shared.

use std::fmt;
use std::sync::{OnceLock, RwLock};

use compact_str::CompactString;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::constraints::SolutionSet;
use crate::error::{Interrupted, StructuralError};
use crate::types::{IntervalAtom, QueryCtx, Symbol, TypeRecord, Var};

/// An opaque handle to a canonical type record.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TyRef(u32);

impl TyRef {
    /// `TypeStore::new` interns the empty and the universal record first,
    /// so these two handles are stable across stores.
    pub(crate) const EMPTY: TyRef = TyRef(0);
    pub(crate) const ANY: TyRef = TyRef(1);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for TyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

#[derive(Default)]
struct StoreInner {
    records: Vec<TypeRecord>,
    interned: FxHashMap<TypeRecord, TyRef>,
    var_names: Vec<CompactString>,
    vars_by_name: FxHashMap<CompactString, Var>,
}

/// The arena. See the module docs.
pub struct TypeStore {
    inner: RwLock<StoreInner>,
}

static GLOBAL: OnceLock<TypeStore> = OnceLock::new();

impl Default for TypeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeStore {
    pub fn new() -> Self {
        let store = Self {
            inner: RwLock::new(StoreInner::default()),
        };
        let empty = store.intern(TypeRecord::empty());
        debug_assert_eq!(empty, TyRef::EMPTY);
        let any = store.intern(TypeRecord::any());
        debug_assert_eq!(any, TyRef::ANY);
        store
    }

    /// The process-wide store. Tests and embedders that want isolation
    /// construct their own.
    pub fn global() -> &'static TypeStore {
        GLOBAL.get_or_init(TypeStore::new)
    }

    /// Returns the existing handle for a structurally equal record, or
    /// allocates a fresh one.
    pub fn intern(&self, record: TypeRecord) -> TyRef {
        if let Some(&existing) = self.inner.read().unwrap().interned.get(&record) {
            return existing;
        }
        let mut inner = self.inner.write().unwrap();
        if let Some(&existing) = inner.interned.get(&record) {
            return existing;
        }
        let id = TyRef(u32::try_from(inner.records.len()).expect("type store overflow"));
        inner.records.push(record.clone());
        inner.interned.insert(record, id);
        id
    }

    /// Total on handles produced by this store.
    pub fn resolve(&self, t: TyRef) -> TypeRecord {
        self.inner.read().unwrap().records[t.index()].clone()
    }

    /// Allocates a handle, invokes `mk` with it so the record may refer to
    /// itself, and stores the result. If the built record turns out to be
    /// non-recursive and already interned, the existing handle is returned
    /// instead (the placeholder still resolves, so resolution stays total).
    pub fn fresh_recursive(&self, mk: impl FnOnce(TyRef) -> TypeRecord) -> TyRef {
        let placeholder = {
            let mut inner = self.inner.write().unwrap();
            let id = TyRef(u32::try_from(inner.records.len()).expect("type store overflow"));
            inner.records.push(TypeRecord::empty());
            id
        };
        let record = mk(placeholder);
        let recursive = self.reaches(&record, placeholder);
        let mut inner = self.inner.write().unwrap();
        inner.records[placeholder.index()] = record.clone();
        if recursive {
            inner.interned.entry(record).or_insert(placeholder);
            placeholder
        } else if let Some(&existing) = inner.interned.get(&record) {
            existing
        } else {
            inner.interned.insert(record, placeholder);
            placeholder
        }
    }

    /// Does `record` reference `target`, transitively through the store?
    fn reaches(&self, record: &TypeRecord, target: TyRef) -> bool {
        let mut seen = FxHashSet::default();
        let mut work = Vec::new();
        record.for_each_ref(&mut |r| work.push(r));
        while let Some(r) = work.pop() {
            if r == target {
                return true;
            }
            if !seen.insert(r) {
                continue;
            }
            self.resolve(r).for_each_ref(&mut |child| work.push(child));
        }
        false
    }

    /// Does the type behind `t` transitively reference `target`?
    pub fn has_ref(&self, t: TyRef, target: TyRef) -> bool {
        t == target || self.reaches(&self.resolve(t), target)
    }

    /// Structural equality of the denoted canonical records. Handles from
    /// `intern` compare equal directly; `fresh_recursive` placeholders may
    /// alias an equal record under a second handle.
    pub fn equal(&self, a: TyRef, b: TyRef) -> bool {
        a == b || self.resolve(a) == self.resolve(b)
    }

    // ------------------------------------------------------------------
    // Variables
    // ------------------------------------------------------------------

    /// Interns a variable by name: the same name yields the same variable.
    pub fn variable(&self, name: &str) -> Var {
        if let Some(&var) = self.inner.read().unwrap().vars_by_name.get(name) {
            return var;
        }
        let mut inner = self.inner.write().unwrap();
        if let Some(&var) = inner.vars_by_name.get(name) {
            return var;
        }
        let var = Var(u32::try_from(inner.var_names.len()).expect("variable table overflow"));
        inner.var_names.push(CompactString::from(name));
        inner.vars_by_name.insert(CompactString::from(name), var);
        var
    }

    /// Allocates a variable that is guaranteed fresh, deriving its name
    /// from `prefix`.
    pub fn fresh_var(&self, prefix: &str) -> Var {
        let mut inner = self.inner.write().unwrap();
        let mut name = CompactString::from(prefix);
        let mut n = 0usize;
        while inner.vars_by_name.contains_key(&name) {
            n += 1;
            name = CompactString::from(format!("{prefix}#{n}"));
        }
        let var = Var(u32::try_from(inner.var_names.len()).expect("variable table overflow"));
        inner.var_names.push(name.clone());
        inner.vars_by_name.insert(name, var);
        var
    }

    pub fn var_name(&self, var: Var) -> CompactString {
        self.inner.read().unwrap().var_names[var.index()].clone()
    }

    /// The type denoted by a bare variable.
    pub fn var_type(&self, var: Var) -> TyRef {
        self.intern(TypeRecord::variable(var))
    }

    // ------------------------------------------------------------------
    // Algebra over handles
    // ------------------------------------------------------------------

    pub fn empty(&self) -> TyRef {
        TyRef::EMPTY
    }

    pub fn any(&self) -> TyRef {
        TyRef::ANY
    }

    pub fn union(&self, a: TyRef, b: TyRef) -> TyRef {
        if a == b {
            return a;
        }
        self.intern(self.resolve(a).union(&self.resolve(b)))
    }

    pub fn intersect(&self, a: TyRef, b: TyRef) -> TyRef {
        if a == b {
            return a;
        }
        self.intern(self.resolve(a).intersect(&self.resolve(b)))
    }

    pub fn diff(&self, a: TyRef, b: TyRef) -> TyRef {
        self.intern(self.resolve(a).diff(&self.resolve(b)))
    }

    pub fn negate(&self, t: TyRef) -> TyRef {
        self.intern(self.resolve(t).negate())
    }

    // ------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------

    pub fn atom(&self, name: &str) -> TyRef {
        self.intern(TypeRecord::atom(Symbol::new(name)))
    }

    pub fn any_atom(&self) -> TyRef {
        self.intern(TypeRecord::any_atom())
    }

    /// `'true' ∨ 'false'`.
    pub fn boolean(&self) -> TyRef {
        self.intern(
            TypeRecord::atom(Symbol::new("true")).union(&TypeRecord::atom(Symbol::new("false"))),
        )
    }

    pub fn integer(&self) -> TyRef {
        self.intern(TypeRecord::integer())
    }

    pub fn int_value(&self, value: i64) -> TyRef {
        self.intern(TypeRecord::interval(IntervalAtom::value(value)))
    }

    /// A possibly unbounded integer range; `None` is the missing bound.
    pub fn int_range(
        &self,
        lo: Option<i64>,
        hi: Option<i64>,
    ) -> Result<TyRef, StructuralError> {
        if let (Some(lo), Some(hi)) = (lo, hi) {
            if lo > hi {
                return Err(StructuralError::InvalidRange { lo, hi });
            }
        }
        Ok(self.intern(TypeRecord::interval(IntervalAtom::new(lo, hi))))
    }

    pub fn function(&self, domain: &[TyRef], codomain: TyRef) -> TyRef {
        self.intern(TypeRecord::function(domain, codomain))
    }

    pub fn any_function(&self) -> TyRef {
        self.intern(TypeRecord::any_function())
    }

    /// A union of arrows that must all carry the declared arity.
    pub fn function_dnf(
        &self,
        arity: usize,
        arrows: &[(Vec<TyRef>, TyRef)],
    ) -> Result<TyRef, StructuralError> {
        let mut acc = TypeRecord::empty();
        for (domain, codomain) in arrows {
            if domain.len() != arity {
                return Err(StructuralError::ArityMismatch {
                    expected: arity,
                    actual: domain.len(),
                });
            }
            acc = acc.union(&TypeRecord::function(domain, *codomain));
        }
        Ok(self.intern(acc))
    }

    pub fn tuple(&self, elements: &[TyRef]) -> TyRef {
        self.intern(TypeRecord::tuple(elements))
    }

    pub fn any_tuple(&self) -> TyRef {
        self.intern(TypeRecord::any_tuple())
    }

    /// A union of tuple rows that must all carry the declared arity.
    pub fn tuple_dnf(&self, arity: usize, rows: &[Vec<TyRef>]) -> Result<TyRef, StructuralError> {
        let mut acc = TypeRecord::empty();
        for row in rows {
            if row.len() != arity {
                return Err(StructuralError::ArityMismatch {
                    expected: arity,
                    actual: row.len(),
                });
            }
            acc = acc.union(&TypeRecord::tuple(row));
        }
        Ok(self.intern(acc))
    }

    pub fn record(&self, tag: &str, fields: &[TyRef]) -> TyRef {
        self.intern(TypeRecord::record(Symbol::new(tag), fields))
    }

    pub fn bitstring(&self, size: u64, unit: u64) -> TyRef {
        self.intern(TypeRecord::bitstring(size, unit))
    }

    pub fn any_bitstring(&self) -> TyRef {
        self.intern(TypeRecord::any_bitstring())
    }

    pub fn map(&self, key: TyRef, value: TyRef) -> TyRef {
        self.intern(TypeRecord::map(key, value))
    }

    pub fn any_map(&self) -> TyRef {
        self.intern(TypeRecord::any_map())
    }

    pub fn nil(&self) -> TyRef {
        self.atom("nil")
    }

    /// `rec X. 'nil' ∨ (element, X)` -- proper lists, derived from atoms and
    /// pairs.
    pub fn list(&self, element: TyRef) -> TyRef {
        let nil = self.resolve(self.nil());
        self.fresh_recursive(|this| nil.union(&TypeRecord::tuple(&[element, this])))
    }

    // ------------------------------------------------------------------
    // Queries (fresh per-call contexts; see `QueryCtx` for budgets)
    // ------------------------------------------------------------------

    pub fn is_empty(&self, t: TyRef) -> Result<bool, Interrupted> {
        QueryCtx::new(self).is_empty(t)
    }

    pub fn is_subtype(&self, a: TyRef, b: TyRef) -> Result<bool, Interrupted> {
        QueryCtx::new(self).is_subtype(a, b)
    }

    /// Solves `a ≤ b` for every pair, treating `fixed` variables as rigid.
    pub fn tally(
        &self,
        constraints: &[(TyRef, TyRef)],
        fixed: &FxHashSet<Var>,
    ) -> Result<SolutionSet, Interrupted> {
        QueryCtx::new(self).tally(constraints, fixed)
    }
}
