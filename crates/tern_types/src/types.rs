//! The type record (`ty_rec`) and its componentwise algebra.
//!
//! A [`TypeRecord`] is the sum of one DNF per type constructor: function and
//! tuple diagrams keyed by arity, and single diagrams for tagged records,
//! atoms, integers, bitstrings and maps. Union, intersection and negation
//! distribute componentwise, so the algebra here is purely structural; the
//! semantic questions live in the emptiness and normalize engines.
//!
//! Every slot is a diagram over *type variables* whose leaves are the
//! constructor diagram -- a bare variable `α` denotes an unknown subset of
//! every constructor's universe, so constructing `Type::variable(α)` plants
//! the variable in each slot intersected with that slot's top.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use compact_str::CompactString;

use crate::bdd::{Atom, Bdd};
use crate::store::TyRef;

pub(crate) mod atom;
pub(crate) mod bitstring;
mod display;
mod emptiness;
pub(crate) mod function;
pub(crate) mod interval;
pub(crate) mod map;
mod normalize;
pub(crate) mod record;
mod substitute;
pub(crate) mod tuple;

pub use display::{DisplaySolutions, DisplayType};
pub use emptiness::QueryCtx;

/// A constructor diagram: atoms of one constructor over Boolean leaves.
pub(crate) type CtorBdd<A> = Bdd<A, bool>;

/// A full slot: a diagram over type variables carrying a constructor
/// diagram at each leaf.
pub(crate) type SlotBdd<A> = Bdd<Var, CtorBdd<A>>;

/// A type variable. The `u32` is an index into the store's variable table;
/// its order doubles as the canonical BDD atom order for variables.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Var(pub(crate) u32);

impl Var {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// An interned atom literal (a symbol such as `'ok'` or `'nil'`).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Symbol(CompactString);

impl Symbol {
    pub fn new(name: &str) -> Self {
        Self(CompactString::from(name))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.0)
    }
}

/// A function arrow `(D₁, …, Dₙ) → C`. Arity is part of the atom identity;
/// arrows of different arity never share a diagram.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct FunctionAtom {
    pub domain: Arc<[TyRef]>,
    pub codomain: TyRef,
}

/// A tuple row `(T₁, …, Tₙ)`, partitioned by arity like arrows.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TupleAtom {
    pub elements: Arc<[TyRef]>,
}

/// A tagged record `#tag{F₁, …, Fₙ}`. Records with different tags or widths
/// are disjoint.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct RecordAtom {
    pub tag: Symbol,
    pub fields: Arc<[TyRef]>,
}

/// An integer interval, possibly unbounded on either side (`None` stands
/// for the missing bound).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct IntervalAtom {
    pub(crate) lo: Option<i64>,
    pub(crate) hi: Option<i64>,
}

impl IntervalAtom {
    /// `lo ≤ hi` is the caller's obligation; the store boundary validates.
    pub(crate) fn new(lo: Option<i64>, hi: Option<i64>) -> Self {
        debug_assert!(match (lo, hi) {
            (Some(lo), Some(hi)) => lo <= hi,
            _ => true,
        });
        Self { lo, hi }
    }

    pub(crate) fn value(value: i64) -> Self {
        Self::new(Some(value), Some(value))
    }
}

/// A bitstring size set `{size + k·unit | k ≥ 0}` in bits. `unit == 0`
/// denotes the single size `size`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct BitsAtom {
    pub size: u64,
    pub unit: u64,
}

/// An optional-association map `#{K => V}`. The empty map inhabits every
/// map type.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct MapAtom {
    pub key: TyRef,
    pub value: TyRef,
}

/// Constructor atoms that may embed type references expose them through
/// this trait so that substitution and the reachability walks stay generic
/// over slots.
pub(crate) trait CtorAtom: Atom {
    fn for_each_ref(&self, f: &mut dyn FnMut(TyRef));
    fn map_refs(&self, f: &mut dyn FnMut(TyRef) -> TyRef) -> Self;
}

impl CtorAtom for FunctionAtom {
    fn for_each_ref(&self, f: &mut dyn FnMut(TyRef)) {
        for &d in self.domain.iter() {
            f(d);
        }
        f(self.codomain);
    }

    fn map_refs(&self, f: &mut dyn FnMut(TyRef) -> TyRef) -> Self {
        Self {
            domain: self.domain.iter().map(|&d| f(d)).collect(),
            codomain: f(self.codomain),
        }
    }
}

impl CtorAtom for TupleAtom {
    fn for_each_ref(&self, f: &mut dyn FnMut(TyRef)) {
        for &e in self.elements.iter() {
            f(e);
        }
    }

    fn map_refs(&self, f: &mut dyn FnMut(TyRef) -> TyRef) -> Self {
        Self {
            elements: self.elements.iter().map(|&e| f(e)).collect(),
        }
    }
}

impl CtorAtom for RecordAtom {
    fn for_each_ref(&self, f: &mut dyn FnMut(TyRef)) {
        for &field in self.fields.iter() {
            f(field);
        }
    }

    fn map_refs(&self, f: &mut dyn FnMut(TyRef) -> TyRef) -> Self {
        Self {
            tag: self.tag.clone(),
            fields: self.fields.iter().map(|&field| f(field)).collect(),
        }
    }
}

impl CtorAtom for MapAtom {
    fn for_each_ref(&self, f: &mut dyn FnMut(TyRef)) {
        f(self.key);
        f(self.value);
    }

    fn map_refs(&self, f: &mut dyn FnMut(TyRef) -> TyRef) -> Self {
        Self {
            key: f(self.key),
            value: f(self.value),
        }
    }
}

impl CtorAtom for Symbol {
    fn for_each_ref(&self, _f: &mut dyn FnMut(TyRef)) {}

    fn map_refs(&self, _f: &mut dyn FnMut(TyRef) -> TyRef) -> Self {
        self.clone()
    }
}

impl CtorAtom for IntervalAtom {
    fn for_each_ref(&self, _f: &mut dyn FnMut(TyRef)) {}

    fn map_refs(&self, _f: &mut dyn FnMut(TyRef) -> TyRef) -> Self {
        *self
    }
}

impl CtorAtom for BitsAtom {
    fn for_each_ref(&self, _f: &mut dyn FnMut(TyRef)) {}

    fn map_refs(&self, _f: &mut dyn FnMut(TyRef) -> TyRef) -> Self {
        *self
    }
}

/// Arity-keyed family of slots. `default` covers every arity without an
/// explicit entry, which is what makes the family negatable: complementing
/// a single-arity constructor turns the default from bottom to top.
///
/// Canonical form: no entry equals the default.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub(crate) struct ByArity<A> {
    pub(crate) default: SlotBdd<A>,
    pub(crate) entries: BTreeMap<usize, SlotBdd<A>>,
}

impl<A: CtorAtom> ByArity<A> {
    pub(crate) fn bottom() -> Self {
        Self {
            default: SlotBdd::bottom(),
            entries: BTreeMap::new(),
        }
    }

    pub(crate) fn top() -> Self {
        Self {
            default: SlotBdd::top(),
            entries: BTreeMap::new(),
        }
    }

    /// The family that is `slot` at every arity (used for variables, which
    /// do not discriminate on arity).
    pub(crate) fn uniform(slot: SlotBdd<A>) -> Self {
        Self {
            default: slot,
            entries: BTreeMap::new(),
        }
    }

    pub(crate) fn from_entry(arity: usize, slot: SlotBdd<A>) -> Self {
        Self {
            default: SlotBdd::bottom(),
            entries: BTreeMap::from([(arity, slot)]),
        }
        .normalized()
    }

    pub(crate) fn new(default: SlotBdd<A>, entries: BTreeMap<usize, SlotBdd<A>>) -> Self {
        Self { default, entries }.normalized()
    }

    pub(crate) fn at(&self, arity: usize) -> &SlotBdd<A> {
        self.entries.get(&arity).unwrap_or(&self.default)
    }

    pub(crate) fn is_bottom(&self) -> bool {
        self.default.is_bottom() && self.entries.values().all(Bdd::is_bottom)
    }

    pub(crate) fn union(&self, other: &Self) -> Self {
        self.apply(other, Bdd::union)
    }

    pub(crate) fn intersect(&self, other: &Self) -> Self {
        self.apply(other, Bdd::intersect)
    }

    pub(crate) fn diff(&self, other: &Self) -> Self {
        self.apply(other, Bdd::diff)
    }

    pub(crate) fn negate(&self) -> Self {
        Self {
            default: self.default.negate(),
            entries: self
                .entries
                .iter()
                .map(|(&arity, slot)| (arity, slot.negate()))
                .collect(),
        }
        .normalized()
    }

    fn apply(&self, other: &Self, op: impl Fn(&SlotBdd<A>, &SlotBdd<A>) -> SlotBdd<A>) -> Self {
        let mut entries = BTreeMap::new();
        for &arity in self.entries.keys().chain(other.entries.keys()) {
            entries.insert(arity, op(self.at(arity), other.at(arity)));
        }
        Self {
            default: op(&self.default, &other.default),
            entries,
        }
        .normalized()
    }

    fn normalized(self) -> Self {
        let Self {
            default,
            mut entries,
        } = self;
        entries.retain(|_, slot| *slot != default);
        Self { default, entries }
    }

    /// All slots of the family: the default first (`None`), then the
    /// explicit arities.
    pub(crate) fn iter_slots(&self) -> impl Iterator<Item = (Option<usize>, &SlotBdd<A>)> {
        std::iter::once((None, &self.default))
            .chain(self.entries.iter().map(|(&arity, slot)| (Some(arity), slot)))
    }
}

/// The sum of all constructor DNFs: one canonical, hash-consable value per
/// type. Boolean operations distribute componentwise.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TypeRecord {
    pub(crate) functions: ByArity<FunctionAtom>,
    pub(crate) tuples: ByArity<TupleAtom>,
    pub(crate) records: SlotBdd<RecordAtom>,
    pub(crate) atoms: SlotBdd<Symbol>,
    pub(crate) integers: SlotBdd<IntervalAtom>,
    pub(crate) bitstrings: SlotBdd<BitsAtom>,
    pub(crate) maps: SlotBdd<MapAtom>,
}

impl TypeRecord {
    pub fn empty() -> Self {
        Self {
            functions: ByArity::bottom(),
            tuples: ByArity::bottom(),
            records: SlotBdd::bottom(),
            atoms: SlotBdd::bottom(),
            integers: SlotBdd::bottom(),
            bitstrings: SlotBdd::bottom(),
            maps: SlotBdd::bottom(),
        }
    }

    pub fn any() -> Self {
        Self {
            functions: ByArity::top(),
            tuples: ByArity::top(),
            records: SlotBdd::top(),
            atoms: SlotBdd::top(),
            integers: SlotBdd::top(),
            bitstrings: SlotBdd::top(),
            maps: SlotBdd::top(),
        }
    }

    /// Structural bottom check -- every slot is the bottom diagram. Not
    /// semantic emptiness.
    pub fn is_structurally_empty(&self) -> bool {
        self.functions.is_bottom()
            && self.tuples.is_bottom()
            && self.records.is_bottom()
            && self.atoms.is_bottom()
            && self.integers.is_bottom()
            && self.bitstrings.is_bottom()
            && self.maps.is_bottom()
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            functions: self.functions.union(&other.functions),
            tuples: self.tuples.union(&other.tuples),
            records: self.records.union(&other.records),
            atoms: self.atoms.union(&other.atoms),
            integers: self.integers.union(&other.integers),
            bitstrings: self.bitstrings.union(&other.bitstrings),
            maps: self.maps.union(&other.maps),
        }
    }

    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            functions: self.functions.intersect(&other.functions),
            tuples: self.tuples.intersect(&other.tuples),
            records: self.records.intersect(&other.records),
            atoms: self.atoms.intersect(&other.atoms),
            integers: self.integers.intersect(&other.integers),
            bitstrings: self.bitstrings.intersect(&other.bitstrings),
            maps: self.maps.intersect(&other.maps),
        }
    }

    pub fn diff(&self, other: &Self) -> Self {
        self.intersect(&other.negate())
    }

    pub fn negate(&self) -> Self {
        Self {
            functions: self.functions.negate(),
            tuples: self.tuples.negate(),
            records: self.records.negate(),
            atoms: self.atoms.negate(),
            integers: self.integers.negate(),
            bitstrings: self.bitstrings.negate(),
            maps: self.maps.negate(),
        }
    }

    pub fn function(domain: &[TyRef], codomain: TyRef) -> Self {
        let atom = FunctionAtom {
            domain: domain.into(),
            codomain,
        };
        Self {
            functions: ByArity::from_entry(domain.len(), Bdd::Leaf(CtorBdd::atom(atom))),
            ..Self::empty()
        }
    }

    pub fn any_function() -> Self {
        Self {
            functions: ByArity::top(),
            ..Self::empty()
        }
    }

    pub fn tuple(elements: &[TyRef]) -> Self {
        let atom = TupleAtom {
            elements: elements.into(),
        };
        Self {
            tuples: ByArity::from_entry(elements.len(), Bdd::Leaf(CtorBdd::atom(atom))),
            ..Self::empty()
        }
    }

    pub fn any_tuple() -> Self {
        Self {
            tuples: ByArity::top(),
            ..Self::empty()
        }
    }

    pub fn record(tag: Symbol, fields: &[TyRef]) -> Self {
        let atom = RecordAtom {
            tag,
            fields: fields.into(),
        };
        Self {
            records: Bdd::Leaf(CtorBdd::atom(atom)),
            ..Self::empty()
        }
    }

    pub fn atom(symbol: Symbol) -> Self {
        Self {
            atoms: Bdd::Leaf(CtorBdd::atom(symbol)),
            ..Self::empty()
        }
    }

    pub fn any_atom() -> Self {
        Self {
            atoms: SlotBdd::top(),
            ..Self::empty()
        }
    }

    /// The type of all integers.
    pub fn integer() -> Self {
        Self {
            integers: SlotBdd::top(),
            ..Self::empty()
        }
    }

    pub fn interval(atom: IntervalAtom) -> Self {
        if atom == IntervalAtom::new(None, None) {
            return Self::integer();
        }
        Self {
            integers: Bdd::Leaf(CtorBdd::atom(atom)),
            ..Self::empty()
        }
    }

    pub fn bitstring(size: u64, unit: u64) -> Self {
        if (size, unit) == (0, 1) {
            return Self::any_bitstring();
        }
        Self {
            bitstrings: Bdd::Leaf(CtorBdd::atom(BitsAtom { size, unit })),
            ..Self::empty()
        }
    }

    pub fn any_bitstring() -> Self {
        Self {
            bitstrings: SlotBdd::top(),
            ..Self::empty()
        }
    }

    pub fn map(key: TyRef, value: TyRef) -> Self {
        Self {
            maps: Bdd::Leaf(CtorBdd::atom(MapAtom { key, value })),
            ..Self::empty()
        }
    }

    pub fn any_map() -> Self {
        Self {
            maps: SlotBdd::top(),
            ..Self::empty()
        }
    }

    /// A bare type variable: an unknown subset of every constructor's
    /// universe, so the variable lands in each slot intersected with that
    /// slot's top.
    pub fn variable(var: Var) -> Self {
        Self {
            functions: ByArity::uniform(SlotBdd::atom(var)),
            tuples: ByArity::uniform(SlotBdd::atom(var)),
            records: SlotBdd::atom(var),
            atoms: SlotBdd::atom(var),
            integers: SlotBdd::atom(var),
            bitstrings: SlotBdd::atom(var),
            maps: SlotBdd::atom(var),
        }
    }

    /// Invokes `f` for every type reference embedded in this record's
    /// constructor atoms. Not transitive -- the store's walkers follow the
    /// references with a seen-set.
    pub(crate) fn for_each_ref(&self, f: &mut impl FnMut(TyRef)) {
        fn slot<A: CtorAtom>(slot: &SlotBdd<A>, f: &mut impl FnMut(TyRef)) {
            slot.for_each_leaf(&mut |ctor| {
                ctor.for_each_atom(&mut |atom| atom.for_each_ref(f));
            });
        }
        for (_, s) in self.functions.iter_slots() {
            slot(s, f);
        }
        for (_, s) in self.tuples.iter_slots() {
            slot(s, f);
        }
        slot(&self.records, f);
        slot(&self.atoms, f);
        slot(&self.integers, f);
        slot(&self.bitstrings, f);
        slot(&self.maps, f);
    }

    /// Invokes `f` for every variable atom in this record's outer diagrams.
    /// Variables buried inside referenced types are not visited.
    pub(crate) fn for_each_var(&self, f: &mut impl FnMut(Var)) {
        fn slot<A: CtorAtom>(slot: &SlotBdd<A>, f: &mut impl FnMut(Var)) {
            slot.for_each_atom(&mut |&var| f(var));
        }
        for (_, s) in self.functions.iter_slots() {
            slot(s, f);
        }
        for (_, s) in self.tuples.iter_slots() {
            slot(s, f);
        }
        slot(&self.records, f);
        slot(&self.atoms, f);
        slot(&self.integers, f);
        slot(&self.bitstrings, f);
        slot(&self.maps, f);
    }
}

#[cfg(test)]
mod tests {
    use super::{Symbol, TypeRecord};

    #[test]
    fn any_and_empty_are_complements() {
        assert_eq!(TypeRecord::any().negate(), TypeRecord::empty());
        assert_eq!(TypeRecord::empty().negate(), TypeRecord::any());
    }

    #[test]
    fn union_with_complement_is_any() {
        let t = TypeRecord::atom(Symbol::new("ok")).union(&TypeRecord::integer());
        assert_eq!(t.union(&t.negate()), TypeRecord::any());
        assert_eq!(t.intersect(&t.negate()), TypeRecord::empty());
    }

    #[test]
    fn double_negation_is_identity() {
        let t = TypeRecord::atom(Symbol::new("ok")).union(&TypeRecord::any_tuple());
        assert_eq!(t.negate().negate(), t);
    }

    #[test]
    fn arity_partition() {
        use crate::store::TypeStore;
        let store = TypeStore::new();
        let int = store.integer();
        // A unary and a binary tuple do not overlap.
        let unary = TypeRecord::tuple(&[int]);
        let binary = TypeRecord::tuple(&[int, int]);
        assert_eq!(unary.intersect(&binary), TypeRecord::empty());
    }

    #[test]
    fn variable_distributes_into_each_slot() {
        use crate::store::TypeStore;
        let store = TypeStore::new();
        let alpha = store.fresh_var("alpha");
        let v = TypeRecord::variable(alpha);
        // α ∧ ¬α is structurally empty, componentwise.
        assert_eq!(v.intersect(&v.negate()), TypeRecord::empty());
        // α ∪ ¬α is structurally any.
        assert_eq!(v.union(&v.negate()), TypeRecord::any());
    }
}
