//! Human-readable rendering of types, constraints and solution sets.
//!
//! Output is meant for diagnostics and tests, not for parsing back: unions
//! of coclauses print as `… | …`, intersections as `… & …`, negated parts
//! with a `!` prefix. Recursive back-references print as `#tN` to keep the
//! output finite.

use std::fmt;

use crate::bdd::Bdd;
use crate::constraints::{Atomic, SolutionSet};
use crate::store::{TyRef, TypeStore};
use crate::types::{CtorAtom, SlotBdd, TypeRecord};

/// Wrapper tying a reference to the store that can resolve it.
pub struct DisplayType<'a> {
    store: &'a TypeStore,
    ty: TyRef,
}

impl TypeStore {
    pub fn display(&self, ty: TyRef) -> DisplayType<'_> {
        DisplayType { store: self, ty }
    }

    pub fn display_solutions<'a>(&'a self, solutions: &'a SolutionSet) -> DisplaySolutions<'a> {
        DisplaySolutions {
            store: self,
            solutions,
        }
    }
}

impl fmt::Display for DisplayType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = Vec::new();
        fmt_ref(self.store, self.ty, f, &mut stack)
    }
}

fn fmt_ref(
    store: &TypeStore,
    ty: TyRef,
    f: &mut fmt::Formatter<'_>,
    stack: &mut Vec<TyRef>,
) -> fmt::Result {
    if stack.contains(&ty) {
        return write!(f, "#t{}", ty.index());
    }
    stack.push(ty);
    let result = fmt_record(store, &store.resolve(ty), f, stack);
    stack.pop();
    result
}

fn fmt_record(
    store: &TypeStore,
    record: &TypeRecord,
    f: &mut fmt::Formatter<'_>,
    stack: &mut Vec<TyRef>,
) -> fmt::Result {
    if record.is_structurally_empty() {
        return f.write_str("none");
    }
    if *record == TypeRecord::any() {
        return f.write_str("any");
    }

    let mut first = true;
    let mut sep = |f: &mut fmt::Formatter<'_>| -> fmt::Result {
        if first {
            first = false;
            Ok(())
        } else {
            f.write_str(" | ")
        }
    };

    for (_, slot) in record.functions.iter_slots() {
        if !slot.is_bottom() {
            sep(f)?;
            fmt_slot(store, slot, "fun", f, stack, &fmt_function_atom)?;
        }
    }
    for (_, slot) in record.tuples.iter_slots() {
        if !slot.is_bottom() {
            sep(f)?;
            fmt_slot(store, slot, "tuple", f, stack, &fmt_tuple_atom)?;
        }
    }
    if !record.records.is_bottom() {
        sep(f)?;
        fmt_slot(store, &record.records, "record", f, stack, &fmt_record_atom)?;
    }
    if !record.atoms.is_bottom() {
        sep(f)?;
        fmt_slot(store, &record.atoms, "atom", f, stack, &|_, atom, f, _| {
            write!(f, "{atom}")
        })?;
    }
    if !record.integers.is_bottom() {
        sep(f)?;
        fmt_slot(store, &record.integers, "int", f, stack, &fmt_interval_atom)?;
    }
    if !record.bitstrings.is_bottom() {
        sep(f)?;
        fmt_slot(store, &record.bitstrings, "bits", f, stack, &|_, atom, f, _| {
            write!(f, "<<_:{}, _:_*{}>>", atom.size, atom.unit)
        })?;
    }
    if !record.maps.is_bottom() {
        sep(f)?;
        fmt_slot(store, &record.maps, "map", f, stack, &fmt_map_atom)?;
    }
    Ok(())
}

type AtomFmt<'x, A> =
    dyn Fn(&TypeStore, &A, &mut fmt::Formatter<'_>, &mut Vec<TyRef>) -> fmt::Result + 'x;

fn fmt_slot<A: CtorAtom>(
    store: &TypeStore,
    slot: &SlotBdd<A>,
    label: &str,
    f: &mut fmt::Formatter<'_>,
    stack: &mut Vec<TyRef>,
    fmt_atom: &AtomFmt<'_, A>,
) -> fmt::Result {
    if slot.is_top() {
        return write!(f, "{label}()");
    }
    let clauses = slot.coclauses();
    let mut first_clause = true;
    for clause in clauses {
        if !first_clause {
            f.write_str(" | ")?;
        }
        first_clause = false;
        let mut first_part = true;
        let mut sep = |f: &mut fmt::Formatter<'_>| -> fmt::Result {
            if first_part {
                first_part = false;
                Ok(())
            } else {
                f.write_str(" & ")
            }
        };
        for &var in &clause.positives {
            sep(f)?;
            write!(f, "{}", store.var_name(var))?;
        }
        for &var in &clause.negatives {
            sep(f)?;
            write!(f, "!{}", store.var_name(var))?;
        }
        if clause.leaf.is_top() {
            if clause.positives.is_empty() && clause.negatives.is_empty() {
                sep(f)?;
                write!(f, "{label}()")?;
            }
            continue;
        }
        match &clause.leaf {
            Bdd::Leaf(_) => {}
            Bdd::Node(_) => {
                for ctor_clause in clause.leaf.coclauses() {
                    for atom in &ctor_clause.positives {
                        sep(f)?;
                        fmt_atom(store, atom, f, stack)?;
                    }
                    for atom in &ctor_clause.negatives {
                        sep(f)?;
                        f.write_str("!")?;
                        fmt_atom(store, atom, f, stack)?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn fmt_function_atom(
    store: &TypeStore,
    atom: &crate::types::FunctionAtom,
    f: &mut fmt::Formatter<'_>,
    stack: &mut Vec<TyRef>,
) -> fmt::Result {
    f.write_str("(")?;
    for (index, &d) in atom.domain.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        fmt_ref(store, d, f, stack)?;
    }
    f.write_str(") -> ")?;
    fmt_ref(store, atom.codomain, f, stack)
}

fn fmt_tuple_atom(
    store: &TypeStore,
    atom: &crate::types::TupleAtom,
    f: &mut fmt::Formatter<'_>,
    stack: &mut Vec<TyRef>,
) -> fmt::Result {
    f.write_str("(")?;
    for (index, &e) in atom.elements.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        fmt_ref(store, e, f, stack)?;
    }
    f.write_str(")")
}

fn fmt_record_atom(
    store: &TypeStore,
    atom: &crate::types::RecordAtom,
    f: &mut fmt::Formatter<'_>,
    stack: &mut Vec<TyRef>,
) -> fmt::Result {
    write!(f, "#{}{{", atom.tag.as_str())?;
    for (index, &field) in atom.fields.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        fmt_ref(store, field, f, stack)?;
    }
    f.write_str("}")
}

fn fmt_interval_atom(
    _store: &TypeStore,
    atom: &crate::types::IntervalAtom,
    f: &mut fmt::Formatter<'_>,
    _stack: &mut Vec<TyRef>,
) -> fmt::Result {
    match (atom.lo, atom.hi) {
        (Some(lo), Some(hi)) if lo == hi => write!(f, "{lo}"),
        (Some(lo), Some(hi)) => write!(f, "{lo}..{hi}"),
        (Some(lo), None) => write!(f, "{lo}.."),
        (None, Some(hi)) => write!(f, "..{hi}"),
        (None, None) => f.write_str("int()"),
    }
}

fn fmt_map_atom(
    store: &TypeStore,
    atom: &crate::types::MapAtom,
    f: &mut fmt::Formatter<'_>,
    stack: &mut Vec<TyRef>,
) -> fmt::Result {
    f.write_str("#{")?;
    fmt_ref(store, atom.key, f, stack)?;
    f.write_str(" => ")?;
    fmt_ref(store, atom.value, f, stack)?;
    f.write_str("}")
}

/// Renders a solution set as `{bundle; bundle; …}`.
pub struct DisplaySolutions<'a> {
    store: &'a TypeStore,
    solutions: &'a SolutionSet,
}

impl fmt::Display for DisplaySolutions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.solutions.is_unsat() {
            return f.write_str("{}");
        }
        f.write_str("{ ")?;
        for (index, bundle) in self.solutions.bundles().iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            f.write_str("{")?;
            for (position, atomic) in bundle.iter().enumerate() {
                if position > 0 {
                    f.write_str(", ")?;
                }
                match atomic {
                    Atomic::Lower { bound, var } => write!(
                        f,
                        "{} <= {}",
                        self.store.display(*bound),
                        self.store.var_name(*var)
                    )?,
                    Atomic::Upper { var, bound } => write!(
                        f,
                        "{} <= {}",
                        self.store.var_name(*var),
                        self.store.display(*bound)
                    )?,
                }
            }
            f.write_str("}")?;
        }
        f.write_str(" }")
    }
}

#[cfg(test)]
mod tests {
    use crate::store::TypeStore;

    #[test]
    fn renders_simple_types() {
        let store = TypeStore::new();
        assert_eq!(store.display(store.empty()).to_string(), "none");
        assert_eq!(store.display(store.any()).to_string(), "any");
        assert_eq!(store.display(store.atom("ok")).to_string(), "'ok'");
        assert_eq!(store.display(store.int_value(42)).to_string(), "42");
    }

    #[test]
    fn renders_compound_types() {
        let store = TypeStore::new();
        let int = store.integer();
        let pair = store.tuple(&[int, store.atom("ok")]);
        assert_eq!(store.display(pair).to_string(), "(int(), 'ok')");
        let arrow = store.function(&[int], int);
        assert_eq!(store.display(arrow).to_string(), "(int()) -> int()");
    }

    #[test]
    fn recursive_types_render_finitely() {
        let store = TypeStore::new();
        let list = store.list(store.integer());
        let rendered = store.display(list).to_string();
        assert!(rendered.contains("'nil'"));
        assert!(rendered.contains(&format!("#t{}", list.index())));
    }
}
