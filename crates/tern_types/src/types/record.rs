//! Coclause emptiness and normalization for tagged records.
//!
//! A record atom is a tag plus a field row. Records with different tags or
//! widths are disjoint, so positives that disagree make the coclause empty
//! outright, negatives that disagree exclude nothing, and what remains is
//! the tuple product walk over the fields.

use rustc_hash::FxHashSet;

use crate::constraints::SolutionSet;
use crate::error::Interrupted;
use crate::store::TyRef;
use crate::types::{tuple, QueryCtx, RecordAtom, Var};

fn same_shape(a: &RecordAtom, b: &RecordAtom) -> bool {
    a.tag == b.tag && a.fields.len() == b.fields.len()
}

pub(crate) fn coclause_is_empty(
    ctx: &mut QueryCtx<'_>,
    positives: &[RecordAtom],
    negatives: &[RecordAtom],
) -> Result<bool, Interrupted> {
    let Some(first) = positives.first() else {
        // Cofinite in the record universe: there are always unused tags.
        return Ok(false);
    };
    if positives.iter().any(|p| !same_shape(p, first)) {
        return Ok(true);
    }
    let components = intersect_fields(ctx, positives);
    let rows: Vec<&[TyRef]> = negatives
        .iter()
        .filter(|n| same_shape(n, first))
        .map(|n| &n.fields[..])
        .collect();
    tuple::product_is_empty(ctx, &components, &rows)
}

pub(crate) fn coclause_normalize(
    ctx: &mut QueryCtx<'_>,
    positives: &[RecordAtom],
    negatives: &[RecordAtom],
    fixed: &FxHashSet<Var>,
) -> Result<SolutionSet, Interrupted> {
    let Some(first) = positives.first() else {
        return Ok(SolutionSet::unsat());
    };
    if positives.iter().any(|p| !same_shape(p, first)) {
        // Disjoint tags: empty without any constraint.
        return Ok(SolutionSet::trivial());
    }
    let components = intersect_fields(ctx, positives);
    let rows: Vec<&[TyRef]> = negatives
        .iter()
        .filter(|n| same_shape(n, first))
        .map(|n| &n.fields[..])
        .collect();
    tuple::product_normalize(ctx, &components, &rows, fixed)
}

fn intersect_fields(ctx: &QueryCtx<'_>, positives: &[RecordAtom]) -> Vec<TyRef> {
    let mut components = vec![ctx.store.any(); positives[0].fields.len()];
    for p in positives {
        for (component, &field) in components.iter_mut().zip(p.fields.iter()) {
            *component = ctx.store.intersect(*component, field);
        }
    }
    components
}
