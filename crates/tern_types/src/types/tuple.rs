//! Coclause emptiness and normalization for the tuple constructor.
//!
//! Positives of a common arity intersect componentwise into a single
//! product `(S₁, …, Sₙ)`. A negative row `(D₁, …, Dₙ)` is subtracted by
//! case split: for the difference to be empty, every slice
//! `(S₁, …, Sᵢ ∖ Dᵢ, …, Sₙ)` must be empty under the remaining negatives.
//! The same walk is shared with tagged records, which are products behind a
//! tag.

use rustc_hash::FxHashSet;

use crate::constraints::SolutionSet;
use crate::error::Interrupted;
use crate::store::TyRef;
use crate::types::{QueryCtx, TupleAtom, Var};

pub(crate) fn coclause_is_empty(
    ctx: &mut QueryCtx<'_>,
    positives: &[TupleAtom],
    negatives: &[TupleAtom],
) -> Result<bool, Interrupted> {
    let Some(components) = intersect_positives(ctx, positives, negatives) else {
        // No atoms at all: the whole arity universe, inhabited.
        return Ok(false);
    };
    let rows: Vec<&[TyRef]> = negatives.iter().map(|n| &n.elements[..]).collect();
    product_is_empty(ctx, &components, &rows)
}

pub(crate) fn coclause_normalize(
    ctx: &mut QueryCtx<'_>,
    positives: &[TupleAtom],
    negatives: &[TupleAtom],
    fixed: &FxHashSet<Var>,
) -> Result<SolutionSet, Interrupted> {
    let Some(components) = intersect_positives(ctx, positives, negatives) else {
        return Ok(SolutionSet::unsat());
    };
    let rows: Vec<&[TyRef]> = negatives.iter().map(|n| &n.elements[..]).collect();
    product_normalize(ctx, &components, &rows, fixed)
}

/// The componentwise intersection of the positive rows, or `None` for a
/// coclause without atoms. All rows in one diagram share their arity.
fn intersect_positives(
    ctx: &QueryCtx<'_>,
    positives: &[TupleAtom],
    negatives: &[TupleAtom],
) -> Option<Vec<TyRef>> {
    let arity = positives
        .first()
        .or_else(|| negatives.first())?
        .elements
        .len();
    let mut components = vec![ctx.store.any(); arity];
    for p in positives {
        debug_assert_eq!(p.elements.len(), arity);
        for (component, &element) in components.iter_mut().zip(p.elements.iter()) {
            *component = ctx.store.intersect(*component, element);
        }
    }
    Some(components)
}

/// Is `(S₁, …, Sₙ) ∖ ⋃ rows` empty?
pub(crate) fn product_is_empty(
    ctx: &mut QueryCtx<'_>,
    components: &[TyRef],
    negatives: &[&[TyRef]],
) -> Result<bool, Interrupted> {
    // A single empty component empties the product, negatives or not.
    for &component in components {
        if ctx.is_empty(component)? {
            return Ok(true);
        }
    }
    let Some((row, rest)) = negatives.split_first() else {
        return Ok(false);
    };
    debug_assert_eq!(row.len(), components.len());
    for index in 0..components.len() {
        ctx.tick()?;
        let mut sliced = components.to_vec();
        sliced[index] = ctx.store.diff(components[index], row[index]);
        if !product_is_empty(ctx, &sliced, rest)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Constraint-producing twin of [`product_is_empty`]: the join over
/// components of their normalizations (any empty component suffices), plus
/// the meet over slices for the first negative row.
pub(crate) fn product_normalize(
    ctx: &mut QueryCtx<'_>,
    components: &[TyRef],
    negatives: &[&[TyRef]],
    fixed: &FxHashSet<Var>,
) -> Result<SolutionSet, Interrupted> {
    let mut base = SolutionSet::unsat();
    for &component in components {
        if base.is_trivial() {
            break;
        }
        base = base.join(ctx.normalize(component, fixed)?);
    }
    let Some((row, rest)) = negatives.split_first() else {
        return Ok(base);
    };
    let mut step = SolutionSet::trivial();
    for index in 0..components.len() {
        if step.is_unsat() {
            break;
        }
        ctx.tick()?;
        let mut sliced = components.to_vec();
        sliced[index] = ctx.store.diff(components[index], row[index]);
        step = step.meet(product_normalize(ctx, &sliced, rest, fixed)?);
    }
    Ok(base.join(step))
}
