//! Coclause emptiness and normalization for maps.
//!
//! Map atoms are optional associations `#{K => V}`: the empty map inhabits
//! every map type, so no intersection of positives is empty on its own. A
//! coclause is empty exactly when some negative absorbs the positive
//! intersection componentwise -- `⋂K ≤ Kₙ` and `⋂V ≤ Vₙ`.

use rustc_hash::FxHashSet;

use crate::constraints::SolutionSet;
use crate::error::Interrupted;
use crate::store::TyRef;
use crate::types::{MapAtom, QueryCtx, Var};

fn intersect_associations(ctx: &QueryCtx<'_>, positives: &[MapAtom]) -> (TyRef, TyRef) {
    let mut key = ctx.store.any();
    let mut value = ctx.store.any();
    for p in positives {
        key = ctx.store.intersect(key, p.key);
        value = ctx.store.intersect(value, p.value);
    }
    (key, value)
}

pub(crate) fn coclause_is_empty(
    ctx: &mut QueryCtx<'_>,
    positives: &[MapAtom],
    negatives: &[MapAtom],
) -> Result<bool, Interrupted> {
    let (key, value) = intersect_associations(ctx, positives);
    for n in negatives {
        ctx.tick()?;
        if ctx.is_empty(ctx.store.diff(key, n.key))?
            && ctx.is_empty(ctx.store.diff(value, n.value))?
        {
            return Ok(true);
        }
    }
    Ok(false)
}

pub(crate) fn coclause_normalize(
    ctx: &mut QueryCtx<'_>,
    positives: &[MapAtom],
    negatives: &[MapAtom],
    fixed: &FxHashSet<Var>,
) -> Result<SolutionSet, Interrupted> {
    let (key, value) = intersect_associations(ctx, positives);
    let mut acc = SolutionSet::unsat();
    for n in negatives {
        if acc.is_trivial() {
            break;
        }
        ctx.tick()?;
        let keys = ctx.normalize(ctx.store.diff(key, n.key), fixed)?;
        let alternative = if keys.is_unsat() {
            keys
        } else {
            keys.meet(ctx.normalize(ctx.store.diff(value, n.value), fixed)?)
        };
        acc = acc.join(alternative);
    }
    Ok(acc)
}
