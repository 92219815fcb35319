//! Coclause emptiness and normalization for function arrows -- the central
//! algorithm of the engine.
//!
//! An intersection of positive arrows is never empty by itself (the
//! function defined nowhere inhabits every arrow type); only a negative
//! arrow `(Dⁿ) → Cⁿ` can witness emptiness. It does so when its domain is
//! covered by the union of the positive domains and the `explore` walk
//! certifies that every way of splitting the positives pins the negative
//! down: along one branch the candidate argument slice runs dry, along the
//! other the accumulated codomain is forced under `Cⁿ`. Codomains are
//! covariant, domains contravariant; domain rows are compared as tuples of
//! the arrow's arity.
//!
//! `explore_norm` is the same recursion with emptiness checks replaced by
//! constraint generation: alternatives become joins, conjunctions become
//! meets, and the lattice operands are forced lazily so that an absorbing
//! element prunes the rest of the walk.

use rustc_hash::FxHashSet;

use crate::constraints::SolutionSet;
use crate::error::Interrupted;
use crate::store::{TyRef, TypeStore};
use crate::types::{FunctionAtom, QueryCtx, Var};

/// The domain row of an arrow, as a tuple type of the arrow's arity.
fn domain_tuple(store: &TypeStore, atom: &FunctionAtom) -> TyRef {
    store.tuple(&atom.domain)
}

/// The union of all positive domains, the set of arguments on which the
/// positive intersection promises anything at all.
fn covered_domain(store: &TypeStore, positives: &[FunctionAtom]) -> TyRef {
    let mut covered = store.empty();
    for p in positives {
        covered = store.union(covered, domain_tuple(store, p));
    }
    covered
}

pub(crate) fn coclause_is_empty(
    ctx: &mut QueryCtx<'_>,
    positives: &[FunctionAtom],
    negatives: &[FunctionAtom],
) -> Result<bool, Interrupted> {
    if negatives.is_empty() {
        return Ok(false);
    }
    let covered = covered_domain(ctx.store, positives);
    for n in negatives {
        ctx.tick()?;
        let domain = domain_tuple(ctx.store, n);
        let not_codomain = ctx.store.negate(n.codomain);
        if ctx.is_empty(ctx.store.diff(domain, covered))?
            && explore(ctx, domain, not_codomain, positives)?
        {
            return Ok(true);
        }
    }
    Ok(false)
}

/// `explore(Ts, T2, P)`: is every function in `⋀P` forced to map the
/// argument slice `Ts` into `¬T2`… emptily? Splitting on the head arrow
/// either narrows the codomain accumulator or subtracts the head's domain
/// from the slice; both branches must succeed.
fn explore(
    ctx: &mut QueryCtx<'_>,
    ts: TyRef,
    t2: TyRef,
    positives: &[FunctionAtom],
) -> Result<bool, Interrupted> {
    ctx.tick()?;
    if ctx.is_empty(ts)? || ctx.is_empty(t2)? {
        return Ok(true);
    }
    let Some((head, rest)) = positives.split_first() else {
        return Ok(false);
    };
    let narrowed = ctx.store.intersect(t2, head.codomain);
    let uncovered = ctx.store.diff(ts, domain_tuple(ctx.store, head));
    Ok(explore(ctx, ts, narrowed, rest)? && explore(ctx, uncovered, t2, rest)?)
}

pub(crate) fn coclause_normalize(
    ctx: &mut QueryCtx<'_>,
    positives: &[FunctionAtom],
    negatives: &[FunctionAtom],
    fixed: &FxHashSet<Var>,
) -> Result<SolutionSet, Interrupted> {
    if negatives.is_empty() {
        return Ok(SolutionSet::unsat());
    }
    let covered = covered_domain(ctx.store, positives);
    let mut acc = SolutionSet::unsat();
    for n in negatives {
        if acc.is_trivial() {
            break;
        }
        ctx.tick()?;
        let domain = domain_tuple(ctx.store, n);
        let not_codomain = ctx.store.negate(n.codomain);
        // "The argument is not covered" alternative: force the uncovered
        // part of the negative's domain to be empty…
        let coverage = ctx.normalize(ctx.store.diff(domain, covered), fixed)?;
        // …and, jointly, constrain the return side.
        let alternative = if coverage.is_unsat() {
            coverage
        } else {
            coverage.meet(explore_norm(ctx, domain, not_codomain, positives, fixed)?)
        };
        acc = acc.join(alternative);
    }
    Ok(acc)
}

fn explore_norm(
    ctx: &mut QueryCtx<'_>,
    ts: TyRef,
    t2: TyRef,
    positives: &[FunctionAtom],
    fixed: &FxHashSet<Var>,
) -> Result<SolutionSet, Interrupted> {
    ctx.tick()?;
    let mut acc = ctx.normalize(ts, fixed)?;
    if !acc.is_trivial() {
        acc = acc.join(ctx.normalize(t2, fixed)?);
    }
    let Some((head, rest)) = positives.split_first() else {
        return Ok(acc);
    };
    if acc.is_trivial() {
        return Ok(acc);
    }
    let codomain_narrowed = ctx.store.intersect(t2, head.codomain);
    let domain_uncovered = ctx.store.diff(ts, domain_tuple(ctx.store, head));
    let narrowed = explore_norm(ctx, ts, codomain_narrowed, rest, fixed)?;
    let step = if narrowed.is_unsat() {
        narrowed
    } else {
        narrowed.meet(explore_norm(ctx, domain_uncovered, t2, rest, fixed)?)
    };
    Ok(acc.join(step))
}
