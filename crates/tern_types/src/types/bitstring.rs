//! Coclause emptiness for the bitstring constructor.
//!
//! A bitstring atom `{size, unit}` denotes the bit sizes `size + k·unit`
//! for `k ≥ 0` (`unit == 0` pins the single size `size`). Positives
//! intersect by the Chinese remainder theorem; negatives subtract by
//! residue-class coverage: past the largest infinite negative's base,
//! membership is periodic with the common period, so scanning one period
//! beyond that point is exhaustive.
//!
//! The walk runs on 128-bit progressions so full-range atoms never wrap,
//! and it is total: chained intersections whose period outgrows
//! [`UNIT_LIMIT`] give up with [`Interrupted`] (a period that wide makes
//! the coverage scan unfinishable under any budget), and the scan itself is
//! charged against the query fuel one element at a time. No input panics.

use crate::error::Interrupted;
use crate::types::{BitsAtom, QueryCtx};

/// Progressions sparser than this would make the coverage scan
/// unfinishable; rejecting them up front also keeps every CRT intermediate
/// inside `i128`.
const UNIT_LIMIT: u128 = 1 << 56;

/// Chained intersections raise bases by at most one period per round, so a
/// base past this limit means an absurdly deep chain; bailing out keeps the
/// signed arithmetic exact.
const BASE_LIMIT: u128 = 1 << 113;

/// A size set `{base + k·unit | k ≥ 0}` during the walk, wider than the
/// atoms so chained intersections cannot overflow.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Prog {
    base: u128,
    unit: u128,
}

impl From<BitsAtom> for Prog {
    fn from(atom: BitsAtom) -> Self {
        Self {
            base: u128::from(atom.size),
            unit: u128::from(atom.unit),
        }
    }
}

fn contains(prog: Prog, size: u128) -> bool {
    if prog.unit == 0 {
        size == prog.base
    } else {
        size >= prog.base && (size - prog.base) % prog.unit == 0
    }
}

/// The sub-progression of `p` starting at or above `min`.
fn raise(p: Prog, min: u128) -> Prog {
    if min <= p.base {
        return p;
    }
    let steps = (min - p.base).div_ceil(p.unit);
    Prog {
        base: p.base + steps * p.unit,
        unit: p.unit,
    }
}

fn gcd(a: u128, b: u128) -> u128 {
    if b == 0 { a } else { gcd(b, a % b) }
}

/// Least common multiple, saturating. A saturated period only lengthens
/// the scan horizon, which the fuel budget bounds anyway.
fn saturating_lcm(a: u128, b: u128) -> u128 {
    (a / gcd(a, b)).checked_mul(b).unwrap_or(u128::MAX)
}

/// Extended gcd: returns `(g, x, y)` with `a·x + b·y = g`.
fn egcd(a: i128, b: i128) -> (i128, i128, i128) {
    if b == 0 {
        (a, 1, 0)
    } else {
        let (g, x, y) = egcd(b, a % b);
        (g, y, x - (a / b) * y)
    }
}

/// Intersection of two progressions, again a progression (or nothing).
/// `Err` means the combined period left the decidable range.
fn intersect(a: Prog, b: Prog) -> Result<Option<Prog>, Interrupted> {
    match (a.unit, b.unit) {
        (0, _) => Ok(contains(b, a.base).then_some(a)),
        (_, 0) => Ok(contains(a, b.base).then_some(b)),
        // A unit-1 progression is the interval `[base, ∞)`: intersecting
        // just raises the other side's base. This also keeps the full
        // universe `{0, 1, 2, …}` out of the CRT path.
        (1, _) => Ok(Some(raise(b, a.base))),
        (_, 1) => Ok(Some(raise(a, b.base))),
        _ => {
            if a.unit > UNIT_LIMIT
                || b.unit > UNIT_LIMIT
                || a.base > BASE_LIMIT
                || b.base > BASE_LIMIT
            {
                return Err(Interrupted::BudgetExhausted);
            }
            let m1 = a.unit as i128;
            let m2 = b.unit as i128;
            let (g, inv, _) = egcd(m1, m2);
            let diff = b.base as i128 - a.base as i128;
            if diff % g != 0 {
                return Ok(None);
            }
            // With both units below `UNIT_LIMIT` the period is below
            // 2^112, and every intermediate stays well inside `i128`.
            let period = m1 / g * m2;
            // x ≡ a.base (mod m1) and x ≡ b.base (mod m2); `inv` inverts
            // m1/g modulo m2/g.
            let k = ((diff / g).rem_euclid(m2 / g) * inv.rem_euclid(m2 / g)).rem_euclid(m2 / g);
            let residue = (a.base as i128 + m1 * k).rem_euclid(period);
            let start = a.base.max(b.base) as i128;
            let base = if residue >= start {
                residue
            } else {
                residue + (start - residue + period - 1) / period * period
            };
            Ok(Some(Prog {
                base: base as u128,
                unit: period as u128,
            }))
        }
    }
}

pub(crate) fn coclause_is_empty(
    ctx: &mut QueryCtx<'_>,
    positives: &[BitsAtom],
    negatives: &[BitsAtom],
) -> Result<bool, Interrupted> {
    // The bitstring universe is every size ≥ 0.
    let mut current = Prog { base: 0, unit: 1 };
    for p in positives {
        match intersect(current, Prog::from(*p))? {
            Some(narrowed) => current = narrowed,
            None => return Ok(true),
        }
    }

    if current.unit == 0 {
        return Ok(negatives
            .iter()
            .any(|n| contains(Prog::from(*n), current.base)));
    }

    // Only infinite negatives set the scan horizon: a finite negative
    // removes a single size, which an infinite progression survives.
    let mut period = current.unit;
    let mut max_infinite = None;
    for n in negatives {
        if n.unit > 0 {
            period = saturating_lcm(period, u128::from(n.unit));
            let base = u128::from(n.size);
            max_infinite = Some(max_infinite.map_or(base, |h: u128| h.max(base)));
        }
    }
    let Some(max_infinite) = max_infinite else {
        return Ok(false);
    };

    // Scan the progression one period beyond the last infinite base. Below
    // that point membership is exact against every negative; above it only
    // the infinite negatives count -- a finite value up there masks one
    // element of a class, never its tail. Each element is charged to the
    // fuel budget, so a saturated period ends in `Interrupted` rather than
    // a wrong answer.
    let bound = max_infinite.saturating_add(period);
    let mut size = current.base;
    while size <= bound {
        ctx.tick()?;
        let covered = if size <= max_infinite {
            negatives.iter().any(|n| contains(Prog::from(*n), size))
        } else {
            negatives
                .iter()
                .any(|n| n.unit > 0 && contains(Prog::from(*n), size))
        };
        if !covered {
            return Ok(false);
        }
        size = size.saturating_add(current.unit);
    }
    Ok(true)
}
