//! Coclause emptiness for the integer constructor.
//!
//! An interval diagram denotes a finite union of integer intervals with
//! optionally missing bounds. Emptiness of a coclause is plain interval
//! arithmetic: intersect the positives into a single interval, subtract
//! each negative, and check whether anything is left.

use crate::types::IntervalAtom;

// Sentinels outside the i64 value range, so `± 1` below never overflows.
const NEG_INF: i128 = i128::MIN;
const POS_INF: i128 = i128::MAX;

fn lo_of(atom: &IntervalAtom) -> i128 {
    atom.lo.map_or(NEG_INF, i128::from)
}

fn hi_of(atom: &IntervalAtom) -> i128 {
    atom.hi.map_or(POS_INF, i128::from)
}

pub(crate) fn coclause_is_empty(positives: &[IntervalAtom], negatives: &[IntervalAtom]) -> bool {
    let mut lo = NEG_INF;
    let mut hi = POS_INF;
    for p in positives {
        lo = lo.max(lo_of(p));
        hi = hi.min(hi_of(p));
    }
    if lo > hi {
        return true;
    }

    let mut ranges = vec![(lo, hi)];
    for n in negatives {
        let (n_lo, n_hi) = (lo_of(n), hi_of(n));
        let mut next = Vec::with_capacity(ranges.len() + 1);
        for (lo, hi) in ranges {
            if n_hi < lo || n_lo > hi {
                next.push((lo, hi));
                continue;
            }
            if n_lo > lo {
                next.push((lo, n_lo - 1));
            }
            if n_hi < hi {
                next.push((n_hi + 1, hi));
            }
        }
        ranges = next;
        if ranges.is_empty() {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::coclause_is_empty;
    use crate::types::IntervalAtom;

    fn iv(lo: i64, hi: i64) -> IntervalAtom {
        IntervalAtom::new(Some(lo), Some(hi))
    }

    #[test_case(0 => false; "lower edge")]
    #[test_case(10 => false; "upper edge")]
    #[test_case(-1 => true; "below")]
    #[test_case(11 => true; "above")]
    fn value_against_decade(value: i64) -> bool {
        coclause_is_empty(&[IntervalAtom::value(value), iv(0, 10)], &[])
    }

    #[test]
    fn disjoint_positives_are_empty() {
        assert!(coclause_is_empty(&[iv(0, 10), iv(20, 30)], &[]));
    }

    #[test]
    fn overlap_survives() {
        assert!(!coclause_is_empty(&[iv(0, 10), iv(5, 30)], &[]));
    }

    #[test]
    fn negatives_cover_jointly() {
        // [0, 10] is covered by [0, 5] ∪ [6, 10] but by neither alone.
        assert!(coclause_is_empty(&[iv(0, 10)], &[iv(0, 5), iv(6, 10)]));
        assert!(!coclause_is_empty(&[iv(0, 10)], &[iv(0, 5), iv(7, 10)]));
    }

    #[test]
    fn unbounded_sides() {
        let at_most = IntervalAtom::new(None, Some(0));
        let at_least = IntervalAtom::new(Some(1), None);
        assert!(coclause_is_empty(&[at_most], &[at_most]));
        assert!(coclause_is_empty(&[], &[at_most, at_least]));
        assert!(!coclause_is_empty(&[], &[at_most]));
    }

    #[test]
    fn extreme_bounds_do_not_overflow() {
        let min = IntervalAtom::value(i64::MIN);
        let max = IntervalAtom::value(i64::MAX);
        assert!(!coclause_is_empty(&[], &[min, max]));
        assert!(coclause_is_empty(&[min], &[min]));
    }
}
