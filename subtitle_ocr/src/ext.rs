//! Extensions to standard library types.

use std::cmp::{max, min};
use std::ops::Range;

/// Set-like operations on `Range`.
pub trait RangeExt<Idx> {
    /// The values found in both ranges.  If either range is empty, that
    /// range is returned unchanged, so the result keeps its position.
    fn intersection(&self, other: &Range<Idx>) -> Range<Idx>;

    /// Do these ranges share at least one value?
    fn overlaps(&self, other: &Range<Idx>) -> bool;
}

impl<Idx: Ord + Copy> RangeExt<Idx> for Range<Idx> {
    fn intersection(&self, other: &Range<Idx>) -> Range<Idx> {
        match (self.is_empty(), other.is_empty()) {
            (true, _) => self.clone(),
            (_, true) => other.clone(),
            _ => {
                let start = max(self.start, other.start);
                start..max(start, min(self.end, other.end))
            }
        }
    }

    fn overlaps(&self, other: &Range<Idx>) -> bool {
        !self.intersection(other).is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use quickcheck::quickcheck;

    #[test]
    fn intersections_of_pixel_columns() {
        assert_eq!((10..20).intersection(&(15..30)), 15..20);
        assert_eq!((15..30).intersection(&(10..20)), 15..20);
        assert_eq!((10..20).intersection(&(12..14)), 12..14);
        assert_eq!((-5..3).intersection(&(-2..10)), -2..3);
        assert!((0..5).intersection(&(5..8)).is_empty());
        assert_eq!((0..5).intersection(&(7..7)), 7..7);
        assert_eq!((4..4).intersection(&(0..10)), 4..4);
    }

    #[test]
    fn overlapping_columns() {
        assert!((0..5).overlaps(&(4..8)));
        assert!(!(0..5).overlaps(&(5..8)));
        assert!(!(3..3).overlaps(&(0..8)));
    }

    quickcheck! {
        fn intersection_lies_inside_both(r1: Range<i32>, r2: Range<i32>) -> bool {
            let i = r1.intersection(&r2);
            i.is_empty() || (r1.start <= i.start && i.end <= r1.end &&
                             r2.start <= i.start && i.end <= r2.end)
        }

        fn overlapping_is_symmetric(r1: Range<i32>, r2: Range<i32>) -> bool {
            r1.overlaps(&r2) == r2.overlaps(&r1)
        }
    }
}
