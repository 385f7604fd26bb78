// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Splitting work between threads.  Both the sample budget and the
//! canvas rows are cut into equal contiguous parts, and whatever does
//! not divide evenly goes entirely to the last part, so the parts
//! always add back up to the total exactly.

use std::ops::Range;

/// Cut `0..total` into `parts` contiguous, disjoint ranges.  Parts may
/// be empty when `total < parts`.  `parts` must be at least one.
pub fn partition(total: usize, parts: usize) -> Vec<Range<usize>> {
    assert!(parts > 0, "cannot partition into zero parts");
    let size = total / parts;
    (0..parts)
        .map(|i| {
            let start = i * size;
            let end = if i == parts - 1 { total } else { start + size };
            start..end
        })
        .collect()
}

/// The sizes of the parts `partition` would produce.
pub fn budgets(total: usize, parts: usize) -> Vec<usize> {
    partition(total, parts).into_iter().map(|r| r.len()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remainder_goes_to_the_last_part() {
        assert_eq!(budgets(100, 3), vec![33, 33, 34]);
        assert_eq!(budgets(100, 3).iter().sum::<usize>(), 100);
    }

    #[test]
    fn ranges_are_disjoint_and_exhaustive() {
        for &(total, parts) in &[(1080, 12), (7, 7), (5, 8), (1, 1), (0, 3)] {
            let ranges = partition(total, parts);
            assert_eq!(ranges.len(), parts);
            assert_eq!(ranges[0].start, 0);
            assert_eq!(ranges[parts - 1].end, total);
            for pair in ranges.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
        }
    }

    #[test]
    fn more_parts_than_work_leaves_leading_parts_empty() {
        assert_eq!(budgets(5, 8), vec![0, 0, 0, 0, 0, 0, 0, 5]);
    }
}
