// partition.rs -- Row ranges and the deterministic per-worker row split.
//
// The split is stage-agnostic: the same ranges feed the grayscale stage
// (every row is legal) and the edge stage (rows 0 and height-1 are not).
// The edge stage narrows its own range with `RowRange::interior`, so the
// partitioner never needs to know which stage it is serving.
//
// Remainder rule: with H rows and N workers every range gets H / N rows and
// the first H % N ranges get one more. For H = 10, N = 4:
//
//   worker:  0        1        2       3
//   rows:    [0, 3)   [3, 6)   [6, 8)  [8, 10)

use std::ops::Range;

/// Half-open row interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RowRange {
    pub start: usize,
    pub end: usize,
}

impl RowRange {
    /// # Panics
    /// Panics if `start > end`.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(start <= end, "row range start ({start}) must be <= end ({end})");
        RowRange { start, end }
    }

    /// The full range `[0, height)`.
    pub fn full(height: usize) -> Self {
        RowRange { start: 0, end: height }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub fn contains(&self, y: usize) -> bool {
        self.start <= y && y < self.end
    }

    /// Intersection with `other`. Disjoint ranges yield an empty range.
    pub fn intersect(&self, other: RowRange) -> RowRange {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end).max(start);
        RowRange { start, end }
    }

    /// Rows of this range that have both a row above and a row below in a
    /// plane of `height` rows, i.e. the range intersected with `[1, height-1)`.
    pub fn interior(&self, height: usize) -> RowRange {
        self.intersect(RowRange {
            start: 1,
            end: height.saturating_sub(1).max(1),
        })
    }

    /// Iterate over the row indices.
    pub fn iter(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Range<usize>> for RowRange {
    fn from(r: Range<usize>) -> Self {
        RowRange::new(r.start, r.end)
    }
}

impl IntoIterator for RowRange {
    type Item = usize;
    type IntoIter = Range<usize>;

    fn into_iter(self) -> Range<usize> {
        self.start..self.end
    }
}

/// Split `[0, height)` into `workers` contiguous, ordered, disjoint ranges.
///
/// Ranges may be empty when `height < workers`.
///
/// # Panics
/// Panics if `workers == 0`.
pub fn partition(height: usize, workers: usize) -> Vec<RowRange> {
    assert!(workers > 0, "worker count must be > 0");
    let base = height / workers;
    let extra = height % workers;

    let mut ranges = Vec::with_capacity(workers);
    let mut start = 0;
    for i in 0..workers {
        let len = base + usize::from(i < extra);
        ranges.push(RowRange { start, end: start + len });
        start += len;
    }
    debug_assert_eq!(start, height);
    ranges
}
