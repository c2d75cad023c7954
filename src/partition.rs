use std::fmt;

/// Half-open interval [lo, hi)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Range {
    pub lo: u64,
    pub hi: u64,
}

impl Range {
    pub fn new(lo: u64, hi: u64) -> Self {
        debug_assert!(lo <= hi, "range [{}, {}) is inverted", lo, hi);
        Self { lo, hi: hi.max(lo) }
    }

    /// [0, limit)
    pub fn below(limit: u64) -> Self {
        Self::new(0, limit)
    }

    pub fn len(&self) -> u64 {
        self.hi - self.lo
    }

    pub fn is_empty(&self) -> bool {
        self.lo == self.hi
    }

    pub fn contains(&self, n: u64) -> bool {
        self.lo <= n && n < self.hi
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.lo, self.hi)
    }
}

/// Split `range` into exactly `parts` contiguous sub-ranges
///
/// Every part but the last is ⌈len / parts⌉ wide, the last takes whatever is
/// left. Boundaries are clamped to the parent, so asking for more parts than
/// there are elements produces trailing empty ranges rather than overlaps.
/// Shared by the node level and the worker level.
pub fn split(range: Range, parts: usize) -> Vec<Range> {
    (0..parts.max(1)).map(|i| nth_part(range, parts, i)).collect()
}

/// The `index`-th part of `split(range, parts)` without building the others
pub fn nth_part(range: Range, parts: usize, index: usize) -> Range {
    let parts = parts.max(1) as u64;
    let index = (index as u64).min(parts - 1);
    let chunk = range.len().div_ceil(parts);

    let lo = range.lo + (index * chunk).min(range.len());
    let hi = if index == parts - 1 {
        range.hi
    } else {
        range.lo + ((index + 1) * chunk).min(range.len())
    };
    Range::new(lo, hi)
}
