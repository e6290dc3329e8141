//! Single-pass reductions (sum, count, min, max, average, fold) over a [`StatsIndex`].

use std::ops::Deref;

use crate::{index::StatsIndex, matcher::Matcher, metric::MetricKindMarker};

/// Sentinel returned by [`AggregatedStatsIndex::min`] for an empty index.
///
/// An empty minimum has no defined result; rather than special-casing every caller, this crate
/// follows the source in returning an explicit, testable sentinel.
pub const EMPTY_MIN_SENTINEL: u64 = u64::MAX;

/// Four-way reduction computed by [`AggregatedStatsIndex::compute_stats`] in a single pass.
///
/// Note the deliberate discrepancy with [`AggregatedStatsIndex::min`]: `min` here is `0` for an
/// empty index, not [`EMPTY_MIN_SENTINEL`], so that a reported tuple is self-consistent when
/// `count` is zero (all four fields are `0`). See `DESIGN.md` for why this is pinned rather than
/// unified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Sum of `value()` over the index's membership at the time of the call.
    pub sum: u64,
    /// Minimum `value()`, or `0` if the index was empty.
    pub min: u64,
    /// Maximum `value()`, or `0` if the index was empty.
    pub max: u64,
    /// Number of members at the time of the call.
    pub count: usize,
}

/// A [`StatsIndex`] extended with O(k) reductions, each a single `for_each` traversal.
///
/// Derefs to the underlying [`StatsIndex`], so every membership operation (`try_insert`,
/// `remove`, `contains`, ...) is available directly on an `AggregatedStatsIndex`.
#[derive(Debug)]
pub struct AggregatedStatsIndex<K: MetricKindMarker>(StatsIndex<K>);

impl<K: MetricKindMarker> Deref for AggregatedStatsIndex<K> {
    type Target = StatsIndex<K>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<K: MetricKindMarker> AggregatedStatsIndex<K> {
    pub(crate) fn new(name: String, matcher: Matcher) -> Self {
        Self(StatsIndex::new(name, matcher))
    }

    /// Sum of `value()` over current membership. `0` for an empty index. Wraps on overflow.
    pub fn sum(&self) -> u64 {
        self.fold(0u64, |acc, value| acc.wrapping_add(value))
    }

    /// Current membership count. Equivalent to [`StatsIndex::size`].
    pub fn count(&self) -> usize {
        self.0.size()
    }

    /// `sum() / count()` as a real number. `0.0` for an empty index (not `NaN`).
    #[allow(clippy::cast_precision_loss)] // metric values are reporting quantities, not exact integers past 2^53
    pub fn average(&self) -> f64 {
        let mut sum = 0u64;
        let mut count = 0usize;
        self.0.for_each(|metric| {
            sum = sum.wrapping_add(metric.value());
            count += 1;
            true
        });
        if count == 0 {
            0.0
        } else {
            sum as f64 / count as f64
        }
    }

    /// Minimum `value()` over current membership. Returns [`EMPTY_MIN_SENTINEL`] for an empty
    /// index.
    pub fn min(&self) -> u64 {
        let mut min = EMPTY_MIN_SENTINEL;
        self.0.for_each(|metric| {
            min = min.min(metric.value());
            true
        });
        min
    }

    /// Maximum `value()` over current membership. Returns `0` for an empty index.
    pub fn max(&self) -> u64 {
        let mut max = 0u64;
        self.0.for_each(|metric| {
            max = max.max(metric.value());
            true
        });
        max
    }

    /// General left-fold over `value()` of current membership, in one traversal.
    pub fn fold<A>(&self, initial: A, mut f: impl FnMut(A, u64) -> A) -> A {
        let mut acc = Some(initial);
        self.0.for_each(|metric| {
            let current = acc.take().expect("set back to `Some` immediately below");
            acc = Some(f(current, metric.value()));
            true
        });
        acc.expect("for_each always leaves the accumulator populated")
    }

    /// Computes `sum`, `min`, `max` and `count` in a single traversal.
    ///
    /// For an empty index, `min` is `0` here (not [`EMPTY_MIN_SENTINEL`] as in
    /// [`Self::min`]) so that the returned [`Stats`] is internally consistent when `count` is
    /// zero.
    pub fn compute_stats(&self) -> Stats {
        let mut sum = 0u64;
        let mut min = u64::MAX;
        let mut max = 0u64;
        let mut count = 0usize;
        self.0.for_each(|metric| {
            let value = metric.value();
            sum = sum.wrapping_add(value);
            min = min.min(value);
            max = max.max(value);
            count += 1;
            true
        });
        if count == 0 {
            min = 0;
        }
        Stats { sum, min, max, count }
    }
}
