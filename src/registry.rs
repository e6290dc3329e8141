//! Owns named indices, dispatches metric-creation and metric-deletion events to them, and
//! supports both "register before metrics exist" and "register after metrics exist" lifecycles.

use std::{collections::HashMap, fmt, sync::Arc};

use parking_lot::Mutex;
use tracing::debug;

use crate::{
    aggregate::AggregatedStatsIndex,
    error::{IndexError, IndexResult},
    matcher::Matcher,
    metric::{CounterKind, GaugeKind, HistogramKind, Metric, MetricKind, MetricKindMarker, MetricRegistry},
};

/// Per-kind map from index name to the owned, aggregation-capable index.
///
/// `parking_lot::Mutex` rather than `RwLock`: registration and removal (the only operations that
/// touch this map) are comparatively rare, and keeping a single mutex here — one level above the
/// per-index `RwLock` — gives the strict "registry mutex, then per-index mutex" lock order
/// required by this crate's concurrency model without needing separate read/write paths at this
/// level.
type KindMap<K> = Mutex<HashMap<String, Arc<AggregatedStatsIndex<K>>>>;

/// Owns every [`StatsIndex`](crate::index::StatsIndex)/[`AggregatedStatsIndex`] registered
/// against one external [`MetricRegistry`], and is the single point of contact for that
/// registry's create/delete notifications.
pub struct IndexedRegistry<R: MetricRegistry> {
    source: Arc<R>,
    counters: KindMap<CounterKind>,
    gauges: KindMap<GaugeKind>,
    histograms: KindMap<HistogramKind>,
}

impl<R: MetricRegistry> fmt::Debug for IndexedRegistry<R> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("IndexedRegistry")
            .field("counters", &self.counters.lock().keys().collect::<Vec<_>>())
            .field("gauges", &self.gauges.lock().keys().collect::<Vec<_>>())
            .field("histograms", &self.histograms.lock().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

macro_rules! impl_kind_api {
    (
        $map:ident, $kind_marker:ty,
        $register:ident, $register_with_existing:ident,
        $get:ident, $remove:ident,
        $notify_created:ident, $notify_deleted:ident
    ) => {
        /// Creates and owns a new index. Does not scan existing metrics — call this before any
        /// matching metric is created to guarantee complete membership, or use
        #[doc = concat!("[`Self::", stringify!($register_with_existing), "`] otherwise.")]
        pub fn $register(
            &self,
            name: impl Into<String>,
            matcher: Matcher,
        ) -> IndexResult<Arc<AggregatedStatsIndex<$kind_marker>>> {
            self.insert_index::<$kind_marker>(&self.$map, name, matcher)
        }

        /// As
        #[doc = concat!("[`Self::", stringify!($register), "`],")]
        /// then immediately scans the external registry's current metrics of this kind and
        /// offers each to the new index.
        pub fn $register_with_existing(
            &self,
            name: impl Into<String>,
            matcher: Matcher,
        ) -> IndexResult<Arc<AggregatedStatsIndex<$kind_marker>>> {
            let index = self.insert_index::<$kind_marker>(&self.$map, name, matcher)?;
            self.source
                .for_each_of_kind(<$kind_marker as MetricKindMarker>::KIND, &mut |metric| {
                    index.try_insert(metric);
                });
            Ok(index)
        }

        /// Looks up a previously registered index by name.
        pub fn $get(&self, name: &str) -> Option<Arc<AggregatedStatsIndex<$kind_marker>>> {
            self.$map.lock().get(name).cloned()
        }

        /// Destroys the named index. Returns whether it was present.
        pub fn $remove(&self, name: &str) -> bool {
            let removed = self.$map.lock().remove(name).is_some();
            if removed {
                debug!(index = name, kind = %<$kind_marker as MetricKindMarker>::KIND, "removed index");
            }
            removed
        }

        /// Offers `metric` to every owned index of this kind.
        pub fn $notify_created(&self, metric: &Arc<dyn Metric>) {
            let map = self.$map.lock();
            for index in map.values() {
                index.try_insert(metric);
            }
        }

        /// Removes `metric` from every owned index of this kind. Safe to call even if no index
        /// contains it.
        pub fn $notify_deleted(&self, metric: &Arc<dyn Metric>) {
            let map = self.$map.lock();
            for index in map.values() {
                index.remove(metric);
            }
        }
    };
}

impl<R: MetricRegistry> IndexedRegistry<R> {
    /// Creates an indexed registry wrapping `source`.
    pub fn new(source: Arc<R>) -> Self {
        Self {
            source,
            counters: Mutex::new(HashMap::new()),
            gauges: Mutex::new(HashMap::new()),
            histograms: Mutex::new(HashMap::new()),
        }
    }

    /// The external registry this indexed registry was built over.
    pub fn source(&self) -> &Arc<R> {
        &self.source
    }

    fn insert_index<K: MetricKindMarker>(
        &self,
        map: &KindMap<K>,
        name: impl Into<String>,
        matcher: Matcher,
    ) -> IndexResult<Arc<AggregatedStatsIndex<K>>> {
        let name = name.into();
        if name.is_empty() {
            return Err(IndexError::invalid_matcher("index name must not be empty"));
        }

        let mut map = map.lock();
        if map.contains_key(&name) {
            debug!(index = %name, kind = %K::KIND, "duplicate index registration rejected");
            return Err(IndexError::DuplicateIndexName { name, kind: K::KIND });
        }

        debug!(index = %name, kind = %K::KIND, matcher = %matcher.describe(), "registered index");
        let index = Arc::new(AggregatedStatsIndex::new(name.clone(), matcher));
        map.insert(name, Arc::clone(&index));
        Ok(index)
    }

    impl_kind_api!(
        counters, CounterKind,
        register_counter_index, register_counter_index_with_existing,
        counter_index, remove_counter_index,
        notify_counter_created, notify_counter_deleted
    );
    impl_kind_api!(
        gauges, GaugeKind,
        register_gauge_index, register_gauge_index_with_existing,
        gauge_index, remove_gauge_index,
        notify_gauge_created, notify_gauge_deleted
    );
    impl_kind_api!(
        histograms, HistogramKind,
        register_histogram_index, register_histogram_index_with_existing,
        histogram_index, remove_histogram_index,
        notify_histogram_created, notify_histogram_deleted
    );

    /// Total number of currently registered indices of `kind`.
    pub fn count_by_kind(&self, kind: MetricKind) -> usize {
        match kind {
            MetricKind::Counter => self.counters.lock().len(),
            MetricKind::Gauge => self.gauges.lock().len(),
            MetricKind::Histogram => self.histograms.lock().len(),
        }
    }

    /// Invokes `visit` for every registered index name of `kind`, in no particular order.
    pub fn for_each_index_name_of_kind(&self, kind: MetricKind, mut visit: impl FnMut(&str)) {
        match kind {
            MetricKind::Counter => self.counters.lock().keys().for_each(|name| visit(name)),
            MetricKind::Gauge => self.gauges.lock().keys().for_each(|name| visit(name)),
            MetricKind::Histogram => self.histograms.lock().keys().for_each(|name| visit(name)),
        }
    }
}
