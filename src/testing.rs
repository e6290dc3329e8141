//! In-memory fake of the external metrics registry (§6 collaborator interfaces).
//!
//! Exercises [`IndexedRegistry`](crate::registry::IndexedRegistry) and
//! [`IdleActivityMonitor`](crate::monitor::IdleActivityMonitor) without a real metrics backend.
//! Available to this crate's own tests unconditionally, and to downstream hosts under the
//! `testing` feature.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
};

use crate::metric::{EncodedName, Metric, MetricKind, MetricRegistry, SymbolTable};

/// A metric created directly (not through a real registry), for use in tests.
#[derive(Debug)]
pub struct FakeMetric {
    kind: MetricKind,
    name: String,
    encoded_name: EncodedName,
    value: AtomicU64,
}

impl FakeMetric {
    /// Creates a new fake metric of the given `kind`.
    pub fn new(kind: MetricKind, name: impl Into<String>, handle: u64, value: u64) -> Self {
        Self {
            kind,
            name: name.into(),
            encoded_name: EncodedName::new(handle),
            value: AtomicU64::new(value),
        }
    }

    /// Creates a fake counter.
    pub fn counter(name: impl Into<String>, handle: u64, value: u64) -> Self {
        Self::new(MetricKind::Counter, name, handle, value)
    }

    /// Creates a fake gauge.
    pub fn gauge(name: impl Into<String>, handle: u64, value: u64) -> Self {
        Self::new(MetricKind::Gauge, name, handle, value)
    }

    /// Creates a fake histogram. `value` stands in for whatever scalar summary the real
    /// histogram would report (e.g. its sample count); this crate's factory does not support
    /// histogram indices in v1, but `StatsIndex<HistogramKind>` itself is exercised in tests.
    pub fn histogram(name: impl Into<String>, handle: u64, value: u64) -> Self {
        Self::new(MetricKind::Histogram, name, handle, value)
    }

    /// Overwrites this metric's current value, as a live registry would on a subsequent
    /// increment/set call.
    pub fn set(&self, value: u64) {
        self.value.store(value, Ordering::Relaxed);
    }

    /// Adds `delta` to this metric's current value.
    pub fn add(&self, delta: u64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    /// Subtracts `delta` from this metric's current value.
    pub fn sub(&self, delta: u64) {
        self.value.fetch_sub(delta, Ordering::Relaxed);
    }

    /// Wraps this metric in the `Arc<dyn Metric>` form indices and registries expect.
    pub fn into_arc(self) -> Arc<dyn Metric> {
        Arc::new(self)
    }
}

impl Metric for FakeMetric {
    fn kind(&self) -> MetricKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn encoded_name(&self) -> EncodedName {
        self.encoded_name
    }

    fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// An in-memory registry backing [`FakeMetric`]s, implementing [`MetricRegistry`] and
/// [`SymbolTable`].
///
/// Metrics are created with [`Self::create`], which both stores the metric and returns the
/// shared handle a caller would use to mutate its value; deletion is explicit via
/// [`Self::delete`]. Neither method talks to an [`IndexedRegistry`](crate::registry::IndexedRegistry)
/// on its own — tests drive the notification contract (`notify_*_created`/`notify_*_deleted`)
/// explicitly, the same way a real registry integration would.
#[derive(Debug, Default)]
pub struct FakeRegistry {
    metrics: RwLock<HashMap<EncodedName, Arc<dyn Metric>>>,
    names: RwLock<HashMap<EncodedName, String>>,
}

impl FakeRegistry {
    /// Creates an empty fake registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and stores a new fake metric, returning the shared handle.
    pub fn create(&self, metric: FakeMetric) -> Arc<dyn Metric> {
        let handle = metric.encoded_name();
        let name = metric.name().to_string();
        let metric: Arc<dyn Metric> = Arc::new(metric);
        self.metrics.write().unwrap().insert(handle, Arc::clone(&metric));
        self.names.write().unwrap().insert(handle, name);
        metric
    }

    /// Removes a previously created metric by its encoded name.
    pub fn delete(&self, handle: EncodedName) {
        self.metrics.write().unwrap().remove(&handle);
        self.names.write().unwrap().remove(&handle);
    }
}

impl MetricRegistry for FakeRegistry {
    fn for_each_of_kind(&self, kind: MetricKind, visit: &mut dyn FnMut(&Arc<dyn Metric>)) {
        for metric in self.metrics.read().unwrap().values() {
            if metric.kind() == kind {
                visit(metric);
            }
        }
    }

    fn symbol_table(&self) -> &dyn SymbolTable {
        self
    }
}

impl SymbolTable for FakeRegistry {
    fn resolve(&self, handle: EncodedName) -> Option<Arc<str>> {
        self.names.read().unwrap().get(&handle).map(|name| Arc::from(name.as_str()))
    }
}
