//! Collaborator interfaces consumed from the external metrics registry.
//!
//! Everything in this module is a contract, not an implementation: the host application's
//! real registry (counter/gauge/histogram storage, symbol-table-based name interning, scope
//! hierarchy) is assumed to exist and to implement [`Metric`], [`SymbolTable`] and
//! [`MetricRegistry`]. See [`crate::testing`] for an in-memory fake used by this crate's own
//! tests and available to downstream hosts under the `testing` feature.

use std::{fmt, sync::Arc};

use serde::Deserialize;

/// Variant of a metric tracked by the external registry.
///
/// Closed set: the registry this crate indexes supports exactly these three kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Monotonically increasing counter.
    Counter,
    /// Value that can go up or down.
    Gauge,
    /// Bucketed distribution of observations.
    Histogram,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
        };
        formatter.write_str(name)
    }
}

/// Cheap-to-compare handle produced by the registry's symbol table, standing in for a metric's
/// dotted string name.
///
/// Encoded names are opaque outside this crate's control (the external registry assigns them);
/// they are compared and hashed, never parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EncodedName(pub u64);

impl EncodedName {
    /// Wraps a raw handle value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Decodes [`EncodedName`] handles back to their string form.
///
/// Implemented by the external registry's symbol table. The default path for matching
/// ([`Matcher::matches_encoded`](crate::matcher::Matcher::matches_encoded)) goes through this
/// trait; implementations that can answer cheaper questions about a handle (e.g. "does this
/// handle's interned name start with this prefix") may skip decoding, but must remain
/// semantically equivalent to decode-then-compare.
pub trait SymbolTable: Send + Sync {
    /// Resolves `handle` to the name it was assigned, if the handle is still valid.
    ///
    /// Returns an owned, cheaply-cloned `Arc<str>` rather than a borrow: interning tables
    /// typically already store names behind an `Arc`, so this costs a refcount bump, and it
    /// sidesteps tying the result's lifetime to whatever lock the implementation takes
    /// internally.
    fn resolve(&self, handle: EncodedName) -> Option<Arc<str>>;
}

/// A single metric living in the external registry.
///
/// Indices hold non-owning `Arc<dyn Metric>` references; the registry is the sole owner of the
/// underlying storage and must outlive every reference it hands out, per the notification
/// contract described on [`MetricRegistry`].
pub trait Metric: fmt::Debug + Send + Sync {
    /// This metric's kind.
    fn kind(&self) -> MetricKind;

    /// This metric's stable, dotted-string name.
    fn name(&self) -> &str;

    /// This metric's encoded name handle.
    fn encoded_name(&self) -> EncodedName;

    /// This metric's current value. Only used by aggregation; counters and gauges both report
    /// their value as an unsigned 64-bit integer.
    fn value(&self) -> u64;
}

/// The external metric registry this crate indexes.
///
/// `IndexedRegistry::*_with_existing` uses [`Self::for_each_of_kind`] to populate a newly
/// registered index with metrics that already exist; `IndexedRegistry::notify_*` is driven by
/// the registry calling into this crate directly, not the other way around, so it is not part
/// of this trait.
///
/// # Contract
///
/// The implementer MUST notify the owning [`IndexedRegistry`](crate::registry::IndexedRegistry)
/// of a metric's creation before the metric becomes externally observable through any other
/// channel, and of a metric's deletion before its storage is reclaimed.
pub trait MetricRegistry: Send + Sync {
    /// Invokes `visit` once for every currently live metric of the given `kind`.
    fn for_each_of_kind(&self, kind: MetricKind, visit: &mut dyn FnMut(&Arc<dyn Metric>));

    /// The symbol table backing this registry's encoded names.
    fn symbol_table(&self) -> &dyn SymbolTable;
}

/// Pins a [`StatsIndex`](crate::index::StatsIndex) to one [`MetricKind`] at the type level.
///
/// This is the Rust substitution for the source's reliance on separate concrete counter/gauge
/// types: `IndexedRegistry` exposes one map per kind (`register_counter_index`,
/// `register_gauge_index`, ...), so an index can only ever be reached through the entry point
/// for its own kind. The marker also lets `StatsIndex::try_insert` reject a mismatched metric at
/// runtime without needing a `Result` (see `IndexError` doc on why this is not an error case).
pub trait MetricKindMarker: Send + Sync + 'static {
    /// The kind this marker pins an index to.
    const KIND: MetricKind;
}

/// Marker for [`StatsIndex<CounterKind>`](crate::index::StatsIndex).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterKind;

impl MetricKindMarker for CounterKind {
    const KIND: MetricKind = MetricKind::Counter;
}

/// Marker for [`StatsIndex<GaugeKind>`](crate::index::StatsIndex).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaugeKind;

impl MetricKindMarker for GaugeKind {
    const KIND: MetricKind = MetricKind::Gauge;
}

/// Marker for [`StatsIndex<HistogramKind>`](crate::index::StatsIndex).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistogramKind;

impl MetricKindMarker for HistogramKind {
    const KIND: MetricKind = MetricKind::Histogram;
}
