//! Secondary-index layer over an in-process metrics registry.
//!
//! Lets operational subsystems (resource monitors, admin endpoints, stats sinks) iterate and
//! aggregate over a named subset of metrics in time proportional to the subset size, instead of
//! scanning the full registry. The registry itself — counter/gauge/histogram storage,
//! symbol-table-based name interning, scope hierarchy — is an external collaborator; see
//! [`MetricRegistry`] and [`SymbolTable`] for the traits this crate consumes from it.
//!
//! Start at [`IndexedRegistry`] to own a set of named indices, or [`IndexFactory`] to build one
//! from configuration. [`IdleActivityMonitor`] is a full example consumer.

mod aggregate;
mod error;
mod factory;
mod index;
mod matcher;
mod metric;
mod monitor;
mod registry;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use crate::{
    aggregate::{AggregatedStatsIndex, Stats, EMPTY_MIN_SENTINEL},
    error::{IndexError, IndexResult},
    factory::{IndexConfig, IndexFactory, IndicesConfig, MatcherConfig, StringMatcherConfig},
    index::StatsIndex,
    matcher::Matcher,
    metric::{CounterKind, EncodedName, GaugeKind, HistogramKind, Metric, MetricKind, MetricKindMarker, MetricRegistry, SymbolTable},
    monitor::{ActivityStatsReader, IdleActivityMonitor, IndexBackedActivityReader},
    registry::IndexedRegistry,
};
