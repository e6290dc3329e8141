//! Generic typed index maintaining the live membership of metrics matching one [`Matcher`].

use std::{collections::HashMap, fmt, marker::PhantomData, sync::Arc};

use parking_lot::RwLock;

use crate::{
    matcher::Matcher,
    metric::{EncodedName, Metric, MetricKindMarker, SymbolTable},
};

/// Live subset of metrics of kind `K`, defined by a [`Matcher`].
///
/// Always reached behind an `Arc` (see [`IndexedRegistry`](crate::registry::IndexedRegistry));
/// once registered, an index's name and matcher never change, and it is never moved out of the
/// registry that owns it.
///
/// Membership is keyed by [`EncodedName`] rather than by the metric reference itself: encoded
/// names are the cheap-to-compare handle the registry hands out, and using them as the map key
/// gives `contains`/`try_insert`/`remove` their O(1) cost without requiring `Metric` to implement
/// `Hash`/`Eq`.
pub struct StatsIndex<K: MetricKindMarker> {
    name: String,
    matcher: Matcher,
    members: RwLock<HashMap<EncodedName, Arc<dyn Metric>>>,
    _kind: PhantomData<K>,
}

impl<K: MetricKindMarker> fmt::Debug for StatsIndex<K> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("StatsIndex")
            .field("name", &self.name)
            .field("kind", &K::KIND)
            .field("matcher", &self.matcher.describe())
            .field("size", &self.size())
            .finish()
    }
}

impl<K: MetricKindMarker> StatsIndex<K> {
    pub(crate) fn new(name: String, matcher: Matcher) -> Self {
        Self {
            name,
            matcher,
            members: RwLock::new(HashMap::new()),
            _kind: PhantomData,
        }
    }

    /// This index's name, unique within its owning registry for its kind.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// This index's matcher.
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Offers `metric` to this index. Returns `true` if the metric now belongs to the index's
    /// membership (including the case where it already did); `false` if it was rejected because
    /// it does not match, or is of the wrong kind.
    pub fn try_insert(&self, metric: &Arc<dyn Metric>) -> bool {
        if metric.kind() != K::KIND || !self.matcher.matches(metric.name()) {
            return false;
        }
        self.members
            .write()
            .insert(metric.encoded_name(), Arc::clone(metric));
        true
    }

    /// As [`Self::try_insert`], but matches using [`Matcher::matches_encoded`].
    pub fn try_insert_encoded(&self, metric: &Arc<dyn Metric>, symbols: &dyn SymbolTable) -> bool {
        if metric.kind() != K::KIND
            || !self.matcher.matches_encoded(metric.encoded_name(), symbols)
        {
            return false;
        }
        self.members
            .write()
            .insert(metric.encoded_name(), Arc::clone(metric));
        true
    }

    /// Removes `metric` from this index if present. No-op otherwise.
    pub fn remove(&self, metric: &Arc<dyn Metric>) {
        self.members.write().remove(&metric.encoded_name());
    }

    /// Removes a metric by its encoded name, if present. No-op otherwise.
    ///
    /// Used by [`IndexedRegistry::notify_*_deleted`](crate::registry::IndexedRegistry) so
    /// deletion notifications don't need to reconstruct a `Metric` reference that may already be
    /// on its way out.
    pub fn remove_by_encoded_name(&self, handle: EncodedName) {
        self.members.write().remove(&handle);
    }

    /// Tests whether `metric` currently belongs to this index.
    pub fn contains(&self, metric: &Arc<dyn Metric>) -> bool {
        self.members.read().contains_key(&metric.encoded_name())
    }

    /// Current membership count.
    pub fn size(&self) -> usize {
        self.members.read().len()
    }

    /// Whether this index currently has no members.
    pub fn empty(&self) -> bool {
        self.members.read().is_empty()
    }

    /// Returns a point-in-time, unordered copy of this index's current members.
    ///
    /// Intended for callers that want to release the index's lock quickly rather than hold it
    /// for the duration of their own processing.
    pub fn snapshot(&self) -> Vec<Arc<dyn Metric>> {
        self.members.read().values().cloned().collect()
    }

    /// Iterates over this index's current members under its read lock, calling `visit` for
    /// each. `visit` returns `true` to continue, `false` to stop early.
    ///
    /// Returns `true` iff iteration ran to completion (was not stopped early).
    ///
    /// `visit` must not call back into this same index: the lock held for the duration of this
    /// call is not reentrant, and `visit` should be fast, since concurrent mutations block on it.
    pub fn for_each(&self, mut visit: impl FnMut(&Arc<dyn Metric>) -> bool) -> bool {
        for metric in self.members.read().values() {
            if !visit(metric) {
                return false;
            }
        }
        true
    }

    /// Empties this index.
    pub fn clear(&self) {
        self.members.write().clear();
    }
}
