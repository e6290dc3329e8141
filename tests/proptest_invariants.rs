//! Property tests for the universal invariants: matcher semantics, index membership, and
//! idempotence of insertion/removal under arbitrary sequences.

use std::sync::Arc;

use proptest::prelude::*;
use stats_index::{
    testing::{FakeMetric, FakeRegistry},
    AggregatedStatsIndex, GaugeKind, IndexedRegistry, Matcher, Metric,
};

// An `AggregatedStatsIndex` can only be constructed through `IndexedRegistry`'s public
// registration entry points, so each property run gets a fresh one-index registry to exercise.
fn gauge_index() -> Arc<AggregatedStatsIndex<GaugeKind>> {
    let registry = IndexedRegistry::new(Arc::new(FakeRegistry::new()));
    registry
        .register_gauge_index("conn", Matcher::prefix("conn."))
        .unwrap()
}

fn arbitrary_name() -> impl Strategy<Value = String> {
    "[a-z]{1,8}(\\.[a-z]{1,8}){0,3}"
}

proptest! {
    #[test]
    fn contains_iff_matcher_matches(names in prop::collection::vec(arbitrary_name(), 0..20)) {
        let index = gauge_index();
        let matcher = index.matcher().clone();
        let mut handle = 0u64;
        let mut inserted = Vec::new();
        for name in &names {
            handle += 1;
            let metric: Arc<dyn Metric> = Arc::new(FakeMetric::gauge(name.clone(), handle, 0));
            index.try_insert(&metric);
            inserted.push(metric);
        }
        for metric in &inserted {
            prop_assert_eq!(index.contains(metric), matcher.matches(metric.name()));
        }
    }

    #[test]
    fn size_equals_inserted_minus_removed(
        ops in prop::collection::vec(
            (arbitrary_name(), any::<bool>()), // (name, is_insert)
            0..30,
        )
    ) {
        let index = gauge_index();
        let mut live = std::collections::HashSet::new();
        let mut handle = 0u64;
        for (name, is_insert) in ops {
            handle += 1;
            let metric: Arc<dyn Metric> = Arc::new(FakeMetric::gauge(name.clone(), handle, 0));
            if !index.matcher().matches(&name) {
                continue; // non-matching names never affect the index either way
            }
            if is_insert {
                index.try_insert(&metric);
                live.insert(handle);
            } else {
                index.try_insert(&metric);
                index.remove(&metric);
                live.remove(&handle);
            }
        }
        prop_assert_eq!(index.size(), live.len());
    }

    #[test]
    fn for_each_visits_every_current_member_exactly_once(
        names in prop::collection::vec(arbitrary_name(), 0..15)
    ) {
        let index = gauge_index();
        let mut handle = 0u64;
        let mut expected = std::collections::HashSet::new();
        for name in &names {
            handle += 1;
            let metric: Arc<dyn Metric> = Arc::new(FakeMetric::gauge(name.clone(), handle, 0));
            if index.try_insert(&metric) {
                expected.insert(handle);
            }
        }

        let mut visited = Vec::new();
        index.for_each(|metric| {
            visited.push(metric.encoded_name().0);
            true
        });
        let visited_set: std::collections::HashSet<_> = visited.iter().copied().collect();
        prop_assert_eq!(visited.len(), visited_set.len()); // no duplicates
        prop_assert_eq!(visited_set, expected);
    }

    #[test]
    fn prefix_suffix_matches_exactly_names_with_both_affixes(
        prefix in "[a-z]{1,5}",
        suffix in "[a-z]{1,5}",
        middle in "[a-z]{0,8}",
    ) {
        let matcher = Matcher::prefix_suffix(prefix.clone(), suffix.clone());
        let name = format!("{prefix}{middle}{suffix}");
        prop_assert!(matcher.matches(&name));
    }

    #[test]
    fn prefix_suffix_rejects_names_missing_either_affix(
        prefix in "[a-z]{2,5}",
        suffix in "[a-z]{2,5}",
        other in "[A-Z]{2,5}", // case-sensitive: never satisfies a lowercase prefix or suffix
    ) {
        let matcher = Matcher::prefix_suffix(prefix, suffix);
        prop_assert!(!matcher.matches(&other));
    }

    #[test]
    fn or_matches_iff_some_child_matches(
        name in arbitrary_name(),
        prefix in "[a-z]{1,5}",
    ) {
        let children = vec![Matcher::prefix(prefix.clone()), Matcher::suffix("zzz_never_matches")];
        let or_matcher = Matcher::or(children.clone());
        let any_child_matches = children.iter().any(|c| c.matches(&name));
        prop_assert_eq!(or_matcher.matches(&name), any_child_matches);
    }

    #[test]
    fn describe_is_idempotent_for_arbitrary_prefix_suffix(
        prefix in "[a-z]{0,5}",
        suffix in "[a-z]{0,5}",
    ) {
        let matcher = Matcher::prefix_suffix(prefix, suffix);
        prop_assert_eq!(matcher.describe(), matcher.describe());
    }
}

#[test]
fn empty_or_matches_nothing() {
    let matcher = Matcher::or(vec![]);
    assert!(!matcher.matches("anything"));
    assert!(!matcher.matches(""));
}
