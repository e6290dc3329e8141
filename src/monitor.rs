//! Example consumer of the index layer: a resource monitor that reports pressure after a
//! sustained period with little or no request activity.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::{
    aggregate::AggregatedStatsIndex,
    error::{IndexError, IndexResult},
    metric::GaugeKind,
};

/// Minimum accepted [`IdleActivityMonitor::builder`] sustained-idle duration.
const MIN_SUSTAINED_IDLE_DURATION: Duration = Duration::from_secs(1);

/// Supplies the two activity readings the monitor needs each tick.
///
/// The production implementation wraps two indices — one over "downstream active" gauges, one
/// over "upstream active" gauges — and sums each in O(k). See [`IndexBackedActivityReader`].
pub trait ActivityStatsReader: Send + Sync {
    /// Sum of currently active downstream-facing connections/requests.
    fn downstream_active(&self) -> u64;
    /// Sum of currently active upstream-facing connections/requests.
    fn upstream_active(&self) -> u64;
}

/// Production [`ActivityStatsReader`] backed by two gauge indices.
///
/// This realizes strategy (b) from the design: summing by index membership is O(k) rather than
/// the O(n) full-registry scan a naive fallback would require. Strategy (a) — caching two
/// well-known sentinel gauges by exact name — belongs to the host's registry integration, not to
/// this crate; a host that has such sentinels can implement [`ActivityStatsReader`] directly over
/// them instead of using this type.
#[derive(Debug)]
pub struct IndexBackedActivityReader {
    downstream: std::sync::Arc<AggregatedStatsIndex<GaugeKind>>,
    upstream: std::sync::Arc<AggregatedStatsIndex<GaugeKind>>,
}

impl IndexBackedActivityReader {
    /// Builds a reader summing `downstream` and `upstream` gauge indices.
    pub fn new(
        downstream: std::sync::Arc<AggregatedStatsIndex<GaugeKind>>,
        upstream: std::sync::Arc<AggregatedStatsIndex<GaugeKind>>,
    ) -> Self {
        Self { downstream, upstream }
    }
}

impl ActivityStatsReader for IndexBackedActivityReader {
    fn downstream_active(&self) -> u64 {
        self.downstream.sum()
    }

    fn upstream_active(&self) -> u64 {
        self.upstream.sum()
    }
}

/// Whether the most recent [`IdleActivityMonitor::tick`] found the system idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdleState {
    Active,
    Idle { since: Instant },
}

/// Sums activity gauges each tick and reports pressure once the system has been idle for a
/// sustained duration.
///
/// Pressure is inverted from the usual resource-pressure sign: `1.0` means "the system has been
/// idle long enough to take idle action" (e.g. shrink heap), `0.0` means "do nothing". This is a
/// deliberate property of this monitor, not a bug.
pub struct IdleActivityMonitor {
    total_threshold: u64,
    downstream_threshold: Option<u64>,
    upstream_threshold: Option<u64>,
    sustained_idle_duration: Duration,
    reader: Box<dyn ActivityStatsReader>,
    state: IdleState,
}

impl std::fmt::Debug for IdleActivityMonitor {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("IdleActivityMonitor")
            .field("total_threshold", &self.total_threshold)
            .field("downstream_threshold", &self.downstream_threshold)
            .field("upstream_threshold", &self.upstream_threshold)
            .field("sustained_idle_duration", &self.sustained_idle_duration)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl IdleActivityMonitor {
    /// Builds a monitor. Fails with [`IndexError::InvalidConfig`] if `sustained_idle_duration` is
    /// below one second.
    pub fn new(
        total_threshold: u64,
        downstream_threshold: Option<u64>,
        upstream_threshold: Option<u64>,
        sustained_idle_duration: Duration,
        reader: Box<dyn ActivityStatsReader>,
    ) -> IndexResult<Self> {
        if sustained_idle_duration < MIN_SUSTAINED_IDLE_DURATION {
            return Err(IndexError::invalid_config(format!(
                "sustained_idle_duration must be at least {MIN_SUSTAINED_IDLE_DURATION:?}, got {sustained_idle_duration:?}"
            )));
        }
        Ok(Self {
            total_threshold,
            downstream_threshold,
            upstream_threshold,
            sustained_idle_duration,
            reader,
            state: IdleState::Active,
        })
    }

    /// Runs one evaluation, using `now` as the current time. Returns the pressure to report to
    /// the host's resource-monitor framework.
    pub fn tick(&mut self, now: Instant) -> f64 {
        let downstream = self.reader.downstream_active();
        let upstream = self.reader.upstream_active();
        let total = downstream.saturating_add(upstream);

        let idle = total < self.total_threshold
            || self.downstream_threshold.is_some_and(|t| downstream < t)
            || self.upstream_threshold.is_some_and(|t| upstream < t);

        if idle {
            match self.state {
                IdleState::Active => {
                    self.state = IdleState::Idle { since: now };
                    debug!(total, downstream, upstream, "entering idle");
                    0.0
                }
                IdleState::Idle { since } if now.duration_since(since) >= self.sustained_idle_duration => {
                    debug!(total, downstream, upstream, "sustained idle, reporting pressure");
                    1.0
                }
                IdleState::Idle { .. } => 0.0,
            }
        } else {
            if matches!(self.state, IdleState::Idle { .. }) {
                debug!(total, downstream, upstream, "activity resumed, leaving idle");
            }
            self.state = IdleState::Active;
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicU64, Ordering},
            Arc,
        },
        time::{Duration, Instant},
    };

    use super::*;

    struct FixedReader {
        downstream: AtomicU64,
        upstream: AtomicU64,
    }

    impl FixedReader {
        fn new(downstream: u64, upstream: u64) -> Arc<Self> {
            Arc::new(Self {
                downstream: AtomicU64::new(downstream),
                upstream: AtomicU64::new(upstream),
            })
        }

        fn set(&self, downstream: u64, upstream: u64) {
            self.downstream.store(downstream, Ordering::Relaxed);
            self.upstream.store(upstream, Ordering::Relaxed);
        }
    }

    impl ActivityStatsReader for Arc<FixedReader> {
        fn downstream_active(&self) -> u64 {
            self.downstream.load(Ordering::Relaxed)
        }

        fn upstream_active(&self) -> u64 {
            self.upstream.load(Ordering::Relaxed)
        }
    }

    #[test]
    fn rejects_too_short_sustained_idle_duration() {
        let reader = FixedReader::new(0, 0);
        let err = IdleActivityMonitor::new(5, None, None, Duration::from_millis(999), Box::new(reader))
            .unwrap_err();
        assert!(matches!(err, IndexError::InvalidConfig { .. }));
    }

    #[test]
    fn sustained_idle_sequence_matches_pinned_scenario() {
        let reader = FixedReader::new(0, 0);
        let mut monitor = IdleActivityMonitor::new(
            5,
            None,
            None,
            Duration::from_secs(30),
            Box::new(Arc::clone(&reader)),
        )
        .unwrap();

        let t0 = Instant::now();
        assert_eq!(monitor.tick(t0), 0.0); // entering idle

        assert_eq!(monitor.tick(t0 + Duration::from_secs(31)), 1.0); // sustained

        reader.set(10, 0);
        assert_eq!(monitor.tick(t0 + Duration::from_secs(40)), 0.0); // activity resumed

        reader.set(0, 0);
        assert_eq!(monitor.tick(t0 + Duration::from_secs(41)), 0.0); // re-entering idle

        assert_eq!(monitor.tick(t0 + Duration::from_secs(75)), 1.0); // new sustained window
    }

    #[test]
    fn downstream_threshold_trips_independently() {
        let reader = FixedReader::new(3, 100);
        // total=103 is well above a total threshold of 5, but downstream alone is below 4.
        let mut monitor =
            IdleActivityMonitor::new(5, Some(4), None, Duration::from_secs(1), Box::new(reader)).unwrap();
        let t0 = Instant::now();
        assert_eq!(monitor.tick(t0), 0.0); // entering idle despite high total
        assert_eq!(monitor.tick(t0 + Duration::from_secs(2)), 1.0);
    }

    #[test]
    fn upstream_threshold_trips_independently() {
        let reader = FixedReader::new(100, 3);
        let mut monitor =
            IdleActivityMonitor::new(5, None, Some(4), Duration::from_secs(1), Box::new(reader)).unwrap();
        let t0 = Instant::now();
        assert_eq!(monitor.tick(t0), 0.0);
        assert_eq!(monitor.tick(t0 + Duration::from_secs(2)), 1.0);
    }

    #[test]
    fn thresholds_both_satisfied_keep_system_active() {
        let reader = FixedReader::new(10, 10);
        let mut monitor =
            IdleActivityMonitor::new(5, Some(4), Some(4), Duration::from_secs(1), Box::new(reader)).unwrap();
        let t0 = Instant::now();
        assert_eq!(monitor.tick(t0), 0.0);
        assert_eq!(monitor.tick(t0 + Duration::from_secs(10)), 0.0);
    }
}
