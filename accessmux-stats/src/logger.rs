//! Metric logger contract and the in-memory backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::metric::CoordinatorMetric;

/// Opaque token pairing a `begin` with its `end` or `cancel_begin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetricId(pub u64);

/// Sink for coordinator metrics.
///
/// Every `begin` must be terminated by exactly one `end` (success) or
/// `cancel_begin` (failure). Implementations must be safe for unbounded
/// concurrent callers.
pub trait MetricLogger: Send + Sync {
    fn begin(&self, metric: CoordinatorMetric) -> MetricId;
    fn end(&self, id: MetricId, metric: CoordinatorMetric);
    fn cancel_begin(&self, id: MetricId, metric: CoordinatorMetric);
    fn increment(&self, metric: CoordinatorMetric);
    fn add(&self, metric: CoordinatorMetric, amount: u64);
}

/// Logger that drops everything on the floor.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl MetricLogger for NoopLogger {
    fn begin(&self, _metric: CoordinatorMetric) -> MetricId {
        MetricId(0)
    }

    fn end(&self, _id: MetricId, _metric: CoordinatorMetric) {}

    fn cancel_begin(&self, _id: MetricId, _metric: CoordinatorMetric) {}

    fn increment(&self, _metric: CoordinatorMetric) {}

    fn add(&self, _metric: CoordinatorMetric, _amount: u64) {}
}

/// Accumulated timer state for one metric.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct TimerStats {
    /// Completed intervals.
    pub completions: usize,
    /// Intervals terminated by `cancel_begin`.
    pub cancellations: usize,
    /// Total time across completed intervals.
    pub total: Duration,
}

/// Accumulated gauge state for one metric.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct GaugeStats {
    /// Number of `add` calls.
    pub samples: usize,
    /// Sum of all added amounts.
    pub total: u64,
}

#[derive(Default)]
struct Inner {
    open: HashMap<u64, (CoordinatorMetric, Instant)>,
    timers: HashMap<CoordinatorMetric, TimerStats>,
    counters: HashMap<CoordinatorMetric, usize>,
    gauges: HashMap<CoordinatorMetric, GaugeStats>,
}

/// In-memory metric backend.
///
/// Snapshots are taken under a single short lock so they are internally
/// consistent.
#[derive(Default)]
pub struct StatsLogger {
    next_id: AtomicU64,
    inner: Mutex<Inner>,
}

impl StatsLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point-in-time copy of everything recorded so far.
    pub fn snapshot(&self) -> MetricSnapshot {
        let inner = self.inner.lock();

        MetricSnapshot {
            timers: inner
                .timers
                .iter()
                .map(|(metric, stats)| (metric.as_str().to_owned(), *stats))
                .collect(),
            counters: inner
                .counters
                .iter()
                .map(|(metric, count)| (metric.as_str().to_owned(), *count))
                .collect(),
            gauges: inner
                .gauges
                .iter()
                .map(|(metric, stats)| (metric.as_str().to_owned(), *stats))
                .collect(),
        }
    }
}

impl MetricLogger for StatsLogger {
    fn begin(&self, metric: CoordinatorMetric) -> MetricId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.lock().open.insert(id, (metric, Instant::now()));
        MetricId(id)
    }

    fn end(&self, id: MetricId, metric: CoordinatorMetric) {
        let mut inner = self.inner.lock();
        if let Some((_, started)) = inner.open.remove(&id.0) {
            let elapsed = started.elapsed();
            let stats = inner.timers.entry(metric).or_default();
            stats.completions += 1;
            stats.total += elapsed;
        }
    }

    fn cancel_begin(&self, id: MetricId, metric: CoordinatorMetric) {
        let mut inner = self.inner.lock();
        if inner.open.remove(&id.0).is_some() {
            inner.timers.entry(metric).or_default().cancellations += 1;
        }
    }

    fn increment(&self, metric: CoordinatorMetric) {
        *self.inner.lock().counters.entry(metric).or_default() += 1;
    }

    fn add(&self, metric: CoordinatorMetric, amount: u64) {
        let mut inner = self.inner.lock();
        let stats = inner.gauges.entry(metric).or_default();
        stats.samples += 1;
        stats.total += amount;
    }
}

/// Serializable view of a [`StatsLogger`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub timers: HashMap<String, TimerStats>,
    pub counters: HashMap<String, usize>,
    pub gauges: HashMap<String, GaugeStats>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_timer_lifecycle() {
        let logger = StatsLogger::new();

        let id = logger.begin(CoordinatorMetric::GetUsers);
        logger.end(id, CoordinatorMetric::GetUsers);
        logger.increment(CoordinatorMetric::GetUsers);

        let id = logger.begin(CoordinatorMetric::GetUsers);
        logger.cancel_begin(id, CoordinatorMetric::GetUsers);

        let snapshot = logger.snapshot();
        let timer = snapshot.timers.get("get_users").unwrap();
        assert_eq!(timer.completions, 1);
        assert_eq!(timer.cancellations, 1);
        assert_eq!(snapshot.counters.get("get_users"), Some(&1));
    }

    #[test]
    fn test_gauge_accumulates() {
        let logger = StatsLogger::new();
        logger.add(CoordinatorMetric::GroupsMappedToUser, 6);
        logger.add(CoordinatorMetric::GroupsMappedToUser, 0);

        let snapshot = logger.snapshot();
        let gauge = snapshot.gauges.get("groups_mapped_to_user").unwrap();
        assert_eq!(gauge.samples, 2);
        assert_eq!(gauge.total, 6);
    }

    #[test]
    fn test_snapshot_serializable() {
        let logger = StatsLogger::new();
        logger.increment(CoordinatorMetric::AddUser);
        serde_json::to_string(&logger.snapshot()).unwrap();
    }

    #[test]
    fn test_stale_id_ignored() {
        let logger = StatsLogger::new();
        let id = logger.begin(CoordinatorMetric::GetGroups);
        logger.end(id, CoordinatorMetric::GetGroups);
        // Terminating twice is a no-op, not a double count.
        logger.cancel_begin(id, CoordinatorMetric::GetGroups);

        let snapshot = logger.snapshot();
        let timer = snapshot.timers.get("get_groups").unwrap();
        assert_eq!(timer.completions, 1);
        assert_eq!(timer.cancellations, 0);
    }
}
