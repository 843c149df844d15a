//! Logger that records every call, for assertions in tests and for
//! diagnosing metric wiring.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::logger::{MetricId, MetricLogger};
use crate::metric::CoordinatorMetric;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricEvent {
    Begin(CoordinatorMetric),
    End(CoordinatorMetric),
    CancelBegin(CoordinatorMetric),
    Increment(CoordinatorMetric),
    Add(CoordinatorMetric, u64),
}

#[derive(Default)]
pub struct Recorder {
    next_id: AtomicU64,
    events: Mutex<Vec<MetricEvent>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, in call order.
    pub fn events(&self) -> Vec<MetricEvent> {
        self.events.lock().clone()
    }

    /// Count of events matching a predicate.
    pub fn count(&self, predicate: impl Fn(&MetricEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }

    /// Total gauge amount added for a metric.
    pub fn added(&self, metric: CoordinatorMetric) -> u64 {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                MetricEvent::Add(m, amount) if *m == metric => Some(*amount),
                _ => None,
            })
            .sum()
    }
}

impl MetricLogger for Recorder {
    fn begin(&self, metric: CoordinatorMetric) -> MetricId {
        self.events.lock().push(MetricEvent::Begin(metric));
        MetricId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn end(&self, _id: MetricId, metric: CoordinatorMetric) {
        self.events.lock().push(MetricEvent::End(metric));
    }

    fn cancel_begin(&self, _id: MetricId, metric: CoordinatorMetric) {
        self.events.lock().push(MetricEvent::CancelBegin(metric));
    }

    fn increment(&self, metric: CoordinatorMetric) {
        self.events.lock().push(MetricEvent::Increment(metric));
    }

    fn add(&self, metric: CoordinatorMetric, amount: u64) {
        self.events.lock().push(MetricEvent::Add(metric, amount));
    }
}
