//! Scoped timer guard.

use crate::logger::{MetricId, MetricLogger};
use crate::metric::CoordinatorMetric;

/// Holds an open metric interval for the duration of one operation.
///
/// `complete` emits `end` followed by `increment`. Dropping the guard
/// without completing it, including on unwind, emits `cancel_begin`. One of
/// the two terminal transitions always fires, never both.
pub struct MetricGuard<'a> {
    logger: &'a dyn MetricLogger,
    metric: CoordinatorMetric,
    id: Option<MetricId>,
}

impl<'a> MetricGuard<'a> {
    pub fn begin(logger: &'a dyn MetricLogger, metric: CoordinatorMetric) -> Self {
        let id = logger.begin(metric);
        Self {
            logger,
            metric,
            id: Some(id),
        }
    }

    /// Terminate the interval successfully and count the operation.
    pub fn complete(mut self) {
        if let Some(id) = self.id.take() {
            self.logger.end(id, self.metric);
            self.logger.increment(self.metric);
        }
    }
}

impl Drop for MetricGuard<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.logger.cancel_begin(id, self.metric);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::recorder::{MetricEvent, Recorder};

    #[test]
    fn test_complete_ends_and_increments() {
        let recorder = Recorder::new();

        let guard = MetricGuard::begin(&recorder, CoordinatorMetric::GetUsers);
        guard.complete();

        assert_eq!(
            recorder.events(),
            vec![
                MetricEvent::Begin(CoordinatorMetric::GetUsers),
                MetricEvent::End(CoordinatorMetric::GetUsers),
                MetricEvent::Increment(CoordinatorMetric::GetUsers),
            ]
        );
    }

    #[test]
    fn test_drop_cancels() {
        let recorder = Recorder::new();

        {
            let _guard = MetricGuard::begin(&recorder, CoordinatorMetric::GetUsers);
        }

        assert_eq!(
            recorder.events(),
            vec![
                MetricEvent::Begin(CoordinatorMetric::GetUsers),
                MetricEvent::CancelBegin(CoordinatorMetric::GetUsers),
            ]
        );
    }

    #[test]
    fn test_unwind_cancels() {
        let recorder = Recorder::new();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = MetricGuard::begin(&recorder, CoordinatorMetric::AddUser);
            panic!("boom");
        }));

        assert!(result.is_err());
        assert_eq!(
            recorder.events(),
            vec![
                MetricEvent::Begin(CoordinatorMetric::AddUser),
                MetricEvent::CancelBegin(CoordinatorMetric::AddUser),
            ]
        );
    }
}
