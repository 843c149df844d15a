pub mod guard;
pub mod logger;
pub mod metric;
pub mod recorder;

pub use guard::MetricGuard;
pub use logger::{MetricId, MetricLogger, MetricSnapshot, NoopLogger, StatsLogger};
pub use metric::CoordinatorMetric;
pub use recorder::{MetricEvent, Recorder};
