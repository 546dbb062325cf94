use std::{fmt, time::Duration};

/// How a single reconcile of a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReconcileOutcome {
    /// Not eligible for cleanup.
    Skipped,
    /// Not expired yet; scheduled again.
    Requeued,
    /// Delete accepted by the store.
    Deleted,
    /// Already removed by someone else.
    Gone,
    /// Returned an error and will be retried.
    Failed,
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Skipped => "skipped",
            ReconcileOutcome::Requeued => "requeued",
            ReconcileOutcome::Deleted => "deleted",
            ReconcileOutcome::Gone => "gone",
            ReconcileOutcome::Failed => "failed",
        }
    }
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink for controller metrics; implemented by exporters such as `trun-prometheus`.
pub trait MetricsBackend: Send + Sync + 'static {
    fn record_reconcile(&self, reconciler: &str, outcome: ReconcileOutcome);

    fn record_requeue(&self, reconciler: &str, delay: Duration);

    fn record_retry(&self, reconciler: &str);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    fn record_reconcile(&self, _reconciler: &str, _outcome: ReconcileOutcome) {}

    fn record_requeue(&self, _reconciler: &str, _delay: Duration) {}

    fn record_retry(&self, _reconciler: &str) {}
}
