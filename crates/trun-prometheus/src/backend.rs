use std::time::Duration;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
    proto::MetricFamily,
};
use trun_core::{MetricsBackend, ReconcileOutcome};

/// Requeue delays span milliseconds (retry backoff) to days (long TTLs).
const REQUEUE_BUCKETS: &[f64] = &[
    0.01, 0.1, 1.0, 10.0, 60.0, 300.0, 1800.0, 3600.0, 21600.0, 86400.0, 604800.0,
];

#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,
    reconciles: IntCounterVec,
    requeue_delay: HistogramVec,
    retries: IntCounterVec,
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Registry::new())
    }

    /// Register the collectors on an existing registry.
    pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
        let reconciles = IntCounterVec::new(
            Opts::new("trun_reconcile_total", "Reconciles by outcome"),
            &["reconciler", "outcome"],
        )?;
        let requeue_delay = HistogramVec::new(
            HistogramOpts::new(
                "trun_requeue_delay_seconds",
                "Delay of scheduled requeues",
            )
            .buckets(REQUEUE_BUCKETS.to_vec()),
            &["reconciler"],
        )?;
        let retries = IntCounterVec::new(
            Opts::new("trun_retries_total", "Failed reconciles sent back for retry"),
            &["reconciler"],
        )?;

        registry.register(Box::new(reconciles.clone()))?;
        registry.register(Box::new(requeue_delay.clone()))?;
        registry.register(Box::new(retries.clone()))?;

        Ok(Self {
            registry,
            reconciles,
            requeue_delay,
            retries,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Text exposition format, ready to serve on `/metrics`.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_reconcile(&self, reconciler: &str, outcome: ReconcileOutcome) {
        self.reconciles
            .with_label_values(&[reconciler, outcome.as_str()])
            .inc();
    }

    fn record_requeue(&self, reconciler: &str, delay: Duration) {
        self.requeue_delay
            .with_label_values(&[reconciler])
            .observe(delay.as_secs_f64());
    }

    fn record_retry(&self, reconciler: &str) {
        self.retries.with_label_values(&[reconciler]).inc();
    }
}
