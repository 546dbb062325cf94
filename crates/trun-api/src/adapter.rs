use async_trait::async_trait;
use tracing::debug;
use trun_model::{TaskSpec, validate_task_spec};
use trun_prometheus::PrometheusMetrics;

use crate::{
    error::ApiError,
    handler::{Admission, ApiHandler},
};

/// Handler backed by the built-in task spec validator.
#[derive(Clone, Default)]
pub struct ValidatorApiAdapter {
    metrics: Option<PrometheusMetrics>,
}

impl ValidatorApiAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `metrics` on the metrics endpoint.
    pub fn with_metrics(mut self, metrics: PrometheusMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

#[async_trait]
impl ApiHandler for ValidatorApiAdapter {
    async fn validate_task(&self, spec: TaskSpec) -> Result<Admission, ApiError> {
        match validate_task_spec(&spec) {
            Ok(()) => Ok(Admission::allowed()),
            Err(err) => {
                debug!(error = %err, "task spec rejected");
                Ok(Admission::denied(err))
            }
        }
    }

    async fn render_metrics(&self) -> Result<String, ApiError> {
        let metrics = self.metrics.as_ref().ok_or(ApiError::MetricsDisabled)?;
        metrics
            .encode()
            .map_err(|e| ApiError::Internal(e.to_string()))
    }
}
