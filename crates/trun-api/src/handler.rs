use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use trun_model::{FieldError, TaskSpec};

use crate::error::ApiError;

/// Verdict on a submitted task spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FieldError>,
}

impl Admission {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            error: None,
        }
    }

    pub fn denied(error: FieldError) -> Self {
        Self {
            allowed: false,
            error: Some(error),
        }
    }
}

/// Admission API handler.
///
/// This trait abstracts the backend implementation, allowing users to:
/// - Use the provided `ValidatorApiAdapter`
/// - Wrap it with extra admission rules (quotas, naming policies, etc.)
#[async_trait]
pub trait ApiHandler: Send + Sync + 'static {
    /// Decide whether `spec` may be persisted.
    async fn validate_task(&self, spec: TaskSpec) -> Result<Admission, ApiError>;

    /// Metrics in Prometheus text format.
    async fn render_metrics(&self) -> Result<String, ApiError>;
}
