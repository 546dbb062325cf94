use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use trun_model::TaskSpec;

use crate::{error::ApiError, handler::ApiHandler};

/// HTTP API service builder.
pub struct HttpApi<H> {
    handler: Arc<H>,
}

impl<H> HttpApi<H>
where
    H: ApiHandler,
{
    /// Create new HTTP API with the given handler.
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }

    /// Build axum router with mounted endpoints.
    ///
    /// Routes:
    /// - POST /api/v1/tasks/validate - Admission check of a task spec
    /// - GET /metrics - Prometheus text format
    pub fn router(self) -> Router {
        Router::new()
            .route("/api/v1/tasks/validate", post(validate_task::<H>))
            .route("/metrics", get(metrics::<H>))
            .with_state(self.handler)
    }
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateTaskRequest {
    pub spec: TaskSpec,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/tasks/validate
///
/// `200` when allowed, `422` with the field error otherwise, `400` for an unreadable body.
async fn validate_task<H>(
    State(handler): State<Arc<H>>,
    payload: Result<Json<ValidateTaskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let Json(req) = payload?;
    let admission = handler.validate_task(req.spec).await?;
    let status = if admission.allowed {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };

    Ok((status, Json(admission)))
}

/// GET /metrics
async fn metrics<H>(State(handler): State<Arc<H>>) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let body = handler.render_metrics().await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}
