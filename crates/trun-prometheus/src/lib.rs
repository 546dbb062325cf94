//! Prometheus metrics backend for the `trun` controllers.
//!
//! [`PrometheusMetrics`] implements [`trun_core::MetricsBackend`] on a private [`Registry`].
//!
//! ## Metrics
//! - `trun_reconcile_total{reconciler, outcome}` - Counter
//! - `trun_requeue_delay_seconds{reconciler}` - Histogram
//! - `trun_retries_total{reconciler}` - Counter
//!
//! ## HTTP Server
//! This crate does NOT serve `/metrics`; call [`PrometheusMetrics::encode`] from the
//! application's HTTP framework.

mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
