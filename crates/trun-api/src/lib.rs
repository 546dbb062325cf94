//! Admission API of `trun`: task spec validation over HTTP plus the metrics endpoint.

mod error;
pub use error::ApiError;

mod handler;
pub use handler::{Admission, ApiHandler};

mod adapter;
pub use adapter::ValidatorApiAdapter;

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::{HttpApi, ValidateTaskRequest};

#[cfg(feature = "http")]
pub use axum;
