//! API types shared by the `trun` controller and admission path.
//!
//! The crate is split into:
//! - `domain`: run objects as tracked by the control plane (metadata, conditions, TTL);
//! - `task`: declarative task specifications (params, steps, step template, volumes);
//! - [`validate`]: admission-time validation of task specifications.

mod domain;
pub use domain::*;

mod task;
pub use task::*;

mod error;
pub use error::{FieldError, MergeError};

pub mod validate;
pub use validate::validate_task_spec;
