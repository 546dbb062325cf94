//! Admission-time validation of task specifications.
//!
//! Validation is a pure function that stops at the first problem found and reports it as a
//! [`FieldError`](crate::FieldError) with a path to the offending field.

mod dns;
pub use dns::{DNS_LABEL_MAX_LEN, is_dns1123_label};

mod substitution;
pub use substitution::{Reference, extract_references};

mod task;
pub use task::validate_task_spec;

mod variables;
pub use variables::validate_parameter_variables;
