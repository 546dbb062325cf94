use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const MISSING_FIELD: &str = "missing field(s)";

/// Validation failure pointing at one or more fields of the submitted object.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{}", render(.message, .paths, .details))]
pub struct FieldError {
    pub message: String,
    pub paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl FieldError {
    pub fn new<I, S>(message: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            message: message.into(),
            paths: paths.into_iter().map(Into::into).collect(),
            details: None,
        }
    }

    /// A required field is absent or empty.
    pub fn missing_field<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(MISSING_FIELD, paths)
    }

    /// A field carries a value that is not acceptable.
    pub fn invalid_value(value: impl Display, path: impl Into<String>) -> Self {
        Self::new(format!("invalid value: {value}"), [path])
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Prefix every path with `field`.
    pub fn via_field(mut self, field: &str) -> Self {
        for path in &mut self.paths {
            *path = join_path(field, path);
        }
        self
    }

    /// Prefix every path with `field[index]`.
    pub fn via_index(self, field: &str, index: usize) -> Self {
        self.via_field(&format!("{field}[{index}]"))
    }
}

fn join_path(prefix: &str, path: &str) -> String {
    if path.is_empty() {
        prefix.to_string()
    } else if path.starts_with('[') {
        format!("{prefix}{path}")
    } else {
        format!("{prefix}.{path}")
    }
}

fn render(message: &str, paths: &[String], details: &Option<String>) -> String {
    let mut out = if paths.iter().all(String::is_empty) {
        message.to_string()
    } else {
        format!("{message}: {}", paths.join(", "))
    };
    if let Some(details) = details {
        out.push('\n');
        out.push_str(details);
    }
    out
}

/// Failure to apply a step template to a step.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("field {field:?} has incompatible shapes in template and step")]
    Shape { field: String },
    #[error("{0}")]
    Decode(#[from] serde_json::Error),
}
