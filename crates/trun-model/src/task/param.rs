use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared type of a task parameter.
///
/// Unrecognized type names are preserved so that admission can report them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParamType {
    #[default]
    String,
    Array,
    Unrecognized(String),
}

impl ParamType {
    /// Returns `true` for the fixed set of types the runtime understands.
    #[inline]
    pub fn is_recognized(&self) -> bool {
        matches!(self, ParamType::String | ParamType::Array)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ParamType::String => "string",
            ParamType::Array => "array",
            ParamType::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for ParamType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "string" => ParamType::String,
            "array" => ParamType::Array,
            _ => ParamType::Unrecognized(raw),
        }
    }
}

impl From<&str> for ParamType {
    fn from(raw: &str) -> Self {
        ParamType::from(raw.to_string())
    }
}

impl From<ParamType> for String {
    fn from(t: ParamType) -> Self {
        match t {
            ParamType::Unrecognized(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parameter value: either a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    String(String),
    Array(Vec<String>),
}

impl ParamValue {
    pub fn param_type(&self) -> ParamType {
        match self {
            ParamValue::String(_) => ParamType::String,
            ParamValue::Array(_) => ParamType::Array,
        }
    }
}

/// Declaration of a parameter a task accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub param_type: ParamType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ParamValue>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, param_type: impl Into<ParamType>) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: None,
            default: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::String)
    }

    pub fn array(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Array)
    }

    pub fn with_default(mut self, default: ParamValue) -> Self {
        self.default = Some(default);
        self
    }
}
