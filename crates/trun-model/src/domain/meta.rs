use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::{PARENT_RUN_KIND, Uid};

/// Identity and lifecycle metadata of a stored object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub namespace: String,
    pub name: String,
    /// Assigned by the store on create.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: Uid,
    /// Set once deletion has been requested.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub deletion_timestamp: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
}

/// Back-link from a dependent object to its owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: Uid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<bool>,
}

impl OwnerReference {
    /// Reference to an aggregate parent run.
    pub fn parent_run(name: impl Into<String>, uid: impl Into<Uid>) -> Self {
        Self {
            api_version: String::new(),
            kind: PARENT_RUN_KIND.to_string(),
            name: name.into(),
            uid: uid.into(),
            controller: Some(true),
        }
    }

    #[inline]
    pub fn is_parent_run(&self) -> bool {
        self.kind == PARENT_RUN_KIND
    }
}
