use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::{CONDITION_SUCCEEDED, Condition, ObjectMeta, OwnerReference, RunKey};

/// A unit of execution whose lifecycle is tracked as a stored object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: RunSpec,
    #[serde(default)]
    pub status: RunStatus,
}

/// Desired state of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSpec {
    /// Name of the task this run executes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_ref: Option<String>,
    /// Retention window after the run finishes; `None` disables TTL cleanup.
    #[serde(
        default,
        rename = "expirationSecondsTTL",
        skip_serializing_if = "Option::is_none",
        with = "ttl_seconds"
    )]
    pub ttl: Option<Duration>,
}

/// Observed state of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl Run {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta {
                namespace: namespace.into(),
                name: name.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.metadata.uid = uid.into();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.spec.ttl = Some(ttl);
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.status.conditions.push(condition);
        self
    }

    pub fn with_owner(mut self, owner: OwnerReference) -> Self {
        self.metadata.owner_references.push(owner);
        self
    }

    pub fn with_deletion_timestamp(mut self, at: OffsetDateTime) -> Self {
        self.metadata.deletion_timestamp = Some(at);
        self
    }

    #[inline]
    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    #[inline]
    pub fn uid(&self) -> &str {
        &self.metadata.uid
    }

    pub fn key(&self) -> RunKey {
        RunKey::new(self.namespace(), self.name())
    }

    /// The first `Succeeded` condition that has left `Unknown`, if any.
    pub fn terminal_condition(&self) -> Option<&Condition> {
        self.status
            .conditions
            .iter()
            .find(|c| c.condition_type == CONDITION_SUCCEEDED && c.is_settled())
    }

    /// Returns `true` once the run has succeeded or failed.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.terminal_condition().is_some()
    }

    /// Returns `true` if an aggregate parent run manages this run's lifecycle.
    pub fn has_parent_owner_reference(&self) -> bool {
        self.metadata
            .owner_references
            .iter()
            .any(OwnerReference::is_parent_run)
    }

    #[inline]
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Returns `true` if any owner reference points at `uid`.
    pub fn is_owned_by(&self, uid: &str) -> bool {
        self.metadata
            .owner_references
            .iter()
            .any(|owner| owner.uid == uid)
    }
}

mod ttl_seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ttl: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match ttl {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
