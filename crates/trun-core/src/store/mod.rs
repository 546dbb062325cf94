//! Contract with the object store holding runs, plus an in-process implementation.

mod error;
pub use error::StoreError;

mod memory;
pub use memory::MemoryStore;

use async_trait::async_trait;
use tokio::sync::broadcast;
use trun_model::{Run, Uid};

/// How dependents of a deleted object are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PropagationPolicy {
    /// Dependents are deleted before the owner disappears.
    #[default]
    Foreground,
    /// The owner disappears at once; dependents are deleted afterwards.
    Background,
    /// Dependents are kept and their owner references dropped.
    Orphan,
}

/// Conditions the target must still satisfy for a delete to go through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preconditions {
    pub uid: Option<Uid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    pub propagation: PropagationPolicy,
    pub preconditions: Preconditions,
}

impl DeleteOptions {
    /// Cascading delete that removes dependents first.
    pub fn foreground() -> Self {
        Self {
            propagation: PropagationPolicy::Foreground,
            preconditions: Preconditions::default(),
        }
    }

    /// Only delete if the stored object still has `uid`.
    pub fn with_uid(mut self, uid: impl Into<Uid>) -> Self {
        self.preconditions.uid = Some(uid.into());
        self
    }
}

/// Authoritative read and guarded delete of runs.
///
/// Call-level timeouts and transport retries belong to the implementation.
#[async_trait]
pub trait RunStore: Send + Sync + 'static {
    async fn get(&self, namespace: &str, name: &str) -> Result<Run, StoreError>;

    async fn delete(
        &self,
        namespace: &str,
        name: &str,
        opts: DeleteOptions,
    ) -> Result<(), StoreError>;
}

/// Typed change notification for a run.
#[derive(Debug, Clone)]
pub enum RunEvent {
    Added(Run),
    Updated { old: Run, new: Run },
    Deleted(Run),
}

/// Snapshot listing plus a live feed of changes.
///
/// Subscribe with [`RunWatch::watch`] before calling [`RunWatch::list`] so no change is missed.
pub trait RunWatch: Send + Sync + 'static {
    fn list(&self) -> Vec<Run>;

    fn watch(&self) -> broadcast::Receiver<RunEvent>;
}
