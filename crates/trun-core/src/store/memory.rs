use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, PoisonError, RwLock},
};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::trace;
use trun_model::{Run, RunKey};
use uuid::Uuid;

use crate::{
    clock::{Clock, SystemClock},
    store::{DeleteOptions, PropagationPolicy, RunEvent, RunStore, RunWatch, StoreError},
};

const EVENT_CAPACITY: usize = 1024;

/// In-process run store with UID preconditions, cascading deletes and a change feed.
///
/// Events are emitted while the write lock is held, so subscribers observe changes in the
/// order they were applied.
pub struct MemoryStore {
    runs: RwLock<HashMap<RunKey, Run>>,
    events: broadcast::Sender<RunEvent>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Store whose deletion timestamps come from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            runs: RwLock::new(HashMap::new()),
            events,
            clock,
        }
    }

    /// Insert a new run, assigning a fresh UID when none is set.
    pub fn create(&self, mut run: Run) -> Result<Run, StoreError> {
        let key = run.key();
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        if runs.contains_key(&key) {
            return Err(StoreError::AlreadyExists(key));
        }
        if run.metadata.uid.is_empty() {
            run.metadata.uid = Uuid::new_v4().to_string();
        }

        runs.insert(key, run.clone());
        self.emit(RunEvent::Added(run.clone()));
        Ok(run)
    }

    /// Replace an existing run; a non-empty UID on `run` must match the stored one.
    pub fn update(&self, mut run: Run) -> Result<Run, StoreError> {
        let key = run.key();
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        let current = runs
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        if !run.uid().is_empty() && run.uid() != current.uid() {
            return Err(StoreError::PreconditionFailed {
                key,
                expected: run.metadata.uid,
                actual: current.metadata.uid.clone(),
            });
        }

        run.metadata.uid = current.metadata.uid.clone();
        let old = std::mem::replace(current, run.clone());
        self.emit(RunEvent::Updated {
            old,
            new: run.clone(),
        });
        Ok(run)
    }

    pub fn len(&self) -> usize {
        self.runs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn emit(&self, event: RunEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    fn remove(&self, key: &RunKey, opts: &DeleteOptions) -> Result<(), StoreError> {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        let target = runs
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        if let Some(expected) = &opts.preconditions.uid
            && expected != target.uid()
        {
            return Err(StoreError::PreconditionFailed {
                key: key.clone(),
                expected: expected.clone(),
                actual: target.uid().to_string(),
            });
        }
        let uid = target.uid().to_string();

        match opts.propagation {
            PropagationPolicy::Foreground => {
                if let Some(owner) = runs.get_mut(key)
                    && owner.metadata.deletion_timestamp.is_none()
                {
                    let old = owner.clone();
                    owner.metadata.deletion_timestamp = Some(self.clock.now());
                    let new = owner.clone();
                    self.emit(RunEvent::Updated { old, new });
                }
                self.remove_dependents(&mut runs, &uid);
                self.remove_one(&mut runs, key);
            }
            PropagationPolicy::Background => {
                self.remove_one(&mut runs, key);
                self.remove_dependents(&mut runs, &uid);
            }
            PropagationPolicy::Orphan => {
                self.remove_one(&mut runs, key);
                self.orphan_dependents(&mut runs, &uid);
            }
        }
        Ok(())
    }

    fn remove_one(&self, runs: &mut HashMap<RunKey, Run>, key: &RunKey) {
        if let Some(run) = runs.remove(key) {
            trace!(run = %key, "run removed from memory store");
            self.emit(RunEvent::Deleted(run));
        }
    }

    /// Depth first: grandchildren go before children. Each owner is expanded once, so owner
    /// reference cycles terminate.
    fn remove_dependents(&self, runs: &mut HashMap<RunKey, Run>, owner_uid: &str) {
        let mut visited = HashSet::from([owner_uid.to_string()]);
        // (key, uid, dependents already pushed)
        let mut stack: Vec<(RunKey, String, bool)> = Vec::new();
        push_dependents(runs, owner_uid, &mut visited, &mut stack);

        while let Some((key, uid, expanded)) = stack.pop() {
            if expanded {
                self.remove_one(runs, &key);
                continue;
            }
            stack.push((key, uid.clone(), true));
            push_dependents(runs, &uid, &mut visited, &mut stack);
        }
    }

    fn orphan_dependents(&self, runs: &mut HashMap<RunKey, Run>, owner_uid: &str) {
        for run in runs.values_mut().filter(|r| r.is_owned_by(owner_uid)) {
            let old = run.clone();
            run.metadata
                .owner_references
                .retain(|owner| owner.uid != owner_uid);
            let new = run.clone();
            self.emit(RunEvent::Updated { old, new });
        }
    }
}

fn push_dependents(
    runs: &HashMap<RunKey, Run>,
    owner_uid: &str,
    visited: &mut HashSet<String>,
    stack: &mut Vec<(RunKey, String, bool)>,
) {
    for run in runs.values().filter(|r| r.is_owned_by(owner_uid)) {
        if visited.insert(run.uid().to_string()) {
            stack.push((run.key(), run.uid().to_string(), false));
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RunStore for MemoryStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Run, StoreError> {
        let key = RunKey::new(namespace, name);
        let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);
        runs.get(&key).cloned().ok_or(StoreError::NotFound(key))
    }

    async fn delete(
        &self,
        namespace: &str,
        name: &str,
        opts: DeleteOptions,
    ) -> Result<(), StoreError> {
        self.remove(&RunKey::new(namespace, name), &opts)
    }
}

impl RunWatch for MemoryStore {
    fn list(&self) -> Vec<Run> {
        let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<Run> = runs.values().cloned().collect();
        out.sort_by_key(Run::key);
        out
    }

    fn watch(&self) -> broadcast::Receiver<RunEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use trun_model::OwnerReference;

    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new()
    }

    fn names(store: &MemoryStore) -> Vec<String> {
        store.list().into_iter().map(|r| r.name().to_string()).collect()
    }

    #[tokio::test]
    async fn create_assigns_uid_and_get_returns_it() {
        let store = store();
        let created = store.create(Run::new("ns", "a")).unwrap();
        assert!(!created.uid().is_empty());

        let fetched = store.get("ns", "a").await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn create_rejects_duplicates() {
        let store = store();
        store.create(Run::new("ns", "a")).unwrap();
        let err = store.create(Run::new("ns", "a")).unwrap_err();
        assert_eq!(err, StoreError::AlreadyExists(RunKey::new("ns", "a")));
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let err = store().get("ns", "missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn update_keeps_uid_and_checks_it() {
        let store = store();
        let created = store.create(Run::new("ns", "a")).unwrap();

        let updated = store
            .update(Run::new("ns", "a").with_ttl(std::time::Duration::from_secs(5)))
            .unwrap();
        assert_eq!(updated.uid(), created.uid());

        let err = store.update(Run::new("ns", "a").with_uid("other")).unwrap_err();
        assert!(matches!(err, StoreError::PreconditionFailed { .. }));
    }

    #[tokio::test]
    async fn delete_honors_uid_precondition() {
        let store = store();
        let created = store.create(Run::new("ns", "a")).unwrap();

        let err = store
            .delete("ns", "a", DeleteOptions::foreground().with_uid("stale"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::PreconditionFailed {
                key: RunKey::new("ns", "a"),
                expected: "stale".into(),
                actual: created.uid().to_string(),
            }
        );
        assert_eq!(store.len(), 1);

        store
            .delete("ns", "a", DeleteOptions::foreground().with_uid(created.uid()))
            .await
            .unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn foreground_delete_cascades_to_dependents() {
        let store = store();
        let parent = store.create(Run::new("ns", "parent")).unwrap();
        let child = store
            .create(Run::new("ns", "child").with_owner(OwnerReference::parent_run("parent", parent.uid())))
            .unwrap();
        store
            .create(Run::new("ns", "grandchild").with_owner(OwnerReference::parent_run("child", child.uid())))
            .unwrap();
        store.create(Run::new("ns", "unrelated")).unwrap();

        let mut events = store.watch();
        store
            .delete("ns", "parent", DeleteOptions::foreground())
            .await
            .unwrap();
        assert_eq!(names(&store), vec!["unrelated"]);

        // owner is marked first, then removed after its dependents
        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(match event {
                RunEvent::Updated { new, .. } => {
                    assert!(new.is_deleting());
                    format!("marked:{}", new.name())
                }
                RunEvent::Deleted(run) => format!("deleted:{}", run.name()),
                RunEvent::Added(run) => format!("added:{}", run.name()),
            });
        }
        assert_eq!(
            seen,
            vec![
                "marked:parent",
                "deleted:grandchild",
                "deleted:child",
                "deleted:parent"
            ]
        );
    }

    #[tokio::test]
    async fn owner_cycle_is_deleted_without_looping() {
        let store = store();
        store
            .create(Run::new("ns", "a").with_uid("ua").with_owner(OwnerReference::parent_run("b", "ub")))
            .unwrap();
        store
            .create(Run::new("ns", "b").with_uid("ub").with_owner(OwnerReference::parent_run("a", "ua")))
            .unwrap();
        store.create(Run::new("ns", "unrelated")).unwrap();

        store
            .delete("ns", "a", DeleteOptions::foreground().with_uid("ua"))
            .await
            .unwrap();
        assert_eq!(names(&store), vec!["unrelated"]);
    }

    #[tokio::test]
    async fn self_owned_run_is_deleted_once() {
        let store = store();
        store
            .create(Run::new("ns", "a").with_uid("ua").with_owner(OwnerReference::parent_run("a", "ua")))
            .unwrap();
        let mut events = store.watch();

        store
            .delete("ns", "a", DeleteOptions::foreground())
            .await
            .unwrap();
        assert!(store.is_empty());

        let mut deleted = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, RunEvent::Deleted(_)) {
                deleted += 1;
            }
        }
        assert_eq!(deleted, 1);
    }

    #[tokio::test]
    async fn background_delete_survives_cycles_below_the_target() {
        let store = store();
        store.create(Run::new("ns", "root").with_uid("ur")).unwrap();
        store
            .create(
                Run::new("ns", "x")
                    .with_uid("ux")
                    .with_owner(OwnerReference::parent_run("root", "ur"))
                    .with_owner(OwnerReference::parent_run("y", "uy")),
            )
            .unwrap();
        store
            .create(Run::new("ns", "y").with_uid("uy").with_owner(OwnerReference::parent_run("x", "ux")))
            .unwrap();

        let opts = DeleteOptions {
            propagation: PropagationPolicy::Background,
            ..Default::default()
        };
        store.delete("ns", "root", opts).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn orphan_delete_keeps_dependents() {
        let store = store();
        let parent = store.create(Run::new("ns", "parent")).unwrap();
        store
            .create(Run::new("ns", "child").with_owner(OwnerReference::parent_run("parent", parent.uid())))
            .unwrap();

        let opts = DeleteOptions {
            propagation: PropagationPolicy::Orphan,
            ..Default::default()
        };
        store.delete("ns", "parent", opts).await.unwrap();

        let child = store.get("ns", "child").await.unwrap();
        assert!(child.metadata.owner_references.is_empty());
    }

    #[tokio::test]
    async fn watch_sees_changes_in_order() {
        let store = store();
        let mut events = store.watch();

        store.create(Run::new("ns", "a")).unwrap();
        store.update(Run::new("ns", "a")).unwrap();
        store
            .delete("ns", "a", DeleteOptions {
                propagation: PropagationPolicy::Background,
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(matches!(events.recv().await.unwrap(), RunEvent::Added(_)));
        assert!(matches!(events.recv().await.unwrap(), RunEvent::Updated { .. }));
        assert!(matches!(events.recv().await.unwrap(), RunEvent::Deleted(_)));
    }
}
