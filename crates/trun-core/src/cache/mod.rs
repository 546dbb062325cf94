use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use trun_model::{Run, RunKey};

/// Read side of the local run cache.
pub trait RunLister: Send + Sync + 'static {
    /// Cached copy of the run, if the cache knows it.
    fn get(&self, key: &RunKey) -> Option<Run>;
}

/// In-memory mirror of the store, fed by the informer.
///
/// Copies may lag the store; anything acting on them must re-read the authoritative object.
#[derive(Clone)]
pub struct RunCache {
    runs: Arc<RwLock<HashMap<RunKey, Run>>>,
}

impl RunCache {
    pub fn new() -> Self {
        Self {
            runs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert or replace the cached copy of a run.
    pub fn upsert(&self, run: Run) {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        runs.insert(run.key(), run);
    }

    /// Drop a run from the cache; unknown keys are ignored.
    pub fn remove(&self, key: &RunKey) -> Option<Run> {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        runs.remove(key)
    }

    /// Swap the whole content for a fresh listing. Returns the cached runs absent from it.
    pub fn replace(&self, listing: impl IntoIterator<Item = Run>) -> Vec<Run> {
        let fresh: HashMap<RunKey, Run> = listing.into_iter().map(|run| (run.key(), run)).collect();

        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *runs, fresh);
        let mut dropped: Vec<Run> = previous
            .into_iter()
            .filter(|(key, _)| !runs.contains_key(key))
            .map(|(_, run)| run)
            .collect();
        dropped.sort_by_key(Run::key);
        dropped
    }

    pub fn get(&self, key: &RunKey) -> Option<Run> {
        let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);
        runs.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.runs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RunCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLister for RunCache {
    fn get(&self, key: &RunKey) -> Option<Run> {
        RunCache::get(self, key)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn upsert_and_get_run() {
        let cache = RunCache::new();
        cache.upsert(Run::new("ns", "a").with_uid("u1"));

        let run = cache.get(&RunKey::new("ns", "a")).expect("run should be cached");
        assert_eq!(run.uid(), "u1");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn upsert_replaces_existing_copy() {
        let cache = RunCache::new();
        cache.upsert(Run::new("ns", "a"));
        cache.upsert(Run::new("ns", "a").with_ttl(Duration::from_secs(10)));

        assert_eq!(cache.len(), 1);
        let run = cache.get(&RunKey::new("ns", "a")).unwrap();
        assert_eq!(run.spec.ttl, Some(Duration::from_secs(10)));
    }

    #[test]
    fn remove_returns_the_dropped_copy() {
        let cache = RunCache::new();
        cache.upsert(Run::new("ns", "a"));
        cache.upsert(Run::new("ns", "b"));

        let removed = cache.remove(&RunKey::new("ns", "a")).unwrap();
        assert_eq!(removed.name(), "a");
        assert!(cache.get(&RunKey::new("ns", "a")).is_none());

        assert!(cache.remove(&RunKey::new("ns", "missing")).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn replace_reports_runs_missing_from_listing() {
        let cache = RunCache::new();
        cache.upsert(Run::new("ns", "kept"));
        cache.upsert(Run::new("ns", "gone-2"));
        cache.upsert(Run::new("ns", "gone-1"));

        let dropped = cache.replace(vec![Run::new("ns", "kept"), Run::new("other", "new")]);

        let names: Vec<&str> = dropped.iter().map(Run::name).collect();
        assert_eq!(names, vec!["gone-1", "gone-2"]);
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&RunKey::new("other", "new")).is_some());
    }

    #[test]
    fn lister_reads_through_trait_object() {
        let cache = RunCache::new();
        cache.upsert(Run::new("ns", "a"));

        let lister: Arc<dyn RunLister> = Arc::new(cache.clone());
        assert!(lister.get(&RunKey::new("ns", "a")).is_some());
        assert!(lister.get(&RunKey::new("ns", "b")).is_none());
    }
}
