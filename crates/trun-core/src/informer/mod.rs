use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use trun_model::Run;

use crate::{
    cache::RunCache,
    store::{RunEvent, RunWatch},
};

/// Callbacks fired after the cache has applied a change.
pub trait RunEventHandler: Send + Sync + 'static {
    fn on_add(&self, run: &Run);

    fn on_update(&self, old: &Run, new: &Run);

    fn on_delete(&self, _run: &Run) {}
}

/// Keeps a [`RunCache`] in step with a [`RunWatch`] source and fans changes out to handlers.
pub struct Informer {
    source: Arc<dyn RunWatch>,
    cache: RunCache,
    handlers: Vec<Arc<dyn RunEventHandler>>,
}

impl Informer {
    pub fn new(source: Arc<dyn RunWatch>, cache: RunCache) -> Self {
        Self {
            source,
            cache,
            handlers: Vec::new(),
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn RunEventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn cache(&self) -> &RunCache {
        &self.cache
    }

    /// Load the current listing: cached runs missing from it are delivered as deletes, every
    /// listed run as an add.
    pub fn resync(&self) {
        let runs = self.source.list();
        let dropped = self.cache.replace(runs.iter().cloned());
        debug!(runs = runs.len(), dropped = dropped.len(), "informer resync");
        for run in &dropped {
            for handler in &self.handlers {
                handler.on_delete(run);
            }
        }
        for run in &runs {
            for handler in &self.handlers {
                handler.on_add(run);
            }
        }
    }

    /// Apply one change to the cache, then notify handlers.
    pub fn dispatch(&self, event: RunEvent) {
        match event {
            RunEvent::Added(run) => {
                self.cache.upsert(run.clone());
                for handler in &self.handlers {
                    handler.on_add(&run);
                }
            }
            RunEvent::Updated { old, new } => {
                self.cache.upsert(new.clone());
                for handler in &self.handlers {
                    handler.on_update(&old, &new);
                }
            }
            RunEvent::Deleted(run) => {
                self.cache.remove(&run.key());
                for handler in &self.handlers {
                    handler.on_delete(&run);
                }
            }
        }
    }

    /// Run until `cancel` fires or the source closes its feed.
    pub async fn run(self, cancel: CancellationToken) {
        let mut events = self.source.watch();
        self.resync();
        info!(cached = self.cache.len(), "informer synced");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Ok(event) => self.dispatch(event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "informer lagged behind the store, resyncing");
                        self.resync();
                    }
                    Err(RecvError::Closed) => {
                        warn!("run watch closed");
                        break;
                    }
                },
            }
        }
        debug!("informer stopped");
    }
}
