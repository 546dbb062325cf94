//! TTL garbage collection of finished runs.
//!
//! A run is eligible once it has a TTL, has reached a terminal `Succeeded` condition and is
//! not owned by a parent run. Eligible runs are requeued for exactly the time left before
//! expiry, then deleted with a cascading, UID-guarded delete after re-reading the store.

mod expiry;
pub use expiry::{TtlState, expiry_time, finish_time, needs_cleanup, ttl_state};

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, trace};
use trun_model::{Run, RunKey};

use crate::{
    cache::RunLister,
    clock::{Clock, SystemClock},
    controller::Reconciler,
    error::CoreError,
    informer::RunEventHandler,
    metrics::{MetricsBackend, NoOpMetrics, ReconcileOutcome},
    queue::WorkQueue,
    store::{DeleteOptions, RunStore},
};

const NAME: &str = "ttl";

/// Deletes finished runs once their TTL has elapsed.
pub struct TtlReconciler {
    store: Arc<dyn RunStore>,
    lister: Arc<dyn RunLister>,
    queue: Arc<dyn WorkQueue>,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn MetricsBackend>,
}

impl TtlReconciler {
    pub fn new(
        store: Arc<dyn RunStore>,
        lister: Arc<dyn RunLister>,
        queue: Arc<dyn WorkQueue>,
    ) -> Self {
        Self {
            store,
            lister,
            queue,
            clock: Arc::new(SystemClock),
            metrics: Arc::new(NoOpMetrics),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsBackend>) -> Self {
        self.metrics = metrics;
        self
    }

    fn enqueue_if_eligible(&self, run: &Run) {
        if !run.is_deleting() && needs_cleanup(run) {
            trace!(run = %run.key(), "run eligible for ttl cleanup");
            self.queue.enqueue(run.key());
        }
    }

    /// Reconcile one run. Callers must not process the same key concurrently.
    #[instrument(level = "debug", skip(self))]
    pub async fn process_key(&self, namespace: &str, name: &str) -> Result<(), CoreError> {
        let outcome = self.cleanup(namespace, name).await;
        let recorded = outcome.as_ref().copied().unwrap_or(ReconcileOutcome::Failed);
        self.metrics.record_reconcile(NAME, recorded);
        outcome.map(|_| ())
    }

    async fn cleanup(&self, namespace: &str, name: &str) -> Result<ReconcileOutcome, CoreError> {
        let key = RunKey::new(namespace, name);
        let Some(cached) = self.lister.get(&key) else {
            trace!(run = %key, "run not in cache");
            return Ok(ReconcileOutcome::Skipped);
        };
        if cached.has_parent_owner_reference() {
            return Ok(ReconcileOutcome::Skipped);
        }
        if let Some(outcome) = self.defer_unless_expired(&cached)? {
            return Ok(outcome);
        }

        // The cache may be stale; decide again on the authoritative copy.
        let fresh = match self.store.get(namespace, name).await {
            Ok(run) => run,
            Err(err) if err.is_not_found() => {
                debug!(run = %key, "run already gone");
                return Ok(ReconcileOutcome::Gone);
            }
            Err(err) => return Err(err.into()),
        };
        if fresh.has_parent_owner_reference() {
            return Ok(ReconcileOutcome::Skipped);
        }
        if let Some(outcome) = self.defer_unless_expired(&fresh)? {
            return Ok(outcome);
        }

        info!(run = %key, uid = fresh.uid(), "deleting expired run");
        let opts = DeleteOptions::foreground().with_uid(fresh.uid());
        match self.store.delete(namespace, name, opts).await {
            Ok(()) => Ok(ReconcileOutcome::Deleted),
            Err(err) if err.is_not_found() => {
                debug!(run = %key, "run already gone");
                Ok(ReconcileOutcome::Gone)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// `None` if `run` has expired; otherwise the outcome after requeueing a pending run.
    fn defer_unless_expired(&self, run: &Run) -> Result<Option<ReconcileOutcome>, CoreError> {
        match ttl_state(run, self.clock.now())? {
            TtlState::NotEligible => Ok(Some(ReconcileOutcome::Skipped)),
            TtlState::Pending(remaining) => {
                debug!(run = %run.key(), ?remaining, "run not expired yet, requeueing");
                self.queue.enqueue_after(run.key(), remaining);
                self.metrics.record_requeue(NAME, remaining);
                Ok(Some(ReconcileOutcome::Requeued))
            }
            TtlState::Expired => Ok(None),
        }
    }
}

impl RunEventHandler for TtlReconciler {
    fn on_add(&self, run: &Run) {
        self.enqueue_if_eligible(run);
    }

    fn on_update(&self, _old: &Run, new: &Run) {
        self.enqueue_if_eligible(new);
    }
}

#[async_trait]
impl Reconciler for TtlReconciler {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn reconcile(&self, key: &RunKey) -> Result<(), CoreError> {
        self.process_key(&key.namespace, &key.name).await
    }
}
