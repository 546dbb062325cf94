use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use trun_model::RunKey;

use crate::{
    error::CoreError,
    metrics::{MetricsBackend, NoOpMetrics},
    queue::DelayingQueue,
};

/// Brings one run towards its desired state.
#[async_trait]
pub trait Reconciler: Send + Sync + 'static {
    /// Label used in logs and metrics.
    fn name(&self) -> &'static str;

    async fn reconcile(&self, key: &RunKey) -> Result<(), CoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Number of concurrent workers; at least one always runs.
    pub workers: usize,
}

impl ControllerConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self { workers: 2 }
    }
}

/// Worker pool draining a [`DelayingQueue`] into a [`Reconciler`].
pub struct Controller {
    queue: Arc<DelayingQueue>,
    reconciler: Arc<dyn Reconciler>,
    metrics: Arc<dyn MetricsBackend>,
    config: ControllerConfig,
}

impl Controller {
    pub fn new(queue: Arc<DelayingQueue>, reconciler: Arc<dyn Reconciler>) -> Self {
        Self {
            queue,
            reconciler,
            metrics: Arc::new(NoOpMetrics),
            config: ControllerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsBackend>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Run the timer loop and workers until `cancel` fires, then drain and return.
    pub async fn run(self, cancel: CancellationToken) {
        let workers = self.config.workers.max(1);
        let name = self.reconciler.name();
        info!(reconciler = name, workers, "controller starting");

        let mut tasks = JoinSet::new();
        {
            let queue = Arc::clone(&self.queue);
            let cancel = cancel.clone();
            tasks.spawn(async move { queue.run_timers(cancel).await });
        }
        for id in 0..workers {
            tasks.spawn(worker(
                id,
                Arc::clone(&self.queue),
                Arc::clone(&self.reconciler),
                Arc::clone(&self.metrics),
            ));
        }

        cancel.cancelled().await;
        self.queue.shutdown();

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                warn!(reconciler = name, error = %err, "controller task failed");
            }
        }
        info!(reconciler = name, "controller stopped");
    }
}

async fn worker(
    id: usize,
    queue: Arc<DelayingQueue>,
    reconciler: Arc<dyn Reconciler>,
    metrics: Arc<dyn MetricsBackend>,
) {
    debug!(worker = id, "worker started");
    while let Some(key) = queue.get().await {
        match reconciler.reconcile(&key).await {
            Ok(()) => queue.forget(&key),
            Err(err) => {
                warn!(
                    worker = id,
                    run = %key,
                    attempt = queue.num_requeues(&key) + 1,
                    error = %err,
                    "reconcile failed, retrying"
                );
                metrics.record_retry(reconciler.name());
                queue.add_rate_limited(key.clone());
            }
        }
        queue.done(&key);
    }
    debug!(worker = id, "worker stopped");
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use super::*;
    use crate::store::StoreError;

    /// Fails the first `failures` calls for every key.
    struct Flaky {
        failures: usize,
        calls: Mutex<Vec<RunKey>>,
    }

    impl Flaky {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Reconciler for Flaky {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn reconcile(&self, key: &RunKey) -> Result<(), CoreError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(key.clone());
            if calls.iter().filter(|k| *k == key).count() <= self.failures {
                return Err(StoreError::Other("boom".into()).into());
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingMetrics {
        retries: AtomicUsize,
    }

    impl MetricsBackend for CountingMetrics {
        fn record_reconcile(&self, _: &str, _: crate::ReconcileOutcome) {}
        fn record_requeue(&self, _: &str, _: Duration) {}
        fn record_retry(&self, _: &str) {
            self.retries.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn wait_for(cond: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(60), async {
            while !cond() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_keys_are_retried_with_backoff_then_forgotten() {
        let queue = Arc::new(DelayingQueue::new());
        let reconciler = Arc::new(Flaky::new(2));
        let metrics = Arc::new(CountingMetrics::default());
        let cancel = CancellationToken::new();

        let controller = Controller::new(queue.clone(), reconciler.clone())
            .with_metrics(metrics.clone())
            .with_config(ControllerConfig::default().with_workers(1));
        let handle = tokio::spawn(controller.run(cancel.clone()));

        let key = RunKey::new("ns", "a");
        queue.add(key.clone());

        wait_for(|| reconciler.calls() == 3).await;
        assert_eq!(metrics.retries.load(Ordering::SeqCst), 2);
        wait_for(|| queue.num_requeues(&key) == 0).await;

        cancel.cancel();
        handle.await.unwrap();
        assert!(queue.is_shutting_down());
    }

    #[tokio::test(start_paused = true)]
    async fn every_queued_key_is_reconciled() {
        let queue = Arc::new(DelayingQueue::new());
        let reconciler = Arc::new(Flaky::new(0));
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(
            Controller::new(queue.clone(), reconciler.clone())
                .with_config(ControllerConfig::default().with_workers(4))
                .run(cancel.clone()),
        );

        for i in 0..10 {
            queue.add(RunKey::new("ns", format!("run-{i}")));
        }
        wait_for(|| reconciler.calls() == 10).await;

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn zero_workers_still_runs_one() {
        let queue = Arc::new(DelayingQueue::new());
        let reconciler = Arc::new(Flaky::new(0));
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(
            Controller::new(queue.clone(), reconciler.clone())
                .with_config(ControllerConfig { workers: 0 })
                .run(cancel.clone()),
        );
        queue.add(RunKey::new("ns", "a"));
        wait_for(|| reconciler.calls() == 1).await;

        cancel.cancel();
        handle.await.unwrap();
    }
}
