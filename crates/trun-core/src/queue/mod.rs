//! Deduplicating work queue with delayed and rate-limited re-adds.

mod backoff;
pub use backoff::{DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY, ExponentialBackoff};

use std::{
    collections::{HashMap, HashSet, VecDeque},
    future::poll_fn,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use tokio::{
    sync::{Notify, mpsc},
    time::Instant,
};
use tokio_util::{
    sync::CancellationToken,
    time::{DelayQueue, delay_queue},
};
use tracing::{debug, trace, warn};
use trun_model::RunKey;

/// Upper bound for a single delay; longer requests are clamped.
pub const MAX_DELAY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// What event handlers and reconcilers need from a queue.
pub trait WorkQueue: Send + Sync + 'static {
    /// Schedule `key` for processing as soon as possible.
    fn enqueue(&self, key: RunKey);

    /// Schedule `key` for processing once `delay` has elapsed.
    fn enqueue_after(&self, key: RunKey, delay: Duration);
}

/// Work queue keyed by [`RunKey`].
///
/// - A key is queued at most once; adding it again before it is taken is a no-op.
/// - A key is never handed to two workers at once. Adds made while it is being processed are
///   held back until [`DelayingQueue::done`].
/// - Delayed adds for the same key keep only the earliest deadline.
///
/// Delayed adds only fire while [`DelayingQueue::run_timers`] is being driven.
pub struct DelayingQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    timers: mpsc::UnboundedSender<(RunKey, Duration)>,
    timer_rx: Mutex<Option<mpsc::UnboundedReceiver<(RunKey, Duration)>>>,
    backoff: ExponentialBackoff,
}

#[derive(Default)]
struct QueueState {
    queue: VecDeque<RunKey>,
    dirty: HashSet<RunKey>,
    processing: HashSet<RunKey>,
    shutting_down: bool,
}

impl DelayingQueue {
    pub fn new() -> Self {
        Self::with_backoff(ExponentialBackoff::default())
    }

    pub fn with_backoff(backoff: ExponentialBackoff) -> Self {
        let (timers, timer_rx) = mpsc::unbounded_channel();
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            timers,
            timer_rx: Mutex::new(Some(timer_rx)),
            backoff,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, key: RunKey) {
        let mut state = self.lock();
        if state.shutting_down || state.dirty.contains(&key) {
            return;
        }
        state.dirty.insert(key.clone());
        if state.processing.contains(&key) {
            return;
        }
        trace!(run = %key, "queued");
        state.queue.push_back(key);
        drop(state);
        self.notify.notify_one();
    }

    /// Add `key` once `delay` has elapsed; a zero delay adds immediately.
    pub fn add_after(&self, key: RunKey, delay: Duration) {
        if delay.is_zero() {
            self.add(key);
            return;
        }
        if self.lock().shutting_down {
            return;
        }
        // The receiver only goes away on shutdown.
        let _ = self.timers.send((key, delay));
    }

    /// Re-add `key` after its backoff delay.
    pub fn add_rate_limited(&self, key: RunKey) {
        let delay = self.backoff.next_delay(&key);
        debug!(run = %key, ?delay, "requeue with backoff");
        self.add_after(key, delay);
    }

    /// Reset the backoff of `key`.
    pub fn forget(&self, key: &RunKey) {
        self.backoff.forget(key);
    }

    pub fn num_requeues(&self, key: &RunKey) -> u32 {
        self.backoff.failures(key)
    }

    /// Wait for the next key; `None` once the queue is shut down.
    pub async fn get(&self) -> Option<RunKey> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.shutting_down {
                    return None;
                }
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
            }

            notified.await;
        }
    }

    /// Mark `key` as processed; re-queues it if it was added meanwhile.
    pub fn done(&self, key: &RunKey) {
        let mut state = self.lock();
        state.processing.remove(key);
        if state.dirty.contains(key) && !state.shutting_down {
            state.queue.push_back(key.clone());
            drop(state);
            self.notify.notify_one();
        }
    }

    /// Stop handing out keys; pending and delayed work is dropped.
    pub fn shutdown(&self) {
        self.lock().shutting_down = true;
        self.notify.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.lock().shutting_down
    }

    /// Number of keys waiting to be taken.
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drive delayed adds until `cancel` fires. Only the first caller gets to run it.
    pub async fn run_timers(&self, cancel: CancellationToken) {
        let Some(mut requests) = self
            .timer_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            warn!("delaying queue timers are already running");
            return;
        };

        let mut delays: DelayQueue<RunKey> = DelayQueue::new();
        let mut pending: HashMap<RunKey, (delay_queue::Key, Instant)> = HashMap::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                request = requests.recv() => {
                    let Some((key, delay)) = request else { break };
                    let deadline = Instant::now() + delay.min(MAX_DELAY);
                    match pending.get(&key).map(|(slot, at)| (slot.clone(), *at)) {
                        Some((_, existing)) if existing <= deadline => {}
                        Some((slot, _)) => {
                            delays.reset_at(&slot, deadline);
                            pending.insert(key, (slot, deadline));
                        }
                        None => {
                            let slot = delays.insert_at(key.clone(), deadline);
                            pending.insert(key, (slot, deadline));
                        }
                    }
                }
                Some(expired) = poll_fn(|cx| delays.poll_expired(cx)), if !delays.is_empty() => {
                    let key = expired.into_inner();
                    pending.remove(&key);
                    self.add(key);
                }
            }
        }
        debug!(pending = pending.len(), "delaying queue timers stopped");
    }
}

impl Default for DelayingQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkQueue for DelayingQueue {
    fn enqueue(&self, key: RunKey) {
        self.add(key);
    }

    fn enqueue_after(&self, key: RunKey, delay: Duration) {
        self.add_after(key, delay);
    }
}
