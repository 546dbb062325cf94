//! Runtime side of `trun`: the TTL garbage-collection controller and the plumbing it runs on.
//!
//! Data flow: store events → [`Informer`] → [`RunCache`] + [`RunEventHandler`]s →
//! [`DelayingQueue`] → [`Controller`] workers → [`Reconciler`] (e.g. [`TtlReconciler`]) →
//! [`RunStore`].

pub mod error;
pub use error::CoreError;

mod clock;
pub use clock::{Clock, ManualClock, SystemClock};

pub mod store;
pub use store::{
    DeleteOptions, MemoryStore, Preconditions, PropagationPolicy, RunEvent, RunStore, RunWatch,
    StoreError,
};

mod cache;
pub use cache::{RunCache, RunLister};

mod informer;
pub use informer::{Informer, RunEventHandler};

pub mod queue;
pub use queue::{DelayingQueue, WorkQueue};

mod controller;
pub use controller::{Controller, ControllerConfig, Reconciler};

mod metrics;
pub use metrics::{MetricsBackend, NoOpMetrics, ReconcileOutcome};

pub mod ttl;
pub use ttl::TtlReconciler;
