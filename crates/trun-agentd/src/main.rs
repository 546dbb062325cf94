mod config;
mod seed;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use trun_api::{HttpApi, ValidatorApiAdapter, axum};
use trun_core::{
    Controller, ControllerConfig, DelayingQueue, Informer, MemoryStore, RunCache, TtlReconciler,
};
use trun_observe::logger_init;
use trun_prometheus::PrometheusMetrics;

use crate::config::AgentConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AgentConfig::parse();

    // 1) Logger
    logger_init(&config.logger())?;
    info!(listen = %config.listen, workers = config.workers, "starting trun-agentd");

    // 2) Store
    let store = Arc::new(MemoryStore::new());
    if let Some(path) = &config.seed {
        let count = seed::load(path, &store)?;
        info!(path = %path.display(), runs = count, "store seeded");
    }

    // 3) TTL controller
    let metrics = PrometheusMetrics::new().context("failed to register metrics")?;
    let cache = RunCache::new();
    let queue = Arc::new(DelayingQueue::new());
    let ttl = Arc::new(
        TtlReconciler::new(store.clone(), Arc::new(cache.clone()), queue.clone())
            .with_metrics(Arc::new(metrics.clone())),
    );
    let informer = Informer::new(store.clone(), cache).with_handler(ttl.clone());
    let controller = Controller::new(queue, ttl)
        .with_config(ControllerConfig::default().with_workers(config.workers))
        .with_metrics(Arc::new(metrics.clone()));

    let cancel = CancellationToken::new();
    let mut tasks = JoinSet::new();
    tasks.spawn(informer.run(cancel.clone()));
    tasks.spawn(controller.run(cancel.clone()));

    // 4) HTTP API
    let app = HttpApi::new(Arc::new(ValidatorApiAdapter::new().with_metrics(metrics))).router();
    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    info!(addr = %config.listen, "http api listening");

    let server = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { cancel.cancelled().await })
                .await
        })
    };

    // 5) Run until Ctrl+C
    info!("press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutting down...");
    cancel.cancel();

    server.await?.context("http server failed")?;
    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = joined {
            warn!(error = %err, "background task failed");
        }
    }
    info!("stopped");
    Ok(())
}
