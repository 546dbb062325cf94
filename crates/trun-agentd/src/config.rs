use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use trun_observe::{LoggerConfig, LoggerFormat, LoggerLevel};

/// TTL cleanup controller for finished runs, with a task spec admission endpoint.
#[derive(Parser, Debug, Clone)]
#[command(name = "trun-agentd", version, about)]
pub struct AgentConfig {
    /// Log filter, e.g. `info` or `warn,trun_core=debug`.
    #[arg(long, env = "TRUN_LOG_LEVEL", default_value = "info")]
    pub log_level: LoggerLevel,

    /// Log output: text, json or journald.
    #[arg(long, env = "TRUN_LOG_FORMAT", default_value = "text")]
    pub log_format: LoggerFormat,

    /// Address of the HTTP API.
    #[arg(long, env = "TRUN_LISTEN", default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Concurrent reconcile workers.
    #[arg(long, env = "TRUN_WORKERS", default_value_t = 2)]
    pub workers: usize,

    /// JSON array of runs loaded into the store at start.
    #[arg(long, env = "TRUN_SEED")]
    pub seed: Option<PathBuf>,
}

impl AgentConfig {
    pub fn logger(&self) -> LoggerConfig {
        LoggerConfig::default()
            .with_format(self.log_format)
            .with_level(self.log_level.clone())
    }
}
