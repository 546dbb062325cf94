use thiserror::Error;

/// Failure to set up `trun` logging.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format {0:?}, use one of: text, json, journald")]
    InvalidFormat(String),
    #[error("journald output needs Linux and the `journald` feature of trun-observe")]
    JournaldNotSupported,
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
    #[error("failed to install the tracing subscriber: {0}")]
    InitializationFailed(String),
    #[error("invalid log filter {directive:?}: {reason}")]
    InvalidLogLevel { directive: String, reason: String },
}
