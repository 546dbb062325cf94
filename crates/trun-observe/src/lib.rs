//! Logging setup shared by `trun` binaries.
//!
//! ```no_run
//! use trun_observe::{LoggerConfig, LoggerFormat, logger_init};
//!
//! let cfg = LoggerConfig::default()
//!     .with_format(LoggerFormat::Json)
//!     .with_level("info,trun_core=debug".parse()?);
//! logger_init(&cfg)?;
//! # Ok::<(), trun_observe::LoggerError>(())
//! ```

mod logger;
pub use logger::*;
