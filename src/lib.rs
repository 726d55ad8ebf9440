//! # hierlog
//!
//! Hierarchical, named loggers configured by name prefix.
//!
//! ## Features
//!
//! - **One logger per name**: a [`Registry`] hands out the same
//!   [`Logger`] for the same name, creating it on first use
//! - **Prefix rules**: levels and sink lists are assigned to name prefixes
//!   (`app`, `app/db`, `app::net`); the longest matching prefix wins and
//!   changes reach loggers that already exist
//! - **Lock-light hot path**: a disabled level costs one atomic load;
//!   enabled calls read a sink-list snapshot and never touch the registry lock
//! - **Sinks**: console, file (with size or time rotation, gzip and
//!   retention), syslog, in-memory and nop
//! - **Config**: JSON documents and `prefix=LEVEL` environment rules
//!
//! ## Example
//!
//! ```
//! use hierlog::prelude::*;
//! use hierlog::{info, warn};
//! use std::sync::Arc;
//!
//! let memory = Arc::new(MemorySink::with_formatter(Arc::new(
//!     PatternFormatter::new("[{LEVEL}] {logger}: {message}\n")?,
//! )));
//! let registry = Registry::builder().root_sink(memory.clone()).build();
//!
//! registry.set_prefix_level("app/db", Level::Warn);
//!
//! let db = registry.get_logger("app/db/pool");
//! info!(db, "connections: {}", 4);        // below WARN, dropped
//! warn!(db, "pool exhausted after {}ms", 250);
//!
//! assert_eq!(memory.lines(), vec!["[WARN] app/db/pool: pool exhausted after 250ms"]);
//! # Ok::<(), hierlog::LoggerError>(())
//! ```

pub mod config;
pub mod core;
pub mod global;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::config::{BuilderRegistry, LoggingConfig};
    pub use crate::core::{
        Formatter, JsonFormatter, Level, Logger, LoggerError, MessageFormatter, PatternFormatter,
        Registry, RegistryBuilder, Result, Sink, SinkList, SinkRef,
    };
    pub use crate::global::get_logger;
    pub use crate::sinks::{ConsoleSink, FileSink, MemorySink, NopSink, SyslogSink};
}

pub use crate::config::LoggingConfig;
pub use crate::core::{
    AppendEvent, Caller, DispatchMetrics, ErrorReporter, Formatter, FormatterSlot, JsonFormatter,
    Level, LogRecord, Logger, LoggerError, MessageFormatter, PatternFormatter, Registry,
    RegistryBuilder, Result, Sink, SinkList, SinkRef,
};
pub use crate::global::{get_logger, init, init_from_env, init_from_file, shutdown};
pub use crate::sinks::{ConsoleSink, FileSink, MemorySink, NopSink, SyslogSink};
