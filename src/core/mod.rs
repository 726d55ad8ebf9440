//! Core logger types and traits

pub mod diagnostics;
pub mod error;
pub mod formatter;
pub mod level;
pub mod logger;
pub mod message;
pub mod metrics;
pub mod prefix;
pub mod record;
pub mod registry;
pub mod sink;
pub mod snapshot;

pub use diagnostics::{ErrorReporter, DEFAULT_REPORT_WINDOW};
pub use error::{LoggerError, Result};
pub use formatter::{
    default_formatter, Formatter, FormatterSlot, JsonFormatter, MessageFormatter,
    PatternFormatter, DEFAULT_PATTERN, DEFAULT_TIME_FORMAT,
};
pub use level::{AtomicLevel, Level};
pub use logger::{Logger, SinkList};
pub use message::format_message;
pub use metrics::DispatchMetrics;
pub use record::{AppendEvent, Caller, LogRecord};
pub use registry::{Registry, RegistryBuilder, DEFAULT_LEVEL};
pub use sink::{Sink, SinkRef};
pub use snapshot::SwapCell;
