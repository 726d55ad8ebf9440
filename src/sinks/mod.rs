//! Sink implementations

pub mod console;
pub mod file;
pub mod memory;
pub mod rotation;
pub mod syslog;

pub use console::{ConsoleSink, ConsoleTarget};
pub use file::FileSink;
pub use memory::{MemorySink, NopSink};
pub use rotation::{parse_size, Rotater, SizeRotater, TimeRotater};
pub use syslog::{Severity, SyslogSink};

// Re-export the trait so sink implementors need a single import path
pub use crate::core::Sink;
