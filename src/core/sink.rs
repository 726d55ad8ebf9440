//! Sink trait for log output destinations

use super::error::Result;
use super::formatter::Formatter;
use super::record::AppendEvent;
use std::sync::Arc;

/// An output destination shared by every logger configured to use it.
///
/// Sinks are long-lived and used from many threads at once: `append` takes
/// `&self` and implementations serialize access to their destination
/// internally. A failed write is returned to the caller; sinks never retry.
///
/// Most implementations keep their formatter in a
/// [`FormatterSlot`](super::formatter::FormatterSlot) and forward the two
/// formatter methods to it.
pub trait Sink: Send + Sync {
    /// Writes one rendered event.
    fn append(&self, event: &AppendEvent<'_>) -> Result<()>;

    /// The formatter currently used to render records for this sink.
    fn formatter(&self) -> Arc<dyn Formatter>;

    /// Replaces the formatter. Calls already rendering keep the old one.
    fn set_formatter(&self, formatter: Arc<dyn Formatter>);

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str;
}

/// Shared handle to a sink
pub type SinkRef = Arc<dyn Sink>;
