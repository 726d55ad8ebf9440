//! In-process sinks: a capturing buffer and a discarding sink

use crate::core::{AppendEvent, Formatter, FormatterSlot, Result, Sink};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Keeps every rendered event in memory. Mostly useful in tests.
///
/// # Example
///
/// ```
/// use hierlog::prelude::*;
/// use std::sync::Arc;
///
/// let memory = Arc::new(MemorySink::with_formatter(Arc::new(MessageFormatter)));
/// let registry = Registry::builder().root_sink(memory.clone()).build();
///
/// registry.get_logger("svc").info("started in {}ms", &[&12]);
/// assert_eq!(memory.lines(), vec!["started in 12ms"]);
/// ```
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<String>>,
    flushes: AtomicU64,
    formatter: FormatterSlot,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_formatter(formatter: Arc<dyn Formatter>) -> Self {
        Self {
            formatter: FormatterSlot::new(formatter),
            ..Self::default()
        }
    }

    /// Everything appended so far, concatenated
    pub fn contents(&self) -> String {
        self.entries.lock().concat()
    }

    /// One entry per append, without trailing line breaks
    pub fn lines(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .map(|entry| entry.trim_end_matches(['\r', '\n']).to_string())
            .collect()
    }

    pub fn append_count(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Sink for MemorySink {
    fn append(&self, event: &AppendEvent<'_>) -> Result<()> {
        self.entries.lock().push(event.text.clone());
        Ok(())
    }

    fn formatter(&self) -> Arc<dyn Formatter> {
        self.formatter.get()
    }

    fn set_formatter(&self, formatter: Arc<dyn Formatter>) {
        self.formatter.set(formatter);
    }

    fn flush(&self) -> Result<()> {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Accepts and drops everything
#[derive(Debug, Default)]
pub struct NopSink {
    formatter: FormatterSlot,
}

impl NopSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sink for NopSink {
    fn append(&self, _event: &AppendEvent<'_>) -> Result<()> {
        Ok(())
    }

    fn formatter(&self) -> Arc<dyn Formatter> {
        self.formatter.get()
    }

    fn set_formatter(&self, formatter: Arc<dyn Formatter>) {
        self.formatter.set(formatter);
    }

    fn name(&self) -> &str {
        "nop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Level, MessageFormatter};

    #[test]
    fn test_memory_sink_entries() {
        let sink = MemorySink::new();
        sink.append(&AppendEvent::new("a", Level::Info, "one\n")).unwrap();
        sink.append(&AppendEvent::new("a", Level::Info, "two")).unwrap();

        assert_eq!(sink.contents(), "one\ntwo");
        assert_eq!(sink.lines(), vec!["one", "two"]);
        assert_eq!(sink.append_count(), 2);

        sink.clear();
        assert_eq!(sink.append_count(), 0);
        assert!(sink.contents().is_empty());
    }

    #[test]
    fn test_formatter_swap() {
        let sink = MemorySink::new();
        sink.set_formatter(Arc::new(MessageFormatter));
        let record = crate::core::LogRecord::new("x", Level::Info, "raw".into());
        assert_eq!(sink.formatter().format(&record), "raw");
    }

    #[test]
    fn test_nop_sink_accepts_everything() {
        let sink = NopSink::new();
        for level in Level::EMITTABLE {
            assert!(sink.append(&AppendEvent::new("a", level, "x")).is_ok());
        }
        assert!(sink.flush().is_ok());
    }
}
