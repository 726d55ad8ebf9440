//! Named logger and the per-call dispatch path
//!
//! The level and the sink list are both snapshots that can be replaced at
//! any time. A log call reads each exactly once, so it runs to completion
//! against a consistent view even if a reconfiguration lands mid-call.

use super::{
    diagnostics::ErrorReporter,
    error::{LoggerError, Result},
    level::{AtomicLevel, Level},
    message::format_message,
    metrics::DispatchMetrics,
    record::{AppendEvent, Caller, LogRecord},
    sink::SinkRef,
    snapshot::SwapCell,
};
use std::fmt;
use std::sync::Arc;

/// Ordered list of sinks a logger fans out to
pub type SinkList = Vec<SinkRef>;

pub struct Logger {
    name: String,
    level: AtomicLevel,
    sinks: SwapCell<SinkList>,
    reporter: Arc<ErrorReporter>,
    metrics: Arc<DispatchMetrics>,
}

impl Logger {
    /// Loggers are created by a [`Registry`](super::registry::Registry),
    /// which guarantees one instance per name.
    pub(crate) fn new(
        name: impl Into<String>,
        level: Level,
        sinks: Arc<SinkList>,
        reporter: Arc<ErrorReporter>,
        metrics: Arc<DispatchMetrics>,
    ) -> Self {
        Self {
            name: name.into(),
            level: AtomicLevel::new(level),
            sinks: SwapCell::new(sinks),
            reporter,
            metrics,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Level {
        self.level.load()
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level);
    }

    /// True if an event at `level` would be dispatched right now.
    #[inline]
    pub fn is_enabled(&self, level: Level) -> bool {
        level != Level::Off && level >= self.level.load()
    }

    /// Snapshot of the current sink list
    pub fn sinks(&self) -> Arc<SinkList> {
        self.sinks.load()
    }

    pub fn set_sinks(&self, sinks: SinkList) {
        self.sinks.store(Arc::new(sinks));
    }

    pub(crate) fn store_sinks(&self, sinks: Arc<SinkList>) {
        self.sinks.store(sinks);
    }

    /// Appends one sink. Concurrent callers never lose each other's sinks.
    pub fn add_sink(&self, sink: SinkRef) {
        self.sinks.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&sink));
            Arc::new(next)
        });
    }

    /// Logs `template` with `{}` placeholders replaced by `args`.
    ///
    /// Sink failures are reported on the diagnostic channel and never reach
    /// the caller.
    #[track_caller]
    pub fn log(&self, level: Level, template: &str, args: &[&dyn fmt::Display]) {
        if !self.is_enabled(level) {
            return;
        }
        let _ = self.dispatch(level, format_message(template, args), Caller::here());
    }

    /// Like [`Logger::log`], but also returns the first sink error.
    #[track_caller]
    pub fn try_log(&self, level: Level, template: &str, args: &[&dyn fmt::Display]) -> Result<()> {
        if !self.is_enabled(level) {
            return Ok(());
        }
        self.dispatch(level, format_message(template, args), Caller::here())
    }

    /// Builds the message only if `level` is enabled.
    #[track_caller]
    pub fn log_with<F>(&self, level: Level, message: F)
    where
        F: FnOnce() -> String,
    {
        if !self.is_enabled(level) {
            return;
        }
        let _ = self.dispatch(level, message(), Caller::here());
    }

    /// Entry point for the logging macros, which supply the caller's module.
    #[doc(hidden)]
    #[track_caller]
    pub fn log_at(
        &self,
        level: Level,
        module_path: &'static str,
        template: &str,
        args: &[&dyn fmt::Display],
    ) {
        if !self.is_enabled(level) {
            return;
        }
        let caller = Caller::here().with_module_path(module_path);
        let _ = self.dispatch(level, format_message(template, args), caller);
    }

    /// Fans one record out to the current sinks, in list order.
    ///
    /// Every sink is attempted; the first error is returned after all of
    /// them were tried.
    fn dispatch(&self, level: Level, message: String, caller: Caller) -> Result<()> {
        let sinks = self.sinks.load();
        let record = LogRecord::new(&self.name, level, message).with_caller(caller);
        self.metrics.record_dispatched();

        let mut first_error: Option<LoggerError> = None;
        for sink in sinks.iter() {
            let text = sink.formatter().format(&record);
            let event = AppendEvent::new(record.logger, level, text);
            match sink.append(&event) {
                Ok(()) => {
                    self.metrics.record_append();
                }
                Err(e) => {
                    self.metrics.record_append_failure();
                    self.reporter
                        .report(&format!("sink '{}' (logger '{}')", sink.name(), self.name), &e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    #[inline]
    #[track_caller]
    pub fn trace(&self, template: &str, args: &[&dyn fmt::Display]) {
        self.log(Level::Trace, template, args);
    }

    #[inline]
    #[track_caller]
    pub fn debug(&self, template: &str, args: &[&dyn fmt::Display]) {
        self.log(Level::Debug, template, args);
    }

    #[inline]
    #[track_caller]
    pub fn info(&self, template: &str, args: &[&dyn fmt::Display]) {
        self.log(Level::Info, template, args);
    }

    #[inline]
    #[track_caller]
    pub fn warn(&self, template: &str, args: &[&dyn fmt::Display]) {
        self.log(Level::Warn, template, args);
    }

    #[inline]
    #[track_caller]
    pub fn error(&self, template: &str, args: &[&dyn fmt::Display]) {
        self.log(Level::Error, template, args);
    }

    #[inline]
    #[track_caller]
    pub fn critical(&self, template: &str, args: &[&dyn fmt::Display]) {
        self.log(Level::Critical, template, args);
    }

    #[inline]
    #[track_caller]
    pub fn trace_with<F: FnOnce() -> String>(&self, message: F) {
        self.log_with(Level::Trace, message);
    }

    #[inline]
    #[track_caller]
    pub fn debug_with<F: FnOnce() -> String>(&self, message: F) {
        self.log_with(Level::Debug, message);
    }

    #[inline]
    #[track_caller]
    pub fn info_with<F: FnOnce() -> String>(&self, message: F) {
        self.log_with(Level::Info, message);
    }

    #[inline]
    #[track_caller]
    pub fn warn_with<F: FnOnce() -> String>(&self, message: F) {
        self.log_with(Level::Warn, message);
    }

    #[inline]
    #[track_caller]
    pub fn error_with<F: FnOnce() -> String>(&self, message: F) {
        self.log_with(Level::Error, message);
    }

    #[inline]
    #[track_caller]
    pub fn critical_with<F: FnOnce() -> String>(&self, message: F) {
        self.log_with(Level::Critical, message);
    }

    /// Flushes every sink this logger currently writes to.
    pub fn flush(&self) -> Result<()> {
        for sink in self.sinks.load().iter() {
            sink.flush()?;
        }
        Ok(())
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level())
            .field("sinks", &self.sinks.load().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::formatter::{Formatter, FormatterSlot, MessageFormatter};
    use crate::sinks::MemorySink;
    use std::cell::Cell;
    use std::time::Duration;

    fn quiet_reporter() -> Arc<ErrorReporter> {
        Arc::new(
            ErrorReporter::with_writer(Box::new(std::io::sink())).with_window(Duration::ZERO),
        )
    }

    fn logger_with(level: Level, sinks: SinkList) -> Logger {
        Logger::new(
            "test/logger",
            level,
            Arc::new(sinks),
            quiet_reporter(),
            Arc::new(DispatchMetrics::new()),
        )
    }

    fn memory() -> Arc<MemorySink> {
        Arc::new(MemorySink::with_formatter(Arc::new(MessageFormatter)))
    }

    struct BrokenSink {
        formatter: FormatterSlot,
    }

    impl crate::core::sink::Sink for BrokenSink {
        fn append(&self, _event: &AppendEvent<'_>) -> Result<()> {
            Err(LoggerError::sink("broken", "destination closed"))
        }

        fn formatter(&self) -> Arc<dyn Formatter> {
            self.formatter.get()
        }

        fn set_formatter(&self, formatter: Arc<dyn Formatter>) {
            self.formatter.set(formatter);
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    #[test]
    fn test_level_gating() {
        let sink = memory();
        let logger = logger_with(Level::Warn, vec![sink.clone()]);

        logger.trace("t", &[]);
        logger.debug("d", &[]);
        logger.info("i", &[]);
        assert_eq!(sink.append_count(), 0);

        logger.warn("w", &[]);
        logger.error("e", &[]);
        logger.critical("c", &[]);
        assert_eq!(sink.lines(), vec!["w", "e", "c"]);
    }

    #[test]
    fn test_off_suppresses_everything() {
        let sink = memory();
        let logger = logger_with(Level::Off, vec![sink.clone()]);
        logger.critical("nope", &[]);
        logger.log(Level::Off, "nope", &[]);
        assert_eq!(sink.append_count(), 0);
    }

    #[test]
    fn test_placeholders_reach_sink() {
        let sink = memory();
        let logger = logger_with(Level::Trace, vec![sink.clone()]);
        logger.info("user {} logged in from {}", &[&42, &"10.0.0.1"]);
        logger.info("extra", &[&1, &2]);
        assert_eq!(sink.lines(), vec!["user 42 logged in from 10.0.0.1", "extra 1 2"]);
    }

    #[test]
    fn test_lazy_message_not_built_when_disabled() {
        let sink = memory();
        let logger = logger_with(Level::Info, vec![sink.clone()]);
        let built = Cell::new(0);

        logger.debug_with(|| {
            built.set(built.get() + 1);
            "expensive".to_string()
        });
        assert_eq!(built.get(), 0);

        logger.info_with(|| {
            built.set(built.get() + 1);
            "cheap enough".to_string()
        });
        assert_eq!(built.get(), 1);
        assert_eq!(sink.lines(), vec!["cheap enough"]);
    }

    #[test]
    fn test_failing_sink_does_not_block_others() {
        let good = memory();
        let broken: SinkRef = Arc::new(BrokenSink {
            formatter: FormatterSlot::default(),
        });
        let logger = logger_with(Level::Info, vec![broken, good.clone()]);

        logger.error("still delivered", &[]);
        assert_eq!(good.lines(), vec!["still delivered"]);

        let err = logger.try_log(Level::Error, "again", &[]).unwrap_err();
        assert!(matches!(err, LoggerError::Sink { .. }));
        assert_eq!(good.append_count(), 2);
        assert_eq!(logger.metrics.append_failures(), 2);
        assert_eq!(logger.metrics.appends(), 2);
    }

    #[test]
    fn test_each_sink_uses_its_own_formatter() {
        let raw = memory();
        let patterned = Arc::new(MemorySink::new());
        let logger = logger_with(Level::Info, vec![raw.clone(), patterned.clone()]);

        logger.info("hello", &[]);
        assert_eq!(raw.contents(), "hello");
        assert!(patterned.contents().ends_with("[INFO] test/logger - hello\n"));
    }

    #[test]
    fn test_set_and_add_sinks() {
        let first = memory();
        let second = memory();
        let logger = logger_with(Level::Info, Vec::new());

        logger.info("dropped", &[]);
        logger.set_sinks(vec![first.clone()]);
        logger.add_sink(second.clone());
        logger.info("both", &[]);

        assert_eq!(logger.sinks().len(), 2);
        assert_eq!(first.lines(), vec!["both"]);
        assert_eq!(second.lines(), vec!["both"]);
    }

    #[test]
    fn test_caller_is_captured() {
        let sink = Arc::new(MemorySink::with_formatter(Arc::new(
            crate::core::formatter::PatternFormatter::new("{file}:{message}").unwrap(),
        )));
        let logger = logger_with(Level::Info, vec![sink.clone()]);
        logger.info("here", &[]);
        assert_eq!(sink.contents(), "logger.rs:here");
    }
}
