//! Rate-limited side channel for the logger's own failures
//!
//! A sink that cannot write must not be able to flood the reporting path.
//! [`ErrorReporter`] emits at most one line per window and counts the rest,
//! folding that count into the next line it does emit.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default minimum spacing between two emitted reports
pub const DEFAULT_REPORT_WINDOW: Duration = Duration::from_secs(1);

const NEVER: u64 = u64::MAX;

static GLOBAL_REPORTER: Lazy<Arc<ErrorReporter>> = Lazy::new(|| Arc::new(ErrorReporter::new()));

pub struct ErrorReporter {
    window_ms: u64,
    origin: Instant,
    /// Milliseconds since `origin` of the last emitted line
    last_emit_ms: AtomicU64,
    pending_suppressed: AtomicU64,
    total_suppressed: AtomicU64,
    emitted: AtomicU64,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ErrorReporter {
    /// Reporter writing to stderr with the default window
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stderr()))
    }

    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            window_ms: DEFAULT_REPORT_WINDOW.as_millis() as u64,
            origin: Instant::now(),
            last_emit_ms: AtomicU64::new(NEVER),
            pending_suppressed: AtomicU64::new(0),
            total_suppressed: AtomicU64::new(0),
            emitted: AtomicU64::new(0),
            writer: Mutex::new(writer),
        }
    }

    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window_ms = window.as_millis() as u64;
        self
    }

    /// Process-wide reporter used when nothing else was injected
    pub fn global() -> Arc<ErrorReporter> {
        Arc::clone(&GLOBAL_REPORTER)
    }

    /// Reports one failure. Returns true if a line was written, false if it
    /// was suppressed by the rate limit.
    pub fn report(&self, context: &str, error: &dyn fmt::Display) -> bool {
        let now = self.origin.elapsed().as_millis() as u64;
        let last = self.last_emit_ms.load(Ordering::Acquire);

        let in_window = last != NEVER && now.saturating_sub(last) < self.window_ms;
        if in_window
            || self
                .last_emit_ms
                .compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            self.pending_suppressed.fetch_add(1, Ordering::Relaxed);
            self.total_suppressed.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let skipped = self.pending_suppressed.swap(0, Ordering::Relaxed);
        let mut writer = self.writer.lock();
        let _ = if skipped > 0 {
            writeln!(
                writer,
                "[hierlog ERROR] {}: {} ({} similar reports suppressed)",
                context, error, skipped
            )
        } else {
            writeln!(writer, "[hierlog ERROR] {}: {}", context, error)
        };
        let _ = writer.flush();
        self.emitted.fetch_add(1, Ordering::Relaxed);
        true
    }

    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    pub fn suppressed(&self) -> u64 {
        self.total_suppressed.load(Ordering::Relaxed)
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("window_ms", &self.window_ms)
            .field("emitted", &self.emitted())
            .field("suppressed", &self.suppressed())
            .finish()
    }
}
