//! Console sink writing to stdout or stderr

use crate::core::{AppendEvent, Formatter, FormatterSlot, LoggerError, Result, Sink};
#[cfg(feature = "console")]
use colored::Colorize;
use std::io::{self, Write};
use std::sync::Arc;

/// Which standard stream a [`ConsoleSink`] writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleTarget {
    Stdout,
    Stderr,
}

#[derive(Debug)]
pub struct ConsoleSink {
    target: ConsoleTarget,
    use_colors: bool,
    formatter: FormatterSlot,
}

impl ConsoleSink {
    pub fn new(target: ConsoleTarget) -> Self {
        Self {
            target,
            use_colors: cfg!(feature = "console"),
            formatter: FormatterSlot::default(),
        }
    }

    pub fn stdout() -> Self {
        Self::new(ConsoleTarget::Stdout)
    }

    pub fn stderr() -> Self {
        Self::new(ConsoleTarget::Stderr)
    }

    /// Color each line by level. Has no effect without the `console` feature.
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    #[must_use]
    pub fn with_formatter(self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter.set(formatter);
        self
    }

    pub fn target(&self) -> ConsoleTarget {
        self.target
    }

    #[cfg(feature = "console")]
    fn render(&self, event: &AppendEvent<'_>) -> String {
        if !self.use_colors {
            return event.text.clone();
        }
        // Keep the newline outside the escape sequence
        let body = event.text.trim_end_matches('\n');
        let tail = &event.text[body.len()..];
        format!("{}{}", body.color(event.level.color_code()), tail)
    }

    #[cfg(not(feature = "console"))]
    fn render(&self, event: &AppendEvent<'_>) -> String {
        event.text.clone()
    }

    fn write_to(&self, out: &mut dyn Write, bytes: &[u8]) -> io::Result<()> {
        out.write_all(bytes)
    }
}

impl Sink for ConsoleSink {
    fn append(&self, event: &AppendEvent<'_>) -> Result<()> {
        let text = self.render(event);
        let result = match self.target {
            ConsoleTarget::Stdout => self.write_to(&mut io::stdout().lock(), text.as_bytes()),
            ConsoleTarget::Stderr => self.write_to(&mut io::stderr().lock(), text.as_bytes()),
        };
        result.map_err(|e| {
            LoggerError::io_operation(format!("writing to {}", self.name()), e.to_string(), e)
        })
    }

    fn formatter(&self) -> Arc<dyn Formatter> {
        self.formatter.get()
    }

    fn set_formatter(&self, formatter: Arc<dyn Formatter>) {
        self.formatter.set(formatter);
    }

    fn flush(&self) -> Result<()> {
        match self.target {
            ConsoleTarget::Stdout => io::stdout().flush()?,
            ConsoleTarget::Stderr => io::stderr().flush()?,
        }
        Ok(())
    }

    fn name(&self) -> &str {
        match self.target {
            ConsoleTarget::Stdout => "console",
            ConsoleTarget::Stderr => "stderr",
        }
    }
}
