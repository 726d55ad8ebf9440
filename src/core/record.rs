//! Per-call log record and the rendered event handed to sinks

use super::level::Level;
use chrono::{DateTime, Local};
use std::cell::RefCell;
use std::panic::Location;

// Thread-local cache for the thread label to avoid repeated allocations
thread_local! {
    static THREAD_LABEL_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Thread name if it has one, otherwise its id
fn thread_label() -> String {
    THREAD_LABEL_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| {
                let current = std::thread::current();
                match current.name() {
                    Some(name) => name.to_string(),
                    None => format!("{:?}", current.id()),
                }
            })
            .clone()
    })
}

/// Source location of a log call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub module_path: Option<&'static str>,
    pub file: &'static str,
    pub line: u32,
}

impl Caller {
    /// Location of the `#[track_caller]` frame that invoked this.
    #[track_caller]
    pub fn here() -> Self {
        Self::from_location(Location::caller())
    }

    pub fn from_location(location: &'static Location<'static>) -> Self {
        Self {
            module_path: None,
            file: location.file(),
            line: location.line(),
        }
    }

    #[must_use]
    pub fn with_module_path(mut self, module_path: &'static str) -> Self {
        self.module_path = Some(module_path);
        self
    }

    /// File name without its directories
    pub fn file_name(&self) -> &'static str {
        self.file
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.file)
    }
}

/// One log call, created fresh and dropped once every sink has seen it.
#[derive(Debug, Clone)]
pub struct LogRecord<'a> {
    pub logger: &'a str,
    pub level: Level,
    pub timestamp: DateTime<Local>,
    pub message: String,
    pub thread: String,
    pub caller: Option<Caller>,
}

impl<'a> LogRecord<'a> {
    pub fn new(logger: &'a str, level: Level, message: String) -> Self {
        Self {
            logger,
            level,
            timestamp: Local::now(),
            message,
            thread: thread_label(),
            caller: None,
        }
    }

    #[must_use]
    pub fn with_caller(mut self, caller: Caller) -> Self {
        self.caller = Some(caller);
        self
    }
}

/// A record rendered by one sink's formatter, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendEvent<'a> {
    pub logger: &'a str,
    pub level: Level,
    pub text: String,
}

impl<'a> AppendEvent<'a> {
    pub fn new(logger: &'a str, level: Level, text: impl Into<String>) -> Self {
        Self {
            logger,
            level,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_here_points_at_this_file() {
        let caller = Caller::here();
        assert_eq!(caller.file_name(), "record.rs");
        assert!(caller.line > 0);
        assert!(caller.module_path.is_none());
    }

    #[test]
    fn test_named_thread_label() {
        let label = std::thread::Builder::new()
            .name("worker-7".into())
            .spawn(|| LogRecord::new("x", Level::Info, String::new()).thread)
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(label, "worker-7");
    }
}
