//! Formatters turn a [`LogRecord`] into the text a sink writes
//!
//! Formatters are shared between sinks and threads, so every implementation
//! must be `Send + Sync` and rendering takes `&self`.

use super::error::{LoggerError, Result};
use super::level::Level;
use super::record::LogRecord;
use super::snapshot::SwapCell;
use chrono::format::{Item, StrftimeItems};
use chrono::SecondsFormat;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::fmt::{self, Write};
use std::sync::Arc;

/// Pattern used when nothing else is configured
pub const DEFAULT_PATTERN: &str = "{time} [{LEVEL}] {logger} - {message}\n";

/// strftime format used by `{time}` without a filter
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub trait Formatter: Send + Sync {
    fn format(&self, record: &LogRecord<'_>) -> String;
}

static DEFAULT_FORMATTER: Lazy<Arc<PatternFormatter>> =
    Lazy::new(|| Arc::new(PatternFormatter::default()));

/// The shared formatter used by sinks that were not given one.
pub fn default_formatter() -> Arc<dyn Formatter> {
    Arc::clone(&DEFAULT_FORMATTER) as Arc<dyn Formatter>
}

/// Holds a sink's current formatter and lets it be replaced while other
/// threads are rendering with it.
pub struct FormatterSlot {
    current: SwapCell<Arc<dyn Formatter>>,
}

impl FormatterSlot {
    pub fn new(formatter: Arc<dyn Formatter>) -> Self {
        Self {
            current: SwapCell::new(Arc::new(formatter)),
        }
    }

    #[inline]
    pub fn get(&self) -> Arc<dyn Formatter> {
        Arc::clone(&*self.current.load())
    }

    pub fn set(&self, formatter: Arc<dyn Formatter>) {
        self.current.store(Arc::new(formatter));
    }
}

impl Default for FormatterSlot {
    fn default() -> Self {
        Self::new(default_formatter())
    }
}

impl fmt::Debug for FormatterSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FormatterSlot")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Text(String),
    Time(Option<String>),
    Logger,
    LevelUpper,
    LevelTitle,
    LevelLower,
    Message,
    Thread,
    Module,
    File,
    Line,
}

/// Renders records through a template such as
/// `{time|%H:%M:%S} [{LEVEL}] {logger} - {message}\n`.
///
/// Variables: `{time}` (optionally `{time|<strftime>}`), `{logger}`,
/// `{LEVEL}`/`{Level}`/`{level}`, `{message}`, `{thread}`, `{module}`,
/// `{file}`, `{line}`. `{{` and `}}` produce literal braces.
#[derive(Debug, Clone)]
pub struct PatternFormatter {
    pattern: String,
    tokens: Vec<Token>,
}

impl PatternFormatter {
    /// Compiles `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::Pattern`] for unknown variables, stray `}`,
    /// unterminated variables and invalid time formats.
    pub fn new(pattern: &str) -> Result<Self> {
        let tokens = compile(pattern)?;
        Ok(Self {
            pattern: pattern.to_string(),
            tokens,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl Default for PatternFormatter {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            tokens: vec![
                Token::Time(None),
                Token::Text(" [".into()),
                Token::LevelUpper,
                Token::Text("] ".into()),
                Token::Logger,
                Token::Text(" - ".into()),
                Token::Message,
                Token::Text("\n".into()),
            ],
        }
    }
}

fn compile(pattern: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut chars = pattern.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                text.push('{');
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                text.push('}');
            }
            '}' => {
                return Err(LoggerError::pattern(
                    pattern,
                    format!("unexpected '}}' at {}", idx),
                ));
            }
            '{' => {
                let mut body = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    body.push(c);
                }
                if !closed {
                    return Err(LoggerError::pattern(
                        pattern,
                        format!("variable starting at {} is not closed", idx),
                    ));
                }
                if !text.is_empty() {
                    tokens.push(Token::Text(std::mem::take(&mut text)));
                }
                tokens.push(variable(pattern, &body)?);
            }
            _ => text.push(c),
        }
    }

    if !text.is_empty() {
        tokens.push(Token::Text(text));
    }
    Ok(tokens)
}

fn variable(pattern: &str, body: &str) -> Result<Token> {
    let (name, filter) = match body.split_once('|') {
        Some((name, filter)) => (name, Some(filter)),
        None => (body, None),
    };

    let token = match name {
        "time" => {
            return match filter {
                Some(format) if !format.is_empty() => {
                    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                        return Err(LoggerError::pattern(
                            pattern,
                            format!("invalid time format '{}'", format),
                        ));
                    }
                    Ok(Token::Time(Some(format.to_string())))
                }
                _ => Ok(Token::Time(None)),
            };
        }
        "logger" => Token::Logger,
        "LEVEL" => Token::LevelUpper,
        "Level" => Token::LevelTitle,
        "level" => Token::LevelLower,
        "message" => Token::Message,
        "thread" => Token::Thread,
        "module" => Token::Module,
        "file" => Token::File,
        "line" => Token::Line,
        other => {
            return Err(LoggerError::pattern(
                pattern,
                format!("unknown variable name: {}", other),
            ));
        }
    };

    if filter.is_some() {
        return Err(LoggerError::pattern(
            pattern,
            format!("variable '{}' does not take a filter", name),
        ));
    }
    Ok(token)
}

impl Formatter for PatternFormatter {
    fn format(&self, record: &LogRecord<'_>) -> String {
        let mut out = String::with_capacity(64 + record.message.len());
        let caller = record.caller.as_ref();

        for token in &self.tokens {
            // Writing into a String cannot fail; time formats were validated
            // at compile time.
            let _ = match token {
                Token::Text(text) => out.write_str(text),
                Token::Time(format) => write!(
                    out,
                    "{}",
                    record
                        .timestamp
                        .format(format.as_deref().unwrap_or(DEFAULT_TIME_FORMAT))
                ),
                Token::Logger => out.write_str(record.logger),
                Token::LevelUpper => out.write_str(record.level.name()),
                Token::LevelTitle => out.write_str(record.level.title_name()),
                Token::LevelLower => out.write_str(&record.level.name().to_lowercase()),
                Token::Message => out.write_str(&record.message),
                Token::Thread => out.write_str(&record.thread),
                Token::Module => out.write_str(caller.and_then(|c| c.module_path).unwrap_or("?")),
                Token::File => out.write_str(caller.map(|c| c.file_name()).unwrap_or("?")),
                Token::Line => match caller {
                    Some(c) => write!(out, "{}", c.line),
                    None => out.write_str("?"),
                },
            };
        }
        out
    }
}

/// Emits only the message text, without a trailing newline.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageFormatter;

impl Formatter for MessageFormatter {
    fn format(&self, record: &LogRecord<'_>) -> String {
        record.message.clone()
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    timestamp: String,
    level: Level,
    logger: &'a str,
    message: &'a str,
    thread: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    module: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
}

/// Writes each record as a single-line JSON object (JSONL).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, record: &LogRecord<'_>) -> String {
        let line = JsonLine {
            timestamp: record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, false),
            level: record.level,
            logger: record.logger,
            message: &record.message,
            thread: &record.thread,
            module: record.caller.and_then(|c| c.module_path),
            file: record.caller.map(|c| c.file),
            line: record.caller.map(|c| c.line),
        };
        let mut out = serde_json::to_string(&line).unwrap_or_else(|_| record.message.clone());
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::Caller;
    use chrono::{Local, TimeZone};

    fn record(message: &str) -> LogRecord<'static> {
        let mut record = LogRecord::new("app/net", Level::Warn, message.to_string());
        record.timestamp = Local.with_ymd_and_hms(2017, 5, 6, 11, 12, 13).unwrap();
        record.thread = "main".to_string();
        record
    }

    #[test]
    fn test_default_pattern() {
        let out = PatternFormatter::default().format(&record("disk low"));
        assert_eq!(out, "2017-05-06 11:12:13.000 [WARN] app/net - disk low\n");

        let compiled = PatternFormatter::new(DEFAULT_PATTERN).unwrap();
        assert_eq!(compiled.tokens, PatternFormatter::default().tokens);
    }

    #[test]
    fn test_level_case_and_time_filter() {
        let formatter = PatternFormatter::new("{time|%Y-%m-%d} {Level}/{level} {thread}").unwrap();
        assert_eq!(formatter.format(&record("x")), "2017-05-06 Warn/warn main");
    }

    #[test]
    fn test_brace_escapes() {
        let formatter = PatternFormatter::new("{{{message}}}").unwrap();
        assert_eq!(formatter.format(&record("hi")), "{hi}");
    }

    #[test]
    fn test_caller_tokens() {
        let formatter = PatternFormatter::new("{module}:{file}:{line}").unwrap();
        assert_eq!(formatter.format(&record("x")), "?:?:?");

        let caller = Caller {
            module_path: Some("app::net"),
            file: "src/net/mod.rs",
            line: 42,
        };
        let out = formatter.format(&record("x").with_caller(caller));
        assert_eq!(out, "app::net:mod.rs:42");
    }

    #[test]
    fn test_compile_errors() {
        for bad in ["{nope}", "oops}", "{message", "{time|%Q}", "{logger|x}"] {
            let err = PatternFormatter::new(bad).unwrap_err();
            assert!(matches!(err, LoggerError::Pattern { .. }), "{bad}");
        }
    }

    #[test]
    fn test_json_formatter() {
        let out = JsonFormatter.format(&record("quoted \"text\""));
        assert!(out.ends_with('\n'));
        let parsed: serde_json::Value = serde_json::from_str(out.trim_end()).unwrap();
        assert_eq!(parsed["level"], "WARN");
        assert_eq!(parsed["logger"], "app/net");
        assert_eq!(parsed["message"], "quoted \"text\"");
        assert!(parsed.get("file").is_none());
    }

    #[test]
    fn test_slot_swap() {
        let slot = FormatterSlot::default();
        let before = slot.get();
        slot.set(Arc::new(MessageFormatter));
        assert_eq!(slot.get().format(&record("raw")), "raw");
        assert!(before.format(&record("raw")).ends_with(" - raw\n"));
    }
}
