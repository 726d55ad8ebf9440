//! Type-tag to factory lookup used when building sinks and formatters from
//! a config document
//!
//! Each factory receives the entry's extra fields (everything besides
//! `name`, `type` and `formatter`) as a JSON object.

use crate::core::{
    Formatter, JsonFormatter, LoggerError, MessageFormatter, PatternFormatter, Result, SinkRef,
};
use crate::sinks::{
    parse_size, ConsoleSink, FileSink, MemorySink, NopSink, Rotater, SizeRotater, SyslogSink,
    TimeRotater,
};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Extra fields of one config entry
pub type Settings = serde_json::Map<String, serde_json::Value>;

pub type FormatterFactory = Arc<dyn Fn(&Settings) -> Result<Arc<dyn Formatter>> + Send + Sync>;

pub type SinkFactory = Arc<dyn Fn(&Settings) -> Result<SinkRef> + Send + Sync>;

static GLOBAL_BUILDERS: Lazy<BuilderRegistry> = Lazy::new(BuilderRegistry::with_defaults);

/// Factories for formatter and sink types, keyed by the `type` tag
///
/// # Example
///
/// ```
/// use hierlog::config::BuilderRegistry;
/// use hierlog::sinks::NopSink;
/// use std::sync::Arc;
///
/// let builders = BuilderRegistry::with_defaults();
/// builders.register_sink("blackhole", |_settings| Ok(Arc::new(NopSink::new())));
/// assert!(builders.sink_builder("blackhole").is_some());
/// ```
pub struct BuilderRegistry {
    formatters: RwLock<HashMap<String, FormatterFactory>>,
    sinks: RwLock<HashMap<String, SinkFactory>>,
}

impl BuilderRegistry {
    /// A registry with no builders at all
    pub fn empty() -> Self {
        Self {
            formatters: RwLock::new(HashMap::new()),
            sinks: RwLock::new(HashMap::new()),
        }
    }

    /// Formatters `pattern`, `json`, `message`; sinks `console`, `stderr`,
    /// `file`, `nop`, `memory`, `syslog`.
    pub fn with_defaults() -> Self {
        let registry = Self::empty();

        registry.register_formatter("pattern", build_pattern_formatter);
        registry.register_formatter("json", |_| Ok(Arc::new(JsonFormatter)));
        registry.register_formatter("message", |_| Ok(Arc::new(MessageFormatter)));

        registry.register_sink("console", |settings| {
            let s: ConsoleSettings = parse_settings("console sink", settings)?;
            let sink = ConsoleSink::stdout();
            Ok(Arc::new(match s.colors {
                Some(colors) => sink.with_colors(colors),
                None => sink,
            }))
        });
        registry.register_sink("stderr", |settings| {
            let s: ConsoleSettings = parse_settings("stderr sink", settings)?;
            let sink = ConsoleSink::stderr();
            Ok(Arc::new(match s.colors {
                Some(colors) => sink.with_colors(colors),
                None => sink,
            }))
        });
        registry.register_sink("file", build_file_sink);
        registry.register_sink("nop", |_| Ok(Arc::new(NopSink::new())));
        registry.register_sink("memory", |_| Ok(Arc::new(MemorySink::new())));
        registry.register_sink("syslog", build_syslog_sink);

        registry
    }

    /// Builders shared by the whole process; [`crate::global::init`] uses these.
    pub fn global() -> &'static BuilderRegistry {
        &GLOBAL_BUILDERS
    }

    /// Registers (or replaces) the formatter factory for `kind`.
    pub fn register_formatter<F>(&self, kind: &str, factory: F)
    where
        F: Fn(&Settings) -> Result<Arc<dyn Formatter>> + Send + Sync + 'static,
    {
        self.formatters
            .write()
            .insert(kind.to_string(), Arc::new(factory));
    }

    /// Registers (or replaces) the sink factory for `kind`.
    pub fn register_sink<F>(&self, kind: &str, factory: F)
    where
        F: Fn(&Settings) -> Result<SinkRef> + Send + Sync + 'static,
    {
        self.sinks.write().insert(kind.to_string(), Arc::new(factory));
    }

    pub fn formatter_builder(&self, kind: &str) -> Option<FormatterFactory> {
        self.formatters.read().get(kind).cloned()
    }

    pub fn sink_builder(&self, kind: &str) -> Option<SinkFactory> {
        self.sinks.read().get(kind).cloned()
    }
}

impl Default for BuilderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for BuilderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formatters: Vec<String> = self.formatters.read().keys().cloned().collect();
        let mut sinks: Vec<String> = self.sinks.read().keys().cloned().collect();
        formatters.sort();
        sinks.sort();
        f.debug_struct("BuilderRegistry")
            .field("formatters", &formatters)
            .field("sinks", &sinks)
            .finish()
    }
}

/// Deserializes an entry's extra fields into the builder's own settings type.
pub fn parse_settings<T: DeserializeOwned>(component: &str, settings: &Settings) -> Result<T> {
    serde_json::from_value(serde_json::Value::Object(settings.clone()))
        .map_err(|e| LoggerError::config(component, e.to_string()))
}

#[derive(Deserialize)]
struct PatternSettings {
    pattern: String,
}

fn build_pattern_formatter(settings: &Settings) -> Result<Arc<dyn Formatter>> {
    let s: PatternSettings = parse_settings("pattern formatter", settings)?;
    Ok(Arc::new(PatternFormatter::new(&s.pattern)?))
}

#[derive(Deserialize)]
struct ConsoleSettings {
    #[serde(default)]
    colors: Option<bool>,
}

#[derive(Deserialize)]
struct RotationSettings {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    suffix_width: Option<usize>,
    #[serde(default)]
    pattern: Option<String>,
}

#[derive(Deserialize)]
struct FileSettings {
    path: String,
    #[serde(default)]
    rotation: Option<RotationSettings>,
    #[serde(default)]
    compress: bool,
    #[serde(default)]
    max_archives: Option<usize>,
}

fn build_rotater(settings: &RotationSettings) -> Result<Box<dyn Rotater>> {
    const COMPONENT: &str = "file sink rotation";
    let rotater: Box<dyn Rotater> = match settings.kind.as_str() {
        "size" => {
            let (Some(size), Some(width)) = (&settings.size, settings.suffix_width) else {
                return Err(LoggerError::config(
                    COMPONENT,
                    "size rotation needs both 'size' and 'suffix_width'",
                ));
            };
            if width == 0 {
                return Err(LoggerError::config(COMPONENT, "'suffix_width' must be positive"));
            }
            Box::new(SizeRotater::new(parse_size(size)?, width))
        }
        "hourly" => match &settings.pattern {
            Some(pattern) => Box::new(TimeRotater::new(pattern)?),
            None => Box::new(TimeRotater::hourly()),
        },
        "daily" => match &settings.pattern {
            Some(pattern) => Box::new(TimeRotater::new(pattern)?),
            None => Box::new(TimeRotater::daily()),
        },
        "time" => match &settings.pattern {
            Some(pattern) => Box::new(TimeRotater::new(pattern)?),
            None => return Err(LoggerError::config(COMPONENT, "time rotation needs a 'pattern'")),
        },
        other => {
            return Err(LoggerError::config(
                COMPONENT,
                format!("unknown rotation type '{}'", other),
            ))
        }
    };
    Ok(rotater)
}

fn build_file_sink(settings: &Settings) -> Result<SinkRef> {
    let s: FileSettings = parse_settings("file sink", settings)?;
    if s.path.is_empty() {
        return Err(LoggerError::config("file sink", "'path' must not be empty"));
    }

    // Resolve the rotater before touching the filesystem
    let rotater = s.rotation.as_ref().map(build_rotater).transpose()?;

    let mut sink = FileSink::new(&s.path)?.with_compression(s.compress);
    if let Some(rotater) = rotater {
        sink = sink.with_rotater(rotater);
    }
    if let Some(keep) = s.max_archives {
        sink = sink.with_max_archives(keep);
    }
    Ok(Arc::new(sink))
}

#[derive(Deserialize)]
struct SyslogSettings {
    tag: String,
    #[serde(default)]
    transport: Option<String>,
    #[serde(default)]
    address: Option<String>,
}

fn build_syslog_sink(settings: &Settings) -> Result<SinkRef> {
    const COMPONENT: &str = "syslog sink";
    let s: SyslogSettings = parse_settings(COMPONENT, settings)?;
    if s.tag.is_empty() {
        return Err(LoggerError::config(COMPONENT, "'tag' must not be empty"));
    }

    let address = || {
        s.address
            .as_deref()
            .ok_or_else(|| LoggerError::config(COMPONENT, "network transports need an 'address'"))
    };
    let sink = match s.transport.as_deref() {
        Some("udp") => SyslogSink::udp(address()?, &s.tag)?,
        Some("tcp") => SyslogSink::tcp(address()?, &s.tag)?,
        #[cfg(unix)]
        None | Some("unix") => SyslogSink::local(&s.tag)?,
        Some(other) => {
            return Err(LoggerError::config(
                COMPONENT,
                format!("unknown transport '{}'", other),
            ))
        }
        #[cfg(not(unix))]
        None => return Err(LoggerError::config(COMPONENT, "a 'transport' is required")),
    };
    Ok(Arc::new(sink))
}
