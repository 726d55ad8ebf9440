//! Configuration documents and environment rules
//!
//! A [`LoggingConfig`] names formatters, sinks and logger rules:
//!
//! ```json
//! {
//!   "formatters": [{ "name": "default", "type": "pattern", "pattern": "{time} [{LEVEL}] {logger} - {message}\n" }],
//!   "sinks":      [{ "name": "console", "type": "console", "formatter": "default" }],
//!   "loggers":    [{ "name": "", "level": "INFO", "sinks": ["console"] },
//!                  { "name": "net/http", "level": "DEBUG" }]
//! }
//! ```
//!
//! Loading is all or nothing: every entry is parsed, validated and built
//! before the first rule reaches the registry, so a broken document leaves
//! the registry exactly as it was.

pub mod builder;

pub use builder::{BuilderRegistry, FormatterFactory, Settings, SinkFactory};

use crate::core::{Formatter, Level, LoggerError, Registry, Result, SinkList, SinkRef};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Environment variable read by [`crate::global::init_from_env`] by default
pub const ENV_VAR: &str = "HIERLOG_LEVELS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub formatters: Vec<FormatterConfig>,
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
    #[serde(default)]
    pub loggers: Vec<LoggerConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatterConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Everything else, handed to the formatter builder
    #[serde(flatten)]
    pub settings: Settings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatter: Option<String>,
    #[serde(flatten)]
    pub settings: Settings,
}

/// Rule for a logger name or name prefix. `""` is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sinks: Option<Vec<String>>,
}

impl LoggingConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            LoggerError::io_operation(
                "reading logging config",
                format!("{}: {}", path.display(), e),
                e,
            )
        })?;
        Self::from_json(&text)
    }

    /// Validates the document and builds every formatter and sink it names.
    ///
    /// Nothing is applied to any registry yet.
    pub fn resolve(&self, builders: &BuilderRegistry) -> Result<ResolvedConfig> {
        let levels = self.parse_logger_levels()?;
        let formatters = self.build_formatters(builders)?;
        let sinks = self.build_sinks(builders, &formatters)?;

        let mut rules = Vec::with_capacity(self.loggers.len());
        for (entry, level) in self.loggers.iter().zip(levels) {
            let sink_list = entry
                .sinks
                .as_ref()
                .map(|names| {
                    names
                        .iter()
                        .map(|name| {
                            sinks.get(name).cloned().ok_or_else(|| {
                                LoggerError::config(
                                    format!("logger '{}'", entry.name),
                                    format!("unknown sink '{}'", name),
                                )
                            })
                        })
                        .collect::<Result<SinkList>>()
                })
                .transpose()?;

            rules.push(ResolvedLogger {
                name: entry.name.clone(),
                level,
                sinks: sink_list,
            });
        }

        Ok(ResolvedConfig { loggers: rules })
    }

    /// Resolves with `builders` and applies the result to `registry`.
    pub fn apply(&self, registry: &Registry, builders: &BuilderRegistry) -> Result<()> {
        self.resolve(builders)?.apply(registry);
        Ok(())
    }

    /// Checks logger names are unique and parses their levels.
    fn parse_logger_levels(&self) -> Result<Vec<Option<Level>>> {
        let mut seen = HashSet::new();
        self.loggers
            .iter()
            .map(|entry| {
                let component = format!("logger '{}'", entry.name);
                if !seen.insert(entry.name.as_str()) {
                    return Err(LoggerError::config(component, "declared more than once"));
                }
                entry
                    .level
                    .as_deref()
                    .map(|text| {
                        text.parse::<Level>()
                            .map_err(|e| LoggerError::config(&component, e.to_string()))
                    })
                    .transpose()
            })
            .collect()
    }

    fn build_formatters(
        &self,
        builders: &BuilderRegistry,
    ) -> Result<HashMap<String, Arc<dyn Formatter>>> {
        let mut built = HashMap::new();
        for entry in &self.formatters {
            let component = format!("formatter '{}'", entry.name);
            if entry.name.is_empty() {
                return Err(LoggerError::config("formatter", "name must not be empty"));
            }
            if built.contains_key(&entry.name) {
                return Err(LoggerError::config(component, "declared more than once"));
            }
            let build = builders.formatter_builder(&entry.kind).ok_or_else(|| {
                LoggerError::config(&component, format!("unknown type '{}'", entry.kind))
            })?;
            built.insert(entry.name.clone(), build(&entry.settings)?);
        }
        Ok(built)
    }

    fn build_sinks(
        &self,
        builders: &BuilderRegistry,
        formatters: &HashMap<String, Arc<dyn Formatter>>,
    ) -> Result<HashMap<String, SinkRef>> {
        // Check names and references first so no sink is opened for a
        // document that is going to be rejected anyway
        let mut names = HashSet::new();
        for entry in &self.sinks {
            let component = format!("sink '{}'", entry.name);
            if entry.name.is_empty() {
                return Err(LoggerError::config("sink", "name must not be empty"));
            }
            if !names.insert(entry.name.as_str()) {
                return Err(LoggerError::config(component, "declared more than once"));
            }
            if builders.sink_builder(&entry.kind).is_none() {
                return Err(LoggerError::config(
                    component,
                    format!("unknown type '{}'", entry.kind),
                ));
            }
            if let Some(formatter) = &entry.formatter {
                if !formatters.contains_key(formatter) {
                    return Err(LoggerError::config(
                        component,
                        format!("unknown formatter '{}'", formatter),
                    ));
                }
            }
        }
        for entry in &self.loggers {
            for name in entry.sinks.iter().flatten() {
                if !names.contains(name.as_str()) {
                    return Err(LoggerError::config(
                        format!("logger '{}'", entry.name),
                        format!("unknown sink '{}'", name),
                    ));
                }
            }
        }

        let mut built = HashMap::new();
        for entry in &self.sinks {
            let component = format!("sink '{}'", entry.name);
            let build = builders.sink_builder(&entry.kind).ok_or_else(|| {
                LoggerError::config(&component, format!("unknown type '{}'", entry.kind))
            })?;
            let sink = build(&entry.settings)?;
            if let Some(formatter) = entry.formatter.as_ref().and_then(|f| formatters.get(f)) {
                sink.set_formatter(Arc::clone(formatter));
            }
            built.insert(entry.name.clone(), sink);
        }
        Ok(built)
    }
}

/// One validated logger rule
#[derive(Clone)]
pub struct ResolvedLogger {
    pub name: String,
    pub level: Option<Level>,
    pub sinks: Option<SinkList>,
}

/// A fully built configuration, ready to apply
#[derive(Clone)]
pub struct ResolvedConfig {
    pub loggers: Vec<ResolvedLogger>,
}

impl ResolvedConfig {
    /// Installs every rule, shortest prefix first, and creates each named
    /// logger. Cannot fail.
    ///
    /// Setting a rule overwrites every existing logger under it, so
    /// installing broad rules before narrow ones keeps the narrow ones in
    /// force whatever order the document lists them in.
    pub fn apply(self, registry: &Registry) {
        let mut rules = self.loggers;
        rules.sort_by_key(|rule| rule.name.len());
        for rule in rules {
            if let Some(level) = rule.level {
                registry.set_prefix_level(&rule.name, level);
            }
            if let Some(sinks) = rule.sinks {
                registry.set_prefix_sinks(&rule.name, sinks);
            }
            if !rule.name.is_empty() {
                registry.get_logger(&rule.name);
            }
        }
    }
}

/// Parses `prefix=LEVEL;prefix=LEVEL` rules.
///
/// Empty segments are skipped and an empty prefix means the root.
///
/// ```
/// use hierlog::config::parse_level_rules;
/// use hierlog::Level;
///
/// let rules = parse_level_rules("=WARN; app/db=debug;").unwrap();
/// assert_eq!(rules, vec![("".to_string(), Level::Warn), ("app/db".to_string(), Level::Debug)]);
/// ```
pub fn parse_level_rules(text: &str) -> Result<Vec<(String, Level)>> {
    let mut rules = Vec::new();
    for segment in text.split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let (prefix, level) = segment.split_once('=').ok_or_else(|| {
            LoggerError::config("level rules", format!("expected prefix=LEVEL, got '{}'", segment))
        })?;
        let level = level
            .trim()
            .parse::<Level>()
            .map_err(|e| LoggerError::config("level rules", e.to_string()))?;
        rules.push((prefix.trim().to_string(), level));
    }
    Ok(rules)
}

/// Applies rules from environment variable `var`.
///
/// Returns how many rules were applied; an unset variable applies none.
/// Every rule is parsed before the first one is applied, and rules are
/// applied shortest prefix first.
pub fn apply_env_rules(registry: &Registry, var: &str) -> Result<usize> {
    let text = match std::env::var(var) {
        Ok(text) => text,
        Err(std::env::VarError::NotPresent) => return Ok(0),
        Err(e) => return Err(LoggerError::config(var, e.to_string())),
    };
    let mut rules = parse_level_rules(&text)?;
    rules.sort_by_key(|(prefix, _)| prefix.len());
    for (prefix, level) in &rules {
        registry.set_prefix_level(prefix, *level);
    }
    Ok(rules.len())
}
