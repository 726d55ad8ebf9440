//! Logger registry: one logger per name, configured by prefix rules
//!
//! The registry owns the name -> logger map and two ordered rule lists,
//! one for levels and one for sink lists. A new logger starts from the
//! longest matching rule of each kind. Setting a rule pushes its value to
//! every existing logger under the prefix, so the most recent change wins
//! for loggers that already exist. The registry mutex guards lookups,
//! creation and rule changes only; logging itself never touches it.

use super::{
    diagnostics::ErrorReporter,
    error::Result,
    level::Level,
    logger::{Logger, SinkList},
    metrics::DispatchMetrics,
    prefix::{self, Rule},
    sink::SinkRef,
};
use crate::sinks::ConsoleSink;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Level given to the root rule when none is specified
pub const DEFAULT_LEVEL: Level = Level::Info;

struct RegistryState {
    loggers: HashMap<String, Arc<Logger>>,
    level_rules: Vec<Rule<Level>>,
    sink_rules: Vec<Rule<Arc<SinkList>>>,
}

/// Replaces the rule for exactly `prefix`, or appends a new one.
fn upsert<T>(rules: &mut Vec<Rule<T>>, prefix: &str, value: T) {
    match rules.iter_mut().find(|rule| rule.prefix == prefix) {
        Some(rule) => rule.value = value,
        None => rules.push(Rule::new(prefix, value)),
    }
}

impl RegistryState {
    /// Effective level for `name`. The root rule guarantees a match.
    fn level_for(&self, name: &str) -> Level {
        prefix::longest_match(&self.level_rules, name)
            .map(|rule| rule.value)
            .unwrap_or(DEFAULT_LEVEL)
    }

    fn sinks_for(&self, name: &str) -> Arc<SinkList> {
        prefix::longest_match(&self.sink_rules, name)
            .map(|rule| Arc::clone(&rule.value))
            .unwrap_or_default()
    }

    fn matching(&self, prefix: &str) -> Vec<Arc<Logger>> {
        self.loggers
            .values()
            .filter(|logger| prefix::matches(logger.name(), prefix))
            .cloned()
            .collect()
    }

    /// Gives every existing logger under `prefix` exactly `level`, even one
    /// covered by a longer rule.
    fn apply_level(&self, prefix: &str, level: Level) {
        for logger in self.matching(prefix) {
            logger.set_level(level);
        }
    }

    fn apply_sinks(&self, prefix: &str, sinks: &Arc<SinkList>) {
        for logger in self.matching(prefix) {
            logger.store_sinks(Arc::clone(sinks));
        }
    }
}

/// Process-wide (or test-local) cache of named loggers.
///
/// # Example
///
/// ```
/// use hierlog::{Level, Registry};
///
/// let registry = Registry::new();
/// registry.set_prefix_level("app/db", Level::Debug);
///
/// let db = registry.get_logger("app/db/pool");
/// assert_eq!(db.level(), Level::Debug);
/// assert!(std::sync::Arc::ptr_eq(&db, &registry.get_logger("app/db/pool")));
/// ```
pub struct Registry {
    state: Mutex<RegistryState>,
    reporter: Arc<ErrorReporter>,
    metrics: Arc<DispatchMetrics>,
}

impl Registry {
    /// Registry whose root rules are `Info` and a stdout console sink.
    pub fn new() -> Self {
        Self::builder().build()
    }

    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Returns the logger called `name`, creating it on first use.
    ///
    /// Every call with the same name returns the same instance, including
    /// when several threads ask for a new name at once.
    pub fn get_logger(&self, name: &str) -> Arc<Logger> {
        self.get_or_create(name)
    }

    /// Same as [`Registry::get_logger`]
    pub fn get_or_create(&self, name: &str) -> Arc<Logger> {
        let mut state = self.state.lock();
        if let Some(logger) = state.loggers.get(name) {
            return Arc::clone(logger);
        }

        let logger = Arc::new(Logger::new(
            name,
            state.level_for(name),
            state.sinks_for(name),
            Arc::clone(&self.reporter),
            Arc::clone(&self.metrics),
        ));
        state.loggers.insert(name.to_string(), Arc::clone(&logger));
        logger
    }

    /// Sets the level rule for `prefix` and applies `level` to every
    /// existing logger it covers, including those under a longer rule.
    ///
    /// Loggers created later pick the rule up through the normal
    /// longest-prefix resolution.
    pub fn set_prefix_level(&self, prefix: &str, level: Level) {
        let mut state = self.state.lock();
        upsert(&mut state.level_rules, prefix, level);
        state.apply_level(prefix, level);
    }

    /// Sets the sink-list rule for `prefix` and applies it to every
    /// existing logger it covers.
    pub fn set_prefix_sinks(&self, prefix: &str, sinks: SinkList) {
        let mut state = self.state.lock();
        let sinks = Arc::new(sinks);
        upsert(&mut state.sink_rules, prefix, Arc::clone(&sinks));
        state.apply_sinks(prefix, &sinks);
    }

    /// Adds `sink` to the sink rule for exactly `prefix` and applies the
    /// resulting list to every existing logger under `prefix`.
    ///
    /// If no rule with that prefix exists yet, one is created from the sinks
    /// currently in effect for `prefix` plus the new sink.
    pub fn add_prefix_sink(&self, prefix: &str, sink: SinkRef) {
        let mut state = self.state.lock();
        let existing = state
            .sink_rules
            .iter()
            .position(|rule| rule.prefix == prefix);

        let merged = match existing {
            Some(idx) => {
                let rule = &mut state.sink_rules[idx];
                let mut merged = SinkList::clone(&rule.value);
                merged.push(sink);
                rule.value = Arc::new(merged);
                Arc::clone(&rule.value)
            }
            None => {
                let mut seeded = SinkList::clone(&state.sinks_for(prefix));
                seeded.push(sink);
                let seeded = Arc::new(seeded);
                state.sink_rules.push(Rule::new(prefix, Arc::clone(&seeded)));
                seeded
            }
        };
        state.apply_sinks(prefix, &merged);
    }

    /// Every logger created so far whose name matches `prefix`
    pub fn filter(&self, prefix: &str) -> Vec<Arc<Logger>> {
        self.state.lock().matching(prefix)
    }

    /// Level a logger called `name` has, or would be created with
    pub fn effective_level(&self, name: &str) -> Level {
        self.state.lock().level_for(name)
    }

    /// Sinks a logger called `name` has, or would be created with
    pub fn effective_sinks(&self, name: &str) -> Arc<SinkList> {
        self.state.lock().sinks_for(name)
    }

    pub fn logger_count(&self) -> usize {
        self.state.lock().loggers.len()
    }

    pub fn metrics(&self) -> &DispatchMetrics {
        &self.metrics
    }

    pub fn reporter(&self) -> &Arc<ErrorReporter> {
        &self.reporter
    }

    /// Flushes every distinct sink referenced by a rule or a logger.
    ///
    /// All sinks are attempted; the first error is returned.
    pub fn flush_all(&self) -> Result<()> {
        let sinks = {
            let state = self.state.lock();
            let mut seen: Vec<SinkRef> = Vec::new();
            let lists = state
                .sink_rules
                .iter()
                .map(|rule| Arc::clone(&rule.value))
                .chain(state.loggers.values().map(|logger| logger.sinks()));
            for list in lists {
                for sink in list.iter() {
                    if !seen.iter().any(|s| Arc::ptr_eq(s, sink)) {
                        seen.push(Arc::clone(sink));
                    }
                }
            }
            seen
        };

        let mut first_error = None;
        for sink in sinks {
            if let Err(e) = sink.flush() {
                self.reporter
                    .report(&format!("flushing sink '{}'", sink.name()), &e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Registry")
            .field("loggers", &state.loggers.len())
            .field("level_rules", &state.level_rules.len())
            .field("sink_rules", &state.sink_rules.len())
            .finish()
    }
}

/// Builder for a [`Registry`] with custom root rules
///
/// # Example
/// ```
/// use hierlog::prelude::*;
/// use std::sync::Arc;
///
/// let memory = Arc::new(MemorySink::new());
/// let registry = Registry::builder()
///     .root_level(Level::Debug)
///     .root_sink(memory.clone())
///     .build();
///
/// registry.get_logger("svc").debug("ready", &[]);
/// assert_eq!(memory.append_count(), 1);
/// ```
pub struct RegistryBuilder {
    root_level: Level,
    root_sinks: Option<SinkList>,
    reporter: Option<Arc<ErrorReporter>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            root_level: DEFAULT_LEVEL,
            root_sinks: None,
            reporter: None,
        }
    }

    /// Level of the root (empty prefix) rule
    #[must_use = "builder methods return a new value"]
    pub fn root_level(mut self, level: Level) -> Self {
        self.root_level = level;
        self
    }

    /// Adds a sink to the root rule. Without any, the root rule gets a
    /// stdout console sink.
    #[must_use = "builder methods return a new value"]
    pub fn root_sink(mut self, sink: SinkRef) -> Self {
        self.root_sinks.get_or_insert_with(Vec::new).push(sink);
        self
    }

    /// Replaces the root sink list; an empty list makes the root discard.
    #[must_use = "builder methods return a new value"]
    pub fn root_sinks(mut self, sinks: SinkList) -> Self {
        self.root_sinks = Some(sinks);
        self
    }

    /// Where sink failures are reported (default: the global stderr reporter)
    #[must_use = "builder methods return a new value"]
    pub fn reporter(mut self, reporter: Arc<ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn build(self) -> Registry {
        let root_sinks = self
            .root_sinks
            .unwrap_or_else(|| vec![Arc::new(ConsoleSink::stdout()) as SinkRef]);

        Registry {
            state: Mutex::new(RegistryState {
                loggers: HashMap::new(),
                level_rules: vec![Rule::new("", self.root_level)],
                sink_rules: vec![Rule::new("", Arc::new(root_sinks))],
            }),
            reporter: self.reporter.unwrap_or_else(ErrorReporter::global),
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
