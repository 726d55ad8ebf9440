//! Process-wide registry and its lifecycle
//!
//! The global registry is created on first use with the built-in defaults
//! (`INFO` to stdout). [`init`] and friends layer configuration on top of
//! it; [`shutdown`] flushes every sink before the process exits.

use crate::config::{self, BuilderRegistry, LoggingConfig};
use crate::core::{Logger, Registry, Result};
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::Arc;

static GLOBAL_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// The process-wide registry
pub fn global() -> &'static Registry {
    &GLOBAL_REGISTRY
}

/// Logger `name` from the global registry
///
/// # Example
///
/// ```
/// let logger = hierlog::get_logger("app/startup");
/// logger.info("booting version {}", &[&env!("CARGO_PKG_VERSION")]);
/// ```
pub fn get_logger(name: &str) -> Arc<Logger> {
    GLOBAL_REGISTRY.get_logger(name)
}

/// Applies `config` to the global registry using the global builders.
///
/// # Errors
///
/// Any problem in the document is returned and nothing is applied.
pub fn init(config: &LoggingConfig) -> Result<()> {
    config.apply(global(), BuilderRegistry::global())
}

/// Loads a JSON config document from `path` and applies it.
pub fn init_from_file(path: impl AsRef<Path>) -> Result<()> {
    init(&LoggingConfig::from_file(path)?)
}

/// Applies `prefix=LEVEL;...` rules from environment variable `var`
/// (usually [`config::ENV_VAR`]). Returns the number of rules applied.
pub fn init_from_env(var: &str) -> Result<usize> {
    config::apply_env_rules(global(), var)
}

/// Flushes every sink the global registry knows about.
pub fn shutdown() -> Result<()> {
    GLOBAL_REGISTRY.flush_all()
}
