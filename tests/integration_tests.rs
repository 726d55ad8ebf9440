//! Integration tests for hierlog
//!
//! These tests verify:
//! - Registry identity and prefix resolution through the public API
//! - Live reconfiguration of existing loggers
//! - Sink failure isolation and rate-limited reporting
//! - File output, rotation and config-driven setup

use hierlog::core::{AppendEvent, ErrorReporter, FormatterSlot};
use hierlog::prelude::*;
use hierlog::sinks::rotation::{archive_path, list_archive_suffixes};
use hierlog::sinks::SizeRotater;
use hierlog::{critical, debug, error, info, warn};
use std::fs;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn raw_memory() -> Arc<MemorySink> {
    Arc::new(MemorySink::with_formatter(Arc::new(MessageFormatter)))
}

fn quiet_reporter() -> Arc<ErrorReporter> {
    Arc::new(ErrorReporter::with_writer(Box::new(std::io::sink())).with_window(Duration::ZERO))
}

/// Sink that rejects every write and counts attempts
struct FailingSink {
    attempts: AtomicUsize,
    formatter: FormatterSlot,
}

impl FailingSink {
    fn new() -> Self {
        Self {
            attempts: AtomicUsize::new(0),
            formatter: FormatterSlot::default(),
        }
    }
}

impl Sink for FailingSink {
    fn append(&self, _event: &AppendEvent<'_>) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(LoggerError::sink("failing", "connection reset"))
    }

    fn formatter(&self) -> Arc<dyn Formatter> {
        self.formatter.get()
    }

    fn set_formatter(&self, formatter: Arc<dyn Formatter>) {
        self.formatter.set(formatter);
    }

    fn name(&self) -> &str {
        "failing"
    }
}

#[test]
fn test_identity_and_distinct_names() {
    let registry = Registry::builder().root_sink(raw_memory()).build();
    let names = ["a", "a/b", "a.b", "a::b", "b"];

    let first: Vec<_> = names.iter().map(|n| registry.get_logger(n)).collect();
    let second: Vec<_> = names.iter().map(|n| registry.get_logger(n)).collect();

    for (i, logger) in first.iter().enumerate() {
        assert!(Arc::ptr_eq(logger, &second[i]));
        for other in &first[i + 1..] {
            assert!(!Arc::ptr_eq(logger, other));
        }
    }
}

#[test]
fn test_longest_prefix_resolution() {
    let registry = Registry::builder().root_sink(raw_memory()).build();
    registry.set_prefix_level("a", Level::Error);
    registry.set_prefix_level("a/b", Level::Debug);

    assert_eq!(registry.get_logger("a/b/c").level(), Level::Debug);
    assert_eq!(registry.get_logger("a/c").level(), Level::Error);
    assert_eq!(registry.get_logger("z").level(), Level::Info);
}

#[test]
fn test_prefix_boundaries() {
    let registry = Registry::builder().root_sink(raw_memory()).build();
    registry.set_prefix_level("git", Level::Trace);
    registry.set_prefix_level("github.com", Level::Error);

    assert_eq!(registry.get_logger("github.com/x").level(), Level::Error);
    assert_eq!(registry.get_logger("github.com").level(), Level::Error);
    assert_eq!(registry.get_logger("git/core").level(), Level::Trace);
    assert_eq!(registry.get_logger("gitlab").level(), Level::Info);
}

#[test]
fn test_rust_module_paths_as_names() {
    let registry = Registry::builder().root_sink(raw_memory()).build();
    registry.set_prefix_level("app::net", Level::Trace);

    assert_eq!(registry.get_logger("app::net::tcp").level(), Level::Trace);
    assert_eq!(registry.get_logger("app::network").level(), Level::Info);
}

#[test]
fn test_level_gating_per_sink() {
    let first = raw_memory();
    let second = raw_memory();
    let registry = Registry::builder()
        .root_sinks(vec![first.clone(), second.clone()])
        .build();
    let logger = registry.get_logger("gate");
    logger.set_level(Level::Warn);

    debug!(logger, "no");
    info!(logger, "no");
    warn!(logger, "yes");
    error!(logger, "yes");
    critical!(logger, "yes");

    assert_eq!(first.append_count(), 3);
    assert_eq!(second.append_count(), 3);
}

#[test]
fn test_reconfiguration_reaches_existing_and_new_loggers() {
    let registry = Registry::builder().root_sink(raw_memory()).build();
    let existing = registry.get_logger("x/service");
    assert!(!existing.is_enabled(Level::Debug));

    registry.set_prefix_level("x", Level::Debug);
    assert!(existing.is_enabled(Level::Debug));
    assert_eq!(registry.get_logger("x/later").level(), Level::Debug);

    let audit = raw_memory();
    registry.set_prefix_sinks("x", vec![audit.clone()]);
    existing.info("moved", &[]);
    registry.get_logger("x/later").info("also moved", &[]);
    assert_eq!(audit.lines(), vec!["moved", "also moved"]);
}

#[test]
fn test_latest_rule_wins_for_existing_loggers() {
    let registry = Registry::builder().root_sink(raw_memory()).build();
    registry.set_prefix_level("x/y", Level::Error);
    let deep = registry.get_logger("x/y/z");
    assert_eq!(deep.level(), Level::Error);

    registry.set_prefix_level("x", Level::Debug);
    assert_eq!(deep.level(), Level::Debug);
    assert_eq!(registry.effective_level("x/y/other"), Level::Error);

    registry.set_prefix_level("x/y", Level::Warn);
    assert_eq!(deep.level(), Level::Warn);
}

#[test]
fn test_failing_sink_is_isolated_and_reported() {
    let good = raw_memory();
    let failing = Arc::new(FailingSink::new());
    let reporter = Arc::new(
        ErrorReporter::with_writer(Box::new(std::io::sink()))
            .with_window(Duration::from_secs(3600)),
    );
    let registry = Registry::builder()
        .root_sinks(vec![failing.clone(), good.clone()])
        .reporter(reporter.clone())
        .build();
    let logger = registry.get_logger("isolated");

    for i in 0..20 {
        logger.error("attempt {}", &[&i]);
    }

    assert_eq!(failing.attempts.load(Ordering::SeqCst), 20);
    assert_eq!(good.append_count(), 20);
    assert_eq!(reporter.emitted(), 1);
    assert_eq!(reporter.suppressed(), 19);
    assert_eq!(registry.metrics().append_failures(), 20);
    assert_eq!(registry.metrics().appends(), 20);
    assert_eq!(registry.metrics().records_dispatched(), 20);
}

#[test]
fn test_file_sink_with_pattern() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("app.log");

    let sink = FileSink::new(&path)
        .expect("Failed to create file sink")
        .with_formatter(Arc::new(
            PatternFormatter::new("{Level}|{logger}|{message}\n").unwrap(),
        ));
    let registry = Registry::builder().root_sink(Arc::new(sink)).build();

    let logger = registry.get_logger("svc/db");
    logger.info("rows={}", &[&17]);
    logger.warn("slow query", &[&"1.2s"]);
    registry.flush_all().expect("Failed to flush");

    let content = fs::read_to_string(&path).expect("Failed to read log file");
    assert_eq!(content, "Info|svc/db|rows=17\nWarn|svc/db|slow query 1.2s\n");
}

#[test]
fn test_json_formatter_output() {
    let memory = Arc::new(MemorySink::with_formatter(Arc::new(JsonFormatter)));
    let registry = Registry::builder().root_sink(memory.clone()).build();
    info!(registry.get_logger("json"), "user {} logged in", "alice");

    let line = memory.contents();
    let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
    assert_eq!(value["level"], "INFO");
    assert_eq!(value["logger"], "json");
    assert_eq!(value["message"], "user alice logged in");
    assert_eq!(value["module"], "integration_tests");
    assert_eq!(value["file"], "tests/integration_tests.rs");
}

#[test]
fn test_rotation_through_logger() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("rotating.log");
    let sink = FileSink::new(&path)
        .unwrap()
        .with_formatter(Arc::new(PatternFormatter::new("{message}\n").unwrap()))
        .with_rotater(Box::new(SizeRotater::new(64, 2)))
        .with_reporter(quiet_reporter());
    let registry = Registry::builder().root_sink(Arc::new(sink)).build();
    let logger = registry.get_logger("rotating");

    for i in 0..40 {
        logger.info("message number {}", &[&i]);
    }
    registry.flush_all().unwrap();

    let suffixes = list_archive_suffixes(&path).unwrap();
    assert!(!suffixes.is_empty());

    let mut lines = fs::read_to_string(&path).unwrap().lines().count();
    for suffix in &suffixes {
        lines += fs::read_to_string(archive_path(&path, suffix))
            .unwrap()
            .lines()
            .count();
    }
    assert_eq!(lines, 40);
}

#[test]
fn test_config_document_end_to_end() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_path = temp_dir.path().join("logs/app.log");
    let config_path = temp_dir.path().join("logging.json");

    let document = serde_json::json!({
        "formatters": [
            { "name": "short", "type": "pattern", "pattern": "{LEVEL} {logger} {message}\n" }
        ],
        "sinks": [
            { "name": "app", "type": "file", "path": log_path.to_str().unwrap(), "formatter": "short",
              "rotation": { "type": "size", "size": "1m", "suffix_width": 3 } }
        ],
        "loggers": [
            { "name": "", "level": "ERROR", "sinks": ["app"] },
            { "name": "payments", "level": "DEBUG" }
        ]
    });
    let mut file = fs::File::create(&config_path).unwrap();
    file.write_all(document.to_string().as_bytes()).unwrap();

    let registry = Registry::builder().root_sink(raw_memory()).build();
    LoggingConfig::from_file(&config_path)
        .unwrap()
        .apply(&registry, &BuilderRegistry::with_defaults())
        .unwrap();

    registry.get_logger("payments/card").debug("charged {}", &[&"$5"]);
    registry.get_logger("search").warn("dropped", &[]);
    registry.get_logger("search").error("kept", &[]);
    registry.flush_all().unwrap();

    assert_eq!(
        fs::read_to_string(&log_path).unwrap(),
        "DEBUG payments/card charged $5\nERROR search kept\n"
    );
}
