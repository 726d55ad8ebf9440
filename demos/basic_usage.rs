//! Basic logger usage example
//!
//! Demonstrates named loggers, prefix levels and the logging macros on the
//! console.
//!
//! Run with: cargo run --example basic_usage

use hierlog::prelude::*;
use hierlog::{critical, debug, error, info, trace, warn};
use std::sync::Arc;

fn main() -> Result<()> {
    println!("=== hierlog - Basic Usage Example ===\n");

    let console = Arc::new(
        ConsoleSink::stdout()
            .with_formatter(Arc::new(PatternFormatter::new("[{LEVEL}] {logger}: {message}\n")?)),
    );
    let registry = Registry::builder()
        .root_level(Level::Trace)
        .root_sink(console)
        .build();

    // Log messages at different levels
    println!("1. Logging at different levels:");
    let app = registry.get_logger("app");
    trace!(app, "This is a trace message");
    debug!(app, "This is a debug message");
    info!(app, "This is an info message");
    warn!(app, "This is a warning message");
    error!(app, "This is an error message");
    critical!(app, "This is a critical message");

    println!("\n2. Placeholders and appended arguments:");
    info!(app, "Listening on {}:{}", "0.0.0.0", 8080);
    info!(app, "Extra values are appended:", 1, 2.5, "three");

    println!("\n3. Prefix levels:");
    registry.set_prefix_level("app/db", Level::Warn);
    let pool = registry.get_logger("app/db/pool");
    println!("   app/db set to WARN - info from app/db/pool won't show:");
    info!(pool, "Pool size {} (hidden)", 8);
    warn!(pool, "Pool exhausted after {}ms (visible)", 250);
    info!(registry.get_logger("app/http"), "app/http still at TRACE (visible)");

    println!("\n4. Lazily built messages:");
    let expensive = || format!("checksum {:08x}", 0xdead_beefu32);
    pool.debug_with(expensive); // not evaluated
    pool.error_with(expensive);

    registry.flush_all()?;
    println!("\n=== Example completed successfully! ===");
    Ok(())
}
