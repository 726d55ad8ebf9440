//! File logging example
//!
//! Writes to a size-rotated file with gzip-compressed archives and a
//! retention limit, then lists what ended up on disk.
//!
//! Run with: cargo run --example file_logging

use hierlog::prelude::*;
use hierlog::sinks::SizeRotater;
use hierlog::{info, warn};
use std::fs;
use std::sync::Arc;

fn main() -> Result<()> {
    println!("=== hierlog - File Logging Example ===\n");

    let dir = std::env::temp_dir().join("hierlog_file_logging");
    let _ = fs::remove_dir_all(&dir);
    let path = dir.join("app.log");

    let file = FileSink::new(&path)?
        .with_formatter(Arc::new(PatternFormatter::new(
            "{time|%H:%M:%S%.3f} {LEVEL} {logger} {file}:{line} {message}\n",
        )?))
        .with_rotater(Box::new(SizeRotater::new(4 * 1024, 3)))
        .with_compression(true)
        .with_max_archives(3);
    let registry = Registry::builder().root_sink(Arc::new(file)).build();

    let orders = registry.get_logger("shop/orders");
    let payments = registry.get_logger("shop/payments");
    for i in 0..200 {
        info!(orders, "order {} accepted", i);
        if i % 25 == 0 {
            warn!(payments, "payment {} needs review", i);
        }
    }
    registry.flush_all()?;

    println!("Files in {}:", dir.display());
    let mut entries: Vec<_> = fs::read_dir(&dir)
        .map_err(|e| LoggerError::io_operation("listing log directory", dir.display().to_string(), e))?
        .filter_map(|entry| entry.ok())
        .collect();
    entries.sort_by_key(|entry| entry.file_name());
    for entry in entries {
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        println!("   {:<24} {:>6} bytes", entry.file_name().to_string_lossy(), size);
    }

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
