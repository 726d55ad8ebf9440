//! Live reconfiguration example
//!
//! Loads a JSON config document, layers `prefix=LEVEL` environment rules on
//! top and then changes levels and sinks while loggers are in use.
//!
//! Run with: HIERLOG_LEVELS="app/cache=TRACE" cargo run --example reconfigure

use hierlog::config::{apply_env_rules, ENV_VAR};
use hierlog::prelude::*;
use hierlog::{debug, info, trace, warn};
use std::sync::Arc;

const CONFIG: &str = r#"{
    "formatters": [
        { "name": "short", "type": "pattern", "pattern": "{LEVEL} {logger} - {message}\n" }
    ],
    "sinks": [
        { "name": "out", "type": "console", "formatter": "short", "colors": false }
    ],
    "loggers": [
        { "name": "", "level": "INFO", "sinks": ["out"] },
        { "name": "app/db", "level": "WARN" }
    ]
}"#;

fn main() -> Result<()> {
    println!("=== hierlog - Reconfiguration Example ===\n");

    let registry = Registry::builder().root_sinks(Vec::new()).build();
    LoggingConfig::from_json(CONFIG)?.apply(&registry, &BuilderRegistry::with_defaults())?;

    let applied = apply_env_rules(&registry, ENV_VAR)?;
    println!("{} rule(s) taken from {}\n", applied, ENV_VAR);

    let db = registry.get_logger("app/db/pool");
    let cache = registry.get_logger("app/cache");

    println!("1. As configured:");
    info!(db, "checked out connection {} (hidden, app/db is WARN)", 3);
    warn!(db, "pool at {}% capacity", 90);
    trace!(cache, "visible only if {} raised app/cache", ENV_VAR);

    println!("\n2. Lowering app/db to DEBUG reaches the existing logger:");
    registry.set_prefix_level("app/db", Level::Debug);
    debug!(db, "checked out connection {}", 4);

    println!("\n3. Sending app/db to an extra in-memory sink:");
    let audit = Arc::new(MemorySink::with_formatter(Arc::new(JsonFormatter)));
    registry.add_prefix_sink("app/db", audit.clone());
    warn!(db, "slow query took {}ms", 1200);
    info!(cache, "cache still only on the console");
    print!("   captured: {}", audit.contents());

    println!("\n4. Silencing everything under app:");
    registry.set_prefix_level("app", Level::Off);
    warn!(cache, "hidden");
    warn!(db, "hidden as well, the new rule reaches app/db/pool too");
    println!("   app/db/pool is now {}", db.level());
    println!(
        "   a new app/db logger still starts at {}",
        registry.get_logger("app/db/replica").level()
    );

    registry.flush_all()?;
    println!("\n=== Example completed successfully! ===");
    Ok(())
}
