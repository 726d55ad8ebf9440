//! Logging macros.
//!
//! The macros take a logger, a template with `{}` placeholders and the
//! arguments, and record the calling module along with file and line.
//! The arguments are only borrowed; nothing is formatted unless the level
//! is enabled.
//!
//! # Examples
//!
//! ```
//! use hierlog::prelude::*;
//! use hierlog::info;
//!
//! let logger = hierlog::get_logger("server");
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With placeholders
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//!
//! // Extra arguments are appended
//! info!(logger, "User logged in:", "alice", 42);
//! ```

/// Log at an explicit level.
///
/// # Examples
///
/// ```
/// use hierlog::prelude::*;
/// use hierlog::log;
///
/// let logger = hierlog::get_logger("docs/log");
/// log!(logger, Level::Info, "Simple message");
/// log!(logger, Level::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $template:expr $(, $arg:expr)* $(,)?) => {
        $logger.log_at(
            $level,
            ::std::module_path!(),
            $template,
            &[$(&$arg as &dyn ::std::fmt::Display),*],
        )
    };
}

/// Log a trace-level message.
///
/// ```
/// # let logger = hierlog::get_logger("docs/trace");
/// use hierlog::trace;
/// trace!(logger, "Entering function: calculate()");
/// trace!(logger, "Variable value: {}", 42);
/// ```
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log!($logger, $crate::Level::Trace, $($rest)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log!($logger, $crate::Level::Debug, $($rest)+)
    };
}

/// Log an info-level message.
///
/// ```
/// # let logger = hierlog::get_logger("docs/info");
/// use hierlog::info;
/// info!(logger, "Processing {} items", 100);
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log!($logger, $crate::Level::Info, $($rest)+)
    };
}

/// Log a warning-level message.
///
/// ```
/// # let logger = hierlog::get_logger("docs/warn");
/// use hierlog::warn;
/// warn!(logger, "Retry attempt {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log!($logger, $crate::Level::Warn, $($rest)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log!($logger, $crate::Level::Error, $($rest)+)
    };
}

/// Log a critical-level message.
///
/// ```
/// # let logger = hierlog::get_logger("docs/critical");
/// use hierlog::critical;
/// critical!(logger, "Lost quorum, {} of {} nodes reachable", 1, 3);
/// ```
#[macro_export]
macro_rules! critical {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log!($logger, $crate::Level::Critical, $($rest)+)
    };
}

/// The global logger named after the calling module (e.g. `my_app::net`).
///
/// ```
/// let logger = hierlog::module_logger!();
/// assert_eq!(logger.name(), module_path!());
/// ```
#[macro_export]
macro_rules! module_logger {
    () => {
        $crate::get_logger(::std::module_path!())
    };
}
