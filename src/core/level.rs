//! Log level definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use super::error::LoggerError;

/// Severity of a log event, ordered from most to least verbose.
///
/// `Off` sorts above every real level, so a logger set to `Off` emits nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum Level {
    Trace = 0,
    Debug = 1,
    #[default]
    Info = 2,
    Warn = 3,
    Error = 4,
    Critical = 5,
    Off = 6,
}

impl Level {
    /// Every level that can be attached to an event, in ascending order.
    pub const EMITTABLE: [Level; 6] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Critical,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
            Level::Off => "OFF",
        }
    }

    /// Capitalized form, used by the `{Level}` pattern token
    pub fn title_name(&self) -> &'static str {
        match self {
            Level::Trace => "Trace",
            Level::Debug => "Debug",
            Level::Info => "Info",
            Level::Warn => "Warn",
            Level::Error => "Error",
            Level::Critical => "Critical",
            Level::Off => "Off",
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Inverse of [`Level::as_u8`]; out-of-range values saturate to `Off`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            5 => Level::Critical,
            _ => Level::Off,
        }
    }

    #[cfg(feature = "console")]
    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            Level::Trace => BrightBlack,
            Level::Debug => Blue,
            Level::Info => Green,
            Level::Warn => Yellow,
            Level::Error => Red,
            Level::Critical | Level::Off => BrightRed,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Level {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TRACE" => Ok(Level::Trace),
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARN" | "WARNING" => Ok(Level::Warn),
            "ERROR" => Ok(Level::Error),
            "CRITICAL" | "FATAL" => Ok(Level::Critical),
            "OFF" => Ok(Level::Off),
            _ => Err(LoggerError::InvalidLevel(s.to_string())),
        }
    }
}

/// A [`Level`] that can be read and replaced concurrently without locking.
#[derive(Debug)]
pub struct AtomicLevel(AtomicU8);

impl AtomicLevel {
    pub const fn new(level: Level) -> Self {
        Self(AtomicU8::new(level as u8))
    }

    #[inline]
    pub fn load(&self) -> Level {
        Level::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn store(&self, level: Level) {
        self.0.store(level.as_u8(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Error < Level::Critical);
        for level in Level::EMITTABLE {
            assert!(level < Level::Off);
        }
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("warning".parse::<Level>().unwrap(), Level::Warn);
        assert_eq!("Fatal".parse::<Level>().unwrap(), Level::Critical);
        assert_eq!(" off ".parse::<Level>().unwrap(), Level::Off);
        assert!(matches!(
            "verbose".parse::<Level>(),
            Err(LoggerError::InvalidLevel(_))
        ));
    }

    #[test]
    fn test_display_padding() {
        assert_eq!(format!("{:5}|", Level::Info), "INFO |");
        assert_eq!(Level::Critical.title_name(), "Critical");
    }

    #[test]
    fn test_atomic_level_swap() {
        let level = AtomicLevel::new(Level::Info);
        assert_eq!(level.load(), Level::Info);
        level.store(Level::Off);
        assert_eq!(level.load(), Level::Off);
        assert_eq!(Level::from_u8(200), Level::Off);
    }
}
