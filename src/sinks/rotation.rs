//! Rotation policies and archive housekeeping for [`FileSink`](super::FileSink)
//!
//! A [`Rotater`] only decides *whether* the live file should be rotated
//! before the next write and what suffix the archive gets. The two are
//! separate calls: many writers may see that a rotation is due, but only
//! the one that actually performs it asks for a suffix. Renaming,
//! reopening and swapping the handle is the file sink's job.
//!
//! Archives live next to the live file: `logs/app.log` rotated with suffix
//! `003` becomes `logs/app.003.log` (or `app.003.log.gz` once compressed).

use crate::core::{LoggerError, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Suffix pattern of [`TimeRotater::hourly`]
pub const HOURLY_PATTERN: &str = "%Y-%m-%d-%H";

/// Suffix pattern of [`TimeRotater::daily`]
pub const DAILY_PATTERN: &str = "%Y-%m-%d";

const GZ_EXTENSION: &str = "gz";
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Decides when a file sink rotates.
pub trait Rotater: Send + Sync {
    /// Called by the sink once, before the first write, with the live path
    /// so the rotater can pick up where a previous process left off.
    fn prepare(&self, _path: &Path) {}

    /// Called before every write. `written` is what the live file already
    /// holds, `incoming` the size of the pending write. True when the live
    /// file must be rotated first. Must not change any state.
    fn should_rotate(&self, written: u64, incoming: u64, now: DateTime<Local>) -> bool;

    /// Suffix for the archive about to be created. Called once per
    /// rotation, only by the writer that performs it.
    fn next_suffix(&self, now: DateTime<Local>) -> String;
}

/// Rotates once the live file would grow past `max_bytes`.
///
/// A file that is still empty is never rotated, so a single oversized
/// write still lands somewhere. Archives are numbered with a zero-padded
/// counter that continues after the highest archive already on disk.
#[derive(Debug)]
pub struct SizeRotater {
    max_bytes: u64,
    suffix_width: usize,
    next_index: AtomicU64,
}

impl SizeRotater {
    pub fn new(max_bytes: u64, suffix_width: usize) -> Self {
        Self {
            max_bytes,
            suffix_width,
            next_index: AtomicU64::new(1),
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }
}

impl Rotater for SizeRotater {
    fn prepare(&self, path: &Path) {
        let highest = list_archive_suffixes(path)
            .unwrap_or_default()
            .iter()
            .filter_map(|suffix| suffix.parse::<u64>().ok())
            .max();
        if let Some(highest) = highest {
            self.next_index.store(highest + 1, Ordering::Relaxed);
        }
    }

    fn should_rotate(&self, written: u64, incoming: u64, _now: DateTime<Local>) -> bool {
        written > 0 && written.saturating_add(incoming) > self.max_bytes
    }

    fn next_suffix(&self, _now: DateTime<Local>) -> String {
        let index = self.next_index.fetch_add(1, Ordering::Relaxed);
        format!("{:0width$}", index, width = self.suffix_width)
    }
}

/// Rotates whenever the formatted time period changes.
///
/// The archive suffix is the period that just ended, so with the hourly
/// pattern a file opened at 11:12 is archived as `...2017-05-06-11...` on
/// the first write after noon.
#[derive(Debug)]
pub struct TimeRotater {
    pattern: String,
    current_period: Mutex<String>,
}

impl TimeRotater {
    /// Rotater with a custom strftime `pattern` for the period.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::InvalidConfiguration`] if the pattern is empty
    /// or not a valid strftime format.
    pub fn new(pattern: &str) -> Result<Self> {
        validate_period_pattern(pattern)?;
        Ok(Self::starting_at(pattern, Local::now()))
    }

    pub fn hourly() -> Self {
        Self::starting_at(HOURLY_PATTERN, Local::now())
    }

    pub fn daily() -> Self {
        Self::starting_at(DAILY_PATTERN, Local::now())
    }

    /// Rotater whose current period is the one containing `start`.
    /// `pattern` is trusted to be valid.
    pub fn starting_at(pattern: &str, start: DateTime<Local>) -> Self {
        Self {
            pattern: pattern.to_string(),
            current_period: Mutex::new(start.format(pattern).to_string()),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    fn period(&self, at: DateTime<Local>) -> String {
        at.format(&self.pattern).to_string()
    }
}

impl Rotater for TimeRotater {
    /// An existing live file belongs to the period it was last written in.
    fn prepare(&self, path: &Path) {
        let modified = fs::metadata(path).and_then(|meta| meta.modified());
        if let Ok(modified) = modified {
            *self.current_period.lock() = self.period(DateTime::<Local>::from(modified));
        }
    }

    fn should_rotate(&self, _written: u64, _incoming: u64, now: DateTime<Local>) -> bool {
        *self.current_period.lock() != self.period(now)
    }

    /// Starts the period containing `now` and returns the one that ended.
    fn next_suffix(&self, now: DateTime<Local>) -> String {
        std::mem::replace(&mut *self.current_period.lock(), self.period(now))
    }
}

fn validate_period_pattern(pattern: &str) -> Result<()> {
    if pattern.is_empty() {
        return Err(LoggerError::config("time rotater", "pattern must not be empty"));
    }
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(LoggerError::config(
            "time rotater",
            format!("invalid time pattern '{}'", pattern),
        ));
    }
    Ok(())
}

/// Parses a byte size such as `"512"`, `"10k"`, `"1.5M"` or `"2g"`.
///
/// Suffixes `k`, `m`, `g` and `t` are binary multiples and case-insensitive;
/// with a suffix the number may be fractional.
///
/// ```
/// use hierlog::sinks::rotation::parse_size;
///
/// assert_eq!(parse_size("1.5k").unwrap(), 1536);
/// assert_eq!(parse_size("10M").unwrap(), 10 * 1024 * 1024);
/// assert!(parse_size("ten").is_err());
/// ```
pub fn parse_size(text: &str) -> Result<u64> {
    let text = text.trim();
    let invalid = || LoggerError::config("size", format!("invalid size '{}'", text));

    let last = text.chars().last().ok_or_else(invalid)?;
    let multiplier: u64 = match last.to_ascii_lowercase() {
        'k' => 1 << 10,
        'm' => 1 << 20,
        'g' => 1 << 30,
        't' => 1 << 40,
        _ => return text.parse::<u64>().map_err(|_| invalid()),
    };

    let number = &text[..text.len() - last.len_utf8()];
    let value: f64 = number.trim().parse().map_err(|_| invalid())?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid());
    }
    Ok((value * multiplier as f64) as u64)
}

/// Splits `logs/app.log` into (`logs`, `app`, `Some("log")`).
fn split_base(base: &Path) -> (PathBuf, String, Option<String>) {
    let dir = base
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = base
        .extension()
        .map(|e| e.to_string_lossy().into_owned());
    (dir, stem, extension)
}

/// Path an archive with `suffix` gets: `dir/stem.<suffix>.ext`, or
/// `dir/name.<suffix>` when the live file has no extension.
pub fn archive_path(base: &Path, suffix: &str) -> PathBuf {
    let (dir, stem, extension) = split_base(base);
    let name = match extension {
        Some(ext) => format!("{}.{}.{}", stem, suffix, ext),
        None => format!("{}.{}", stem, suffix),
    };
    dir.join(name)
}

/// Suffixes of the archives that exist for `base`, sorted and deduplicated.
///
/// The live file and compressed copies of it are ignored, and `x` and
/// `x.gz` count as one archive.
pub fn list_archive_suffixes(base: &Path) -> io::Result<Vec<String>> {
    let (dir, stem, extension) = split_base(base);
    let live_name = base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let head = format!("{}.", stem);
    let tail = extension.map(|ext| format!(".{}", ext)).unwrap_or_default();

    let read_dir = if dir.as_os_str().is_empty() {
        fs::read_dir(".")?
    } else {
        fs::read_dir(&dir)?
    };

    let mut suffixes = BTreeSet::new();
    for entry in read_dir {
        let name = entry?.file_name().to_string_lossy().into_owned();
        let name = name
            .strip_suffix(".gz")
            .map(str::to_string)
            .unwrap_or(name);
        if name == live_name {
            continue;
        }
        let suffix = name
            .strip_prefix(&head)
            .and_then(|rest| rest.strip_suffix(tail.as_str()));
        if let Some(suffix) = suffix {
            if !suffix.is_empty() {
                suffixes.insert(suffix.to_string());
            }
        }
    }
    Ok(suffixes.into_iter().collect())
}

/// Gzips `path` into `path.gz` and removes the original.
///
/// The compressed data goes to a temporary file first and the original is
/// only removed once the archive is complete.
pub fn compress_archive(path: &Path) -> Result<PathBuf> {
    let mut gz_name = path.as_os_str().to_owned();
    gz_name.push(".");
    gz_name.push(GZ_EXTENSION);
    let gz_path = PathBuf::from(gz_name);
    let mut temp_name = gz_path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let compress = || -> io::Result<()> {
        let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, File::open(path)?);
        let output = BufWriter::with_capacity(COPY_BUFFER_SIZE, File::create(&temp_path)?);
        let mut encoder = flate2::write::GzEncoder::new(output, flate2::Compression::default());

        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
        loop {
            let read = reader.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            encoder.write_all(&buffer[..read])?;
        }
        encoder.finish()?.flush()?;
        fs::rename(&temp_path, &gz_path)
    };

    if let Err(e) = compress() {
        let _ = fs::remove_file(&temp_path);
        return Err(LoggerError::io_operation(
            "compressing archive",
            format!("{}: {}", path.display(), e),
            e,
        ));
    }

    // The archive is complete; a leftover original is only untidy.
    let _ = fs::remove_file(path);
    Ok(gz_path)
}

/// Deletes the oldest archives of `base` until at most `keep` remain.
///
/// Archives are ordered by suffix, which sorts chronologically for both
/// zero-padded counters and time periods. Returns how many were removed.
pub fn prune_archives(base: &Path, keep: usize) -> Result<usize> {
    let suffixes = list_archive_suffixes(base).map_err(|e| {
        LoggerError::file_rotation(base.display().to_string(), format!("listing archives: {}", e))
    })?;
    if suffixes.len() <= keep {
        return Ok(0);
    }

    let excess = suffixes.len() - keep;
    for suffix in &suffixes[..excess] {
        let plain = archive_path(base, suffix);
        let mut gz = plain.as_os_str().to_owned();
        gz.push(".gz");
        for candidate in [plain.clone(), PathBuf::from(gz)] {
            match fs::remove_file(&candidate) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(LoggerError::file_rotation(
                        candidate.display().to_string(),
                        format!("removing old archive: {}", e),
                    ))
                }
            }
        }
    }
    Ok(excess)
}
