//! File sink with optional rotation
//!
//! The open file lives behind a [`SwapCell`], so appends never wait for a
//! rotation and a rotation never waits for appends. Rotating is:
//!
//! 1. rename the live file to its archive name
//! 2. open a fresh file at the original path
//! 3. compare-and-swap the fresh handle in for the one that was checked
//! 4. on success, flush and retire the old handle; on failure, drop the
//!    fresh handle and rename the archive back
//!
//! Only one thread renames at a time, and only that thread asks the
//! rotater for a suffix. A writer that finds a rotation already running
//! skips its own and writes to whichever file is live.
//!
//! A write that loaded the old handle before the swap still completes
//! into the archived file. Compression and pruning of a retired
//! generation therefore wait until its last handle is dropped.

use super::rotation::{archive_path, compress_archive, prune_archives, Rotater};
use crate::core::{
    AppendEvent, ErrorReporter, Formatter, FormatterSlot, LoggerError, Result, Sink, SwapCell,
};
use chrono::Local;
use parking_lot::Mutex;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Housekeeping owed by a generation that has been rotated out
struct Retirement {
    archive: PathBuf,
    compress: bool,
    /// Live path and how many archives of it to keep
    prune: Option<(PathBuf, usize)>,
    reporter: Arc<ErrorReporter>,
}

impl Retirement {
    /// Failures are reported, not returned.
    fn run(self) {
        if self.compress {
            match compress_archive(&self.archive) {
                Ok(_) => {}
                // Already pruned by a later generation
                Err(LoggerError::IoOperation { source, .. })
                    if source.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    self.reporter
                        .report(&format!("compressing {}", self.archive.display()), &e);
                }
            }
        }
        if let Some((base, keep)) = &self.prune {
            if let Err(e) = prune_archives(base, *keep) {
                self.reporter
                    .report(&format!("pruning archives of {}", base.display()), &e);
            }
        }
    }
}

/// One opened generation of the live file
struct ActiveFile {
    writer: Mutex<BufWriter<File>>,
    written: AtomicU64,
    records: AtomicU64,
    retirement: Mutex<Option<Retirement>>,
}

impl ActiveFile {
    fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    LoggerError::io_operation(
                        "creating log directory",
                        format!("{}: {}", parent.display(), e),
                        e,
                    )
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                LoggerError::io_operation(
                    "opening log file",
                    format!("{}: {}", path.display(), e),
                    e,
                )
            })?;
        let written = file.metadata().map(|meta| meta.len()).unwrap_or(0);

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            written: AtomicU64::new(written),
            records: AtomicU64::new(0),
            retirement: Mutex::new(None),
        })
    }

    fn write(&self, bytes: &[u8]) -> std::io::Result<()> {
        self.writer.lock().write_all(bytes)?;
        self.written.fetch_add(bytes.len() as u64, Ordering::Relaxed);
        self.records.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn flush(&self) -> std::io::Result<()> {
        self.writer.lock().flush()
    }

    fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Schedules `retirement` for when the last handle goes away.
    fn retire(&self, retirement: Retirement) {
        *self.retirement.lock() = Some(retirement);
    }
}

impl Drop for ActiveFile {
    fn drop(&mut self) {
        let flushed = self.writer.get_mut().flush();
        if let Some(retirement) = self.retirement.get_mut().take() {
            if let Err(e) = flushed {
                retirement
                    .reporter
                    .report(&format!("flushing {}", retirement.archive.display()), &e);
            }
            retirement.run();
        }
    }
}

/// Appends rendered events to a file, rotating it when its [`Rotater`] says so.
///
/// # Example
///
/// ```no_run
/// use hierlog::sinks::{FileSink, SizeRotater};
///
/// let sink = FileSink::new("logs/app.log")?
///     .with_rotater(Box::new(SizeRotater::new(10 * 1024 * 1024, 3)))
///     .with_compression(true)
///     .with_max_archives(5);
/// # Ok::<(), hierlog::LoggerError>(())
/// ```
pub struct FileSink {
    path: PathBuf,
    current: SwapCell<ActiveFile>,
    rotating: Mutex<()>,
    rotater: Option<Box<dyn Rotater>>,
    compress: bool,
    max_archives: Option<usize>,
    formatter: FormatterSlot,
    reporter: Arc<ErrorReporter>,
}

impl FileSink {
    /// Opens (or creates) `path` for appending, creating parent directories.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let active = ActiveFile::open(&path)?;
        Ok(Self {
            path,
            current: SwapCell::new(Arc::new(active)),
            rotating: Mutex::new(()),
            rotater: None,
            compress: false,
            max_archives: None,
            formatter: FormatterSlot::default(),
            reporter: ErrorReporter::global(),
        })
    }

    #[must_use]
    pub fn with_rotater(mut self, rotater: Box<dyn Rotater>) -> Self {
        rotater.prepare(&self.path);
        self.rotater = Some(rotater);
        self
    }

    /// Gzip each archive right after it is rotated out
    #[must_use]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    /// Keep at most `count` archives, deleting the oldest
    #[must_use]
    pub fn with_max_archives(mut self, count: usize) -> Self {
        self.max_archives = Some(count);
        self
    }

    #[must_use]
    pub fn with_formatter(self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter.set(formatter);
        self
    }

    /// Where rotation failures are reported
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes in the live file, including what is still buffered
    pub fn current_size(&self) -> u64 {
        self.current.load().written()
    }

    /// Records written to the live file since it was opened
    pub fn current_records(&self) -> u64 {
        self.current.load().records.load(Ordering::Relaxed)
    }

    /// Rotates away from `active` into an archive named by `suffix`.
    ///
    /// Does nothing if another rotation is running or `active` is no longer
    /// the live file; `suffix` is only called once neither is the case.
    fn rotate(&self, active: &Arc<ActiveFile>, suffix: impl FnOnce() -> String) -> Result<()> {
        let Some(_guard) = self.rotating.try_lock() else {
            return Ok(());
        };
        if !Arc::ptr_eq(&self.current.load(), active) {
            return Ok(());
        }

        let archive = archive_path(&self.path, &suffix());
        if archive.exists() {
            return Err(LoggerError::file_rotation(
                self.path.display().to_string(),
                format!("archive {} already exists", archive.display()),
            ));
        }
        fs::rename(&self.path, &archive).map_err(|e| {
            LoggerError::file_rotation(
                self.path.display().to_string(),
                format!("renaming to {}: {}", archive.display(), e),
            )
        })?;

        let fresh = match ActiveFile::open(&self.path) {
            Ok(fresh) => Arc::new(fresh),
            Err(e) => {
                let _ = fs::rename(&archive, &self.path);
                return Err(LoggerError::file_rotation(
                    self.path.display().to_string(),
                    e.to_string(),
                ));
            }
        };

        match self.current.compare_and_swap(active, fresh) {
            Ok(old) => {
                // The fresh file is live either way
                if let Err(e) = old.flush() {
                    self.reporter
                        .report(&format!("flushing {}", archive.display()), &e);
                }
                old.retire(Retirement {
                    archive,
                    compress: self.compress,
                    prune: self.max_archives.map(|keep| (self.path.clone(), keep)),
                    reporter: Arc::clone(&self.reporter),
                });
                Ok(())
            }
            Err(fresh) => {
                // Another rotation won; undo ours.
                drop(fresh);
                let _ = fs::rename(&archive, &self.path);
                Ok(())
            }
        }
    }
}

impl Sink for FileSink {
    fn append(&self, event: &AppendEvent<'_>) -> Result<()> {
        let bytes = event.text.as_bytes();
        let mut active = self.current.load();

        if let Some(rotater) = &self.rotater {
            let now = Local::now();
            if rotater.should_rotate(active.written(), bytes.len() as u64, now) {
                if let Err(e) = self.rotate(&active, || rotater.next_suffix(now)) {
                    self.reporter
                        .report(&format!("rotating {}", self.path.display()), &e);
                }
                active = self.current.load();
            }
        }

        active.write(bytes).map_err(|e| {
            LoggerError::io_operation(
                "writing log file",
                format!("{}: {}", self.path.display(), e),
                e,
            )
        })
    }

    fn formatter(&self) -> Arc<dyn Formatter> {
        self.formatter.get()
    }

    fn set_formatter(&self, formatter: Arc<dyn Formatter>) {
        self.formatter.set(formatter);
    }

    fn flush(&self) -> Result<()> {
        self.current.load().flush().map_err(|e| {
            LoggerError::io_operation(
                "flushing log file",
                format!("{}: {}", self.path.display(), e),
                e,
            )
        })
    }

    fn name(&self) -> &str {
        "file"
    }
}

impl fmt::Debug for FileSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSink")
            .field("path", &self.path)
            .field("rotating", &self.rotater.is_some())
            .field("compress", &self.compress)
            .field("max_archives", &self.max_archives)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Level, PatternFormatter};
    use crate::sinks::rotation::{list_archive_suffixes, SizeRotater};
    use std::io::Read;
    use std::time::Duration;
    use tempfile::TempDir;

    fn quiet_reporter() -> Arc<ErrorReporter> {
        Arc::new(ErrorReporter::with_writer(Box::new(std::io::sink())).with_window(Duration::ZERO))
    }

    fn line_sink(path: &Path) -> FileSink {
        FileSink::new(path)
            .unwrap()
            .with_formatter(Arc::new(PatternFormatter::new("{message}\n").unwrap()))
            .with_reporter(quiet_reporter())
    }

    fn write_line(sink: &FileSink, text: &str) {
        sink.append(&AppendEvent::new("t", Level::Info, format!("{}\n", text)))
            .unwrap();
    }

    fn count_lines(path: &Path) -> usize {
        fs::read_to_string(path).unwrap().lines().count()
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("multi/path/test_file.log");
        let sink = line_sink(&path);
        write_line(&sink, "This is a test");
        sink.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "This is a test\n");
        assert_eq!(sink.current_records(), 1);
    }

    #[test]
    fn test_appends_to_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "old\n").unwrap();

        let sink = line_sink(&path);
        assert_eq!(sink.current_size(), 4);
        write_line(&sink, "new");
        sink.flush().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "old\nnew\n");
    }

    #[test]
    fn test_size_rotation_keeps_every_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let sink = line_sink(&path).with_rotater(Box::new(SizeRotater::new(30, 3)));

        for i in 0..10 {
            write_line(&sink, &format!("line {:04}", i)); // 10 bytes each
        }
        sink.flush().unwrap();

        let suffixes = list_archive_suffixes(&path).unwrap();
        assert_eq!(suffixes, vec!["001", "002", "003"]);

        let mut total = count_lines(&path);
        for suffix in &suffixes {
            let archive = archive_path(&path, suffix);
            assert_eq!(count_lines(&archive), 3);
            total += count_lines(&archive);
        }
        assert_eq!(total, 10);
        assert_eq!(fs::read_to_string(&path).unwrap(), "line 0009\n");
    }

    /// Always asks for the same archive name
    struct FixedRotater;

    impl Rotater for FixedRotater {
        fn should_rotate(&self, written: u64, _incoming: u64, _now: chrono::DateTime<Local>) -> bool {
            written > 0
        }

        fn next_suffix(&self, _now: chrono::DateTime<Local>) -> String {
            "blocked".to_string()
        }
    }

    #[test]
    fn test_rotation_failure_keeps_current_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        fs::create_dir(dir.path().join("app.blocked.log")).unwrap();

        let reporter = quiet_reporter();
        let sink = line_sink(&path)
            .with_rotater(Box::new(FixedRotater))
            .with_reporter(reporter.clone());

        write_line(&sink, "first");
        write_line(&sink, "second");
        sink.flush().unwrap();

        assert_eq!(reporter.emitted(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_compression_and_retention() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let sink = line_sink(&path)
            .with_rotater(Box::new(SizeRotater::new(1, 2)))
            .with_compression(true)
            .with_max_archives(2);

        for i in 0..5 {
            write_line(&sink, &format!("entry {}", i));
        }
        sink.flush().unwrap();

        assert_eq!(list_archive_suffixes(&path).unwrap(), vec!["03", "04"]);
        assert!(dir.path().join("app.04.log.gz").exists());
        assert!(!dir.path().join("app.04.log").exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), "entry 4\n");
    }

    #[test]
    fn test_compression_waits_for_last_writer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let sink = line_sink(&path).with_compression(true);
        write_line(&sink, "early");

        let straggler = sink.current.load();
        sink.rotate(&straggler, || "001".to_string()).unwrap();
        let plain = archive_path(&path, "001");
        let gz = dir.path().join("app.001.log.gz");
        assert!(plain.exists());
        assert!(!gz.exists());

        straggler.write(b"late\n").unwrap();
        write_line(&sink, "fresh");
        drop(straggler);

        assert!(!plain.exists());
        let mut decoded = String::new();
        flate2::read::GzDecoder::new(File::open(&gz).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "early\nlate\n");

        sink.flush().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh\n");
    }

    #[test]
    fn test_skipped_rotation_takes_no_suffix() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let sink = line_sink(&path);
        write_line(&sink, "x");

        let active = sink.current.load();
        let held = sink.rotating.lock();
        sink.rotate(&active, || unreachable!("rotation already in progress"))
            .unwrap();
        drop(held);

        assert!(list_archive_suffixes(&path).unwrap().is_empty());
    }

    #[test]
    fn test_size_rotation_numbers_archives_without_gaps() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let sink = line_sink(&path).with_rotater(Box::new(SizeRotater::new(10, 2)));

        // Each line fills the file, so every later write wants a rotation
        let stale = sink.current.load();
        write_line(&sink, "line 0000");
        for i in 1..4 {
            write_line(&sink, &format!("line {:04}", i));
            // A write through an old handle sees a full file but rotates nothing
            sink.rotate(&stale, || unreachable!("stale handle")).unwrap();
        }
        sink.flush().unwrap();

        assert_eq!(list_archive_suffixes(&path).unwrap(), vec!["01", "02", "03"]);
    }

    #[test]
    fn test_stale_handle_does_not_rotate_twice() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let sink = line_sink(&path);
        write_line(&sink, "before");

        let stale = sink.current.load();
        sink.rotate(&stale, || "a".to_string()).unwrap();
        sink.rotate(&stale, || unreachable!("stale handle must not take a suffix"))
            .unwrap();
        write_line(&sink, "after");
        sink.flush().unwrap();

        assert_eq!(list_archive_suffixes(&path).unwrap(), vec!["a"]);
        assert_eq!(fs::read_to_string(archive_path(&path, "a")).unwrap(), "before\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "after\n");
    }
}
