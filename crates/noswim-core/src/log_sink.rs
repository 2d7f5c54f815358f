//! Session event log.
//!
//! Every entry goes to two places: a durable [`LogStore`] (normally a
//! `NoSwimLog_<yyyyMMdd_HHmmss>.txt` file) that keeps the whole session, and
//! a bounded in-memory view for display. When the view grows past its
//! character ceiling the oldest entries are dropped until it is at most half
//! the ceiling, and a truncation marker is shown in front. The durable store
//! is never truncated.
//!
//! Store write failures are reported through `tracing` and swallowed;
//! logging never interrupts monitoring.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Local, NaiveDateTime};

/// Shown in front of the view after old entries were dropped.
pub const TRUNCATION_MARKER: &str = "--- Log Truncated (full log in file) ---\n";

/// Shown in front of the view after a user clear.
pub const CLEARED_MARKER: &str = "--- Log Cleared (UI Only) ---\n";

/// Timestamp format of every log line.
const TIMESTAMP_FORMAT: &str = "%H:%M:%S%.3f";

/// Append-only destination for formatted log lines.
pub trait LogStore: Send {
    /// Appends one line. `line` carries no trailing newline.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error; the sink logs and discards it.
    fn append_line(&mut self, line: &str) -> io::Result<()>;

    /// Location of the store on disk, if it has one.
    fn path(&self) -> Option<&Path>;
}

/// Session log file opened in append mode.
#[derive(Debug)]
pub struct FileLogStore {
    path: PathBuf,
    file: File,
}

impl FileLogStore {
    /// Creates `directory` if needed and opens a new session file in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub fn create(directory: &Path, started_at: DateTime<Local>) -> io::Result<Self> {
        std::fs::create_dir_all(directory)?;
        let path = directory.join(session_file_name(started_at));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }
}

impl LogStore for FileLogStore {
    fn append_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.file, "{line}")
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Store that keeps lines in memory; shares its buffer with clones.
///
/// Can be told to fail, to exercise the sink's error containment.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryLogStore {
    lines: Arc<Mutex<Vec<String>>>,
    failing: bool,
}

#[cfg(test)]
impl MemoryLogStore {
    /// A store whose every write fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            lines: Arc::default(),
            failing: true,
        }
    }

    /// Lines written so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
impl LogStore for MemoryLogStore {
    fn append_line(&mut self, line: &str) -> io::Result<()> {
        if self.failing {
            return Err(io::Error::other("store unavailable"));
        }
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
        Ok(())
    }

    fn path(&self) -> Option<&Path> {
        None
    }
}

/// File name for a session started at `started_at`.
#[must_use]
pub fn session_file_name(started_at: DateTime<Local>) -> String {
    format!("NoSwimLog_{}.txt", started_at.format("%Y%m%d_%H%M%S"))
}

/// One timestamped log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// `HH:MM:SS.mmm` local time.
    pub timestamp: String,
    /// Message text, possibly multi-line.
    pub message: String,
}

impl LogEntry {
    fn render(&self) -> String {
        format!("[{}] {}", self.timestamp, self.message)
    }

    /// Characters this entry occupies in the view, newline included.
    fn view_len(&self) -> usize {
        self.timestamp.chars().count() + self.message.chars().count() + 4
    }
}

/// Local wall-clock time for the next entry, held at `last` when the
/// clock reads earlier. Wall time steps back on a DST fall-back even though
/// the instant keeps moving forward.
fn not_before(last: Option<NaiveDateTime>, now: NaiveDateTime) -> NaiveDateTime {
    match last {
        Some(last) if last > now => last,
        _ => now,
    }
}

struct Inner {
    store: Option<Box<dyn LogStore>>,
    view: VecDeque<LogEntry>,
    view_chars: usize,
    ceiling: usize,
    banner: Option<&'static str>,
    last_timestamp: Option<NaiveDateTime>,
    write_failures: u64,
}

impl Inner {
    fn next_timestamp(&mut self) -> NaiveDateTime {
        let stamp = not_before(self.last_timestamp, Local::now().naive_local());
        self.last_timestamp = Some(stamp);
        stamp
    }

    fn push_view(&mut self, entry: LogEntry) {
        self.view_chars += entry.view_len();
        self.view.push_back(entry);
        if self.view_chars <= self.ceiling {
            return;
        }

        let target = self.ceiling / 2;
        while self.view_chars > target && self.view.len() > 1 {
            if let Some(dropped) = self.view.pop_front() {
                self.view_chars -= dropped.view_len();
            }
        }
        if self.view_chars > target {
            if let Some(last) = self.view.back_mut() {
                let keep = target.saturating_sub(last.timestamp.chars().count() + 4);
                let skip = last.message.chars().count().saturating_sub(keep);
                last.message = last.message.chars().skip(skip).collect();
                self.view_chars = last.view_len();
            }
        }
        self.banner = Some(TRUNCATION_MARKER);
    }
}

/// Cloneable handle to the session log.
#[derive(Clone)]
pub struct LogSink {
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("LogSink")
            .field("path", &inner.store.as_ref().and_then(|s| s.path()))
            .field("view_entries", &inner.view.len())
            .field("ceiling", &inner.ceiling)
            .finish()
    }
}

impl LogSink {
    /// Creates a sink writing to `store` with a view of `ceiling` characters.
    pub fn new(store: impl LogStore + 'static, ceiling: usize) -> Self {
        Self::with_store(Some(Box::new(store)), ceiling)
    }

    /// Creates a sink with no durable store.
    #[must_use]
    pub fn view_only(ceiling: usize) -> Self {
        Self::with_store(None, ceiling)
    }

    /// Opens a new session file under `directory`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session file cannot be created.
    pub fn open(directory: &Path, ceiling: usize) -> io::Result<Self> {
        let store = FileLogStore::create(directory, Local::now())?;
        Ok(Self::new(store, ceiling))
    }

    fn with_store(store: Option<Box<dyn LogStore>>, ceiling: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                store,
                view: VecDeque::new(),
                view_chars: 0,
                ceiling,
                banner: None,
                last_timestamp: None,
                write_failures: 0,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records one message.
    pub fn append(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        let mut guard = self.lock();
        let inner = &mut *guard;
        let entry = LogEntry {
            timestamp: inner.next_timestamp().format(TIMESTAMP_FORMAT).to_string(),
            message: message.to_string(),
        };

        if let Some(store) = inner.store.as_mut() {
            if let Err(e) = store.append_line(&entry.render()) {
                tracing::error!(
                    error = %e,
                    path = ?store.path(),
                    "Failed to write session log entry"
                );
                inner.write_failures += 1;
            }
        }
        tracing::info!(target: "noswim::session", "{message}");

        inner.push_view(entry);
    }

    /// Writes the lines that open every session.
    pub fn write_session_header(&self) {
        self.append("=== NO-SWIM ZONE CHECKER ===");
        self.append("Application Initialized");
        match self.file_path() {
            Some(path) => {
                self.append(format!("Log file: {}", path.display()));
                if let Some(dir) = path.parent() {
                    self.append(format!("Log directory: {}", dir.display()));
                }
            }
            None => self.append("Log file: (none, view only)"),
        }
    }

    /// Rendered in-memory view.
    #[must_use]
    pub fn contents(&self) -> String {
        let inner = self.lock();
        let mut out = String::with_capacity(inner.view_chars + TRUNCATION_MARKER.len());
        if let Some(banner) = inner.banner {
            out.push_str(banner);
        }
        for entry in &inner.view {
            out.push_str(&entry.render());
            out.push('\n');
        }
        out
    }

    /// Entries currently in the view, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().view.iter().cloned().collect()
    }

    /// Path of the durable session file, if any.
    #[must_use]
    pub fn file_path(&self) -> Option<PathBuf> {
        self.lock()
            .store
            .as_ref()
            .and_then(|s| s.path().map(Path::to_path_buf))
    }

    /// Durable writes that failed so far.
    #[must_use]
    pub fn write_failures(&self) -> u64 {
        self.lock().write_failures
    }

    /// Empties the view only. The durable store keeps everything.
    pub fn clear(&self) {
        {
            let mut inner = self.lock();
            inner.view.clear();
            inner.view_chars = 0;
            inner.banner = Some(CLEARED_MARKER);
        }
        self.append("User cleared UI log (file log continues)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_entry_format() {
        let store = MemoryLogStore::default();
        let sink = LogSink::new(store.clone(), 8000);
        sink.append("hello");

        let lines = store.lines();
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        // [HH:MM:SS.mmm] hello
        assert_eq!(line.len(), "[00:00:00.000] hello".len());
        assert!(line.starts_with('['));
        assert_eq!(&line[3..4], ":");
        assert_eq!(&line[9..10], ".");
        assert!(line.ends_with("] hello"));
        assert_eq!(sink.contents(), format!("{line}\n"));
    }

    #[test]
    fn test_timestamps_never_go_backwards() {
        let sink = LogSink::view_only(8000);
        let ahead = Local::now().naive_local() + chrono::Duration::seconds(30);
        sink.lock().last_timestamp = Some(ahead);

        sink.append("after a clock step back");
        assert_eq!(
            sink.entries()[0].timestamp,
            ahead.format(TIMESTAMP_FORMAT).to_string()
        );
    }

    #[test]
    fn test_timestamps_hold_across_dst_fall_back() {
        let wall = |h, m, s, ms| {
            chrono::NaiveDate::from_ymd_opt(2025, 10, 26)
                .unwrap()
                .and_hms_milli_opt(h, m, s, ms)
                .unwrap()
        };
        // 02:59:59.900 CEST, then 200ms later the clock reads 02:00:00.100 CET.
        let before = wall(2, 59, 59, 900);
        let after_fall_back = wall(2, 0, 0, 100);

        let stamp = not_before(Some(before), after_fall_back);
        assert_eq!(stamp, before);
        assert_eq!(stamp.format(TIMESTAMP_FORMAT).to_string(), "02:59:59.900");

        let later = wall(3, 0, 0, 0);
        assert_eq!(not_before(Some(stamp), later), later);
        assert_eq!(not_before(None, after_fall_back), after_fall_back);
    }

    #[test]
    fn test_view_is_bounded_and_store_is_complete() {
        let store = MemoryLogStore::default();
        let ceiling = 1000;
        let sink = LogSink::new(store.clone(), ceiling);

        let mut max_seen = 0;
        for i in 0..500 {
            sink.append(format!("cycle {i}: checking compliance for the current position"));
            max_seen = max_seen.max(sink.contents().chars().count());
        }

        let contents = sink.contents();
        assert!(contents.starts_with(TRUNCATION_MARKER));
        assert!(max_seen <= ceiling + TRUNCATION_MARKER.chars().count());
        assert!(contents.contains("cycle 499:"));
        assert!(!contents.contains("cycle 0:"));

        let lines = store.lines();
        assert_eq!(lines.len(), 500);
        assert!(lines[0].ends_with("cycle 0: checking compliance for the current position"));
    }

    #[test]
    fn test_truncation_drops_to_half_ceiling() {
        let sink = LogSink::view_only(200);
        // 15 + 45 + 1 = 61 characters per entry; the fourth crosses 200.
        for _ in 0..4 {
            sink.append("x".repeat(45));
        }
        let contents = sink.contents();
        let body = contents.strip_prefix(TRUNCATION_MARKER).unwrap();
        assert!(body.chars().count() <= 100);
        assert_eq!(sink.entries().len(), 1);
    }

    #[test]
    fn test_oversized_entry_keeps_its_tail() {
        let sink = LogSink::view_only(100);
        let message = format!("{}END", "a".repeat(300));
        sink.append(&message);

        let contents = sink.contents();
        let body = contents.strip_prefix(TRUNCATION_MARKER).unwrap();
        assert!(body.chars().count() <= 50);
        assert!(body.trim_end().ends_with("END"));
    }

    #[test]
    fn test_clear_resets_view_but_not_store() {
        let store = MemoryLogStore::default();
        let sink = LogSink::new(store.clone(), 8000);
        sink.append("before clear");
        sink.clear();

        let contents = sink.contents();
        assert!(contents.starts_with(CLEARED_MARKER));
        assert!(!contents.contains("before clear"));
        assert!(contents.contains("User cleared UI log (file log continues)"));

        let lines = store.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("before clear"));
        assert!(!lines.iter().any(|l| l.contains("Log Cleared")));
    }

    #[test]
    fn test_store_failure_is_contained() {
        let sink = LogSink::new(MemoryLogStore::failing(), 8000);
        sink.append("first");
        sink.append("second");

        assert_eq!(sink.write_failures(), 2);
        assert!(sink.contents().contains("second"));
    }

    #[test]
    fn test_file_store_session() {
        let dir = TempDir::new().unwrap();
        let log_dir = dir.path().join("logs");
        let sink = LogSink::open(&log_dir, 8000).unwrap();
        sink.write_session_header();
        sink.append("GPS: Lat 1.000000, Lon 2.000000, Acc 5.0m");

        let path = sink.file_path().unwrap();
        assert_eq!(path.parent().unwrap(), log_dir);
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("NoSwimLog_"));
        assert!(name.ends_with(".txt"));

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].ends_with("=== NO-SWIM ZONE CHECKER ==="));
        assert!(lines[1].ends_with("Application Initialized"));
        assert!(lines[2].contains("Log file: "));
        assert!(lines[3].contains("Log directory: "));
        assert!(lines[4].ends_with("Acc 5.0m"));
    }

    #[test]
    fn test_session_file_name() {
        let started = Local.with_ymd_and_hms(2025, 7, 1, 9, 5, 3).unwrap();
        assert_eq!(session_file_name(started), "NoSwimLog_20250701_090503.txt");
    }
}
