//! Internal diagnostic channel for the configuration engine
//!
//! Structural configuration problems, appender faults and lifecycle notes are
//! recorded here instead of being routed through user appenders, so reporting
//! a problem can never re-enter the logging path.

use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default number of entries kept in memory
pub const DEFAULT_STATUS_CAPACITY: usize = 200;

/// One recorded diagnostic
#[derive(Debug, Clone)]
pub struct StatusEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for StatusEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[LOGGER {}] {}", self.level, self.message)
    }
}

struct StatusInner {
    entries: Mutex<VecDeque<StatusEntry>>,
    capacity: usize,
    echo_level: Mutex<LogLevel>,
    echo: AtomicBool,
}

/// Clonable handle to a bounded status buffer
///
/// # Example
///
/// ```
/// use rust_logger_config::core::{LogLevel, StatusLogger};
///
/// let status = StatusLogger::silent();
/// status.error("Unable to locate appender \"FILE\"");
/// assert_eq!(status.count_at_least(LogLevel::ERROR), 1);
/// ```
#[derive(Clone)]
pub struct StatusLogger {
    inner: Arc<StatusInner>,
}

impl StatusLogger {
    /// Status logger that echoes entries at `echo_level` or more severe to stderr
    pub fn new(echo_level: LogLevel) -> Self {
        Self::with_capacity(echo_level, DEFAULT_STATUS_CAPACITY)
    }

    /// Like [`StatusLogger::new`], keeping at most `capacity` entries
    ///
    /// The oldest entry is dropped once the buffer is full.
    pub fn with_capacity(echo_level: LogLevel, capacity: usize) -> Self {
        Self {
            inner: Arc::new(StatusInner {
                entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
                capacity: capacity.max(1),
                echo_level: Mutex::new(echo_level),
                echo: AtomicBool::new(true),
            }),
        }
    }

    /// Status logger that only records, never printing to stderr
    pub fn silent() -> Self {
        let status = Self::new(LogLevel::OFF);
        status.inner.echo.store(false, Ordering::Relaxed);
        status
    }

    /// Change the stderr threshold; a configuration's `status` attribute lands here
    pub fn set_echo_level(&self, level: LogLevel) {
        *self.inner.echo_level.lock() = level;
    }

    pub fn echo_level(&self) -> LogLevel {
        *self.inner.echo_level.lock()
    }

    /// Record an entry, echoing it when it passes the echo level
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let entry = StatusEntry {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        };
        if self.inner.echo.load(Ordering::Relaxed) && level.is_enabled_for(self.echo_level()) {
            eprintln!("{}", entry);
        }
        let mut entries = self.inner.entries.lock();
        if entries.len() == self.inner.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    #[inline]
    pub fn trace(&self, message: impl Into<String>) {
        self.log(LogLevel::TRACE, message);
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::DEBUG, message);
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::INFO, message);
    }

    #[inline]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::WARN, message);
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::ERROR, message);
    }

    /// Snapshot of the buffered entries, oldest first
    pub fn entries(&self) -> Vec<StatusEntry> {
        self.inner.entries.lock().iter().cloned().collect()
    }

    /// Number of entries at `level` or more severe
    pub fn count_at_least(&self, level: LogLevel) -> usize {
        self.inner
            .entries
            .lock()
            .iter()
            .filter(|entry| entry.level.is_enabled_for(level))
            .count()
    }

    /// True if any entry at `level` or more severe contains `needle`
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.inner
            .entries
            .lock()
            .iter()
            .any(|entry| entry.level.is_enabled_for(level) && entry.message.contains(needle))
    }

    pub fn clear(&self) {
        self.inner.entries.lock().clear();
    }
}

impl Default for StatusLogger {
    fn default() -> Self {
        Self::new(LogLevel::WARN)
    }
}

impl fmt::Debug for StatusLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusLogger")
            .field("echo_level", &self.echo_level())
            .field("entries", &self.inner.entries.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_entries_in_order() {
        let status = StatusLogger::silent();
        status.debug("first");
        status.error("second");

        let entries = status.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "first");
        assert_eq!(entries[1].level, LogLevel::ERROR);
    }

    #[test]
    fn test_bounded_capacity_drops_oldest() {
        let status = StatusLogger::with_capacity(LogLevel::OFF, 3);
        for i in 0..5 {
            status.info(format!("entry {}", i));
        }
        let messages: Vec<_> = status.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["entry 2", "entry 3", "entry 4"]);
    }

    #[test]
    fn test_count_and_contains() {
        let status = StatusLogger::silent();
        status.warn("No Loggers were configured");
        status.error("invalid attribute \"colour\"");
        status.debug("noise");

        assert_eq!(status.count_at_least(LogLevel::WARN), 2);
        assert!(status.contains(LogLevel::ERROR, "colour"));
        assert!(!status.contains(LogLevel::ERROR, "Loggers"));
    }

    #[test]
    fn test_entry_display() {
        let status = StatusLogger::silent();
        status.error("boom");
        assert_eq!(status.entries()[0].to_string(), "[LOGGER ERROR] boom");
    }

    #[test]
    fn test_clones_share_buffer() {
        let status = StatusLogger::silent();
        let clone = status.clone();
        clone.warn("shared");
        assert_eq!(status.entries().len(), 1);
    }
}
