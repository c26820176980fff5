//! File appender implementation

use crate::core::{
    Appender, AppenderBase, ErrorHandler, Filter, LifeCycle, LifeCycleState, LogEvent,
    LoggerError, OutputFormat, Result, StatusLogger, TimestampFormat,
};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Appends formatted events to a file
///
/// The file is opened when the appender is started and closed, after a
/// final flush, when it is stopped.
pub struct FileAppender {
    base: AppenderBase,
    path: PathBuf,
    append: bool,
    immediate_flush: bool,
    timestamp_format: TimestampFormat,
    output_format: OutputFormat,
    writer: Mutex<Option<BufWriter<File>>>,
}

impl FileAppender {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, status: StatusLogger) -> Self {
        Self {
            base: AppenderBase::new(name, status),
            path: path.into(),
            append: true,
            immediate_flush: true,
            timestamp_format: TimestampFormat::default(),
            output_format: OutputFormat::default(),
            writer: Mutex::new(None),
        }
    }

    /// Truncate instead of appending when false
    #[must_use]
    pub fn with_append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// Flush after every event instead of when the buffer fills
    #[must_use]
    pub fn with_immediate_flush(mut self, immediate: bool) -> Self {
        self.immediate_flush = immediate;
        self
    }

    /// Set the timestamp format for this appender
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rust_logger_config::appenders::FileAppender;
    /// use rust_logger_config::core::{StatusLogger, TimestampFormat};
    ///
    /// let appender = FileAppender::new("FILE", "/var/log/app.log", StatusLogger::silent())
    ///     .with_timestamp_format(TimestampFormat::Rfc3339);
    /// ```
    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Option<Arc<dyn Filter>>) -> Self {
        let base = std::mem::replace(&mut self.base, AppenderBase::new("", StatusLogger::silent()));
        self.base = base.with_filter(filter);
        self
    }

    #[must_use]
    pub fn with_ignore_exceptions(mut self, ignore: bool) -> Self {
        let base = std::mem::replace(&mut self.base, AppenderBase::new("", StatusLogger::silent()));
        self.base = base.with_ignore_exceptions(ignore);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<BufWriter<File>> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    LoggerError::io_operation(
                        "creating log directory",
                        parent.display().to_string(),
                        e,
                    )
                })?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(self.append)
            .truncate(!self.append)
            .open(&self.path)
            .map_err(|e| {
                LoggerError::io_operation("opening log file", self.path.display().to_string(), e)
            })?;
        Ok(BufWriter::new(file))
    }
}

impl LifeCycle for FileAppender {
    fn state(&self) -> LifeCycleState {
        self.base.state()
    }

    fn start(&self) {
        if self.base.state() == LifeCycleState::Started {
            return;
        }
        match self.open() {
            Ok(writer) => {
                *self.writer.lock() = Some(writer);
                self.base.start();
            }
            // Left unstarted; appends are reported as going to a non-started appender
            Err(e) => self
                .base
                .handler()
                .error(&format!("Unable to start file appender: {}", e)),
        }
    }

    fn stop(&self, timeout: Duration) -> bool {
        self.base.set_stopping();
        let flushed = match self.writer.lock().take() {
            Some(mut writer) => writer.flush().is_ok(),
            None => true,
        };
        self.base.set_stopped(timeout) && flushed
    }
}

impl Appender for FileAppender {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn append(&self, event: &LogEvent) -> Result<()> {
        let mut output = self.output_format.format(event, &self.timestamp_format);
        output.push('\n');

        let mut guard = self.writer.lock();
        let writer = guard
            .as_mut()
            .ok_or_else(|| LoggerError::appender(self.base.name(), "file is not open"))?;
        writer.write_all(output.as_bytes())?;
        if self.immediate_flush {
            writer.flush()?;
        }
        Ok(())
    }

    fn ignore_exceptions(&self) -> bool {
        self.base.ignore_exceptions()
    }

    fn handler(&self) -> &dyn ErrorHandler {
        self.base.handler()
    }

    fn filter(&self) -> Option<Arc<dyn Filter>> {
        self.base.filter()
    }

    fn flush(&self) -> Result<()> {
        if let Some(ref mut writer) = *self.writer.lock() {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for FileAppender {
    fn drop(&mut self) {
        // Ensure all buffered data is flushed to disk
        let _ = self.flush();
    }
}
