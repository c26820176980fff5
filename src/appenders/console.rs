//! Console appender implementation

use crate::core::{
    Appender, AppenderBase, ErrorHandler, Filter, LifeCycle, LifeCycleState, LogEvent,
    LoggerError, OutputFormat, Result, StatusLogger, TimestampFormat,
};
#[cfg(feature = "console")]
use colored::Colorize;
use parking_lot::Mutex;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Stream a [`ConsoleAppender`] writes to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsoleTarget {
    #[default]
    SystemOut,
    SystemErr,
}

impl FromStr for ConsoleTarget {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().replace('_', "").as_str() {
            "SYSTEMOUT" | "STDOUT" => Ok(ConsoleTarget::SystemOut),
            "SYSTEMERR" | "STDERR" => Ok(ConsoleTarget::SystemErr),
            _ => Err(LoggerError::other(format!("Unknown console target: {}", s))),
        }
    }
}

pub struct ConsoleAppender {
    base: AppenderBase,
    target: ConsoleTarget,
    use_colors: bool,
    timestamp_format: TimestampFormat,
    output_format: OutputFormat,
    // Serializes whole lines between threads
    write_lock: Mutex<()>,
}

impl ConsoleAppender {
    pub fn new(name: impl Into<String>, status: StatusLogger) -> Self {
        Self {
            base: AppenderBase::new(name, status),
            target: ConsoleTarget::default(),
            use_colors: false,
            timestamp_format: TimestampFormat::default(),
            output_format: OutputFormat::default(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_target(mut self, target: ConsoleTarget) -> Self {
        self.target = target;
        self
    }

    /// Colorize the level in text output (requires the `console` feature)
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Set the output format for this appender
    ///
    /// # Example
    ///
    /// ```
    /// use rust_logger_config::appenders::ConsoleAppender;
    /// use rust_logger_config::core::{OutputFormat, StatusLogger};
    ///
    /// let appender = ConsoleAppender::new("STDOUT", StatusLogger::silent())
    ///     .with_output_format(OutputFormat::Json);
    /// ```
    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Option<Arc<dyn Filter>>) -> Self {
        self.base = self.base.with_filter(filter);
        self
    }

    #[must_use]
    pub fn with_ignore_exceptions(mut self, ignore: bool) -> Self {
        self.base = self.base.with_ignore_exceptions(ignore);
        self
    }

    pub fn target(&self) -> ConsoleTarget {
        self.target
    }

    pub fn output_format(&self) -> &OutputFormat {
        &self.output_format
    }

    fn render(&self, event: &LogEvent) -> String {
        match self.output_format {
            OutputFormat::Text if self.use_colors => self.format_colored(event),
            _ => self.output_format.format(event, &self.timestamp_format),
        }
    }

    #[cfg(feature = "console")]
    fn format_colored(&self, event: &LogEvent) -> String {
        let plain = self.output_format.format(event, &self.timestamp_format);
        let level = format!("{:5}", event.level.to_str());
        let colored = level.color(event.level.color_code()).to_string();
        plain.replacen(&format!("[{}]", level), &format!("[{}]", colored), 1)
    }

    #[cfg(not(feature = "console"))]
    fn format_colored(&self, event: &LogEvent) -> String {
        self.output_format.format(event, &self.timestamp_format)
    }
}

impl LifeCycle for ConsoleAppender {
    fn state(&self) -> LifeCycleState {
        self.base.state()
    }

    fn start(&self) {
        self.base.start();
    }

    fn stop(&self, timeout: Duration) -> bool {
        self.base.set_stopping();
        let flushed = self.flush().is_ok();
        self.base.set_stopped(timeout) && flushed
    }
}

impl Appender for ConsoleAppender {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn append(&self, event: &LogEvent) -> Result<()> {
        let output = self.render(event);
        let _guard = self.write_lock.lock();
        match self.target {
            ConsoleTarget::SystemOut => writeln!(std::io::stdout().lock(), "{}", output)?,
            ConsoleTarget::SystemErr => writeln!(std::io::stderr().lock(), "{}", output)?,
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
        match self.target {
            ConsoleTarget::SystemOut => std::io::stdout().flush()?,
            ConsoleTarget::SystemErr => std::io::stderr().flush()?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogLevel;

    #[test]
    fn test_target_parsing() {
        assert_eq!("SYSTEM_OUT".parse::<ConsoleTarget>().unwrap(), ConsoleTarget::SystemOut);
        assert_eq!("SystemErr".parse::<ConsoleTarget>().unwrap(), ConsoleTarget::SystemErr);
        assert!("printer".parse::<ConsoleTarget>().is_err());
    }

    #[test]
    fn test_render_plain_text() {
        let appender = ConsoleAppender::new("STDOUT", StatusLogger::silent())
            .with_timestamp_format(TimestampFormat::Unix);
        let line = appender.render(&LogEvent::new("app.db", LogLevel::WARN, "slow query"));
        assert!(line.contains("[WARN ]"));
        assert!(line.ends_with("app.db - slow query"));
    }

    #[test]
    fn test_append_requires_nothing_but_a_stream() {
        let appender = ConsoleAppender::new("STDERR", StatusLogger::silent())
            .with_target(ConsoleTarget::SystemErr);
        appender.start();
        assert!(appender
            .append(&LogEvent::new("", LogLevel::ERROR, "console test line"))
            .is_ok());
        assert!(appender.stop(Duration::from_millis(10)));
    }
}
