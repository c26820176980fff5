//! Error handlers owned by appenders

use super::error::LoggerError;
use super::log_event::LogEvent;
use super::status::StatusLogger;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Number of errors always reported before rate limiting starts
pub const MAX_REPORTED_ERRORS: u64 = 3;

/// Minimum delay between reports once rate limiting is active
pub const ERROR_REPORT_INTERVAL: Duration = Duration::from_secs(300);

pub trait ErrorHandler: Send + Sync + fmt::Debug {
    fn error(&self, message: &str);

    fn error_with_event(&self, message: &str, event: &LogEvent, error: Option<&LoggerError>);
}

/// Reports appender errors to the status logger
///
/// The first [`MAX_REPORTED_ERRORS`] errors are always reported, later ones at
/// most once per [`ERROR_REPORT_INTERVAL`]. Every error is counted.
#[derive(Debug)]
pub struct DefaultErrorHandler {
    appender_name: String,
    status: StatusLogger,
    error_count: AtomicU64,
    last_report: Mutex<Option<Instant>>,
}

impl DefaultErrorHandler {
    pub fn new(appender_name: impl Into<String>, status: StatusLogger) -> Self {
        Self {
            appender_name: appender_name.into(),
            status,
            error_count: AtomicU64::new(0),
            last_report: Mutex::new(None),
        }
    }

    /// Total errors seen, including those not reported
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    fn should_report(&self) -> bool {
        let previous = self.error_count.fetch_add(1, Ordering::Relaxed);
        let mut last = self.last_report.lock();
        let now = Instant::now();
        let due = match *last {
            None => true,
            Some(at) => now.duration_since(at) >= ERROR_REPORT_INTERVAL,
        };
        if previous < MAX_REPORTED_ERRORS || due {
            *last = Some(now);
            true
        } else {
            false
        }
    }
}

impl ErrorHandler for DefaultErrorHandler {
    fn error(&self, message: &str) {
        if self.should_report() {
            self.status
                .error(format!("{} for appender {}", message, self.appender_name));
        }
    }

    fn error_with_event(&self, message: &str, event: &LogEvent, error: Option<&LoggerError>) {
        if !self.should_report() {
            return;
        }
        match error {
            Some(err) => self.status.error(format!(
                "{} for appender {} (logger \"{}\"): {}",
                message, self.appender_name, event.logger_name, err
            )),
            None => self.status.error(format!(
                "{} for appender {} (logger \"{}\")",
                message, self.appender_name, event.logger_name
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogLevel;

    #[test]
    fn test_reports_first_errors_then_rate_limits() {
        let status = StatusLogger::silent();
        let handler = DefaultErrorHandler::new("FILE", status.clone());

        for i in 0..10 {
            handler.error(&format!("failure {}", i));
        }

        assert_eq!(handler.error_count(), 10);
        assert_eq!(status.count_at_least(LogLevel::ERROR), MAX_REPORTED_ERRORS as usize);
        assert!(status.contains(LogLevel::ERROR, "failure 0 for appender FILE"));
    }

    #[test]
    fn test_error_with_event_names_logger() {
        let status = StatusLogger::silent();
        let handler = DefaultErrorHandler::new("STDOUT", status.clone());
        let event = LogEvent::new("com.acme", LogLevel::WARN, "x");
        let err = LoggerError::appender("STDOUT", "broken pipe");

        handler.error_with_event("An exception occurred", &event, Some(&err));
        assert!(status.contains(LogLevel::ERROR, "logger \"com.acme\""));
        assert!(status.contains(LogLevel::ERROR, "broken pipe"));
    }
}
