//! Appender trait for log output destinations

use super::error::Result;
use super::error_handler::{DefaultErrorHandler, ErrorHandler};
use super::filter::{Filter, Filterable};
use super::lifecycle::{LifeCycle, LifeCycleState, StateCell};
use super::log_event::LogEvent;
use super::status::StatusLogger;
use std::sync::Arc;
use std::time::Duration;

/// A named sink for log events
///
/// Appenders are shared between every AppenderControl that references them,
/// so `append` takes `&self` and implementations synchronize internally.
pub trait Appender: LifeCycle {
    fn name(&self) -> &str;

    fn append(&self, event: &LogEvent) -> Result<()>;

    /// When true (the default) append failures are reported to the error
    /// handler and swallowed instead of being returned to the caller.
    fn ignore_exceptions(&self) -> bool {
        true
    }

    fn handler(&self) -> &dyn ErrorHandler;

    /// Filter owned by the appender itself, checked after the control's own checks
    fn filter(&self) -> Option<Arc<dyn Filter>> {
        None
    }

    fn is_filtered(&self, event: &LogEvent) -> bool {
        self.filter()
            .is_some_and(|f| f.filter(event) == super::filter::FilterResult::Deny)
    }

    /// Async appenders are stopped before every other appender
    fn is_async(&self) -> bool {
        false
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Resolve references to other appenders once the configuration has built all of them
    fn resolve_references(&self, _appenders: &[Arc<dyn Appender>], _status: &StatusLogger) {}
}

/// State shared by the built-in appenders: name, lifecycle, handler, filter
#[derive(Debug)]
pub struct AppenderBase {
    name: String,
    state: StateCell,
    handler: DefaultErrorHandler,
    filter: Filterable,
    ignore_exceptions: bool,
}

impl AppenderBase {
    pub fn new(name: impl Into<String>, status: StatusLogger) -> Self {
        let name = name.into();
        Self {
            handler: DefaultErrorHandler::new(name.clone(), status),
            name,
            state: StateCell::new(),
            filter: Filterable::default(),
            ignore_exceptions: true,
        }
    }

    #[must_use]
    pub fn with_filter(self, filter: Option<Arc<dyn Filter>>) -> Self {
        Self {
            filter: Filterable::new(filter),
            ..self
        }
    }

    #[must_use]
    pub fn with_ignore_exceptions(mut self, ignore: bool) -> Self {
        self.ignore_exceptions = ignore;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LifeCycleState {
        self.state.get()
    }

    pub fn handler(&self) -> &DefaultErrorHandler {
        &self.handler
    }

    pub fn filterable(&self) -> &Filterable {
        &self.filter
    }

    pub fn filter(&self) -> Option<Arc<dyn Filter>> {
        self.filter.filter()
    }

    pub fn ignore_exceptions(&self) -> bool {
        self.ignore_exceptions
    }

    /// Mark the appender started; returns false if it already was
    pub fn start(&self) -> bool {
        if self.state.get() == LifeCycleState::Started {
            return false;
        }
        self.state.set(LifeCycleState::Starting);
        self.filter.start_filter();
        self.state.set(LifeCycleState::Started);
        true
    }

    pub fn set_stopping(&self) {
        self.state.set(LifeCycleState::Stopping);
    }

    pub fn set_stopped(&self, timeout: Duration) -> bool {
        let stopped = self.filter.stop_filter(timeout);
        self.state.set(LifeCycleState::Stopped);
        stopped
    }
}

/// Text of a panic payload caught with `catch_unwind`
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_lifecycle() {
        let base = AppenderBase::new("STDOUT", StatusLogger::silent());
        assert_eq!(base.state(), LifeCycleState::Initializing);
        assert!(base.start());
        assert!(!base.start());
        assert_eq!(base.state(), LifeCycleState::Started);

        base.set_stopping();
        assert!(base.set_stopped(Duration::from_millis(10)));
        assert_eq!(base.state(), LifeCycleState::Stopped);
    }

    #[test]
    fn test_base_defaults() {
        let base = AppenderBase::new("A", StatusLogger::silent()).with_ignore_exceptions(false);
        assert_eq!(base.name(), "A");
        assert!(!base.ignore_exceptions());
        assert!(base.filter().is_none());
    }
}
