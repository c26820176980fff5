//! In-memory appender for capturing events

use crate::core::{
    Appender, AppenderBase, ErrorHandler, Filter, LifeCycle, LifeCycleState, LogEvent, Result,
    StatusLogger,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Keeps every appended event in memory
///
/// # Example
///
/// ```
/// use rust_logger_config::appenders::ListAppender;
/// use rust_logger_config::core::{Appender, LifeCycle, LogEvent, LogLevel, StatusLogger};
///
/// let list = ListAppender::new("LIST", StatusLogger::silent());
/// list.start();
/// list.append(&LogEvent::new("app", LogLevel::INFO, "hello")).unwrap();
/// assert_eq!(list.messages(), vec!["hello".to_string()]);
/// ```
#[derive(Debug)]
pub struct ListAppender {
    base: AppenderBase,
    events: Mutex<Vec<LogEvent>>,
}

impl ListAppender {
    pub fn new(name: impl Into<String>, status: StatusLogger) -> Self {
        Self {
            base: AppenderBase::new(name, status),
            events: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_ignore_exceptions(mut self, ignore: bool) -> Self {
        self.base = self.base.with_ignore_exceptions(ignore);
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Option<Arc<dyn Filter>>) -> Self {
        self.base = self.base.with_filter(filter);
        self
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.message.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl LifeCycle for ListAppender {
    fn state(&self) -> LifeCycleState {
        self.base.state()
    }

    fn start(&self) {
        self.base.start();
    }

    fn stop(&self, timeout: Duration) -> bool {
        self.base.set_stopping();
        self.base.set_stopped(timeout)
    }
}

impl Appender for ListAppender {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn append(&self, event: &LogEvent) -> Result<()> {
        self.events.lock().push(event.clone());
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
}
