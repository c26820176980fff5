//! Per-reference dispatch to a shared appender

use super::appender_ref::AppenderRef;
use crate::core::appender::panic_message;
use crate::core::{Appender, Filter, FilterResult, LogEvent, LogLevel, LoggerError, Result};
use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_CONTROL_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Controls currently appending on this thread
    static ACTIVE_CONTROLS: RefCell<Vec<u64>> = const { RefCell::new(Vec::new()) };
}

/// Marks a control active on the current thread until dropped
struct RecursionGuard(u64);

impl RecursionGuard {
    fn enter(id: u64) -> Option<Self> {
        ACTIVE_CONTROLS.with(|active| {
            let mut active = active.borrow_mut();
            if active.contains(&id) {
                None
            } else {
                active.push(id);
                Some(RecursionGuard(id))
            }
        })
    }
}

impl Drop for RecursionGuard {
    fn drop(&mut self) {
        let _ = ACTIVE_CONTROLS.try_with(|active| {
            let mut active = active.borrow_mut();
            if let Some(pos) = active.iter().rposition(|id| *id == self.0) {
                active.remove(pos);
            }
        });
    }
}

/// Binds one appender to a LoggerConfig with an optional level and filter
///
/// Immutable once built. Two controls are equal when they wrap appenders with
/// the same name.
pub struct AppenderControl {
    id: u64,
    appender: Arc<dyn Appender>,
    level: Option<LogLevel>,
    filter: Option<Arc<dyn Filter>>,
}

impl AppenderControl {
    pub fn new(
        appender: Arc<dyn Appender>,
        level: Option<LogLevel>,
        filter: Option<Arc<dyn Filter>>,
    ) -> Self {
        Self {
            id: NEXT_CONTROL_ID.fetch_add(1, Ordering::Relaxed),
            appender,
            level,
            filter,
        }
    }

    pub fn from_ref(appender: Arc<dyn Appender>, appender_ref: &AppenderRef) -> Self {
        Self::new(appender, appender_ref.level(), appender_ref.filter().cloned())
    }

    pub fn appender(&self) -> &Arc<dyn Appender> {
        &self.appender
    }

    pub fn appender_name(&self) -> &str {
        self.appender.name()
    }

    pub fn level(&self) -> Option<LogLevel> {
        self.level
    }

    pub fn filter(&self) -> Option<&Arc<dyn Filter>> {
        self.filter.as_ref()
    }

    /// Run the event through the control's checks and append it
    ///
    /// Errors are only returned when the appender does not ignore exceptions.
    pub fn call_appender(&self, event: &LogEvent) -> Result<()> {
        if let Some(filter) = &self.filter {
            if filter.filter(event) == FilterResult::Deny {
                return Ok(());
            }
        }
        if let Some(threshold) = self.level {
            if !event.level.is_enabled_for(threshold) {
                return Ok(());
            }
        }

        let Some(_guard) = RecursionGuard::enter(self.id) else {
            self.appender.handler().error(&format!(
                "Recursive call to appender {}",
                self.appender_name()
            ));
            return Ok(());
        };
        self.try_call_appender(event)
    }

    fn try_call_appender(&self, event: &LogEvent) -> Result<()> {
        let name = self.appender_name();
        if !self.appender.is_started() {
            self.appender
                .handler()
                .error(&format!("Attempted to append to non-started appender {}", name));
            if !self.appender.ignore_exceptions() {
                return Err(LoggerError::appender_not_started(name));
            }
            return Ok(());
        }

        if self.appender.is_filtered(event) {
            return Ok(());
        }

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.appender.append(event)
        }));
        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => self.handle_append_error(event, err),
            Err(payload) => {
                let err = LoggerError::appender(name, panic_message(payload.as_ref()));
                self.handle_append_error(event, err)
            }
        }
    }

    fn handle_append_error(&self, event: &LogEvent, err: LoggerError) -> Result<()> {
        let name = self.appender_name();
        self.appender.handler().error_with_event(
            &format!("An exception occurred processing Appender {}", name),
            event,
            Some(&err),
        );
        if self.appender.ignore_exceptions() {
            return Ok(());
        }
        match err {
            err @ LoggerError::AppenderFailure { .. } => Err(err),
            other => Err(LoggerError::appender(name, other.to_string())),
        }
    }
}

impl PartialEq for AppenderControl {
    fn eq(&self, other: &Self) -> bool {
        self.appender_name() == other.appender_name()
    }
}

impl Eq for AppenderControl {}

impl fmt::Debug for AppenderControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppenderControl")
            .field("appender", &self.appender_name())
            .field("level", &self.level)
            .field("filter", &self.filter)
            .finish()
    }
}
