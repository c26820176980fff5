//! Log event structure and the factory LoggerConfigs use to create events

use super::log_context::LogContext;
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

/// Get cached thread ID, computing and caching it on first access
fn get_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| format!("{:?}", std::thread::current().id()))
            .clone()
    })
}

/// Get cached thread name, computing and caching it on first access
fn get_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

/// Source location of the logging call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub module_path: String,
}

impl Location {
    pub fn new(file: &str, line: u32, module_path: &str) -> Self {
        Self {
            file: file.to_string(),
            line,
            module_path: module_path.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub logger_name: String,
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub thread_id: String,
    pub thread_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<LogContext>,
}

impl LogEvent {
    /// Sanitize log message to prevent log injection attacks
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences
    /// to prevent attackers from injecting fake log entries.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new(logger_name: impl Into<String>, level: LogLevel, message: impl AsRef<str>) -> Self {
        Self {
            logger_name: logger_name.into(),
            level,
            message: Self::sanitize_message(message.as_ref()),
            timestamp: Utc::now(),
            location: None,
            thread_id: get_thread_id(),
            thread_name: get_thread_name(),
            context: None,
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_context(mut self, context: LogContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Name of the thread that created the event, or its id when unnamed
    pub fn thread_label(&self) -> &str {
        self.thread_name.as_deref().unwrap_or(&self.thread_id)
    }
}

/// Creates events on behalf of a LoggerConfig
///
/// One factory is chosen when the engine settings are resolved and handed to
/// every LoggerConfig explicitly.
pub trait LogEventFactory: Send + Sync + fmt::Debug {
    /// Build an event; `properties` are the already evaluated LoggerConfig
    /// properties and never override fields supplied by the caller.
    fn create_event(
        &self,
        logger_name: &str,
        level: LogLevel,
        message: &str,
        location: Option<Location>,
        context: Option<LogContext>,
        properties: &[(String, String)],
    ) -> LogEvent;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultLogEventFactory;

impl LogEventFactory for DefaultLogEventFactory {
    fn create_event(
        &self,
        logger_name: &str,
        level: LogLevel,
        message: &str,
        location: Option<Location>,
        context: Option<LogContext>,
        properties: &[(String, String)],
    ) -> LogEvent {
        let mut event = LogEvent::new(logger_name, level, message);
        event.location = location;
        let context = if properties.is_empty() {
            context
        } else {
            let mut merged = context.unwrap_or_default();
            for (key, value) in properties {
                merged.add_if_absent(key.as_str(), value.as_str());
            }
            Some(merged)
        };
        event.context = context;
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_context::FieldValue;

    #[test]
    fn test_message_is_sanitized() {
        let event = LogEvent::new("app", LogLevel::INFO, "line1\nERROR fake\tentry");
        assert_eq!(event.message, "line1\\nERROR fake\\tentry");
    }

    #[test]
    fn test_thread_label_falls_back_to_id() {
        let handle = std::thread::spawn(|| LogEvent::new("app", LogLevel::INFO, "x"));
        let event = handle.join().unwrap();
        assert_eq!(event.thread_label(), event.thread_id);

        let named = std::thread::Builder::new()
            .name("worker-1".into())
            .spawn(|| LogEvent::new("app", LogLevel::INFO, "x"))
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(named.thread_label(), "worker-1");
    }

    #[test]
    fn test_factory_merges_properties_without_override() {
        let factory = DefaultLogEventFactory;
        let context = LogContext::new().with_field("user", "alice");
        let props = vec![
            ("user".to_string(), "configured".to_string()),
            ("service".to_string(), "billing".to_string()),
        ];
        let event = factory.create_event("a.b", LogLevel::WARN, "hello", None, Some(context), &props);

        let ctx = event.context.expect("context should be present");
        assert_eq!(ctx.get("user"), Some(&FieldValue::String("alice".into())));
        assert_eq!(ctx.get("service"), Some(&FieldValue::String("billing".into())));
        assert_eq!(event.logger_name, "a.b");
    }

    #[test]
    fn test_factory_without_properties_keeps_context_absent() {
        let event = DefaultLogEventFactory.create_event("a", LogLevel::INFO, "m", None, None, &[]);
        assert!(event.context.is_none());
    }
}
