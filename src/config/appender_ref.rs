use crate::core::{Filter, LogLevel};
use std::sync::Arc;

/// Declarative binding from a LoggerConfig to an appender by name
#[derive(Debug, Clone)]
pub struct AppenderRef {
    ref_name: String,
    level: Option<LogLevel>,
    filter: Option<Arc<dyn Filter>>,
}

impl AppenderRef {
    pub fn new(ref_name: impl Into<String>) -> Self {
        Self {
            ref_name: ref_name.into(),
            level: None,
            filter: None,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_level(mut self, level: Option<LogLevel>) -> Self {
        self.level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_filter(mut self, filter: Option<Arc<dyn Filter>>) -> Self {
        self.filter = filter;
        self
    }

    pub fn ref_name(&self) -> &str {
        &self.ref_name
    }

    pub fn level(&self) -> Option<LogLevel> {
        self.level
    }

    pub fn filter(&self) -> Option<&Arc<dyn Filter>> {
        self.filter.as_ref()
    }
}
