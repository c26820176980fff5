//! Event filters and the holder shared by configurations, logger configs and appenders

use super::log_event::LogEvent;
use super::log_level::LogLevel;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterResult {
    /// Process the event without consulting further filters
    Accept,
    /// No opinion; the next filter or the level check decides
    Neutral,
    /// Drop the event
    Deny,
}

impl FilterResult {
    pub fn to_str(&self) -> &'static str {
        match self {
            FilterResult::Accept => "ACCEPT",
            FilterResult::Neutral => "NEUTRAL",
            FilterResult::Deny => "DENY",
        }
    }
}

impl fmt::Display for FilterResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl FromStr for FilterResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ACCEPT" => Ok(FilterResult::Accept),
            "NEUTRAL" => Ok(FilterResult::Neutral),
            "DENY" => Ok(FilterResult::Deny),
            _ => Err(format!("Invalid filter result: '{}'", s)),
        }
    }
}

pub trait Filter: Send + Sync + fmt::Debug {
    fn filter(&self, event: &LogEvent) -> FilterResult;

    fn start(&self) {}

    fn stop(&self, _timeout: Duration) -> bool {
        true
    }

    /// Downcast hook used when a second filter is added to a holder
    fn as_composite(&self) -> Option<&CompositeFilter> {
        None
    }
}

/// Matches events at `level` or more severe
#[derive(Debug, Clone)]
pub struct ThresholdFilter {
    level: LogLevel,
    on_match: FilterResult,
    on_mismatch: FilterResult,
}

impl ThresholdFilter {
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            on_match: FilterResult::Neutral,
            on_mismatch: FilterResult::Deny,
        }
    }

    #[must_use]
    pub fn with_results(mut self, on_match: FilterResult, on_mismatch: FilterResult) -> Self {
        self.on_match = on_match;
        self.on_mismatch = on_mismatch;
        self
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }
}

impl Filter for ThresholdFilter {
    fn filter(&self, event: &LogEvent) -> FilterResult {
        if event.level.is_enabled_for(self.level) {
            self.on_match
        } else {
            self.on_mismatch
        }
    }
}

/// Matches events whose message contains a fixed substring
#[derive(Debug, Clone)]
pub struct StringMatchFilter {
    text: String,
    on_match: FilterResult,
    on_mismatch: FilterResult,
}

impl StringMatchFilter {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            on_match: FilterResult::Neutral,
            on_mismatch: FilterResult::Deny,
        }
    }

    #[must_use]
    pub fn with_results(mut self, on_match: FilterResult, on_mismatch: FilterResult) -> Self {
        self.on_match = on_match;
        self.on_mismatch = on_mismatch;
        self
    }
}

impl Filter for StringMatchFilter {
    fn filter(&self, event: &LogEvent) -> FilterResult {
        if event.message.contains(&self.text) {
            self.on_match
        } else {
            self.on_mismatch
        }
    }
}

/// Ordered list of filters; the first non-neutral result wins
#[derive(Debug, Clone, Default)]
pub struct CompositeFilter {
    filters: Vec<Arc<dyn Filter>>,
}

impl CompositeFilter {
    pub fn new(filters: Vec<Arc<dyn Filter>>) -> Self {
        Self { filters }
    }

    pub fn filters(&self) -> &[Arc<dyn Filter>] {
        &self.filters
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// New composite with `filter` appended
    #[must_use]
    pub fn add_filter(&self, filter: Arc<dyn Filter>) -> CompositeFilter {
        let mut filters = self.filters.clone();
        filters.push(filter);
        CompositeFilter { filters }
    }

    /// New composite without `filter` (compared by identity)
    #[must_use]
    pub fn remove_filter(&self, filter: &Arc<dyn Filter>) -> CompositeFilter {
        let filters = self
            .filters
            .iter()
            .filter(|f| !Arc::ptr_eq(f, filter))
            .cloned()
            .collect();
        CompositeFilter { filters }
    }
}

impl Filter for CompositeFilter {
    fn filter(&self, event: &LogEvent) -> FilterResult {
        for filter in &self.filters {
            let result = filter.filter(event);
            if result != FilterResult::Neutral {
                return result;
            }
        }
        FilterResult::Neutral
    }

    fn start(&self) {
        for filter in &self.filters {
            filter.start();
        }
    }

    fn stop(&self, timeout: Duration) -> bool {
        let mut stopped = true;
        for filter in &self.filters {
            stopped &= filter.stop(timeout);
        }
        stopped
    }

    fn as_composite(&self) -> Option<&CompositeFilter> {
        Some(self)
    }
}

/// Optional filter slot that can be extended at runtime
#[derive(Debug, Default)]
pub struct Filterable {
    filter: RwLock<Option<Arc<dyn Filter>>>,
}

impl Filterable {
    pub fn new(filter: Option<Arc<dyn Filter>>) -> Self {
        Self {
            filter: RwLock::new(filter),
        }
    }

    pub fn filter(&self) -> Option<Arc<dyn Filter>> {
        self.filter.read().clone()
    }

    pub fn has_filter(&self) -> bool {
        self.filter.read().is_some()
    }

    /// Add a filter; a holder that already has one ends up with a composite
    pub fn add_filter(&self, filter: Arc<dyn Filter>) {
        let mut slot = self.filter.write();
        let next: Arc<dyn Filter> = match slot.take() {
            None => filter,
            Some(existing) => match existing.as_composite() {
                Some(composite) => Arc::new(composite.add_filter(filter)),
                None => Arc::new(CompositeFilter::new(vec![existing, filter])),
            },
        };
        *slot = Some(next);
    }

    pub fn remove_filter(&self, filter: &Arc<dyn Filter>) {
        let mut slot = self.filter.write();
        let Some(existing) = slot.take() else {
            return;
        };
        if Arc::ptr_eq(&existing, filter) {
            return;
        }
        *slot = match existing.as_composite() {
            Some(composite) => {
                let reduced = composite.remove_filter(filter);
                match reduced.len() {
                    0 => None,
                    1 => reduced.filters().first().cloned(),
                    _ => Some(Arc::new(reduced)),
                }
            }
            None => Some(existing),
        };
    }

    /// True when the installed filter denies the event
    #[inline]
    pub fn is_filtered(&self, event: &LogEvent) -> bool {
        match self.filter.read().as_ref() {
            Some(filter) => filter.filter(event) == FilterResult::Deny,
            None => false,
        }
    }

    pub fn start_filter(&self) {
        if let Some(filter) = self.filter() {
            filter.start();
        }
    }

    pub fn stop_filter(&self, timeout: Duration) -> bool {
        match self.filter() {
            Some(filter) => filter.stop(timeout),
            None => true,
        }
    }
}
