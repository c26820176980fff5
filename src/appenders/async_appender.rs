//! Appender that hands events to a background worker
//!
//! The worker forwards every event to the referenced appenders. Those are
//! looked up by name once the configuration has built all appenders.

use crate::config::{AppenderControl, AppenderControlSet, AppenderRef};
use crate::core::{
    Appender, AppenderBase, AsyncQueue, ErrorHandler, Filter, LifeCycle, LifeCycleState,
    LogEvent, LogPriority, OverflowCallback, OverflowPolicy, QueueMetrics, Result, StatusLogger,
};
use std::sync::Arc;
use std::time::Duration;

/// Default number of events buffered by an [`AsyncAppender`]
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

pub struct AsyncAppender {
    base: AppenderBase,
    refs: Vec<AppenderRef>,
    targets: Arc<AppenderControlSet>,
    queue: AsyncQueue<LogEvent>,
    shutdown_timeout: Duration,
    status: StatusLogger,
}

impl AsyncAppender {
    pub fn new(name: impl Into<String>, refs: Vec<AppenderRef>, status: StatusLogger) -> Self {
        let name = name.into();
        Self {
            queue: AsyncQueue::new(
                name.clone(),
                DEFAULT_BUFFER_SIZE,
                OverflowPolicy::default(),
                status.clone(),
            ),
            base: AppenderBase::new(name, status.clone()),
            refs,
            targets: Arc::new(AppenderControlSet::new()),
            shutdown_timeout: Duration::ZERO,
            status,
        }
    }

    /// Replace the queue; only meaningful before the appender is started
    #[must_use]
    pub fn with_queue(
        mut self,
        capacity: usize,
        policy: OverflowPolicy,
        on_overflow: Option<OverflowCallback>,
    ) -> Self {
        self.queue = AsyncQueue::new(self.base.name(), capacity, policy, self.status.clone())
            .with_overflow_callback(on_overflow);
        self
    }

    /// Upper bound for draining the queue on stop; zero uses the caller's timeout
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
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

    pub fn appender_refs(&self) -> &[AppenderRef] {
        &self.refs
    }

    /// Names of the appenders events are forwarded to
    pub fn target_names(&self) -> Vec<String> {
        self.targets
            .get()
            .iter()
            .map(|c| c.appender_name().to_string())
            .collect()
    }

    pub fn metrics(&self) -> &QueueMetrics {
        self.queue.metrics()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    fn forward(targets: &AppenderControlSet, event: &LogEvent, status: &StatusLogger) {
        for control in targets.get().iter() {
            if let Err(e) = control.call_appender(event) {
                status.error(format!(
                    "Async appender failed to forward an event to {}: {}",
                    control.appender_name(),
                    e
                ));
            }
        }
    }
}

impl LifeCycle for AsyncAppender {
    fn state(&self) -> LifeCycleState {
        self.base.state()
    }

    fn start(&self) {
        if self.base.state() == LifeCycleState::Started {
            return;
        }
        if self.targets.is_empty() {
            self.status.error(format!(
                "No appenders are available for AsyncAppender {}",
                self.base.name()
            ));
        }
        let targets = Arc::clone(&self.targets);
        let status = self.status.clone();
        let started = self.queue.start(move |batch: &[LogEvent]| {
            for event in batch {
                Self::forward(&targets, event, &status);
            }
        });
        match started {
            Ok(()) => {
                self.base.start();
            }
            Err(e) => self
                .base
                .handler()
                .error(&format!("Unable to start the async worker: {}", e)),
        }
    }

    fn stop(&self, timeout: Duration) -> bool {
        self.base.set_stopping();
        let drain_timeout = if self.shutdown_timeout.is_zero() {
            timeout
        } else {
            self.shutdown_timeout
        };
        let drained = self.queue.stop(drain_timeout);
        self.base.set_stopped(timeout) && drained
    }
}

impl Appender for AsyncAppender {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn append(&self, event: &LogEvent) -> Result<()> {
        let priority = LogPriority::for_level(event.level);
        self.queue.enqueue(event.clone(), priority, |event| {
            Self::forward(&self.targets, &event, &self.status)
        });
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

    fn is_async(&self) -> bool {
        true
    }

    fn resolve_references(&self, appenders: &[Arc<dyn Appender>], status: &StatusLogger) {
        for appender_ref in &self.refs {
            match appenders.iter().find(|a| a.name() == appender_ref.ref_name()) {
                Some(appender) => {
                    self.targets.add(Arc::new(AppenderControl::from_ref(
                        Arc::clone(appender),
                        appender_ref,
                    )));
                }
                None => status.error(format!(
                    "No appender named {} was configured",
                    appender_ref.ref_name()
                )),
            }
        }
    }
}
