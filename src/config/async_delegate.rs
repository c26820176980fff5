//! Background dispatch for asynchronous LoggerConfigs

use super::logger_config::LoggerConfig;
use crate::core::{
    AsyncQueue, LifeCycle, LifeCycleState, LogEvent, LogPriority, OverflowPolicy, QueueMetrics,
    StateCell, StatusLogger,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

type QueuedEvent = (Arc<LoggerConfig>, LogEvent);

/// One per configuration; started only when some LoggerConfig is asynchronous
///
/// An async LoggerConfig enqueues the event together with itself; the worker
/// calls that config's appenders. Additive propagation to parents has already
/// happened on the caller's thread.
pub struct AsyncLoggerDelegate {
    queue: AsyncQueue<QueuedEvent>,
    state: StateCell,
    status: StatusLogger,
}

impl AsyncLoggerDelegate {
    pub fn new(capacity: usize, policy: OverflowPolicy, status: StatusLogger) -> Self {
        Self {
            queue: AsyncQueue::new("AsyncLoggerConfig", capacity, policy, status.clone()),
            state: StateCell::new(),
            status,
        }
    }

    pub fn is_running(&self) -> bool {
        self.queue.is_running()
    }

    pub fn metrics(&self) -> &QueueMetrics {
        self.queue.metrics()
    }

    pub fn enqueue(&self, config: Arc<LoggerConfig>, event: LogEvent) {
        let priority = LogPriority::for_level(event.level);
        self.queue
            .enqueue((config, event), priority, |(config, event)| dispatch(&config, &event));
    }
}

fn dispatch(config: &LoggerConfig, event: &LogEvent) {
    if let Err(e) = config.call_appenders_sync(event) {
        config.status().error(format!(
            "Async LoggerConfig \"{}\" failed to dispatch an event: {}",
            config.name(),
            e
        ));
    }
}

impl LifeCycle for AsyncLoggerDelegate {
    fn state(&self) -> LifeCycleState {
        self.state.get()
    }

    fn start(&self) {
        if self.is_running() {
            return;
        }
        self.state.set(LifeCycleState::Starting);
        let started = self.queue.start(|batch: &[QueuedEvent]| {
            for (config, event) in batch {
                dispatch(config, event);
            }
        });
        match started {
            Ok(()) => self.state.set(LifeCycleState::Started),
            Err(e) => {
                self.status
                    .error(format!("Unable to start the async logger delegate: {}", e));
                self.state.set(LifeCycleState::Stopped);
            }
        }
    }

    fn stop(&self, timeout: Duration) -> bool {
        self.state.set(LifeCycleState::Stopping);
        let drained = self.queue.stop(timeout);
        self.state.set(LifeCycleState::Stopped);
        drained
    }
}

impl fmt::Debug for AsyncLoggerDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncLoggerDelegate")
            .field("state", &self.state.get())
            .field("capacity", &self.queue.capacity())
            .field("policy", self.queue.policy())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appenders::ListAppender;
    use crate::config::plugin::PluginEnv;
    use crate::config::settings::ConfigurationSettings;
    use crate::core::LogLevel;

    #[test]
    fn test_async_config_dispatches_on_worker() {
        let settings = ConfigurationSettings::default().with_status(StatusLogger::silent());
        let env = PluginEnv::new(Arc::new(settings));
        let config = LoggerConfig::builder("async").asynchronous(true).build(&env);
        let list = Arc::new(ListAppender::new("LIST", StatusLogger::silent()));
        list.start();
        config.add_appender(list.clone(), None, None);

        env.async_delegate().start();
        for i in 0..20 {
            config
                .log_event(&LogEvent::new("async", LogLevel::INFO, format!("m{}", i)))
                .unwrap();
        }
        assert!(env.async_delegate().stop(Duration::from_secs(5)));

        assert_eq!(list.len(), 20);
        let caller = format!("{:?}", std::thread::current().id());
        assert!(list.events().iter().all(|e| e.thread_id == caller));
        assert_eq!(env.async_delegate().metrics().total_processed(), 20);
    }

    #[test]
    fn test_stopped_delegate_dispatches_synchronously() {
        let settings = ConfigurationSettings::default().with_status(StatusLogger::silent());
        let env = PluginEnv::new(Arc::new(settings));
        let config = LoggerConfig::builder("async").asynchronous(true).build(&env);
        let list = Arc::new(ListAppender::new("LIST", StatusLogger::silent()));
        list.start();
        config.add_appender(list.clone(), None, None);

        config.log_event(&LogEvent::new("async", LogLevel::INFO, "now")).unwrap();
        assert_eq!(list.len(), 1);
    }
}
