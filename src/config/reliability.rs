//! Reliability strategies
//!
//! A strategy decides which LoggerConfig a log call runs against while a
//! configuration is being replaced, and keeps the outgoing configuration's
//! appenders alive until calls already in flight have finished.

use super::configuration::Configuration;
use super::logger_config::{LogRequest, LoggerConfig};
use super::settings::ConfigurationSettings;
use crate::core::{LogEvent, Result, StatusLogger};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Timed-out waits tolerated by the await-completion drain before it gives up
pub const MAX_RETRIES: u32 = 3;

/// Supplies the LoggerConfig a logger currently points at
pub type NextConfig<'a> = &'a dyn Fn() -> Arc<LoggerConfig>;

/// Builds a strategy for the LoggerConfig behind the weak reference
pub type StrategyFactory =
    Arc<dyn Fn(Weak<LoggerConfig>) -> Box<dyn ReliabilityStrategy> + Send + Sync>;

pub trait ReliabilityStrategy: Send + Sync + fmt::Debug {
    /// Log `request` against the active LoggerConfig
    fn log(&self, next: NextConfig<'_>, request: &LogRequest<'_>) -> Result<()> {
        let config = self.active_logger_config(next);
        let _done = AfterLogEvent(&config);
        config.log_request(request)
    }

    /// Log an already built event against the active LoggerConfig
    fn log_event(&self, next: NextConfig<'_>, event: &LogEvent) -> Result<()> {
        let config = self.active_logger_config(next);
        let _done = AfterLogEvent(&config);
        config.log_event(event)
    }

    /// The LoggerConfig to log against. Every call must be matched by one
    /// `after_log_event` on the returned config's strategy.
    fn active_logger_config(&self, next: NextConfig<'_>) -> Arc<LoggerConfig>;

    fn after_log_event(&self);

    /// Called for every LoggerConfig before any appender of the configuration is stopped
    fn before_stop_appenders(&self);

    /// Called first when the configuration starts stopping
    fn before_stop_configuration(&self, configuration: &Configuration);

    fn name(&self) -> &'static str;
}

/// Runs `after_log_event` on the chosen config's strategy, even when appending panics
struct AfterLogEvent<'a>(&'a Arc<LoggerConfig>);

impl Drop for AfterLogEvent<'_> {
    fn drop(&mut self) {
        self.0.reliability_strategy().after_log_event();
    }
}

/// Follow `next` to whichever config is live, falling back to `own` when it comes back around
fn redirect(own: Option<Arc<LoggerConfig>>, next: NextConfig<'_>) -> Arc<LoggerConfig> {
    let result = next();
    match own {
        Some(own) if Arc::ptr_eq(&own, &result) => result,
        _ => result.reliability_strategy().active_logger_config(next),
    }
}

/// Counts calls in flight and waits for them to finish before appenders stop
///
/// Once drained the counter holds `i32::MIN`, so every later call sees a
/// non-positive count and moves on to the LoggerConfig supplied by `next`.
pub struct AwaitCompletionReliabilityStrategy {
    config: Weak<LoggerConfig>,
    counter: AtomicI32,
    shutdown: AtomicBool,
    lock: Mutex<()>,
    no_log_events: Condvar,
    status: StatusLogger,
}

impl AwaitCompletionReliabilityStrategy {
    pub fn new(config: Weak<LoggerConfig>, status: StatusLogger) -> Self {
        Self {
            config,
            counter: AtomicI32::new(0),
            shutdown: AtomicBool::new(false),
            lock: Mutex::new(()),
            no_log_events: Condvar::new(),
            status,
        }
    }

    fn before_log_event(&self) -> bool {
        self.counter.fetch_add(1, Ordering::SeqCst).wrapping_add(1) > 0
    }

    /// Current in-flight count; negative once drained
    pub fn in_flight(&self) -> i32 {
        self.counter.load(Ordering::SeqCst)
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    fn config_name(&self) -> String {
        self.config
            .upgrade()
            .map(|c| c.name().to_string())
            .unwrap_or_default()
    }
}

impl ReliabilityStrategy for AwaitCompletionReliabilityStrategy {
    fn active_logger_config(&self, next: NextConfig<'_>) -> Arc<LoggerConfig> {
        let own = self.config.upgrade();
        if self.before_log_event() {
            if let Some(own) = own {
                return own;
            }
            return next();
        }
        redirect(own, next)
    }

    fn after_log_event(&self) {
        let remaining = self.counter.fetch_sub(1, Ordering::SeqCst).wrapping_sub(1);
        if remaining == 0 && self.shutdown.load(Ordering::SeqCst) {
            let _lock = self.lock.lock();
            self.no_log_events.notify_all();
        }
    }

    fn before_stop_appenders(&self) {
        let mut guard = self.lock.lock();
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut retries = 0;
        loop {
            match self
                .counter
                .compare_exchange(0, i32::MIN, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return,
                Err(current) if current < 0 => return,
                Err(_) => {
                    let timeout = Duration::from_secs(u64::from(retries) + 1);
                    if self.no_log_events.wait_for(&mut guard, timeout).timed_out() {
                        retries += 1;
                        if retries > MAX_RETRIES {
                            self.status.warn(format!(
                                "LoggerConfig \"{}\" still has {} log calls in flight; stopping appenders anyway",
                                self.config_name(),
                                self.in_flight()
                            ));
                            return;
                        }
                    }
                }
            }
        }
    }

    fn before_stop_configuration(&self, _configuration: &Configuration) {}

    fn name(&self) -> &'static str {
        "AwaitCompletion"
    }
}

impl fmt::Debug for AwaitCompletionReliabilityStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwaitCompletionReliabilityStrategy")
            .field("counter", &self.in_flight())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

/// Sleeps for a fixed time once per configuration stop
pub struct AwaitUnconditionallyReliabilityStrategy {
    config: Weak<LoggerConfig>,
    wait_for: Duration,
}

impl AwaitUnconditionallyReliabilityStrategy {
    pub fn new(config: Weak<LoggerConfig>, wait_for: Duration) -> Self {
        Self { config, wait_for }
    }
}

impl ReliabilityStrategy for AwaitUnconditionallyReliabilityStrategy {
    fn active_logger_config(&self, next: NextConfig<'_>) -> Arc<LoggerConfig> {
        self.config.upgrade().unwrap_or_else(next)
    }

    fn after_log_event(&self) {}

    fn before_stop_appenders(&self) {}

    fn before_stop_configuration(&self, configuration: &Configuration) {
        // Only the root sleeps, so the pause happens once per configuration.
        let is_root = self
            .config
            .upgrade()
            .is_some_and(|own| Arc::ptr_eq(&own, &configuration.root_logger()));
        if is_root {
            std::thread::sleep(self.wait_for);
        }
    }

    fn name(&self) -> &'static str {
        "AwaitUnconditionally"
    }
}

impl fmt::Debug for AwaitUnconditionallyReliabilityStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwaitUnconditionallyReliabilityStrategy")
            .field("wait_for", &self.wait_for)
            .finish()
    }
}

#[derive(Debug, Default)]
struct LockState {
    readers: usize,
    stopping: bool,
}

/// Log calls share a read side; stopping appenders takes the write side
pub struct LockingReliabilityStrategy {
    config: Weak<LoggerConfig>,
    state: Mutex<LockState>,
    readers_done: Condvar,
}

impl LockingReliabilityStrategy {
    pub fn new(config: Weak<LoggerConfig>) -> Self {
        Self {
            config,
            state: Mutex::new(LockState::default()),
            readers_done: Condvar::new(),
        }
    }

    fn enter(&self, force: bool) -> bool {
        let mut state = self.state.lock();
        if state.stopping && !force {
            return false;
        }
        state.readers += 1;
        true
    }

    pub fn is_stopping(&self) -> bool {
        self.state.lock().stopping
    }
}

impl ReliabilityStrategy for LockingReliabilityStrategy {
    fn active_logger_config(&self, next: NextConfig<'_>) -> Arc<LoggerConfig> {
        let own = self.config.upgrade();
        if self.enter(false) {
            if let Some(own) = own {
                return own;
            }
            self.after_log_event();
            return next();
        }
        let result = next();
        match own {
            Some(own) if Arc::ptr_eq(&own, &result) => {
                // The supplier still points here; the call is counted so the
                // matching after_log_event stays balanced.
                self.enter(true);
                result
            }
            _ => result.reliability_strategy().active_logger_config(next),
        }
    }

    fn after_log_event(&self) {
        let mut state = self.state.lock();
        state.readers = state.readers.saturating_sub(1);
        if state.readers == 0 {
            self.readers_done.notify_all();
        }
    }

    fn before_stop_appenders(&self) {
        let mut state = self.state.lock();
        state.stopping = true;
        while state.readers > 0 {
            self.readers_done.wait(&mut state);
        }
    }

    fn before_stop_configuration(&self, _configuration: &Configuration) {}

    fn name(&self) -> &'static str {
        "Locking"
    }
}

impl fmt::Debug for LockingReliabilityStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("LockingReliabilityStrategy")
            .field("readers", &state.readers)
            .field("stopping", &state.stopping)
            .finish()
    }
}

/// No coordination: calls always run against the config they started on
pub struct DefaultReliabilityStrategy {
    config: Weak<LoggerConfig>,
}

impl DefaultReliabilityStrategy {
    pub fn new(config: Weak<LoggerConfig>) -> Self {
        Self { config }
    }
}

impl ReliabilityStrategy for DefaultReliabilityStrategy {
    fn active_logger_config(&self, next: NextConfig<'_>) -> Arc<LoggerConfig> {
        self.config.upgrade().unwrap_or_else(next)
    }

    fn after_log_event(&self) {}

    fn before_stop_appenders(&self) {}

    fn before_stop_configuration(&self, _configuration: &Configuration) {}

    fn name(&self) -> &'static str {
        "Default"
    }
}

impl fmt::Debug for DefaultReliabilityStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DefaultReliabilityStrategy")
    }
}

/// Strategy for a new LoggerConfig as selected by `settings`
pub fn create_strategy(
    config: Weak<LoggerConfig>,
    settings: &ConfigurationSettings,
) -> Box<dyn ReliabilityStrategy> {
    if let Some(factory) = settings.strategy_factory() {
        return factory(config);
    }
    match settings.reliability_strategy.to_lowercase().as_str() {
        "awaitcompletion" => Box::new(AwaitCompletionReliabilityStrategy::new(
            config,
            settings.status().clone(),
        )),
        "awaitunconditionally" => Box::new(AwaitUnconditionallyReliabilityStrategy::new(
            config,
            settings.wait_for(),
        )),
        "locking" => Box::new(LockingReliabilityStrategy::new(config)),
        "default" => Box::new(DefaultReliabilityStrategy::new(config)),
        other => {
            settings.status().error(format!(
                "Unknown reliability strategy \"{}\", using AwaitCompletion",
                other
            ));
            Box::new(AwaitCompletionReliabilityStrategy::new(
                config,
                settings.status().clone(),
            ))
        }
    }
}
