//! Engine settings resolved once at startup and injected into every configuration

use super::reliability::StrategyFactory;
use crate::core::{
    DefaultLogEventFactory, LogEventFactory, LogLevel, LoggerError, OverflowPolicy, Result,
    StatusLogger,
};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Prefix of the environment variables read by [`ConfigurationSettings::from_env`]
pub const ENV_PREFIX: &str = "RLC_";

pub const DEFAULT_RELIABILITY_STRATEGY: &str = "AwaitCompletion";

/// # Example
///
/// ```
/// use rust_logger_config::config::ConfigurationSettings;
/// use rust_logger_config::core::LogLevel;
///
/// let settings = ConfigurationSettings::from_json(r#"{"default_level": "warn"}"#).unwrap();
/// assert_eq!(settings.default_level, LogLevel::WARN);
/// assert_eq!(settings.reliability_strategy, "AwaitCompletion");
/// ```
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ConfigurationSettings {
    /// Level of the root LoggerConfig when a configuration has to synthesize one
    pub default_level: LogLevel,

    /// Status entries at or above this level are echoed to stderr
    pub status_level: LogLevel,

    /// `AwaitCompletion`, `AwaitUnconditionally`, `Locking` or `Default`
    pub reliability_strategy: String,

    /// Pause used by `AwaitUnconditionally` before appenders are stopped
    pub wait_for_millis: u64,

    pub shutdown_timeout_millis: u64,

    /// Capacity of the async logger queue
    pub async_queue_size: usize,

    #[serde(deserialize_with = "deserialize_overflow_policy")]
    pub async_overflow_policy: OverflowPolicy,

    /// Values for `${sys:..}` lookups and `SystemPropertyArbiter`
    pub system_properties: BTreeMap<String, String>,

    #[serde(skip, default = "default_event_factory")]
    event_factory: Arc<dyn LogEventFactory>,

    #[serde(skip)]
    strategy_factory: Option<StrategyFactory>,

    #[serde(skip)]
    status: StatusLogger,
}

fn default_event_factory() -> Arc<dyn LogEventFactory> {
    Arc::new(DefaultLogEventFactory)
}

fn deserialize_overflow_policy<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<OverflowPolicy, D::Error> {
    let name = String::deserialize(deserializer)?;
    name.parse().map_err(serde::de::Error::custom)
}

impl Default for ConfigurationSettings {
    fn default() -> Self {
        Self {
            default_level: LogLevel::ERROR,
            status_level: LogLevel::WARN,
            reliability_strategy: DEFAULT_RELIABILITY_STRATEGY.to_string(),
            wait_for_millis: 5000,
            shutdown_timeout_millis: 5000,
            async_queue_size: 1024,
            async_overflow_policy: OverflowPolicy::default(),
            system_properties: BTreeMap::new(),
            event_factory: default_event_factory(),
            strategy_factory: None,
            status: StatusLogger::new(LogLevel::WARN),
        }
    }
}

impl ConfigurationSettings {
    /// Settings from `RLC_*` environment variables
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    /// Unparseable values keep their default and are reported as warnings.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(value) = var("STATUS_LEVEL") {
            match value.parse() {
                Ok(level) => settings.status_level = level,
                Err(e) => settings.status.warn(format!("Ignoring {}STATUS_LEVEL: {}", ENV_PREFIX, e)),
            }
        }
        settings.status.set_echo_level(settings.status_level);

        if let Some(value) = var("DEFAULT_LEVEL") {
            match value.parse() {
                Ok(level) => settings.default_level = level,
                Err(e) => settings.status.warn(format!("Ignoring {}DEFAULT_LEVEL: {}", ENV_PREFIX, e)),
            }
        }
        if let Some(value) = var("RELIABILITY_STRATEGY") {
            settings.reliability_strategy = value.trim().to_string();
        }
        if let Some(value) = var("WAIT_FOR_MILLIS") {
            settings.parse_env_number("WAIT_FOR_MILLIS", &value, |s, v| s.wait_for_millis = v);
        }
        if let Some(value) = var("SHUTDOWN_TIMEOUT_MILLIS") {
            settings.parse_env_number("SHUTDOWN_TIMEOUT_MILLIS", &value, |s, v| {
                s.shutdown_timeout_millis = v
            });
        }
        if let Some(value) = var("ASYNC_QUEUE_SIZE") {
            settings.parse_env_number("ASYNC_QUEUE_SIZE", &value, |s, v| {
                s.async_queue_size = v as usize
            });
        }
        if let Some(value) = var("ASYNC_OVERFLOW_POLICY") {
            match value.parse() {
                Ok(policy) => settings.async_overflow_policy = policy,
                Err(e) => settings
                    .status
                    .warn(format!("Ignoring {}ASYNC_OVERFLOW_POLICY: {}", ENV_PREFIX, e)),
            }
        }
        settings
    }

    fn parse_env_number(&mut self, name: &str, value: &str, apply: impl FnOnce(&mut Self, u64)) {
        match value.trim().parse::<u64>() {
            Ok(number) => apply(self, number),
            Err(e) => self
                .status
                .warn(format!("Ignoring {}{}: {}", ENV_PREFIX, name, e)),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        if settings.async_queue_size == 0 {
            return Err(LoggerError::config(
                "ConfigurationSettings",
                "async_queue_size must be greater than zero",
            ));
        }
        settings.status.set_echo_level(settings.status_level);
        Ok(settings)
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_default_level(mut self, level: LogLevel) -> Self {
        self.default_level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_reliability_strategy(mut self, name: impl Into<String>) -> Self {
        self.reliability_strategy = name.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_wait_for_millis(mut self, millis: u64) -> Self {
        self.wait_for_millis = millis;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout_millis = timeout.as_millis() as u64;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_async_queue(mut self, size: usize, policy: OverflowPolicy) -> Self {
        self.async_queue_size = size.max(1);
        self.async_overflow_policy = policy;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_system_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.system_properties.insert(key.into(), value.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_event_factory(mut self, factory: Arc<dyn LogEventFactory>) -> Self {
        self.event_factory = factory;
        self
    }

    /// Build reliability strategies with `factory` instead of by name
    #[must_use = "builder methods return a new value"]
    pub fn with_strategy_factory(mut self, factory: StrategyFactory) -> Self {
        self.strategy_factory = Some(factory);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_status(mut self, status: StatusLogger) -> Self {
        self.status = status;
        self
    }

    pub fn event_factory(&self) -> &Arc<dyn LogEventFactory> {
        &self.event_factory
    }

    pub fn strategy_factory(&self) -> Option<&StrategyFactory> {
        self.strategy_factory.as_ref()
    }

    pub fn status(&self) -> &StatusLogger {
        &self.status
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_millis)
    }

    pub fn wait_for(&self) -> Duration {
        Duration::from_millis(self.wait_for_millis)
    }
}

impl fmt::Debug for ConfigurationSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationSettings")
            .field("default_level", &self.default_level)
            .field("status_level", &self.status_level)
            .field("reliability_strategy", &self.reliability_strategy)
            .field("wait_for_millis", &self.wait_for_millis)
            .field("shutdown_timeout_millis", &self.shutdown_timeout_millis)
            .field("async_queue_size", &self.async_queue_size)
            .field("async_overflow_policy", &self.async_overflow_policy)
            .field("system_properties", &self.system_properties)
            .field("event_factory", &self.event_factory)
            .field("custom_strategy", &self.strategy_factory.is_some())
            .finish()
    }
}
