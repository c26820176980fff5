//! The configuration engine
//!
//! A configuration starts as a [`Node`] tree (usually parsed from JSON),
//! has its conditionals resolved, is built into components by the
//! [`ConfigurationProcessor`] and wired into a [`LoggerConfig`] hierarchy
//! bound to appenders. The [`Configuration`] aggregate owns the result and
//! its lifecycle.

pub mod appender_control;
pub mod appender_control_set;
pub mod appender_ref;
pub mod arbiter;
pub mod async_delegate;
pub mod configuration;
pub mod core_plugins;
pub mod json;
pub mod logger_config;
pub mod lookup;
pub mod node;
pub mod plugin;
pub mod processor;
pub mod property;
pub mod reliability;
pub mod settings;
pub mod source;
pub mod watch;

pub use appender_control::AppenderControl;
pub use appender_control_set::AppenderControlSet;
pub use appender_ref::AppenderRef;
pub use arbiter::{
    process_conditionals, Arbiter, DefaultArbiter, EnvironmentArbiter, SelectArbiter,
    SystemPropertyArbiter,
};
pub use async_delegate::AsyncLoggerDelegate;
pub use configuration::Configuration;
pub use json::{parse_json, ROOT_NODE_NAME};
pub use logger_config::{
    LogRequest, LoggerConfig, LoggerConfigBuilder, Loggers, DEFAULT_ROOT_LEVEL, ROOT_LOGGER_NAME,
};
pub use lookup::Interpolator;
pub use node::Node;
pub use plugin::{
    Component, PluginContext, PluginEnv, PluginFactory, PluginKind, PluginRegistry, PluginType,
    CORE_NAMESPACE,
};
pub use processor::ConfigurationProcessor;
pub use property::{CustomLevelConfig, Property};
pub use reliability::{
    create_strategy, AwaitCompletionReliabilityStrategy, AwaitUnconditionallyReliabilityStrategy,
    DefaultReliabilityStrategy, LockingReliabilityStrategy, NextConfig, ReliabilityStrategy,
    StrategyFactory, MAX_RETRIES,
};
pub use settings::{ConfigurationSettings, DEFAULT_RELIABILITY_STRATEGY, ENV_PREFIX};
pub use source::ConfigurationSource;
pub use watch::{ChangeListener, ConfigurationScheduler, FileWatcher, WatchManager, Watcher};
