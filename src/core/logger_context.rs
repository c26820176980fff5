//! The context owning the active configuration and the logger handles

use super::appender::Appender;
use super::error::Result;
use super::lifecycle::{LifeCycle, LifeCycleState, StateCell};
use super::logger::Logger;
use super::status::StatusLogger;
use crate::config::{
    Configuration, ConfigurationSettings, ConfigurationSource, Node, PluginRegistry,
};
use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::Duration;

pub const DEFAULT_CONTEXT_NAME: &str = "Default";

/// Owns the active [`Configuration`] and hands out [`Logger`]s
///
/// # Example
///
/// ```
/// use rust_logger_config::core::{LifeCycle, LoggerContext};
///
/// let context = LoggerContext::builder()
///     .json(r#"{ "loggers": { "root": { "level": "warn" } } }"#)
///     .build()
///     .unwrap();
/// let logger = context.get_logger("app");
/// assert!(!logger.is_enabled(rust_logger_config::core::LogLevel::INFO));
/// assert!(context.stop(std::time::Duration::from_secs(1)));
/// ```
pub struct LoggerContext {
    name: String,
    self_ref: Weak<LoggerContext>,
    configuration: ArcSwap<Configuration>,
    loggers: RwLock<HashMap<String, Arc<Logger>>>,
    settings: Arc<ConfigurationSettings>,
    registry: Arc<PluginRegistry>,
    config_lock: Mutex<()>,
    state: StateCell,
    status: StatusLogger,
}

impl LoggerContext {
    pub fn builder() -> LoggerContextBuilder {
        LoggerContextBuilder::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn configuration(&self) -> Arc<Configuration> {
        self.configuration.load_full()
    }

    pub fn settings(&self) -> &Arc<ConfigurationSettings> {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn status(&self) -> &StatusLogger {
        &self.status
    }

    /// The logger for `name`, created on first use
    pub fn get_logger(&self, name: &str) -> Arc<Logger> {
        if let Some(logger) = self.loggers.read().get(name) {
            return Arc::clone(logger);
        }
        let mut loggers = self.loggers.write();
        let logger = loggers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Logger::new(name, &self.configuration.load_full())));
        Arc::clone(logger)
    }

    pub fn has_logger(&self, name: &str) -> bool {
        self.loggers.read().contains_key(name)
    }

    /// Repoint every logger at the LoggerConfig it resolves to now
    pub fn update_loggers(&self) {
        let configuration = self.configuration.load_full();
        for logger in self.loggers.read().values() {
            logger.update_configuration(&configuration);
        }
    }

    /// Start `configuration`, make it active and stop the one it replaces
    ///
    /// Returns the previous configuration.
    pub fn set_configuration(&self, configuration: Arc<Configuration>) -> Arc<Configuration> {
        let _guard = self.config_lock.lock();
        let previous = self.configuration.load_full();
        if let Some(me) = self.self_ref.upgrade() {
            configuration.set_logger_context(&me);
        }
        configuration.start();
        self.configuration.store(Arc::clone(&configuration));
        self.update_loggers();
        if !Arc::ptr_eq(&previous, &configuration) {
            self.status.debug(format!(
                "Replacing configuration {} with {}",
                previous.name(),
                configuration.name()
            ));
            previous.stop(previous.shutdown_timeout());
        }
        previous
    }

    /// Rebuild the active configuration from its source and swap it in
    pub fn reconfigure(&self) -> Result<()> {
        let next = self.configuration().reconfigure()?;
        self.set_configuration(next);
        Ok(())
    }
}

impl LifeCycle for LoggerContext {
    fn state(&self) -> LifeCycleState {
        self.state.get()
    }

    fn start(&self) {
        if self.state.get() == LifeCycleState::Started {
            return;
        }
        self.state.set(LifeCycleState::Starting);
        self.configuration().start();
        self.update_loggers();
        self.state.set(LifeCycleState::Started);
    }

    /// Stop the active configuration; loggers keep working against a null
    /// configuration that logs nothing
    fn stop(&self, timeout: Duration) -> bool {
        let _guard = self.config_lock.lock();
        self.state.set(LifeCycleState::Stopping);
        let null = Configuration::null_configuration(
            Arc::clone(&self.settings),
            Arc::clone(&self.registry),
        );
        let previous = self.configuration.swap(null);
        self.update_loggers();
        let stopped = previous.stop(timeout);
        self.state.set(LifeCycleState::Stopped);
        stopped
    }
}

impl fmt::Debug for LoggerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerContext")
            .field("name", &self.name)
            .field("state", &self.state.get())
            .field("configuration", &self.configuration.load().name())
            .field("loggers", &self.loggers.read().len())
            .finish()
    }
}

enum ConfigInput {
    Default,
    Json(String),
    File(PathBuf),
    Node(Node),
}

/// Builds a started [`LoggerContext`]
pub struct LoggerContextBuilder {
    name: String,
    settings: Option<ConfigurationSettings>,
    registry: Option<Arc<PluginRegistry>>,
    input: ConfigInput,
    appenders: Vec<Arc<dyn Appender>>,
}

impl Default for LoggerContextBuilder {
    fn default() -> Self {
        Self {
            name: DEFAULT_CONTEXT_NAME.to_string(),
            settings: None,
            registry: None,
            input: ConfigInput::Default,
            appenders: Vec::new(),
        }
    }
}

impl LoggerContextBuilder {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Engine settings; taken from the environment when not given
    #[must_use]
    pub fn settings(mut self, settings: ConfigurationSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Plugin registry; the core plugins when not given
    #[must_use]
    pub fn registry(mut self, registry: Arc<PluginRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn json(mut self, json: impl Into<String>) -> Self {
        self.input = ConfigInput::Json(json.into());
        self
    }

    #[must_use]
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.input = ConfigInput::File(path.into());
        self
    }

    #[must_use]
    pub fn node(mut self, root: Node) -> Self {
        self.input = ConfigInput::Node(root);
        self
    }

    /// Register an appender before the configuration is wired, so appender
    /// references can name it
    #[must_use]
    pub fn appender(mut self, appender: Arc<dyn Appender>) -> Self {
        self.appenders.push(appender);
        self
    }

    pub fn build(self) -> Result<Arc<LoggerContext>> {
        let settings = Arc::new(self.settings.unwrap_or_else(ConfigurationSettings::from_env));
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(PluginRegistry::with_core_plugins()));

        let configuration = match self.input {
            ConfigInput::Default => {
                Configuration::default_configuration(Arc::clone(&settings), Arc::clone(&registry))
            }
            ConfigInput::Json(json) => Configuration::from_source(
                ConfigurationSource::from_json_str(json),
                Arc::clone(&settings),
                Arc::clone(&registry),
            )?,
            ConfigInput::File(path) => Configuration::from_source(
                ConfigurationSource::from_file(path)?,
                Arc::clone(&settings),
                Arc::clone(&registry),
            )?,
            ConfigInput::Node(root) => {
                Configuration::new(root, None, Arc::clone(&settings), Arc::clone(&registry))
            }
        };
        for appender in self.appenders {
            configuration.add_appender(appender);
        }

        let status = settings.status().clone();
        let context = Arc::new_cyclic(|me| LoggerContext {
            name: self.name,
            self_ref: me.clone(),
            configuration: ArcSwap::new(Arc::clone(&configuration)),
            loggers: RwLock::new(HashMap::new()),
            settings,
            registry,
            config_lock: Mutex::new(()),
            state: StateCell::new(),
            status,
        });
        configuration.set_logger_context(&context);
        context.start();
        Ok(context)
    }
}
