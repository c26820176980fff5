//! The configuration aggregate: node tree, LoggerConfig map, appenders and lifecycle

use super::arbiter::process_conditionals;
use super::logger_config::LoggerConfig;
use super::node::Node;
use super::plugin::{Component, PluginEnv, PluginRegistry};
use super::processor::ConfigurationProcessor;
use super::property::CustomLevelConfig;
use super::settings::ConfigurationSettings;
use super::source::ConfigurationSource;
use super::watch::{ChangeListener, ConfigurationScheduler, FileWatcher, WatchManager};
use crate::appenders::ConsoleAppender;
use crate::core::{
    Appender, Filter, Filterable, LifeCycle, LifeCycleState, LogLevel, LoggerContext, LoggerError,
    Result, StateCell, StatusLogger,
};
use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

/// Top-level elements a component may appear under
const CONTAINER_NAMES: &str = "[\"Appenders\", \"Loggers\", \"Properties\", \"Filters\", \"CustomLevels\"]";

static DEFAULT_CONSOLE_COUNT: AtomicUsize = AtomicUsize::new(0);

/// A complete, independently startable logging configuration
///
/// Built from a node tree, wired by [`initialize`](Configuration::initialize)
/// and run through `start`/`stop`. A running configuration is only changed
/// through the mutation methods, which serialize on one lock; log calls read
/// the logger map and appenders without locking. Reconfiguration builds a new
/// Configuration and lets the owning [`LoggerContext`] swap it in.
pub struct Configuration {
    name: RwLock<String>,
    root_node: Mutex<Node>,
    state: StateCell,
    registry: Arc<PluginRegistry>,
    env: Arc<PluginEnv>,
    processor: ConfigurationProcessor,
    source: Option<ConfigurationSource>,
    appenders: ArcSwap<Vec<Arc<dyn Appender>>>,
    logger_configs: ArcSwap<HashMap<String, Arc<LoggerConfig>>>,
    root: ArcSwap<LoggerConfig>,
    custom_levels: RwLock<Vec<CustomLevelConfig>>,
    filter: Filterable,
    config_lock: Mutex<()>,
    scheduler: ConfigurationScheduler,
    watch_manager: WatchManager,
    monitor_interval: Duration,
    shutdown_timeout: Duration,
    context: RwLock<Option<Weak<LoggerContext>>>,
    self_ref: Weak<Configuration>,
    status: StatusLogger,
}

impl Configuration {
    /// A configuration for `root`, not yet initialized
    ///
    /// Reads the root attributes `name`, `status`, `monitorInterval`
    /// (seconds) and `shutdownTimeout` (milliseconds).
    pub fn new(
        root: Node,
        source: Option<ConfigurationSource>,
        settings: Arc<ConfigurationSettings>,
        registry: Arc<PluginRegistry>,
    ) -> Arc<Self> {
        let env = Arc::new(PluginEnv::new(Arc::clone(&settings)));
        let status = env.status().clone();

        if let Some(level) = root.attribute("status") {
            match LogLevel::get(level) {
                Some(level) => status.set_echo_level(level),
                None => status.error(format!("Invalid status level \"{}\"", level)),
            }
        }
        let monitor_interval = Duration::from_secs(parse_number(&root, "monitorInterval", &status));
        let shutdown_timeout = match root.attribute("shutdownTimeout") {
            Some(_) => Duration::from_millis(parse_number(&root, "shutdownTimeout", &status)),
            None => settings.shutdown_timeout(),
        };
        let name = root
            .attribute("name")
            .map(str::to_string)
            .or_else(|| source.as_ref().and_then(|s| s.location()).map(|p| p.display().to_string()))
            .unwrap_or_else(|| "Configuration".to_string());

        let root_config = LoggerConfig::root_builder()
            .level(settings.default_level)
            .build(&env);
        let processor = ConfigurationProcessor::new(Arc::clone(&registry), Arc::clone(&env));

        Arc::new_cyclic(|me| Configuration {
            scheduler: ConfigurationScheduler::new(format!("{}-scheduler", name), status.clone()),
            name: RwLock::new(name),
            root_node: Mutex::new(root),
            state: StateCell::new(),
            registry,
            env,
            processor,
            source,
            appenders: ArcSwap::from_pointee(Vec::new()),
            logger_configs: ArcSwap::from_pointee(HashMap::new()),
            root: ArcSwap::new(root_config),
            custom_levels: RwLock::new(Vec::new()),
            filter: Filterable::default(),
            config_lock: Mutex::new(()),
            watch_manager: WatchManager::new(status.clone()),
            monitor_interval,
            shutdown_timeout,
            context: RwLock::new(None),
            self_ref: me.clone(),
            status,
        })
    }

    /// Parse `source` and build a configuration from it
    pub fn from_source(
        source: ConfigurationSource,
        settings: Arc<ConfigurationSettings>,
        registry: Arc<PluginRegistry>,
    ) -> Result<Arc<Self>> {
        let root = source.parse()?;
        Ok(Self::new(root, Some(source), settings, registry))
    }

    /// Logs nothing; installed in a context that has been stopped
    pub fn null_configuration(
        settings: Arc<ConfigurationSettings>,
        registry: Arc<PluginRegistry>,
    ) -> Arc<Self> {
        let configuration = Self::new(Node::new("Configuration"), None, settings, registry);
        *configuration.name.write() = "Null".to_string();
        configuration.root_logger().set_level(Some(LogLevel::OFF));
        configuration.state.set(LifeCycleState::Initialized);
        configuration
    }

    /// Root at the default level writing to a console appender
    pub fn default_configuration(
        settings: Arc<ConfigurationSettings>,
        registry: Arc<PluginRegistry>,
    ) -> Arc<Self> {
        let configuration = Self::new(Node::new("Configuration"), None, settings, registry);
        configuration.set_to_default();
        configuration.state.set(LifeCycleState::Initialized);
        configuration
    }

    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    pub fn source(&self) -> Option<&ConfigurationSource> {
        self.source.as_ref()
    }

    pub fn settings(&self) -> &Arc<ConfigurationSettings> {
        self.env.settings()
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn env(&self) -> &PluginEnv {
        &self.env
    }

    pub fn status(&self) -> &StatusLogger {
        &self.status
    }

    pub fn scheduler(&self) -> &ConfigurationScheduler {
        &self.scheduler
    }

    pub fn watch_manager(&self) -> &WatchManager {
        &self.watch_manager
    }

    pub fn monitor_interval(&self) -> Duration {
        self.monitor_interval
    }

    /// Default timeout used when the owning context stops this configuration
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Run `f` against the node tree as it stands after wiring
    pub fn with_root_node<R>(&self, f: impl FnOnce(&Node) -> R) -> R {
        f(&self.root_node.lock())
    }

    pub fn root_logger(&self) -> Arc<LoggerConfig> {
        self.root.load_full()
    }

    /// Snapshot of the LoggerConfig map, root included when it was configured
    pub fn loggers(&self) -> Arc<HashMap<String, Arc<LoggerConfig>>> {
        self.logger_configs.load_full()
    }

    /// Appenders in registration order
    pub fn appenders(&self) -> Arc<Vec<Arc<dyn Appender>>> {
        self.appenders.load_full()
    }

    pub fn get_appender(&self, name: &str) -> Option<Arc<dyn Appender>> {
        self.appenders
            .load()
            .iter()
            .find(|a| a.name() == name)
            .cloned()
    }

    pub fn custom_levels(&self) -> Vec<CustomLevelConfig> {
        self.custom_levels.read().clone()
    }

    /// The configuration-wide filter, consulted by loggers before the level check
    pub fn filter(&self) -> &Filterable {
        &self.filter
    }

    pub fn add_filter(&self, filter: Arc<dyn Filter>) {
        self.filter.add_filter(filter);
    }

    /// The LoggerConfig for `name` or its closest configured ancestor
    ///
    /// `a.b.c` is looked up as `a.b.c`, `a.b`, `a` and finally the root.
    pub fn get_logger_config(&self, name: &str) -> Arc<LoggerConfig> {
        let map = self.logger_configs.load();
        if let Some(config) = map.get(name) {
            return Arc::clone(config);
        }
        let mut candidate = sub_name(name);
        while let Some(prefix) = candidate {
            if let Some(config) = map.get(prefix) {
                return Arc::clone(config);
            }
            candidate = sub_name(prefix);
        }
        self.root_logger()
    }

    /// Point every LoggerConfig at its closest configured ancestor
    fn set_parents(&self) {
        let map = self.logger_configs.load();
        for (key, config) in map.iter() {
            if key.is_empty() {
                continue;
            }
            let parent = match key.rfind('.') {
                Some(i) if i > 0 => self.get_logger_config(&key[..i]),
                _ => self.root_logger(),
            };
            config.set_parent(Some(parent));
        }
    }

    fn has_async_logger_configs(&self) -> bool {
        self.root_logger().is_asynchronous()
            || self
                .logger_configs
                .load()
                .values()
                .any(|c| c.is_asynchronous())
    }

    /// Every distinct LoggerConfig, root last
    fn all_logger_configs(&self) -> Vec<Arc<LoggerConfig>> {
        let root = self.root_logger();
        let mut configs: Vec<Arc<LoggerConfig>> = self
            .logger_configs
            .load()
            .values()
            .filter(|c| !Arc::ptr_eq(c, &root))
            .cloned()
            .collect();
        configs.push(root);
        configs
    }

    /// Process conditionals and wire the component graph
    ///
    /// Does nothing unless the configuration is still initializing.
    pub fn initialize(&self) {
        if self.state.get() != LifeCycleState::Initializing {
            return;
        }
        self.status.debug(format!("Initializing configuration {}", self.name()));
        let mut root = self.root_node.lock();
        self.processor.resolve_types(&mut root);
        process_conditionals(&mut root, &self.processor);
        let scheduled = self.processor.pre_configure(&root);
        self.scheduler.increment_scheduled_items(scheduled);
        self.do_configure(&mut root);
        drop(root);
        self.state.set(LifeCycleState::Initialized);
    }

    fn do_configure(&self, root: &mut Node) {
        let children = root.children_mut();
        if let Some(first) = children.first_mut() {
            if first.name().eq_ignore_ascii_case("properties") {
                if let Some(Component::Properties(properties)) = self.processor.process_node_tree(first) {
                    self.env.interpolator().set_properties(
                        properties
                            .iter()
                            .map(|p| (p.name().to_string(), p.value().to_string())),
                    );
                }
            }
        }

        // Appenders registered before initialization are visible to references.
        let mut appenders: Vec<Arc<dyn Appender>> = (*self.appenders.load_full()).clone();
        let mut loggers = None;
        for (index, child) in children.iter_mut().enumerate() {
            if child.name().eq_ignore_ascii_case("properties") {
                if index > 0 {
                    self.status.error(
                        "Properties declaration must be the first element in the configuration",
                    );
                }
                continue;
            }
            let Some(component) = self.processor.process_node_tree(child) else {
                continue;
            };
            match (child.name().to_ascii_lowercase().as_str(), component) {
                ("appenders", Component::Appenders(list)) => {
                    for appender in list {
                        if appenders.iter().any(|a| a.name() == appender.name()) {
                            self.status.error(format!(
                                "Appender {} is configured more than once; keeping the first",
                                appender.name()
                            ));
                        } else {
                            appenders.push(appender);
                        }
                    }
                }
                (_, Component::Filter(filter)) => self.filter.add_filter(filter),
                ("loggers", Component::Loggers(found)) => loggers = Some(found),
                ("customlevels", Component::CustomLevels(levels)) => {
                    self.custom_levels.write().extend(levels)
                }
                ("customlevel", Component::CustomLevel(level)) => {
                    self.custom_levels.write().push(level)
                }
                (_, other) => self.status.error(format!(
                    "Unknown object \"{}\" of type {} is ignored: try nesting it inside one of: {}",
                    child.name(),
                    other.kind(),
                    CONTAINER_NAMES
                )),
            }
        }

        for appender in &appenders {
            appender.resolve_references(&appenders, &self.status);
        }
        self.appenders.store(Arc::new(appenders));

        let Some(loggers) = loggers else {
            self.status
                .warn("No Loggers were configured, using default. Is the Loggers element missing?");
            self.set_to_default();
            return;
        };

        self.logger_configs.store(Arc::new(loggers.map().clone()));
        match loggers.root() {
            Some(root) => self.root.store(Arc::clone(root)),
            None => {
                self.status.warn(
                    "No Root logger was configured, creating default ERROR-level Root logger with Console appender",
                );
                self.add_default_root_appender();
            }
        }

        for config in self.all_logger_configs() {
            for appender_ref in config.appender_refs() {
                match self.get_appender(appender_ref.ref_name()) {
                    Some(appender) => {
                        config.add_appender(appender, appender_ref.level(), appender_ref.filter().cloned());
                    }
                    None => self.status.error(format!(
                        "Unable to locate appender \"{}\" for logger config \"{}\"",
                        appender_ref.ref_name(),
                        display_name(&config)
                    )),
                }
            }
        }
        self.set_parents();
    }

    /// Fall back to the default configuration as a whole
    fn set_to_default(&self) {
        *self.name.write() = format!("Default@{:x}", self as *const Self as usize);
        self.add_default_root_appender();
    }

    /// Give the root a started console appender and the default level
    fn add_default_root_appender(&self) {
        let count = DEFAULT_CONSOLE_COUNT.fetch_add(1, Ordering::Relaxed) + 1;
        let appender: Arc<dyn Appender> = Arc::new(ConsoleAppender::new(
            format!("DefaultConsole-{}", count),
            self.status.clone(),
        ));
        appender.start();
        self.add_appender(Arc::clone(&appender));
        let root = self.root_logger();
        root.add_appender(appender, None, None);
        root.set_level(Some(self.settings().default_level));
    }

    /// Read the source again and build a fresh, unstarted configuration from it
    pub fn reconfigure(&self) -> Result<Arc<Configuration>> {
        let source = self.source.as_ref().ok_or_else(|| {
            LoggerError::config(self.name(), "the configuration has no source to reload")
        })?;
        let reloaded = source.reload()?;
        Self::from_source(reloaded, Arc::clone(self.settings()), Arc::clone(&self.registry))
    }

    pub fn set_logger_context(&self, context: &Arc<LoggerContext>) {
        *self.context.write() = Some(Arc::downgrade(context));
    }

    pub fn logger_context(&self) -> Option<Arc<LoggerContext>> {
        self.context.read().as_ref().and_then(Weak::upgrade)
    }

    fn update_loggers(&self) {
        if let Some(context) = self.logger_context() {
            context.update_loggers();
        }
    }

    /// Register `appender` unless one with the same name exists
    pub fn add_appender(&self, appender: Arc<dyn Appender>) -> bool {
        let _guard = self.config_lock.lock();
        self.put_appender_if_absent(appender)
    }

    fn put_appender_if_absent(&self, appender: Arc<dyn Appender>) -> bool {
        let current = self.appenders.load_full();
        if current.iter().any(|a| a.name() == appender.name()) {
            return false;
        }
        let mut next = (*current).clone();
        next.push(appender);
        self.appenders.store(Arc::new(next));
        true
    }

    /// Detach `name` from every LoggerConfig, forget it and stop it
    pub fn remove_appender(&self, name: &str) -> bool {
        let _guard = self.config_lock.lock();
        for config in self.all_logger_configs() {
            config.remove_appender(name);
        }
        let current = self.appenders.load_full();
        let Some(position) = current.iter().position(|a| a.name() == name) else {
            return false;
        };
        let mut next = (*current).clone();
        let removed = next.remove(position);
        self.appenders.store(Arc::new(next));
        removed.stop(self.shutdown_timeout);
        true
    }

    /// Add `config` under `name` unless that name is taken, then rebuild the parent links
    pub fn add_logger(&self, name: &str, config: Arc<LoggerConfig>) {
        let _guard = self.config_lock.lock();
        self.put_logger_if_absent(name, config);
        self.set_parents();
    }

    pub fn remove_logger(&self, name: &str) {
        let _guard = self.config_lock.lock();
        let current = self.logger_configs.load_full();
        if current.contains_key(name) {
            let mut next = (*current).clone();
            next.remove(name);
            self.logger_configs.store(Arc::new(next));
        }
        self.set_parents();
    }

    fn put_logger_if_absent(&self, name: &str, config: Arc<LoggerConfig>) -> Arc<LoggerConfig> {
        let current = self.logger_configs.load_full();
        if let Some(existing) = current.get(name) {
            return Arc::clone(existing);
        }
        let mut next = (*current).clone();
        next.insert(name.to_string(), Arc::clone(&config));
        self.logger_configs.store(Arc::new(next));
        config
    }

    /// Create a LoggerConfig for `name` copying the settings of the config it resolves to
    fn derive_logger_config(&self, name: &str, from: &Arc<LoggerConfig>, additive: bool) -> Arc<LoggerConfig> {
        let derived = LoggerConfig::builder(name)
            .level(from.level())
            .additive(additive)
            .build(&self.env);
        derived.set_parent(Some(Arc::clone(from)));
        derived
    }

    fn install_derived(&self, name: &str, derived: Arc<LoggerConfig>) {
        let installed = self.put_logger_if_absent(name, derived);
        self.set_parents();
        if self.is_started() {
            installed.start();
        }
        self.update_loggers();
    }

    /// Attach `appender` to the logger `logger_name`
    ///
    /// When `logger_name` has no LoggerConfig of its own one is created with
    /// the level and additivity it currently resolves to.
    pub fn add_logger_appender(&self, logger_name: &str, appender: Arc<dyn Appender>) {
        let _guard = self.config_lock.lock();
        self.put_appender_if_absent(Arc::clone(&appender));
        let config = self.get_logger_config(logger_name);
        if config.name() == logger_name {
            config.add_appender(appender, None, None);
        } else {
            let derived = self.derive_logger_config(logger_name, &config, config.is_additive());
            derived.add_appender(appender, None, None);
            self.install_derived(logger_name, derived);
        }
    }

    pub fn add_logger_filter(&self, logger_name: &str, filter: Arc<dyn Filter>) {
        let _guard = self.config_lock.lock();
        let config = self.get_logger_config(logger_name);
        if config.name() == logger_name {
            config.add_filter(filter);
        } else {
            let derived = self.derive_logger_config(logger_name, &config, config.is_additive());
            derived.add_filter(filter);
            self.install_derived(logger_name, derived);
        }
    }

    pub fn set_logger_additive(&self, logger_name: &str, additive: bool) {
        let _guard = self.config_lock.lock();
        let config = self.get_logger_config(logger_name);
        if config.name() == logger_name {
            config.set_additive(additive);
        } else {
            let derived = self.derive_logger_config(logger_name, &config, additive);
            self.install_derived(logger_name, derived);
        }
    }

    fn start_watching(&self) {
        if self.monitor_interval.is_zero() {
            return;
        }
        let Some(source) = &self.source else {
            return;
        };
        let Some(path) = source.location() else {
            return;
        };
        let weak = self.self_ref.clone();
        let listener: ChangeListener = Arc::new(move |path: &Path| reload_on_change(&weak, path));
        let watcher = FileWatcher::new(path, vec![listener]).with_last_modified(source.last_modified());
        self.watch_manager.set_interval(self.monitor_interval);
        self.watch_manager.watch(Box::new(watcher));
        if let Err(e) = self.watch_manager.start(&self.scheduler) {
            self.status
                .error(format!("Unable to watch configuration {}: {}", path.display(), e));
        }
    }
}

/// Reload on a separate thread: the watch thread belongs to the scheduler the
/// outgoing configuration stops and joins.
fn reload_on_change(configuration: &Weak<Configuration>, path: &Path) {
    let Some(current) = configuration.upgrade() else {
        return;
    };
    let status = current.status.clone();
    status.info(format!("Configuration source {} changed", path.display()));
    let weak = configuration.clone();
    let spawned = thread::Builder::new()
        .name("config-reload".to_string())
        .spawn(move || {
            let Some(configuration) = weak.upgrade() else {
                return;
            };
            let Some(context) = configuration.logger_context() else {
                return;
            };
            let reloaded = configuration.reconfigure();
            match reloaded {
                Ok(next) => {
                    drop(configuration);
                    context.set_configuration(next);
                }
                Err(e) => configuration
                    .status
                    .error(format!("Unable to reload configuration: {}", e)),
            }
        });
    if let Err(e) = spawned {
        status.error(format!("Unable to start configuration reload: {}", e));
    }
}

impl LifeCycle for Configuration {
    fn state(&self) -> LifeCycleState {
        self.state.get()
    }

    fn start(&self) {
        match self.state.get() {
            LifeCycleState::Initializing => self.initialize(),
            LifeCycleState::Initialized => {}
            _ => return,
        }
        self.status.debug(format!("Starting configuration {}", self.name()));
        self.state.set(LifeCycleState::Starting);
        self.start_watching();
        if self.has_async_logger_configs() {
            self.env.async_delegate().start();
        }
        let root = self.root_logger();
        for config in self.logger_configs.load().values() {
            config.start();
        }
        for appender in self.appenders.load().iter() {
            appender.start();
        }
        if !root.is_started() {
            root.start();
        }
        self.filter.start_filter();
        self.state.set(LifeCycleState::Started);
        self.status.debug(format!("Started configuration {}", self.name()));
    }

    /// Ordered shutdown: strategies are told first, async components drain
    /// before the appenders they feed, every LoggerConfig drains before any
    /// synchronous appender stops, and appender references are cleared last.
    fn stop(&self, timeout: Duration) -> bool {
        self.state.set(LifeCycleState::Stopping);
        self.status.debug(format!("Stopping configuration {}", self.name()));
        let configs = self.all_logger_configs();
        let mut clean = true;

        for config in &configs {
            config.reliability_strategy().before_stop_configuration(self);
        }

        for config in &configs {
            if !config.is_stopped() {
                clean &= config.stop(timeout);
            }
        }

        let delegate = self.env.async_delegate();
        if delegate.is_running() {
            self.status.trace("Stopping the async logger delegate");
            clean &= delegate.stop(timeout);
        }

        let appenders = self.appenders.load_full();
        let mut async_count = 0;
        for appender in appenders.iter().rev() {
            if appender.is_async() && appender.is_started() {
                clean &= appender.stop(timeout);
                async_count += 1;
            }
        }
        if async_count > 0 {
            self.status.trace(format!("Stopped {} async appender(s)", async_count));
        }

        for config in &configs {
            config.reliability_strategy().before_stop_appenders();
        }

        let mut sync_count = 0;
        for appender in appenders.iter().rev() {
            if appender.is_started() {
                clean &= appender.stop(timeout);
                sync_count += 1;
            }
        }
        if sync_count > 0 {
            self.status.trace(format!("Stopped {} appender(s)", sync_count));
        }

        for config in &configs {
            config.clear_appenders();
        }

        self.watch_manager.stop();
        clean &= self.scheduler.stop(timeout);
        clean &= self.filter.stop_filter(timeout);
        *self.context.write() = None;
        self.state.set(LifeCycleState::Stopped);
        self.status.debug(format!("Stopped configuration {}", self.name()));
        clean
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut loggers: Vec<String> = self.logger_configs.load().keys().cloned().collect();
        loggers.sort();
        let appenders: Vec<String> = self
            .appenders
            .load()
            .iter()
            .map(|a| a.name().to_string())
            .collect();
        f.debug_struct("Configuration")
            .field("name", &*self.name.read())
            .field("state", &self.state.get())
            .field("loggers", &loggers)
            .field("appenders", &appenders)
            .field("root_level", &self.root_logger().level())
            .finish()
    }
}

/// Name one dotted segment up: `a.b` -> `a`, `a` -> `""`, `""` -> none
fn sub_name(name: &str) -> Option<&str> {
    if name.is_empty() {
        return None;
    }
    match name.rfind('.') {
        Some(i) if i > 0 => Some(&name[..i]),
        _ => Some(""),
    }
}

fn display_name(config: &LoggerConfig) -> &str {
    if config.is_root() {
        "root"
    } else {
        config.name()
    }
}

fn parse_number(node: &Node, key: &str, status: &StatusLogger) -> u64 {
    match node.attribute(key) {
        Some(text) => text.trim().parse().unwrap_or_else(|_| {
            status.error(format!("Invalid {} \"{}\", using 0", key, text));
            0
        }),
        None => 0,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::appenders::ListAppender;
    use crate::config::json::parse_json;
    use crate::config::logger_config::LogRequest;
    use crate::config::plugin::{PluginContext, PluginType};

    fn build(json: &str, lists: &[&Arc<ListAppender>]) -> (Arc<Configuration>, StatusLogger) {
        let status = StatusLogger::silent();
        let settings = Arc::new(ConfigurationSettings::default().with_status(status.clone()));
        let registry = Arc::new(PluginRegistry::with_core_plugins());
        let configuration = Configuration::new(parse_json(json).unwrap(), None, settings, registry);
        for list in lists {
            let appender: Arc<dyn Appender> = (*list).clone();
            configuration.add_appender(appender);
        }
        configuration.initialize();
        (configuration, status)
    }

    fn list(name: &str) -> Arc<ListAppender> {
        Arc::new(ListAppender::new(name, StatusLogger::silent()))
    }

    fn log(configuration: &Configuration, logger: &str, level: LogLevel, message: &str) {
        let config = configuration.get_logger_config(logger);
        config
            .log_request(&LogRequest::new(logger, level, message))
            .unwrap();
    }

    #[test]
    fn test_sub_name() {
        assert_eq!(sub_name("a.b.c"), Some("a.b"));
        assert_eq!(sub_name("a"), Some(""));
        assert_eq!(sub_name(".a"), Some(""));
        assert_eq!(sub_name(""), None);
    }

    #[test]
    fn test_longest_prefix_resolution_and_parents() {
        let (configuration, _) = build(
            r#"{ "loggers": {
                "logger": [ { "name": "a" }, { "name": "a.b" }, { "name": "a.b.c.d" } ],
                "root": { "level": "warn" }
            } }"#,
            &[],
        );
        assert_eq!(configuration.get_logger_config("a.b.c").name(), "a.b");
        assert_eq!(configuration.get_logger_config("a.b.c.d.e").name(), "a.b.c.d");
        assert!(configuration.get_logger_config("x").is_root());
        assert!(configuration.get_logger_config("").is_root());

        let deep = configuration.get_logger_config("a.b.c.d");
        assert_eq!(deep.parent().unwrap().name(), "a.b");
        assert!(configuration.get_logger_config("a").parent().unwrap().is_root());
        assert_eq!(deep.level(), LogLevel::WARN);
    }

    #[test]
    fn test_wiring_and_additivity() {
        let x = list("X");
        let y = list("Y");
        let (configuration, _) = build(
            r#"{ "loggers": {
                "logger": [
                    { "name": "a", "level": "info", "AppenderRef": { "ref": "Y" } },
                    { "name": "a.b", "AppenderRef": { "ref": "X" } }
                ],
                "root": { "level": "error" }
            } }"#,
            &[&x, &y],
        );
        configuration.start();
        log(&configuration, "a.b.c", LogLevel::INFO, "both");
        assert_eq!(x.messages(), vec!["both"]);
        assert_eq!(y.messages(), vec!["both"]);

        configuration.set_logger_additive("a.b", false);
        log(&configuration, "a.b", LogLevel::INFO, "own");
        assert_eq!(x.len(), 2);
        assert_eq!(y.len(), 1);
        configuration.stop(Duration::from_secs(1));
    }

    #[test]
    fn test_missing_loggers_uses_default() {
        let (configuration, status) = build(r#"{ "appenders": {} }"#, &[]);
        assert!(status.contains(LogLevel::WARN, "No Loggers were configured"));
        assert!(configuration.name().starts_with("Default@"));
        let root = configuration.root_logger();
        assert_eq!(root.level(), LogLevel::ERROR);
        assert!(root.appenders().keys().all(|n| n.starts_with("DefaultConsole-")));
        assert_eq!(root.appenders().len(), 1);
        assert!(configuration.loggers().is_empty());
    }

    #[test]
    fn test_missing_root_keeps_configured_loggers() {
        let (configuration, status) = build(
            r#"{ "loggers": { "logger": { "name": "svc", "level": "debug" } } }"#,
            &[],
        );
        assert!(status.contains(LogLevel::WARN, "No Root logger was configured"));
        assert_eq!(configuration.get_logger_config("svc.db").name(), "svc");
        assert_eq!(configuration.root_logger().appenders().len(), 1);
        assert_eq!(configuration.root_logger().level(), LogLevel::ERROR);
        assert_eq!(configuration.name(), "Configuration");
    }

    #[test]
    fn test_missing_root_keeps_configured_name() {
        let (configuration, _) = build(
            r#"{ "configuration": { "name": "svc-config",
                 "loggers": { "logger": { "name": "svc" } } } }"#,
            &[],
        );
        assert_eq!(configuration.name(), "svc-config");
        assert!(configuration
            .root_logger()
            .appenders()
            .keys()
            .all(|n| n.starts_with("DefaultConsole-")));
    }

    fn count_only_factory(_ctx: &mut PluginContext<'_>) -> Result<Component> {
        Ok(Component::Other(Arc::new(())))
    }

    fn timer_factory(ctx: &mut PluginContext<'_>) -> Result<Component> {
        // Nested timers are built but not otherwise wired.
        for child in ctx.node_mut().children_mut() {
            child.mark_consumed();
        }
        Ok(Component::Other(Arc::new(())))
    }

    #[test]
    fn test_initialize_counts_nested_scheduled_components() {
        let mut registry = PluginRegistry::with_core_plugins();
        registry.register(PluginType::new("Timer", timer_factory).with_scheduled());
        registry.register(PluginType::new("Plain", count_only_factory));
        let root = parse_json(
            r#"{
                "Timer": [
                    { "Timer": { "Timer": {} } },
                    { "Plain": {} }
                ],
                "loggers": { "root": {} }
            }"#,
        )
        .unwrap();
        let settings = Arc::new(ConfigurationSettings::default().with_status(StatusLogger::silent()));
        let configuration = Configuration::new(root, None, settings, Arc::new(registry));
        assert_eq!(configuration.scheduler().scheduled_items(), 0);

        configuration.initialize();
        assert_eq!(configuration.scheduler().scheduled_items(), 4);

        // A second call is a no-op once initialized.
        configuration.initialize();
        assert_eq!(configuration.scheduler().scheduled_items(), 4);
    }

    #[test]
    fn test_structural_problems_are_reported() {
        let (configuration, status) = build(
            r#"{
                "loggers": { "root": { "level": "info", "AppenderRef": { "ref": "NOPE" } } },
                "properties": { "property": { "name": "late", "value": "x" } },
                "appenderRef": { "ref": "stray" }
            }"#,
            &[],
        );
        assert!(status.contains(LogLevel::ERROR, "Unable to locate appender \"NOPE\""));
        assert!(status.contains(LogLevel::ERROR, "Properties declaration must be the first element"));
        assert!(status.contains(LogLevel::ERROR, "Unknown object \"appenderRef\""));
        assert_eq!(configuration.root_logger().level(), LogLevel::INFO);
    }

    #[test]
    fn test_properties_feed_substitution() {
        let (configuration, _) = build(
            r#"{
                "properties": { "property": { "name": "lvl", "value": "debug" } },
                "loggers": { "logger": { "name": "app", "level": "${lvl}" }, "root": {} }
            }"#,
            &[],
        );
        assert_eq!(configuration.get_logger_config("app").level(), LogLevel::DEBUG);
    }

    #[test]
    fn test_add_logger_appender_derives_config() {
        let captured = list("CAPTURE");
        captured.start();
        let (configuration, _) = build(
            r#"{ "loggers": { "logger": { "name": "a", "level": "debug", "additivity": false }, "root": {} } }"#,
            &[],
        );
        configuration.start();
        configuration.add_logger_appender("a.b", captured.clone());

        let derived = configuration.get_logger_config("a.b");
        assert_eq!(derived.name(), "a.b");
        assert_eq!(derived.level(), LogLevel::DEBUG);
        assert!(!derived.is_additive());
        assert!(derived.is_started());
        assert_eq!(derived.parent().unwrap().name(), "a");
        assert!(configuration.get_appender("CAPTURE").is_some());

        log(&configuration, "a.b.c", LogLevel::DEBUG, "hello");
        assert_eq!(captured.messages(), vec!["hello"]);

        assert!(configuration.remove_appender("CAPTURE"));
        assert!(captured.is_stopped());
        assert!(derived.appenders().is_empty());
        assert!(!configuration.remove_appender("CAPTURE"));
    }

    #[test]
    fn test_add_and_remove_logger() {
        let (configuration, _) = build(r#"{ "loggers": { "root": {} } }"#, &[]);
        let config = LoggerConfig::builder("net.http").level(LogLevel::TRACE).build(configuration.env());
        configuration.add_logger("net.http", config);
        assert_eq!(configuration.get_logger_config("net.http.client").name(), "net.http");

        configuration.remove_logger("net.http");
        assert!(configuration.get_logger_config("net.http.client").is_root());
    }

    #[test]
    fn test_lifecycle_states() {
        let (configuration, _) = build(r#"{ "loggers": { "root": {} } }"#, &[]);
        assert_eq!(configuration.state(), LifeCycleState::Initialized);
        configuration.start();
        assert_eq!(configuration.state(), LifeCycleState::Started);
        assert!(configuration.root_logger().is_started());
        assert!(configuration.stop(Duration::from_secs(1)));
        assert_eq!(configuration.state(), LifeCycleState::Stopped);
    }

    #[test]
    fn test_null_configuration_is_off() {
        let settings = Arc::new(ConfigurationSettings::default().with_status(StatusLogger::silent()));
        let null = Configuration::null_configuration(settings, Arc::new(PluginRegistry::new()));
        assert_eq!(null.name(), "Null");
        assert_eq!(null.root_logger().level(), LogLevel::OFF);
        null.start();
        assert!(null.appenders().is_empty());
    }

    #[test]
    fn test_root_attributes() {
        let (configuration, _) = build(
            r#"{ "configuration": { "name": "app", "shutdownTimeout": 250, "monitorInterval": 0,
                 "loggers": { "root": {} } } }"#,
            &[],
        );
        assert_eq!(configuration.name(), "app");
        assert_eq!(configuration.shutdown_timeout(), Duration::from_millis(250));
        assert!(configuration.monitor_interval().is_zero());
    }
}
