//! LoggerConfig: the configuration bound to a dotted logger-name prefix

use super::appender_control::AppenderControl;
use super::appender_control_set::AppenderControlSet;
use super::appender_ref::AppenderRef;
use super::async_delegate::AsyncLoggerDelegate;
use super::lookup::Interpolator;
use super::plugin::PluginEnv;
use super::property::Property;
use super::reliability::{create_strategy, ReliabilityStrategy};
use crate::core::{
    Appender, Filter, Filterable, LifeCycle, LifeCycleState, Location, LogContext, LogEvent,
    LogEventFactory, LogLevel, LoggerError, Result, StateCell, StatusLogger,
};
use arc_swap::ArcSwapOption;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Name of the root LoggerConfig
pub const ROOT_LOGGER_NAME: &str = "";

/// Level the hierarchy falls back to when no LoggerConfig sets one
pub const DEFAULT_ROOT_LEVEL: LogLevel = LogLevel::ERROR;

/// A log call before an event has been created
#[derive(Debug, Clone)]
pub struct LogRequest<'a> {
    pub logger_name: &'a str,
    pub level: LogLevel,
    pub message: &'a str,
    pub location: Option<Location>,
    pub context: Option<&'a LogContext>,
}

impl<'a> LogRequest<'a> {
    pub fn new(logger_name: &'a str, level: LogLevel, message: &'a str) -> Self {
        Self {
            logger_name,
            level,
            message,
            location: None,
            context: None,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_context(mut self, context: &'a LogContext) -> Self {
        self.context = Some(context);
        self
    }
}

pub struct LoggerConfigBuilder {
    name: String,
    level: Option<LogLevel>,
    additive: bool,
    include_location: bool,
    refs: Vec<AppenderRef>,
    properties: Vec<Property>,
    filter: Option<Arc<dyn Filter>>,
    asynchronous: bool,
}

impl LoggerConfigBuilder {
    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn maybe_level(mut self, level: Option<LogLevel>) -> Self {
        self.level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn additive(mut self, additive: bool) -> Self {
        self.additive = additive;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn include_location(mut self, include: bool) -> Self {
        self.include_location = include;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn appender_ref(mut self, appender_ref: AppenderRef) -> Self {
        self.refs.push(appender_ref);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn appender_refs(mut self, refs: Vec<AppenderRef>) -> Self {
        self.refs.extend(refs);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn properties(mut self, properties: Vec<Property>) -> Self {
        self.properties.extend(properties);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn filter(mut self, filter: Option<Arc<dyn Filter>>) -> Self {
        self.filter = filter;
        self
    }

    /// Hand appender dispatch to the configuration's async delegate
    #[must_use = "builder methods return a new value"]
    pub fn asynchronous(mut self, asynchronous: bool) -> Self {
        self.asynchronous = asynchronous;
        self
    }

    pub fn build(self, env: &PluginEnv) -> Arc<LoggerConfig> {
        let settings = env.settings();
        Arc::new_cyclic(|me: &Weak<LoggerConfig>| LoggerConfig {
            name: self.name,
            self_ref: me.clone(),
            level: RwLock::new(self.level),
            additive: AtomicBool::new(self.additive),
            include_location: self.include_location,
            parent: ArcSwapOption::empty(),
            filter: Filterable::new(self.filter),
            appender_refs: self.refs,
            appenders: AppenderControlSet::new(),
            properties: self.properties,
            event_factory: Arc::clone(settings.event_factory()),
            interpolator: Arc::clone(env.interpolator()),
            strategy: create_strategy(me.clone(), settings),
            async_delegate: self
                .asynchronous
                .then(|| Arc::clone(env.async_delegate())),
            state: StateCell::new(),
            status: env.status().clone(),
        })
    }
}

/// One node of the logger hierarchy
///
/// The level may be unset, in which case it is taken from the nearest
/// ancestor when asked for. Events pass the own filter, go to the own
/// appenders and then, when additive, on to the parent.
pub struct LoggerConfig {
    name: String,
    self_ref: Weak<LoggerConfig>,
    level: RwLock<Option<LogLevel>>,
    additive: AtomicBool,
    include_location: bool,
    parent: ArcSwapOption<LoggerConfig>,
    filter: Filterable,
    appender_refs: Vec<AppenderRef>,
    appenders: AppenderControlSet,
    properties: Vec<Property>,
    event_factory: Arc<dyn LogEventFactory>,
    interpolator: Arc<Interpolator>,
    strategy: Box<dyn ReliabilityStrategy>,
    async_delegate: Option<Arc<AsyncLoggerDelegate>>,
    state: StateCell,
    status: StatusLogger,
}

impl LoggerConfig {
    pub fn builder(name: impl Into<String>) -> LoggerConfigBuilder {
        LoggerConfigBuilder {
            name: name.into(),
            level: None,
            additive: true,
            include_location: true,
            refs: Vec::new(),
            properties: Vec::new(),
            filter: None,
            asynchronous: false,
        }
    }

    pub fn root_builder() -> LoggerConfigBuilder {
        Self::builder(ROOT_LOGGER_NAME)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }

    /// Effective level: own, else the nearest ancestor's, else ERROR
    pub fn level(&self) -> LogLevel {
        if let Some(level) = *self.level.read() {
            return level;
        }
        match self.parent.load_full() {
            Some(parent) => parent.level(),
            None => DEFAULT_ROOT_LEVEL,
        }
    }

    /// Level set on this LoggerConfig itself
    pub fn explicit_level(&self) -> Option<LogLevel> {
        *self.level.read()
    }

    pub fn set_level(&self, level: Option<LogLevel>) {
        *self.level.write() = level;
    }

    pub fn is_additive(&self) -> bool {
        self.additive.load(Ordering::Acquire)
    }

    pub fn set_additive(&self, additive: bool) {
        self.additive.store(additive, Ordering::Release);
    }

    pub fn is_include_location(&self) -> bool {
        self.include_location
    }

    pub fn parent(&self) -> Option<Arc<LoggerConfig>> {
        self.parent.load_full()
    }

    pub fn set_parent(&self, parent: Option<Arc<LoggerConfig>>) {
        self.parent.store(parent);
    }

    pub fn filterable(&self) -> &Filterable {
        &self.filter
    }

    pub fn add_filter(&self, filter: Arc<dyn Filter>) {
        self.filter.add_filter(filter);
    }

    pub fn remove_filter(&self, filter: &Arc<dyn Filter>) {
        self.filter.remove_filter(filter);
    }

    pub fn is_filtered(&self, event: &LogEvent) -> bool {
        self.filter.is_filtered(event)
    }

    pub fn appender_refs(&self) -> &[AppenderRef] {
        &self.appender_refs
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn reliability_strategy(&self) -> &dyn ReliabilityStrategy {
        self.strategy.as_ref()
    }

    pub fn is_asynchronous(&self) -> bool {
        self.async_delegate.is_some()
    }

    pub fn appender_controls(&self) -> &AppenderControlSet {
        &self.appenders
    }

    /// Appenders keyed by name
    pub fn appenders(&self) -> BTreeMap<String, Arc<dyn Appender>> {
        self.appenders
            .get()
            .iter()
            .map(|c| (c.appender_name().to_string(), Arc::clone(c.appender())))
            .collect()
    }

    pub fn has_appenders(&self) -> bool {
        !self.appenders.is_empty()
    }

    pub fn add_appender(
        &self,
        appender: Arc<dyn Appender>,
        level: Option<LogLevel>,
        filter: Option<Arc<dyn Filter>>,
    ) -> bool {
        self.appenders
            .add(Arc::new(AppenderControl::new(appender, level, filter)))
    }

    /// Remove every control for `name`, stopping the filters they owned
    pub fn remove_appender(&self, name: &str) -> bool {
        let mut removed = false;
        while let Some(control) = self.appenders.remove(name) {
            Self::cleanup_filter(&control);
            removed = true;
        }
        removed
    }

    /// Remove all appenders, returning what was attached
    pub fn clear_appenders(&self) -> Vec<Arc<dyn Appender>> {
        let mut cleared = Vec::new();
        loop {
            let batch = self.appenders.clear();
            if batch.is_empty() {
                break;
            }
            for control in batch {
                Self::cleanup_filter(&control);
                cleared.push(Arc::clone(control.appender()));
            }
        }
        cleared
    }

    fn cleanup_filter(control: &AppenderControl) {
        if let Some(filter) = control.filter() {
            filter.stop(Duration::ZERO);
        }
    }

    /// Create an event for `request` and log it through the hierarchy
    pub fn log_request(&self, request: &LogRequest<'_>) -> Result<()> {
        let properties = self.evaluate_properties();
        let location = if self.include_location {
            request.location.clone()
        } else {
            None
        };
        let event = self.event_factory.create_event(
            request.logger_name,
            request.level,
            request.message,
            location,
            request.context.cloned(),
            &properties,
        );
        self.log_event(&event)
    }

    fn evaluate_properties(&self) -> Vec<(String, String)> {
        self.properties
            .iter()
            .map(|p| (p.name().to_string(), p.evaluate(&self.interpolator)))
            .collect()
    }

    /// Filter, dispatch to own appenders, then propagate when additive
    pub fn log_event(&self, event: &LogEvent) -> Result<()> {
        if self.is_filtered(event) {
            return Ok(());
        }
        self.call_appenders(event)?;
        if self.is_additive() {
            if let Some(parent) = self.parent() {
                parent.log_event(event)?;
            }
        }
        Ok(())
    }

    /// Dispatch to this config's appenders; async configs enqueue instead
    pub fn call_appenders(&self, event: &LogEvent) -> Result<()> {
        if let Some(delegate) = &self.async_delegate {
            if delegate.is_running() && self.has_appenders() {
                if let Some(me) = self.self_ref.upgrade() {
                    delegate.enqueue(me, event.clone());
                    return Ok(());
                }
            }
        }
        self.call_appenders_sync(event)
    }

    /// Dispatch on the calling thread, in insertion order
    pub fn call_appenders_sync(&self, event: &LogEvent) -> Result<()> {
        let controls = self.appenders.get();
        for control in controls.iter() {
            control.call_appender(event)?;
        }
        Ok(())
    }

    pub(crate) fn status(&self) -> &StatusLogger {
        &self.status
    }
}

impl LifeCycle for LoggerConfig {
    fn state(&self) -> LifeCycleState {
        self.state.get()
    }

    fn start(&self) {
        if self.state.get() == LifeCycleState::Started {
            return;
        }
        self.state.set(LifeCycleState::Starting);
        self.filter.start_filter();
        self.state.set(LifeCycleState::Started);
    }

    fn stop(&self, timeout: Duration) -> bool {
        self.state.set(LifeCycleState::Stopping);
        let stopped = self.filter.stop_filter(timeout);
        self.state.set(LifeCycleState::Stopped);
        stopped
    }
}

impl fmt::Debug for LoggerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let appenders: Vec<String> = self
            .appenders
            .get()
            .iter()
            .map(|c| c.appender_name().to_string())
            .collect();
        f.debug_struct("LoggerConfig")
            .field("name", &self.name)
            .field("level", &*self.level.read())
            .field("additive", &self.is_additive())
            .field("appenders", &appenders)
            .field("asynchronous", &self.is_asynchronous())
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

/// The `Loggers` container: all LoggerConfigs keyed by name, root under `""`
#[derive(Debug, Clone, Default)]
pub struct Loggers {
    map: HashMap<String, Arc<LoggerConfig>>,
    root: Option<Arc<LoggerConfig>>,
}

impl Loggers {
    pub fn new(configs: Vec<Arc<LoggerConfig>>) -> Result<Self> {
        let mut loggers = Self::default();
        for config in configs {
            if config.is_root() {
                if loggers.root.is_some() {
                    return Err(LoggerError::MultipleRootLoggers);
                }
                loggers.root = Some(Arc::clone(&config));
            }
            loggers.map.insert(config.name().to_string(), config);
        }
        Ok(loggers)
    }

    pub fn map(&self) -> &HashMap<String, Arc<LoggerConfig>> {
        &self.map
    }

    pub fn root(&self) -> Option<&Arc<LoggerConfig>> {
        self.root.as_ref()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appenders::ListAppender;
    use crate::config::settings::ConfigurationSettings;
    use crate::core::{StringMatchFilter, ThresholdFilter};

    fn env() -> PluginEnv {
        let settings = ConfigurationSettings::default().with_status(StatusLogger::silent());
        PluginEnv::new(Arc::new(settings))
    }

    fn list(name: &str) -> Arc<ListAppender> {
        let list = Arc::new(ListAppender::new(name, StatusLogger::silent()));
        list.start();
        list
    }

    #[test]
    fn test_level_inheritance_is_lazy() {
        let env = env();
        let root = LoggerConfig::root_builder().level(LogLevel::WARN).build(&env);
        let child = LoggerConfig::builder("a.b").build(&env);
        child.set_parent(Some(root.clone()));

        assert_eq!(child.level(), LogLevel::WARN);
        root.set_level(Some(LogLevel::DEBUG));
        assert_eq!(child.level(), LogLevel::DEBUG);

        child.set_level(Some(LogLevel::TRACE));
        assert_eq!(child.level(), LogLevel::TRACE);
        assert_eq!(child.explicit_level(), Some(LogLevel::TRACE));
    }

    #[test]
    fn test_root_without_level_defaults_to_error() {
        let root = LoggerConfig::root_builder().build(&env());
        assert!(root.is_root());
        assert_eq!(root.level(), LogLevel::ERROR);
    }

    #[test]
    fn test_additive_propagation() {
        let env = env();
        let parent = LoggerConfig::builder("a").build(&env);
        let child = LoggerConfig::builder("a.b").build(&env);
        child.set_parent(Some(parent.clone()));
        let x = list("X");
        let y = list("Y");
        child.add_appender(x.clone(), None, None);
        parent.add_appender(y.clone(), None, None);

        child.log_event(&LogEvent::new("a.b.C", LogLevel::INFO, "one")).unwrap();
        assert_eq!(x.len(), 1);
        assert_eq!(y.len(), 1);

        child.set_additive(false);
        child.log_event(&LogEvent::new("a.b.C", LogLevel::INFO, "two")).unwrap();
        assert_eq!(x.len(), 2);
        assert_eq!(y.len(), 1);
    }

    #[test]
    fn test_filter_veto_stops_propagation() {
        let env = env();
        let parent = LoggerConfig::builder("a").build(&env);
        let filter: Arc<dyn Filter> = Arc::new(ThresholdFilter::new(LogLevel::ERROR));
        let child = LoggerConfig::builder("a.b").filter(Some(filter)).build(&env);
        child.set_parent(Some(parent.clone()));
        let y = list("Y");
        parent.add_appender(y.clone(), None, None);

        child.log_event(&LogEvent::new("a.b", LogLevel::INFO, "dropped")).unwrap();
        assert!(y.is_empty());

        // The parent's own filter applies to propagated events too.
        parent.add_filter(Arc::new(StringMatchFilter::new("secret").with_results(
            crate::core::FilterResult::Deny,
            crate::core::FilterResult::Neutral,
        )));
        child.log_event(&LogEvent::new("a.b", LogLevel::ERROR, "a secret")).unwrap();
        child.log_event(&LogEvent::new("a.b", LogLevel::ERROR, "public")).unwrap();
        assert_eq!(y.messages(), vec!["public".to_string()]);
    }

    #[test]
    fn test_properties_evaluated_per_event() {
        let env = env();
        let config = LoggerConfig::builder("svc")
            .properties(vec![
                Property::new("service", "billing"),
                Property::with_raw("region", "${region}", "${region}"),
            ])
            .build(&env);
        let appender = list("L");
        config.add_appender(appender.clone(), None, None);

        config.log_request(&LogRequest::new("svc", LogLevel::INFO, "first")).unwrap();
        env.interpolator().put("region", "eu-west");
        config.log_request(&LogRequest::new("svc", LogLevel::INFO, "second")).unwrap();

        let events = appender.events();
        let first = events[0].context.as_ref().unwrap();
        let second = events[1].context.as_ref().unwrap();
        assert_eq!(first.get("service").unwrap().to_string(), "billing");
        assert_eq!(first.get("region").unwrap().to_string(), "${region}");
        assert_eq!(second.get("region").unwrap().to_string(), "eu-west");
    }

    #[test]
    fn test_remove_and_clear_appenders() {
        let config = LoggerConfig::builder("a").build(&env());
        config.add_appender(list("A"), None, None);
        config.add_appender(list("B"), Some(LogLevel::WARN), None);
        assert!(!config.add_appender(list("A"), None, None));

        assert!(config.remove_appender("A"));
        assert!(!config.remove_appender("A"));
        assert_eq!(config.appenders().keys().cloned().collect::<Vec<_>>(), vec!["B"]);

        let cleared = config.clear_appenders();
        assert_eq!(cleared.len(), 1);
        assert!(!config.has_appenders());
    }

    #[test]
    fn test_loggers_rejects_second_root() {
        let env = env();
        let configs = vec![
            LoggerConfig::root_builder().build(&env),
            LoggerConfig::builder("a").build(&env),
            LoggerConfig::root_builder().build(&env),
        ];
        assert!(matches!(Loggers::new(configs), Err(LoggerError::MultipleRootLoggers)));

        let loggers = Loggers::new(vec![
            LoggerConfig::root_builder().build(&env),
            LoggerConfig::builder("a").build(&env),
        ])
        .unwrap();
        assert_eq!(loggers.len(), 2);
        assert!(loggers.map().contains_key(""));
        assert!(loggers.root().is_some());
    }
}
