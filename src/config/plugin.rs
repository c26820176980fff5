//! Component registry and the typed plugin factory interface
//!
//! Every node name maps to a [`PluginType`] whose factory builds a
//! [`Component`] from the node through a [`PluginContext`]. The context hands
//! out attributes and already-built child components explicitly and records
//! what was used, so the processor can report leftovers afterwards.

use super::appender_ref::AppenderRef;
use super::arbiter::{Arbiter, SelectArbiter};
use super::async_delegate::AsyncLoggerDelegate;
use super::lookup::Interpolator;
use super::logger_config::{LoggerConfig, Loggers};
use super::node::Node;
use super::property::{CustomLevelConfig, Property};
use super::settings::ConfigurationSettings;
use crate::core::{Appender, CompositeFilter, Filter, LogLevel, LoggerError, Result, StatusLogger};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Namespace of the built-in plugins
pub const CORE_NAMESPACE: &str = "core";

/// How the conditional pass treats nodes of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKind {
    Standard,
    /// A condition whose children replace it when it holds
    Arbiter,
    /// Picks one of its arbiter children
    Select,
}

/// Builds a component from the node behind the context
pub type PluginFactory = fn(&mut PluginContext<'_>) -> Result<Component>;

/// A registered element type
///
/// # Example
///
/// ```
/// use rust_logger_config::config::{
///     Component, PluginContext, PluginRegistry, PluginType, Property,
/// };
/// use rust_logger_config::core::Result;
///
/// fn tag_factory(ctx: &mut PluginContext<'_>) -> Result<Component> {
///     let name = ctx.required_attribute("name", "Tag name cannot be null")?;
///     Ok(Component::Property(Property::new(name, ctx.value().unwrap_or_default())))
/// }
///
/// let mut registry = PluginRegistry::with_core_plugins();
/// registry.register(PluginType::new("Tag", tag_factory));
/// assert!(registry.get("TAG").is_some());
/// ```
pub struct PluginType {
    name: String,
    namespace: String,
    kind: PluginKind,
    defer_children: bool,
    scheduled: bool,
    factory: PluginFactory,
}

impl PluginType {
    /// A standard core-namespace type that builds its children first
    pub fn new(name: impl Into<String>, factory: PluginFactory) -> Self {
        Self {
            name: name.into(),
            namespace: CORE_NAMESPACE.to_string(),
            kind: PluginKind::Standard,
            defer_children: false,
            scheduled: false,
            factory,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_kind(mut self, kind: PluginKind) -> Self {
        self.kind = kind;
        self
    }

    /// The factory receives the raw child nodes instead of built components
    #[must_use = "builder methods return a new value"]
    pub fn with_deferred_children(mut self) -> Self {
        self.defer_children = true;
        self
    }

    /// The component runs scheduled work; counted before the wiring pass
    #[must_use = "builder methods return a new value"]
    pub fn with_scheduled(mut self) -> Self {
        self.scheduled = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn kind(&self) -> PluginKind {
        self.kind
    }

    pub fn is_defer_children(&self) -> bool {
        self.defer_children
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    /// Run the factory
    pub fn create(&self, ctx: &mut PluginContext<'_>) -> Result<Component> {
        (self.factory)(ctx)
    }
}

impl fmt::Debug for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginType")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("kind", &self.kind)
            .field("defer_children", &self.defer_children)
            .field("scheduled", &self.scheduled)
            .finish()
    }
}

/// Plugin types keyed by case-insensitive `(namespace, name)`
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<PluginType>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in plugin
    pub fn with_core_plugins() -> Self {
        let mut registry = Self::new();
        super::core_plugins::register_core_plugins(&mut registry);
        registry
    }

    fn key(namespace: &str, name: &str) -> String {
        format!("{}:{}", namespace.to_lowercase(), name.to_lowercase())
    }

    /// Register a type, returning the one it replaced
    pub fn register(&mut self, plugin: PluginType) -> Option<Arc<PluginType>> {
        let key = Self::key(&plugin.namespace, &plugin.name);
        self.plugins.insert(key, Arc::new(plugin))
    }

    pub fn get(&self, name: &str) -> Option<Arc<PluginType>> {
        self.get_in(CORE_NAMESPACE, name)
    }

    pub fn get_in(&self, namespace: &str, name: &str) -> Option<Arc<PluginType>> {
        self.plugins.get(&Self::key(namespace, name)).cloned()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

/// What a node resolves to
#[derive(Clone)]
pub enum Component {
    Appender(Arc<dyn Appender>),
    Appenders(Vec<Arc<dyn Appender>>),
    Filter(Arc<dyn Filter>),
    AppenderRef(AppenderRef),
    LoggerConfig(Arc<LoggerConfig>),
    Loggers(Loggers),
    Property(Property),
    Properties(Vec<Property>),
    Arbiter(Arc<dyn Arbiter>),
    Select(SelectArbiter),
    CustomLevel(CustomLevelConfig),
    CustomLevels(Vec<CustomLevelConfig>),
    /// Components of user plugins the engine does not wire itself
    Other(Arc<dyn Any + Send + Sync>),
}

impl Component {
    pub fn kind(&self) -> &'static str {
        match self {
            Component::Appender(_) => "Appender",
            Component::Appenders(_) => "Appenders",
            Component::Filter(_) => "Filter",
            Component::AppenderRef(_) => "AppenderRef",
            Component::LoggerConfig(_) => "LoggerConfig",
            Component::Loggers(_) => "Loggers",
            Component::Property(_) => "Property",
            Component::Properties(_) => "Properties",
            Component::Arbiter(_) => "Arbiter",
            Component::Select(_) => "Select",
            Component::CustomLevel(_) => "CustomLevel",
            Component::CustomLevels(_) => "CustomLevels",
            Component::Other(_) => "Other",
        }
    }

    pub fn as_appender(&self) -> Option<&Arc<dyn Appender>> {
        match self {
            Component::Appender(appender) => Some(appender),
            _ => None,
        }
    }

    pub fn as_filter(&self) -> Option<&Arc<dyn Filter>> {
        match self {
            Component::Filter(filter) => Some(filter),
            _ => None,
        }
    }

    pub fn as_logger_config(&self) -> Option<&Arc<LoggerConfig>> {
        match self {
            Component::LoggerConfig(config) => Some(config),
            _ => None,
        }
    }

    pub fn as_arbiter(&self) -> Option<&Arc<dyn Arbiter>> {
        match self {
            Component::Arbiter(arbiter) => Some(arbiter),
            _ => None,
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Appender(appender) => write!(f, "Appender({})", appender.name()),
            Component::Appenders(list) => {
                let names: Vec<_> = list.iter().map(|a| a.name()).collect();
                write!(f, "Appenders({:?})", names)
            }
            Component::Filter(filter) => write!(f, "Filter({:?})", filter),
            Component::AppenderRef(r) => write!(f, "AppenderRef({})", r.ref_name()),
            Component::LoggerConfig(config) => write!(f, "LoggerConfig({:?})", config.name()),
            Component::Loggers(loggers) => write!(f, "Loggers({})", loggers.len()),
            Component::Property(p) => write!(f, "Property({}={})", p.name(), p.value()),
            Component::Properties(list) => write!(f, "Properties({})", list.len()),
            Component::Arbiter(arbiter) => write!(f, "Arbiter({:?})", arbiter),
            Component::Select(_) => write!(f, "Select"),
            Component::CustomLevel(level) => write!(f, "CustomLevel({})", level.name()),
            Component::CustomLevels(list) => write!(f, "CustomLevels({})", list.len()),
            Component::Other(_) => write!(f, "Other"),
        }
    }
}

/// Services shared by every factory of one configuration
#[derive(Debug, Clone)]
pub struct PluginEnv {
    status: StatusLogger,
    settings: Arc<ConfigurationSettings>,
    interpolator: Arc<Interpolator>,
    async_delegate: Arc<AsyncLoggerDelegate>,
}

impl PluginEnv {
    pub fn new(settings: Arc<ConfigurationSettings>) -> Self {
        let status = settings.status().clone();
        let interpolator = Arc::new(Interpolator::new(settings.system_properties.clone()));
        let async_delegate = Arc::new(AsyncLoggerDelegate::new(
            settings.async_queue_size,
            settings.async_overflow_policy.clone(),
            status.clone(),
        ));
        Self {
            status,
            settings,
            interpolator,
            async_delegate,
        }
    }

    pub fn status(&self) -> &StatusLogger {
        &self.status
    }

    pub fn settings(&self) -> &Arc<ConfigurationSettings> {
        &self.settings
    }

    pub fn interpolator(&self) -> &Arc<Interpolator> {
        &self.interpolator
    }

    pub fn async_delegate(&self) -> &Arc<AsyncLoggerDelegate> {
        &self.async_delegate
    }
}

/// A factory's view of the node being built
pub struct PluginContext<'a> {
    node: &'a mut Node,
    env: &'a PluginEnv,
}

impl<'a> PluginContext<'a> {
    pub fn new(node: &'a mut Node, env: &'a PluginEnv) -> Self {
        Self { node, env }
    }

    /// The node being built, including children a deferring type left raw
    pub fn node(&self) -> &Node {
        self.node
    }

    pub fn node_mut(&mut self) -> &mut Node {
        self.node
    }

    pub fn name(&self) -> &str {
        self.node.name()
    }

    pub fn env(&self) -> &PluginEnv {
        self.env
    }

    pub fn status(&self) -> &StatusLogger {
        &self.env.status
    }

    pub fn settings(&self) -> &ConfigurationSettings {
        &self.env.settings
    }

    /// Claim an attribute without substituting references
    pub fn raw_attribute(&mut self, key: &str) -> Option<String> {
        self.node.remove_attribute(key)
    }

    /// Claim an attribute, substituting `${...}` references
    pub fn attribute(&mut self, key: &str) -> Option<String> {
        self.raw_attribute(key)
            .map(|raw| self.env.interpolator.substitute(&raw))
    }

    /// Claim an attribute that must be present and non-empty
    pub fn required_attribute(&mut self, key: &str, message: &str) -> Result<String> {
        match self.attribute(key) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(LoggerError::missing_attribute(self.node.name(), key, message)),
        }
    }

    pub fn bool_attribute(&mut self, key: &str, default: bool) -> Result<bool> {
        match self.attribute(key) {
            None => Ok(default),
            Some(value) => match value.trim().to_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(LoggerError::type_mismatch(self.node.name(), key, value, "boolean")),
            },
        }
    }

    pub fn level_attribute(&mut self, key: &str) -> Result<Option<LogLevel>> {
        match self.attribute(key) {
            None => Ok(None),
            Some(value) => LogLevel::get(&value)
                .map(Some)
                .ok_or_else(|| LoggerError::type_mismatch(self.node.name(), key, value, "level")),
        }
    }

    pub fn parse_attribute<T: FromStr>(&mut self, key: &str, expected: &str) -> Result<Option<T>> {
        match self.attribute(key) {
            None => Ok(None),
            Some(value) => value
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| LoggerError::type_mismatch(self.node.name(), key, value, expected)),
        }
    }

    /// Element text with references substituted
    pub fn value(&self) -> Option<String> {
        self.node
            .value()
            .map(|raw| self.env.interpolator.substitute(raw))
    }

    pub fn raw_value(&self) -> Option<String> {
        self.node.value().map(str::to_string)
    }

    fn collect<T>(&mut self, pick: impl Fn(&Component) -> Option<T>) -> Vec<T> {
        let mut found = Vec::new();
        for child in self.node.children_mut() {
            if let Some(item) = child.object().and_then(&pick) {
                child.mark_consumed();
                found.push(item);
            }
        }
        found
    }

    /// Claim every built `AppenderRef` child
    pub fn appender_refs(&mut self) -> Vec<AppenderRef> {
        self.collect(|c| match c {
            Component::AppenderRef(r) => Some(r.clone()),
            _ => None,
        })
    }

    pub fn filters(&mut self) -> Vec<Arc<dyn Filter>> {
        self.collect(|c| c.as_filter().cloned())
    }

    /// All child filters, combined into a composite when there are several
    pub fn filter(&mut self) -> Option<Arc<dyn Filter>> {
        let mut filters = self.filters();
        match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Arc::new(CompositeFilter::new(filters))),
        }
    }

    pub fn properties(&mut self) -> Vec<Property> {
        self.collect(|c| match c {
            Component::Property(p) => Some(p.clone()),
            _ => None,
        })
    }

    pub fn appenders(&mut self) -> Vec<Arc<dyn Appender>> {
        self.collect(|c| c.as_appender().cloned())
    }

    pub fn logger_configs(&mut self) -> Vec<Arc<LoggerConfig>> {
        self.collect(|c| c.as_logger_config().cloned())
    }

    pub fn custom_levels(&mut self) -> Vec<CustomLevelConfig> {
        self.collect(|c| match c {
            Component::CustomLevel(level) => Some(level.clone()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> PluginEnv {
        PluginEnv::new(Arc::new(ConfigurationSettings::default()))
    }

    fn property_factory(ctx: &mut PluginContext<'_>) -> Result<Component> {
        let name = ctx.required_attribute("name", "Property name cannot be null")?;
        Ok(Component::Property(Property::new(name, ctx.value().unwrap_or_default())))
    }

    #[test]
    fn test_registry_lookup_is_case_insensitive() {
        let mut registry = PluginRegistry::new();
        registry.register(PluginType::new("Property", property_factory));

        assert!(registry.get("property").is_some());
        assert!(registry.get_in("CORE", "PROPERTY").is_some());
        assert!(registry.get_in("custom", "property").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_attribute_accessors_consume() {
        let env = env();
        env.interpolator().put("lvl", "debug");
        let mut node = Node::new("Logger")
            .with_attribute("level", "${lvl}")
            .with_attribute("additivity", "maybe")
            .with_attribute("extra", "x");
        let mut ctx = PluginContext::new(&mut node, &env);

        assert_eq!(ctx.level_attribute("Level").unwrap(), Some(LogLevel::DEBUG));
        assert!(matches!(
            ctx.bool_attribute("additivity", true),
            Err(LoggerError::TypeMismatch { .. })
        ));
        assert!(matches!(
            ctx.required_attribute("name", "missing"),
            Err(LoggerError::MissingAttribute { .. })
        ));

        assert_eq!(node.attributes().len(), 1);
        assert!(node.attribute("extra").is_some());
    }

    #[test]
    fn test_element_accessors_mark_children() {
        let env = env();
        let mut property = Node::new("Property");
        property.set_object(Component::Property(Property::new("a", "1")));
        let mut stray = Node::new("AppenderRef");
        stray.set_object(Component::AppenderRef(AppenderRef::new("X")));
        let mut node = Node::new("Properties").with_child(property).with_child(stray);

        let mut ctx = PluginContext::new(&mut node, &env);
        assert_eq!(ctx.properties().len(), 1);

        assert!(node.children()[0].is_consumed());
        assert!(!node.children()[1].is_consumed());
    }
}
