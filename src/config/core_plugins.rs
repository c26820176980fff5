//! Built-in plugin types
//!
//! Each factory claims its attributes and child components from the
//! [`PluginContext`]; whatever it leaves behind is reported by the processor.

use super::appender_ref::AppenderRef;
use super::arbiter::{DefaultArbiter, EnvironmentArbiter, SelectArbiter, SystemPropertyArbiter};
use super::logger_config::{LoggerConfig, Loggers, DEFAULT_ROOT_LEVEL};
use super::plugin::{Component, PluginContext, PluginKind, PluginRegistry, PluginType};
use super::property::{CustomLevelConfig, Property};
use crate::appenders::{AsyncAppender, ConsoleAppender, ConsoleTarget, FileAppender, ListAppender};
use crate::core::{
    CompositeFilter, FilterResult, LogLevel, OutputFormat, OverflowPolicy, Result,
    StringMatchFilter, ThresholdFilter, TimestampFormat,
};
use std::sync::Arc;
use std::time::Duration;

pub fn register_core_plugins(registry: &mut PluginRegistry) {
    let plugins = [
        PluginType::new("Appenders", appenders),
        PluginType::new("Loggers", loggers),
        PluginType::new("Logger", logger),
        PluginType::new("Root", root),
        PluginType::new("AsyncLogger", async_logger),
        PluginType::new("AsyncRoot", async_root),
        PluginType::new("AppenderRef", appender_ref),
        PluginType::new("Properties", properties),
        PluginType::new("Property", property),
        PluginType::new("Filters", filters),
        PluginType::new("ThresholdFilter", threshold_filter),
        PluginType::new("StringMatchFilter", string_match_filter),
        PluginType::new("Console", console),
        PluginType::new("File", file),
        PluginType::new("Async", async_appender),
        PluginType::new("List", list),
        PluginType::new("CustomLevel", custom_level),
        PluginType::new("CustomLevels", custom_levels),
        PluginType::new("Select", select).with_kind(PluginKind::Select),
        PluginType::new("DefaultArbiter", default_arbiter).with_kind(PluginKind::Arbiter),
        PluginType::new("EnvironmentArbiter", environment_arbiter).with_kind(PluginKind::Arbiter),
        PluginType::new("SystemPropertyArbiter", system_property_arbiter)
            .with_kind(PluginKind::Arbiter),
    ];
    for plugin in plugins {
        registry.register(plugin);
    }
}

fn appenders(ctx: &mut PluginContext<'_>) -> Result<Component> {
    Ok(Component::Appenders(ctx.appenders()))
}

fn loggers(ctx: &mut PluginContext<'_>) -> Result<Component> {
    Ok(Component::Loggers(Loggers::new(ctx.logger_configs())?))
}

fn build_logger_config(
    ctx: &mut PluginContext<'_>,
    name: String,
    default_level: Option<LogLevel>,
    asynchronous: bool,
) -> Result<Component> {
    let level = ctx.level_attribute("level")?.or(default_level);
    let additive = ctx.bool_attribute("additivity", true)?;
    // Async configs capture location only on request; it is costly off-thread.
    let include_location = ctx.bool_attribute("includeLocation", !asynchronous)?;
    let refs = ctx.appender_refs();
    let properties = ctx.properties();
    let filter = ctx.filter();

    let config = LoggerConfig::builder(name)
        .maybe_level(level)
        .additive(additive)
        .include_location(include_location)
        .appender_refs(refs)
        .properties(properties)
        .filter(filter)
        .asynchronous(asynchronous)
        .build(ctx.env());
    Ok(Component::LoggerConfig(config))
}

fn logger(ctx: &mut PluginContext<'_>) -> Result<Component> {
    let name = ctx.required_attribute("name", "Loggers cannot be configured without a name")?;
    build_logger_config(ctx, name, None, false)
}

fn root(ctx: &mut PluginContext<'_>) -> Result<Component> {
    build_logger_config(ctx, String::new(), Some(DEFAULT_ROOT_LEVEL), false)
}

fn async_logger(ctx: &mut PluginContext<'_>) -> Result<Component> {
    let name = ctx.required_attribute("name", "Loggers cannot be configured without a name")?;
    build_logger_config(ctx, name, None, true)
}

fn async_root(ctx: &mut PluginContext<'_>) -> Result<Component> {
    build_logger_config(ctx, String::new(), Some(DEFAULT_ROOT_LEVEL), true)
}

fn appender_ref(ctx: &mut PluginContext<'_>) -> Result<Component> {
    let name = ctx.required_attribute("ref", "Appender references must contain a reference")?;
    let level = ctx.level_attribute("level")?;
    let filter = ctx.filter();
    Ok(Component::AppenderRef(
        AppenderRef::new(name).with_level(level).with_filter(filter),
    ))
}

fn properties(ctx: &mut PluginContext<'_>) -> Result<Component> {
    Ok(Component::Properties(ctx.properties()))
}

fn property(ctx: &mut PluginContext<'_>) -> Result<Component> {
    let name = ctx.required_attribute("name", "Property name cannot be null")?;
    // The raw text is kept so LoggerConfig properties can be evaluated per event.
    let raw = ctx
        .raw_attribute("value")
        .or_else(|| ctx.raw_value())
        .unwrap_or_default();
    let value = ctx.env().interpolator().substitute(&raw);
    Ok(Component::Property(Property::with_raw(name, raw, value)))
}

fn filter_results(ctx: &mut PluginContext<'_>) -> Result<(FilterResult, FilterResult)> {
    let on_match = ctx
        .parse_attribute::<FilterResult>("onMatch", "ACCEPT, NEUTRAL or DENY")?
        .unwrap_or(FilterResult::Neutral);
    let on_mismatch = ctx
        .parse_attribute::<FilterResult>("onMismatch", "ACCEPT, NEUTRAL or DENY")?
        .unwrap_or(FilterResult::Deny);
    Ok((on_match, on_mismatch))
}

fn filters(ctx: &mut PluginContext<'_>) -> Result<Component> {
    Ok(Component::Filter(Arc::new(CompositeFilter::new(ctx.filters()))))
}

fn threshold_filter(ctx: &mut PluginContext<'_>) -> Result<Component> {
    let level = ctx.level_attribute("level")?.unwrap_or(LogLevel::ERROR);
    let (on_match, on_mismatch) = filter_results(ctx)?;
    Ok(Component::Filter(Arc::new(
        ThresholdFilter::new(level).with_results(on_match, on_mismatch),
    )))
}

fn string_match_filter(ctx: &mut PluginContext<'_>) -> Result<Component> {
    let text = ctx.required_attribute("text", "No text provided for StringMatchFilter")?;
    let (on_match, on_mismatch) = filter_results(ctx)?;
    Ok(Component::Filter(Arc::new(
        StringMatchFilter::new(text).with_results(on_match, on_mismatch),
    )))
}

fn formats(ctx: &mut PluginContext<'_>) -> Result<(OutputFormat, TimestampFormat)> {
    let format = ctx
        .parse_attribute::<OutputFormat>("format", "text, json or logfmt")?
        .unwrap_or_default();
    let timestamp = ctx
        .parse_attribute::<TimestampFormat>("timestampFormat", "timestamp format")?
        .unwrap_or_default();
    Ok((format, timestamp))
}

fn console(ctx: &mut PluginContext<'_>) -> Result<Component> {
    let name = ctx.required_attribute("name", "No name provided for ConsoleAppender")?;
    let target = ctx
        .parse_attribute::<ConsoleTarget>("target", "SYSTEM_OUT or SYSTEM_ERR")?
        .unwrap_or_default();
    let (format, timestamp) = formats(ctx)?;
    let colors = ctx.bool_attribute("colors", false)?;
    let ignore = ctx.bool_attribute("ignoreExceptions", true)?;
    let filter = ctx.filter();

    let appender = ConsoleAppender::new(name, ctx.status().clone())
        .with_target(target)
        .with_output_format(format)
        .with_timestamp_format(timestamp)
        .with_colors(colors)
        .with_ignore_exceptions(ignore)
        .with_filter(filter);
    Ok(Component::Appender(Arc::new(appender)))
}

fn file(ctx: &mut PluginContext<'_>) -> Result<Component> {
    let name = ctx.required_attribute("name", "No name provided for FileAppender")?;
    let path = ctx.required_attribute("fileName", "No filename provided for FileAppender")?;
    let append = ctx.bool_attribute("append", true)?;
    let immediate_flush = ctx.bool_attribute("immediateFlush", true)?;
    let (format, timestamp) = formats(ctx)?;
    let ignore = ctx.bool_attribute("ignoreExceptions", true)?;
    let filter = ctx.filter();

    let appender = FileAppender::new(name, path, ctx.status().clone())
        .with_append(append)
        .with_immediate_flush(immediate_flush)
        .with_output_format(format)
        .with_timestamp_format(timestamp)
        .with_ignore_exceptions(ignore)
        .with_filter(filter);
    Ok(Component::Appender(Arc::new(appender)))
}

fn async_appender(ctx: &mut PluginContext<'_>) -> Result<Component> {
    let name = ctx.required_attribute("name", "No name provided for AsyncAppender")?;
    let buffer_size = ctx
        .parse_attribute::<usize>("bufferSize", "positive integer")?
        .unwrap_or(crate::appenders::async_appender::DEFAULT_BUFFER_SIZE);
    let blocking = ctx.bool_attribute("blocking", false)?;
    let policy = match ctx.parse_attribute::<OverflowPolicy>("overflowPolicy", "overflow policy")? {
        Some(policy) => policy,
        None if blocking => OverflowPolicy::Block,
        None => OverflowPolicy::default(),
    };
    let shutdown_millis = ctx
        .parse_attribute::<u64>("shutdownTimeout", "milliseconds")?
        .unwrap_or(0);
    let ignore = ctx.bool_attribute("ignoreExceptions", true)?;
    let refs = ctx.appender_refs();
    let filter = ctx.filter();
    if refs.is_empty() {
        ctx.status()
            .error(format!("No appender references provided to AsyncAppender {}", name));
    }

    let appender = AsyncAppender::new(name, refs, ctx.status().clone())
        .with_queue(buffer_size, policy, None)
        .with_shutdown_timeout(Duration::from_millis(shutdown_millis))
        .with_ignore_exceptions(ignore)
        .with_filter(filter);
    Ok(Component::Appender(Arc::new(appender)))
}

fn list(ctx: &mut PluginContext<'_>) -> Result<Component> {
    let name = ctx.required_attribute("name", "No name provided for ListAppender")?;
    let ignore = ctx.bool_attribute("ignoreExceptions", true)?;
    let filter = ctx.filter();
    let appender = ListAppender::new(name, ctx.status().clone())
        .with_ignore_exceptions(ignore)
        .with_filter(filter);
    Ok(Component::Appender(Arc::new(appender)))
}

fn custom_level(ctx: &mut PluginContext<'_>) -> Result<Component> {
    let name = ctx.required_attribute("name", "A custom level needs a name")?;
    let int_level = ctx
        .parse_attribute::<u32>("intLevel", "non-negative integer")?
        .unwrap_or(0);
    Ok(Component::CustomLevel(CustomLevelConfig::new(name, int_level)))
}

fn custom_levels(ctx: &mut PluginContext<'_>) -> Result<Component> {
    Ok(Component::CustomLevels(ctx.custom_levels()))
}

fn select(_ctx: &mut PluginContext<'_>) -> Result<Component> {
    Ok(Component::Select(SelectArbiter))
}

fn default_arbiter(_ctx: &mut PluginContext<'_>) -> Result<Component> {
    Ok(Component::Arbiter(Arc::new(DefaultArbiter)))
}

fn environment_arbiter(ctx: &mut PluginContext<'_>) -> Result<Component> {
    let name = ctx.required_attribute("propertyName", "No property name provided")?;
    let value = ctx.attribute("propertyValue");
    Ok(Component::Arbiter(Arc::new(EnvironmentArbiter::new(name, value))))
}

fn system_property_arbiter(ctx: &mut PluginContext<'_>) -> Result<Component> {
    let name = ctx.required_attribute("propertyName", "No property name provided")?;
    let value = ctx.attribute("propertyValue");
    let properties = ctx.settings().system_properties.clone();
    Ok(Component::Arbiter(Arc::new(SystemPropertyArbiter::new(
        name, value, properties,
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::node::Node;
    use crate::config::plugin::PluginEnv;
    use crate::config::processor::ConfigurationProcessor;
    use crate::config::settings::ConfigurationSettings;
    use crate::core::StatusLogger;

    fn build(mut node: Node) -> (Option<Component>, ConfigurationProcessor) {
        let settings = ConfigurationSettings::default().with_status(StatusLogger::silent());
        let processor = ConfigurationProcessor::new(
            Arc::new(PluginRegistry::with_core_plugins()),
            Arc::new(PluginEnv::new(Arc::new(settings))),
        );
        processor.resolve_types(&mut node);
        let component = processor.process_node_tree(&mut node);
        (component, processor)
    }

    #[test]
    fn test_logger_plugin_collects_children() {
        let node = Node::new("Logger")
            .with_attribute("name", "com.example")
            .with_attribute("level", "debug")
            .with_attribute("additivity", "false")
            .with_child(Node::new("AppenderRef").with_attribute("ref", "FILE").with_attribute("level", "warn"))
            .with_child(Node::new("Property").with_attribute("name", "team").with_value("core"))
            .with_child(Node::new("ThresholdFilter").with_attribute("level", "info"));

        let (component, processor) = build(node);
        let config = component.as_ref().and_then(Component::as_logger_config).unwrap();
        assert_eq!(config.name(), "com.example");
        assert_eq!(config.explicit_level(), Some(LogLevel::DEBUG));
        assert!(!config.is_additive());
        assert_eq!(config.appender_refs()[0].ref_name(), "FILE");
        assert_eq!(config.appender_refs()[0].level(), Some(LogLevel::WARN));
        assert_eq!(config.properties()[0].value(), "core");
        assert!(config.filterable().has_filter());
        assert_eq!(processor.env().status().count_at_least(LogLevel::ERROR), 0);
    }

    #[test]
    fn test_root_defaults_to_error() {
        let (component, _) = build(Node::new("Root"));
        let root = component.as_ref().and_then(Component::as_logger_config).unwrap();
        assert!(root.is_root());
        assert_eq!(root.explicit_level(), Some(LogLevel::ERROR));
    }

    #[test]
    fn test_loggers_with_two_roots_fails() {
        let node = Node::new("Loggers")
            .with_child(Node::new("Root"))
            .with_child(Node::new("AsyncRoot"));
        let (component, processor) = build(node);
        assert!(component.is_none());
        assert!(processor
            .env()
            .status()
            .contains(LogLevel::ERROR, "multiple root loggers"));
    }

    #[test]
    fn test_async_appender_options() {
        let node = Node::new("Async")
            .with_attribute("name", "ASYNC")
            .with_attribute("bufferSize", "16")
            .with_attribute("blocking", "true")
            .with_child(Node::new("AppenderRef").with_attribute("ref", "LIST"));
        let (component, _) = build(node);
        let appender = component.as_ref().and_then(Component::as_appender).unwrap();
        assert_eq!(appender.name(), "ASYNC");
        assert!(appender.is_async());
    }

    #[test]
    fn test_type_mismatch_is_reported() {
        let node = Node::new("Console")
            .with_attribute("name", "STDOUT")
            .with_attribute("target", "PRINTER");
        let (component, processor) = build(node);
        assert!(component.is_none());
        assert!(processor
            .env()
            .status()
            .contains(LogLevel::ERROR, "Invalid value 'PRINTER' for attribute 'target'"));
    }

    #[test]
    fn test_custom_level_registers() {
        let node = Node::new("CustomLevels").with_child(
            Node::new("CustomLevel")
                .with_attribute("name", "NOTICE")
                .with_attribute("intLevel", "350"),
        );
        let (component, _) = build(node);
        match component {
            Some(Component::CustomLevels(levels)) => {
                assert_eq!(levels[0].level().int_level(), 350);
                assert_eq!(LogLevel::get("notice").map(|l| l.int_level()), Some(350));
            }
            other => panic!("unexpected component {:?}", other),
        }
    }
}
