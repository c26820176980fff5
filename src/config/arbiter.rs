//! Conditional configuration: arbiters and the `Select` container
//!
//! Arbiters are evaluated once, before wiring. A true arbiter is replaced by
//! its children; a false one disappears together with them. `Select` keeps
//! the children of exactly one of its arbiters.

use super::node::Node;
use super::plugin::{Component, PluginKind};
use super::processor::ConfigurationProcessor;
use crate::core::{LoggerError, Result, StatusLogger};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub trait Arbiter: Send + Sync + fmt::Debug {
    /// Whether the children of this arbiter belong in the configuration
    fn is_condition(&self) -> Result<bool>;

    /// The fallback of a `Select` when no other condition holds
    fn is_default(&self) -> bool {
        false
    }
}

/// Always true; chosen by `Select` when nothing else matches
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultArbiter;

impl Arbiter for DefaultArbiter {
    fn is_condition(&self) -> Result<bool> {
        Ok(true)
    }

    fn is_default(&self) -> bool {
        true
    }
}

/// True when an environment variable is set, optionally to a given value
#[derive(Debug, Clone)]
pub struct EnvironmentArbiter {
    property_name: String,
    property_value: Option<String>,
}

impl EnvironmentArbiter {
    pub fn new(property_name: impl Into<String>, property_value: Option<String>) -> Self {
        Self {
            property_name: property_name.into(),
            property_value,
        }
    }
}

impl Arbiter for EnvironmentArbiter {
    fn is_condition(&self) -> Result<bool> {
        match std::env::var(&self.property_name) {
            Ok(value) => Ok(self.property_value.as_ref().is_none_or(|expected| *expected == value)),
            Err(std::env::VarError::NotPresent) => Ok(false),
            Err(e) => Err(LoggerError::other(format!(
                "Environment variable {} cannot be read: {}",
                self.property_name, e
            ))),
        }
    }
}

/// Same as [`EnvironmentArbiter`] against the settings' system properties
#[derive(Debug, Clone)]
pub struct SystemPropertyArbiter {
    property_name: String,
    property_value: Option<String>,
    properties: BTreeMap<String, String>,
}

impl SystemPropertyArbiter {
    pub fn new(
        property_name: impl Into<String>,
        property_value: Option<String>,
        properties: BTreeMap<String, String>,
    ) -> Self {
        Self {
            property_name: property_name.into(),
            property_value,
            properties,
        }
    }
}

impl Arbiter for SystemPropertyArbiter {
    fn is_condition(&self) -> Result<bool> {
        Ok(match self.properties.get(&self.property_name) {
            Some(value) => self.property_value.as_ref().is_none_or(|expected| expected == value),
            None => false,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SelectArbiter;

impl SelectArbiter {
    /// Position of the winning condition: the first non-default one that
    /// holds, else the default. A condition that fails to evaluate wins.
    pub fn evaluate_conditions(
        &self,
        conditions: &[Arc<dyn Arbiter>],
        status: &StatusLogger,
    ) -> Option<usize> {
        let mut defaults = conditions
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_default())
            .map(|(i, _)| i);
        let default = defaults.next();
        if defaults.next().is_some() {
            status.error("Select contains multiple DefaultArbiter elements; using the first");
        }

        for (i, condition) in conditions.iter().enumerate() {
            if condition.is_default() {
                continue;
            }
            match condition.is_condition() {
                Ok(true) => return Some(i),
                Ok(false) => {}
                Err(e) => {
                    status.error(format!(
                        "Exception processing {:?}: {}. Ignoring and including children",
                        condition, e
                    ));
                    return Some(i);
                }
            }
        }
        default
    }
}

/// Replace every arbiter below `node` by the children it admits, in place
pub fn process_conditionals(node: &mut Node, processor: &ConfigurationProcessor) {
    let status = processor.env().status().clone();
    let children = node.take_children();
    let mut resolved = Vec::with_capacity(children.len());

    for mut child in children {
        let kind = child.plugin_type().map(|t| t.kind());
        match kind {
            Some(PluginKind::Select) => resolved.extend(process_select(&mut child, processor)),
            Some(PluginKind::Arbiter) => match processor.create_plugin_object(&mut child) {
                Ok(Component::Arbiter(arbiter)) => match arbiter.is_condition() {
                    Ok(true) => {
                        process_conditionals(&mut child, processor);
                        resolved.extend(child.take_children());
                    }
                    Ok(false) => {}
                    Err(e) => {
                        status.error(format!(
                            "Exception processing {}: {}. Ignoring and including children",
                            child.name(),
                            e
                        ));
                        process_conditionals(&mut child, processor);
                        resolved.extend(child.take_children());
                    }
                },
                Ok(_) => {
                    status.error(format!(
                        "Encountered Condition Plugin that does not implement Condition: {}",
                        child.name()
                    ));
                    process_conditionals(&mut child, processor);
                    resolved.push(child);
                }
                Err(e) => {
                    status.error(format!(
                        "Exception processing {}: {}. Ignoring and including children",
                        child.name(),
                        e
                    ));
                    process_conditionals(&mut child, processor);
                    resolved.extend(child.take_children());
                }
            },
            _ => {
                process_conditionals(&mut child, processor);
                resolved.push(child);
            }
        }
    }

    node.set_children(resolved);
}

fn process_select(select: &mut Node, processor: &ConfigurationProcessor) -> Vec<Node> {
    let status = processor.env().status().clone();
    let selector = match processor.create_plugin_object(select) {
        Ok(Component::Select(selector)) => selector,
        Ok(other) => {
            status.error(format!(
                "{} built a {} instead of a Select; using the default selection",
                select.name(),
                other.kind()
            ));
            SelectArbiter
        }
        Err(e) => {
            status.error(format!("Unable to create {}: {}", select.name(), e));
            SelectArbiter
        }
    };

    let mut conditions: Vec<(usize, Arc<dyn Arbiter>)> = Vec::new();
    for (i, child) in select.children_mut().iter_mut().enumerate() {
        match child.plugin_type().map(|t| t.kind()) {
            Some(PluginKind::Arbiter) => match processor.create_plugin_object(child) {
                Ok(Component::Arbiter(arbiter)) => {
                    child.set_object(Component::Arbiter(Arc::clone(&arbiter)));
                    conditions.push((i, arbiter));
                }
                Ok(_) => status.error(format!(
                    "Invalid Node {} for Select. Must be a Condition",
                    child.name()
                )),
                Err(e) => {
                    // A condition that cannot be built is given the benefit of the doubt.
                    status.error(format!(
                        "Exception processing {}: {}. Ignoring and including children",
                        child.name(),
                        e
                    ));
                    let failed: Arc<dyn Arbiter> = Arc::new(FailedArbiter(e.to_string()));
                    conditions.push((i, failed));
                }
            },
            Some(_) => status.error(format!(
                "Invalid Node {} for Select. Must be a Condition",
                child.name()
            )),
            None => status.error(format!("No PluginType for node {}", child.name())),
        }
    }

    let arbiters: Vec<Arc<dyn Arbiter>> = conditions.iter().map(|(_, a)| Arc::clone(a)).collect();
    let Some(winner) = selector.evaluate_conditions(&arbiters, &status) else {
        return Vec::new();
    };
    let index = conditions[winner].0;
    let mut chosen = std::mem::take(&mut select.children_mut()[index]);
    process_conditionals(&mut chosen, processor);
    chosen.take_children()
}

/// Stands in for a condition whose construction failed
#[derive(Debug)]
struct FailedArbiter(String);

impl Arbiter for FailedArbiter {
    fn is_condition(&self) -> Result<bool> {
        Err(LoggerError::other(self.0.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::plugin::{PluginEnv, PluginRegistry};
    use crate::config::settings::ConfigurationSettings;
    use crate::core::LogLevel;

    fn processor(settings: ConfigurationSettings) -> ConfigurationProcessor {
        let settings = settings.with_status(StatusLogger::silent());
        ConfigurationProcessor::new(
            Arc::new(PluginRegistry::with_core_plugins()),
            Arc::new(PluginEnv::new(Arc::new(settings))),
        )
    }

    fn names(node: &Node) -> Vec<&str> {
        node.children().iter().map(|c| c.name()).collect()
    }

    fn sys_arbiter(value: &str, child: &str) -> Node {
        Node::new("SystemPropertyArbiter")
            .with_attribute("propertyName", "env")
            .with_attribute("propertyValue", value)
            .with_child(Node::new(child))
    }

    #[test]
    fn test_select_splices_winner_in_place() {
        let processor = processor(ConfigurationSettings::default().with_system_property("env", "prod"));
        let mut root = Node::new("Appenders")
            .with_child(Node::new("First"))
            .with_child(
                Node::new("Select")
                    .with_child(sys_arbiter("dev", "DevConsole"))
                    .with_child(sys_arbiter("prod", "ProdFile").with_child(Node::new("ProdAudit")))
                    .with_child(Node::new("DefaultArbiter").with_child(Node::new("Fallback"))),
            )
            .with_child(Node::new("Last"));
        processor.resolve_types(&mut root);

        process_conditionals(&mut root, &processor);

        assert_eq!(names(&root), vec!["First", "ProdFile", "ProdAudit", "Last"]);
        assert!(root.children().iter().all(|c| c.parent_name() == Some("Appenders")));
    }

    #[test]
    fn test_select_falls_back_to_default() {
        let processor = processor(ConfigurationSettings::default());
        let mut root = Node::new("Loggers").with_child(
            Node::new("Select")
                .with_child(sys_arbiter("dev", "DevLogger"))
                .with_child(Node::new("DefaultArbiter").with_child(Node::new("Root"))),
        );
        processor.resolve_types(&mut root);
        process_conditionals(&mut root, &processor);
        assert_eq!(names(&root), vec!["Root"]);
    }

    #[test]
    fn test_plain_arbiters_and_nesting() {
        let processor = processor(ConfigurationSettings::default().with_system_property("env", "prod"));
        let mut root = Node::new("Configuration")
            .with_child(sys_arbiter("dev", "Dropped"))
            .with_child(
                Node::new("SystemPropertyArbiter")
                    .with_attribute("propertyName", "env")
                    .with_child(Node::new("Kept"))
                    .with_child(sys_arbiter("prod", "Nested")),
            );
        processor.resolve_types(&mut root);
        process_conditionals(&mut root, &processor);
        assert_eq!(names(&root), vec!["Kept", "Nested"]);
    }

    #[test]
    fn test_failing_arbiter_fails_open() {
        let processor = processor(ConfigurationSettings::default());
        // Missing propertyName makes construction fail.
        let mut root = Node::new("Configuration")
            .with_child(Node::new("EnvironmentArbiter").with_child(Node::new("Included")));
        processor.resolve_types(&mut root);
        process_conditionals(&mut root, &processor);

        assert_eq!(names(&root), vec!["Included"]);
        assert!(processor
            .env()
            .status()
            .contains(LogLevel::ERROR, "Ignoring and including children"));
    }

    #[test]
    fn test_select_rejects_non_arbiter_children() {
        let processor = processor(ConfigurationSettings::default());
        let mut root = Node::new("Configuration").with_child(
            Node::new("Select")
                .with_child(Node::new("Console"))
                .with_child(Node::new("DefaultArbiter").with_child(Node::new("Chosen"))),
        );
        processor.resolve_types(&mut root);
        process_conditionals(&mut root, &processor);

        assert_eq!(names(&root), vec!["Chosen"]);
        assert!(processor
            .env()
            .status()
            .contains(LogLevel::ERROR, "Invalid Node Console for Select"));
    }

    #[test]
    fn test_environment_arbiter() {
        assert!(EnvironmentArbiter::new("PATH", None).is_condition().unwrap());
        assert!(!EnvironmentArbiter::new("RLC_SURELY_UNSET_VARIABLE", None)
            .is_condition()
            .unwrap());
    }

    #[test]
    fn test_multiple_defaults_use_first() {
        let status = StatusLogger::silent();
        let conditions: Vec<Arc<dyn Arbiter>> = vec![
            Arc::new(SystemPropertyArbiter::new("x", None, BTreeMap::new())),
            Arc::new(DefaultArbiter),
            Arc::new(DefaultArbiter),
        ];
        assert_eq!(SelectArbiter.evaluate_conditions(&conditions, &status), Some(1));
        assert!(status.contains(LogLevel::ERROR, "multiple DefaultArbiter"));
    }
}
