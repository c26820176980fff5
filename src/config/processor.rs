//! Depth-first construction of components from a typed node tree

use super::node::Node;
use super::plugin::{Component, PluginContext, PluginEnv, PluginRegistry, PluginType};
use crate::core::{LoggerError, Result, StatusLogger};
use std::sync::Arc;

/// Builds the component of every node, children before parents
///
/// Construction failures are logged and leave the node without an object;
/// the parent is built without it. Attributes and built children the factory
/// never claimed are reported, but do not fail the node.
#[derive(Debug, Clone)]
pub struct ConfigurationProcessor {
    registry: Arc<PluginRegistry>,
    env: Arc<PluginEnv>,
}

impl ConfigurationProcessor {
    pub fn new(registry: Arc<PluginRegistry>, env: Arc<PluginEnv>) -> Self {
        Self { registry, env }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn env(&self) -> &PluginEnv {
        &self.env
    }

    fn status(&self) -> &StatusLogger {
        self.env.status()
    }

    /// Attach the registered plugin type to every node that has none yet
    pub fn resolve_types(&self, node: &mut Node) {
        if node.plugin_type().is_none() {
            node.set_plugin_type(self.registry.get(node.name()));
        }
        for child in node.children_mut() {
            self.resolve_types(child);
        }
    }

    /// Count the scheduled components below `node`, reporting untyped nodes
    pub fn pre_configure(&self, node: &Node) -> usize {
        let mut scheduled = 0;
        for child in node.children() {
            let Some(plugin) = child.plugin_type() else {
                self.status()
                    .error(format!("Unable to locate plugin type for {}", child.name()));
                continue;
            };
            if plugin.is_scheduled() {
                scheduled += 1;
            }
            scheduled += self.pre_configure(child);
        }
        scheduled
    }

    /// Run the node's factory on the node as it stands
    pub fn create_plugin_object(&self, node: &mut Node) -> Result<Component> {
        let plugin = node
            .plugin_type()
            .cloned()
            .ok_or_else(|| LoggerError::plugin_not_found(node.name()))?;
        let mut ctx = PluginContext::new(node, &self.env);
        plugin.create(&mut ctx)
    }

    /// Build `node`, after its children unless its type defers them
    ///
    /// The built component is stored on the node and returned.
    pub fn process_node_tree(&self, node: &mut Node) -> Option<Component> {
        let plugin = node.plugin_type().cloned();
        let defer = plugin.as_ref().is_some_and(|p| p.is_defer_children());
        if !defer {
            for child in node.children_mut() {
                self.process_node_tree(child);
            }
        }

        let Some(plugin) = plugin else {
            if !node.is_root() {
                self.status()
                    .error(format!("Unable to locate plugin for {}", node.name()));
            }
            return None;
        };

        let component = match self.create_plugin_object(node) {
            Ok(component) => Some(component),
            Err(e) => {
                self.status().error(format!(
                    "Could not create plugin of type {} for element {}: {}",
                    plugin.name(),
                    node.name(),
                    e
                ));
                None
            }
        };
        self.verify(node, &plugin);

        if let Some(component) = &component {
            node.set_object(component.clone());
        }
        component
    }

    fn verify(&self, node: &Node, plugin: &PluginType) {
        let leftover: Vec<&String> = node.attributes().keys().collect();
        match leftover.as_slice() {
            [] => {}
            [key] => self.status().error(format!(
                "{} contains an invalid element or attribute \"{}\"",
                node.name(),
                key
            )),
            keys => {
                let quoted: Vec<String> = keys.iter().map(|k| format!("\"{}\"", k)).collect();
                self.status().error(format!(
                    "{} contains invalid attributes {}",
                    node.name(),
                    quoted.join(", ")
                ));
            }
        }

        if plugin.is_defer_children() {
            return;
        }
        // Children that failed to build were reported when they failed.
        for child in node.children() {
            if child.has_object() && !child.is_consumed() {
                self.status().error(format!(
                    "{} has no parameter that matches element {}",
                    node.name(),
                    child.name()
                ));
            }
        }
    }
}
