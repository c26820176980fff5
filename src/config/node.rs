//! Generic configuration tree
//!
//! A [`Node`] is produced by a format adapter (see [`super::json`]) or built
//! programmatically. The processor resolves each node's plugin type, builds
//! the component it describes and stores it in the node's object slot.

use super::plugin::{Component, PluginType};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One element of a configuration tree
///
/// Attributes are stored with their original case but looked up
/// case-insensitively. A child always records its parent's name.
///
/// # Examples
///
/// ```
/// use rust_logger_config::config::Node;
///
/// let root = Node::new("Configuration").with_child(
///     Node::new("Logger")
///         .with_attribute("name", "app.db")
///         .with_attribute("Level", "debug"),
/// );
///
/// let logger = root.find_child("logger").unwrap();
/// assert_eq!(logger.attribute("level"), Some("debug"));
/// assert_eq!(logger.parent_name(), Some("Configuration"));
/// assert!(root.is_root());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Node {
    name: String,
    parent_name: Option<String>,
    attributes: BTreeMap<String, String>,
    value: Option<String>,
    children: Vec<Node>,
    plugin_type: Option<Arc<PluginType>>,
    object: Option<Component>,
    consumed: bool,
}

impl Node {
    /// A detached node with no attributes or children
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_child(mut self, child: Node) -> Self {
        self.add_child(child);
        self
    }

    /// Element name, which selects the plugin type
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the enclosing node; `None` for the root
    pub fn parent_name(&self) -> Option<&str> {
        self.parent_name.as_deref()
    }

    pub fn set_parent_name(&mut self, parent: Option<String>) {
        self.parent_name = parent;
    }

    /// True for a node that was never added to a parent
    pub fn is_root(&self) -> bool {
        self.parent_name.is_none()
    }

    /// Attributes not yet claimed by a factory, keyed in their original case
    ///
    /// Factories remove what they read, so after construction this holds
    /// only the leftovers.
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Case-insensitive attribute lookup
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Remove an attribute, matching the key case-insensitively
    pub fn remove_attribute(&mut self, key: &str) -> Option<String> {
        let found = self
            .attributes
            .keys()
            .find(|k| k.eq_ignore_ascii_case(key))
            .cloned()?;
        self.attributes.remove(&found)
    }

    /// Element text, without reference substitution
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn set_value(&mut self, value: Option<String>) {
        self.value = value;
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Mutable access to the children
    ///
    /// Children pushed through this handle keep whatever parent name they
    /// already had; use [`Node::add_child`] to attach new ones.
    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Append `child`, recording this node as its parent
    pub fn add_child(&mut self, mut child: Node) {
        child.parent_name = Some(self.name.clone());
        self.children.push(child);
    }

    /// Detach and return every child, leaving this node empty
    pub fn take_children(&mut self) -> Vec<Node> {
        std::mem::take(&mut self.children)
    }

    /// Replace all children, re-pointing their parent name at this node
    pub fn set_children(&mut self, children: Vec<Node>) {
        self.children = children;
        let name = self.name.clone();
        for child in &mut self.children {
            child.parent_name = Some(name.clone());
        }
    }

    /// First child with the given name (case-insensitive)
    pub fn find_child(&self, name: &str) -> Option<&Node> {
        self.children
            .iter()
            .find(|child| child.name.eq_ignore_ascii_case(name))
    }

    /// The resolved plugin type; `None` until resolution or when unregistered
    pub fn plugin_type(&self) -> Option<&Arc<PluginType>> {
        self.plugin_type.as_ref()
    }

    pub fn set_plugin_type(&mut self, plugin_type: Option<Arc<PluginType>>) {
        self.plugin_type = plugin_type;
    }

    /// The component built from this node, if construction succeeded
    pub fn object(&self) -> Option<&Component> {
        self.object.as_ref()
    }

    pub fn has_object(&self) -> bool {
        self.object.is_some()
    }

    /// Store the built component; the slot can only be filled once
    pub fn set_object(&mut self, object: Component) -> bool {
        if self.object.is_some() {
            return false;
        }
        self.object = Some(object);
        true
    }

    /// True once the parent's factory used this node's component
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    pub fn mark_consumed(&mut self) {
        self.consumed = true;
    }
}
