//! JSON documents as node trees
//!
//! ```json
//! { "configuration": {
//!     "name": "app", "status": "warn",
//!     "appenders": { "Console": { "name": "STDOUT" } },
//!     "loggers": {
//!         "logger": [ { "name": "com.example", "level": "debug" } ],
//!         "root": { "level": "error", "AppenderRef": { "ref": "STDOUT" } }
//!     }
//! } }
//! ```
//!
//! Objects become child nodes named after their key, arrays repeat the key
//! once per element, scalars become attributes. A string `type` member names
//! the node instead of the key.

use super::node::Node;
use crate::core::{LoggerError, Result};
use serde_json::{Map, Value};

/// Name of the root node of every parsed document
pub const ROOT_NODE_NAME: &str = "Configuration";

pub fn parse_json(text: &str) -> Result<Node> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Object(document) = value else {
        return Err(LoggerError::config(
            "JSON configuration",
            "the document must be an object",
        ));
    };

    let body = match document
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("configuration"))
    {
        Some((_, Value::Object(body))) => body,
        Some(_) => {
            return Err(LoggerError::config(
                "JSON configuration",
                "\"configuration\" must be an object",
            ))
        }
        None => &document,
    };

    let mut root = Node::new(ROOT_NODE_NAME);
    fill(&mut root, body, None)?;
    Ok(root)
}

fn fill(node: &mut Node, members: &Map<String, Value>, skip: Option<&str>) -> Result<()> {
    for (key, value) in members {
        if skip == Some(key.as_str()) {
            continue;
        }
        match value {
            Value::Object(object) => node.add_child(build_node(key, object)?),
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::Object(object) => node.add_child(build_node(key, object)?),
                        Value::Null => {}
                        _ => {
                            return Err(LoggerError::config(
                                node.name(),
                                format!("array \"{}\" may only contain objects", key),
                            ))
                        }
                    }
                }
            }
            Value::Null => {}
            Value::String(text) => node.set_attribute(key.as_str(), text.as_str()),
            scalar => node.set_attribute(key.as_str(), scalar.to_string()),
        }
    }
    Ok(())
}

fn build_node(key: &str, object: &Map<String, Value>) -> Result<Node> {
    let type_name = object
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("type"))
        .and_then(|(k, v)| v.as_str().map(|name| (k.as_str(), name)));

    let mut node = Node::new(type_name.map_or(key, |(_, name)| name));
    fill(&mut node, object, type_name.map(|(type_key, _)| type_key))?;
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_and_order() {
        let root = parse_json(
            r#"{ "configuration": {
                "name": "app",
                "monitorInterval": 30,
                "properties": { "property": [ { "name": "dir", "value": "/tmp" } ] },
                "appenders": {
                    "appender": [
                        { "type": "Console", "name": "STDOUT" },
                        { "type": "List", "name": "LIST" }
                    ]
                },
                "loggers": {
                    "logger": [ { "name": "a", "additivity": false }, { "name": "b" } ],
                    "root": { "level": "info", "AppenderRef": { "ref": "STDOUT" } }
                }
            } }"#,
        )
        .unwrap();

        assert_eq!(root.name(), "Configuration");
        assert_eq!(root.attribute("name"), Some("app"));
        assert_eq!(root.attribute("monitorInterval"), Some("30"));

        let order: Vec<_> = root.children().iter().map(|c| c.name()).collect();
        assert_eq!(order, vec!["properties", "appenders", "loggers"]);

        let appenders = &root.children()[1];
        let names: Vec<_> = appenders.children().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["Console", "List"]);
        assert!(appenders.children()[0].attribute("type").is_none());
        assert_eq!(appenders.children()[0].parent_name(), Some("appenders"));

        let loggers = &root.children()[2];
        assert_eq!(loggers.children().len(), 3);
        assert_eq!(loggers.children()[0].attribute("additivity"), Some("false"));
        assert_eq!(loggers.children()[2].children()[0].name(), "AppenderRef");
    }

    #[test]
    fn test_unwrapped_document() {
        let root = parse_json(r#"{ "loggers": { "root": { "level": "warn" } } }"#).unwrap();
        assert_eq!(root.children()[0].name(), "loggers");
    }

    #[test]
    fn test_rejects_bad_documents() {
        assert!(matches!(parse_json("[1, 2]"), Err(LoggerError::InvalidConfiguration { .. })));
        assert!(matches!(parse_json("{ nope"), Err(LoggerError::JsonError(_))));
        assert!(parse_json(r#"{ "appenders": { "x": [1] } }"#).is_err());
    }
}
