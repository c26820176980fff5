//! Structured context data carried by a log event
//!
//! Fields come from the call site and from the `Property` elements of the
//! LoggerConfig that created the event.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A single structured field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(text) => f.write_str(text),
            FieldValue::Int(number) => write!(f, "{}", number),
            FieldValue::Float(number) => write!(f, "{}", number),
            FieldValue::Bool(flag) => write!(f, "{}", flag),
            FieldValue::Null => f.write_str("null"),
        }
    }
}

impl FieldValue {
    /// JSON form; non-finite floats become null
    #[must_use]
    pub fn to_json_value(&self) -> Value {
        match self {
            FieldValue::String(text) => Value::String(text.clone()),
            FieldValue::Int(number) => Value::from(*number),
            FieldValue::Float(number) => Number::from_f64(*number).map_or(Value::Null, Value::Number),
            FieldValue::Bool(flag) => Value::Bool(*flag),
            FieldValue::Null => Value::Null,
        }
    }
}

macro_rules! field_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    FieldValue::$variant(value.into())
                }
            }
        )*
    };
}

field_value_from! {
    String => String,
    &str => String,
    i64 => Int,
    i32 => Int,
    u32 => Int,
    f64 => Float,
    bool => Bool,
}

/// Key-value fields attached to a single event, kept in key order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogContext {
    fields: BTreeMap<String, FieldValue>,
}

impl LogContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn add_field<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.insert(key.into(), value.into());
    }

    /// Add a field only if the key is not present yet
    ///
    /// Call-site fields take priority over configured properties.
    pub fn add_if_absent<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.entry(key.into()).or_insert_with(|| value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `key=value` pairs separated by spaces, in key order
    pub fn format_fields(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.fields {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(key);
            out.push('=');
            out.push_str(&value.to_string());
        }
        out
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_fields())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_conversions() {
        let ctx = LogContext::new()
            .with_field("attempt", 3u32)
            .with_field("ratio", f64::NAN)
            .with_field("cached", false);

        assert_eq!(ctx.get("attempt"), Some(&FieldValue::Int(3)));
        assert_eq!(ctx.get("ratio").map(FieldValue::to_json_value), Some(Value::Null));
        assert_eq!(ctx.get("cached").map(ToString::to_string).as_deref(), Some("false"));
    }

    #[test]
    fn test_log_context_format_is_key_ordered() {
        let ctx = LogContext::new()
            .with_field("key2", 42)
            .with_field("key1", "value1");

        assert_eq!(ctx.format_fields(), "key1=value1 key2=42");
    }

    #[test]
    fn test_add_if_absent_keeps_existing() {
        let mut ctx = LogContext::new().with_field("key", "entry_value");
        ctx.add_if_absent("key", "configured_value");
        ctx.add_if_absent("service", "api");

        assert_eq!(ctx.get("key"), Some(&FieldValue::String("entry_value".into())));
        assert_eq!(ctx.get("service"), Some(&FieldValue::String("api".into())));
    }
}
