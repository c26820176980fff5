//! Output formats for log events
//!
//! - Text: `[timestamp] [LEVEL] thread logger - message key=value`
//! - Json: one JSON object per event
//! - Logfmt: key=value pairs

use super::log_context::FieldValue;
use super::log_event::LogEvent;
use super::timestamp::TimestampFormat;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Logfmt,
}

impl OutputFormat {
    pub fn format(&self, event: &LogEvent, timestamp_format: &TimestampFormat) -> String {
        match self {
            OutputFormat::Text => self.format_text(event, timestamp_format),
            OutputFormat::Json => self.format_json(event, timestamp_format),
            OutputFormat::Logfmt => self.format_logfmt(event, timestamp_format),
        }
    }

    fn format_text(&self, event: &LogEvent, timestamp_format: &TimestampFormat) -> String {
        let base = format!(
            "[{}] [{:5}] {} {} - {}",
            timestamp_format.format(&event.timestamp),
            event.level.to_str(),
            event.thread_label(),
            display_logger_name(&event.logger_name),
            event.message
        );

        match event.context {
            Some(ref context) if !context.is_empty() => {
                format!("{} {}", base, context.format_fields())
            }
            _ => base,
        }
    }

    fn format_json(&self, event: &LogEvent, timestamp_format: &TimestampFormat) -> String {
        use serde_json::Value;

        let mut json_obj = serde_json::Map::new();

        let timestamp = if timestamp_format.is_numeric() {
            match timestamp_format {
                TimestampFormat::Unix => Value::Number(event.timestamp.timestamp().into()),
                TimestampFormat::UnixMillis => {
                    Value::Number(event.timestamp.timestamp_millis().into())
                }
                _ => Value::Number(event.timestamp.timestamp_micros().into()),
            }
        } else {
            Value::String(timestamp_format.format(&event.timestamp))
        };
        json_obj.insert("timestamp".to_string(), timestamp);
        json_obj.insert("level".to_string(), Value::String(event.level.to_str().to_string()));
        json_obj.insert("logger".to_string(), Value::String(event.logger_name.clone()));
        json_obj.insert("message".to_string(), Value::String(event.message.clone()));
        json_obj.insert("thread_id".to_string(), Value::String(event.thread_id.clone()));
        if let Some(ref name) = event.thread_name {
            json_obj.insert("thread_name".to_string(), Value::String(name.clone()));
        }

        if let Some(ref location) = event.location {
            json_obj.insert("file".to_string(), Value::String(location.file.clone()));
            json_obj.insert("line".to_string(), Value::Number(location.line.into()));
            json_obj.insert(
                "module_path".to_string(),
                Value::String(location.module_path.clone()),
            );
        }

        if let Some(ref context) = event.context {
            for (key, value) in context.fields() {
                json_obj.insert(key.clone(), value.to_json_value());
            }
        }

        serde_json::to_string(&Value::Object(json_obj)).unwrap_or_default()
    }

    fn format_logfmt(&self, event: &LogEvent, timestamp_format: &TimestampFormat) -> String {
        let mut parts = vec![
            format!(
                "timestamp={}",
                escape_logfmt_value(&timestamp_format.format(&event.timestamp))
            ),
            format!("level={}", event.level.to_str()),
            format!("logger={}", escape_logfmt_value(display_logger_name(&event.logger_name))),
            format!("message={}", quote_logfmt_value(&event.message)),
            format!("thread={}", escape_logfmt_value(event.thread_label())),
        ];

        if let Some(ref location) = event.location {
            parts.push(format!("file={}", escape_logfmt_value(&location.file)));
            parts.push(format!("line={}", location.line));
        }

        if let Some(ref context) = event.context {
            for (key, value) in context.fields() {
                let formatted = match value {
                    FieldValue::String(s) => quote_logfmt_value(s),
                    other => other.to_string(),
                };
                parts.push(format!("{}={}", escape_logfmt_key(key), formatted));
            }
        }

        parts.join(" ")
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "logfmt" => Ok(OutputFormat::Logfmt),
            _ => Err(format!("Invalid output format: '{}'", s)),
        }
    }
}

fn display_logger_name(name: &str) -> &str {
    if name.is_empty() {
        "root"
    } else {
        name
    }
}

fn escape_logfmt_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || *c == '.')
        .collect()
}

fn escape_logfmt_value(value: &str) -> String {
    if value.contains(' ') || value.contains('"') || value.contains('=') {
        quote_logfmt_value(value)
    } else {
        value.to_string()
    }
}

fn quote_logfmt_value(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LogContext, LogLevel};

    #[test]
    fn test_text_format_names_logger() {
        let event = LogEvent::new("com.acme.Service", LogLevel::INFO, "Request processed");
        let result = OutputFormat::Text.format(&event, &TimestampFormat::Iso8601);

        assert!(result.contains("[INFO ]"));
        assert!(result.contains("com.acme.Service - Request processed"));
    }

    #[test]
    fn test_text_format_root_and_context() {
        let context = LogContext::new().with_field("user_id", 123);
        let event = LogEvent::new("", LogLevel::WARN, "login").with_context(context);
        let result = OutputFormat::Text.format(&event, &TimestampFormat::Iso8601);

        assert!(result.contains("root - login user_id=123"));
    }

    #[test]
    fn test_json_format() {
        let context = LogContext::new().with_field("latency_ms", 42);
        let event = LogEvent::new("db", LogLevel::ERROR, "Error occurred").with_context(context);
        let result = OutputFormat::Json.format(&event, &TimestampFormat::UnixMillis);

        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed["level"], "ERROR");
        assert_eq!(parsed["logger"], "db");
        assert_eq!(parsed["latency_ms"], 42);
        assert!(parsed["timestamp"].is_number());
    }

    #[test]
    fn test_logfmt_format_quotes_values() {
        let context = LogContext::new().with_field("query", "SELECT * FROM users WHERE id=1");
        let event = LogEvent::new("sql", LogLevel::DEBUG, "Query executed").with_context(context);
        let result = OutputFormat::Logfmt.format(&event, &TimestampFormat::Iso8601);

        assert!(result.contains("level=DEBUG"));
        assert!(result.contains("message=\"Query executed\""));
        assert!(result.contains("query=\"SELECT * FROM users WHERE id=1\""));
    }

    #[test]
    fn test_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
