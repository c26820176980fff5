//! Error types for the logging configuration engine

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// No plugin registered for a node name
    #[error("Unable to locate plugin type for {name}")]
    PluginNotFound { name: String },

    /// A required attribute was not supplied
    #[error("{plugin} is missing required attribute '{attribute}': {message}")]
    MissingAttribute {
        plugin: String,
        attribute: String,
        message: String,
    },

    /// An attribute value could not be converted to the expected type
    #[error("Invalid value '{value}' for attribute '{attribute}' of {plugin}: expected {expected}")]
    TypeMismatch {
        plugin: String,
        attribute: String,
        value: String,
        expected: String,
    },

    /// More than one root logger inside a Loggers element
    #[error("Configuration has multiple root loggers")]
    MultipleRootLoggers,

    /// Append attempted on an appender that is not running
    #[error("Attempted to append to non-started appender {name}")]
    AppenderNotStarted { name: String },

    /// The appender failed while handling an event
    #[error("An exception occurred processing Appender {name}: {message}")]
    AppenderFailure { name: String, message: String },

    /// Async queue full with buffer details
    #[error("Async queue full for {name}: {capacity} events buffered")]
    QueueFull { name: String, capacity: usize },

    /// Component used outside of its valid lifecycle state
    #[error("Invalid lifecycle state for {component}: expected {expected}, was {actual}")]
    InvalidState {
        component: String,
        expected: String,
        actual: String,
    },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    pub fn plugin_not_found(name: impl Into<String>) -> Self {
        LoggerError::PluginNotFound { name: name.into() }
    }

    /// Create a missing required attribute error
    pub fn missing_attribute(
        plugin: impl Into<String>,
        attribute: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        LoggerError::MissingAttribute {
            plugin: plugin.into(),
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    /// Create an attribute conversion error
    pub fn type_mismatch(
        plugin: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        LoggerError::TypeMismatch {
            plugin: plugin.into(),
            attribute: attribute.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    pub fn appender_not_started(name: impl Into<String>) -> Self {
        LoggerError::AppenderNotStarted { name: name.into() }
    }

    /// Create an appender failure error
    pub fn appender(name: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::AppenderFailure {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn queue_full(name: impl Into<String>, capacity: usize) -> Self {
        LoggerError::QueueFull {
            name: name.into(),
            capacity,
        }
    }

    pub fn invalid_state(
        component: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        LoggerError::InvalidState {
            component: component.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// True for errors that describe a broken configuration rather than a runtime fault
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            LoggerError::PluginNotFound { .. }
                | LoggerError::MissingAttribute { .. }
                | LoggerError::TypeMismatch { .. }
                | LoggerError::MultipleRootLoggers
                | LoggerError::InvalidConfiguration { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LoggerError::plugin_not_found("Consol");
        assert!(matches!(err, LoggerError::PluginNotFound { .. }));

        let err = LoggerError::config("Loggers", "no root");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = LoggerError::appender("STDOUT", "broken pipe");
        assert!(matches!(err, LoggerError::AppenderFailure { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::missing_attribute("Logger", "name", "Loggers cannot be configured without a name");
        assert_eq!(
            err.to_string(),
            "Logger is missing required attribute 'name': Loggers cannot be configured without a name"
        );

        let err = LoggerError::type_mismatch("Logger", "additivity", "maybe", "boolean");
        assert_eq!(
            err.to_string(),
            "Invalid value 'maybe' for attribute 'additivity' of Logger: expected boolean"
        );

        let err = LoggerError::appender_not_started("FILE");
        assert_eq!(err.to_string(), "Attempted to append to non-started appender FILE");
    }

    #[test]
    fn test_structural_classification() {
        assert!(LoggerError::MultipleRootLoggers.is_structural());
        assert!(LoggerError::plugin_not_found("x").is_structural());
        assert!(!LoggerError::appender("a", "b").is_structural());
        assert!(!LoggerError::queue_full("async", 10).is_structural());
    }

    #[test]
    fn test_io_operation_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = LoggerError::io_operation("reading configuration", "cannot open file", io_err);

        assert!(matches!(err, LoggerError::IoOperation { .. }));
        assert!(err.to_string().contains("reading configuration"));
    }
}
