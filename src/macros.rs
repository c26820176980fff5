//! Logging macros with `format!` arguments and the call site attached
//!
//! # Examples
//!
//! ```
//! use rust_logger_config::prelude::*;
//! use rust_logger_config::info;
//!
//! let context = LoggerContext::builder()
//!     .json(r#"{ "loggers": { "root": { "level": "info" } } }"#)
//!     .build()
//!     .unwrap();
//! let logger = context.get_logger("server");
//!
//! info!(logger, "Server started");
//!
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//! ```

/// Log a message at an explicit level.
///
/// ```
/// # use rust_logger_config::prelude::*;
/// # let context = LoggerContext::builder().build().unwrap();
/// # let logger = context.get_logger("doc");
/// use rust_logger_config::log;
/// log!(logger, LogLevel::ERROR, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log_at(
            $level,
            $crate::core::Location::new(file!(), line!(), module_path!()),
            format!($($arg)+),
        )
    };
}

#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::LogLevel::TRACE, $($arg)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::LogLevel::DEBUG, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::LogLevel::INFO, $($arg)+)
    };
}

#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::LogLevel::WARN, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::LogLevel::ERROR, $($arg)+)
    };
}

/// Log a fatal-level message.
///
/// ```
/// # use rust_logger_config::prelude::*;
/// # let context = LoggerContext::builder().build().unwrap();
/// # let logger = context.get_logger("doc");
/// use rust_logger_config::fatal;
/// fatal!(logger, "Unrecoverable state in {}", "worker-3");
/// ```
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::LogLevel::FATAL, $($arg)+)
    };
}
