//! # Rust Logger Config
//!
//! A runtime logging configuration engine. A declarative configuration is
//! turned into a graph of appenders, filters and logger configurations, log
//! events are routed through the logger hierarchy, and a running
//! configuration can be replaced while other threads keep logging.
//!
//! ## Features
//!
//! - **Node-tree wiring**: JSON documents become a node tree; conditionals
//!   are resolved and every node is built through a typed plugin registry
//! - **Logger hierarchy**: dotted-name prefixes with level inheritance and
//!   additive propagation
//! - **Safe reconfiguration**: reliability strategies drain in-flight calls
//!   before the outgoing configuration stops its appenders
//! - **Appenders**: console, file, async and in-memory list
//!
//! ```
//! use rust_logger_config::prelude::*;
//!
//! let context = LoggerContext::builder()
//!     .json(r#"{
//!         "appenders": { "List": { "name": "MEMORY" } },
//!         "loggers": { "root": { "level": "info", "AppenderRef": { "ref": "MEMORY" } } }
//!     }"#)
//!     .build()
//!     .unwrap();
//!
//! context.get_logger("app.db").info("connected");
//! assert!(context.stop(std::time::Duration::from_secs(1)));
//! ```

pub mod appenders;
pub mod config;
pub mod core;
pub mod macros;

pub mod prelude {
    pub use crate::appenders::{AsyncAppender, ConsoleAppender, FileAppender, ListAppender};
    pub use crate::config::{
        Configuration, ConfigurationSettings, ConfigurationSource, LoggerConfig, Node,
        PluginRegistry,
    };
    pub use crate::core::{
        Appender, Filter, FilterResult, LifeCycle, LifeCycleState, LogContext, LogEvent, LogLevel,
        Logger, LoggerContext, LoggerError, OutputFormat, OverflowPolicy, Result, StatusLogger,
        TimestampFormat,
    };
}

pub use appenders::{AsyncAppender, ConsoleAppender, FileAppender, ListAppender};
pub use config::{Configuration, ConfigurationSettings, LoggerConfig};
pub use core::{
    Appender, LifeCycle, LogContext, LogLevel, Logger, LoggerContext, LoggerError, Result,
};
