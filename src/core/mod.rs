//! Core types: levels, events, filters, appenders, lifecycle and runtime loggers

pub mod appender;
pub mod async_queue;
pub mod error;
pub mod error_handler;
pub mod filter;
pub mod lifecycle;
pub mod log_context;
pub mod log_event;
pub mod log_level;
pub mod logger;
pub mod logger_context;
pub mod metrics;
pub mod output_format;
pub mod overflow_policy;
pub mod status;
pub mod timestamp;

pub use appender::{Appender, AppenderBase};
pub use async_queue::{AsyncQueue, BATCH_SIZE};
pub use error::{LoggerError, Result};
pub use error_handler::{DefaultErrorHandler, ErrorHandler};
pub use filter::{
    CompositeFilter, Filter, FilterResult, Filterable, StringMatchFilter, ThresholdFilter,
};
pub use lifecycle::{LifeCycle, LifeCycleState, StateCell};
pub use log_context::{FieldValue, LogContext};
pub use log_event::{DefaultLogEventFactory, Location, LogEvent, LogEventFactory};
pub use log_level::LogLevel;
pub use logger::Logger;
pub use logger_context::{LoggerContext, LoggerContextBuilder, DEFAULT_CONTEXT_NAME};
pub use metrics::{QueueMetrics, QueueSnapshot};
pub use output_format::OutputFormat;
pub use overflow_policy::{LogPriority, OverflowCallback, OverflowPolicy};
pub use status::{StatusEntry, StatusLogger};
pub use timestamp::TimestampFormat;
