//! Appender implementations

pub mod async_appender;
pub mod console;
pub mod file;
pub mod list;

pub use async_appender::AsyncAppender;
pub use console::{ConsoleAppender, ConsoleTarget};
pub use file::FileAppender;
pub use list::ListAppender;

// Re-export the trait next to its implementations
pub use crate::core::Appender;
