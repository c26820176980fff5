//! Overflow policies for bounded async queues
//!
//! Used by the `Async` appender and the async logger delegate when their
//! queue is full.

use super::log_level::LogLevel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Wait used when `BlockWithTimeout` is configured without an explicit duration
pub const DEFAULT_BLOCK_TIMEOUT: Duration = Duration::from_millis(100);

/// Policy for handling a full async queue
///
/// # Example
///
/// ```
/// use rust_logger_config::core::OverflowPolicy;
/// use std::time::Duration;
///
/// let policy: OverflowPolicy = "BlockWithTimeout:250".parse().unwrap();
/// assert_eq!(policy, OverflowPolicy::BlockWithTimeout(Duration::from_millis(250)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Drop the event and count it
    DropNewest,

    /// Hand the event to the wrapped appenders on the calling thread
    ///
    /// Crossbeam channels cannot evict from the receiving side, so the queue
    /// keeps its order and the caller pays for the write instead.
    DropOldest,

    /// Block until space is available
    Block,

    /// Block for at most the given duration, then drop
    BlockWithTimeout(Duration),

    /// Drop, report through the status logger and invoke the overflow callback
    #[default]
    AlertAndDrop,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
            OverflowPolicy::DropOldest => write!(f, "DropOldest"),
            OverflowPolicy::Block => write!(f, "Block"),
            OverflowPolicy::BlockWithTimeout(d) => write!(f, "BlockWithTimeout({:?})", d),
            OverflowPolicy::AlertAndDrop => write!(f, "AlertAndDrop"),
        }
    }
}

impl FromStr for OverflowPolicy {
    type Err = String;

    /// Accepts the variant names case-insensitively; `BlockWithTimeout` may
    /// carry a millisecond timeout as `BlockWithTimeout:250`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (name, arg) = match trimmed.split_once(':') {
            Some((name, arg)) => (name, Some(arg.trim())),
            None => (trimmed, None),
        };
        match (name.to_lowercase().as_str(), arg) {
            ("dropnewest", None) => Ok(OverflowPolicy::DropNewest),
            ("dropoldest", None) => Ok(OverflowPolicy::DropOldest),
            ("block", None) => Ok(OverflowPolicy::Block),
            ("alertanddrop", None) => Ok(OverflowPolicy::AlertAndDrop),
            ("blockwithtimeout", None) => Ok(OverflowPolicy::BlockWithTimeout(DEFAULT_BLOCK_TIMEOUT)),
            ("blockwithtimeout", Some(millis)) => millis
                .parse::<u64>()
                .map(|ms| OverflowPolicy::BlockWithTimeout(Duration::from_millis(ms)))
                .map_err(|_| format!("Invalid timeout in overflow policy: '{}'", s)),
            _ => Err(format!("Invalid overflow policy: '{}'", s)),
        }
    }
}

/// Priority for preservation during overflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum LogPriority {
    /// INFO and less severe
    #[default]
    Normal = 0,
    /// WARN
    High = 1,
    /// ERROR and FATAL; never dropped, written synchronously instead
    Critical = 2,
}

impl LogPriority {
    pub fn for_level(level: LogLevel) -> Self {
        if level.is_enabled_for(LogLevel::ERROR) {
            LogPriority::Critical
        } else if level.is_enabled_for(LogLevel::WARN) {
            LogPriority::High
        } else {
            LogPriority::Normal
        }
    }
}

impl fmt::Display for LogPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogPriority::Normal => write!(f, "Normal"),
            LogPriority::High => write!(f, "High"),
            LogPriority::Critical => write!(f, "Critical"),
        }
    }
}

/// Called when events are dropped; the argument is the total dropped so far
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_policy_default() {
        assert_eq!(OverflowPolicy::default(), OverflowPolicy::AlertAndDrop);
    }

    #[test]
    fn test_overflow_policy_display() {
        assert_eq!(OverflowPolicy::DropNewest.to_string(), "DropNewest");
        assert_eq!(
            OverflowPolicy::BlockWithTimeout(Duration::from_millis(100)).to_string(),
            "BlockWithTimeout(100ms)"
        );
    }

    #[test]
    fn test_overflow_policy_parse() {
        assert_eq!("block".parse::<OverflowPolicy>().unwrap(), OverflowPolicy::Block);
        assert_eq!(
            "BlockWithTimeout".parse::<OverflowPolicy>().unwrap(),
            OverflowPolicy::BlockWithTimeout(DEFAULT_BLOCK_TIMEOUT)
        );
        assert!("BlockWithTimeout:soon".parse::<OverflowPolicy>().is_err());
        assert!("Discard".parse::<OverflowPolicy>().is_err());
    }

    #[test]
    fn test_priority_for_level() {
        assert_eq!(LogPriority::for_level(LogLevel::FATAL), LogPriority::Critical);
        assert_eq!(LogPriority::for_level(LogLevel::ERROR), LogPriority::Critical);
        assert_eq!(LogPriority::for_level(LogLevel::WARN), LogPriority::High);
        assert_eq!(LogPriority::for_level(LogLevel::DEBUG), LogPriority::Normal);
        assert!(LogPriority::Normal < LogPriority::Critical);
    }
}
