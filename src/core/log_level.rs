//! Log level definitions
//!
//! Levels carry an integer weight where a smaller number is more severe
//! (`OFF` = 0 ... `ALL` = `u32::MAX`). Ordering follows severity, so
//! `LogLevel::ERROR > LogLevel::INFO`. Custom levels are interned once per
//! process through [`LogLevel::for_name`].

use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LogLevel {
    name: &'static str,
    int_level: u32,
}

static CUSTOM_LEVELS: OnceLock<RwLock<HashMap<String, LogLevel>>> = OnceLock::new();

fn custom_levels() -> &'static RwLock<HashMap<String, LogLevel>> {
    CUSTOM_LEVELS.get_or_init(|| RwLock::new(HashMap::new()))
}

impl LogLevel {
    pub const OFF: LogLevel = LogLevel::standard("OFF", 0);
    pub const FATAL: LogLevel = LogLevel::standard("FATAL", 100);
    pub const ERROR: LogLevel = LogLevel::standard("ERROR", 200);
    pub const WARN: LogLevel = LogLevel::standard("WARN", 300);
    pub const INFO: LogLevel = LogLevel::standard("INFO", 400);
    pub const DEBUG: LogLevel = LogLevel::standard("DEBUG", 500);
    pub const TRACE: LogLevel = LogLevel::standard("TRACE", 600);
    pub const ALL: LogLevel = LogLevel::standard("ALL", u32::MAX);

    const STANDARD: [LogLevel; 8] = [
        LogLevel::OFF,
        LogLevel::FATAL,
        LogLevel::ERROR,
        LogLevel::WARN,
        LogLevel::INFO,
        LogLevel::DEBUG,
        LogLevel::TRACE,
        LogLevel::ALL,
    ];

    const fn standard(name: &'static str, int_level: u32) -> Self {
        Self { name, int_level }
    }

    /// Returns the level registered under `name`, creating a custom level with
    /// `int_level` if none exists yet.
    ///
    /// An already registered level is returned unchanged even when `int_level`
    /// differs.
    pub fn for_name(name: &str, int_level: u32) -> LogLevel {
        let key = name.trim().to_uppercase();
        if let Some(level) = Self::get(&key) {
            return level;
        }
        let mut registry = custom_levels().write();
        if let Some(level) = registry.get(&key) {
            return *level;
        }
        // Custom levels are few and live for the whole process.
        let interned: &'static str = Box::leak(key.clone().into_boxed_str());
        let level = LogLevel {
            name: interned,
            int_level,
        };
        registry.insert(key, level);
        level
    }

    /// Look up a standard or previously registered custom level (case-insensitive)
    pub fn get(name: &str) -> Option<LogLevel> {
        let key = name.trim().to_uppercase();
        let key = if key == "WARNING" { "WARN".to_string() } else { key };
        Self::STANDARD
            .iter()
            .find(|level| level.name == key)
            .copied()
            .or_else(|| custom_levels().read().get(&key).copied())
    }

    /// All standard levels, most severe first
    pub fn values() -> &'static [LogLevel] {
        &Self::STANDARD
    }

    pub fn to_str(&self) -> &'static str {
        self.name
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn int_level(&self) -> u32 {
        self.int_level
    }

    /// True when this level is at least as severe as `threshold`
    #[inline]
    pub fn is_enabled_for(&self, threshold: LogLevel) -> bool {
        self.int_level <= threshold.int_level
    }

    pub fn is_standard(&self) -> bool {
        Self::STANDARD.iter().any(|level| level == self)
    }

    #[cfg(feature = "console")]
    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self.int_level {
            0..=100 => BrightRed,
            101..=200 => Red,
            201..=300 => Yellow,
            301..=400 => Green,
            401..=500 => Blue,
            _ => BrightBlack,
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::INFO
    }
}

impl Ord for LogLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .int_level
            .cmp(&self.int_level)
            .then_with(|| self.name.cmp(other.name))
    }
}

impl PartialOrd for LogLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogLevel::get(s).ok_or_else(|| format!("Invalid log level: '{}'", s))
    }
}

impl Serialize for LogLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
