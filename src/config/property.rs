//! Properties and custom level declarations

use super::lookup::Interpolator;
use crate::core::LogLevel;

/// A named value from a `Properties` section or a LoggerConfig
///
/// `raw_value` keeps the text as written; `value` is the result of
/// substitution at configuration time. LoggerConfig properties whose raw value
/// still contains a reference are evaluated again for every event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    name: String,
    raw_value: String,
    value: String,
    value_needs_lookup: bool,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self::with_raw(name, value.clone(), value)
    }

    pub fn with_raw(
        name: impl Into<String>,
        raw_value: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let raw_value = raw_value.into();
        Self {
            name: name.into(),
            value_needs_lookup: Interpolator::needs_lookup(&raw_value),
            raw_value,
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw_value(&self) -> &str {
        &self.raw_value
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn value_needs_lookup(&self) -> bool {
        self.value_needs_lookup
    }

    /// The value an event should carry right now
    pub fn evaluate(&self, interpolator: &Interpolator) -> String {
        if self.value_needs_lookup {
            interpolator.substitute(&self.raw_value)
        } else {
            self.value.clone()
        }
    }
}

/// A `CustomLevel` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomLevelConfig {
    name: String,
    int_level: u32,
}

impl CustomLevelConfig {
    /// Registers the level process-wide
    pub fn new(name: impl Into<String>, int_level: u32) -> Self {
        let name = name.into();
        let level = LogLevel::for_name(&name, int_level);
        Self {
            name: level.name().to_string(),
            int_level: level.int_level(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn int_level(&self) -> u32 {
        self.int_level
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::for_name(&self.name, self.int_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_lookup_flag() {
        let fixed = Property::new("service", "billing");
        assert!(!fixed.value_needs_lookup());

        let lookup = Interpolator::default();
        let dynamic = Property::with_raw("host", "${hostname}", "${hostname}");
        assert!(dynamic.value_needs_lookup());
        assert_eq!(dynamic.evaluate(&lookup), "${hostname}");

        lookup.put("hostname", "node-7");
        assert_eq!(dynamic.evaluate(&lookup), "node-7");
        assert_eq!(fixed.evaluate(&lookup), "billing");
    }

    #[test]
    fn test_custom_level_registration() {
        let config = CustomLevelConfig::new("notice", 350);
        assert_eq!(config.name(), "NOTICE");
        assert_eq!(LogLevel::get("Notice"), Some(config.level()));
        assert!(config.level().is_enabled_for(LogLevel::INFO));
        assert!(!config.level().is_enabled_for(LogLevel::WARN));
    }
}
