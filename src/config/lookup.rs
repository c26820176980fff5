//! `${...}` property substitution

use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Nesting limit for values that reference other properties
const MAX_SUBSTITUTION_DEPTH: usize = 8;

/// Resolves `${key}`, `${key:-default}`, `${env:NAME}` and `${sys:NAME}`
///
/// Plain keys come from the configuration's `Properties` section, `sys:` keys
/// from the settings' system property map. References that cannot be resolved
/// are left in place.
///
/// # Example
///
/// ```
/// use rust_logger_config::config::Interpolator;
/// use std::collections::BTreeMap;
///
/// let lookup = Interpolator::new(BTreeMap::new());
/// lookup.put("dir", "/var/log");
/// assert_eq!(lookup.substitute("${dir}/app.log"), "/var/log/app.log");
/// assert_eq!(lookup.substitute("${missing:-x}"), "x");
/// assert_eq!(lookup.substitute("${missing}"), "${missing}");
/// ```
#[derive(Debug, Default)]
pub struct Interpolator {
    properties: RwLock<BTreeMap<String, String>>,
    system: BTreeMap<String, String>,
}

impl Interpolator {
    pub fn new(system: BTreeMap<String, String>) -> Self {
        Self {
            properties: RwLock::new(BTreeMap::new()),
            system,
        }
    }

    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.write().insert(key.into(), value.into());
    }

    pub fn set_properties<I>(&self, properties: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut map = self.properties.write();
        map.clear();
        map.extend(properties);
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.properties.read().get(key).cloned()
    }

    pub fn system_property(&self, key: &str) -> Option<&str> {
        self.system.get(key).map(String::as_str)
    }

    pub fn needs_lookup(value: &str) -> bool {
        value.contains("${")
    }

    pub fn substitute(&self, input: &str) -> String {
        self.substitute_depth(input, 0)
    }

    fn substitute_depth(&self, input: &str, depth: usize) -> String {
        if depth >= MAX_SUBSTITUTION_DEPTH || !Self::needs_lookup(input) {
            return input.to_string();
        }

        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = find_closing(after) else {
                out.push_str(&rest[start..]);
                rest = "";
                break;
            };
            let expr = self.substitute_depth(&after[..end], depth + 1);
            match self.resolve(&expr, depth) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push_str("${");
                    out.push_str(&expr);
                    out.push('}');
                }
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        out
    }

    fn resolve(&self, expr: &str, depth: usize) -> Option<String> {
        let (key, default) = match expr.split_once(":-") {
            Some((key, default)) => (key, Some(default)),
            None => (expr, None),
        };

        let value = if let Some(name) = key.strip_prefix("env:") {
            std::env::var(name).ok()
        } else if let Some(name) = key.strip_prefix("sys:") {
            self.system.get(name).cloned()
        } else {
            self.get(key)
        };

        value
            .or_else(|| default.map(str::to_string))
            .map(|v| self.substitute_depth(&v, depth + 1))
    }
}

/// Index of the `}` closing a reference whose `${` has already been consumed
fn find_closing(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut open = 1usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                open += 1;
                i += 2;
                continue;
            }
            b'}' => {
                open -= 1;
                if open == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup() -> Interpolator {
        let mut system = BTreeMap::new();
        system.insert("app.env".to_string(), "prod".to_string());
        let lookup = Interpolator::new(system);
        lookup.put("base", "/srv");
        lookup.put("logs", "${base}/logs");
        lookup
    }

    #[test]
    fn test_nested_property_values() {
        assert_eq!(lookup().substitute("${logs}/app.log"), "/srv/logs/app.log");
    }

    #[test]
    fn test_system_and_default() {
        let lookup = lookup();
        assert_eq!(lookup.substitute("env=${sys:app.env}"), "env=prod");
        assert_eq!(lookup.substitute("${sys:missing:-dev}"), "dev");
        assert_eq!(lookup.substitute("${unset:-${base}}"), "/srv");
    }

    #[test]
    fn test_environment_lookup() {
        let path = std::env::var("PATH").unwrap_or_default();
        assert_eq!(lookup().substitute("${env:PATH}"), path);
    }

    #[test]
    fn test_unresolved_left_verbatim() {
        let lookup = lookup();
        assert_eq!(lookup.substitute("a ${nope} b"), "a ${nope} b");
        assert_eq!(lookup.substitute("unterminated ${base"), "unterminated ${base");
        assert_eq!(lookup.substitute("plain"), "plain");
    }

    #[test]
    fn test_self_reference_terminates() {
        let lookup = Interpolator::default();
        lookup.put("loop", "${loop}");
        let result = lookup.substitute("${loop}");
        assert!(result.contains("${loop}"));
    }
}
