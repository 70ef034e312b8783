//! Result sanitization — truncation and redaction of tool output.
//!
//! Nothing a tool returns reaches a client without passing through here.
//! Rules: a recursion depth cap, string and array length caps, and
//! redaction of sensitive-looking object keys. Type identity is
//! preserved throughout: null stays null, arrays stay arrays, objects
//! stay objects. Sanitization is idempotent — a sanitized value passes
//! through unchanged.

use braincast_config::SanitizerConfig;
use serde_json::Value;

/// Replacement for values nested past the depth cap.
pub const DEPTH_MARKER: &str = "[max depth exceeded]";

/// Suffix appended to truncated strings.
pub const TRUNCATION_MARKER: &str = "...[truncated]";

/// Replacement for values under sensitive keys.
pub const REDACTED_MARKER: &str = "***REDACTED***";

/// Applies the configured caps and redactions to tool output.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    config: SanitizerConfig,
}

impl Sanitizer {
    pub fn new(config: SanitizerConfig) -> Self {
        Self { config }
    }

    /// Sanitize a value for client consumption.
    pub fn sanitize(&self, value: &Value) -> Value {
        self.walk(value, 0)
    }

    fn walk(&self, value: &Value, depth: usize) -> Value {
        if depth >= self.config.max_depth {
            return Value::String(DEPTH_MARKER.into());
        }

        match value {
            Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
            Value::String(s) => Value::String(self.cap_string(s, depth)),
            Value::Array(items) => Value::Array(self.cap_array(items, depth)),
            Value::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (key, val) in map {
                    if self.is_sensitive_key(key) {
                        out.insert(key.clone(), Value::String(REDACTED_MARKER.into()));
                    } else {
                        out.insert(key.clone(), self.walk(val, depth + 1));
                    }
                }
                Value::Object(out)
            }
        }
    }

    /// Truncate a string to the depth-appropriate cap, keeping the total
    /// length at the cap so a second pass is a no-op.
    fn cap_string(&self, s: &str, depth: usize) -> String {
        let cap = if depth == 0 {
            self.config.max_string_len
        } else {
            self.config.max_nested_string_len
        };

        let len = s.chars().count();
        if len <= cap {
            return s.to_string();
        }

        let keep = cap.saturating_sub(TRUNCATION_MARKER.chars().count());
        let mut out: String = s.chars().take(keep).collect();
        out.push_str(TRUNCATION_MARKER);
        out
    }

    /// Cap an array, preserving array-ness and noting the cut.
    fn cap_array(&self, items: &[Value], depth: usize) -> Vec<Value> {
        let cap = self.config.max_array_items;
        if items.len() <= cap {
            return items.iter().map(|v| self.walk(v, depth + 1)).collect();
        }

        // Keep cap-1 real items plus one note element, so the result
        // stays at the cap and a second pass leaves it alone.
        let keep = cap.saturating_sub(1);
        let mut out: Vec<Value> = items
            .iter()
            .take(keep)
            .map(|v| self.walk(v, depth + 1))
            .collect();
        out.push(Value::String(format!(
            "[{} more items truncated]",
            items.len() - keep
        )));
        out
    }

    fn is_sensitive_key(&self, key: &str) -> bool {
        let lower = key.to_lowercase();
        self.config
            .sensitive_keys
            .iter()
            .any(|needle| lower.contains(needle.as_str()))
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(SanitizerConfig::default())
    }
}
