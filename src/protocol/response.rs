//! Outcome definitions
//!
//! Represents the result of an executed command and how it is printed.

use serde_json::Value;

/// Result of executing a command
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Looked-up keys with their value, `None` when absent
    Got(Vec<(String, Option<Value>)>),

    /// Stored pairs
    Stored(Vec<(String, Value)>),

    /// Deleted keys with the removed value, `None` when absent
    Deleted(Vec<(String, Option<Value>)>),
}

impl Outcome {
    /// Lines to print for this outcome
    ///
    /// Misses and looked-up values are always reported; confirmations of
    /// writes only when `verbose` is set.
    pub fn render(&self, verbose: bool) -> Vec<String> {
        match self {
            Outcome::Got(found) => found
                .iter()
                .map(|(key, value)| match value {
                    Some(value) => format!("{} = {}", key, display_value(value)),
                    None => not_found(key),
                })
                .collect(),
            Outcome::Stored(pairs) if verbose => pairs
                .iter()
                .map(|(key, value)| format!("Set {} = {}", key, display_value(value)))
                .collect(),
            Outcome::Stored(_) => Vec::new(),
            Outcome::Deleted(removed) => removed
                .iter()
                .filter_map(|(key, value)| match value {
                    Some(_) if verbose => Some(format!("'{}' was deleted", key)),
                    Some(_) => None,
                    None => Some(not_found(key)),
                })
                .collect(),
        }
    }
}

/// Strings print raw, everything else as compact JSON
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn not_found(key: &str) -> String {
    format!("'{}' not found in storage", key)
}
