//! # Empty-Value Predicate
//!
//! The "no value" convention used by required-field checks.

use serde_json::Value;

/// True if the value is absent for validation purposes: `null`, a string
/// containing only whitespace, or an empty array. Objects, numbers and
/// booleans are never empty.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
